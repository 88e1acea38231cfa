/// Axis-aligned bounding box in TLWH format (top-left x, top-left y, width, height).
///
/// Boxes built from keypoints never carry a degenerate size: when the computed
/// box cannot be sampled, its width and height are forced to `1.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    /// Top-left x coordinate
    pub x: f32,
    /// Top-left y coordinate
    pub y: f32,
    /// Width of the bounding box
    pub width: f32,
    /// Height of the bounding box
    pub height: f32,
}

/// Fraction of the keypoint extent added on each side of a re-estimated box.
pub const BOX_MARGIN: f32 = 0.1;

impl Rect {
    /// Create a new Rect from top-left coordinates and dimensions (TLWH format).
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a Rect from TLBR format (top-left x, top-left y, bottom-right x, bottom-right y).
    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Tight bounds of `points`, grown by [`BOX_MARGIN`] of the extent on every side.
    ///
    /// Returns `None` for an empty point set.
    pub fn enclosing<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a nalgebra::Point2<f32>>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut x1, mut y1, mut x2, mut y2) = (first.x, first.y, first.x, first.y);
        for p in iter {
            x1 = x1.min(p.x);
            y1 = y1.min(p.y);
            x2 = x2.max(p.x);
            y2 = y2.max(p.y);
        }

        let dw = (x2 - x1) * BOX_MARGIN;
        let dh = (y2 - y1) * BOX_MARGIN;
        Some(Self::from_tlbr(x1 - dw, y1 - dh, x2 + dw, y2 + dh))
    }

    /// Side of the square crop sampled around this box for `context_factor`.
    #[inline]
    pub fn crop_size(&self, context_factor: f32) -> f32 {
        ((self.width * self.height).sqrt() * context_factor).ceil()
    }

    /// Force a `1x1` size when the box would produce an empty crop.
    pub fn ensure_croppable(mut self, context_factor: f32) -> Self {
        let crop_size = self.crop_size(context_factor);
        if crop_size.is_nan() || crop_size < 1.0 {
            self.width = 1.0;
            self.height = 1.0;
        }
        self
    }

    /// Get the center point of the bounding box.
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}
