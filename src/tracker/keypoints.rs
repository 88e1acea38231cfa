//! Keypoint sets and per-frame tracker input.

use nalgebra::Point2;

/// Number of keypoints tracked on the object.
pub const NUM_KEYPOINTS: usize = 13;

/// Threshold applied to confidences and visibility flags.
pub const VISIBILITY_THRESHOLD: f32 = 0.5;

/// Ordered keypoints with their visibility flags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoints {
    /// Keypoint positions in image pixels
    pub points: [Point2<f32>; NUM_KEYPOINTS],
    /// Whether each keypoint is visible
    pub visibility: [bool; NUM_KEYPOINTS],
}

impl Default for Keypoints {
    fn default() -> Self {
        Self {
            points: [Point2::origin(); NUM_KEYPOINTS],
            visibility: [false; NUM_KEYPOINTS],
        }
    }
}

impl Keypoints {
    pub fn new(points: [Point2<f32>; NUM_KEYPOINTS], visibility: [bool; NUM_KEYPOINTS]) -> Self {
        Self { points, visibility }
    }

    /// Iterate over the visible keypoints only.
    pub fn visible_points(&self) -> impl Iterator<Item = &Point2<f32>> {
        self.points
            .iter()
            .zip(self.visibility.iter())
            .filter_map(|(p, &v)| v.then_some(p))
    }

    pub fn any_visible(&self) -> bool {
        self.visibility.iter().any(|&v| v)
    }

    /// Clamp every keypoint into `[0, width] x [0, height]`.
    pub fn clamped(&self, width: f32, height: f32) -> Self {
        let mut out = *self;
        for p in out.points.iter_mut() {
            p.x = p.x.clamp(0.0, width);
            p.y = p.y.clamp(0.0, height);
        }
        out
    }
}

/// Everything the tracker needs to know about one video frame besides its pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Frame {
    /// Frame identifier assigned by the caller
    pub frame_id: i64,
    /// Frame width in pixels, used to normalize emitted keypoints
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Labeled keypoints; ignored by `run`
    pub keypoints: Keypoints,
}

impl Frame {
    pub fn new(frame_id: i64, width: u32, height: u32, keypoints: Keypoints) -> Self {
        Self {
            frame_id,
            width,
            height,
            keypoints,
        }
    }
}
