//! Square, context-padded crop sampling around a target box.

use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use ndarray::{Array2, Array3, ArrayView3, s};

use crate::error::{Result, TrackerError};
use crate::tracker::rect::Rect;

/// A crop sampled around a box and resized to the model input size.
#[derive(Debug, Clone)]
pub struct Crop {
    /// Pixels in HWC layout, `output_size x output_size x channels`
    pub patch: Array3<u8>,
    /// `output_size / crop_size`
    pub resize_factor: f32,
    /// `true` where the patch holds real image pixels, `false` where it is padding
    pub attention_mask: Array2<bool>,
}

impl Crop {
    /// Side length of the (square) patch.
    pub fn size(&self) -> usize {
        self.patch.dim().0
    }
}

/// Sample a square crop of side `ceil(sqrt(w*h) * context_factor)` centered on
/// `target` and resize it to `output_size x output_size`.
///
/// Out-of-image margins are zero padded. Only the part of the window that
/// overlaps the image is resampled, straight into its place in the output, so
/// the full-size crop is never materialized. The attention mask marks that
/// placed region, which is where a bilinear resample of the padded mask stays
/// at or above one half.
pub fn sample_target(
    image: ArrayView3<'_, u8>,
    target: &Rect,
    context_factor: f32,
    output_size: usize,
) -> Result<Crop> {
    if output_size == 0 {
        return Err(TrackerError::InvalidImage(
            "output size must be at least one pixel".into(),
        ));
    }
    let window = CropWindow::new(image, target, context_factor)?;
    let (patch, attention_mask) = window.sample(image, output_size)?;

    Ok(Crop {
        patch,
        resize_factor: output_size as f32 / window.side as f32,
        attention_mask,
    })
}

/// Sample the same crop as [`sample_target`] without resizing.
///
/// Returns `(patch, attention_mask, 1.0)`: the resize factor comes last and is
/// always one.
pub fn sample_target_unresized(
    image: ArrayView3<'_, u8>,
    target: &Rect,
    context_factor: f32,
) -> Result<(Array3<u8>, Array2<bool>, f32)> {
    let window = CropWindow::new(image, target, context_factor)?;
    let (patch, mask) = window.sample(image, window.side)?;
    Ok((patch, mask, 1.0))
}

/// Largest window coordinate accepted, so that `x1 + side` stays in `isize`.
const MAX_WINDOW_COORD: f64 = isize::MAX as f64 / 4.0;

/// Square crop window in image coordinates.
#[derive(Debug, Clone, Copy)]
struct CropWindow {
    x1: isize,
    y1: isize,
    side: usize,
    crop_size: f32,
}

impl CropWindow {
    fn new(image: ArrayView3<'_, u8>, target: &Rect, context_factor: f32) -> Result<Self> {
        let (height, width, channels) = image.dim();
        if height == 0 || width == 0 || channels == 0 {
            return Err(TrackerError::InvalidImage(format!(
                "empty image buffer ({height}x{width}x{channels})"
            )));
        }

        let crop_size = target.crop_size(context_factor);
        if !crop_size.is_finite() || crop_size < 1.0 {
            return Err(TrackerError::InvalidBox { crop_size });
        }

        let (cx, cy) = target.center();
        let half = f64::from(crop_size) * 0.5;
        let x1 = (f64::from(cx) - half).round();
        let y1 = (f64::from(cy) - half).round();
        let side = f64::from(crop_size);

        // NaN fails every comparison
        let addressable = |v: f64| v.abs() <= MAX_WINDOW_COORD;
        if !(addressable(x1) && addressable(y1) && addressable(side)) {
            return Err(TrackerError::InvalidBox { crop_size });
        }

        Ok(Self {
            x1: x1 as isize,
            y1: y1 as isize,
            side: side as usize,
            crop_size,
        })
    }

    /// Overlap with a `height x width` image as `(x0, x1, y0, y1)` image
    /// coordinates, or `None` when the window lies outside.
    fn overlap(&self, height: usize, width: usize) -> Option<(usize, usize, usize, usize)> {
        let side = self.side as isize;
        let x0 = self.x1.max(0);
        let x1 = (self.x1 + side).min(width as isize);
        let y0 = self.y1.max(0);
        let y1 = (self.y1 + side).min(height as isize);
        (x0 < x1 && y0 < y1).then(|| (x0 as usize, x1 as usize, y0 as usize, y1 as usize))
    }

    /// Zero-padded `size x size` patch and its attention mask.
    fn sample(
        &self,
        image: ArrayView3<'_, u8>,
        size: usize,
    ) -> Result<(Array3<u8>, Array2<bool>)> {
        let (height, width, channels) = image.dim();
        let too_large = || TrackerError::InvalidBox {
            crop_size: self.crop_size,
        };
        let area = size.checked_mul(size).ok_or_else(too_large)?;
        let len = area.checked_mul(channels).ok_or_else(too_large)?;
        let pixels = filled(len, 0u8).ok_or_else(too_large)?;
        let flags = filled(area, false).ok_or_else(too_large)?;

        let mut patch = Array3::from_shape_vec((size, size, channels), pixels)
            .map_err(|_| too_large())?;
        let mut mask = Array2::from_shape_vec((size, size), flags).map_err(|_| too_large())?;

        let Some((sx0, sx1, sy0, sy1)) = self.overlap(height, width) else {
            return Ok((patch, mask));
        };

        // Overlap placed in output coordinates
        let scale = size as f64 / self.side as f64;
        let place = |offset: isize| ((offset as f64 * scale).round() as usize).min(size);
        let dx0 = place(sx0 as isize - self.x1);
        let dx1 = place(sx1 as isize - self.x1);
        let dy0 = place(sy0 as isize - self.y1);
        let dy1 = place(sy1 as isize - self.y1);
        if dx0 >= dx1 || dy0 >= dy1 {
            return Ok((patch, mask));
        }

        let src = image.slice(s![sy0..sy1, sx0..sx1, ..]);
        let mut dst = patch.slice_mut(s![dy0..dy1, dx0..dx1, ..]);
        if src.dim() == dst.dim() {
            dst.assign(&src);
        } else {
            dst.assign(&resize_region(src, dx1 - dx0, dy1 - dy0)?);
        }
        mask.slice_mut(s![dy0..dy1, dx0..dx1]).fill(true);

        Ok((patch, mask))
    }
}

/// `len` copies of `value`, or `None` when the buffer cannot be allocated.
fn filled<T: Clone>(len: usize, value: T) -> Option<Vec<T>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len).ok()?;
    buffer.resize(len, value);
    Some(buffer)
}

/// Bilinear resample of an HWC region to `width x height`.
fn resize_region(src: ArrayView3<'_, u8>, width: usize, height: usize) -> Result<Array3<u8>> {
    let (src_height, src_width, channels) = src.dim();
    let pixel_type = match channels {
        1 => PixelType::U8,
        2 => PixelType::U8x2,
        3 => PixelType::U8x3,
        4 => PixelType::U8x4,
        _ => {
            return Err(TrackerError::InvalidImage(format!(
                "unsupported channel count {channels}"
            )));
        }
    };
    let dimension = |v: usize| {
        u32::try_from(v).map_err(|_| TrackerError::InvalidImage(format!("dimension {v} too large")))
    };

    let mut src_buffer: Vec<u8> = src.iter().copied().collect();
    let src_view = Image::from_slice_u8(
        dimension(src_width)?,
        dimension(src_height)?,
        &mut src_buffer,
        pixel_type,
    )?;

    let mut dst_buffer = vec![0u8; width * height * channels];
    let mut dst_view = Image::from_slice_u8(
        dimension(width)?,
        dimension(height)?,
        &mut dst_buffer,
        pixel_type,
    )?;

    let options = ResizeOptions::new()
        .resize_alg(ResizeAlg::Convolution(FilterType::Bilinear))
        .use_alpha(false);
    Resizer::new().resize(&src_view, &mut dst_view, &options)?;

    Array3::from_shape_vec((height, width, channels), dst_buffer)
        .map_err(|e| TrackerError::InvalidImage(e.to_string()))
}
