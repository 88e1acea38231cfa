//! Mapping points between image space and crop space.

use nalgebra::{Point2, Vector2};

use crate::tracker::rect::Rect;

/// Margin, in pixels, kept between emitted keypoints and the right/bottom frame border.
pub const CLIP_MARGIN: f32 = 10.0;

fn center_of(target: &Rect) -> Point2<f32> {
    let (cx, cy) = target.center();
    Point2::new(cx, cy)
}

/// Map an image point into the crop sampled around `target`.
///
/// The crop center sits at `(output_size - 1) / 2`. With `normalize` the result
/// is divided by `output_size`.
pub fn to_crop_space(
    point: &Point2<f32>,
    target: &Rect,
    resize_factor: f32,
    output_size: usize,
    normalize: bool,
) -> Point2<f32> {
    let size = output_size as f32;
    let half = (size - 1.0) / 2.0;
    let mapped = Point2::new(half, half) + (*point - center_of(target)) * resize_factor;
    if normalize { mapped / size } else { mapped }
}

/// Map a crop point back into the image, the inverse of [`to_crop_space`] for
/// the same box, resize factor and output size.
///
/// `normalized` tells whether `point` is expressed as a fraction of `output_size`,
/// which is how the predictor reports search results.
///
/// Measuring from the pixel-center `(output_size - 1) / 2` instead of
/// `output_size / 2` places results `0.5 / resize_factor` image pixels further
/// right and down than a plain `q * S / rf + c - S / (2 * rf)` mapping.
pub fn from_crop_space(
    point: &Point2<f32>,
    target: &Rect,
    resize_factor: f32,
    output_size: usize,
    normalized: bool,
) -> Point2<f32> {
    let size = output_size as f32;
    let half = (size - 1.0) / 2.0;
    let crop_point = if normalized {
        Point2::from(point.coords * size)
    } else {
        *point
    };
    let offset: Vector2<f32> = (crop_point - Point2::new(half, half)) / resize_factor;
    center_of(target) + offset
}

/// Clamp a point to `[0, width - margin] x [0, height - margin]`.
pub fn clip_point(point: &Point2<f32>, height: f32, width: f32, margin: f32) -> Point2<f32> {
    let max_x = (width - margin).max(0.0);
    let max_y = (height - margin).max(0.0);
    Point2::new(point.x.max(0.0).min(max_x), point.y.max(0.0).min(max_y))
}
