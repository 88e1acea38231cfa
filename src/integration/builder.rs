//! Builder for creating Frame objects from flat numeric containers.

use nalgebra::Point2;

use crate::error::{Result, TrackerError};
use crate::tracker::{Frame, Keypoints, NUM_KEYPOINTS, VISIBILITY_THRESHOLD};

/// Builder for creating `Frame` objects from the containers a transport layer
/// decodes: `2K` keypoint coordinates and `K` visibility values.
#[derive(Debug, Clone, Default)]
pub struct FrameBuilder {
    frame_id: i64,
    width: u32,
    height: u32,
    keypoints: Vec<f32>,
    visibility: Vec<f32>,
}

impl FrameBuilder {
    /// Create a new frame builder.
    pub fn new(frame_id: i64) -> Self {
        Self {
            frame_id,
            ..Self::default()
        }
    }

    /// Set the frame size in pixels.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set keypoints flattened as `x0, y0, x1, y1, ...` in pixels.
    pub fn keypoints(mut self, flat: &[f32]) -> Self {
        self.keypoints = flat.to_vec();
        self
    }

    /// Set per-keypoint visibility; values `>= 0.5` count as visible.
    pub fn visibility(mut self, flags: &[f32]) -> Self {
        self.visibility = flags.to_vec();
        self
    }

    /// Build the final `Frame`.
    ///
    /// Empty keypoint and visibility containers (as sent with `run` requests)
    /// produce an all-hidden keypoint set.
    pub fn build(self) -> Result<Frame> {
        let mut keypoints = Keypoints::default();

        if !self.keypoints.is_empty() {
            if self.keypoints.len() != 2 * NUM_KEYPOINTS {
                return Err(TrackerError::KeypointCount {
                    expected: 2 * NUM_KEYPOINTS,
                    got: self.keypoints.len(),
                });
            }
            for (p, xy) in keypoints.points.iter_mut().zip(self.keypoints.chunks_exact(2)) {
                *p = Point2::new(xy[0], xy[1]);
            }
        }

        if !self.visibility.is_empty() {
            if self.visibility.len() != NUM_KEYPOINTS {
                return Err(TrackerError::KeypointCount {
                    expected: NUM_KEYPOINTS,
                    got: self.visibility.len(),
                });
            }
            for (v, &flag) in keypoints.visibility.iter_mut().zip(&self.visibility) {
                *v = flag >= VISIBILITY_THRESHOLD;
            }
        }

        Ok(Frame::new(self.frame_id, self.width, self.height, keypoints))
    }
}
