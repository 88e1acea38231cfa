//! Trait for keypoint predictor backends.

use std::path::Path;

use nalgebra::Point2;

use crate::tracker::{Crop, NUM_KEYPOINTS};

/// Keypoint locations and confidences produced by a search pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutput {
    /// Keypoints in normalized search-crop coordinates (fractions of the crop side)
    pub points: [Point2<f32>; NUM_KEYPOINTS],
    /// Raw per-keypoint confidence
    pub confidences: [f32; NUM_KEYPOINTS],
}

/// Trait for the neural network behind the tracker.
///
/// Implement this trait to connect any template/search model pair to a
/// [`KeypointTracker`](crate::KeypointTracker). Embeddings are opaque to the
/// tracker: it only clones them and hands them back to `search`.
///
/// # Example
///
/// ```ignore
/// use keypoint_tracker_rs::{Crop, Predictor, SearchOutput, NUM_KEYPOINTS};
///
/// struct MyPredictor {
///     // Your models here
/// }
///
/// impl Predictor for MyPredictor {
///     type Embedding = Vec<f32>;
///     type Error = std::io::Error;
///
///     fn load(&mut self, template: &Path, search: &Path) -> Result<(), Self::Error> { Ok(()) }
///     fn is_ready(&self) -> bool { true }
///     // embed / search ...
/// }
/// ```
pub trait Predictor {
    /// Feature bundle describing the object's appearance.
    type Embedding: Clone;

    /// Error type for predictor failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the template and search models. Called once before any `init`.
    fn load(&mut self, template_resource: &Path, search_resource: &Path)
    -> Result<(), Self::Error>;

    /// Whether `load` has succeeded.
    fn is_ready(&self) -> bool;

    /// Embed a template crop.
    ///
    /// # Arguments
    /// * `crop` - Template crop and its attention mask
    /// * `keypoints` - Keypoints in normalized template-crop coordinates
    /// * `keypoints_mask` - `true` for visible keypoints
    fn embed(
        &mut self,
        crop: &Crop,
        keypoints: &[Point2<f32>; NUM_KEYPOINTS],
        keypoints_mask: &[bool; NUM_KEYPOINTS],
    ) -> Result<Self::Embedding, Self::Error>;

    /// Locate the keypoints inside a search crop.
    ///
    /// Output order is fixed: entry `i` always refers to keypoint `i`.
    fn search(
        &mut self,
        crop: &Crop,
        static_embedding: &Self::Embedding,
        dynamic_embedding: &Self::Embedding,
    ) -> Result<SearchOutput, Self::Error>;
}
