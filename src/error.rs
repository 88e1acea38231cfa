//! Error type shared by the tracker and its integration layer.

use thiserror::Error;

/// Boxed error raised by a [`Predictor`](crate::Predictor) implementation.
pub type PredictorError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures of tracker operations.
///
/// None of these are retried internally. A call that fails leaves the
/// tracker state exactly as it was before the call.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The predictor has not been loaded yet.
    #[error("predictor model is not loaded")]
    ModelNotLoaded,

    /// `init` received a keypoint set without any visible keypoint.
    #[error("no visible keypoint to initialize from")]
    EmptyVisibleSet,

    /// The box produces a crop smaller than one pixel.
    #[error("box is too small to sample a crop (crop size {crop_size})")]
    InvalidBox { crop_size: f32 },

    /// `run` or `update` was called before `init`.
    #[error("tracker is not initialized")]
    NotInitialized,

    /// A flat keypoint or visibility container has the wrong length.
    #[error("expected {expected} values, got {got}")]
    KeypointCount { expected: usize, got: usize },

    /// The image buffer cannot be sampled.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Resampling a crop failed.
    #[error("crop resize failed: {0}")]
    Resize(#[from] fast_image_resize::ResizeError),

    /// A crop buffer does not match its declared dimensions.
    #[error("crop buffer mismatch: {0}")]
    ImageBuffer(#[from] fast_image_resize::ImageBufferError),

    /// The predictor failed while loading, embedding or searching.
    #[error("predictor failure: {0}")]
    Predictor(#[source] PredictorError),
}

impl TrackerError {
    pub(crate) fn predictor<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Predictor(Box::new(err))
    }
}

/// Result alias for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
