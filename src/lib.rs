//! Online single-object keypoint tracker.
//!
//! A [`KeypointTracker`] is initialized from labeled keypoints on one frame and
//! then follows them frame by frame. Appearance is described by a static
//! template captured at initialization and a dynamic template refreshed from
//! corrected keypoints. The neural network is reached only through the
//! [`Predictor`] trait.

pub mod error;
pub mod integration;
pub mod tracker;

pub use error::{Result, TrackerError};
pub use integration::{FrameBuilder, Predictor, Request, Response, SearchOutput, TrackingSession};
pub use tracker::{
    Crop, Frame, KeypointTracker, Keypoints, NUM_KEYPOINTS, Rect, TrackOutput, TrackPhase,
    TrackerConfig, TrackerState,
};

#[cfg(feature = "burn-backend")]
pub use integration::{BurnKeypointModel, BurnPredictor, BurnPredictorError};
