//! Integration module for connecting keypoint predictors and callers with the tracker.
//!
//! This module provides the predictor trait implemented by inference backends
//! (Burn, ONNX Runtime, etc.), a builder for frames coming from flat numeric
//! containers, and a session type dispatching tracker requests.

mod builder;
mod pipeline;
mod predictor;

pub use builder::FrameBuilder;
pub use pipeline::{Request, Response, TrackingSession};
pub use predictor::{Predictor, SearchOutput};

#[cfg(feature = "burn-backend")]
mod burn_backend;

#[cfg(feature = "burn-backend")]
pub use burn_backend::{BurnKeypointModel, BurnPredictor, BurnPredictorError};
