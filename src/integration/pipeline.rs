//! TrackingSession for driving one tracker from caller requests.

use std::path::Path;

use ndarray::ArrayView3;
use tracing::{debug, warn};

use crate::error::Result;
use crate::tracker::{Frame, KeypointTracker, TrackOutput, TrackerConfig};

use super::Predictor;

/// One decoded caller request.
#[derive(Debug, Clone)]
pub enum Request<'a> {
    /// Load the predictor models.
    Load { template: &'a Path, search: &'a Path },
    /// (Re)start tracking from labeled keypoints.
    Init { image: ArrayView3<'a, u8>, frame: Frame },
    /// Refresh the dynamic template from corrected keypoints.
    Update { image: ArrayView3<'a, u8>, frame: Frame },
    /// Track into a new frame.
    Run { image: ArrayView3<'a, u8>, frame: Frame },
}

/// Outcome of a handled [`Request`].
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Loaded,
    Initialized,
    Updated,
    Tracked(TrackOutput),
}

/// A tracking session owning one tracker.
///
/// Besides plain request dispatch, the session can apply the periodic template
/// refresh policy: every `update_interval` tracked frames, the emitted
/// keypoints are fed back as an update.
pub struct TrackingSession<P: Predictor> {
    tracker: KeypointTracker<P>,
    runs_since_refresh: u32,
}

impl<P: Predictor> TrackingSession<P> {
    /// Create a new session with the given predictor and tracker config.
    pub fn new(predictor: P, config: TrackerConfig) -> Self {
        Self {
            tracker: KeypointTracker::new(predictor, config),
            runs_since_refresh: 0,
        }
    }

    /// Create a new session with default tracker configuration.
    pub fn with_default_config(predictor: P) -> Self {
        Self::new(predictor, TrackerConfig::default())
    }

    /// Dispatch one request to the tracker.
    pub fn handle(&mut self, request: Request<'_>) -> Result<Response> {
        match request {
            Request::Load { template, search } => {
                self.tracker.load(template, search)?;
                Ok(Response::Loaded)
            }
            Request::Init { image, frame } => {
                self.tracker.init(image, &frame)?;
                self.runs_since_refresh = 0;
                Ok(Response::Initialized)
            }
            Request::Update { image, frame } => {
                self.tracker.update(image, &frame)?;
                Ok(Response::Updated)
            }
            Request::Run { image, frame } => self.tracker.run(image, &frame).map(Response::Tracked),
        }
    }

    /// Track into `frame`, refreshing the dynamic template from the result
    /// every `update_interval` calls.
    ///
    /// A failed refresh is logged and does not discard the tracking result.
    pub fn track(&mut self, image: ArrayView3<'_, u8>, frame: &Frame) -> Result<TrackOutput> {
        let output = self.tracker.run(image, frame)?;

        let interval = self.tracker.config().update_interval;
        if interval == 0 {
            return Ok(output);
        }
        self.runs_since_refresh += 1;
        if self.runs_since_refresh >= interval {
            self.runs_since_refresh = 0;
            let correction = Frame::new(
                frame.frame_id,
                frame.width,
                frame.height,
                output.to_pixel_keypoints(frame.width, frame.height),
            );
            debug!(frame_id = frame.frame_id, "periodic template refresh");
            if let Err(err) = self.tracker.update(image, &correction) {
                warn!(frame_id = frame.frame_id, %err, "template refresh failed");
            }
        }
        Ok(output)
    }

    /// Get a reference to the underlying tracker.
    pub fn tracker(&self) -> &KeypointTracker<P> {
        &self.tracker
    }

    /// Get a mutable reference to the underlying tracker.
    pub fn tracker_mut(&mut self) -> &mut KeypointTracker<P> {
        &mut self.tracker
    }
}
