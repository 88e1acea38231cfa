//! Single-object keypoint tracker state machine.

use std::path::Path;

use nalgebra::Point2;
use ndarray::ArrayView3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, TrackerError};
use crate::integration::Predictor;
use crate::tracker::coords::{CLIP_MARGIN, clip_point, from_crop_space, to_crop_space};
use crate::tracker::crop::sample_target;
use crate::tracker::keypoints::{Frame, Keypoints, NUM_KEYPOINTS, VISIBILITY_THRESHOLD};
use crate::tracker::rect::Rect;
use crate::tracker::template::TemplateBank;
use crate::tracker::track_state::TrackPhase;

/// Configuration for the KeypointTracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Context factor of template crops
    pub template_factor: f32,
    /// Side of the template model input
    pub template_size: usize,
    /// Context factor of search crops
    pub search_factor: f32,
    /// Side of the search model input
    pub search_size: usize,
    /// Number of runs between two dynamic template refreshes in a session
    pub update_interval: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            template_factor: 2.0,
            template_size: 128,
            search_factor: 5.0,
            search_size: 320,
            update_interval: 15,
        }
    }
}

/// Everything a tracker remembers between calls.
#[derive(Debug, Clone)]
pub struct TrackerState<E> {
    bbox: Rect,
    templates: TemplateBank<E>,
    visible: [bool; NUM_KEYPOINTS],
    frame_id: i64,
    init_frame: i64,
}

impl<E: Clone> TrackerState<E> {
    /// Box the next search crop is sampled around.
    pub fn bbox(&self) -> Rect {
        self.bbox
    }

    pub fn templates(&self) -> &TemplateBank<E> {
        &self.templates
    }

    pub fn fused_visibility(&self) -> &[bool; NUM_KEYPOINTS] {
        self.templates.fused_visibility()
    }

    /// Visibility emitted by the last `run`, or the init visibility before any run.
    pub fn visible(&self) -> &[bool; NUM_KEYPOINTS] {
        &self.visible
    }

    pub fn frame_id(&self) -> i64 {
        self.frame_id
    }

    pub fn init_frame(&self) -> i64 {
        self.init_frame
    }
}

/// Result of one tracking step.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackOutput {
    /// Re-estimated object box in image pixels
    pub bbox: Rect,
    /// Keypoints divided by the frame width/height
    pub keypoints: [Point2<f32>; NUM_KEYPOINTS],
    /// Confidences after suppressing never-visible keypoints
    pub confidences: [f32; NUM_KEYPOINTS],
    /// `confidences[i] >= 0.5`
    pub visible: [bool; NUM_KEYPOINTS],
}

impl TrackOutput {
    /// Keypoints flattened as `x0, y0, x1, y1, ...`.
    pub fn flat_keypoints(&self) -> Vec<f32> {
        self.keypoints.iter().flat_map(|p| [p.x, p.y]).collect()
    }

    /// Visibility as `0`/`1` flags.
    pub fn visibility_flags(&self) -> Vec<u8> {
        self.visible.iter().map(|&v| u8::from(v)).collect()
    }

    /// Keypoints scaled back to pixels and rounded, with the emitted visibility.
    pub fn to_pixel_keypoints(&self, width: u32, height: u32) -> Keypoints {
        let points = std::array::from_fn(|i| {
            let p = self.keypoints[i];
            Point2::new(
                (p.x * width as f32).round(),
                (p.y * height as f32).round(),
            )
        });
        Keypoints::new(points, self.visible)
    }
}

/// Online tracker following one object's keypoints from frame to frame.
///
/// Calls must be serialized: every method takes `&mut self` and runs to
/// completion. A failing call leaves the tracker untouched.
pub struct KeypointTracker<P: Predictor> {
    predictor: P,
    config: TrackerConfig,
    state: Option<TrackerState<P::Embedding>>,
    phase: TrackPhase,
}

impl<P: Predictor> KeypointTracker<P> {
    pub fn new(predictor: P, config: TrackerConfig) -> Self {
        Self {
            predictor,
            config,
            state: None,
            phase: TrackPhase::Uninitialized,
        }
    }

    pub fn with_default_config(predictor: P) -> Self {
        Self::new(predictor, TrackerConfig::default())
    }

    /// Load the predictor's template and search models.
    pub fn load(
        &mut self,
        template_resource: impl AsRef<Path>,
        search_resource: impl AsRef<Path>,
    ) -> Result<()> {
        let (template, search) = (template_resource.as_ref(), search_resource.as_ref());
        info!(template = %template.display(), search = %search.display(), "loading predictor");
        self.predictor
            .load(template, search)
            .map_err(TrackerError::predictor)?;
        info!("predictor loaded");
        Ok(())
    }

    /// Start tracking from the visible keypoints of `frame`.
    ///
    /// Any previous state is discarded.
    pub fn init(&mut self, image: ArrayView3<'_, u8>, frame: &Frame) -> Result<()> {
        if !self.predictor.is_ready() {
            return Err(TrackerError::ModelNotLoaded);
        }

        let keypoints = &frame.keypoints;
        let bbox = Rect::enclosing(keypoints.visible_points())
            .ok_or(TrackerError::EmptyVisibleSet)?
            .ensure_croppable(self.config.template_factor);

        let embedding = embed_template(&mut self.predictor, &self.config, image, &bbox, keypoints)?;

        info!(frame_id = frame.frame_id, ?bbox, "tracker initialized");
        self.state = Some(TrackerState {
            bbox,
            templates: TemplateBank::new(embedding, keypoints.visibility),
            visible: keypoints.visibility,
            frame_id: frame.frame_id,
            init_frame: frame.frame_id,
        });
        self.phase = TrackPhase::Initialized;
        Ok(())
    }

    /// Refresh the dynamic template from corrected keypoints.
    ///
    /// Keypoints are clamped into the frame first. Without any visible keypoint
    /// this is a no-op. The tracked box is not changed; the new template is
    /// used from the next `run` on.
    pub fn update(&mut self, image: ArrayView3<'_, u8>, frame: &Frame) -> Result<()> {
        if !self.predictor.is_ready() {
            return Err(TrackerError::ModelNotLoaded);
        }
        let state = self.state.as_ref().ok_or(TrackerError::NotInitialized)?;
        let (width, height) = frame_size(frame)?;

        let keypoints = frame.keypoints.clamped(width, height);
        let Some(bbox) = Rect::enclosing(keypoints.visible_points()) else {
            debug!(frame_id = frame.frame_id, "no visible keypoint, template kept");
            return Ok(());
        };
        let bbox = bbox.ensure_croppable(self.config.template_factor);

        let embedding =
            embed_template(&mut self.predictor, &self.config, image, &bbox, &keypoints)?;
        let templates = state.templates.refreshed(embedding, &keypoints.visibility);

        debug!(frame_id = frame.frame_id, ?bbox, "dynamic template refreshed");
        if let Some(state) = self.state.as_mut() {
            state.templates = templates;
        }
        Ok(())
    }

    /// Locate the keypoints in a new frame and move the box onto them.
    pub fn run(&mut self, image: ArrayView3<'_, u8>, frame: &Frame) -> Result<TrackOutput> {
        if !self.predictor.is_ready() {
            return Err(TrackerError::ModelNotLoaded);
        }
        let state = self.state.as_ref().ok_or(TrackerError::NotInitialized)?;
        let (width, height) = frame_size(frame)?;
        let config = &self.config;

        let crop = sample_target(image, &state.bbox, config.search_factor, config.search_size)?;
        let output = self
            .predictor
            .search(
                &crop,
                state.templates.static_embedding(),
                state.templates.dynamic_embedding(),
            )
            .map_err(TrackerError::predictor)?;

        let points: [Point2<f32>; NUM_KEYPOINTS] = std::array::from_fn(|i| {
            from_crop_space(
                &output.points[i],
                &state.bbox,
                crop.resize_factor,
                config.search_size,
                true,
            )
        });
        let confidences = state.templates.suppress(&output.confidences);
        let visible: [bool; NUM_KEYPOINTS] =
            std::array::from_fn(|i| confidences[i] >= VISIBILITY_THRESHOLD);

        let confident = points
            .iter()
            .zip(visible.iter())
            .filter_map(|(p, &v)| v.then_some(p));
        let bbox = match Rect::enclosing(confident) {
            Some(bbox) => bbox.ensure_croppable(config.template_factor),
            None => {
                debug!(frame_id = frame.frame_id, "no confident keypoint, box kept");
                state.bbox
            }
        };

        let keypoints = std::array::from_fn(|i| {
            let p = clip_point(&points[i], height, width, CLIP_MARGIN);
            Point2::new(p.x / width, p.y / height)
        });

        debug!(frame_id = frame.frame_id, ?bbox, "tracking step done");
        if let Some(state) = self.state.as_mut() {
            state.bbox = bbox;
            state.visible = visible;
            state.frame_id = frame.frame_id;
        }
        self.phase = TrackPhase::Tracking;

        Ok(TrackOutput {
            bbox,
            keypoints,
            confidences,
            visible,
        })
    }

    pub fn phase(&self) -> TrackPhase {
        self.phase
    }

    pub fn state(&self) -> Option<&TrackerState<P::Embedding>> {
        self.state.as_ref()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn predictor(&self) -> &P {
        &self.predictor
    }

    pub fn predictor_mut(&mut self) -> &mut P {
        &mut self.predictor
    }
}

fn frame_size(frame: &Frame) -> Result<(f32, f32)> {
    if frame.width == 0 || frame.height == 0 {
        return Err(TrackerError::InvalidImage(format!(
            "frame size {}x{} is empty",
            frame.width, frame.height
        )));
    }
    Ok((frame.width as f32, frame.height as f32))
}

/// Sample a template crop around `bbox` and embed it with `keypoints` mapped
/// into the crop.
fn embed_template<P: Predictor>(
    predictor: &mut P,
    config: &TrackerConfig,
    image: ArrayView3<'_, u8>,
    bbox: &Rect,
    keypoints: &Keypoints,
) -> Result<P::Embedding> {
    let crop = sample_target(image, bbox, config.template_factor, config.template_size)?;
    let points = std::array::from_fn(|i| {
        to_crop_space(
            &keypoints.points[i],
            bbox,
            crop.resize_factor,
            config.template_size,
            true,
        )
    });
    predictor
        .embed(&crop, &points, &keypoints.visibility)
        .map_err(TrackerError::predictor)
}
