//! Burn inference backend for keypoint prediction.
//!
//! This module provides a `BurnPredictor` that implements `Predictor` for
//! template/search model pairs built with the Burn framework.
//!
//! # Example
//!
//! ```ignore
//! use keypoint_tracker_rs::{BurnKeypointModel, BurnPredictor, KeypointTracker};
//! use burn::backend::NdArray;
//!
//! // Implement BurnKeypointModel for your template/search networks
//! struct MyTrackerModel { /* ... */ }
//!
//! impl BurnKeypointModel<NdArray> for MyTrackerModel {
//!     // load / embed / search
//! }
//!
//! let predictor = BurnPredictor::new(MyTrackerModel::default(), Default::default());
//! let mut tracker = KeypointTracker::with_default_config(predictor);
//! tracker.load("template.mpk", "search.mpk")?;
//! ```

use std::path::Path;

use burn::prelude::*;
use burn::tensor::Tensor;
use nalgebra::Point2;
use ndarray::{Array2, Array3};
use thiserror::Error;

use super::{Predictor, SearchOutput};
use crate::tracker::{Crop, NUM_KEYPOINTS};

/// Per-channel mean of the RGB normalization applied to crops.
const PIXEL_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// Per-channel standard deviation of the RGB normalization applied to crops.
const PIXEL_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Error type for Burn predictor failures.
#[derive(Debug, Clone, Error)]
pub enum BurnPredictorError {
    /// `embed` or `search` was called before `load`.
    #[error("model is not loaded")]
    NotLoaded,
    /// Loading the model records failed.
    #[error("failed to load model: {0}")]
    Load(String),
    /// Crop has the wrong number of channels.
    #[error("expected {expected} channels, got {got}")]
    InvalidChannels { expected: usize, got: usize },
    /// Model outputs have an unexpected layout.
    #[error("postprocessing error: {0}")]
    Postprocessing(String),
}

/// Trait for Burn-based template/search models.
///
/// Implement this trait for your specific model architecture. Tensors use the
/// following layouts:
/// * patch - `[1, 3, H, W]`, normalized RGB
/// * patch mask - `[1, H, W]`, `1.0` where the pixel is padding
/// * keypoints - `[1, K, 2]`, normalized template-crop coordinates
/// * keypoints mask - `[1, K]`, `1.0` where the keypoint is hidden
pub trait BurnKeypointModel<B: Backend> {
    /// Template features produced by the template network.
    type Embedding: Clone;

    /// Load template and search network records onto `device`.
    fn load(
        &mut self,
        template_resource: &Path,
        search_resource: &Path,
        device: &B::Device,
    ) -> Result<(), BurnPredictorError>;

    /// Run the template network.
    fn embed(
        &self,
        patch: Tensor<B, 4>,
        patch_mask: Tensor<B, 3>,
        keypoints: Tensor<B, 3>,
        keypoints_mask: Tensor<B, 2>,
    ) -> Self::Embedding;

    /// Run the search network. Returns keypoints `[1, K, 2]` in normalized
    /// search-crop coordinates and confidences `[1, K]`.
    fn search(
        &self,
        patch: Tensor<B, 4>,
        patch_mask: Tensor<B, 3>,
        static_embedding: &Self::Embedding,
        dynamic_embedding: &Self::Embedding,
    ) -> (Tensor<B, 3>, Tensor<B, 2>);
}

/// Burn-based keypoint predictor implementing `Predictor`.
pub struct BurnPredictor<B: Backend, M: BurnKeypointModel<B>> {
    model: M,
    device: B::Device,
    loaded: bool,
}

impl<B: Backend, M: BurnKeypointModel<B>> BurnPredictor<B, M> {
    /// Create a new Burn predictor with the given model and device.
    pub fn new(model: M, device: B::Device) -> Self {
        Self {
            model,
            device,
            loaded: false,
        }
    }

    /// Convert an HWC `u8` patch into a normalized `[1, 3, H, W]` tensor.
    pub fn preprocess_patch(&self, patch: &Array3<u8>) -> Result<Tensor<B, 4>, BurnPredictorError> {
        let (height, width, channels) = patch.dim();
        if channels != 3 {
            return Err(BurnPredictorError::InvalidChannels {
                expected: 3,
                got: channels,
            });
        }

        let mut data = Vec::with_capacity(3 * height * width);
        for c in 0..3 {
            for y in 0..height {
                for x in 0..width {
                    let value = patch[[y, x, c]] as f32 / 255.0;
                    data.push((value - PIXEL_MEAN[c]) / PIXEL_STD[c]);
                }
            }
        }

        Ok(Tensor::<B, 1>::from_floats(data.as_slice(), &self.device).reshape([
            1,
            3,
            height,
            width,
        ]))
    }

    /// Convert an attention mask into a `[1, H, W]` tensor flagging padding.
    pub fn preprocess_mask(&self, mask: &Array2<bool>) -> Tensor<B, 3> {
        let (height, width) = mask.dim();
        let data: Vec<f32> = mask.iter().map(|&real| if real { 0.0 } else { 1.0 }).collect();
        Tensor::<B, 1>::from_floats(data.as_slice(), &self.device).reshape([1, height, width])
    }

    fn ensure_loaded(&self) -> Result<(), BurnPredictorError> {
        if self.loaded {
            Ok(())
        } else {
            Err(BurnPredictorError::NotLoaded)
        }
    }
}

fn tensor_values<B: Backend, const D: usize>(
    tensor: Tensor<B, D>,
    expected: usize,
) -> Result<Vec<f32>, BurnPredictorError> {
    let values = tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| BurnPredictorError::Postprocessing(format!("{e:?}")))?;
    if values.len() != expected {
        return Err(BurnPredictorError::Postprocessing(format!(
            "expected {expected} values, got {}",
            values.len()
        )));
    }
    Ok(values)
}

impl<B: Backend, M: BurnKeypointModel<B>> Predictor for BurnPredictor<B, M> {
    type Embedding = M::Embedding;
    type Error = BurnPredictorError;

    fn load(
        &mut self,
        template_resource: &Path,
        search_resource: &Path,
    ) -> Result<(), Self::Error> {
        self.model
            .load(template_resource, search_resource, &self.device)?;
        self.loaded = true;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.loaded
    }

    fn embed(
        &mut self,
        crop: &Crop,
        keypoints: &[Point2<f32>; NUM_KEYPOINTS],
        keypoints_mask: &[bool; NUM_KEYPOINTS],
    ) -> Result<Self::Embedding, Self::Error> {
        self.ensure_loaded()?;
        let patch = self.preprocess_patch(&crop.patch)?;
        let patch_mask = self.preprocess_mask(&crop.attention_mask);

        let coords: Vec<f32> = keypoints.iter().flat_map(|p| [p.x, p.y]).collect();
        let joints = Tensor::<B, 1>::from_floats(coords.as_slice(), &self.device).reshape([
            1,
            NUM_KEYPOINTS,
            2,
        ]);
        let hidden: Vec<f32> = keypoints_mask
            .iter()
            .map(|&visible| if visible { 0.0 } else { 1.0 })
            .collect();
        let joints_mask = Tensor::<B, 1>::from_floats(hidden.as_slice(), &self.device)
            .reshape([1, NUM_KEYPOINTS]);

        Ok(self.model.embed(patch, patch_mask, joints, joints_mask))
    }

    fn search(
        &mut self,
        crop: &Crop,
        static_embedding: &Self::Embedding,
        dynamic_embedding: &Self::Embedding,
    ) -> Result<SearchOutput, Self::Error> {
        self.ensure_loaded()?;
        let patch = self.preprocess_patch(&crop.patch)?;
        let patch_mask = self.preprocess_mask(&crop.attention_mask);

        let (joints, logits) =
            self.model
                .search(patch, patch_mask, static_embedding, dynamic_embedding);
        let joints = tensor_values(joints, 2 * NUM_KEYPOINTS)?;
        let logits = tensor_values(logits, NUM_KEYPOINTS)?;

        Ok(SearchOutput {
            points: std::array::from_fn(|i| Point2::new(joints[2 * i], joints[2 * i + 1])),
            confidences: std::array::from_fn(|i| logits[i]),
        })
    }
}
