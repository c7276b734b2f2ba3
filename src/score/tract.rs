//! ONNX classifier backed by tract.
//!
//! Available when the `tract` feature is enabled. The model is loaded from a
//! local file with its input fixed to a batch of one, so a scoring call runs
//! inference once per crop on the CPU. The pipeline still hands over the
//! whole batch in a single [`Classifier::classify`] call. No network access
//! and no writes happen after loading.

use std::path::Path;

use tract_onnx::prelude::*;

use crate::candidate::Crop;
use crate::score::Classifier;
use crate::util::{PyrScanError, PyrScanResult};

/// Memory layout of the model's image input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TensorLayout {
    /// `[batch, channels, height, width]` (torchvision exports).
    #[default]
    Nchw,
    /// `[batch, height, width, channels]` (Keras exports).
    Nhwc,
}

/// Tract-based classifier returning the model's raw output row per crop.
///
/// Crops are run through the model one at a time, in batch order.
pub struct TractClassifier {
    model: TypedRunnableModel<TypedModel>,
    width: usize,
    height: usize,
    channels: usize,
    layout: TensorLayout,
}

fn scoring_err(context: &str, err: impl std::fmt::Display) -> PyrScanError {
    PyrScanError::Scoring {
        reason: format!("{context}: {err}"),
    }
}

impl TractClassifier {
    /// Loads an ONNX model and fixes its input to a single crop of
    /// `width` x `height` x 3.
    pub fn load<P: AsRef<Path>>(
        model_path: P,
        width: usize,
        height: usize,
        layout: TensorLayout,
    ) -> PyrScanResult<Self> {
        let model_path = model_path.as_ref();
        let shape = match layout {
            TensorLayout::Nchw => tvec!(1, 3, height, width),
            TensorLayout::Nhwc => tvec!(1, height, width, 3),
        };
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .map_err(|err| {
                scoring_err(
                    &format!("failed to load ONNX model from {}", model_path.display()),
                    err,
                )
            })?
            .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), shape))
            .map_err(|err| scoring_err("failed to set input fact", err))?
            .into_optimized()
            .map_err(|err| scoring_err("failed to optimize ONNX model", err))?
            .into_runnable()
            .map_err(|err| scoring_err("failed to build runnable ONNX model", err))?;

        Ok(Self {
            model,
            width,
            height,
            channels: 3,
            layout,
        })
    }

    fn build_input(&self, crop: &Crop) -> PyrScanResult<Tensor> {
        if crop.width() != self.width
            || crop.height() != self.height
            || crop.channels() != self.channels
        {
            return Err(PyrScanError::Scoring {
                reason: format!(
                    "crop {}x{}x{} does not match model input {}x{}x{}",
                    crop.width(),
                    crop.height(),
                    crop.channels(),
                    self.width,
                    self.height,
                    self.channels
                ),
            });
        }
        let tensor = match self.layout {
            TensorLayout::Nchw => tract_ndarray::Array4::from_shape_vec(
                (1, self.channels, self.height, self.width),
                crop.to_chw(),
            ),
            TensorLayout::Nhwc => tract_ndarray::Array4::from_shape_vec(
                (1, self.height, self.width, self.channels),
                crop.data().to_vec(),
            ),
        }
        .map_err(|err| scoring_err("input tensor shape", err))?;
        Ok(tensor.into_tensor())
    }
}

impl Classifier for TractClassifier {
    fn classify(&mut self, crops: &[Crop]) -> PyrScanResult<Vec<Vec<f32>>> {
        let mut rows = Vec::with_capacity(crops.len());
        for crop in crops {
            let input = self.build_input(crop)?;
            let outputs = self
                .model
                .run(tvec!(input.into()))
                .map_err(|err| scoring_err("ONNX inference failed", err))?;
            let output = outputs.first().ok_or_else(|| PyrScanError::Scoring {
                reason: "model produced no outputs".to_string(),
            })?;
            let scores = output
                .to_array_view::<f32>()
                .map_err(|err| scoring_err("model output tensor was not f32", err))?;
            rows.push(scores.iter().copied().collect());
        }
        Ok(rows)
    }
}
