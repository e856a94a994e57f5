use crate::preprocess::{preprocess, CH, IH, IW};
use crate::{ClassifierOptions, Confidence, Layout, Prediction, Stage, NUM_STAGES};
use std::{io, path::Path};

use image::{DynamicImage, RgbImage};
use tract_onnx::prelude::*;
use tract_onnx::prelude::tract_data::internal::bail;

type Model = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Forward pass of a graph model over one preprocessed batch.
pub trait Backend {
    fn layout(&self) -> Layout;

    /// Returns the class scores of the single batch item.
    fn forward(&self, blob: tract_ndarray::Array4<f32>) -> TractResult<Vec<f32>>;
}

#[derive(Debug, Clone)]
pub struct OnnxBackend {
    model: Model,
    layout: Layout,
}

impl OnnxBackend {
    pub fn from_model(model: Model, layout: Layout) -> TractResult<Self> {
        let num_outputs = model.model().output_outlets()?.len();
        if num_outputs != 1 {
            bail!("expected a single output, model has {}", num_outputs)
        }
        Ok(Self { model, layout })
    }
    pub fn from_bytes(model_bytes: &[u8], options: ClassifierOptions) -> TractResult<Self> {
        let shape = options.layout.shape(IH, IW, CH);
        let model = tract_onnx::onnx()
            .model_for_read(&mut io::BufReader::new(model_bytes))?
            .with_input_fact(0, f32::fact(shape).into())?
            .into_optimized()?
            .into_runnable()?;
        Self::from_model(model, options.layout)
    }
}

impl Backend for OnnxBackend {
    fn layout(&self) -> Layout {
        self.layout
    }

    fn forward(&self, blob: tract_ndarray::Array4<f32>) -> TractResult<Vec<f32>> {
        let outs = self.model.run(tvec!(Tensor::from(blob).into()))?;
        let scores = outs[0].to_array_view::<f32>()?;
        Ok(scores.iter().copied().collect())
    }
}

/// Fundus photo classifier: preprocessing, forward pass, arg-max.
#[derive(Debug, Clone)]
pub struct Classifier<B = OnnxBackend> {
    backend: B,
}

impl Classifier {
    pub fn from_bytes(model_bytes: &[u8]) -> TractResult<Self> {
        Self::from_bytes_with_options(model_bytes, ClassifierOptions::default())
    }
    pub fn from_bytes_with_options(
        model_bytes: &[u8],
        options: ClassifierOptions,
    ) -> TractResult<Self> {
        Ok(Self::with_backend(OnnxBackend::from_bytes(model_bytes, options)?))
    }
    pub fn from_path(path: impl AsRef<Path>) -> TractResult<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

impl<B: Backend> Classifier<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn classify(&self, img: &RgbImage) -> TractResult<Prediction> {
        let blob = preprocess(img, self.backend.layout())?;
        let scores = self.backend.forward(blob)?;
        prediction_from_scores(&scores)
    }

    pub fn classify_dynamic(&self, img: &DynamicImage) -> TractResult<Prediction> {
        self.classify(&img.to_rgb8())
    }
}

/// Reduces a score vector to the best stage. Ties go to the lower class index.
pub fn prediction_from_scores(scores: &[f32]) -> TractResult<Prediction> {
    if scores.len() != NUM_STAGES {
        bail!(
            "expected {} class scores, model produced {}",
            NUM_STAGES,
            scores.len()
        )
    }
    let Some((index, score)) = argmax(scores) else {
        bail!("model produced no finite class score")
    };
    let Some(stage) = Stage::from_index(index) else {
        bail!("class index {} out of range", index)
    };
    Ok(Prediction {
        stage,
        confidence: Confidence::from_score(score),
    })
}

fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, s)| s.is_finite())
        .fold(None, |best, (i, s)| match best {
            Some((_, b)) if b >= s => best,
            _ => Some((i, s)),
        })
}
