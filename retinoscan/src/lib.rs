mod model;
mod preprocess;
pub mod report;
mod schemas;
pub mod session;
mod stage;

pub use model::{prediction_from_scores, Backend, Classifier, OnnxBackend};
pub use preprocess::{nearest_source, preprocess, preprocess_dynamic, resize_nearest, CH, IH, IW};
pub use report::Report;
pub use schemas::*;
pub use session::{Blocked, Event, ModelStatus, RequestId, Session, Source, SourceKind};
pub use stage::*;

pub use image;

pub use tract_onnx;
pub use tract_onnx::prelude::TractResult;
