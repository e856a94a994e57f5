use std::time::Duration;

/// Static path of the converted graph model, served next to the page.
pub const MODEL_URL: &str = "/models/retinopathy.onnx";

/// Script emitted by trunk for the `worker` bin.
pub const WORKER_PATH: &str = "./worker.js";

pub const MODEL_LOAD_TIMEOUT: Duration = Duration::from_secs(60);

pub const ANALYSIS_TIMEOUT: Duration = Duration::from_secs(30);
