use crate::{canvas::ImageBuf, config};

use anyhow::{anyhow, bail};
use futures::{sink::SinkExt, StreamExt};
use gloo_worker::reactor::{reactor, ReactorScope};
use leptos::logging::{error, log};
use retinoscan::{image::DynamicImage, Classifier, Event, Prediction, RequestId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub id: RequestId,
    pub frame: ImageBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorkerEvent {
    ModelReady,
    ModelUnavailable { reason: String },
    Completed { id: RequestId, prediction: Prediction },
    Failed { id: RequestId, reason: String },
}

impl From<WorkerEvent> for Event {
    fn from(event: WorkerEvent) -> Self {
        match event {
            WorkerEvent::ModelReady => Event::ModelLoaded,
            WorkerEvent::ModelUnavailable { reason } => Event::ModelFailed(reason),
            WorkerEvent::Completed { id, prediction } => Event::Completed(id, prediction),
            WorkerEvent::Failed { id, reason } => Event::Failed(id, reason),
        }
    }
}

type Scope = ReactorScope<AnalysisRequest, WorkerEvent>;

async fn load_model() -> anyhow::Result<Classifier> {
    let clock = web_time::Instant::now();
    let response = gloo_net::http::Request::get(config::MODEL_URL)
        .send()
        .await
        .map_err(|e| anyhow!("fetch {}: {}", config::MODEL_URL, e))?;
    if !response.ok() {
        bail!("fetch {}: HTTP {}", config::MODEL_URL, response.status());
    }
    let bytes = response.binary().await?;
    log!("downloaded {} model bytes in {:?}", bytes.len(), clock.elapsed());

    let clock = web_time::Instant::now();
    let model = Classifier::from_bytes(&bytes)?;
    log!("parsed model in {:?}", clock.elapsed());
    Ok(model)
}

/// Owns the classifier. Announces the load outcome once, then answers
/// requests one at a time.
#[reactor]
pub async fn ModelReactor(mut scope: Scope) {
    log!("entered model reactor");
    let model = match load_model().await {
        Ok(model) => model,
        Err(e) => {
            error!("model load failed: {:?}", e);
            let reason = format!("{e:#}");
            if let Err(e) = scope.send(WorkerEvent::ModelUnavailable { reason }).await {
                error!("failed to report model load failure: {:?}", e);
            }
            return;
        }
    };
    if let Err(e) = start_worker(&mut scope, &model).await {
        error!("worker failed: {:?}", e);
    }
    log!("model reactor finished");
}

async fn start_worker(scope: &mut Scope, model: &Classifier) -> anyhow::Result<()> {
    scope.send(WorkerEvent::ModelReady).await?;
    log!("starting worker loop");
    loop {
        let Some(AnalysisRequest { id, frame }) = scope.next().await else {
            log!("no input for worker, returning");
            return Ok(());
        };
        let event = match analyse(model, &frame) {
            Ok(prediction) => WorkerEvent::Completed { id, prediction },
            Err(e) => {
                error!("analysis {} failed: {:?}", id, e);
                WorkerEvent::Failed {
                    id,
                    reason: format!("{e:#}"),
                }
            }
        };
        scope.send(event).await?;
    }
}

fn analyse(model: &Classifier, frame: &ImageBuf) -> anyhow::Result<Prediction> {
    let img = DynamicImage::ImageRgba8(frame.to_rgba_image()?).into_rgb8();
    let clock = web_time::Instant::now();
    let prediction = model.classify(&img)?;
    log!(
        "classified {}x{} frame as {} ({}%) in {:?}",
        img.width(),
        img.height(),
        prediction.stage,
        prediction.confidence,
        clock.elapsed()
    );
    Ok(prediction)
}
