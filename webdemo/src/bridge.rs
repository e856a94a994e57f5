use crate::{
    config,
    worker::{AnalysisRequest, ModelReactor, WorkerEvent},
};
use std::time::Duration;

use anyhow::{anyhow, Result as AnyhowResult};
use futures::{
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
    future::{AbortHandle, Abortable},
    stream::{SplitSink, SplitStream},
    StreamExt,
};
use gloo_worker::{reactor::ReactorBridge, Spawnable};
use leptos::{logging::*, task::spawn_local};
use retinoscan::RequestId;

type Reactor = ReactorBridge<ModelReactor>;
type Sink = SplitSink<Reactor, AnalysisRequest>;
type Stream = SplitStream<Reactor>;

/// Page side of the model worker.
#[derive(Debug)]
pub struct ModelLink {
    requests: UnboundedSender<AnalysisRequest>,
    listener: AbortHandle,
}

impl ModelLink {
    /// Spawns the worker. `on_event` runs on the page for every worker reply.
    pub fn connect(on_event: impl Fn(WorkerEvent) + 'static) -> Self {
        let (sink, stream) = ModelReactor::spawner().spawn(config::WORKER_PATH).split();
        let (requests, queued) = mpsc::unbounded();
        start_forwarder(queued, sink);

        let (listener, registration) = AbortHandle::new_pair();
        spawn_local(async move {
            if Abortable::new(listen(stream, on_event), registration)
                .await
                .is_err()
            {
                log!("model worker listener aborted");
            }
        });
        Self { requests, listener }
    }

    pub fn send(&self, request: AnalysisRequest) -> AnyhowResult<()> {
        self.requests
            .unbounded_send(request)
            .map_err(|e| anyhow!("model worker is gone: {}", e))
    }

    /// Stops listening and lets the worker bridge drop.
    pub fn close(&self) {
        self.requests.close_channel();
        self.listener.abort();
    }
}

fn start_forwarder(queued: UnboundedReceiver<AnalysisRequest>, sink: Sink) {
    spawn_local(async move {
        if let Err(e) = queued.map(Ok).forward(sink).await {
            error!("forwarding to model worker failed: {:?}", e);
        }
        log!("request channel closed");
    });
}

async fn listen(mut stream: Stream, on_event: impl Fn(WorkerEvent)) {
    while let Some(event) = stream.next().await {
        on_event(event);
    }
    log!("model worker stream ended");
}

/// Runs `f` once `delay` has passed, unless the returned handle is aborted first.
pub fn after(delay: Duration, f: impl FnOnce() + 'static) -> AbortHandle {
    let (handle, registration) = AbortHandle::new_pair();
    spawn_local(async move {
        if Abortable::new(gloo_timers::future::sleep(delay), registration)
            .await
            .is_ok()
        {
            f();
        }
    });
    handle
}

/// Timeout timer of one analysis request.
#[derive(Debug)]
pub struct Deadline {
    id: RequestId,
    timer: AbortHandle,
}

impl Deadline {
    pub fn new(id: RequestId, timer: AbortHandle) -> Self {
        Self { id, timer }
    }

    pub fn cancel(&self) {
        self.timer.abort();
    }

    /// Cancels the timer in `slot` once its request is no longer pending.
    pub fn settle(slot: &mut Option<Deadline>, pending: Option<RequestId>) {
        match slot.take() {
            Some(deadline) if pending == Some(deadline.id) => *slot = Some(deadline),
            Some(deadline) => deadline.cancel(),
            None => {}
        }
    }
}
