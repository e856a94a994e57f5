use crate::{
    bridge::{self, Deadline, ModelLink},
    canvas::{self, RenderState},
    config,
    download::download_text,
    worker::AnalysisRequest,
    Theme,
};
use leptos::{logging::*, prelude::*};
use leptos_use::{use_user_media, UseUserMediaReturn};
use retinoscan::{Event, ModelStatus, Report, RequestId, Session, SourceKind};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{js_sys, Url};

#[component]
pub fn App(#[prop(optional)] theme: Theme) -> impl IntoView {
    let video_ref = NodeRef::<leptos::html::Video>::new();
    let image_ref = NodeRef::<leptos::html::Img>::new();
    let file_ref = NodeRef::<leptos::html::Input>::new();
    let temporary_canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    let state = RenderState {
        video: video_ref,
        image: image_ref,
        temporary_canvas: temporary_canvas_ref,
    };

    let session = RwSignal::new(Session::default());
    let object_url = StoredValue::new(None::<String>);
    let link = StoredValue::new_local(ModelLink::connect(move |event| {
        dispatch(session, event.into())
    }));
    let load_timer = bridge::after(config::MODEL_LOAD_TIMEOUT, move || {
        dispatch(session, Event::ModelFailed("model did not load in time".to_string()))
    });
    let deadline = StoredValue::new(None::<Deadline>);
    Effect::new(move |_| {
        let pending = session.with(Session::pending);
        deadline.update_value(|slot| Deadline::settle(slot, pending));
    });

    let UseUserMediaReturn { stream, start, stop, .. } = use_user_media();

    Effect::new(move |_| {
        let Some(video) = video_ref.get() else {
            return;
        };
        match stream.get() {
            Some(Ok(stream)) => video.set_src_object(Some(&stream)),
            Some(Err(e)) => {
                let reason = js_error_message(&e);
                error!("failed to get media stream: {}", reason);
                dispatch(session, Event::CameraDenied(reason));
            }
            None => video.set_src_object(None),
        }
    });

    let on_upload = {
        let stop = stop.clone();
        move |_| {
            let Some(input) = file_ref.get_untracked() else {
                return;
            };
            let Some(file) = input.files().and_then(|files| files.get(0)) else {
                return;
            };
            let url = match Url::create_object_url_with_blob(&file) {
                Ok(url) => url,
                Err(e) => {
                    error!("failed to create object url: {:?}", e);
                    return;
                }
            };
            // the same file may be picked again
            input.set_value("");

            stop();
            dispatch(session, Event::ImageSelected);
            replace_object_url(object_url, Some(url.clone()));
            if let Some(img) = image_ref.get_untracked() {
                img.set_src(&url);
            }
        }
    };

    let on_camera = move |_| {
        dispatch(session, Event::CameraRequested);
        start();
        if canvas::has_frame(state, SourceKind::Camera) {
            dispatch(session, Event::SourceReady(SourceKind::Camera));
        }
    };

    let on_run = move |_| {
        let Some((id, kind)) = begin(session) else {
            return;
        };
        log!("starting analysis {} on {:?}", id, kind);
        let frame = match canvas::read_frame(state, kind) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("analysis {} has no frame: {:?}", id, e);
                dispatch(session, Event::FrameUnavailable(id));
                return;
            }
        };
        if let Err(e) = link.with_value(|link| link.send(AnalysisRequest { id, frame })) {
            error!("failed to send analysis {}: {:?}", id, e);
            dispatch(session, Event::Failed(id, e.to_string()));
            return;
        }
        let timer = bridge::after(config::ANALYSIS_TIMEOUT, move || {
            dispatch(session, Event::TimedOut(id))
        });
        deadline.update_value(|slot| {
            if let Some(previous) = slot.replace(Deadline::new(id, timer)) {
                previous.cancel();
            }
        });
    };

    on_cleanup(move || {
        stop();
        load_timer.abort();
        deadline.update_value(|slot| Deadline::settle(slot, None));
        link.with_value(ModelLink::close);
        replace_object_url(object_url, None);
    });

    let status = move || {
        session.with(|s| match s.model() {
            ModelStatus::Loading => ("badge loading", "Loading Model..."),
            ModelStatus::Ready => ("badge online", "AI System Online"),
            ModelStatus::Unavailable(_) => ("badge unavailable", "Model Unavailable"),
        })
    };
    let is_camera = move || session.with(|s| s.source().kind() == Some(SourceKind::Camera));

    view! {
      <div class=format!("layout {}", theme.class)>
        {theme.sidebar.then(|| view! { <Sidebar title=theme.title/> })}
        <main class="content">
          <header class="content-header">
            <h2>{theme.heading}</h2>
            <span class=move || status().0>{move || status().1}</span>
          </header>

          <section class="grid">
            <div class="card">
              <h3>"Acquisition"</h3>
              <div class="viewport">
                <video
                  node_ref=video_ref
                  class=move || if is_camera() { "frame" } else { "hidden" }
                  controls=false
                  autoplay=true
                  muted=true
                  on:loadeddata=move |_| dispatch(session, Event::SourceReady(SourceKind::Camera))
                ></video>
                <img
                  node_ref=image_ref
                  alt="Fundus photo"
                  class=move || if is_camera() { "hidden" } else { "frame contain" }
                  on:load=move |_| dispatch(session, Event::SourceReady(SourceKind::Image))
                  on:error=move |_| {
                      warn!("uploaded file could not be decoded as an image");
                      dispatch(
                          session,
                          Event::SourceFailed(SourceKind::Image, "unsupported or corrupt file".to_string()),
                      );
                  }
                />
              </div>
              <div class="controls">
                <input type="file" accept="image/*" hidden=true node_ref=file_ref on:change=on_upload/>
                <button
                  class="btn"
                  on:click=move |_| {
                      if let Some(input) = file_ref.get_untracked() {
                          input.click();
                      }
                  }
                >
                  "Upload"
                </button>
                <button class="btn" on:click=on_camera>"Camera"</button>
                <button
                  class="btn btn-primary"
                  disabled=move || !session.with(Session::can_run)
                  on:click=on_run
                >
                  {move || if session.with(Session::is_busy) { "Analyzing..." } else { "Run Analysis" }}
                </button>
              </div>
              {move || {
                  session
                      .with(|s| match s.model() {
                          ModelStatus::Unavailable(reason) => Some(format!("Model unavailable: {reason}")),
                          _ => s.notice().map(str::to_string),
                      })
                      .map(|notice| view! { <p class="notice">{notice}</p> })
              }}
              <canvas node_ref=temporary_canvas_ref style="display: none;"></canvas>
            </div>

            {move || session.with(|s| s.report().map(|report| result_card(&report)))}
          </section>
        </main>
      </div>
    }
}

#[component]
fn Sidebar(title: &'static str) -> impl IntoView {
    view! {
      <aside class="sidebar">
        <h1>{title}</h1>
        <nav>
          <div class="nav-item active">"Dashboard"</div>
          <div class="nav-item">"Analytics"</div>
          <div class="nav-item">"Records"</div>
        </nav>
      </aside>
    }
}

fn result_card(report: &Report<'_>) -> impl IntoView {
    let info = report.prediction.stage.info();
    let confidence = report.prediction.confidence.to_string();
    let file_name = report.file_name();
    let text = report.to_string();
    let on_download = move |_| {
        if let Err(e) = download_text(&file_name, &text) {
            error!("report download failed: {:?}", e);
        }
    };

    view! {
      <div class="card result">
        <h3>"Result"</h3>
        <div class="result-label" style=format!("color: {};", info.color)>
          <span class="icon">{info.icon}</span>
          {info.name}
        </div>
        <p class="muted">"Confidence Score: " {confidence} "%"</p>
        <p class="risk">"Risk tier: " {info.risk.label()}</p>
        <p class="muted">{info.description}</p>
        <button class="btn btn-dark wide" on:click=on_download>"Download Report"</button>
      </div>
    }
}

fn dispatch(session: RwSignal<Session>, event: Event) {
    let _ = session.try_update(|s| *s = std::mem::take(s).apply(event));
}

/// Opens a request if the session allows one.
fn begin(session: RwSignal<Session>) -> Option<(RequestId, SourceKind)> {
    session
        .try_update(|s| match s.start() {
            Ok((next, id)) => {
                let kind = next.pending_source();
                *s = next;
                kind.map(|kind| (id, kind))
            }
            Err(blocked) => {
                warn!("analysis refused: {}", blocked);
                None
            }
        })
        .flatten()
}

fn replace_object_url(store: StoredValue<Option<String>>, next: Option<String>) {
    let previous = store.try_update_value(|url| std::mem::replace(url, next)).flatten();
    if let Some(url) = previous {
        let _ = Url::revoke_object_url(&url).inspect_err(|e| {
            warn!("failed to revoke object url: {:?}", e);
        });
    }
}

fn js_error_message(value: &JsValue) -> String {
    value
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}
