//! State of one analysis page.
//!
//! A [`Session`] is replaced, never mutated in place: every UI or worker event goes
//! through [`Session::apply`], and a run is opened with [`Session::start`].

use crate::{Prediction, Report};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ModelStatus {
    #[default]
    Loading,
    Ready,
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    Image,
    Camera,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Source {
    #[default]
    None,
    /// Chosen but without a frame yet: image still decoding, camera starting.
    Pending(SourceKind),
    Ready(SourceKind),
    CameraDenied(String),
}

impl Source {
    pub fn kind(&self) -> Option<SourceKind> {
        match self {
            Source::Pending(kind) | Source::Ready(kind) => Some(*kind),
            Source::None | Source::CameraDenied(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why the run action is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Blocked {
    #[error("model is still loading")]
    ModelLoading,
    #[error("model unavailable")]
    ModelUnavailable,
    #[error("no image or camera selected")]
    NoSource,
    #[error("source has no frame yet")]
    SourceNotReady,
    #[error("analysis already running")]
    Busy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ModelLoaded,
    ModelFailed(String),
    ImageSelected,
    CameraRequested,
    SourceReady(SourceKind),
    CameraDenied(String),
    /// The selected source could not be decoded or played.
    SourceFailed(SourceKind, String),
    /// The source had no frame when the request was about to be sent.
    FrameUnavailable(RequestId),
    Completed(RequestId, Prediction),
    Failed(RequestId, String),
    TimedOut(RequestId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    id: RequestId,
    source: SourceKind,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    model: ModelStatus,
    source: Source,
    pending: Option<InFlight>,
    issued: u64,
    prediction: Option<(Prediction, SourceKind)>,
    notice: Option<String>,
}

impl Session {
    pub fn model(&self) -> &ModelStatus {
        &self.model
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn pending(&self) -> Option<RequestId> {
        self.pending.map(|flight| flight.id)
    }

    /// Source the in-flight request was taken from.
    pub fn pending_source(&self) -> Option<SourceKind> {
        self.pending.map(|flight| flight.source)
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn prediction(&self) -> Option<&Prediction> {
        self.prediction.as_ref().map(|(prediction, _)| prediction)
    }

    pub fn report(&self) -> Option<Report<'_>> {
        self.prediction
            .as_ref()
            .map(|(prediction, source)| Report::new(prediction, *source))
    }

    /// Last user-facing message: camera denial, timeout, failed analysis.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn blocker(&self) -> Option<Blocked> {
        match (&self.model, &self.source) {
            (ModelStatus::Loading, _) => Some(Blocked::ModelLoading),
            (ModelStatus::Unavailable(_), _) => Some(Blocked::ModelUnavailable),
            _ if self.pending.is_some() => Some(Blocked::Busy),
            (_, Source::None | Source::CameraDenied(_)) => Some(Blocked::NoSource),
            (_, Source::Pending(_)) => Some(Blocked::SourceNotReady),
            (ModelStatus::Ready, Source::Ready(_)) => None,
        }
    }

    pub fn can_run(&self) -> bool {
        self.blocker().is_none()
    }

    /// Opens a request. The session stays busy until a reply, a timeout or a
    /// source change settles it.
    pub fn start(&self) -> Result<(Session, RequestId), Blocked> {
        if let Some(blocked) = self.blocker() {
            return Err(blocked);
        }
        let source = self.source.kind().ok_or(Blocked::NoSource)?;
        let id = RequestId(self.issued + 1);
        let next = Session {
            pending: Some(InFlight { id, source }),
            issued: id.0,
            notice: None,
            ..self.clone()
        };
        Ok((next, id))
    }

    pub fn apply(self, event: Event) -> Session {
        match event {
            Event::ModelLoaded => match self.model {
                ModelStatus::Loading => Session {
                    model: ModelStatus::Ready,
                    ..self
                },
                _ => self,
            },
            Event::ModelFailed(reason) => match self.model {
                ModelStatus::Loading => Session {
                    model: ModelStatus::Unavailable(reason),
                    ..self
                },
                _ => self,
            },
            Event::ImageSelected => self.switch_source(Source::Pending(SourceKind::Image)),
            Event::CameraRequested => self.switch_source(Source::Pending(SourceKind::Camera)),
            Event::SourceReady(kind) => match self.source {
                Source::Pending(current) if current == kind => Session {
                    source: Source::Ready(kind),
                    ..self
                },
                _ => self,
            },
            Event::CameraDenied(reason) => match self.source {
                Source::Pending(SourceKind::Camera) | Source::Ready(SourceKind::Camera) => {
                    Session {
                        source: Source::CameraDenied(reason.clone()),
                        pending: None,
                        notice: Some(format!("Camera unavailable: {reason}")),
                        ..self
                    }
                }
                _ => self,
            },
            Event::SourceFailed(kind, reason) => match self.source.kind() {
                Some(current) if current == kind => {
                    let what = match kind {
                        SourceKind::Image => "Image could not be decoded",
                        SourceKind::Camera => "Camera stream failed",
                    };
                    Session {
                        source: Source::None,
                        pending: None,
                        notice: Some(format!("{what}: {reason}")),
                        ..self
                    }
                }
                _ => self,
            },
            Event::FrameUnavailable(id) => match self.pending {
                Some(flight) if flight.id == id => {
                    let source = match self.source {
                        Source::Ready(kind) => Source::Pending(kind),
                        other => other,
                    };
                    Session {
                        source,
                        pending: None,
                        notice: Some(
                            "No frame available yet, try again in a moment.".to_string(),
                        ),
                        ..self
                    }
                }
                _ => self,
            },
            Event::Completed(id, prediction) => match self.pending {
                Some(flight) if flight.id == id => Session {
                    pending: None,
                    prediction: Some((prediction, flight.source)),
                    notice: None,
                    ..self
                },
                _ => self,
            },
            Event::Failed(id, reason) => match self.pending {
                Some(flight) if flight.id == id => Session {
                    pending: None,
                    notice: Some(format!("Analysis failed: {reason}")),
                    ..self
                },
                _ => self,
            },
            Event::TimedOut(id) => match self.pending {
                Some(flight) if flight.id == id => Session {
                    pending: None,
                    notice: Some("Analysis timed out.".to_string()),
                    ..self
                },
                _ => self,
            },
        }
    }

    fn switch_source(self, source: Source) -> Session {
        Session {
            source,
            pending: None,
            notice: None,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Confidence, Stage};

    fn ready_session() -> Session {
        Session::default()
            .apply(Event::ModelLoaded)
            .apply(Event::ImageSelected)
            .apply(Event::SourceReady(SourceKind::Image))
    }

    fn prediction(stage: Stage, score: f32) -> Prediction {
        Prediction {
            stage,
            confidence: Confidence::from_score(score),
        }
    }

    #[test]
    fn run_is_disabled_until_model_and_source_are_ready() {
        let session = Session::default();
        assert_eq!(session.blocker(), Some(Blocked::ModelLoading));

        let session = session.apply(Event::ImageSelected);
        assert_eq!(session.blocker(), Some(Blocked::ModelLoading));

        let session = session.apply(Event::ModelLoaded);
        assert_eq!(session.blocker(), Some(Blocked::SourceNotReady));

        let session = session.apply(Event::SourceReady(SourceKind::Image));
        assert!(session.can_run());
    }

    #[test]
    fn model_ready_without_source_is_blocked() {
        let session = Session::default().apply(Event::ModelLoaded);
        assert_eq!(session.blocker(), Some(Blocked::NoSource));
    }

    #[test]
    fn model_failure_disables_run_for_good() {
        let session = Session::default()
            .apply(Event::ModelFailed("404".into()))
            .apply(Event::ImageSelected)
            .apply(Event::SourceReady(SourceKind::Image))
            .apply(Event::ModelLoaded);
        assert_eq!(session.model(), &ModelStatus::Unavailable("404".into()));
        assert_eq!(session.start().unwrap_err(), Blocked::ModelUnavailable);
    }

    #[test]
    fn second_run_is_refused_while_one_is_pending() {
        let (busy, _) = ready_session().start().unwrap();
        assert_eq!(busy.start().unwrap_err(), Blocked::Busy);
    }

    #[test]
    fn completion_replaces_prediction() {
        let (busy, first) = ready_session().start().unwrap();
        let done = busy.apply(Event::Completed(first, prediction(Stage::MildNpdr, 0.8)));
        assert!(done.can_run());

        let (busy, second) = done.start().unwrap();
        assert_ne!(first, second);
        let done = busy.apply(Event::Completed(second, prediction(Stage::ProliferativeDr, 0.9)));
        assert_eq!(done.prediction().unwrap().stage, Stage::ProliferativeDr);
    }

    #[test]
    fn stale_replies_are_ignored() {
        let (busy, id) = ready_session().start().unwrap();
        let timed_out = busy.apply(Event::TimedOut(id));
        assert_eq!(timed_out.notice(), Some("Analysis timed out."));

        let late = timed_out
            .clone()
            .apply(Event::Completed(id, prediction(Stage::SevereNpdr, 0.7)));
        assert_eq!(late, timed_out);
        assert!(late.prediction().is_none());
    }

    #[test]
    fn switching_source_drops_the_pending_request() {
        let (busy, id) = ready_session().start().unwrap();
        let switched = busy.apply(Event::CameraRequested);
        assert!(!switched.is_busy());
        assert_eq!(switched.blocker(), Some(Blocked::SourceNotReady));

        let after = switched.apply(Event::Completed(id, prediction(Stage::MildNpdr, 0.5)));
        assert!(after.prediction().is_none());
    }

    #[test]
    fn camera_denial_is_reported() {
        let session = Session::default()
            .apply(Event::ModelLoaded)
            .apply(Event::CameraRequested)
            .apply(Event::CameraDenied("NotAllowedError".into()));
        assert_eq!(session.blocker(), Some(Blocked::NoSource));
        assert_eq!(
            session.notice(),
            Some("Camera unavailable: NotAllowedError")
        );
    }

    #[test]
    fn camera_denial_after_switching_to_image_is_ignored() {
        let session = ready_session().apply(Event::CameraDenied("late".into()));
        assert!(session.can_run());
    }

    #[test]
    fn undecodable_image_is_reported() {
        let session = Session::default()
            .apply(Event::ModelLoaded)
            .apply(Event::ImageSelected)
            .apply(Event::SourceFailed(SourceKind::Image, "unsupported format".into()));
        assert_eq!(session.source(), &Source::None);
        assert_eq!(session.blocker(), Some(Blocked::NoSource));
        assert_eq!(
            session.notice(),
            Some("Image could not be decoded: unsupported format")
        );
    }

    #[test]
    fn failure_of_another_source_is_ignored() {
        let session = ready_session().apply(Event::SourceFailed(SourceKind::Camera, "stale".into()));
        assert!(session.can_run());
        assert_eq!(session.notice(), None);

        let (busy, _) = ready_session().start().unwrap();
        let failed = busy.apply(Event::SourceFailed(SourceKind::Image, "gone".into()));
        assert!(!failed.is_busy());
        assert_eq!(failed.blocker(), Some(Blocked::NoSource));
    }

    #[test]
    fn missing_frame_puts_source_back_to_pending() {
        let (busy, id) = ready_session().start().unwrap();
        let session = busy.apply(Event::FrameUnavailable(id));
        assert_eq!(session.source(), &Source::Pending(SourceKind::Image));
        assert_eq!(session.blocker(), Some(Blocked::SourceNotReady));
    }

    #[test]
    fn readiness_of_the_other_source_is_ignored() {
        let session = Session::default()
            .apply(Event::ModelLoaded)
            .apply(Event::CameraRequested)
            .apply(Event::SourceReady(SourceKind::Image));
        assert_eq!(session.source(), &Source::Pending(SourceKind::Camera));
    }

    #[test]
    fn report_remembers_where_the_frame_came_from() {
        let session = Session::default()
            .apply(Event::ModelLoaded)
            .apply(Event::CameraRequested)
            .apply(Event::SourceReady(SourceKind::Camera));
        let (busy, id) = session.start().unwrap();
        assert_eq!(busy.pending_source(), Some(SourceKind::Camera));

        let done = busy
            .apply(Event::Completed(id, prediction(Stage::MildNpdr, 0.8)))
            .apply(Event::ImageSelected);
        assert_eq!(done.report().unwrap().source, SourceKind::Camera);
    }

    #[test]
    fn failure_keeps_previous_prediction() {
        let (busy, id) = ready_session().start().unwrap();
        let done = busy.apply(Event::Completed(id, prediction(Stage::MildNpdr, 0.8)));
        let (busy, id) = done.start().unwrap();
        let failed = busy.apply(Event::Failed(id, "oom".into()));
        assert_eq!(failed.prediction().unwrap().stage, Stage::MildNpdr);
        assert_eq!(failed.notice(), Some("Analysis failed: oom"));
        assert!(failed.can_run());
    }
}
