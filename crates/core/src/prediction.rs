use serde::Serialize;

use crate::error::ClientError;
use crate::ids::RequestId;
use crate::image::SelectedImage;

/// Warning raised when submit is triggered with nothing to submit.
pub const NO_IMAGE_WARNING: &str = "Please select an image before submit.";
/// Generic page-level alert raised when a prediction fails.
pub const PREDICTION_FAILURE_ALERT: &str = "Oops! Something went wrong.";

/// Diagnosis returned by the prediction service. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub diagnosis: String,
    pub confidence: f64,
    pub recommendation: Option<String>,
}

impl PredictionResult {
    pub fn new(diagnosis: impl Into<String>, confidence: f64) -> Self {
        Self {
            diagnosis: diagnosis.into(),
            confidence,
            recommendation: None,
        }
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }
}

/// Externally visible prediction phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Previewing,
    Submitting,
    Resulted,
    Failed,
}

/// Why a submit action did not start a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    NoImage,
    InFlight { active: RequestId },
    AlreadyResulted,
}

/// Handle for the single in-flight `/predict` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictTicket {
    pub request_id: RequestId,
    pub data_uri: String,
}

/// What happened to a prediction completion.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionCompletion {
    Resulted(PredictionResult),
    Failed,
    /// The request was superseded by a new image or a clear.
    Stale,
}

// The result lives inside `Resulted` only.
#[derive(Debug, Clone, Default)]
enum SessionState {
    #[default]
    Idle,
    Previewing(SelectedImage),
    Submitting {
        image: SelectedImage,
        request_id: RequestId,
    },
    Resulted {
        image: SelectedImage,
        result: PredictionResult,
    },
    Failed(SelectedImage),
}

/// Owns the selected image, the in-flight request and the current diagnosis.
#[derive(Debug, Default)]
pub struct PredictionSession {
    state: SessionState,
    last_request_id: RequestId,
}

impl PredictionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        match self.state {
            SessionState::Idle => SessionPhase::Idle,
            SessionState::Previewing(_) => SessionPhase::Previewing,
            SessionState::Submitting { .. } => SessionPhase::Submitting,
            SessionState::Resulted { .. } => SessionPhase::Resulted,
            SessionState::Failed(_) => SessionPhase::Failed,
        }
    }

    pub fn image(&self) -> Option<&SelectedImage> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::Previewing(image)
            | SessionState::Submitting { image, .. }
            | SessionState::Resulted { image, .. }
            | SessionState::Failed(image) => Some(image),
        }
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        match &self.state {
            SessionState::Resulted { result, .. } => Some(result),
            _ => None,
        }
    }

    /// The current diagnosis label, read by the presenter and chat.
    pub fn diagnosis(&self) -> Option<&str> {
        self.result().map(|result| result.diagnosis.as_str())
    }

    pub fn active_request(&self) -> Option<RequestId> {
        match self.state {
            SessionState::Submitting { request_id, .. } => Some(request_id),
            _ => None,
        }
    }

    /// Installs a freshly decoded image from any phase, discarding any request or result.
    pub fn show_preview(&mut self, image: SelectedImage) {
        if let Some(request_id) = self.active_request() {
            tracing::debug!(%request_id, "new image supersedes in-flight prediction");
        }
        self.state = SessionState::Previewing(image);
    }

    pub fn begin_submit(&mut self) -> Result<PredictTicket, SubmitRejection> {
        let image = match std::mem::take(&mut self.state) {
            SessionState::Previewing(image) | SessionState::Failed(image) => image,
            other => {
                let rejection = match &other {
                    SessionState::Idle => SubmitRejection::NoImage,
                    SessionState::Submitting { request_id, .. } => SubmitRejection::InFlight {
                        active: *request_id,
                    },
                    _ => SubmitRejection::AlreadyResulted,
                };
                self.state = other;
                return Err(rejection);
            }
        };

        self.last_request_id = self.last_request_id.next();
        let ticket = PredictTicket {
            request_id: self.last_request_id,
            data_uri: image.data_uri().to_string(),
        };
        self.state = SessionState::Submitting {
            image,
            request_id: ticket.request_id,
        };
        tracing::info!(request_id = %ticket.request_id, "prediction submitted");
        Ok(ticket)
    }

    pub fn complete(
        &mut self,
        ticket: &PredictTicket,
        outcome: Result<PredictionResult, ClientError>,
    ) -> PredictionCompletion {
        if self.active_request() != Some(ticket.request_id) {
            tracing::debug!(request_id = %ticket.request_id, "dropping stale prediction response");
            return PredictionCompletion::Stale;
        }

        let SessionState::Submitting { image, .. } = std::mem::take(&mut self.state) else {
            return PredictionCompletion::Stale;
        };

        match outcome {
            Ok(result) => {
                tracing::info!(
                    request_id = %ticket.request_id,
                    diagnosis = %result.diagnosis,
                    confidence = result.confidence,
                    "prediction resulted"
                );
                self.state = SessionState::Resulted {
                    image,
                    result: result.clone(),
                };
                PredictionCompletion::Resulted(result)
            }
            Err(error) => {
                tracing::error!(
                    request_id = %ticket.request_id,
                    stage = error.stage(),
                    %error,
                    "prediction failed"
                );
                self.state = SessionState::Failed(image);
                PredictionCompletion::Failed
            }
        }
    }

    /// Back to Idle, discarding the image and any result.
    pub fn clear(&mut self) {
        self.state = SessionState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> SelectedImage {
        SelectedImage::from_data_uri("scalp.jpg", "data:image/jpeg;base64,/9j/4AAQ".to_string())
            .unwrap()
    }

    fn failure() -> ClientError {
        ClientError::Status {
            stage: "predict-status",
            endpoint: "/predict".to_string(),
            status: 500,
            body: String::new(),
        }
    }

    #[test]
    fn submit_without_image_is_rejected_without_phase_change() {
        let mut session = PredictionSession::new();

        assert_eq!(session.begin_submit(), Err(SubmitRejection::NoImage));
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[test]
    fn second_submit_while_submitting_is_a_noop() {
        let mut session = PredictionSession::new();
        session.show_preview(image());

        let ticket = session.begin_submit().unwrap();
        let again = session.begin_submit();

        assert_eq!(
            again,
            Err(SubmitRejection::InFlight {
                active: ticket.request_id
            })
        );
        assert_eq!(session.phase(), SessionPhase::Submitting);
        assert_eq!(ticket.data_uri, "data:image/jpeg;base64,/9j/4AAQ");
    }

    #[test]
    fn success_installs_result_and_new_image_clears_it() {
        let mut session = PredictionSession::new();
        session.show_preview(image());
        let ticket = session.begin_submit().unwrap();

        let completion = session.complete(&ticket, Ok(PredictionResult::new("Psoriasis", 0.77)));

        assert!(matches!(completion, PredictionCompletion::Resulted(_)));
        assert_eq!(session.diagnosis(), Some("Psoriasis"));
        assert_eq!(session.begin_submit(), Err(SubmitRejection::AlreadyResulted));

        session.show_preview(image());
        assert_eq!(session.phase(), SessionPhase::Previewing);
        assert_eq!(session.result(), None);
    }

    #[test]
    fn failure_keeps_image_and_allows_retry() {
        let mut session = PredictionSession::new();
        session.show_preview(image());
        let ticket = session.begin_submit().unwrap();

        assert_eq!(session.complete(&ticket, Err(failure())), PredictionCompletion::Failed);
        assert_eq!(session.phase(), SessionPhase::Failed);
        assert!(session.image().is_some());

        let retry = session.begin_submit().unwrap();
        assert!(retry.request_id > ticket.request_id);
    }

    #[test]
    fn response_after_new_image_is_stale() {
        let mut session = PredictionSession::new();
        session.show_preview(image());
        let ticket = session.begin_submit().unwrap();
        session.show_preview(image());

        let completion = session.complete(&ticket, Ok(PredictionResult::new("Head Lice", 0.5)));

        assert_eq!(completion, PredictionCompletion::Stale);
        assert_eq!(session.phase(), SessionPhase::Previewing);
        assert_eq!(session.result(), None);
    }

    #[test]
    fn clear_from_any_phase_returns_to_idle() {
        let mut session = PredictionSession::new();
        session.show_preview(image());
        let ticket = session.begin_submit().unwrap();
        session.clear();

        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.image().is_none());
        assert_eq!(
            session.complete(&ticket, Err(failure())),
            PredictionCompletion::Stale
        );
    }
}
