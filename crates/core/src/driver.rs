//! Async continuations shared by every host.
//!
//! The controller lives in a `RefCell`; borrows never cross an `.await`, so a completion
//! always observes whatever the user did while the request was in flight.

use std::cell::RefCell;
use std::future::Future;

use crate::chat::{ChatCompletion, ChatTicket, SendRejection};
use crate::controller::DiagnosisController;
use crate::error::{ClientResult, DecodeResult};
use crate::image::{FileOrigin, SelectedImage};
use crate::prediction::{PredictTicket, PredictionCompletion, PredictionResult, SubmitRejection};
use crate::preview::DecodeOutcome;
use crate::protocol::{
    decode_chat_reply, decode_predict_reply, encode_chat_request, encode_predict_request,
};
use crate::transport::Transport;
use crate::view::Surface;

/// Re-renders the surface from the current model, then raises pending alerts.
pub fn publish<S>(controller: &RefCell<DiagnosisController>, surface: &S)
where
    S: Surface + ?Sized,
{
    let alerts = controller.borrow_mut().take_alerts();
    {
        let controller = controller.borrow();
        surface.render(&controller.view());
    }
    for alert in &alerts {
        surface.alert(alert);
    }
}

/// Applies a synchronous transition and publishes the result.
pub fn update<S, R>(
    controller: &RefCell<DiagnosisController>,
    surface: &S,
    transition: impl FnOnce(&mut DiagnosisController) -> R,
) -> R
where
    S: Surface + ?Sized,
{
    let outcome = {
        let mut guard = controller.borrow_mut();
        transition(&mut *guard)
    };
    publish(controller, surface);
    outcome
}

/// Selects the winning file of a batch and decodes it with the host's reader.
pub async fn select_and_decode<S, F, Fut>(
    controller: &RefCell<DiagnosisController>,
    surface: &S,
    origin: FileOrigin,
    files: impl IntoIterator<Item = F>,
    name_of: impl Fn(&F) -> String,
    decode: impl FnOnce(F) -> Fut,
) -> Option<DecodeOutcome>
where
    S: Surface + ?Sized,
    Fut: Future<Output = DecodeResult<SelectedImage>>,
{
    let selected = controller.borrow_mut().select_files(origin, files, name_of);
    publish(controller, surface);
    let (ticket, file) = selected?;

    let decoded = decode(file).await;
    let outcome = controller.borrow_mut().finish_decode(&ticket, decoded);
    publish(controller, surface);
    Some(outcome)
}

/// Runs one submit: at most one `/predict` request is ever in flight.
pub async fn submit_prediction<T, S>(
    controller: &RefCell<DiagnosisController>,
    transport: &T,
    surface: &S,
) -> Result<PredictionCompletion, SubmitRejection>
where
    T: Transport + ?Sized,
    S: Surface + ?Sized,
{
    let (submitted, path) = {
        let mut controller = controller.borrow_mut();
        let submitted = controller.submit();
        (submitted, controller.config().predict_path.clone())
    };
    publish(controller, surface);
    let ticket = submitted?;

    let outcome = request_prediction(transport, &path, &ticket).await;
    let completion = controller.borrow_mut().finish_prediction(&ticket, outcome);
    publish(controller, surface);
    Ok(completion)
}

/// Sends one chat message. A send while a reply is pending is rejected, never queued.
pub async fn send_chat_message<T, S>(
    controller: &RefCell<DiagnosisController>,
    transport: &T,
    surface: &S,
    input: &str,
) -> Result<ChatCompletion, SendRejection>
where
    T: Transport + ?Sized,
    S: Surface + ?Sized,
{
    let ticket = begin_chat_message(controller, surface, input)?;
    Ok(deliver_chat_message(controller, transport, surface, &ticket).await)
}

/// Echoes `input` into the transcript and hands out its ticket, without suspending.
pub fn begin_chat_message<S>(
    controller: &RefCell<DiagnosisController>,
    surface: &S,
    input: &str,
) -> Result<ChatTicket, SendRejection>
where
    S: Surface + ?Sized,
{
    update(controller, surface, |controller| controller.send_chat(input))
}

/// Runs the `/chat` round-trip for an accepted send and applies the reply.
pub async fn deliver_chat_message<T, S>(
    controller: &RefCell<DiagnosisController>,
    transport: &T,
    surface: &S,
    ticket: &ChatTicket,
) -> ChatCompletion
where
    T: Transport + ?Sized,
    S: Surface + ?Sized,
{
    let path = controller.borrow().config().chat_path.clone();
    let outcome = request_chat(transport, &path, ticket).await;
    let completion = controller.borrow_mut().finish_chat(ticket, outcome);
    publish(controller, surface);
    completion
}

async fn request_prediction<T>(
    transport: &T,
    path: &str,
    ticket: &PredictTicket,
) -> ClientResult<PredictionResult>
where
    T: Transport + ?Sized,
{
    let body = encode_predict_request(path, &ticket.data_uri)?;
    let reply = transport.post_json(path, body).await?;
    decode_predict_reply(path, reply)
}

async fn request_chat<T>(transport: &T, path: &str, ticket: &ChatTicket) -> ClientResult<String>
where
    T: Transport + ?Sized,
{
    let body = encode_chat_request(path, &ticket.message, &ticket.disease_context)?;
    let reply = transport.post_json(path, body).await?;
    decode_chat_reply(path, reply)
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    use futures::channel::oneshot;
    use futures::future::{self, LocalBoxFuture};
    use futures::FutureExt;

    use super::*;
    use crate::chat::ChatPhase;
    use crate::error::ClientError;
    use crate::prediction::SessionPhase;
    use crate::protocol::HttpReply;
    use crate::view::{Alert, ViewModel};

    #[derive(Default)]
    struct RecordingSurface {
        renders: Cell<usize>,
        alerts: RefCell<Vec<Alert>>,
    }

    impl Surface for RecordingSurface {
        fn render(&self, _view: &ViewModel<'_>) {
            self.renders.set(self.renders.get() + 1);
        }

        fn alert(&self, alert: &Alert) {
            self.alerts.borrow_mut().push(alert.clone());
        }
    }

    /// Answers each request with the next scripted reply, or holds it until released.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: RefCell<VecDeque<ClientResult<HttpReply>>>,
        gates: RefCell<VecDeque<oneshot::Receiver<ClientResult<HttpReply>>>>,
        calls: RefCell<Vec<(String, String)>>,
    }

    impl ScriptedTransport {
        fn reply(self, status: u16, body: &str) -> Self {
            self.replies.borrow_mut().push_back(Ok(HttpReply::new(status, body)));
            self
        }

        fn gated(&self) -> oneshot::Sender<ClientResult<HttpReply>> {
            let (sender, receiver) = oneshot::channel();
            self.gates.borrow_mut().push_back(receiver);
            sender
        }

        fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl Transport for ScriptedTransport {
        fn post_json<'a>(
            &'a self,
            path: &'a str,
            body: String,
        ) -> LocalBoxFuture<'a, ClientResult<HttpReply>> {
            self.calls.borrow_mut().push((path.to_string(), body));
            if let Some(gate) = self.gates.borrow_mut().pop_front() {
                return async move {
                    gate.await.unwrap_or_else(|_| {
                        Err(ClientError::Transport {
                            stage: "gate",
                            message: "gate dropped".to_string(),
                        })
                    })
                }
                .boxed_local();
            }
            let reply = self.replies.borrow_mut().pop_front().unwrap_or_else(|| {
                Err(ClientError::Transport {
                    stage: "script",
                    message: "no scripted reply".to_string(),
                })
            });
            future::ready(reply).boxed_local()
        }
    }

    async fn preview(
        controller: &RefCell<DiagnosisController>,
        surface: &RecordingSurface,
        name: &str,
    ) {
        select_and_decode(
            controller,
            surface,
            FileOrigin::Drop,
            [name.to_string()],
            |name: &String| name.clone(),
            |name| async move {
                SelectedImage::from_data_uri(name, "data:image/png;base64,iVBORw0KGgo".to_string())
            },
        )
        .await;
    }

    #[tokio::test]
    async fn submit_without_image_never_calls_transport() {
        let controller = RefCell::new(DiagnosisController::default());
        let transport = ScriptedTransport::default();
        let surface = RecordingSurface::default();

        let rejected = submit_prediction(&controller, &transport, &surface).await;

        assert_eq!(rejected, Err(SubmitRejection::NoImage));
        assert_eq!(transport.call_count(), 0);
        assert_eq!(controller.borrow().phase(), SessionPhase::Idle);
        assert_eq!(surface.alerts.borrow().len(), 1);
    }

    #[tokio::test]
    async fn repeated_submits_issue_one_request() {
        let controller = RefCell::new(DiagnosisController::default());
        let transport = ScriptedTransport::default();
        let surface = RecordingSurface::default();
        preview(&controller, &surface, "lesion.png").await;
        let release = transport.gated();

        let first = submit_prediction(&controller, &transport, &surface);
        let second = submit_prediction(&controller, &transport, &surface);
        let answer = async {
            release
                .send(Ok(HttpReply::new(200, r#"{"result":"Psoriasis","probability":0.66}"#)))
                .ok();
        };
        let (first, second, ()) = futures::join!(first, second, answer);

        assert!(matches!(first, Ok(PredictionCompletion::Resulted(_))));
        assert!(matches!(second, Err(SubmitRejection::InFlight { .. })));
        assert_eq!(transport.call_count(), 1);
        assert_eq!(controller.borrow().session().diagnosis(), Some("Psoriasis"));
    }

    #[tokio::test]
    async fn new_image_during_submit_discards_late_response() {
        let controller = RefCell::new(DiagnosisController::default());
        let transport = ScriptedTransport::default();
        let surface = RecordingSurface::default();
        preview(&controller, &surface, "first.png").await;
        let release = transport.gated();

        let submit = submit_prediction(&controller, &transport, &surface);
        let reselect = async {
            preview(&controller, &surface, "second.png").await;
            release
                .send(Ok(HttpReply::new(200, r#"{"result":"Head Lice","probability":0.5}"#)))
                .ok();
        };
        let (completion, ()) = futures::join!(submit, reselect);

        assert_eq!(completion, Ok(PredictionCompletion::Stale));
        let controller = controller.borrow();
        assert_eq!(controller.phase(), SessionPhase::Previewing);
        assert!(!controller.view().loader_visible);
        assert_eq!(controller.session().image().map(SelectedImage::name), Some("second.png"));
    }

    #[tokio::test]
    async fn chat_sends_are_serialized_end_to_end() {
        let controller = RefCell::new(DiagnosisController::default());
        let transport = ScriptedTransport::default()
            .reply(200, r#"{"result":"Melanoma","probability":0.9123}"#);
        let surface = RecordingSurface::default();
        preview(&controller, &surface, "mole.png").await;
        submit_prediction(&controller, &transport, &surface).await.unwrap();
        update(&controller, &surface, DiagnosisController::open_chat).unwrap();
        let release = transport.gated();

        let first = send_chat_message(&controller, &transport, &surface, "What are symptoms?");
        let second = send_chat_message(&controller, &transport, &surface, "Again?");
        let answer = async {
            release
                .send(Ok(HttpReply::new(200, r#"{"response":"Asymmetric moles."}"#)))
                .ok();
        };
        let (first, second, ()) = futures::join!(first, second, answer);

        assert!(matches!(first, Ok(ChatCompletion::Replied(_))));
        assert!(matches!(second, Err(SendRejection::AwaitingReply { .. })));
        assert_eq!(transport.call_count(), 2);
        assert_eq!(controller.borrow().chat().transcript().len(), 3);
        assert_eq!(controller.borrow().chat().phase(), ChatPhase::Open);
    }

    #[tokio::test]
    async fn accepted_send_is_echoed_before_the_request_runs() {
        let controller = RefCell::new(DiagnosisController::default());
        let transport = ScriptedTransport::default()
            .reply(200, r#"{"result":"Melanoma","probability":0.9123}"#)
            .reply(200, r#"{"response":"Often asymmetric."}"#);
        let surface = RecordingSurface::default();
        preview(&controller, &surface, "mole.png").await;
        submit_prediction(&controller, &transport, &surface).await.unwrap();
        update(&controller, &surface, DiagnosisController::open_chat).unwrap();

        let ticket = begin_chat_message(&controller, &surface, "What does it look like?").unwrap();
        assert_eq!(transport.call_count(), 1);
        assert_eq!(controller.borrow().chat().transcript().len(), 2);
        assert!(matches!(
            begin_chat_message(&controller, &surface, "Anything else?"),
            Err(SendRejection::AwaitingReply { .. })
        ));

        let completion = deliver_chat_message(&controller, &transport, &surface, &ticket).await;
        assert!(matches!(completion, ChatCompletion::Replied(_)));
        assert_eq!(transport.call_count(), 2);
        assert_eq!(controller.borrow().chat().transcript().len(), 3);
    }

    #[tokio::test]
    async fn blank_chat_send_never_calls_transport() {
        let controller = RefCell::new(DiagnosisController::default());
        let transport = ScriptedTransport::default()
            .reply(200, r#"{"result":"Melanoma","probability":0.9123}"#);
        let surface = RecordingSurface::default();
        preview(&controller, &surface, "mole.png").await;
        submit_prediction(&controller, &transport, &surface).await.unwrap();
        update(&controller, &surface, DiagnosisController::open_chat).unwrap();

        let rejected = send_chat_message(&controller, &transport, &surface, "   ").await;

        assert_eq!(rejected, Err(SendRejection::Blank));
        assert_eq!(transport.call_count(), 1);
        assert_eq!(controller.borrow().chat().transcript().len(), 1);
    }

    #[tokio::test]
    async fn every_transition_is_published() {
        let controller = RefCell::new(DiagnosisController::default());
        let transport = ScriptedTransport::default().reply(500, "");
        let surface = RecordingSurface::default();
        preview(&controller, &surface, "lesion.png").await;
        let before = surface.renders.get();

        let completion = submit_prediction(&controller, &transport, &surface).await;

        assert_eq!(completion, Ok(PredictionCompletion::Failed));
        assert_eq!(surface.renders.get(), before + 2);
        assert_eq!(
            surface.alerts.borrow().as_slice(),
            &[Alert::failure(crate::prediction::PREDICTION_FAILURE_ALERT)]
        );
    }
}
