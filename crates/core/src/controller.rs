use crate::chat::{
    ChatCompletion, ChatPhase, ChatSession, ChatTicket, OpenChatRejection, SendRejection,
    TYPING_INDICATOR,
};
use crate::config::ClientConfig;
use crate::error::{ClientError, DecodeError};
use crate::ids::Generation;
use crate::image::{DragEventKind, FileOrigin, ImageSource, SelectedImage};
use crate::prediction::{
    NO_IMAGE_WARNING, PREDICTION_FAILURE_ALERT, PredictTicket, PredictionCompletion,
    PredictionResult, PredictionSession, SessionPhase, SubmitRejection,
};
use crate::presenter::ResultPresenter;
use crate::preview::{DecodeOutcome, DecodeTicket, PreviewRenderer};
use crate::view::{Alert, ChatPanelView, PreviewView, UploadView, ViewModel};

/// Single source of truth for the page: both state machines plus their derived surfaces.
///
/// Every operation is synchronous. Asynchronous work is split into a `begin` call that
/// hands out a ticket and a `finish` call that only applies while that ticket is current.
#[derive(Debug)]
pub struct DiagnosisController {
    config: ClientConfig,
    source: ImageSource,
    preview: PreviewRenderer,
    session: PredictionSession,
    presenter: ResultPresenter,
    chat: ChatSession,
    image_revision: Generation,
    alerts: Vec<Alert>,
}

impl Default for DiagnosisController {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl DiagnosisController {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config: config.normalized(),
            source: ImageSource::new(),
            preview: PreviewRenderer::new(),
            session: PredictionSession::new(),
            presenter: ResultPresenter::new(),
            chat: ChatSession::new(),
            image_revision: Generation::default(),
            alerts: Vec::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase()
    }

    pub fn session(&self) -> &PredictionSession {
        &self.session
    }

    pub fn presenter(&self) -> &ResultPresenter {
        &self.presenter
    }

    pub fn chat(&self) -> &ChatSession {
        &self.chat
    }

    pub fn drag(&mut self, kind: DragEventKind) {
        self.source.on_drag_event(kind);
    }

    /// Accepts a batch of files and starts decoding the one that wins the preview slot.
    pub fn select_files<F>(
        &mut self,
        origin: FileOrigin,
        files: impl IntoIterator<Item = F>,
        name_of: impl Fn(&F) -> String,
    ) -> Option<(DecodeTicket, F)> {
        let file = self.source.accept(origin, files)?;
        let ticket = self.preview.begin(name_of(&file));
        Some((ticket, file))
    }

    pub fn finish_decode(
        &mut self,
        ticket: &DecodeTicket,
        decoded: Result<SelectedImage, DecodeError>,
    ) -> DecodeOutcome {
        let outcome = self.preview.complete(ticket, decoded);
        if let DecodeOutcome::Displayed(image) = &outcome {
            self.session.show_preview(image.clone());
            self.presenter.invalidate();
            self.chat.unbind();
            self.image_revision = ticket.generation;
        }
        outcome
    }

    pub fn submit(&mut self) -> Result<PredictTicket, SubmitRejection> {
        let submitted = self.session.begin_submit();
        match &submitted {
            Err(SubmitRejection::NoImage) => {
                self.alerts.push(Alert::warning(NO_IMAGE_WARNING));
            }
            Err(rejection) => {
                tracing::debug!(?rejection, "submit ignored");
            }
            Ok(_) => {}
        }
        submitted
    }

    pub fn finish_prediction(
        &mut self,
        ticket: &PredictTicket,
        outcome: Result<PredictionResult, ClientError>,
    ) -> PredictionCompletion {
        let completion = self.session.complete(ticket, outcome);
        match &completion {
            PredictionCompletion::Resulted(result) => {
                let context = self.presenter.present(result);
                self.chat.bind(context);
            }
            PredictionCompletion::Failed => {
                self.alerts.push(Alert::failure(PREDICTION_FAILURE_ALERT));
            }
            PredictionCompletion::Stale => {}
        }
        completion
    }

    /// Discards the image, result and transcript and supersedes everything in flight.
    pub fn clear(&mut self) {
        self.preview.clear();
        self.session.clear();
        self.presenter.invalidate();
        self.chat.clear();
        self.image_revision = self.preview.generation();
        tracing::info!("session cleared");
    }

    pub fn open_chat(&mut self) -> Result<(), OpenChatRejection> {
        self.chat.open()?;
        self.presenter.set_chat_open(true);
        Ok(())
    }

    pub fn close_chat(&mut self) {
        self.chat.close();
        self.presenter.set_chat_open(false);
    }

    pub fn send_chat(&mut self, input: &str) -> Result<ChatTicket, SendRejection> {
        self.chat.begin_send(input)
    }

    pub fn finish_chat(
        &mut self,
        ticket: &ChatTicket,
        outcome: Result<String, ClientError>,
    ) -> ChatCompletion {
        self.chat.complete(ticket, outcome)
    }

    /// Drains alerts raised since the last call.
    pub fn take_alerts(&mut self) -> Vec<Alert> {
        std::mem::take(&mut self.alerts)
    }

    pub fn view(&self) -> ViewModel<'_> {
        let phase = self.session.phase();
        let image = self.session.image();
        let chat_phase = self.chat.phase();

        ViewModel {
            phase,
            upload: UploadView {
                hovering: self.source.is_hovering(),
                placeholder_visible: image.is_none(),
                notice: self.preview.notice(),
            },
            preview: PreviewView {
                visible: image.is_some(),
                image_uri: image.map(SelectedImage::display_uri),
                file_name: image.map(SelectedImage::name),
                loading: phase == SessionPhase::Submitting,
                revision: self.image_revision,
            },
            loader_visible: phase == SessionPhase::Submitting,
            submit_enabled: matches!(phase, SessionPhase::Previewing | SessionPhase::Failed),
            result: self.presenter.result(),
            recommendation: self.presenter.recommendation(),
            chat_toggle: self.presenter.toggle(),
            chat: ChatPanelView {
                phase: chat_phase,
                visible: chat_phase != ChatPhase::Closed,
                messages: self.chat.transcript(),
                typing_indicator: self.chat.is_typing().then_some(TYPING_INDICATOR),
                send_enabled: chat_phase == ChatPhase::Open,
            },
        }
    }
}
