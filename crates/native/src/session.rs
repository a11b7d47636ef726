use std::cell::RefCell;
use std::path::{Path, PathBuf};

use derma_core::driver::{select_and_decode, send_chat_message, submit_prediction, update};
use derma_core::{
    Alert, AlertLevel, ChatCompletion, ChatMessage, ClientConfig, DecodeError, DecodeOutcome,
    DiagnosisController, FileOrigin, OpenChatRejection, PredictionCompletion, PredictionResult,
    SelectedImage, SendRejection, SessionPhase, SubmitRejection, Surface, Transport, ViewModel,
};

use crate::transport::ReqwestTransport;

/// Surface that reports every render through `tracing` and keeps raised alerts for the caller.
#[derive(Debug, Default)]
pub struct TracingSurface {
    alerts: RefCell<Vec<Alert>>,
}

impl TracingSurface {
    pub fn take_alerts(&self) -> Vec<Alert> {
        self.alerts.take()
    }
}

impl Surface for TracingSurface {
    fn render(&self, view: &ViewModel<'_>) {
        tracing::debug!(
            phase = ?view.phase,
            loader = view.loader_visible,
            submit_enabled = view.submit_enabled,
            chat = ?view.chat.phase,
            messages = view.chat.messages.len(),
            "view updated"
        );
    }

    fn alert(&self, alert: &Alert) {
        match alert.level {
            AlertLevel::Warning => tracing::warn!(message = %alert.message, "alert"),
            AlertLevel::Failure => tracing::error!(message = %alert.message, "alert"),
        }
        self.alerts.borrow_mut().push(alert.clone());
    }
}

/// Terminal host: images come from disk, requests go through a [`Transport`].
pub struct NativeSession<T = ReqwestTransport> {
    controller: RefCell<DiagnosisController>,
    transport: T,
    surface: TracingSurface,
}

impl NativeSession<ReqwestTransport> {
    pub fn connect(config: ClientConfig) -> derma_core::ClientResult<Self> {
        let config = config.normalized();
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T> NativeSession<T>
where
    T: Transport,
{
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            controller: RefCell::new(DiagnosisController::new(config)),
            transport,
            surface: TracingSurface::default(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.controller.borrow().phase()
    }

    pub fn result(&self) -> Option<PredictionResult> {
        self.controller.borrow().session().result().cloned()
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.controller.borrow().chat().transcript().to_vec()
    }

    /// Recommendation text as it would be shown, if any.
    pub fn recommendation(&self) -> Option<String> {
        let controller = self.controller.borrow();
        let panel = controller.presenter().recommendation();
        panel.visible.then(|| panel.text.clone())
    }

    pub fn take_alerts(&self) -> Vec<Alert> {
        self.surface.take_alerts()
    }

    /// Reads an image from disk and binds it as the current preview.
    pub async fn load_image(&self, path: impl AsRef<Path>) -> DecodeOutcome {
        let path = path.as_ref().to_path_buf();
        let outcome = select_and_decode(
            &self.controller,
            &self.surface,
            FileOrigin::Picker,
            [path],
            |path: &PathBuf| display_name(path),
            |path| async move { read_image(path).await },
        )
        .await;
        outcome.unwrap_or(DecodeOutcome::Stale)
    }

    pub async fn submit(&self) -> Result<PredictionCompletion, SubmitRejection> {
        submit_prediction(&self.controller, &self.transport, &self.surface).await
    }

    pub fn open_chat(&self) -> Result<(), OpenChatRejection> {
        update(&self.controller, &self.surface, DiagnosisController::open_chat)
    }

    pub fn close_chat(&self) {
        update(&self.controller, &self.surface, DiagnosisController::close_chat);
    }

    pub async fn ask(&self, question: &str) -> Result<ChatCompletion, SendRejection> {
        send_chat_message(&self.controller, &self.transport, &self.surface, question).await
    }

    pub fn clear(&self) {
        update(&self.controller, &self.surface, DiagnosisController::clear);
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

async fn read_image(path: PathBuf) -> Result<SelectedImage, DecodeError> {
    let name = display_name(&path);
    let bytes = tokio::fs::read(&path).await.map_err(|error| DecodeError::Read {
        stage: "read-image-file",
        name: name.clone(),
        message: error.to_string(),
    })?;
    SelectedImage::from_bytes(name, &bytes)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use derma_core::{ClientResult, HttpReply};
    use futures::FutureExt;
    use futures::future::{self, LocalBoxFuture};
    use pretty_assertions::assert_eq;

    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

    #[derive(Default)]
    struct Canned {
        replies: RefCell<VecDeque<HttpReply>>,
    }

    impl Transport for Canned {
        fn post_json<'a>(
            &'a self,
            _path: &'a str,
            _body: String,
        ) -> LocalBoxFuture<'a, ClientResult<HttpReply>> {
            let reply = self
                .replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| HttpReply::new(500, ""));
            future::ready(Ok(reply)).boxed_local()
        }
    }

    fn scratch_file(name: &str, bytes: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("derma-native-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[tokio::test]
    async fn unreadable_file_keeps_session_idle() {
        let session = NativeSession::with_transport(ClientConfig::default(), Canned::default());

        let outcome = session.load_image("/definitely/not/here.png").await;

        assert!(matches!(outcome, DecodeOutcome::Failed(DecodeError::Read { .. })));
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.submit().await, Err(SubmitRejection::NoImage));
        let alerts = session.take_alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, AlertLevel::Warning);
    }

    #[tokio::test]
    async fn disk_image_flows_into_prediction() {
        let canned = Canned::default();
        canned.replies.borrow_mut().push_back(HttpReply::new(
            200,
            r#"{"result":"Eczema","probability":0.8426,"recommendation":"  Moisturize daily  "}"#,
        ));
        let session = NativeSession::with_transport(ClientConfig::default(), canned);
        let path = scratch_file("lesion.png", PNG_HEADER);

        let outcome = session.load_image(&path).await;
        assert!(matches!(outcome, DecodeOutcome::Displayed(_)));
        assert_eq!(session.phase(), SessionPhase::Previewing);

        let completion = session.submit().await;
        assert!(matches!(completion, Ok(PredictionCompletion::Resulted(_))));
        assert_eq!(session.result().map(|result| result.diagnosis), Some("Eczema".to_string()));
        assert_eq!(session.recommendation(), Some("Moisturize daily".to_string()));

        session.clear();
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.result().is_none());
    }
}
