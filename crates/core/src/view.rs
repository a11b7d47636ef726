use serde::Serialize;

use crate::chat::{ChatMessage, ChatPhase};
use crate::ids::Generation;
use crate::prediction::SessionPhase;
use crate::presenter::{ChatToggle, RecommendationPanel, ResultView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Warning,
    Failure,
}

/// Blocking page-level message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
}

impl Alert {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: AlertLevel::Warning,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            level: AlertLevel::Failure,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadView<'a> {
    pub hovering: bool,
    pub placeholder_visible: bool,
    pub notice: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewView<'a> {
    pub visible: bool,
    pub image_uri: Option<&'a str>,
    pub file_name: Option<&'a str>,
    pub loading: bool,
    /// Changes whenever a different image is bound, so hosts can skip re-assigning `src`.
    pub revision: Generation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatPanelView<'a> {
    pub phase: ChatPhase,
    pub visible: bool,
    pub messages: &'a [ChatMessage],
    pub typing_indicator: Option<&'static str>,
    pub send_enabled: bool,
}

/// Everything the page shows, derived from the controller on every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewModel<'a> {
    pub phase: SessionPhase,
    pub upload: UploadView<'a>,
    pub preview: PreviewView<'a>,
    pub loader_visible: bool,
    pub submit_enabled: bool,
    pub result: &'a ResultView,
    pub recommendation: &'a RecommendationPanel,
    pub chat_toggle: &'a ChatToggle,
    pub chat: ChatPanelView<'a>,
}

/// Page surface a host renders onto.
pub trait Surface {
    fn render(&self, view: &ViewModel<'_>);
    fn alert(&self, alert: &Alert);
}
