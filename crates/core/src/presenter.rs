use serde::Serialize;

use crate::prediction::PredictionResult;

/// DOM id of the recommendation panel. The panel is created once and only toggled afterwards.
pub const RECOMMENDATION_PANEL_ID: &str = "recommendation";

/// Formats a probability in [0, 1] as a percentage with exactly two decimals.
pub fn format_confidence(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

/// Diagnosis and confidence lines of the result surface.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ResultView {
    pub visible: bool,
    pub diagnosis: String,
    pub confidence: String,
}

impl ResultView {
    pub fn diagnosis_line(&self) -> String {
        format!("Diagnosis: {}", self.diagnosis)
    }

    pub fn confidence_line(&self) -> String {
        format!("Confidence: {}", self.confidence)
    }
}

/// Persistent recommendation surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecommendationPanel {
    pub id: &'static str,
    pub visible: bool,
    pub text: String,
}

impl Default for RecommendationPanel {
    fn default() -> Self {
        Self {
            id: RECOMMENDATION_PANEL_ID,
            visible: false,
            text: String::new(),
        }
    }
}

/// Entry point into the chat sub-session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ChatToggle {
    pub visible: bool,
    pub label: String,
}

/// Diagnosis captured when the chat entry point unlocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatContext {
    diagnosis: String,
}

impl ChatContext {
    pub fn diagnosis(&self) -> &str {
        &self.diagnosis
    }
}

/// Renders the current prediction result into the result, recommendation and toggle surfaces.
#[derive(Debug, Default)]
pub struct ResultPresenter {
    result: ResultView,
    recommendation: RecommendationPanel,
    toggle: ChatToggle,
}

impl ResultPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn result(&self) -> &ResultView {
        &self.result
    }

    pub fn recommendation(&self) -> &RecommendationPanel {
        &self.recommendation
    }

    pub fn toggle(&self) -> &ChatToggle {
        &self.toggle
    }

    /// Renders `result` and returns the chat context it unlocks.
    pub fn present(&mut self, result: &PredictionResult) -> ChatContext {
        self.result = ResultView {
            visible: true,
            diagnosis: result.diagnosis.clone(),
            confidence: format_confidence(result.confidence),
        };

        match result
            .recommendation
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
        {
            Some(text) => {
                self.recommendation.text = text.to_string();
                self.recommendation.visible = true;
            }
            None => self.recommendation.visible = false,
        }

        self.toggle = ChatToggle {
            visible: true,
            label: format!("Ask About {}", result.diagnosis),
        };

        ChatContext {
            diagnosis: result.diagnosis.clone(),
        }
    }

    /// Hides the toggle while the chat panel is open and shows it again once closed.
    pub fn set_chat_open(&mut self, open: bool) {
        if self.result.visible {
            self.toggle.visible = !open;
        }
    }

    /// Clears stale result text. The recommendation panel is hidden, never removed.
    pub fn invalidate(&mut self) {
        self.result = ResultView::default();
        self.recommendation.visible = false;
        self.toggle = ChatToggle::default();
    }
}
