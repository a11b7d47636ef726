use serde::{Deserialize, Serialize};

pub const DEFAULT_PREDICT_PATH: &str = "/predict";
pub const DEFAULT_CHAT_PATH: &str = "/chat";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Where the backend lives and how long a request may take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Origin prefix; empty means same-origin relative paths.
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_predict_path")]
    pub predict_path: String,
    #[serde(default = "default_chat_path")]
    pub chat_path: String,
    /// Zero disables the timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            predict_path: default_predict_path(),
            chat_path: default_chat_path(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ClientConfig {
    pub fn normalized(mut self) -> Self {
        self.base_url = self.base_url.trim().trim_end_matches('/').to_string();
        self.predict_path = normalize_path(&self.predict_path, DEFAULT_PREDICT_PATH);
        self.chat_path = normalize_path(&self.chat_path, DEFAULT_CHAT_PATH);
        self
    }

    /// Joins the base URL with an endpoint path.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn normalize_path(path: &str, fallback: &str) -> String {
    let path = path.trim();
    if path.is_empty() {
        fallback.to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn default_predict_path() -> String {
    DEFAULT_PREDICT_PATH.to_string()
}

fn default_chat_path() -> String {
    DEFAULT_CHAT_PATH.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_restores_blank_paths() {
        let config = ClientConfig {
            base_url: " http://localhost:5000/ ".to_string(),
            predict_path: "  ".to_string(),
            chat_path: "api/chat".to_string(),
            request_timeout_secs: 5,
        }
        .normalized();

        assert_eq!(config.base_url, "http://localhost:5000");
        assert_eq!(config.predict_path, "/predict");
        assert_eq!(config.chat_path, "/api/chat");
        assert_eq!(config.endpoint_url(&config.predict_path), "http://localhost:5000/predict");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url":"https://derma.example"}"#).unwrap();

        assert_eq!(config.chat_path, DEFAULT_CHAT_PATH);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }
}
