//! Wire contract with the prediction and chat endpoints.
//!
//! Transports only move bytes; every status and payload classification happens here so that
//! browser and native hosts fail the same way.

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, ensure};

use crate::error::{
    ApplicationSnafu, ClientResult, EmptyReplySnafu, EncodeBodySnafu, InvalidPayloadSnafu,
    ParseBodySnafu, StatusSnafu,
};
use crate::prediction::PredictionResult;

/// Raw HTTP reply handed back by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequestBody<'a> {
    message: &'a str,
    disease_context: &'a str,
}

#[derive(Debug, Deserialize)]
struct PredictResponseBody {
    result: Option<String>,
    probability: Option<f64>,
    #[serde(default)]
    recommendation: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatResponseBody {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// `/predict` takes the data URI itself as a JSON string.
pub fn encode_predict_request(endpoint: &str, data_uri: &str) -> ClientResult<String> {
    serde_json::to_string(data_uri).context(EncodeBodySnafu {
        stage: "encode-predict-request",
        endpoint,
    })
}

pub fn encode_chat_request(
    endpoint: &str,
    message: &str,
    disease_context: &str,
) -> ClientResult<String> {
    serde_json::to_string(&ChatRequestBody {
        message,
        disease_context,
    })
    .context(EncodeBodySnafu {
        stage: "encode-chat-request",
        endpoint,
    })
}

pub fn decode_predict_reply(endpoint: &str, reply: HttpReply) -> ClientResult<PredictionResult> {
    ensure!(
        reply.is_success(),
        StatusSnafu {
            stage: "predict-status",
            endpoint,
            status: reply.status,
            body: reply.body,
        }
    );

    let body: PredictResponseBody = serde_json::from_str(&reply.body).context(ParseBodySnafu {
        stage: "parse-predict-response",
        endpoint,
    })?;

    let diagnosis = body
        .result
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty());
    let Some(diagnosis) = diagnosis else {
        return InvalidPayloadSnafu {
            stage: "validate-predict-response",
            endpoint,
            details: "missing diagnosis label",
        }
        .fail();
    };

    let Some(probability) = body.probability else {
        return InvalidPayloadSnafu {
            stage: "validate-predict-response",
            endpoint,
            details: "missing probability",
        }
        .fail();
    };
    ensure!(
        probability.is_finite() && (0.0..=1.0).contains(&probability),
        InvalidPayloadSnafu {
            stage: "validate-predict-response",
            endpoint,
            details: format!("probability {probability} outside [0, 1]"),
        }
    );

    Ok(PredictionResult {
        diagnosis,
        confidence: probability,
        recommendation: body.recommendation,
    })
}

/// Interprets a `/chat` reply. A non-ok body is still searched for an `error` field.
pub fn decode_chat_reply(endpoint: &str, reply: HttpReply) -> ClientResult<String> {
    if !reply.is_success() {
        let error = serde_json::from_str::<ChatResponseBody>(&reply.body)
            .ok()
            .and_then(|body| body.error)
            .filter(|message| !message.trim().is_empty());
        if let Some(message) = error {
            return ApplicationSnafu {
                stage: "chat-status",
                endpoint,
                message,
            }
            .fail();
        }

        return StatusSnafu {
            stage: "chat-status",
            endpoint,
            status: reply.status,
            body: reply.body,
        }
        .fail();
    }

    let body: ChatResponseBody = serde_json::from_str(&reply.body).context(ParseBodySnafu {
        stage: "parse-chat-response",
        endpoint,
    })?;

    if let Some(response) = body.response.filter(|text| !text.is_empty()) {
        return Ok(response);
    }
    if let Some(message) = body.error.filter(|text| !text.trim().is_empty()) {
        return ApplicationSnafu {
            stage: "chat-reply",
            endpoint,
            message,
        }
        .fail();
    }

    EmptyReplySnafu {
        stage: "chat-reply",
        endpoint,
    }
    .fail()
}
