use snafu::Snafu;

/// Generic fallback shown in the transcript when a chat failure carries no usable detail.
pub const GENERIC_CHAT_FAILURE: &str = "Failed to get response";
/// Shown when the chat endpoint answers successfully but without a reply.
pub const EMPTY_CHAT_REPLY: &str = "No response from server";

/// Failures at the network-call boundary, for both `/predict` and `/chat`.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ClientError {
    #[snafu(display("failed to encode request body for {endpoint}"))]
    EncodeBody {
        stage: &'static str,
        endpoint: String,
        source: serde_json::Error,
    },
    #[snafu(display("transport failed on `{stage}`: {message}"))]
    Transport {
        stage: &'static str,
        message: String,
    },
    #[snafu(display("request to {endpoint} timed out after {seconds}s"))]
    Timeout {
        stage: &'static str,
        endpoint: String,
        seconds: u64,
    },
    #[snafu(display("{endpoint} returned status {status}: {body}"))]
    Status {
        stage: &'static str,
        endpoint: String,
        status: u16,
        body: String,
    },
    #[snafu(display("failed to parse {endpoint} response body"))]
    ParseBody {
        stage: &'static str,
        endpoint: String,
        source: serde_json::Error,
    },
    #[snafu(display("invalid {endpoint} payload: {details}"))]
    InvalidPayload {
        stage: &'static str,
        endpoint: String,
        details: String,
    },
    #[snafu(display("{endpoint} reported an error: {message}"))]
    Application {
        stage: &'static str,
        endpoint: String,
        message: String,
    },
    #[snafu(display("{endpoint} returned no reply"))]
    EmptyReply {
        stage: &'static str,
        endpoint: String,
    },
}

impl ClientError {
    /// Text surfaced to the user inside the chat transcript.
    pub fn chat_detail(&self) -> String {
        match self {
            Self::Application { message, .. } => message.clone(),
            Self::EmptyReply { .. } => EMPTY_CHAT_REPLY.to_string(),
            _ => GENERIC_CHAT_FAILURE.to_string(),
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            Self::EncodeBody { stage, .. }
            | Self::Transport { stage, .. }
            | Self::Timeout { stage, .. }
            | Self::Status { stage, .. }
            | Self::ParseBody { stage, .. }
            | Self::InvalidPayload { stage, .. }
            | Self::Application { stage, .. }
            | Self::EmptyReply { stage, .. } => stage,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Failures turning an accepted file into a displayable image.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DecodeError {
    #[snafu(display("file '{name}' is empty"))]
    EmptyFile { stage: &'static str, name: String },
    #[snafu(display("file '{name}' is not a recognized image format"))]
    UnsupportedFormat { stage: &'static str, name: String },
    #[snafu(display("file '{name}' decoded to a non-image resource ({prefix})"))]
    NotAnImage {
        stage: &'static str,
        name: String,
        prefix: String,
    },
    #[snafu(display("failed to read '{name}': {message}"))]
    Read {
        stage: &'static str,
        name: String,
        message: String,
    },
}

pub type DecodeResult<T> = Result<T, DecodeError>;
