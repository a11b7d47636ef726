#![deny(unsafe_code)]

//! Interaction state machines for the single-image diagnosis client.
//!
//! Image selection, prediction, result rendering and the follow-up chat are modelled as
//! plain synchronous state owned by [`DiagnosisController`]. Hosts (browser, native) supply
//! a [`Transport`] and a [`Surface`] and drive asynchronous work through [`driver`].

pub mod chat;
pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod ids;
pub mod image;
pub mod prediction;
pub mod presenter;
pub mod preview;
pub mod protocol;
pub mod transport;
/// Render contract between the controller and a host page.
pub mod view;

pub use chat::{
    ChatCompletion, ChatMessage, ChatPhase, ChatSession, ChatTicket, OpenChatRejection,
    SendRejection, Sender,
};
pub use config::ClientConfig;
pub use controller::DiagnosisController;
pub use error::{ClientError, ClientResult, DecodeError, DecodeResult};
pub use ids::{Generation, MessageSeq, RequestId};
pub use image::{DragEventKind, FileOrigin, ImageSource, SelectedImage};
pub use prediction::{
    PredictTicket, PredictionCompletion, PredictionResult, PredictionSession, SessionPhase,
    SubmitRejection,
};
pub use presenter::{ChatContext, ChatToggle, RecommendationPanel, ResultPresenter, ResultView};
pub use preview::{DecodeOutcome, DecodeTicket, PreviewRenderer};
pub use protocol::HttpReply;
pub use transport::Transport;
pub use view::{Alert, AlertLevel, Surface, ViewModel};
