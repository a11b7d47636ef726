use serde::Serialize;

use crate::error::ClientError;
use crate::ids::{Generation, MessageSeq, RequestId};
use crate::presenter::ChatContext;

/// Ephemeral indicator text shown while a reply is pending.
pub const TYPING_INDICATOR: &str = "Assistant is typing...";

/// Greeting appended as the first assistant message of a conversation.
pub fn greeting(diagnosis: &str) -> String {
    format!(
        "Hello! I can help answer questions about {diagnosis}. \
         What would you like to know about symptoms, treatments, or when to see a doctor?"
    )
}

/// Chat speaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Assistant => "Assistant",
        }
    }
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    pub sequence: MessageSeq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatPhase {
    #[default]
    Closed,
    Open,
    AwaitingReply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenChatRejection {
    NoDiagnosis,
    AlreadyOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejection {
    Closed,
    Blank,
    AwaitingReply { active: RequestId },
}

/// Handle for the single in-flight `/chat` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTicket {
    pub generation: Generation,
    pub request_id: RequestId,
    pub message: String,
    pub disease_context: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCompletion {
    Replied(MessageSeq),
    Failed(MessageSeq),
    /// The chat was closed or cleared while the request was in flight.
    Stale,
}

/// Conversation about the current diagnosis. Sends are strictly serialized.
#[derive(Debug, Default)]
pub struct ChatSession {
    phase: ChatPhase,
    context: Option<ChatContext>,
    transcript: Vec<ChatMessage>,
    next_sequence: MessageSeq,
    generation: Generation,
    pending: Option<RequestId>,
    last_request_id: RequestId,
    /// Diagnosis the most recent greeting was written for.
    greeted: Option<String>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ChatPhase {
        self.phase
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn is_typing(&self) -> bool {
        self.phase == ChatPhase::AwaitingReply
    }

    pub fn context(&self) -> Option<&ChatContext> {
        self.context.as_ref()
    }

    /// Binds the diagnosis of a new result. Earlier entries stay in the transcript.
    pub fn bind(&mut self, context: ChatContext) {
        self.invalidate();
        self.context = Some(context);
    }

    /// Drops the diagnosis; the chat closes but keeps its transcript.
    pub fn unbind(&mut self) {
        self.invalidate();
        self.context = None;
    }

    pub fn open(&mut self) -> Result<(), OpenChatRejection> {
        let Some(context) = &self.context else {
            return Err(OpenChatRejection::NoDiagnosis);
        };
        if self.phase != ChatPhase::Closed {
            return Err(OpenChatRejection::AlreadyOpen);
        }

        let diagnosis = context.diagnosis().to_string();
        let greet =
            self.transcript.is_empty() || self.greeted.as_deref() != Some(diagnosis.as_str());
        self.phase = ChatPhase::Open;
        if greet {
            self.append(Sender::Assistant, greeting(&diagnosis));
            self.greeted = Some(diagnosis);
        }
        tracing::debug!(generation = %self.generation, "chat opened");
        Ok(())
    }

    /// Closes the panel. The transcript stays for reopening; an in-flight reply is dropped.
    pub fn close(&mut self) {
        if self.phase != ChatPhase::Closed {
            self.invalidate();
            tracing::debug!(generation = %self.generation, "chat closed");
        }
    }

    pub fn begin_send(&mut self, input: &str) -> Result<ChatTicket, SendRejection> {
        match self.phase {
            ChatPhase::Closed => return Err(SendRejection::Closed),
            ChatPhase::AwaitingReply => {
                return Err(SendRejection::AwaitingReply {
                    active: self.pending.unwrap_or_default(),
                });
            }
            ChatPhase::Open => {}
        }

        let message = input.trim();
        if message.is_empty() {
            return Err(SendRejection::Blank);
        }
        let Some(context) = &self.context else {
            return Err(SendRejection::Closed);
        };

        self.last_request_id = self.last_request_id.next();
        let ticket = ChatTicket {
            generation: self.generation,
            request_id: self.last_request_id,
            message: message.to_string(),
            disease_context: context.diagnosis().to_string(),
        };

        self.append(Sender::User, ticket.message.clone());
        self.pending = Some(ticket.request_id);
        self.phase = ChatPhase::AwaitingReply;
        tracing::debug!(request_id = %ticket.request_id, "chat message sent");
        Ok(ticket)
    }

    pub fn complete(
        &mut self,
        ticket: &ChatTicket,
        outcome: Result<String, ClientError>,
    ) -> ChatCompletion {
        if ticket.generation != self.generation || self.pending != Some(ticket.request_id) {
            tracing::debug!(request_id = %ticket.request_id, "dropping stale chat reply");
            return ChatCompletion::Stale;
        }

        self.pending = None;
        self.phase = ChatPhase::Open;
        match outcome {
            Ok(reply) => ChatCompletion::Replied(self.append(Sender::Assistant, reply)),
            Err(error) => {
                tracing::warn!(
                    request_id = %ticket.request_id,
                    stage = error.stage(),
                    %error,
                    "chat request failed"
                );
                let text = format!("Error: {}", error.chat_detail());
                ChatCompletion::Failed(self.append(Sender::Assistant, text))
            }
        }
    }

    /// Forgets everything: phase, diagnosis and transcript.
    pub fn clear(&mut self) {
        self.unbind();
        self.transcript.clear();
        self.next_sequence = MessageSeq::default();
        self.greeted = None;
    }

    fn invalidate(&mut self) {
        self.generation = self.generation.next();
        self.pending = None;
        self.phase = ChatPhase::Closed;
    }

    fn append(&mut self, sender: Sender, text: String) -> MessageSeq {
        let sequence = self.next_sequence;
        self.next_sequence = sequence.next();
        self.transcript.push(ChatMessage {
            sender,
            text,
            sequence,
        });
        sequence
    }
}
