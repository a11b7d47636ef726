use crate::error::DecodeError;
use crate::ids::Generation;
use crate::image::SelectedImage;

/// Handle for one asynchronous decode. Completions are accepted only while the ticket is current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeTicket {
    pub generation: Generation,
    pub file_name: String,
}

/// What happened to a decode completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// The image replaced the preview.
    Displayed(SelectedImage),
    /// Decoding failed; the prior preview stays as it was.
    Failed(DecodeError),
    /// A later selection superseded this decode.
    Stale,
}

/// Tracks in-flight decodes and the non-intrusive decode notice.
#[derive(Debug, Default)]
pub struct PreviewRenderer {
    generation: Generation,
    notice: Option<String>,
}

impl PreviewRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Starts a decode, superseding every decode started before it.
    pub fn begin(&mut self, file_name: impl Into<String>) -> DecodeTicket {
        self.generation = self.generation.next();
        let ticket = DecodeTicket {
            generation: self.generation,
            file_name: file_name.into(),
        };
        tracing::debug!(
            generation = %ticket.generation,
            file_name = %ticket.file_name,
            "decode started"
        );
        ticket
    }

    pub fn complete(
        &mut self,
        ticket: &DecodeTicket,
        decoded: Result<SelectedImage, DecodeError>,
    ) -> DecodeOutcome {
        if ticket.generation != self.generation {
            tracing::debug!(
                stale = %ticket.generation,
                current = %self.generation,
                "dropping superseded decode"
            );
            return DecodeOutcome::Stale;
        }

        match decoded {
            Ok(image) => {
                self.notice = None;
                DecodeOutcome::Displayed(image)
            }
            Err(error) => {
                tracing::warn!(file_name = %ticket.file_name, %error, "image decode failed");
                self.notice = Some(format!("Could not read {}: {}", ticket.file_name, error));
                DecodeOutcome::Failed(error)
            }
        }
    }

    /// Drops the notice and supersedes any decode still running.
    pub fn clear(&mut self) {
        self.generation = self.generation.next();
        self.notice = None;
    }
}
