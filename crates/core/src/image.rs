use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use snafu::ensure;

use crate::error::{DecodeResult, EmptyFileSnafu, NotAnImageSnafu, UnsupportedFormatSnafu};

const DATA_URI_IMAGE_PREFIX: &str = "data:image/";

/// Where a batch of files came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOrigin {
    Drop,
    Picker,
}

/// Pointer events that drive the drag-hover affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragEventKind {
    Enter,
    Over,
    Leave,
    Drop,
}

impl DragEventKind {
    /// Maps a DOM event type name (`dragover`, `dragleave`, ...) to a drag kind.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "dragenter" => Some(Self::Enter),
            "dragover" => Some(Self::Over),
            "dragleave" => Some(Self::Leave),
            "drop" => Some(Self::Drop),
            _ => None,
        }
    }
}

/// Normalizes drag-drop and file-picker arrivals into a single accepted file.
#[derive(Debug, Default)]
pub struct ImageSource {
    hovering: bool,
}

impl ImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_hovering(&self) -> bool {
        self.hovering
    }

    /// Updates hover state from the event type alone; file validity plays no part.
    pub fn on_drag_event(&mut self, kind: DragEventKind) -> bool {
        self.hovering = matches!(kind, DragEventKind::Enter | DragEventKind::Over);
        self.hovering
    }

    /// Picks the file to preview from a batch. Only the last file wins.
    pub fn accept<F>(
        &mut self,
        origin: FileOrigin,
        files: impl IntoIterator<Item = F>,
    ) -> Option<F> {
        if origin == FileOrigin::Drop {
            self.hovering = false;
        }

        let mut skipped = 0usize;
        let mut accepted = None;
        for file in files {
            if accepted.replace(file).is_some() {
                skipped += 1;
            }
        }

        if skipped > 0 {
            tracing::debug!(?origin, skipped, "multiple files supplied, keeping the last one");
        }
        accepted
    }
}

/// Decoded image owned by the current prediction session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedImage {
    name: String,
    mime_type: String,
    data_uri: String,
}

impl SelectedImage {
    /// Encodes raw file bytes into a base64 data URI after sniffing the image format.
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> DecodeResult<Self> {
        let name = name.into();
        ensure!(
            !bytes.is_empty(),
            EmptyFileSnafu {
                stage: "decode-bytes",
                name: name.clone(),
            }
        );

        let format = ::image::guess_format(bytes).map_err(|_| {
            UnsupportedFormatSnafu {
                stage: "sniff-format",
                name: name.clone(),
            }
            .build()
        })?;
        let mime_type = format.to_mime_type().to_string();
        let data_uri = format!("data:{mime_type};base64,{}", STANDARD.encode(bytes));

        Ok(Self {
            name,
            mime_type,
            data_uri,
        })
    }

    /// Accepts a data URI produced by a platform reader (e.g. `FileReader`).
    pub fn from_data_uri(name: impl Into<String>, data_uri: String) -> DecodeResult<Self> {
        let name = name.into();
        let Some(rest) = data_uri.strip_prefix(DATA_URI_IMAGE_PREFIX) else {
            let prefix = data_uri.chars().take(24).collect::<String>();
            return NotAnImageSnafu {
                stage: "validate-data-uri",
                name,
                prefix,
            }
            .fail();
        };

        let subtype = rest
            .split([';', ','])
            .next()
            .map(str::trim)
            .unwrap_or_default();
        ensure!(
            !subtype.is_empty() && rest.contains(','),
            NotAnImageSnafu {
                stage: "validate-data-uri",
                name: name.clone(),
                prefix: DATA_URI_IMAGE_PREFIX.to_string(),
            }
        );
        ensure!(
            !rest.ends_with(','),
            EmptyFileSnafu {
                stage: "validate-data-uri",
                name: name.clone(),
            }
        );

        Ok(Self {
            mime_type: format!("image/{subtype}"),
            name,
            data_uri,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Encoded form sent to the prediction service.
    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    /// URI bound to the preview surface.
    pub fn display_uri(&self) -> &str {
        &self.data_uri
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

    #[test]
    fn hover_follows_event_type_only() {
        let mut source = ImageSource::new();

        assert!(source.on_drag_event(DragEventKind::Over));
        assert!(source.on_drag_event(DragEventKind::Enter));
        assert!(!source.on_drag_event(DragEventKind::Leave));
        source.on_drag_event(DragEventKind::Over);
        assert!(!source.on_drag_event(DragEventKind::Drop));
        assert_eq!(DragEventKind::from_event_type("dragover"), Some(DragEventKind::Over));
        assert_eq!(DragEventKind::from_event_type("click"), None);
    }

    #[test]
    fn batch_keeps_last_file_and_clears_hover_on_drop() {
        let mut source = ImageSource::new();
        source.on_drag_event(DragEventKind::Over);

        let accepted = source.accept(FileOrigin::Drop, ["a.png", "b.png", "c.png"]);

        assert_eq!(accepted, Some("c.png"));
        assert!(!source.is_hovering());
        assert_eq!(source.accept(FileOrigin::Picker, Vec::<&str>::new()), None);
    }

    #[test]
    fn png_bytes_become_data_uri() {
        let image = SelectedImage::from_bytes("lesion.png", PNG_HEADER).unwrap();

        assert_eq!(image.mime_type(), "image/png");
        assert!(image.data_uri().starts_with("data:image/png;base64,iVBORw0KGgo"));
        assert_eq!(image.display_uri(), image.data_uri());
        assert_eq!(image.name(), "lesion.png");
    }

    #[test]
    fn empty_and_unknown_bytes_are_rejected() {
        assert!(matches!(
            SelectedImage::from_bytes("empty.png", &[]),
            Err(DecodeError::EmptyFile { .. })
        ));
        assert!(matches!(
            SelectedImage::from_bytes("notes.txt", b"hello world, not an image"),
            Err(DecodeError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn data_uri_must_describe_an_image() {
        let image =
            SelectedImage::from_data_uri("scalp.jpg", "data:image/jpeg;base64,/9j/4AAQ".to_string())
                .unwrap();
        assert_eq!(image.mime_type(), "image/jpeg");

        assert!(matches!(
            SelectedImage::from_data_uri("notes.txt", "data:text/plain;base64,aGk=".to_string()),
            Err(DecodeError::NotAnImage { .. })
        ));
        assert!(matches!(
            SelectedImage::from_data_uri("blank.png", "data:image/png;base64,".to_string()),
            Err(DecodeError::EmptyFile { .. })
        ));
    }
}
