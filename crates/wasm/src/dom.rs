use std::cell::{Cell, RefCell};

use derma_core::presenter::RECOMMENDATION_PANEL_ID;
use derma_core::view::{ChatPanelView, PreviewView};
use derma_core::{Alert, ChatMessage, Generation, MessageSeq, Sender, Surface, ViewModel};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement, HtmlImageElement, HtmlInputElement, Window};

const HIDDEN_CLASS: &str = "hidden";
const LOADING_CLASS: &str = "loading";
const UPLOAD_BOX_CLASS: &str = "upload-box";
const UPLOAD_BOX_HOVER_CLASS: &str = "upload-box dragover";
const NOTICE_ID: &str = "upload-notice";
const TYPING_ID: &str = "typing";
const RECOMMENDATION_STYLE: &str =
    "margin-top: 20px; padding: 10px; background-color: #f8f9fa; border-radius: 5px;";

/// Element handles of the diagnosis page, resolved once at mount.
pub struct Page {
    window: Window,
    document: Document,
    pub file_drag: HtmlElement,
    pub file_upload: HtmlInputElement,
    image_preview: HtmlImageElement,
    image_display: HtmlImageElement,
    upload_caption: HtmlElement,
    notice: HtmlElement,
    pred_result: HtmlElement,
    loader: HtmlElement,
    recommendation: HtmlElement,
    pub open_chat: HtmlElement,
    chat_container: HtmlElement,
    pub close_chat: HtmlElement,
    pub send_message: HtmlElement,
    pub user_message: HtmlInputElement,
    chat_messages: HtmlElement,
    typing: HtmlElement,
    rendered: RefCell<RenderedTranscript>,
    image_revision: Cell<Option<Generation>>,
}

impl Page {
    pub fn mount(window: Window) -> Result<Self, JsValue> {
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("window has no document"))?;

        let image_box: Element = lookup(&document, "image-box")?;
        let recommendation = match document.get_element_by_id(RECOMMENDATION_PANEL_ID) {
            Some(element) => element.dyn_into::<HtmlElement>()?,
            None => {
                let element = create(&document, "div", RECOMMENDATION_PANEL_ID)?;
                element.set_attribute("style", RECOMMENDATION_STYLE)?;
                image_box.after_with_node_1(&element)?;
                element
            }
        };

        let upload_caption: HtmlElement = lookup(&document, "upload-caption")?;
        let notice = match document.get_element_by_id(NOTICE_ID) {
            Some(element) => element.dyn_into::<HtmlElement>()?,
            None => {
                let element = create(&document, "p", NOTICE_ID)?;
                upload_caption.after_with_node_1(&element)?;
                element
            }
        };
        let typing = create(&document, "div", TYPING_ID)?;

        let page = Self {
            file_drag: lookup(&document, "file-drag")?,
            file_upload: lookup(&document, "file-upload")?,
            image_preview: lookup(&document, "image-preview")?,
            image_display: lookup(&document, "image-display")?,
            upload_caption,
            notice,
            pred_result: lookup(&document, "pred-result")?,
            loader: lookup(&document, "loader")?,
            recommendation,
            open_chat: lookup(&document, "openChat")?,
            chat_container: lookup(&document, "chatContainer")?,
            close_chat: lookup(&document, "closeChat")?,
            send_message: lookup(&document, "sendMessage")?,
            user_message: lookup(&document, "userMessage")?,
            chat_messages: lookup(&document, "chatMessages")?,
            typing,
            rendered: RefCell::default(),
            image_revision: Cell::new(None),
            window,
            document,
        };
        page.reset_file_input();
        Ok(page)
    }

    pub fn reset_file_input(&self) {
        self.file_upload.set_value("");
    }

    fn render_preview(&self, preview: &PreviewView<'_>) -> Result<(), JsValue> {
        if self.image_revision.replace(Some(preview.revision)) != Some(preview.revision) {
            let source = preview.image_uri.unwrap_or_default();
            self.image_preview.set_src(source);
            self.image_display.set_src(source);
            if let Some(name) = preview.file_name {
                self.image_display.set_alt(name);
            }
        }
        set_hidden(&self.image_preview, !preview.visible)?;
        set_hidden(&self.image_display, !preview.visible)?;
        self.image_display
            .class_list()
            .toggle_with_force(LOADING_CLASS, preview.loading)?;
        Ok(())
    }

    fn render_chat(&self, chat: &ChatPanelView<'_>) -> Result<(), JsValue> {
        show_block(&self.chat_container, chat.visible)?;
        self.send_message
            .toggle_attribute_with_force("disabled", !chat.send_enabled)?;

        let delta = self.rendered.borrow().delta(chat.messages);
        let appended = match delta {
            TranscriptDelta::Unchanged => false,
            TranscriptDelta::Append(from) => {
                self.typing.remove();
                for message in &chat.messages[from..] {
                    self.append_message(message)?;
                }
                true
            }
            TranscriptDelta::Rebuild => {
                self.chat_messages.set_inner_html("");
                for message in chat.messages {
                    self.append_message(message)?;
                }
                true
            }
        };
        *self.rendered.borrow_mut() = RenderedTranscript::of(chat.messages);

        let typing_shown = self.typing.is_connected();
        match chat.typing_indicator {
            Some(text) if !typing_shown || appended => {
                self.typing.set_text_content(Some(text));
                self.chat_messages.append_child(&self.typing)?;
            }
            None if typing_shown => self.typing.remove(),
            _ => {}
        }

        if appended || chat.typing_indicator.is_some() {
            self.chat_messages
                .set_scroll_top(self.chat_messages.scroll_height());
        }
        Ok(())
    }

    fn append_message(&self, message: &ChatMessage) -> Result<(), JsValue> {
        let element = self.document.create_element("div")?;
        element.set_class_name(message_class(message.sender));
        element.set_attribute("style", message_style(message.sender))?;
        element.set_inner_html(&message_markup(message));
        self.chat_messages.append_child(&element)?;
        Ok(())
    }

    fn try_render(&self, view: &ViewModel<'_>) -> Result<(), JsValue> {
        self.file_drag.set_class_name(if view.upload.hovering {
            UPLOAD_BOX_HOVER_CLASS
        } else {
            UPLOAD_BOX_CLASS
        });
        set_hidden(&self.upload_caption, !view.upload.placeholder_visible)?;
        self.notice.set_text_content(view.upload.notice);
        set_hidden(&self.notice, view.upload.notice.is_none())?;

        self.render_preview(&view.preview)?;
        set_hidden(&self.loader, !view.loader_visible)?;

        if view.result.visible {
            self.pred_result.set_inner_html(&result_markup(
                &view.result.diagnosis,
                &view.result.confidence,
            ));
        } else {
            self.pred_result.set_inner_html("");
        }
        set_hidden(&self.pred_result, !view.result.visible)?;

        if view.recommendation.visible {
            self.recommendation
                .set_inner_html(&recommendation_markup(&view.recommendation.text));
        }
        set_hidden(&self.recommendation, !view.recommendation.visible)?;

        show_block(&self.open_chat, view.chat_toggle.visible)?;
        self.open_chat
            .set_text_content(Some(&view.chat_toggle.label));

        self.render_chat(&view.chat)
    }
}

impl Surface for Page {
    fn render(&self, view: &ViewModel<'_>) {
        if let Err(error) = self.try_render(view) {
            log::error!("failed to render page: {error:?}");
        }
    }

    fn alert(&self, alert: &Alert) {
        if let Err(error) = self.window.alert_with_message(&alert.message) {
            log::warn!("alert not shown: {error:?}");
        }
    }
}

/// What the chat list currently holds, so renders only append new entries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct RenderedTranscript {
    first: Option<MessageSeq>,
    len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TranscriptDelta {
    Unchanged,
    Append(usize),
    Rebuild,
}

impl RenderedTranscript {
    fn of(messages: &[ChatMessage]) -> Self {
        Self {
            first: messages.first().map(|message| message.sequence),
            len: messages.len(),
        }
    }

    fn delta(&self, messages: &[ChatMessage]) -> TranscriptDelta {
        let first = messages.first().map(|message| message.sequence);
        if self.len > 0 && (first != self.first || messages.len() < self.len) {
            TranscriptDelta::Rebuild
        } else if messages.len() == self.len {
            TranscriptDelta::Unchanged
        } else {
            TranscriptDelta::Append(self.len)
        }
    }
}

fn lookup<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("missing element #{id}")))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("element #{id} has an unexpected type")))
}

fn create(document: &Document, tag: &str, id: &str) -> Result<HtmlElement, JsValue> {
    let element = document.create_element(tag)?.dyn_into::<HtmlElement>()?;
    element.set_id(id);
    Ok(element)
}

fn set_hidden(element: &Element, hidden: bool) -> Result<(), JsValue> {
    element.class_list().toggle_with_force(HIDDEN_CLASS, hidden)?;
    Ok(())
}

fn show_block(element: &HtmlElement, visible: bool) -> Result<(), JsValue> {
    element
        .style()
        .set_property("display", if visible { "block" } else { "none" })
}

fn message_class(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "user-message",
        Sender::Assistant => "assistant-message",
    }
}

fn message_style(sender: Sender) -> &'static str {
    match sender {
        Sender::User => {
            "text-align: right; margin: 5px; padding: 8px; border-radius: 5px; max-width: 80%; \
             word-wrap: break-word; background-color: #d1ecf1;"
        }
        Sender::Assistant => {
            "text-align: left; margin: 5px; padding: 8px; border-radius: 5px; max-width: 80%; \
             word-wrap: break-word; background-color: #f8d7da;"
        }
    }
}

fn message_markup(message: &ChatMessage) -> String {
    format!(
        "<strong>{}:</strong> {}",
        message.sender.display_name(),
        escape_html(&message.text)
    )
}

fn result_markup(diagnosis: &str, confidence: &str) -> String {
    format!(
        "<strong>Diagnosis:</strong> {}<br><strong>Confidence:</strong> {}",
        escape_html(diagnosis),
        escape_html(confidence)
    )
}

fn recommendation_markup(text: &str) -> String {
    format!("<h4>Recommendation:</h4><p>{}</p>", escape_html(text))
}

/// Server text is untrusted; everything bound through `innerHTML` goes through here.
pub(crate) fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for character in text.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(character),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn message(sender: Sender, text: &str, sequence: u64) -> ChatMessage {
        ChatMessage {
            sender,
            text: text.to_string(),
            sequence: MessageSeq::new(sequence),
        }
    }

    #[test]
    fn markup_escapes_server_text() {
        assert_eq!(
            result_markup("<b>Acne</b>", "84.26%"),
            "<strong>Diagnosis:</strong> &lt;b&gt;Acne&lt;/b&gt;<br>\
             <strong>Confidence:</strong> 84.26%"
        );
        assert_eq!(
            message_markup(&message(Sender::User, "is \"this\" bad & itchy?", 1)),
            "<strong>You:</strong> is &quot;this&quot; bad &amp; itchy?"
        );
        assert_eq!(
            recommendation_markup("Rest"),
            "<h4>Recommendation:</h4><p>Rest</p>"
        );
    }

    #[test]
    fn transcript_delta_appends_or_rebuilds() {
        let first = vec![message(Sender::Assistant, "hi", 1)];
        let rendered = RenderedTranscript::of(&first);

        let grown = vec![
            message(Sender::Assistant, "hi", 1),
            message(Sender::User, "q", 2),
        ];
        assert_eq!(rendered.delta(&first), TranscriptDelta::Unchanged);
        assert_eq!(rendered.delta(&grown), TranscriptDelta::Append(1));

        let rebound = vec![message(Sender::Assistant, "hello again", 7)];
        assert_eq!(rendered.delta(&rebound), TranscriptDelta::Rebuild);
        assert_eq!(rendered.delta(&[]), TranscriptDelta::Rebuild);
        assert_eq!(
            RenderedTranscript::default().delta(&grown),
            TranscriptDelta::Append(0)
        );
    }
}
