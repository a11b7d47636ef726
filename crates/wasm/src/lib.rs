//! Browser host: binds the diagnosis controller to the upload page.

mod dom;
mod fetch;
mod reader;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use derma_core::driver::{
    begin_chat_message, deliver_chat_message, publish, select_and_decode, submit_prediction,
    update,
};
use derma_core::{ClientConfig, DiagnosisController, DragEventKind, FileOrigin};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{DragEvent, Event, EventTarget, File, FileList, KeyboardEvent};

pub use dom::Page;
pub use fetch::FetchTransport;
pub use reader::read_data_uri;

type Listener = Closure<dyn FnMut(Event)>;

/// Initialize WASM module
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Derma WASM module initialized");
}

struct Host {
    controller: RefCell<DiagnosisController>,
    transport: FetchTransport,
    page: Page,
    listeners: RefCell<Vec<Listener>>,
}

/// Handle returned to the page script; keeps every listener alive.
#[wasm_bindgen]
pub struct DiagnosisApp {
    host: Rc<Host>,
}

#[wasm_bindgen]
impl DiagnosisApp {
    /// Resolves the page elements and wires every listener.
    /// `options` is an optional `{ base_url, predict_path, chat_path, request_timeout_secs }`.
    pub fn mount(options: JsValue) -> Result<DiagnosisApp, JsValue> {
        let config = if options.is_undefined() || options.is_null() {
            ClientConfig::default()
        } else {
            serde_wasm_bindgen::from_value::<ClientConfig>(options)?
        }
        .normalized();

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))?;
        let host = Rc::new(Host {
            transport: FetchTransport::new(&config),
            controller: RefCell::new(DiagnosisController::new(config)),
            page: Page::mount(window)?,
            listeners: RefCell::default(),
        });

        Host::wire(&host)?;
        publish(&host.controller, &host.page);
        log::info!("diagnosis page mounted");
        Ok(DiagnosisApp { host })
    }

    /// Submit button handler.
    #[wasm_bindgen(js_name = submitImage)]
    pub fn submit_image(&self) {
        let host = Rc::clone(&self.host);
        spawn_local(async move {
            if let Err(rejection) =
                submit_prediction(&host.controller, &host.transport, &host.page).await
            {
                log::debug!("submit ignored: {rejection:?}");
            }
        });
    }

    /// Clear button handler.
    #[wasm_bindgen(js_name = clearImage)]
    pub fn clear_image(&self) {
        self.host.page.reset_file_input();
        update(&self.host.controller, &self.host.page, DiagnosisController::clear);
    }
}

impl Host {
    fn wire(host: &Rc<Self>) -> Result<(), JsValue> {
        let page = &host.page;

        for event_type in ["dragenter", "dragover", "dragleave"] {
            host.listen(&page.file_drag, event_type, |host, event| {
                event.prevent_default();
                event.stop_propagation();
                if let Some(kind) = DragEventKind::from_event_type(&event.type_()) {
                    update(&host.controller, &host.page, |controller| controller.drag(kind));
                }
            })?;
        }

        host.listen(&page.file_drag, "drop", |host, event| {
            event.prevent_default();
            event.stop_propagation();
            let files = event
                .dyn_ref::<DragEvent>()
                .and_then(DragEvent::data_transfer)
                .and_then(|transfer| transfer.files());
            host.select(FileOrigin::Drop, files);
        })?;

        host.listen(&page.file_upload, "change", |host, _event| {
            host.select(FileOrigin::Picker, host.page.file_upload.files());
        })?;

        host.listen(&page.open_chat, "click", |host, _event| {
            let opened = update(&host.controller, &host.page, DiagnosisController::open_chat);
            if let Err(rejection) = opened {
                log::debug!("chat not opened: {rejection:?}");
            }
        })?;

        host.listen(&page.close_chat, "click", |host, _event| {
            update(&host.controller, &host.page, DiagnosisController::close_chat);
        })?;

        host.listen(&page.send_message, "click", |host, _event| host.send())?;

        host.listen(&page.user_message, "keypress", |host, event| {
            let enter = event
                .dyn_ref::<KeyboardEvent>()
                .is_some_and(|key| key.key() == "Enter");
            if enter {
                host.send();
            }
        })?;

        Ok(())
    }

    fn listen(
        self: &Rc<Self>,
        target: &EventTarget,
        event_type: &str,
        handler: impl Fn(&Rc<Self>, &Event) + 'static,
    ) -> Result<(), JsValue> {
        let weak: Weak<Self> = Rc::downgrade(self);
        let listener: Listener = Closure::new(move |event: Event| {
            if let Some(host) = weak.upgrade() {
                handler(&host, &event);
            }
        });
        target.add_event_listener_with_callback(event_type, listener.as_ref().unchecked_ref())?;
        self.listeners.borrow_mut().push(listener);
        Ok(())
    }

    fn select(self: &Rc<Self>, origin: FileOrigin, files: Option<FileList>) {
        let files = files
            .map(|list| (0..list.length()).filter_map(|index| list.get(index)).collect::<Vec<_>>())
            .unwrap_or_default();
        let host = Rc::clone(self);
        spawn_local(async move {
            select_and_decode(
                &host.controller,
                &host.page,
                origin,
                files,
                File::name,
                read_data_uri,
            )
            .await;
        });
    }

    fn send(self: &Rc<Self>) {
        let input = self.page.user_message.value();
        let ticket = match begin_chat_message(&self.controller, &self.page, &input) {
            Ok(ticket) => ticket,
            Err(rejection) => {
                log::debug!("chat message not sent: {rejection:?}");
                return;
            }
        };
        self.page.user_message.set_value("");

        let host = Rc::clone(self);
        spawn_local(async move {
            deliver_chat_message(&host.controller, &host.transport, &host.page, &ticket).await;
        });
    }
}
