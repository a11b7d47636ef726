use derma_core::{DecodeError, DecodeResult, SelectedImage};
use js_sys::Promise;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{File, FileReader};

use crate::fetch::describe;

/// Reads `file` as a data URI and validates that it describes an image.
pub async fn read_data_uri(file: File) -> DecodeResult<SelectedImage> {
    let name = file.name();
    let reader = FileReader::new().map_err(|error| read_error(&name, "create-reader", &error))?;

    let promise = Promise::new(&mut |resolve, reject| {
        let target = reader.clone();
        let on_load_end = Closure::once_into_js(move || {
            let settled = match target.error() {
                Some(error) => reject.call1(&JsValue::UNDEFINED, &error),
                None => match target.result() {
                    Ok(value) => resolve.call1(&JsValue::UNDEFINED, &value),
                    Err(error) => reject.call1(&JsValue::UNDEFINED, &error),
                },
            };
            if let Err(error) = settled {
                log::warn!("file reader promise did not settle: {}", describe(&error));
            }
        });
        reader.set_onloadend(Some(on_load_end.unchecked_ref()));
    });

    reader
        .read_as_data_url(&file)
        .map_err(|error| read_error(&name, "start-read", &error))?;
    let value = JsFuture::from(promise)
        .await
        .map_err(|error| read_error(&name, "read-data-url", &error))?;

    let Some(data_uri) = value.as_string() else {
        return Err(DecodeError::Read {
            stage: "read-data-url",
            name,
            message: "reader produced no text".to_string(),
        });
    };
    SelectedImage::from_data_uri(name, data_uri)
}

fn read_error(name: &str, stage: &'static str, error: &JsValue) -> DecodeError {
    DecodeError::Read {
        stage,
        name: name.to_string(),
        message: describe(error),
    }
}
