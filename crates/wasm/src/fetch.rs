use derma_core::{ClientConfig, ClientError, ClientResult, HttpReply, Transport};
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, Request, RequestInit, RequestMode, Response, Window};

/// `Transport` over `window.fetch`, aborted after the configured timeout.
#[derive(Debug, Clone)]
pub struct FetchTransport {
    config: ClientConfig,
}

impl FetchTransport {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    async fn send(&self, path: &str, body: String) -> ClientResult<HttpReply> {
        let window = web_sys::window().ok_or_else(|| ClientError::Transport {
            stage: "resolve-window",
            message: "no global window".to_string(),
        })?;
        let url = self.config.endpoint_url(path);
        let abort =
            AbortController::new().map_err(|error| transport_error("abort-controller", &error))?;

        let init = RequestInit::new();
        init.set_method("POST");
        init.set_mode(RequestMode::Cors);
        init.set_body(&JsValue::from_str(&body));
        init.set_signal(Some(&abort.signal()));
        let request = Request::new_with_str_and_init(&url, &init)
            .map_err(|error| transport_error("build-request", &error))?;
        request
            .headers()
            .set("Content-Type", "application/json")
            .map_err(|error| transport_error("set-headers", &error))?;

        let timer = self.arm_timeout(&window, &abort)?;
        let exchanged = exchange(&window, &request).await;
        if let Some(handle) = timer {
            window.clear_timeout_with_handle(handle);
        }

        exchanged.map_err(|error| {
            if abort.signal().aborted() {
                ClientError::Timeout {
                    stage: "fetch",
                    endpoint: path.to_string(),
                    seconds: self.config.request_timeout_secs,
                }
            } else {
                transport_error("fetch", &error)
            }
        })
    }

    fn arm_timeout(&self, window: &Window, abort: &AbortController) -> ClientResult<Option<i32>> {
        let seconds = self.config.request_timeout_secs;
        if seconds == 0 {
            return Ok(None);
        }

        let millis = i32::try_from(seconds.saturating_mul(1000)).unwrap_or(i32::MAX);
        let abort = abort.clone();
        let callback = Closure::once_into_js(move || abort.abort());
        window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), millis)
            .map(Some)
            .map_err(|error| transport_error("arm-timeout", &error))
    }
}

impl Transport for FetchTransport {
    fn post_json<'a>(
        &'a self,
        path: &'a str,
        body: String,
    ) -> LocalBoxFuture<'a, ClientResult<HttpReply>> {
        self.send(path, body).boxed_local()
    }
}

async fn exchange(window: &Window, request: &Request) -> Result<HttpReply, JsValue> {
    let response: Response = JsFuture::from(window.fetch_with_request(request))
        .await?
        .dyn_into()?;
    let status = response.status();
    let body = JsFuture::from(response.text()?).await?;
    log::debug!("{} answered {}", response.url(), status);
    Ok(HttpReply::new(status, body.as_string().unwrap_or_default()))
}

fn transport_error(stage: &'static str, error: &JsValue) -> ClientError {
    ClientError::Transport {
        stage,
        message: describe(error),
    }
}

pub(crate) fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}
