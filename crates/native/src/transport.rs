use std::time::Duration;

use derma_core::{ClientConfig, ClientError, ClientResult, HttpReply, Transport};
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use reqwest::header::CONTENT_TYPE;

/// `Transport` over a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let mut builder = reqwest::Client::builder();
        if config.request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.request_timeout_secs));
        }
        let client = builder.build().map_err(|error| ClientError::Transport {
            stage: "build-http-client",
            message: error.to_string(),
        })?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    async fn send(&self, path: &str, body: String) -> ClientResult<HttpReply> {
        let url = self.config.endpoint_url(path);
        tracing::debug!(%url, bytes = body.len(), "posting json");

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|error| self.classify(path, "send-request", error))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|error| self.classify(path, "read-response-body", error))?;
        tracing::debug!(%url, status, "response received");
        Ok(HttpReply::new(status, body))
    }

    fn classify(&self, path: &str, stage: &'static str, error: reqwest::Error) -> ClientError {
        if error.is_timeout() {
            ClientError::Timeout {
                stage,
                endpoint: path.to_string(),
                seconds: self.config.request_timeout_secs,
            }
        } else {
            ClientError::Transport {
                stage,
                message: error.to_string(),
            }
        }
    }
}

impl Transport for ReqwestTransport {
    fn post_json<'a>(
        &'a self,
        path: &'a str,
        body: String,
    ) -> LocalBoxFuture<'a, ClientResult<HttpReply>> {
        self.send(path, body).boxed_local()
    }
}
