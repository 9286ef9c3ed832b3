//! Push transport: one request/response pair per widget update.

use std::time::Duration;

use hudpush_proto::{PushRequest, PushResponse};
use url::Url;

use crate::error::TransportError;
use crate::props::Props;

/// Moves a single request to the dashboard and returns its decoded answer.
#[allow(async_fn_in_trait)]
pub trait PushTransport {
    async fn send(&self, req: &PushRequest) -> Result<PushResponse, TransportError>;
}

/// JSON over HTTP `POST`.
pub struct HttpTransport {
    client: reqwest::Client,
    url: Url,
}

impl HttpTransport {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self { client, url })
    }
}

impl PushTransport for HttpTransport {
    async fn send(&self, req: &PushRequest) -> Result<PushResponse, TransportError> {
        let resp = self
            .client
            .post(self.url.clone())
            .json(req)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Request(e.to_string())
                }
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        serde_json::from_slice::<PushResponse>(&body)
            .map_err(|e| TransportError::Malformed(e.to_string()))
    }
}

pub struct PushClient<T> {
    transport: T,
}

impl<T: PushTransport> PushClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `req` and return the widget's current props. An answer without a
    /// props object yields empty `Props`, which callers treat as "no update",
    /// the same as a transport error.
    pub async fn push(&self, req: &PushRequest) -> Result<Props, TransportError> {
        let resp = self.transport.send(req).await?;
        Ok(Props::from(resp.into_props()))
    }
}
