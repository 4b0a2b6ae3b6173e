use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

/// Fault raised by a [`Transport`] before a JSON body could be handed back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response body: {0}")]
    Decode(String),
    #[error("{0}")]
    Other(String),
}

/// Minimal upstream HTTP contract used by the suppliers.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(
        &self,
        url: &str,
        params: &[(&str, String)],
        headers: &[(&str, String)],
    ) -> Result<Value, TransportError>;
}

pub struct WreqTransport {
    client: wreq::Client,
}

impl WreqTransport {
    pub fn new(client: wreq::Client) -> Self {
        Self { client }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, wreq::Error> {
        let client = wreq::Client::builder().timeout(timeout).build()?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Transport for WreqTransport {
    async fn get_json(
        &self,
        url: &str,
        params: &[(&str, String)],
        headers: &[(&str, String)],
    ) -> Result<Value, TransportError> {
        debug!(url = %url, "upstream GET");

        let mut req = self.client.get(url).query(params);
        for (name, value) in headers {
            req = req.header(*name, value.as_str());
        }

        let resp = req.send().await.map_err(classify)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|err| {
                warn!(url = %url, status = status.as_u16(), error = %err, "unreadable error body");
                String::new()
            });
            return Err(TransportError::Status { status: status.as_u16(), body });
        }

        resp.json::<Value>().await.map_err(|err| {
            if err.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Decode(err.to_string())
            }
        })
    }
}

fn classify(err: wreq::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}
