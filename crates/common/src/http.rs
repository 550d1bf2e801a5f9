//! JSON-over-HTTP helper used by every provider module and the sync client.
//!
//! Transport failures map onto [`KinkoError`]: timeouts become `Timeout`,
//! 429 becomes `RateLimited`, any other non-2xx becomes `Http`.

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;

use crate::constants::DEFAULT_TIMEOUT_SECS;
use crate::error::{KinkoError, KinkoResult};

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    label: String,
}

impl HttpClient {
    /// Client with an explicit per-request timeout. `label` tags errors.
    pub fn new(label: &str, timeout_secs: u64) -> KinkoResult<Self> {
        let secs = if timeout_secs == 0 { DEFAULT_TIMEOUT_SECS } else { timeout_secs };
        let inner = reqwest::Client::builder()
            .timeout(Duration::from_secs(secs))
            .user_agent(concat!("kinko/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| KinkoError::Config(format!("HTTP client for {label}: {e}")))?;
        Ok(Self { inner, label: label.to_string() })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.inner.get(url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.inner.post(url)
    }

    pub fn put(&self, url: &str) -> RequestBuilder {
        self.inner.put(url)
    }

    /// Send and return status plus raw body, without judging the status.
    pub async fn send_raw(&self, req: RequestBuilder) -> KinkoResult<(StatusCode, String)> {
        let resp = req.send().await.map_err(|e| self.transport_error(e))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        Ok((status, body))
    }

    /// Send and parse a JSON body from a 2xx response.
    pub async fn send_json(&self, req: RequestBuilder) -> KinkoResult<Value> {
        let (status, body) = self.send_raw(req).await?;
        if !status.is_success() {
            return Err(self.status_error(status, &body));
        }
        serde_json::from_str(&body).map_err(|e| KinkoError::Parse(format!("{}: {e}", self.label)))
    }

    /// `GET url` → JSON.
    pub async fn get_json(&self, url: &str) -> KinkoResult<Value> {
        self.send_json(self.get(url)).await
    }

    pub fn status_error(&self, status: StatusCode, body: &str) -> KinkoError {
        if status == StatusCode::TOO_MANY_REQUESTS {
            return KinkoError::RateLimited(self.label.clone());
        }
        let mut body = body.trim().to_string();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        KinkoError::Http { status: status.as_u16(), body: format!("{}: {body}", self.label) }
    }

    fn transport_error(&self, e: reqwest::Error) -> KinkoError {
        if e.is_timeout() {
            KinkoError::Timeout(self.label.clone())
        } else {
            KinkoError::Network(format!("{}: {e}", self.label))
        }
    }
}

/// Join a base URL and a path without doubling slashes.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
