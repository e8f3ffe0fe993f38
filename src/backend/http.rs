//! `reqwest` implementation of [`ChatBackend`].

use std::time::Duration;

use futures::{StreamExt, TryStreamExt};
use url::Url;

use super::{ChatBackend, ChatReply, ChatRequest, SESSION_HEADER};
use crate::error::{Result, StreamError};

/// Chat backend reached over HTTP.
#[derive(Clone)]
pub struct HttpChatBackend {
    http: reqwest::Client,
    endpoint: Url,
    session_header: String,
}

impl std::fmt::Debug for HttpChatBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChatBackend")
            .field("endpoint", &self.endpoint.as_str())
            .field("session_header", &self.session_header)
            .finish()
    }
}

impl HttpChatBackend {
    /// Create a backend for the full chat endpoint URL
    /// (e.g. `http://localhost:8000/api/chat`).
    pub fn new(endpoint: impl AsRef<str>) -> Result<Self> {
        Self::with_client(endpoint, reqwest::Client::new())
    }

    /// Create a backend with a custom reqwest client.
    pub fn with_client(endpoint: impl AsRef<str>, http: reqwest::Client) -> Result<Self> {
        let endpoint = Url::parse(endpoint.as_ref())?;
        Ok(Self {
            http,
            endpoint,
            session_header: SESSION_HEADER.to_string(),
        })
    }

    /// Create a backend whose client gives up connecting after `timeout`.
    pub fn with_connect_timeout(endpoint: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().connect_timeout(timeout).build()?;
        Self::with_client(endpoint, http)
    }

    /// Read the session token from a different response header.
    #[must_use]
    pub fn session_header(mut self, name: impl Into<String>) -> Self {
        self.session_header = name.into();
        self
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl ChatBackend for HttpChatBackend {
    async fn open(&self, req: &ChatRequest) -> Result<ChatReply> {
        let resp = self
            .http
            .post(self.endpoint.clone())
            .json(req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(StreamError::Status {
                status: status.as_u16(),
            });
        }

        let session_id = resp
            .headers()
            .get(self.session_header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string);

        let body = resp
            .bytes_stream()
            .map_err(|e| StreamError::Read(e.to_string()))
            .boxed();

        Ok(ChatReply {
            session_id,
            body: Some(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_endpoint() {
        assert!(matches!(
            HttpChatBackend::new("not a url"),
            Err(StreamError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_custom_session_header() {
        let backend = HttpChatBackend::new("http://localhost:8000/api/chat")
            .unwrap()
            .session_header("X-Conversation");
        assert_eq!(backend.session_header, "X-Conversation");
        assert_eq!(backend.endpoint().path(), "/api/chat");
    }
}
