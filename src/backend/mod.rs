//! Remote chat backend abstraction.
//!
//! The [`ChatBackend`] trait is the seam between the stream consumer and the
//! network. [`HttpChatBackend`] talks to the real endpoint over `reqwest`;
//! tests substitute scripted backends.
//!
//! # Wire format
//!
//! - Request: `POST <endpoint>` with JSON `{ "query": ..., "session_id": ... }`
//! - Response: optional session header, raw UTF-8 body with no framing

pub mod http;

pub use http::HttpChatBackend;

use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default response header carrying the backend session token.
pub const SESSION_HEADER: &str = "X-Session-Id";

/// Raw response body as a stream of byte chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Request body sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message, as typed.
    pub query: String,
    /// Session token from an earlier response; `null` on first contact.
    pub session_id: Option<String>,
}

/// A successful response, headers read, body not yet consumed.
pub struct ChatReply {
    /// Session token announced by the backend, if any.
    pub session_id: Option<String>,
    /// Response body; `None` if the backend sent none.
    pub body: Option<ByteStream>,
}

impl std::fmt::Debug for ChatReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatReply")
            .field("session_id", &self.session_id)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Something that can answer a chat request with a streamed reply.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send `req` and resolve once response headers are available.
    ///
    /// Non-success statuses must be reported as errors.
    async fn open(&self, req: &ChatRequest) -> Result<ChatReply>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_null_session() {
        let req = ChatRequest {
            query: "hi".to_string(),
            session_id: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({ "query": "hi", "session_id": null }));
    }
}
