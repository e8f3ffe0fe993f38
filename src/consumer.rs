//! One request/response cycle per send.
//!
//! The user message is already in the conversation when [`run_cycle`] starts
//! (see [`ChatView::send`]). The cycle then:
//!
//! 1. posts the query with the current session token,
//! 2. records the session token from the first response that carries one,
//! 3. appends an empty bot placeholder,
//! 4. folds every decoded chunk into that placeholder until end of stream.
//!
//! Any failure appends one fixed error message. Cancellation is checked while
//! waiting for headers and while waiting for each chunk, and appends nothing.

use futures::StreamExt;
use tracing::{info, warn};

use crate::backend::ChatRequest;
use crate::chat::{ChatView, Message, StreamTicket, Utf8StreamDecoder};
use crate::error::{Result, StreamError};

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The body was read to the end.
    Completed,
    /// The error message was appended.
    Failed,
    /// The stream was stopped, superseded or torn down.
    Cancelled,
}

/// Run one chat cycle for `query` on behalf of `ticket`.
pub async fn run_cycle(view: &ChatView, ticket: &StreamTicket, query: String) -> CycleOutcome {
    let request = ChatRequest {
        query,
        session_id: view.session_id(),
    };

    info!(
        name: "chat.stream.started",
        view = %view.id(),
        stream = ticket.id,
        has_session = request.session_id.is_some(),
        "Chat stream started"
    );

    let outcome = match consume(view, ticket, &request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(
                name: "chat.stream.failed",
                view = %view.id(),
                stream = ticket.id,
                error = %e,
                "Chat stream failed"
            );
            let error_message = view.error_message().to_string();
            if view.apply(ticket.id, |c| c.push(Message::bot(error_message))) {
                CycleOutcome::Failed
            } else {
                CycleOutcome::Cancelled
            }
        }
    };

    if outcome == CycleOutcome::Cancelled {
        info!(
            name: "chat.stream.cancelled",
            view = %view.id(),
            stream = ticket.id,
            "Chat stream cancelled"
        );
    }

    view.finish_stream(ticket.id);
    outcome
}

async fn consume(view: &ChatView, ticket: &StreamTicket, request: &ChatRequest) -> Result<CycleOutcome> {
    let backend = view.backend();

    let reply = tokio::select! {
        biased;
        () = ticket.token.cancelled() => return Ok(CycleOutcome::Cancelled),
        reply = backend.open(request) => reply?,
    };

    if let Some(session_id) = reply.session_id.as_deref() {
        if view.assign_session(session_id) {
            info!(
                name: "chat.session.assigned",
                view = %view.id(),
                session_id = %session_id,
                "Backend session assigned"
            );
        }
    }

    let mut body = reply.body.ok_or(StreamError::MissingBody)?;

    if !view.apply(ticket.id, |c| c.push(Message::bot(""))) {
        return Ok(CycleOutcome::Cancelled);
    }

    let mut decoder = Utf8StreamDecoder::new();
    let mut received = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            () = ticket.token.cancelled() => return Ok(CycleOutcome::Cancelled),
            next = body.next() => next,
        };
        let Some(chunk) = next else { break };
        let chunk = chunk?;
        received += chunk.len();

        let text = decoder.decode(&chunk);
        if !append(view, ticket, &text) {
            return Ok(CycleOutcome::Cancelled);
        }
    }

    let tail = decoder.finish();
    if !append(view, ticket, &tail) {
        return Ok(CycleOutcome::Cancelled);
    }

    info!(
        name: "chat.stream.completed",
        view = %view.id(),
        stream = ticket.id,
        bytes = received,
        "Chat stream completed"
    );
    Ok(CycleOutcome::Completed)
}

/// Append decoded text to the placeholder. Returns `false` if ownership was
/// lost.
fn append(view: &ChatView, ticket: &StreamTicket, text: &str) -> bool {
    if text.is_empty() {
        return true;
    }
    view.apply(ticket.id, |c| {
        c.append_to_last(text);
    })
}
