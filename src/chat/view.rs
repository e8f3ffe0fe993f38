//! Per-page chat view: conversation, draft, session token and active stream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::input::InputController;
use super::message::{Conversation, Message};
use crate::backend::ChatBackend;
use crate::consumer::{self, CycleOutcome};

/// Greeting that opens every conversation.
pub const DEFAULT_GREETING: &str =
    "Hello! I am your Python Assistant. How can I help you code today?";

/// Text shown when a chat cycle fails.
pub const DEFAULT_ERROR_MESSAGE: &str = "Sorry, I encountered an error.";

/// How long a new view waits for its page to subscribe before it is closed.
pub const DEFAULT_ATTACH_GRACE: Duration = Duration::from_secs(30);

/// Settings a view is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewOptions {
    /// Bot message that opens the conversation.
    pub greeting: String,
    /// Bot message appended when a cycle fails.
    pub error_message: String,
    /// Time a view may stay without subscribers after it is opened.
    pub attach_grace: Duration,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            attach_grace: DEFAULT_ATTACH_GRACE,
        }
    }
}

/// Ownership of the conversation's append target for one stream.
#[derive(Debug, Clone)]
pub struct StreamTicket {
    /// Monotonic id within the view.
    pub id: u64,
    /// Cancelled when the stream is superseded, stopped or torn down.
    pub token: CancellationToken,
}

#[derive(Debug)]
struct ActiveStream {
    id: u64,
    token: CancellationToken,
}

/// The state behind one open chat page.
///
/// Cloning is cheap; clones share the same state.
#[derive(Debug, Clone)]
pub struct ChatView {
    inner: Arc<ViewInner>,
}

struct ViewInner {
    id: String,
    conversation: watch::Sender<Conversation>,
    session: OnceLock<String>,
    input: Mutex<InputController>,
    active: Mutex<Option<ActiveStream>>,
    next_stream: AtomicU64,
    lifecycle: CancellationToken,
    error_message: String,
    backend: Arc<dyn ChatBackend>,
}

impl std::fmt::Debug for ViewInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewInner")
            .field("id", &self.id)
            .field("session", &self.session.get())
            .field("messages", &self.conversation.borrow().len())
            .finish()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ChatView {
    /// Create a view whose conversation starts with the greeting.
    pub fn new(id: impl Into<String>, backend: Arc<dyn ChatBackend>, options: &ViewOptions) -> Self {
        let (tx, _rx) = watch::channel(Conversation::with_greeting(options.greeting.clone()));
        Self {
            inner: Arc::new(ViewInner {
                id: id.into(),
                conversation: tx,
                session: OnceLock::new(),
                input: Mutex::new(InputController::new()),
                active: Mutex::new(None),
                next_stream: AtomicU64::new(1),
                lifecycle: CancellationToken::new(),
                error_message: options.error_message.clone(),
                backend,
            }),
        }
    }

    /// View identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Current conversation snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Conversation {
        self.inner.conversation.borrow().clone()
    }

    /// Receiver notified on every conversation change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Conversation> {
        self.inner.conversation.subscribe()
    }

    /// Whether anything is subscribed to conversation changes.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.conversation.receiver_count() > 0
    }

    /// Session token, once the backend assigned one.
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.inner.session.get().cloned()
    }

    /// Store the session token. First write wins; returns whether this call
    /// stored it.
    pub fn assign_session(&self, id: &str) -> bool {
        self.inner.session.set(id.to_string()).is_ok()
    }

    /// Current draft text.
    #[must_use]
    pub fn draft(&self) -> String {
        lock(&self.inner.input).draft().to_string()
    }

    /// Replace the draft and submit it.
    ///
    /// Returns the spawned cycle when the draft was accepted, `None` (and the
    /// draft kept) when it was blank.
    pub fn submit_draft(&self, draft: impl Into<String>) -> Option<JoinHandle<CycleOutcome>> {
        let accepted = {
            let mut input = lock(&self.inner.input);
            input.set_draft(draft);
            input.submit()
        }?;
        Some(self.send(accepted))
    }

    /// Start a chat cycle for `text`.
    ///
    /// The user message is appended before this returns. Any stream still
    /// running for this view is cancelled first.
    pub fn send(&self, text: String) -> JoinHandle<CycleOutcome> {
        let ticket = self.begin_stream(&text);
        let view = self.clone();
        tokio::spawn(async move { consumer::run_cycle(&view, &ticket, text).await })
    }

    /// Cancel the running stream, if any. Already streamed text stays.
    pub fn cancel_active(&self) -> bool {
        match lock(&self.inner.active).take() {
            Some(active) => {
                active.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a stream currently owns the conversation.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        lock(&self.inner.active).is_some()
    }

    /// Cancel everything tied to this view.
    pub fn teardown(&self) {
        self.cancel_active();
        self.inner.lifecycle.cancel();
    }

    /// Whether the view has been torn down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lifecycle.is_cancelled()
    }

    /// Resolves once the view is torn down.
    pub async fn closed(&self) {
        self.inner.lifecycle.cancelled().await;
    }

    pub(crate) fn backend(&self) -> Arc<dyn ChatBackend> {
        Arc::clone(&self.inner.backend)
    }

    pub(crate) fn error_message(&self) -> &str {
        &self.inner.error_message
    }

    /// Take ownership of the append target and append the user message.
    fn begin_stream(&self, text: &str) -> StreamTicket {
        let id = self.inner.next_stream.fetch_add(1, Ordering::Relaxed);
        let token = self.inner.lifecycle.child_token();

        let mut active = lock(&self.inner.active);
        if let Some(previous) = active.replace(ActiveStream {
            id,
            token: token.clone(),
        }) {
            previous.token.cancel();
        }
        self.inner
            .conversation
            .send_modify(|c| c.push(Message::user(text)));
        drop(active);

        StreamTicket { id, token }
    }

    /// Mutate the conversation on behalf of stream `id`.
    ///
    /// Returns `false` without touching anything if the stream no longer owns
    /// the append target.
    pub(crate) fn apply(&self, id: u64, f: impl FnOnce(&mut Conversation)) -> bool {
        let active = lock(&self.inner.active);
        if !active.as_ref().is_some_and(|a| a.id == id) {
            return false;
        }
        self.inner.conversation.send_modify(f);
        true
    }

    /// Release ownership held by stream `id`.
    pub(crate) fn finish_stream(&self, id: u64) {
        let mut active = lock(&self.inner.active);
        if active.as_ref().is_some_and(|a| a.id == id) {
            *active = None;
            // Wake subscribers so they pick up the idle status.
            self.inner.conversation.send_modify(|_| {});
        }
    }
}
