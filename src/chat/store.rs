//! Registry of open chat views.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use uuid::Uuid;

use super::view::{ChatView, ViewOptions};
use crate::backend::ChatBackend;

/// Thread-safe store for chat views.
///
/// A view is created per page load and removed when the page goes away.
#[derive(Debug, Clone)]
pub struct ViewStore {
    inner: Arc<ViewStoreInner>,
}

struct ViewStoreInner {
    views: RwLock<HashMap<String, ChatView>>,
    backend: Arc<dyn ChatBackend>,
    options: ViewOptions,
}

impl std::fmt::Debug for ViewStoreInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewStoreInner")
            .field("options", &self.options)
            .finish()
    }
}

impl ViewStore {
    /// Create a store whose views talk to `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn ChatBackend>, options: ViewOptions) -> Self {
        Self {
            inner: Arc::new(ViewStoreInner {
                views: RwLock::new(HashMap::new()),
                backend,
                options,
            }),
        }
    }

    /// Create a new view and return it.
    #[must_use]
    pub fn create(&self) -> ChatView {
        let id = Uuid::new_v4().to_string();
        let view = ChatView::new(id.clone(), Arc::clone(&self.inner.backend), &self.inner.options);
        let mut guard = self
            .inner
            .views
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.insert(id, view.clone());
        view
    }

    /// Get a view by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ChatView> {
        let guard = self
            .inner
            .views
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        guard.get(id).cloned()
    }

    /// Remove a view and tear it down.
    pub fn close(&self, id: &str) -> Option<ChatView> {
        let removed = self
            .inner
            .views
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        if let Some(view) = &removed {
            view.teardown();
        }
        removed
    }

    /// Close the view unless something is subscribed to it.
    ///
    /// Returns whether the view was closed.
    pub fn close_unattached(&self, id: &str) -> bool {
        let removed = {
            let mut views = self
                .inner
                .views
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            match views.get(id).map(ChatView::is_attached) {
                Some(false) => views.remove(id),
                _ => None,
            }
        };
        removed.is_some_and(|view| {
            view.teardown();
            true
        })
    }

    /// Close the view after the attach grace period if its page never
    /// subscribed.
    ///
    /// The task resolves to whether it closed the view.
    pub fn expire_if_unattached(&self, id: &str) -> JoinHandle<bool> {
        let deadline = Instant::now() + self.inner.options.attach_grace;
        let store = self.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            sleep_until(deadline).await;
            store.close_unattached(&id)
        })
    }

    /// Tear down every view (server shutdown).
    pub fn close_all(&self) -> usize {
        let drained: Vec<ChatView> = self
            .inner
            .views
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, view)| view)
            .collect();
        for view in &drained {
            view.teardown();
        }
        drained.len()
    }

    /// Get the number of open views.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .views
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if there are no views.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backend::{ChatReply, ChatRequest};
    use crate::error::{Result, StreamError};

    struct Offline;

    #[async_trait::async_trait]
    impl ChatBackend for Offline {
        async fn open(&self, _req: &ChatRequest) -> Result<ChatReply> {
            Err(StreamError::Status { status: 503 })
        }
    }

    #[test]
    fn test_view_store() {
        let store = ViewStore::new(Arc::new(Offline), ViewOptions::default());
        assert!(store.is_empty());

        let view = store.create();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(view.id()).unwrap().id(), view.id());

        let closed = store.close(view.id()).unwrap();
        assert!(closed.is_closed());
        assert!(store.is_empty());
        assert!(store.close(view.id()).is_none());
    }

    #[test]
    fn test_views_are_independent() {
        let store = ViewStore::new(Arc::new(Offline), ViewOptions::default());
        let a = store.create();
        let b = store.create();
        assert!(a.assign_session("sess-a"));
        assert!(b.session_id().is_none());
        assert_eq!(store.close_all(), 2);
        assert!(a.is_closed() && b.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unattached_view_expires_after_grace() {
        let options = ViewOptions {
            attach_grace: Duration::from_secs(30),
            ..ViewOptions::default()
        };
        let store = ViewStore::new(Arc::new(Offline), options);
        let idle = store.create();
        let attached = store.create();
        let _updates = attached.subscribe();

        let idle_expiry = store.expire_if_unattached(idle.id());
        let attached_expiry = store.expire_if_unattached(attached.id());

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(store.len(), 2);
        assert!(!idle.is_closed());

        assert!(idle_expiry.await.unwrap());
        assert!(!attached_expiry.await.unwrap());
        assert!(idle.is_closed());
        assert!(store.get(idle.id()).is_none());
        assert!(store.get(attached.id()).is_some());
    }

    #[test]
    fn test_close_unattached_skips_subscribed_and_missing() {
        let store = ViewStore::new(Arc::new(Offline), ViewOptions::default());
        let view = store.create();
        let updates = view.subscribe();

        assert!(!store.close_unattached(view.id()));
        assert!(!store.close_unattached("missing"));

        drop(updates);
        assert!(store.close_unattached(view.id()));
        assert!(view.is_closed());
    }
}
