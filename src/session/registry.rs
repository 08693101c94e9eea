use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};

use super::id::is_new_conversation;
use crate::error::{RelayError, Result};
use crate::surface::{AgentSurface, PageId};

/// One logical conversation bound to one page of the surface.
#[derive(Debug)]
pub struct Session {
    /// Session ID
    pub id: String,
    page: PageId,
    /// Held for the whole of a turn
    turn: Arc<Mutex<()>>,
    /// Message count seen on the previous turn
    watermark: AtomicUsize,
    /// Creation timestamp (unix millis)
    pub created_at: i64,
}

impl Session {
    fn new(id: &str, page: PageId) -> Self {
        Self {
            id: id.to_string(),
            page,
            turn: Arc::new(Mutex::new(())),
            watermark: AtomicUsize::new(0),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn page(&self) -> &PageId {
        &self.page
    }

    pub fn watermark(&self) -> usize {
        self.watermark.load(Ordering::SeqCst)
    }
}

/// Exclusive use of a session for one turn. Dropping it releases the turn lock.
#[derive(Debug)]
pub struct SessionLease {
    session: Arc<Session>,
    _turn: OwnedMutexGuard<()>,
    fresh: bool,
}

impl SessionLease {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn id(&self) -> &str {
        &self.session.id
    }

    pub fn page(&self) -> &PageId {
        &self.session.page
    }

    /// Whether the session was created by this acquisition.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }
}

/// Owns every live session and the pages behind them.
///
/// The map lock is only held for lookups and inserts, never across surface
/// calls; page work happens under the per-session turn lock.
pub struct SessionRegistry {
    surface: Arc<dyn AgentSurface>,
    sessions: Mutex<HashMap<String, Arc<Session>>>,
    input_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(surface: Arc<dyn AgentSurface>, input_timeout: Duration) -> Self {
        Self {
            surface,
            sessions: Mutex::new(HashMap::new()),
            input_timeout,
        }
    }

    /// Lease the session `id`, creating or recreating its page as needed.
    pub async fn acquire(&self, id: &str, reset_context: bool) -> Result<SessionLease> {
        loop {
            let existing = self.sessions.lock().await.get(id).cloned();

            if let Some(session) = existing {
                let turn = session.turn.clone().lock_owned().await;

                // Evicted or replaced while we waited for the turn.
                if !self.is_registered(&session).await {
                    continue;
                }

                let alive = match self.surface.is_alive(&session.page).await {
                    Ok(alive) => alive,
                    Err(e) => {
                        tracing::debug!(session = id, error = %e, "Liveness probe failed");
                        false
                    }
                };
                if !alive {
                    tracing::warn!(session = id, "Session page is gone, recreating");
                    self.evict(&session).await;
                    continue;
                }

                if reset_context {
                    self.reset_page(id, &session.page).await;
                }

                return Ok(SessionLease {
                    session,
                    _turn: turn,
                    fresh: false,
                });
            }

            let page = self.open_page(id, reset_context).await?;
            let session = Arc::new(Session::new(id, page));
            let turn = session.turn.clone().lock_owned().await;

            let mut sessions = self.sessions.lock().await;
            if sessions.contains_key(id) {
                drop(sessions);
                tracing::debug!(session = id, "Lost creation race, closing duplicate page");
                self.close_quietly(id, &session.page).await;
                continue;
            }
            sessions.insert(id.to_string(), session.clone());
            drop(sessions);

            tracing::info!(session = id, page = %session.page, "Session created");
            return Ok(SessionLease {
                session,
                _turn: turn,
                fresh: true,
            });
        }
    }

    /// Lease the session for a turn carrying `message_count` messages.
    ///
    /// The page's conversation is reset when the session is new or the client
    /// history shrank since the last turn.
    pub async fn begin_turn(&self, id: &str, message_count: usize) -> Result<SessionLease> {
        let lease = self.acquire(id, false).await?;
        let previous = lease.session.watermark.swap(message_count, Ordering::SeqCst);

        if lease.fresh || is_new_conversation(previous, message_count) {
            tracing::info!(
                session = id,
                previous,
                messages = message_count,
                "Starting a new conversation"
            );
            self.reset_page(id, lease.page()).await;
        }

        Ok(lease)
    }

    /// Close the page of `id` and forget the session.
    pub async fn release_session(&self, id: &str) -> Result<()> {
        let session = self
            .sessions
            .lock()
            .await
            .remove(id)
            .ok_or_else(|| RelayError::SessionNotFound(id.to_string()))?;
        self.close_quietly(id, &session.page).await;
        tracing::info!(session = id, "Session released");
        Ok(())
    }

    /// Sorted ids of live sessions.
    pub async fn list_sessions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Close every page; used on shutdown.
    pub async fn close_all(&self) {
        let drained: Vec<Arc<Session>> = self.sessions.lock().await.drain().map(|(_, s)| s).collect();
        for session in drained {
            self.close_quietly(&session.id, &session.page).await;
        }
    }

    async fn open_page(&self, id: &str, reset_context: bool) -> Result<PageId> {
        let page = self.surface.new_page().await?;

        if let Err(e) = self.prepare_page(id, &page, reset_context).await {
            self.close_quietly(id, &page).await;
            return Err(match e {
                RelayError::SessionInit { .. } => e,
                other => RelayError::SessionInit {
                    session: id.to_string(),
                    reason: other.to_string(),
                },
            });
        }
        Ok(page)
    }

    async fn prepare_page(&self, id: &str, page: &PageId, reset_context: bool) -> Result<()> {
        self.surface.navigate(page).await?;

        if !self
            .surface
            .wait_for_input_ready(page, self.input_timeout)
            .await?
        {
            return Err(RelayError::SessionInit {
                session: id.to_string(),
                reason: format!(
                    "input not ready after {}s",
                    self.input_timeout.as_secs_f32()
                ),
            });
        }

        if reset_context
            && self.surface.reset_conversation(page).await?
            && !self
                .surface
                .wait_for_input_ready(page, self.input_timeout)
                .await?
        {
            return Err(RelayError::SessionInit {
                session: id.to_string(),
                reason: "input not ready after conversation reset".to_string(),
            });
        }
        Ok(())
    }

    async fn reset_page(&self, id: &str, page: &PageId) {
        match self.surface.reset_conversation(page).await {
            Ok(true) => {
                if let Ok(false) = self
                    .surface
                    .wait_for_input_ready(page, self.input_timeout)
                    .await
                {
                    tracing::warn!(session = id, "Input not ready after reset");
                }
            }
            Ok(false) => tracing::warn!(session = id, "No reset action on page"),
            Err(e) => tracing::warn!(session = id, error = %e, "Conversation reset failed"),
        }
    }

    async fn is_registered(&self, session: &Arc<Session>) -> bool {
        self.sessions
            .lock()
            .await
            .get(&session.id)
            .is_some_and(|current| Arc::ptr_eq(current, session))
    }

    async fn evict(&self, session: &Arc<Session>) {
        {
            let mut sessions = self.sessions.lock().await;
            if sessions
                .get(&session.id)
                .is_some_and(|current| Arc::ptr_eq(current, session))
            {
                sessions.remove(&session.id);
            }
        }
        self.close_quietly(&session.id, &session.page).await;
    }

    async fn close_quietly(&self, id: &str, page: &PageId) {
        if let Err(e) = self.surface.close(page).await {
            tracing::debug!(session = id, page = %page, error = %e, "Page close failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::memory::MemorySurface;

    fn registry() -> (Arc<MemorySurface>, SessionRegistry) {
        let surface = Arc::new(MemorySurface::new());
        let registry = SessionRegistry::new(surface.clone(), Duration::from_millis(10));
        (surface, registry)
    }

    #[tokio::test]
    async fn test_acquire_creates_then_reuses() {
        let (surface, registry) = registry();

        let page = {
            let lease = registry.acquire("a", false).await.unwrap();
            assert!(lease.is_fresh());
            lease.page().clone()
        };
        let lease = registry.acquire("a", false).await.unwrap();
        assert!(!lease.is_fresh());
        assert_eq!(lease.page(), &page);
        assert_eq!(surface.open_pages(), 1);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_input_never_ready_registers_nothing() {
        let (surface, registry) = registry();
        surface.set_input_ready(false);

        let err = registry.acquire("a", false).await.unwrap_err();
        assert!(matches!(err, RelayError::SessionInit { .. }));
        assert!(registry.is_empty().await);
        assert_eq!(surface.open_pages(), 0);
        assert_eq!(surface.closed(), 1);
    }

    #[tokio::test]
    async fn test_dead_page_is_recreated() {
        let (surface, registry) = registry();

        let first = registry.acquire("a", false).await.unwrap().page().clone();
        surface.kill_page(&first);

        let lease = registry.acquire("a", false).await.unwrap();
        assert!(lease.is_fresh());
        assert_ne!(lease.page(), &first);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_reset_context_on_existing_session() {
        let (surface, registry) = registry();
        drop(registry.acquire("a", false).await.unwrap());
        assert_eq!(surface.resets(), 0);

        drop(registry.acquire("a", true).await.unwrap());
        assert_eq!(surface.resets(), 1);
    }

    #[tokio::test]
    async fn test_begin_turn_watermark() {
        let (surface, registry) = registry();

        drop(registry.begin_turn("a", 12).await.unwrap());
        assert_eq!(surface.resets(), 1, "fresh session starts a new conversation");

        drop(registry.begin_turn("a", 13).await.unwrap());
        assert_eq!(surface.resets(), 1);

        let lease = registry.begin_turn("a", 5).await.unwrap();
        assert_eq!(surface.resets(), 2);
        assert_eq!(lease.session().watermark(), 5);
    }

    #[tokio::test]
    async fn test_turns_on_one_session_are_serialized() {
        let (_surface, registry) = registry();
        let registry = Arc::new(registry);

        let lease = registry.acquire("a", false).await.unwrap();
        let waiting = tokio::time::timeout(
            Duration::from_millis(50),
            registry.acquire("a", false),
        )
        .await;
        assert!(waiting.is_err());

        let other = registry.acquire("b", false).await;
        assert!(other.is_ok());

        drop(lease);
        let again = registry.acquire("a", false).await.unwrap();
        assert!(!again.is_fresh());
    }

    #[tokio::test]
    async fn test_concurrent_creation_keeps_one_session() {
        let (surface, registry) = registry();
        let registry = Arc::new(registry);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.acquire("same", false).await.map(|l| l.page().clone())
            }));
        }

        let mut pages = Vec::new();
        for handle in handles {
            pages.push(handle.await.unwrap().unwrap());
        }
        pages.dedup();
        assert_eq!(pages.len(), 1);
        assert_eq!(registry.len().await, 1);
        assert_eq!(surface.open_pages(), 1);
    }

    #[tokio::test]
    async fn test_release_and_list() {
        let (surface, registry) = registry();
        drop(registry.acquire("b", false).await.unwrap());
        drop(registry.acquire("a", false).await.unwrap());
        assert_eq!(registry.list_sessions().await, vec!["a", "b"]);

        registry.release_session("a").await.unwrap();
        assert_eq!(registry.list_sessions().await, vec!["b"]);
        assert_eq!(surface.closed(), 1);

        let err = registry.release_session("a").await.unwrap_err();
        assert!(matches!(err, RelayError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_close_all() {
        let (surface, registry) = registry();
        drop(registry.acquire("a", false).await.unwrap());
        drop(registry.acquire("b", false).await.unwrap());

        registry.close_all().await;
        assert!(registry.is_empty().await);
        assert_eq!(surface.open_pages(), 0);
    }
}
