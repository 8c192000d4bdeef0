use axum::http::{header, HeaderMap};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use crate::session::SessionContext;

pub type SessionId = Uuid;

pub const SESSION_COOKIE: &str = "qachat_session";

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

struct SessionSlot {
    context: SessionContext,
    last_seen: Instant,
}

type SharedSlot = Arc<Mutex<SessionSlot>>;

/// Browser sessions keyed by cookie.
///
/// Each session sits behind its own lock. A handler holds it for the whole
/// request through [`checkout`](Self::checkout), so two requests on one
/// cookie run one after the other against the same context. Contexts that
/// hold nothing are not kept, and [`sweep_idle`](Self::sweep_idle) drops
/// sessions nobody has touched within the idle timeout.
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, SharedSlot>>,
    idle_timeout: Duration,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// A session's context, locked until handed back with [`SessionManager::release`]
pub struct SessionGuard {
    id: SessionId,
    slot: SharedSlot,
    guard: OwnedMutexGuard<SessionSlot>,
}

impl SessionGuard {
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl Deref for SessionGuard {
    type Target = SessionContext;

    fn deref(&self) -> &SessionContext {
        &self.guard.context
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut SessionContext {
        &mut self.guard.context
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Lock the context for `id`, waiting for any request already holding it.
    /// An unknown id gets a fresh context.
    pub async fn checkout(&self, id: SessionId) -> SessionGuard {
        let slot = {
            let mut sessions = self.sessions.write().await;
            sessions
                .entry(id)
                .or_insert_with(|| {
                    Arc::new(Mutex::new(SessionSlot {
                        context: SessionContext::default(),
                        last_seen: Instant::now(),
                    }))
                })
                .clone()
        };

        let mut guard = slot.clone().lock_owned().await;
        guard.last_seen = Instant::now();
        SessionGuard { id, slot, guard }
    }

    /// Unlock a session. A context left with nothing in it is forgotten.
    pub async fn release(&self, mut session: SessionGuard) {
        session.guard.last_seen = Instant::now();
        let pristine = session.guard.context.is_pristine();

        let mut sessions = self.sessions.write().await;
        if pristine {
            if sessions
                .get(&session.id)
                .is_some_and(|current| Arc::ptr_eq(current, &session.slot))
            {
                sessions.remove(&session.id);
            }
        } else {
            // The slot may have been dropped while this request waited on it
            sessions.entry(session.id).or_insert_with(|| session.slot.clone());
        }
    }

    /// Drop sessions idle for longer than the timeout; returns how many went
    pub async fn sweep_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, slot| match slot.try_lock() {
            Ok(slot) => slot.last_seen.elapsed() < self.idle_timeout,
            // In use by a request
            Err(_) => true,
        });
        before - sessions.len()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Session id from the request's `Cookie` headers
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// `Set-Cookie` value for a session id
pub fn session_cookie(id: &SessionId) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id)
}
