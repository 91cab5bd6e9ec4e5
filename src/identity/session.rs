use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use parking_lot::RwLock;
use crate::error::{AppError, AppResult};
use crate::tprintln;

use super::principal::User;

pub type SessionId = String;

/// An authenticated principal together with the bearer credential the API issued for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: User,
    pub token: String,
}

impl Session {
    pub fn new(user: User, token: impl Into<String>) -> Self {
        Self { user, token: token.into() }
    }
}

/// Read-only lookup of the session a request or navigation runs under.
///
/// Implementations return an owned snapshot; callers hold it for one
/// dispatch or one gate evaluation even if the store changes meanwhile.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_session(&self) -> Option<Session>;
}

/// A fixed snapshot: `None` for anonymous calls, `Some` for a known principal.
#[async_trait]
impl SessionProvider for Option<Session> {
    async fn current_session(&self) -> Option<Session> { self.clone() }
}

#[async_trait]
impl<P: SessionProvider + ?Sized> SessionProvider for Arc<P> {
    async fn current_session(&self) -> Option<Session> { (**self).current_session().await }
}

#[derive(Debug)]
struct StoredSession {
    session: Session,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct StoreInner {
    sessions: HashMap<SessionId, StoredSession>,
    by_user: HashMap<String, HashSet<SessionId>>,
}

impl StoreInner {
    fn remove(&mut self, sid: &str) -> Option<StoredSession> {
        let ent = self.sessions.remove(sid)?;
        let uid = &ent.session.user.id;
        if let Some(set) = self.by_user.get_mut(uid) {
            set.remove(sid);
            if set.is_empty() { self.by_user.remove(uid); }
        }
        Some(ent)
    }

    /// Drop every entry past its expiry; returns how many went.
    fn prune(&mut self, now: Instant) -> usize {
        let expired: Vec<SessionId> = self.sessions
            .iter()
            .filter(|(_, e)| e.expires_at <= now)
            .map(|(sid, _)| sid.clone())
            .collect();
        for sid in &expired { self.remove(sid); }
        expired.len()
    }
}

/// Process-wide session storage keyed by an opaque local session id.
///
/// The id travels in the browser cookie; the API token never leaves the server.
#[derive(Clone)]
pub struct SessionStore {
    ttl: Duration,
    inner: Arc<RwLock<StoreInner>>,
}

impl Default for SessionStore {
    fn default() -> Self { Self::new(Duration::from_secs(60 * 60)) }
}

fn encode_id<F>(fill: F) -> AppResult<SessionId>
where
    F: FnOnce(&mut [u8]) -> Result<(), getrandom::Error>,
{
    let mut buf = [0u8; 32];
    fill(&mut buf).map_err(|e| AppError::internal("session_id".to_string(), format!("no randomness for session id: {}", e)))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

fn gen_id() -> AppResult<SessionId> { encode_id(getrandom::getrandom) }

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, inner: Arc::new(RwLock::new(StoreInner::default())) }
    }

    pub fn ttl(&self) -> Duration { self.ttl }

    /// Store a freshly granted session and return the id to hand to the browser.
    /// Expired entries of other browsers are swept out on the way.
    pub fn issue(&self, session: Session) -> AppResult<SessionId> {
        let sid = gen_id()?;
        let now = Instant::now();
        let user_id = session.user.id.clone();
        let mut inner = self.inner.write();
        let pruned = inner.prune(now);
        inner.sessions.insert(sid.clone(), StoredSession { session, expires_at: now + self.ttl });
        inner.by_user.entry(user_id.clone()).or_default().insert(sid.clone());
        tracing::debug!(target: "session", user = %user_id, ttl_secs = self.ttl.as_secs(), pruned, "session.issue");
        Ok(sid)
    }

    /// Return the live session for `sid`, dropping it if it has expired.
    pub fn lookup(&self, sid: &str) -> Option<Session> {
        let now = Instant::now();
        {
            let inner = self.inner.read();
            match inner.sessions.get(sid) {
                Some(ent) if ent.expires_at > now => return Some(ent.session.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        tprintln!("session.expired sid={}", sid);
        self.sign_out(sid);
        None
    }

    pub fn sign_out(&self, sid: &str) -> bool {
        let Some(ent) = self.inner.write().remove(sid) else { return false; };
        tracing::debug!(target: "session", user = %ent.session.user.id, "session.sign_out");
        true
    }

    /// Drop every session belonging to `user_id`; returns how many were removed.
    pub fn revoke_user(&self, user_id: &str) -> usize {
        let mut inner = self.inner.write();
        let Some(sids) = inner.by_user.remove(user_id) else { return 0; };
        let mut count = 0usize;
        for sid in sids.iter() {
            if inner.sessions.remove(sid).is_some() { count += 1; }
        }
        tracing::info!(target: "session", user = %user_id, count, "session.revoke_user");
        count
    }

    pub fn len(&self) -> usize { self.inner.read().sessions.len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Provider bound to one browser session; `None` yields an anonymous handle.
    pub fn handle(&self, sid: Option<SessionId>) -> SessionHandle {
        SessionHandle { store: self.clone(), sid }
    }
}

/// The view of the store one browser holds through its cookie.
#[derive(Clone)]
pub struct SessionHandle {
    store: SessionStore,
    sid: Option<SessionId>,
}

impl SessionHandle {
    pub fn sid(&self) -> Option<&str> { self.sid.as_deref() }

    pub fn sign_out(&self) -> bool {
        match &self.sid {
            Some(sid) => self.store.sign_out(sid),
            None => false,
        }
    }
}

#[async_trait]
impl SessionProvider for SessionHandle {
    async fn current_session(&self) -> Option<Session> {
        self.store.lookup(self.sid.as_deref()?)
    }
}
