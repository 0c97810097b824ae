//! Session values and the store contract.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Attribute {
    value: String,
    expires_at: Option<Instant>,
}

impl Attribute {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// One client session.
///
/// Expires as a whole once `max_inactive` has passed since the last access;
/// individual attributes may carry a shorter TTL of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: String,
    created: Instant,
    last_accessed: Instant,
    max_inactive: Duration,
    attributes: HashMap<String, Attribute>,
}

impl Session {
    /// New session with a random v4 UUID as its id.
    pub fn new(max_inactive: Duration) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), max_inactive)
    }

    pub fn with_id(id: impl Into<String>, max_inactive: Duration) -> Self {
        let now = Instant::now();
        Self {
            id: id.into(),
            created: now,
            last_accessed: now,
            max_inactive,
            attributes: HashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created(&self) -> Instant {
        self.created
    }

    pub fn last_accessed(&self) -> Instant {
        self.last_accessed
    }

    pub fn max_inactive(&self) -> Duration {
        self.max_inactive
    }

    pub fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_accessed) >= self.max_inactive
    }

    /// Live attribute value. Expired attributes read as absent even before a sweep removes them.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .filter(|a| !a.is_expired(Instant::now()))
            .map(|a| a.value.as_str())
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(
            key.into(),
            Attribute {
                value: value.into(),
                expires_at: None,
            },
        );
    }

    pub fn set_attribute_with_ttl(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        ttl: Duration,
    ) {
        self.attributes.insert(
            key.into(),
            Attribute {
                value: value.into(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
    }

    pub fn remove_attribute(&mut self, key: &str) -> Option<String> {
        self.attributes.remove(key).map(|a| a.value)
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Drop expired attributes, returning how many went.
    fn evict_attributes(&mut self, now: Instant) -> usize {
        let before = self.attributes.len();
        self.attributes.retain(|_, a| !a.is_expired(now));
        before - self.attributes.len()
    }
}

/// What one sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub sessions: usize,
    pub attributes: usize,
}

/// Storage backend for sessions.
///
/// Mutations from request handlers happen under the read side of the
/// [`SessionLock`](super::SessionLock); `evict_expired` is only called by the
/// sentinel while it holds the write side.
pub trait SessionStore: Send + Sync + fmt::Debug {
    fn get(&self, id: &str) -> Option<Session>;

    fn put(&self, session: Session);

    fn remove(&self, id: &str) -> Option<Session>;

    /// Every stored session id, for enumeration by the sweep.
    fn ids(&self) -> Vec<String>;

    fn evict_expired(&self, now: Instant) -> SweepReport;

    fn len(&self) -> usize {
        self.ids().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Inactivity timeout given to sessions created through [`MemorySessionStore::create`].
pub const DEFAULT_MAX_INACTIVE: Duration = Duration::from_secs(30 * 60);

/// In-memory store on a sharded concurrent map.
#[derive(Debug, Clone)]
pub struct MemorySessionStore {
    inner: Arc<DashMap<String, Session>>,
    max_inactive: Duration,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::with_max_inactive(DEFAULT_MAX_INACTIVE)
    }

    pub fn with_max_inactive(max_inactive: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            max_inactive,
        }
    }

    /// Start a new session, store it and return a copy.
    pub fn create(&self) -> Session {
        let session = Session::new(self.max_inactive);
        self.put(session.clone());
        session
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, id: &str) -> Option<Session> {
        self.inner.get(id).map(|r| r.value().clone())
    }

    fn put(&self, session: Session) {
        self.inner.insert(session.id.clone(), session);
    }

    fn remove(&self, id: &str) -> Option<Session> {
        self.inner.remove(id).map(|(_, s)| s)
    }

    fn ids(&self) -> Vec<String> {
        self.inner.iter().map(|r| r.key().clone()).collect()
    }

    fn evict_expired(&self, now: Instant) -> SweepReport {
        let mut report = SweepReport::default();
        self.inner.retain(|_, session| {
            if session.is_expired(now) {
                report.sessions += 1;
                return false;
            }
            report.attributes += session.evict_attributes(now);
            true
        });
        report
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn attribute_ttl_hides_then_evicts() {
        let store = MemorySessionStore::new();
        let mut session = Session::with_id("s1", Duration::from_secs(600));
        session.set_attribute("user", "alice");
        session.set_attribute_with_ttl("otp", "123456", Duration::from_secs(30));
        store.put(session);

        tokio::time::advance(Duration::from_secs(31)).await;
        let session = store.get("s1").unwrap();
        assert_eq!(session.attribute("user"), Some("alice"));
        assert_eq!(session.attribute("otp"), None);
        assert_eq!(session.attribute_count(), 2);

        let report = store.evict_expired(Instant::now());
        assert_eq!(report, SweepReport { sessions: 0, attributes: 1 });
        assert_eq!(store.get("s1").unwrap().attribute_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn inactive_sessions_are_evicted() {
        let store = MemorySessionStore::new();
        store.put(Session::with_id("idle", Duration::from_secs(60)));
        let mut active = Session::with_id("active", Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(45)).await;
        active.touch();
        store.put(active);
        tokio::time::advance(Duration::from_secs(30)).await;

        let report = store.evict_expired(Instant::now());
        assert_eq!(report.sessions, 1);
        assert_eq!(store.ids(), vec!["active".to_string()]);
    }

    #[test]
    fn create_stores_with_configured_timeout() {
        let store = MemorySessionStore::with_max_inactive(Duration::from_secs(90));
        let session = store.create();
        assert_eq!(session.max_inactive(), Duration::from_secs(90));
        assert_eq!(store.get(session.id()), Some(session));
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = Session::new(Duration::from_secs(1));
        let b = Session::new(Duration::from_secs(1));
        assert_ne!(a.id(), b.id());
        assert!(Uuid::parse_str(a.id()).is_ok());
    }
}
