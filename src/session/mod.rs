//! # Session Module
//!
//! Server-held claim data addressed by an opaque id, independent of bearer
//! tokens.
//!
//! ## Overview
//!
//! [`SessionStore`] is a concurrent map from a random 32-character id to a
//! [`SessionRecord`]. Request threads create, read, replace and delete records
//! while one background sweeper evicts records older than the TTL.
//!
//! - Reads never check age; a record stays visible until a sweep removes it.
//! - [`SessionStore::update`] replaces the claims wholesale and restarts the
//!   TTL countdown.
//! - Lookups of unknown ids return `None`, never an error.
//!
//! ## Process-Wide Store
//!
//! [`init_session`] creates the process store and starts its sweeper exactly
//! once. The free functions [`session_token`], [`session_get_val`],
//! [`session_update_val`] and [`session_del_key`] operate on it.
//!
//! ```rust,no_run
//! use hiweb::session;
//! use serde_json::json;
//!
//! session::init_session(3600);
//! let sid = session::session_token(json!({"user": 7}).as_object().cloned().unwrap_or_default())
//!     .expect("store initialised");
//! assert!(session::session_get_val(&sid).is_some());
//! ```
//!
//! ## Deterministic Time
//!
//! The store reads time through a [`Clock`]. Tests use [`ManualClock`] and
//! [`SweeperHandle::sweep_now`] to run exactly one sweep at a chosen instant.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::error::SessionError;
use crate::security::token::Claims;

mod sweeper;

pub use sweeper::SweeperHandle;

/// Default wake interval of the sweeper.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// Source of "now" for record timestamps and sweeps.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: SystemTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(SystemTime::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One stored session.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub created_at: SystemTime,
    pub claims: Claims,
}

/// Concurrent TTL-expiring session map.
pub struct SessionStore {
    records: DashMap<String, SessionRecord>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: DashMap::new(),
            ttl,
            clock,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store `claims` under a fresh random id and return the id.
    pub fn create(&self, claims: Claims) -> String {
        let sid = new_session_id();
        self.records.insert(
            sid.clone(),
            SessionRecord {
                created_at: self.clock.now(),
                claims,
            },
        );
        debug!(sid = %sid, "session created");
        sid
    }

    #[must_use]
    pub fn get(&self, sid: &str) -> Option<Claims> {
        self.records.get(sid).map(|r| r.claims.clone())
    }

    #[must_use]
    pub fn record(&self, sid: &str) -> Option<SessionRecord> {
        self.records.get(sid).map(|r| r.value().clone())
    }

    /// Replace the claims under `sid` and restart its TTL.
    ///
    /// An unknown id is stored as a new record.
    pub fn update(&self, sid: &str, claims: Claims) -> Result<(), SessionError> {
        if sid.trim().is_empty() {
            return Err(SessionError::BlankId);
        }
        self.records.insert(
            sid.to_string(),
            SessionRecord {
                created_at: self.clock.now(),
                claims,
            },
        );
        Ok(())
    }

    /// Remove `sid`. Removing an unknown id is a no-op.
    pub fn delete(&self, sid: &str) {
        self.records.remove(sid);
    }

    /// Evict every record whose age exceeds the TTL. Returns how many went.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let before = self.records.len();
        self.records.retain(|_, record| {
            // A record stamped in the future is not expired.
            match now.duration_since(record.created_at) {
                Ok(age) => age <= ttl,
                Err(_) => true,
            }
        });
        let evicted = before.saturating_sub(self.records.len());
        debug!(evicted, remaining = self.records.len(), "session sweep");
        evicted
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Random 32-character lowercase hex id.
#[must_use]
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

struct GlobalSessions {
    store: Arc<SessionStore>,
    _sweeper: SweeperHandle,
}

static GLOBAL: OnceCell<GlobalSessions> = OnceCell::new();

/// Create the process-wide store with a TTL in seconds and start its sweeper.
///
/// Only the first call has an effect; later calls return the existing store.
pub fn init_session(ttl_secs: u64) -> Arc<SessionStore> {
    init_session_with(Duration::from_secs(ttl_secs), DEFAULT_SWEEP_INTERVAL)
}

/// [`init_session`] with an explicit sweeper interval.
pub fn init_session_with(ttl: Duration, sweep_interval: Duration) -> Arc<SessionStore> {
    let global = GLOBAL.get_or_init(|| {
        let store = Arc::new(SessionStore::new(ttl));
        let sweeper = SweeperHandle::spawn(Arc::clone(&store), sweep_interval);
        info!(
            ttl_secs = ttl.as_secs(),
            sweep_interval_secs = sweep_interval.as_secs(),
            "session store initialised"
        );
        GlobalSessions {
            store,
            _sweeper: sweeper,
        }
    });
    Arc::clone(&global.store)
}

/// The process-wide store, if [`init_session`] has run.
#[must_use]
pub fn global() -> Option<Arc<SessionStore>> {
    GLOBAL.get().map(|g| Arc::clone(&g.store))
}

fn global_store() -> Result<&'static SessionStore, SessionError> {
    GLOBAL
        .get()
        .map(|g| g.store.as_ref())
        .ok_or(SessionError::NotInitialized)
}

/// Mint a session for `claims` in the process-wide store.
pub fn session_token(claims: Claims) -> Result<String, SessionError> {
    Ok(global_store()?.create(claims))
}

/// Look up a session in the process-wide store.
#[must_use]
pub fn session_get_val(sid: &str) -> Option<Claims> {
    global_store().ok().and_then(|s| s.get(sid))
}

/// Replace a session's claims in the process-wide store.
pub fn session_update_val(sid: &str, claims: Claims) -> Result<(), SessionError> {
    global_store()?.update(sid, claims)
}

/// Delete a session from the process-wide store.
pub fn session_del_key(sid: &str) {
    if let Ok(store) = global_store() {
        store.delete(sid);
    }
}
