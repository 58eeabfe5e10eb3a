//! The session store: owner of every live session.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;

use super::auth_config::AuthMethods;
use super::{format_client_ip, Persistence, Session, UserInfo};
use crate::config::StoreConfig;
use crate::crypto::{constant_time_eq, generate_token, SESSION_TOKEN_LENGTH, UNIQUE_ID_LENGTH};
use crate::events::{dispatch, SessionEvent};
use crate::persist::{StoreDocument, CURRENT_REVISION};
use crate::SessionError;

const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(1800);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// The central session authority.
///
/// Construct one per process and share it (`Arc<SessionStore>`) with every
/// consumer; it is the single owner of the session collection. All state
/// lives behind one mutex, so a sweep and the lookup that triggered it are
/// observed as a single atomic step by each caller, and no operation here
/// ever blocks on I/O; persistence is decoupled through
/// [`needs_persist`](Self::needs_persist).
pub struct SessionStore {
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    /// Primary index, keyed by session token.
    sessions: HashMap<String, Arc<Session>>,
    idle_timeout: Duration,
    sweep_interval: Duration,
    last_sweep: Option<Instant>,
    needs_persist: bool,
    auth_methods: AuthMethods,
    #[cfg(feature = "resource-locks")]
    locks: Option<Arc<dyn crate::locks::LockRegistry>>,
}

impl StoreInner {
    /// Removes every session idle past the timeout.
    ///
    /// Coalesced: runs at most once per `sweep_interval` so a burst of
    /// lookups pays for one sweep, not one per request. Invoked from every
    /// lookup path, which keeps all collection mutation inside the store's
    /// lock without a background timer.
    fn sweep_expired(&mut self, events: &mut Vec<SessionEvent>) {
        let now = Instant::now();
        if let Some(last) = self.last_sweep {
            if now.duration_since(last) < self.sweep_interval {
                return;
            }
        }
        self.last_sweep = Some(now);

        let idle_timeout = self.idle_timeout;
        let mut expired = Vec::new();
        self.sessions.retain(|_, session| {
            if now.duration_since(session.last_activity()) >= idle_timeout {
                expired.push(Arc::clone(session));
                false
            } else {
                true
            }
        });

        for session in expired {
            self.release_locks(session.unique_id());
            self.needs_persist = true;
            events.push(SessionEvent::Expired {
                unique_id: session.unique_id().to_owned(),
                username: session.username().to_owned(),
                at: Utc::now(),
            });
        }
    }

    #[cfg(feature = "resource-locks")]
    fn release_locks(&self, unique_id: &str) {
        if let Some(registry) = &self.locks {
            registry.release_all(unique_id);
        }
    }

    #[cfg(not(feature = "resource-locks"))]
    fn release_locks(&self, _unique_id: &str) {}
}

impl SessionStore {
    /// Creates a store with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Creates a store with a custom configuration.
    ///
    /// Out-of-range durations (see [`StoreConfig::validate`]) fall back to
    /// the defaults.
    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                sessions: HashMap::new(),
                idle_timeout: config.idle_timeout.to_std().unwrap_or(DEFAULT_IDLE_TIMEOUT),
                sweep_interval: config
                    .sweep_interval
                    .to_std()
                    .unwrap_or(DEFAULT_SWEEP_INTERVAL),
                last_sweep: None,
                needs_persist: false,
                auth_methods: AuthMethods::default(),
                #[cfg(feature = "resource-locks")]
                locks: None,
            }),
        }
    }

    /// Registers the cooperative lock registry released on session removal.
    #[cfg(feature = "resource-locks")]
    pub fn set_lock_registry(&self, registry: Arc<dyn crate::locks::LockRegistry>) {
        self.inner.lock().locks = Some(registry);
    }

    /// Creates a session for a principal that already passed primary
    /// authentication.
    ///
    /// The session token, CSRF token and unique id are all freshly generated;
    /// the dirty flag is raised only for [`Persistence::Timeout`] sessions,
    /// since single-request sessions never reach durable storage.
    ///
    /// # Errors
    ///
    /// [`SessionError::EntropyExhausted`] if the random source fails (the
    /// creation is abandoned, never retried with weaker material) and
    /// [`SessionError::DuplicateToken`] if a generated value collides with a
    /// live session, which is an invariant violation rather than an occasion
    /// to overwrite.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "create_session", skip_all, err)
    )]
    pub fn create_session(
        &self,
        username: &str,
        client_addr: IpAddr,
        client_id: Option<String>,
        persistence: Persistence,
        configure_self_only: bool,
    ) -> Result<Arc<Session>, SessionError> {
        let session_token = generate_token(SESSION_TOKEN_LENGTH)?;
        // Only the cookie flow checks CSRF tokens, but every session gets
        // one so the flow can be upgraded without re-issuing credentials.
        let csrf_token = generate_token(SESSION_TOKEN_LENGTH)?;
        let unique_id = generate_token(UNIQUE_ID_LENGTH)?;

        let mut events = Vec::new();
        let session = {
            let mut inner = self.inner.lock();
            if inner.sessions.contains_key(&session_token)
                || inner
                    .sessions
                    .values()
                    .any(|existing| existing.unique_id() == unique_id)
            {
                return Err(SessionError::DuplicateToken);
            }

            let session = Arc::new(Session::new(
                unique_id,
                session_token.clone(),
                csrf_token,
                username.to_owned(),
                client_id,
                format_client_ip(client_addr),
                persistence,
                configure_self_only,
            ));
            inner.sessions.insert(session_token, Arc::clone(&session));
            if persistence == Persistence::Timeout {
                inner.needs_persist = true;
            }
            events.push(SessionEvent::Created {
                unique_id: session.unique_id().to_owned(),
                username: session.username().to_owned(),
                at: Utc::now(),
            });
            session
        };

        dispatch_all(events);
        Ok(session)
    }

    /// Authenticates a presented bearer token.
    ///
    /// Sweeps first, then looks up the token. The final accept decision uses
    /// a fixed-time comparison so its runtime is independent of where a
    /// mismatch falls; only the token length short-circuits. A hit refreshes
    /// the session's idle window. A miss is a normal negative result; the
    /// caller cannot tell "wrong token" from "no such token".
    pub fn authenticate_by_token(&self, token: &str) -> Option<Arc<Session>> {
        let mut events = Vec::new();
        let found = {
            let mut inner = self.inner.lock();
            inner.sweep_expired(&mut events);

            let found = if token.len() == SESSION_TOKEN_LENGTH {
                match inner.sessions.get_key_value(token) {
                    Some((stored, session)) if constant_time_eq(stored, token) => {
                        Some(Arc::clone(session))
                    }
                    _ => None,
                }
            } else {
                None
            };

            if let Some(session) = &found {
                session.touch();
            }
            found
        };

        dispatch_all(events);
        found
    }

    /// Finds a session by its unique id.
    ///
    /// Slow path: a linear scan, for administrative and lock-release flows.
    /// Per-request authentication goes through
    /// [`authenticate_by_token`](Self::authenticate_by_token).
    pub fn find_by_unique_id(&self, unique_id: &str) -> Option<Arc<Session>> {
        let mut events = Vec::new();
        let found = {
            let mut inner = self.inner.lock();
            inner.sweep_expired(&mut events);
            inner
                .sessions
                .values()
                .find(|session| session.unique_id() == unique_id)
                .map(Arc::clone)
        };
        dispatch_all(events);
        found
    }

    /// Removes a session. Idempotent: removing an already-removed session is
    /// a no-op.
    ///
    /// Any cooperative lock bound to the session's unique id is released in
    /// the same critical section as the removal; a crash cannot separate the
    /// two and leak the lock.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "destroy_session", skip_all)
    )]
    pub fn destroy_session(&self, session: &Arc<Session>) {
        let mut events = Vec::new();
        {
            let mut inner = self.inner.lock();
            if inner
                .sessions
                .remove(session.session_token().expose_secret())
                .is_some()
            {
                inner.release_locks(session.unique_id());
                inner.needs_persist = true;
                events.push(SessionEvent::Removed {
                    unique_id: session.unique_id().to_owned(),
                    username: session.username().to_owned(),
                    at: Utc::now(),
                });
            }
        }
        dispatch_all(events);
    }

    /// Returns a snapshot of the unique ids of live sessions, optionally
    /// restricted to one persistence class.
    ///
    /// The snapshot is owned and stays valid however the store mutates
    /// afterwards.
    #[must_use]
    pub fn unique_ids(&self, filter: Option<Persistence>) -> Vec<String> {
        let mut events = Vec::new();
        let ids = {
            let mut inner = self.inner.lock();
            inner.sweep_expired(&mut events);
            inner
                .sessions
                .values()
                .filter(|session| filter.map_or(true, |wanted| session.persistence() == wanted))
                .map(|session| session.unique_id().to_owned())
                .collect()
        };
        dispatch_all(events);
        ids
    }

    /// Removes every session belonging to a user. Used on password change
    /// and account deletion. Returns the number of sessions removed.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "destroy_user_sessions", skip_all)
    )]
    pub fn destroy_user_sessions(&self, username: &str) -> usize {
        self.destroy_user_sessions_where(username, None)
    }

    /// Like [`destroy_user_sessions`](Self::destroy_user_sessions) but keeps
    /// one session alive, typically the one that performed the password
    /// change. The kept session is matched by unique id, not by handle
    /// identity, so any handle to the same logical session works.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "destroy_user_sessions_except", skip_all)
    )]
    pub fn destroy_user_sessions_except(&self, username: &str, keep: &Arc<Session>) -> usize {
        self.destroy_user_sessions_where(username, Some(keep.unique_id()))
    }

    fn destroy_user_sessions_where(&self, username: &str, keep_unique_id: Option<&str>) -> usize {
        let mut events = Vec::new();
        let removed = {
            let mut inner = self.inner.lock();
            let mut revoked = Vec::new();
            inner.sessions.retain(|_, session| {
                let matches = session.username() == username
                    && keep_unique_id.map_or(true, |keep| session.unique_id() != keep);
                if matches {
                    revoked.push(Arc::clone(session));
                }
                !matches
            });

            for session in &revoked {
                inner.release_locks(session.unique_id());
                inner.needs_persist = true;
            }
            if !revoked.is_empty() {
                events.push(SessionEvent::BulkRevoked {
                    username: username.to_owned(),
                    count: revoked.len(),
                    at: Utc::now(),
                });
            }
            revoked.len()
        };
        dispatch_all(events);
        removed
    }

    /// Replaces the accepted authentication mechanisms.
    ///
    /// When the mutual-TLS flag toggles, a
    /// [`SessionEvent::TransportReloadRequested`] fires: the listening
    /// sockets must be recreated with the new acceptance policy, and the
    /// embedding process owns that work.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "update_auth_methods", skip_all)
    )]
    pub fn update_auth_methods(&self, methods: AuthMethods) {
        let mut events = Vec::new();
        {
            let mut inner = self.inner.lock();
            let tls_toggled = inner.auth_methods.tls != methods.tls;
            inner.auth_methods = methods;
            inner.needs_persist = true;
            if tls_toggled {
                events.push(SessionEvent::TransportReloadRequested { at: Utc::now() });
            }
        }
        dispatch_all(events);
    }

    /// Current accepted authentication mechanisms.
    #[must_use]
    pub fn auth_methods(&self) -> AuthMethods {
        self.inner.lock().auth_methods.clone()
    }

    /// Sets the idle timeout applied by future sweeps. Existing sessions are
    /// re-evaluated on the next sweep, not at call time.
    pub fn set_idle_timeout(&self, timeout: Duration) {
        let mut inner = self.inner.lock();
        inner.idle_timeout = timeout;
        inner.needs_persist = true;
    }

    /// Current idle timeout.
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        self.inner.lock().idle_timeout
    }

    /// Replaces a session's authorization state with freshly verified data.
    ///
    /// The external authenticator goes through here rather than mutating the
    /// record directly; none of these fields belong to the durable subset,
    /// so the dirty flag stays untouched.
    pub fn refresh_user_info(&self, session: &Arc<Session>, info: UserInfo) {
        session.set_user_info(info);
    }

    /// True when durable state has changed since the last
    /// [`mark_persisted`](Self::mark_persisted). The external persistence
    /// writer polls this; the store itself never touches storage.
    #[must_use]
    pub fn needs_persist(&self) -> bool {
        self.inner.lock().needs_persist
    }

    /// Clears the dirty flag after the durable state has been written out.
    pub fn mark_persisted(&self) {
        self.inner.lock().needs_persist = false;
    }

    /// Produces the durable form of the store: configuration plus every
    /// [`Persistence::Timeout`] session. Single-request sessions never
    /// appear here.
    #[must_use]
    pub fn export(&self) -> StoreDocument {
        let inner = self.inner.lock();
        StoreDocument {
            revision: CURRENT_REVISION,
            timeout: Some(inner.idle_timeout.as_secs()),
            auth_methods: Some(inner.auth_methods.to_persisted()),
            sessions: inner
                .sessions
                .values()
                .filter(|session| session.persistence() == Persistence::Timeout)
                .map(|session| session.to_persisted())
                .collect(),
        }
    }

    /// Rebuilds store state from a durable document. Returns the number of
    /// sessions restored.
    ///
    /// Tolerant by design: invalid records are discarded individually (see
    /// [`Session::from_persisted`]), a duplicate token keeps the first
    /// occurrence, and missing configuration sections leave the current
    /// values in place. Loading does not raise the dirty flag.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "import", skip_all))]
    pub fn import(&self, document: &StoreDocument) -> usize {
        if document.revision != CURRENT_REVISION {
            log::warn!(
                target: "airlock::store",
                "persisted store has revision {}, expected {}; reading anyway",
                document.revision,
                CURRENT_REVISION
            );
        }

        let mut inner = self.inner.lock();
        if let Some(secs) = document.timeout {
            inner.idle_timeout = Duration::from_secs(secs);
        }
        if let Some(auth) = &document.auth_methods {
            inner.auth_methods.apply_persisted(auth);
        }

        let mut restored = 0;
        for value in &document.sessions {
            let Some(session) = Session::from_persisted(value) else {
                continue;
            };
            let token = session.session_token().expose_secret().to_owned();
            if inner.sessions.contains_key(&token) {
                log::warn!(
                    target: "airlock::store",
                    "duplicate session token in persisted store, keeping the first"
                );
                continue;
            }
            inner.sessions.insert(token, Arc::new(session));
            restored += 1;
        }
        restored
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

// Listeners run outside the store lock so they may call back in.
fn dispatch_all(events: Vec<SessionEvent>) {
    for event in events {
        dispatch(event);
    }
}
