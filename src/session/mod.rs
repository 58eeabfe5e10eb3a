//! Session records and their durable form.

mod auth_config;
mod store;

pub use auth_config::AuthMethods;
pub use store::SessionStore;

use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::crypto::SecretString;

/// How long a session is meant to live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// Survives across requests until idle-expired, and is written to
    /// durable storage.
    Timeout,
    /// Valid for exactly the request that created it. Never persisted; the
    /// caller removes it when the request completes.
    SingleRequest,
}

/// Authorization state refreshed by the external authenticator.
///
/// These fields are not part of the durable subset; they are re-derived on
/// every credential verification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInfo {
    /// Role name used for privilege checks.
    pub role: String,
    /// Role-group memberships.
    pub groups: Vec<String>,
    /// The account must change its password before any other operation is
    /// permitted. A hard security gate, not a convenience flag.
    pub configure_self_only: bool,
}

/// One authenticated principal's session.
///
/// Handles are shared (`Arc<Session>`): a request handler keeps its handle
/// valid for the duration of its processing even if the store removes the
/// record concurrently. Identity fields are immutable; `last_activity` and
/// [`UserInfo`] change only through the [`SessionStore`] update paths.
#[derive(Debug)]
pub struct Session {
    unique_id: String,
    session_token: SecretString,
    csrf_token: SecretString,
    username: String,
    client_id: Option<String>,
    client_ip: String,
    persistence: Persistence,
    cookie_auth: AtomicBool,
    last_activity: Mutex<Instant>,
    user_info: RwLock<UserInfo>,
}

impl Session {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        unique_id: String,
        session_token: String,
        csrf_token: String,
        username: String,
        client_id: Option<String>,
        client_ip: String,
        persistence: Persistence,
        configure_self_only: bool,
    ) -> Self {
        Self {
            unique_id,
            session_token: SecretString::new(session_token),
            csrf_token: SecretString::new(csrf_token),
            username,
            client_id,
            client_ip,
            persistence,
            cookie_auth: AtomicBool::new(false),
            last_activity: Mutex::new(Instant::now()),
            user_info: RwLock::new(UserInfo {
                configure_self_only,
                ..Default::default()
            }),
        }
    }

    /// Short opaque identifier, stable across restarts of the same session.
    /// Used in URLs and lock ownership, never as a credential.
    #[must_use]
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// The bearer credential bound to this session.
    #[must_use]
    pub fn session_token(&self) -> &SecretString {
        &self.session_token
    }

    /// Secondary secret required for cookie-authenticated state-changing
    /// requests.
    #[must_use]
    pub fn csrf_token(&self) -> &SecretString {
        &self.csrf_token
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Opaque client-supplied correlation string, if the client sent one.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// String form of the originating network address.
    #[must_use]
    pub fn client_ip(&self) -> &str {
        &self.client_ip
    }

    #[must_use]
    pub fn persistence(&self) -> Persistence {
        self.persistence
    }

    /// Whether this session was established via the cookie flow. Drives
    /// CSRF enforcement upstream.
    #[must_use]
    pub fn cookie_auth(&self) -> bool {
        self.cookie_auth.load(Ordering::Relaxed)
    }

    /// Marks the session as cookie-established. Called once by the owning
    /// handler right after creation.
    pub fn set_cookie_auth(&self, cookie_auth: bool) {
        self.cookie_auth.store(cookie_auth, Ordering::Relaxed);
    }

    /// Instant of the last authenticated use, on the monotonic clock.
    ///
    /// Wall-clock time is never used for idle accounting: it can jump on
    /// NTP sync or a manual set and would shorten or extend sessions
    /// unpredictably.
    #[must_use]
    pub fn last_activity(&self) -> Instant {
        *self.last_activity.lock()
    }

    pub(crate) fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    #[cfg(test)]
    pub(crate) fn set_last_activity(&self, at: Instant) {
        *self.last_activity.lock() = at;
    }

    /// Snapshot of the current authorization state.
    #[must_use]
    pub fn user_info(&self) -> UserInfo {
        self.user_info.read().clone()
    }

    pub(crate) fn set_user_info(&self, info: UserInfo) {
        *self.user_info.write() = info;
    }

    /// True if the account may only change its own password right now.
    #[must_use]
    pub fn is_configure_self_only(&self) -> bool {
        self.user_info.read().configure_self_only
    }

    /// Rebuilds a session from its persisted key-value form.
    ///
    /// A property of unexpected type is logged and skipped, as is an
    /// unrecognized key; neither is fatal. The record is accepted only if
    /// `unique_id`, `username`, `session_token` and `csrf_token` all came
    /// through non-empty; anything less is discarded, not repaired.
    ///
    /// Restored sessions always start a fresh idle window and are forced to
    /// [`Persistence::Timeout`]: the monotonic clock does not survive the
    /// process, so the previous idle window is meaningless here.
    #[must_use]
    pub fn from_persisted(value: &Value) -> Option<Self> {
        let Some(object) = value.as_object() else {
            log::warn!(
                target: "airlock::session",
                "persisted session is not an object, discarding"
            );
            return None;
        };

        let mut unique_id = String::new();
        let mut session_token = String::new();
        let mut csrf_token = String::new();
        let mut username = String::new();
        let mut client_id = None;
        let mut client_ip = String::new();

        for (key, value) in object {
            let Some(text) = value.as_str() else {
                log::warn!(
                    target: "airlock::session",
                    "persisted session property {key} is not a string, skipping"
                );
                continue;
            };
            match key.as_str() {
                "unique_id" => unique_id = text.to_owned(),
                "session_token" => session_token = text.to_owned(),
                "csrf_token" => csrf_token = text.to_owned(),
                "username" => username = text.to_owned(),
                "client_id" => client_id = Some(text.to_owned()),
                "client_ip" => client_ip = text.to_owned(),
                _ => {
                    log::warn!(
                        target: "airlock::session",
                        "unexpected property {key} in persisted session, ignoring"
                    );
                }
            }
        }

        // These four fields have been in every revision of the durable
        // format; a record without them cannot be trusted.
        if unique_id.is_empty()
            || username.is_empty()
            || session_token.is_empty()
            || csrf_token.is_empty()
        {
            log::debug!(
                target: "airlock::session",
                "persisted session missing required security information, refusing to restore"
            );
            return None;
        }

        Some(Self::new(
            unique_id,
            session_token,
            csrf_token,
            username,
            client_id,
            client_ip,
            Persistence::Timeout,
            false,
        ))
    }

    /// The durable form of this record: a flat string-valued object.
    #[must_use]
    pub fn to_persisted(&self) -> Value {
        let mut doc = serde_json::json!({
            "unique_id": self.unique_id,
            "session_token": &self.session_token,
            "csrf_token": &self.csrf_token,
            "username": self.username,
            "client_ip": self.client_ip,
        });
        if let Some(client_id) = &self.client_id {
            doc["client_id"] = Value::String(client_id.clone());
        }
        doc
    }
}

/// Renders a client address for storage and display. IPv4-mapped IPv6
/// addresses come out in dotted-quad form so the same client always renders
/// the same way regardless of listener family.
pub(crate) fn format_client_ip(addr: IpAddr) -> String {
    match addr {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map_or_else(|| v6.to_string(), |v4| v4.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::time::Duration;

    use super::*;

    fn persisted_alice() -> Value {
        serde_json::json!({
            "unique_id": "fNX9kGJK2a",
            "session_token": "vtcBkKKrpPyxBBCGxPzq",
            "csrf_token": "Xyn0PqEbWhbQxQnBs1Fn",
            "username": "alice",
            "client_ip": "192.0.2.7",
        })
    }

    #[test]
    fn test_from_persisted_accepts_complete_record() {
        let session = Session::from_persisted(&persisted_alice()).unwrap();
        assert_eq!(session.username(), "alice");
        assert_eq!(session.unique_id(), "fNX9kGJK2a");
        assert_eq!(session.client_ip(), "192.0.2.7");
        assert_eq!(session.client_id(), None);
        // Restored sessions never carry SingleRequest through a restart.
        assert_eq!(session.persistence(), Persistence::Timeout);
    }

    #[test]
    fn test_from_persisted_rejects_missing_mandatory_field() {
        for field in ["unique_id", "session_token", "csrf_token", "username"] {
            let mut doc = persisted_alice();
            doc.as_object_mut().unwrap().remove(field);
            assert!(
                Session::from_persisted(&doc).is_none(),
                "record without {field} must be rejected"
            );
        }
    }

    #[test]
    fn test_from_persisted_rejects_empty_mandatory_field() {
        let mut doc = persisted_alice();
        doc["csrf_token"] = Value::String(String::new());
        assert!(Session::from_persisted(&doc).is_none());
    }

    #[test]
    fn test_from_persisted_ignores_unknown_key() {
        let mut doc = persisted_alice();
        doc["favorite_color"] = Value::String("teal".to_owned());
        let session = Session::from_persisted(&doc).unwrap();
        assert_eq!(session.username(), "alice");
    }

    #[test]
    fn test_from_persisted_skips_wrong_typed_field() {
        // client_ip of the wrong type is skipped; the record still has the
        // four mandatory fields and is accepted.
        let mut doc = persisted_alice();
        doc["client_ip"] = Value::Number(42.into());
        let session = Session::from_persisted(&doc).unwrap();
        assert_eq!(session.client_ip(), "");
    }

    #[test]
    fn test_from_persisted_rejects_non_object() {
        assert!(Session::from_persisted(&Value::String("nope".to_owned())).is_none());
        assert!(Session::from_persisted(&Value::Null).is_none());
    }

    #[test]
    fn test_from_persisted_resets_idle_window() {
        let session = Session::from_persisted(&persisted_alice()).unwrap();
        assert!(session.last_activity().elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_to_persisted_round_trip() {
        let mut doc = persisted_alice();
        doc["client_id"] = Value::String("console-17".to_owned());
        let session = Session::from_persisted(&doc).unwrap();
        assert_eq!(session.to_persisted(), doc);
    }

    #[test]
    fn test_to_persisted_omits_absent_client_id() {
        let session = Session::from_persisted(&persisted_alice()).unwrap();
        assert!(session.to_persisted().get("client_id").is_none());
    }

    #[test]
    fn test_cookie_auth_flag() {
        let session = Session::from_persisted(&persisted_alice()).unwrap();
        assert!(!session.cookie_auth());
        session.set_cookie_auth(true);
        assert!(session.cookie_auth());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let session = Session::from_persisted(&persisted_alice()).unwrap();
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("vtcBkKKrpPyxBBCGxPzq"));
        assert!(!rendered.contains("Xyn0PqEbWhbQxQnBs1Fn"));
        assert!(rendered.contains("alice"));
    }

    #[test]
    fn test_format_client_ip() {
        assert_eq!(
            format_client_ip(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7))),
            "192.0.2.7"
        );
        assert_eq!(
            format_client_ip(IpAddr::V6("::ffff:192.0.2.7".parse::<Ipv6Addr>().unwrap())),
            "192.0.2.7"
        );
        assert_eq!(
            format_client_ip(IpAddr::V6("2001:db8::1".parse::<Ipv6Addr>().unwrap())),
            "2001:db8::1"
        );
    }
}
