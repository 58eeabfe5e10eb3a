//! Accepted authentication mechanisms.

use serde_json::Value;

/// Process-wide toggles for which authentication mechanisms the service
/// accepts. Owned by the [`SessionStore`](super::SessionStore); mutate it
/// through [`SessionStore::update_auth_methods`](super::SessionStore::update_auth_methods)
/// so the durable state and the transport-reload signal stay correct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthMethods {
    /// HTTP basic credentials.
    pub basic: bool,
    /// Bearer session token.
    pub session_token: bool,
    /// Custom header token.
    pub xtoken: bool,
    /// Session cookie.
    pub cookie: bool,
    /// Mutual TLS client certificates. Toggling this requires the listening
    /// sockets to be recreated.
    pub tls: bool,
}

impl Default for AuthMethods {
    fn default() -> Self {
        Self {
            basic: true,
            session_token: true,
            xtoken: true,
            cookie: true,
            tls: true,
        }
    }
}

impl AuthMethods {
    /// Applies the persisted form on top of the current values.
    ///
    /// Non-boolean values and unknown keys are skipped; a partially valid
    /// document updates only the flags it carries correctly.
    pub fn apply_persisted(&mut self, value: &Value) {
        let Some(object) = value.as_object() else {
            log::warn!(
                target: "airlock::session",
                "persisted auth config is not an object, keeping current values"
            );
            return;
        };
        for (key, value) in object {
            let Some(flag) = value.as_bool() else {
                continue;
            };
            match key.as_str() {
                "BasicAuth" => self.basic = flag,
                "SessionToken" => self.session_token = flag,
                "XToken" => self.xtoken = flag,
                "Cookie" => self.cookie = flag,
                "TLS" => self.tls = flag,
                _ => {}
            }
        }
    }

    /// The durable form of the configuration.
    #[must_use]
    pub fn to_persisted(&self) -> Value {
        serde_json::json!({
            "BasicAuth": self.basic,
            "SessionToken": self.session_token,
            "XToken": self.xtoken,
            "Cookie": self.cookie,
            "TLS": self.tls,
        })
    }
}
