//! Configuration for the session store.
//!
//! # Example
//!
//! ```rust
//! use airlock::{SessionStore, StoreConfig};
//! use chrono::Duration;
//!
//! // Use the defaults
//! let store = SessionStore::new();
//!
//! // Or customize
//! let store = SessionStore::with_config(StoreConfig {
//!     idle_timeout: Duration::minutes(10),
//!     ..Default::default()
//! });
//! ```

use chrono::Duration;

/// Configuration for a [`SessionStore`](crate::SessionStore).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// How long a session may sit idle before the sweep removes it.
    ///
    /// Default: 30 minutes.
    pub idle_timeout: Duration,

    /// Minimum spacing between two expiry sweeps.
    ///
    /// Lookups trigger the sweep lazily; this guard bounds its cost under
    /// high request rates. Default: 1 second.
    pub sweep_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::seconds(1800),
            sweep_interval: Duration::seconds(1),
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration suitable for development.
    ///
    /// Sessions stay alive through long debugging pauses.
    #[must_use]
    pub fn development() -> Self {
        Self {
            idle_timeout: Duration::hours(4),
            sweep_interval: Duration::seconds(1),
        }
    }

    /// Creates a configuration with stricter security settings.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            idle_timeout: Duration::minutes(10),
            sweep_interval: Duration::seconds(1),
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.idle_timeout <= Duration::zero() {
            return Err("idle_timeout must be positive");
        }
        if self.sweep_interval < Duration::zero() {
            return Err("sweep_interval must not be negative");
        }
        Ok(())
    }
}
