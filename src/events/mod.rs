//! Event system for session lifecycle notifications.
//!
//! Events are fired from the session store's mutating operations. If no
//! listeners are registered, they are silently ignored. Listeners run
//! synchronously on the thread performing the store operation, after the
//! store's lock has been released, so they may call back into the store.
//! Keep them fast.
//!
//! The embedding process must subscribe for one event in particular:
//! [`SessionEvent::TransportReloadRequested`] fires exactly when the
//! mutual-TLS acceptance flag toggles, and the listening sockets have to be
//! recreated in response.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use airlock::register_event_listeners;
//! use airlock::events::listeners::LoggingListener;
//!
//! fn main() {
//!     // register listeners at startup
//!     register_event_listeners(|registry| {
//!         registry.listen(LoggingListener::new());
//!     });
//!
//!     // session events will now be logged
//! }
//! ```
//!
//! # Custom Listeners
//!
//! Implement the [`Listener`] trait to create custom event handlers:
//!
//! ```rust,ignore
//! use airlock::events::{Listener, SessionEvent};
//!
//! struct TransportReloader;
//!
//! impl Listener for TransportReloader {
//!     fn handle(&self, event: &SessionEvent) {
//!         if let SessionEvent::TransportReloadRequested { .. } = event {
//!             // nudge the accept loop to rebuild its sockets
//!         }
//!     }
//! }
//! ```

mod event;
mod listener;
mod registry;

pub mod listeners;

pub use event::SessionEvent;
pub use listener::Listener;
pub use registry::{dispatch, register_event_listeners};
