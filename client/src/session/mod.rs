//! # Session Module — Connection Lifecycle
//!
//! Binding to a signing identity and tearing it down again. The
//! [`ConnectionManager`] runs the Disconnected / Connecting / Connected
//! state machine; [`IdentityProvider`] abstracts wherever identities come
//! from. Nothing downstream ever mutates the session — it is observed
//! through a watch channel with the manager as the only writer.

pub mod manager;
pub mod provider;

pub use manager::{ConnectionManager, Epoch, Session, SessionHandle};
pub use provider::{Binding, IdentityProvider, ProviderError, StaticProvider};
