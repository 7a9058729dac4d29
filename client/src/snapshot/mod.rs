//! # Snapshot Module — Role & Capability Resolution
//!
//! Once a session is connected, the [`Resolver`] asks the ledger who the
//! caller is: owner or not, member or not, what balance, and who else is in
//! the group. The four reads run concurrently and the result is published
//! as one atomic [`RoleSnapshot`] — observers never see a half-refreshed
//! state, because a half-refreshed state is one the ledger never held.
//!
//! Refreshes are best-effort. A failed read keeps the previous snapshot and
//! logs; a result that comes back for a session that is no longer current
//! is discarded. Writes get loud errors, reads get retried on the next
//! natural trigger — that asymmetry is deliberate.

pub mod resolver;

pub use resolver::{Resolver, RoleSnapshot};
