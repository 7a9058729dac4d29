//! # Access Gate
//!
//! A pure derivation from `(Session, RoleSnapshot)` to the view that should
//! be presented. This is presentation gating only — the ledger enforces the
//! real capability checks and will revert a privileged write from the wrong
//! caller no matter what this function said.
//!
//! The gate is default-deny: anything short of a Connected session with a
//! published snapshot that says "member" renders as something less than
//! [`View::Authorized`].

use serde::{Deserialize, Serialize};

use crate::session::manager::Session;
use crate::snapshot::resolver::RoleSnapshot;

/// The capability view derived from connection and role state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum View {
    /// No session. Offer to connect.
    Unauthenticated,
    /// Connected, but the role snapshot has not been published yet.
    /// Never rendered as authorized — absence of data denies.
    Resolving,
    /// Connected and resolved, but the identity is not a registered
    /// member. Nothing to offer except disconnecting.
    Unauthorized,
    /// A registered member with the full transaction surface.
    Authorized {
        /// Whether the membership-management operations (add, flag) should
        /// be presented. Mirrors ledger ownership; the ledger still has the
        /// final say.
        can_manage_members: bool,
    },
}

/// Derives the view for the given session and snapshot state.
pub fn derive_view(session: &Session, snapshot: Option<&RoleSnapshot>) -> View {
    match session {
        // Nothing granted before the provider answers.
        Session::Disconnected | Session::Connecting => View::Unauthenticated,
        Session::Connected(_) => match snapshot {
            None => View::Resolving,
            Some(snapshot) if !snapshot.is_member => View::Unauthorized,
            Some(snapshot) => View::Authorized {
                can_manage_members: snapshot.is_owner,
            },
        },
    }
}
