//! Field-diff reconciliation between the internal and external databases.
//!
//! # Responsibility
//! - Compute partial patches between two versions of a record.
//! - Decide which side wins when both versions differ.
//! - Summarize a synchronisation run.
//!
//! # Invariants
//! - Remote data wins unless the logged-in owner edited the record locally
//!   after the last synchronisation and online writes were requested.

use crate::model::concert::Concert;
use crate::model::festival::Festival;
use crate::model::{ExternalId, FestivalId};

pub mod diff;

pub use diff::{concert_patch, festival_patch};

/// Direction in which a differing record is propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    /// Local changes overwrite the remote record.
    Push,
    /// Remote data overwrites the local record.
    Pull,
}

/// Records that track local modification against their last synchronisation.
pub trait SyncStamped {
    fn has_unsynchronised_changes(&self) -> bool;
}

impl SyncStamped for Festival {
    fn has_unsynchronised_changes(&self) -> bool {
        Festival::has_unsynchronised_changes(self)
    }
}

impl SyncStamped for Concert {
    fn has_unsynchronised_changes(&self) -> bool {
        Concert::has_unsynchronised_changes(self)
    }
}

/// Whether the session may push changes of a record owned by `owner`.
pub fn can_push(owner: &str, username: Option<&str>, write_to_online: bool) -> bool {
    write_to_online && username.is_some_and(|user| user == owner)
}

/// Picks the winning side for a record that differs between both stores.
pub fn decide_direction(
    owner: &str,
    username: Option<&str>,
    write_to_online: bool,
    local: &impl SyncStamped,
) -> SyncDirection {
    if can_push(owner, username, write_to_online) && local.has_unsynchronised_changes() {
        SyncDirection::Push
    } else {
        SyncDirection::Pull
    }
}

/// Per-entity counters of one synchronisation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCounts {
    pub pulled: u32,
    pub pushed: u32,
    pub created_locally: u32,
    pub created_remotely: u32,
    pub unchanged: u32,
    pub skipped: u32,
}

/// Why a local-only festival was left out of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    OnlineWritesDisabled,
    NotLoggedIn,
    NotOwner,
    /// The service accepted the festival but its external id could not be found.
    UnresolvedExternalId,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnlineWritesDisabled => "online_writes_disabled",
            Self::NotLoggedIn => "not_logged_in",
            Self::NotOwner => "not_owner",
            Self::UnresolvedExternalId => "unresolved_external_id",
        }
    }

    /// Reason a push is not allowed, or `None` when it is.
    pub fn for_push(owner: &str, username: Option<&str>, write_to_online: bool) -> Option<Self> {
        match username {
            _ if !write_to_online => Some(Self::OnlineWritesDisabled),
            None => Some(Self::NotLoggedIn),
            Some(user) if user != owner => Some(Self::NotOwner),
            Some(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFestival {
    pub festival_id: FestivalId,
    /// Set when the festival was published but no longer exists remotely.
    pub external_id: Option<ExternalId>,
    pub reason: SkipReason,
}

/// Summary of one `synchronise` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub festivals: SyncCounts,
    pub concerts: SyncCounts,
    pub skipped: Vec<SkippedFestival>,
}
