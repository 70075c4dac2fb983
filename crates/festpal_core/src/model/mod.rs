//! Festival/concert domain model.
//!
//! # Responsibility
//! - Define the records shared by the local store, the remote mirror and sync.
//! - Define partial-update patches used by both stores.
//!
//! # Invariants
//! - A record without a local id has never been written to the local store.
//! - A record without an external id has never been published remotely.
//! - Sync equality ignores identifiers and timestamps.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod concert;
pub mod festival;

/// Local (internal database) festival identifier.
pub type FestivalId = i64;
/// Local (internal database) concert identifier.
pub type ConcertId = i64;
/// Identifier assigned by the external festival service.
pub type ExternalId = i64;

/// Validation failure for festival/concert records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    /// A required text field is blank.
    EmptyField(&'static str),
    /// Stage/day numbering starts at 1.
    NonPositive { field: &'static str, value: i64 },
    /// Concert ends before it starts.
    EndBeforeStart { start_ms: i64, end_ms: i64 },
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "`{field}` must not be empty"),
            Self::NonPositive { field, value } => {
                write!(f, "`{field}` must be >= 1, got {value}")
            }
            Self::EndBeforeStart { start_ms, end_ms } => write!(
                f,
                "`end_ms` ({end_ms}) must be greater than or equal to `start_ms` ({start_ms})"
            ),
        }
    }
}

impl Error for ModelValidationError {}

/// Current wall-clock time in unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ModelValidationError> {
    if value.trim().is_empty() {
        return Err(ModelValidationError::EmptyField(field));
    }
    Ok(())
}

/// Returns `Some(to)` when `to` differs from `from`.
pub(crate) fn changed<T: PartialEq + Clone>(from: &T, to: &T) -> Option<T> {
    if from == to {
        None
    } else {
        Some(to.clone())
    }
}

/// Assigns `value` to `slot` when present and different; reports whether it changed.
pub(crate) fn assign<T: PartialEq + Clone>(slot: &mut T, value: &Option<T>) -> bool {
    match value {
        Some(value) if slot != value => {
            *slot = value.clone();
            true
        }
        _ => false,
    }
}
