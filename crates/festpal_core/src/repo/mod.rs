//! Internal database handler: repository contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define festival/concert data access contracts.
//! - Isolate SQLite query details from the data model facade and sync.
//!
//! # Invariants
//! - Write paths call `validate()` on the merged record before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repository APIs return semantic errors (`*NotFound`) in addition to DB
//!   transport errors.

use crate::db::DbError;
use crate::model::{ConcertId, FestivalId, ModelValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod concert_repo;
pub mod festival_repo;

pub use concert_repo::{ConcertRepository, SqliteConcertRepository};
pub use festival_repo::{FestivalRepository, SqliteFestivalRepository};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for festival/concert persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ModelValidationError),
    Db(DbError),
    FestivalNotFound(FestivalId),
    ConcertNotFound(ConcertId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::FestivalNotFound(id) => write!(f, "festival not found: {id}"),
            Self::ConcertNotFound(id) => write!(f, "concert not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::FestivalNotFound(_) | Self::ConcertNotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<ModelValidationError> for RepoError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn parse_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn parse_u32(value: i64, column: &str) -> RepoResult<u32> {
    u32::try_from(value).map_err(|_| {
        RepoError::InvalidData(format!("invalid non-negative value `{value}` in {column}"))
    })
}
