//! Core data layer for FestPal.
//! Festivals and concerts live in a local SQLite store and are mirrored to
//! the external festival service by field-diff synchronisation.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod remote;
pub mod repo;
pub mod service;
pub mod sync;

pub use config::{ConfigError, FestpalConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::concert::{Concert, ConcertPatch};
pub use model::festival::{Festival, FestivalPatch};
pub use model::{ConcertId, ExternalId, FestivalId, ModelValidationError};
pub use remote::{
    ConnectivityStatus, FestivalQuery, HttpRemoteStore, LoginOutcome, RegisterOutcome,
    Registration, RemoteConcert, RemoteError, RemoteFestival, RemoteRejection, RemoteStore,
};
pub use repo::{
    ConcertRepository, FestivalRepository, RepoError, RepoResult, SqliteConcertRepository,
    SqliteFestivalRepository,
};
pub use service::{DataModel, DataModelError, DataModelResult};
pub use sync::{SyncDirection, SyncReport};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
