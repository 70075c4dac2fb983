//! External database handler.
//!
//! # Responsibility
//! - Define the `RemoteStore` contract used by the data model and sync.
//! - Define wire records and typed outcomes for the festival service.
//!
//! # Invariants
//! - Every plain-text service sentinel maps to a distinct outcome or error.
//! - Client permission failures surface as `RemoteError::PermissionDenied`
//!   from every call.
//! - Patches sent remotely carry only remote-editable fields.

use crate::model::concert::{Concert, ConcertPatch};
use crate::model::festival::{Festival, FestivalPatch};
use crate::model::{ExternalId, FestivalId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod http;
pub mod protocol;

pub use http::HttpRemoteStore;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Rejection reason reported by the service as a plain-text sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteRejection {
    InvalidFestivalId,
    ConcertNotFound,
    IncorrectInput,
    NameExists,
    ArtistExists,
}

impl Display for RemoteRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::InvalidFestivalId => "invalid festival id",
            Self::ConcertNotFound => "concert not found",
            Self::IncorrectInput => "incorrect input",
            Self::NameExists => "festival name already exists",
            Self::ArtistExists => "artist already scheduled",
        };
        f.write_str(text)
    }
}

/// Error for external service calls.
#[derive(Debug)]
pub enum RemoteError {
    Transport(reqwest::Error),
    Status(u16),
    /// Client name missing or not allowed, or the session may not perform the call.
    PermissionDenied(String),
    Rejected(RemoteRejection),
    UnexpectedResponse(String),
    Decode(serde_json::Error),
    InvalidBaseUrl(String),
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "remote transport error: {err}"),
            Self::Status(code) => write!(f, "remote returned HTTP status {code}"),
            Self::PermissionDenied(reason) => write!(f, "remote permission denied: {reason}"),
            Self::Rejected(reason) => write!(f, "remote rejected request: {reason}"),
            Self::UnexpectedResponse(body) => write!(f, "unexpected remote response: `{body}`"),
            Self::Decode(err) => write!(f, "failed to decode remote record: {err}"),
            Self::InvalidBaseUrl(message) => write!(f, "invalid remote base url: {message}"),
        }
    }
}

impl Error for RemoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            Self::Decode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value)
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value)
    }
}

impl From<RemoteRejection> for RemoteError {
    fn from(value: RemoteRejection) -> Self {
        Self::Rejected(value)
    }
}

/// Reachability of the external service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityStatus {
    Reachable,
    /// The network works but the service fails or times out.
    ServerUnavailable,
    /// No connection could be established.
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    LoggedIn,
    InvalidCredentials,
    MissingUsername,
    MissingPassword,
    DisabledAccount,
}

/// Registration field named by a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationField {
    Username,
    Email,
    Password,
    FirstName,
    LastName,
    Country,
    City,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered,
    MissingRequiredFields,
    InvalidRequiredField(RegistrationField),
    InvalidOptionalField(RegistrationField),
}

/// New account request. Optional fields are omitted from the form when `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    /// Whether the user officially represents a festival's organisers.
    pub representative: bool,
}

/// Search filters for listing festivals remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FestivalQuery {
    /// Maximum number of festivals to return (`num`).
    pub limit: u32,
    pub official: Option<bool>,
    pub name: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub genre: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    /// Matches festivals hosting a concert by this artist.
    pub artist: Option<String>,
}

impl Default for FestivalQuery {
    fn default() -> Self {
        Self::top(20)
    }
}

impl FestivalQuery {
    /// Unfiltered query for the top `limit` festivals.
    pub fn top(limit: u32) -> Self {
        Self {
            limit,
            official: None,
            name: None,
            country: None,
            city: None,
            genre: None,
            min_price: None,
            max_price: None,
            artist: None,
        }
    }
}

/// Festival record as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFestival {
    pub id: ExternalId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub prices: String,
    pub owner: String,
    #[serde(default)]
    pub official: bool,
    #[serde(default)]
    pub votes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_uploaded: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,
}

impl RemoteFestival {
    /// Converts to an unsaved local festival stamped as synchronised at `now_ms`.
    pub fn to_festival(&self, now_ms: i64) -> Festival {
        Festival {
            id: None,
            external_id: Some(self.id),
            name: self.name.clone(),
            description: self.description.clone(),
            country: self.country.clone(),
            city: self.city.clone(),
            address: self.address.clone(),
            genre: self.genre.clone(),
            prices: self.prices.clone(),
            owner: self.owner.clone(),
            official: self.official,
            votes: self.votes,
            last_modified_ms: now_ms,
            last_synchronised_ms: now_ms,
        }
    }
}

/// Concert record as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConcert {
    pub id: ExternalId,
    /// External id of the hosting festival.
    pub festival: ExternalId,
    pub artist: String,
    /// Stage number.
    pub scene: u32,
    pub day: u32,
    pub start: i64,
    pub end: i64,
}

impl RemoteConcert {
    /// Converts to an unsaved local concert under local festival `festival_id`.
    pub fn to_concert(&self, festival_id: FestivalId, now_ms: i64) -> Concert {
        Concert {
            id: None,
            external_id: Some(self.id),
            festival_id,
            artist: self.artist.clone(),
            stage: self.scene,
            day: self.day,
            start_ms: self.start,
            end_ms: self.end,
            notify: false,
            last_modified_ms: now_ms,
            last_synchronised_ms: now_ms,
        }
    }
}

/// Synchronous access to the external festival service.
pub trait RemoteStore {
    fn connectivity(&self) -> ConnectivityStatus;
    fn register(&self, registration: &Registration) -> RemoteResult<RegisterOutcome>;
    fn login(&self, username: &str, password: &str) -> RemoteResult<LoginOutcome>;
    /// Returns whether the service confirmed the logout.
    fn logout(&self) -> RemoteResult<bool>;

    fn read_festivals(&self, query: &FestivalQuery) -> RemoteResult<Vec<RemoteFestival>>;
    /// `None` when the service does not know `external_id`.
    fn read_festival(&self, external_id: ExternalId) -> RemoteResult<Option<RemoteFestival>>;
    /// Publishes a festival; returns the new external id when the service reports it.
    fn write_festival(&self, festival: &Festival) -> RemoteResult<Option<ExternalId>>;
    fn update_festival(&self, external_id: ExternalId, patch: &FestivalPatch)
        -> RemoteResult<()>;
    fn delete_festival(&self, external_id: ExternalId) -> RemoteResult<()>;
    /// Casts a vote and returns the new vote count.
    fn vote(&self, external_id: ExternalId) -> RemoteResult<u32>;

    /// `None` when the festival id is unknown to the service.
    fn read_festival_concerts(
        &self,
        festival_external_id: ExternalId,
    ) -> RemoteResult<Option<Vec<RemoteConcert>>>;
    fn read_concert(&self, external_id: ExternalId) -> RemoteResult<Option<RemoteConcert>>;
    fn write_concert(
        &self,
        festival_external_id: ExternalId,
        concert: &Concert,
    ) -> RemoteResult<Option<ExternalId>>;
    fn update_concert(&self, external_id: ExternalId, patch: &ConcertPatch) -> RemoteResult<()>;
    fn delete_concert(&self, external_id: ExternalId) -> RemoteResult<()>;
}
