//! Festival domain record and partial-update patch.
//!
//! # Invariants
//! - `name` and `owner` are never blank.
//! - `owner` is the remote username of the uploader; only the owner may push edits.
//! - `votes` is authoritative on the remote side and only ever pulled.

use super::{assign, now_epoch_ms, require_text, ExternalId, FestivalId, ModelValidationError};
use serde::{Deserialize, Serialize};

/// Festival listing as stored in the internal database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Festival {
    /// Internal database id; `None` until the festival is saved locally.
    pub id: Option<FestivalId>,
    /// External service id; `None` until the festival is published.
    pub external_id: Option<ExternalId>,
    pub name: String,
    pub description: String,
    pub country: String,
    pub city: String,
    pub address: String,
    /// Genre or comma separated list of genres.
    pub genre: String,
    /// Price or list of prices, currency included.
    pub prices: String,
    /// Username of the uploader.
    pub owner: String,
    /// Whether the owner is an official host of the festival.
    pub official: bool,
    pub votes: u32,
    /// Unix epoch milliseconds of the last local modification.
    pub last_modified_ms: i64,
    /// Unix epoch milliseconds of the last successful synchronisation.
    pub last_synchronised_ms: i64,
}

impl Festival {
    /// Creates an unsaved, unpublished festival owned by `owner`.
    ///
    /// The record starts as modified-but-never-synchronised.
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            id: None,
            external_id: None,
            name: name.into(),
            description: String::new(),
            country: String::new(),
            city: String::new(),
            address: String::new(),
            genre: String::new(),
            prices: String::new(),
            owner: owner.into(),
            official: false,
            votes: 0,
            last_modified_ms: now_epoch_ms(),
            last_synchronised_ms: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("name", &self.name)?;
        require_text("owner", &self.owner)?;
        Ok(())
    }

    /// Compares every descriptive field, ignoring ids and timestamps.
    pub fn sync_eq(&self, other: &Festival) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.country == other.country
            && self.city == other.city
            && self.address == other.address
            && self.genre == other.genre
            && self.prices == other.prices
            && self.owner == other.owner
            && self.official == other.official
            && self.votes == other.votes
    }

    pub fn is_owned_by(&self, username: Option<&str>) -> bool {
        username.is_some_and(|user| user == self.owner)
    }

    /// Whether local edits happened after the last synchronisation.
    pub fn has_unsynchronised_changes(&self) -> bool {
        self.last_modified_ms > self.last_synchronised_ms
    }

    /// Whether the service acknowledged this festival without its id becoming known.
    ///
    /// Such a festival must be looked up, never written again.
    pub fn awaits_external_id(&self) -> bool {
        self.external_id.is_none() && self.last_synchronised_ms > 0
    }
}

/// Partial update for a festival. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FestivalPatch {
    pub external_id: Option<ExternalId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub genre: Option<String>,
    pub prices: Option<String>,
    pub owner: Option<String>,
    pub official: Option<bool>,
    pub votes: Option<u32>,
    pub last_modified_ms: Option<i64>,
    pub last_synchronised_ms: Option<i64>,
}

impl FestivalPatch {
    /// Returns `true` when no field (timestamps excluded) would change.
    pub fn is_empty(&self) -> bool {
        self.external_id.is_none()
            && self.name.is_none()
            && self.description.is_none()
            && self.country.is_none()
            && self.city.is_none()
            && self.address.is_none()
            && self.genre.is_none()
            && self.prices.is_none()
            && self.owner.is_none()
            && self.official.is_none()
            && self.votes.is_none()
    }

    /// Returns `true` when neither fields nor timestamps are set.
    pub fn is_noop(&self) -> bool {
        self.is_empty() && self.last_modified_ms.is_none() && self.last_synchronised_ms.is_none()
    }

    /// Keeps only the fields the external service accepts on write/update.
    pub fn remote_fields(&self) -> FestivalPatch {
        FestivalPatch {
            name: self.name.clone(),
            description: self.description.clone(),
            country: self.country.clone(),
            city: self.city.clone(),
            address: self.address.clone(),
            genre: self.genre.clone(),
            prices: self.prices.clone(),
            official: self.official,
            ..FestivalPatch::default()
        }
    }

    /// Keeps only the fields owned by the external service (identity, owner, votes).
    pub fn remote_authoritative_fields(&self) -> FestivalPatch {
        FestivalPatch {
            external_id: self.external_id,
            owner: self.owner.clone(),
            votes: self.votes,
            ..FestivalPatch::default()
        }
    }

    pub fn with_last_modified(mut self, now_ms: i64) -> Self {
        self.last_modified_ms = Some(now_ms);
        self
    }

    pub fn with_last_synchronised(mut self, now_ms: i64) -> Self {
        self.last_synchronised_ms = Some(now_ms);
        self
    }

    /// Applies the patch in place.
    ///
    /// Returns whether any non-timestamp field actually changed.
    pub fn apply_to(&self, festival: &mut Festival) -> bool {
        let mut changed = false;
        if let Some(external_id) = self.external_id {
            if festival.external_id != Some(external_id) {
                festival.external_id = Some(external_id);
                changed = true;
            }
        }
        changed |= assign(&mut festival.name, &self.name);
        changed |= assign(&mut festival.description, &self.description);
        changed |= assign(&mut festival.country, &self.country);
        changed |= assign(&mut festival.city, &self.city);
        changed |= assign(&mut festival.address, &self.address);
        changed |= assign(&mut festival.genre, &self.genre);
        changed |= assign(&mut festival.prices, &self.prices);
        changed |= assign(&mut festival.owner, &self.owner);
        changed |= assign(&mut festival.official, &self.official);
        changed |= assign(&mut festival.votes, &self.votes);
        if let Some(ms) = self.last_modified_ms {
            festival.last_modified_ms = ms;
        }
        if let Some(ms) = self.last_synchronised_ms {
            festival.last_synchronised_ms = ms;
        }
        changed
    }
}
