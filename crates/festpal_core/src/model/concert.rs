//! Concert domain record and partial-update patch.
//!
//! # Invariants
//! - `festival_id` always references an existing local festival.
//! - `stage` and `day` are 1-based.
//! - `end_ms >= start_ms`.
//! - `notify` is a local preference and never leaves the device.

use super::{
    assign, now_epoch_ms, require_text, ConcertId, ExternalId, FestivalId, ModelValidationError,
};
use serde::{Deserialize, Serialize};

/// Concert scheduled within a festival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concert {
    pub id: Option<ConcertId>,
    pub external_id: Option<ExternalId>,
    /// Local id of the hosting festival.
    pub festival_id: FestivalId,
    pub artist: String,
    pub stage: u32,
    pub day: u32,
    /// Unix epoch milliseconds.
    pub start_ms: i64,
    /// Unix epoch milliseconds.
    pub end_ms: i64,
    /// Whether the user wants a reminder before the concert starts.
    pub notify: bool,
    pub last_modified_ms: i64,
    pub last_synchronised_ms: i64,
}

impl Concert {
    pub fn new(
        festival_id: FestivalId,
        artist: impl Into<String>,
        stage: u32,
        day: u32,
        start_ms: i64,
        end_ms: i64,
    ) -> Self {
        Self {
            id: None,
            external_id: None,
            festival_id,
            artist: artist.into(),
            stage,
            day,
            start_ms,
            end_ms,
            notify: false,
            last_modified_ms: now_epoch_ms(),
            last_synchronised_ms: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("artist", &self.artist)?;
        if self.stage == 0 {
            return Err(ModelValidationError::NonPositive {
                field: "stage",
                value: 0,
            });
        }
        if self.day == 0 {
            return Err(ModelValidationError::NonPositive {
                field: "day",
                value: 0,
            });
        }
        if self.end_ms < self.start_ms {
            return Err(ModelValidationError::EndBeforeStart {
                start_ms: self.start_ms,
                end_ms: self.end_ms,
            });
        }
        Ok(())
    }

    /// Compares schedule fields, ignoring ids, timestamps and `notify`.
    pub fn sync_eq(&self, other: &Concert) -> bool {
        self.artist == other.artist
            && self.stage == other.stage
            && self.day == other.day
            && self.start_ms == other.start_ms
            && self.end_ms == other.end_ms
    }

    pub fn has_unsynchronised_changes(&self) -> bool {
        self.last_modified_ms > self.last_synchronised_ms
    }
}

/// Partial update for a concert. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConcertPatch {
    pub external_id: Option<ExternalId>,
    pub festival_id: Option<FestivalId>,
    pub artist: Option<String>,
    pub stage: Option<u32>,
    pub day: Option<u32>,
    pub start_ms: Option<i64>,
    pub end_ms: Option<i64>,
    pub notify: Option<bool>,
    pub last_modified_ms: Option<i64>,
    pub last_synchronised_ms: Option<i64>,
}

impl ConcertPatch {
    /// Returns `true` when no field (timestamps excluded) would change.
    pub fn is_empty(&self) -> bool {
        self.external_id.is_none()
            && self.festival_id.is_none()
            && self.artist.is_none()
            && self.stage.is_none()
            && self.day.is_none()
            && self.start_ms.is_none()
            && self.end_ms.is_none()
            && self.notify.is_none()
    }

    pub fn is_noop(&self) -> bool {
        self.is_empty() && self.last_modified_ms.is_none() && self.last_synchronised_ms.is_none()
    }

    /// Keeps only the schedule fields the external service accepts.
    pub fn remote_fields(&self) -> ConcertPatch {
        ConcertPatch {
            artist: self.artist.clone(),
            stage: self.stage,
            day: self.day,
            start_ms: self.start_ms,
            end_ms: self.end_ms,
            ..ConcertPatch::default()
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

    /// Applies the patch in place; returns whether any non-timestamp field changed.
    pub fn apply_to(&self, concert: &mut Concert) -> bool {
        let mut changed = false;
        if let Some(external_id) = self.external_id {
            if concert.external_id != Some(external_id) {
                concert.external_id = Some(external_id);
                changed = true;
            }
        }
        changed |= assign(&mut concert.festival_id, &self.festival_id);
        changed |= assign(&mut concert.artist, &self.artist);
        changed |= assign(&mut concert.stage, &self.stage);
        changed |= assign(&mut concert.day, &self.day);
        changed |= assign(&mut concert.start_ms, &self.start_ms);
        changed |= assign(&mut concert.end_ms, &self.end_ms);
        changed |= assign(&mut concert.notify, &self.notify);
        if let Some(ms) = self.last_modified_ms {
            concert.last_modified_ms = ms;
        }
        if let Some(ms) = self.last_synchronised_ms {
            concert.last_synchronised_ms = ms;
        }
        changed
    }
}
