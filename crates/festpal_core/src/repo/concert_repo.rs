//! Concert repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the `concerts` table.
//! - Keep every concert attached to an existing festival.
//!
//! # Invariants
//! - Create/update fail with `FestivalNotFound` when `festival_id` does not resolve.
//! - `(festival_id, external_id)` is unique.

use super::{bool_to_int, parse_bool, parse_u32, RepoError, RepoResult};
use crate::model::concert::{Concert, ConcertPatch};
use crate::model::{ConcertId, ExternalId, FestivalId};
use rusqlite::{params, Connection, Row};

const CONCERT_SELECT_SQL: &str = "SELECT
    id,
    external_id,
    festival_id,
    artist,
    stage,
    day,
    start_at,
    end_at,
    notify,
    last_modified,
    last_synchronised
FROM concerts";

/// Repository interface for concert CRUD operations.
pub trait ConcertRepository {
    fn festival_has_concerts(&self, festival_id: FestivalId) -> RepoResult<bool>;
    /// Lists a festival's concerts ordered by day, start time, then id.
    fn list_concerts(&self, festival_id: FestivalId) -> RepoResult<Vec<Concert>>;
    fn get_concert(&self, id: ConcertId) -> RepoResult<Option<Concert>>;
    fn get_concert_by_external_id(
        &self,
        festival_id: FestivalId,
        external_id: ExternalId,
    ) -> RepoResult<Option<Concert>>;
    fn create_concert(&self, concert: &Concert) -> RepoResult<ConcertId>;
    fn update_concert(&self, id: ConcertId, patch: &ConcertPatch) -> RepoResult<()>;
    fn delete_concert(&self, id: ConcertId) -> RepoResult<()>;
    /// Clears the external ids of a festival's concerts; returns how many were linked.
    fn unlink_concerts(&self, festival_id: FestivalId) -> RepoResult<usize>;
}

/// SQLite-backed concert repository.
pub struct SqliteConcertRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteConcertRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn ensure_festival_exists(&self, festival_id: FestivalId) -> RepoResult<()> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM festivals WHERE id = ?1);",
            [festival_id],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(RepoError::FestivalNotFound(festival_id));
        }
        Ok(())
    }
}

impl ConcertRepository for SqliteConcertRepository<'_> {
    fn festival_has_concerts(&self, festival_id: FestivalId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM concerts WHERE festival_id = ?1);",
            [festival_id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn list_concerts(&self, festival_id: FestivalId) -> RepoResult<Vec<Concert>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CONCERT_SELECT_SQL}
             WHERE festival_id = ?1
             ORDER BY day ASC, start_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([festival_id])?;
        let mut concerts = Vec::new();

        while let Some(row) = rows.next()? {
            concerts.push(parse_concert_row(row)?);
        }

        Ok(concerts)
    }

    fn get_concert(&self, id: ConcertId) -> RepoResult<Option<Concert>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CONCERT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_concert_row(row)?));
        }

        Ok(None)
    }

    fn get_concert_by_external_id(
        &self,
        festival_id: FestivalId,
        external_id: ExternalId,
    ) -> RepoResult<Option<Concert>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CONCERT_SELECT_SQL} WHERE festival_id = ?1 AND external_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![festival_id, external_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_concert_row(row)?));
        }

        Ok(None)
    }

    fn create_concert(&self, concert: &Concert) -> RepoResult<ConcertId> {
        concert.validate()?;
        self.ensure_festival_exists(concert.festival_id)?;

        self.conn.execute(
            "INSERT INTO concerts (
                external_id,
                festival_id,
                artist,
                stage,
                day,
                start_at,
                end_at,
                notify,
                last_modified,
                last_synchronised
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                concert.external_id,
                concert.festival_id,
                concert.artist.as_str(),
                i64::from(concert.stage),
                i64::from(concert.day),
                concert.start_ms,
                concert.end_ms,
                bool_to_int(concert.notify),
                concert.last_modified_ms,
                concert.last_synchronised_ms,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_concert(&self, id: ConcertId, patch: &ConcertPatch) -> RepoResult<()> {
        let mut concert = self.get_concert(id)?.ok_or(RepoError::ConcertNotFound(id))?;

        if patch.is_noop() {
            return Ok(());
        }

        patch.apply_to(&mut concert);
        concert.validate()?;
        if patch.festival_id.is_some() {
            self.ensure_festival_exists(concert.festival_id)?;
        }

        self.conn.execute(
            "UPDATE concerts
             SET
                external_id = ?2,
                festival_id = ?3,
                artist = ?4,
                stage = ?5,
                day = ?6,
                start_at = ?7,
                end_at = ?8,
                notify = ?9,
                last_modified = ?10,
                last_synchronised = ?11
             WHERE id = ?1;",
            params![
                id,
                concert.external_id,
                concert.festival_id,
                concert.artist.as_str(),
                i64::from(concert.stage),
                i64::from(concert.day),
                concert.start_ms,
                concert.end_ms,
                bool_to_int(concert.notify),
                concert.last_modified_ms,
                concert.last_synchronised_ms,
            ],
        )?;

        Ok(())
    }

    fn delete_concert(&self, id: ConcertId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM concerts WHERE id = ?1;", [id])?;

        if changed == 0 {
            return Err(RepoError::ConcertNotFound(id));
        }

        Ok(())
    }

    fn unlink_concerts(&self, festival_id: FestivalId) -> RepoResult<usize> {
        let unlinked = self.conn.execute(
            "UPDATE concerts
             SET external_id = NULL
             WHERE festival_id = ?1 AND external_id IS NOT NULL;",
            [festival_id],
        )?;
        Ok(unlinked)
    }
}

fn parse_concert_row(row: &Row<'_>) -> RepoResult<Concert> {
    let concert = Concert {
        id: Some(row.get("id")?),
        external_id: row.get("external_id")?,
        festival_id: row.get("festival_id")?,
        artist: row.get("artist")?,
        stage: parse_u32(row.get("stage")?, "concerts.stage")?,
        day: parse_u32(row.get("day")?, "concerts.day")?,
        start_ms: row.get("start_at")?,
        end_ms: row.get("end_at")?,
        notify: parse_bool(row.get("notify")?, "concerts.notify")?,
        last_modified_ms: row.get("last_modified")?,
        last_synchronised_ms: row.get("last_synchronised")?,
    };
    concert.validate()?;
    Ok(concert)
}
