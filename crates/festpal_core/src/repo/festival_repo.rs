//! Festival repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the `festivals` table.
//! - Apply partial updates (`FestivalPatch`) without touching unrelated columns.
//!
//! # Invariants
//! - `delete_festival` cascades to the festival's concerts.
//! - `external_id` is unique across local festivals.

use super::{bool_to_int, parse_bool, parse_u32, RepoError, RepoResult};
use crate::model::festival::{Festival, FestivalPatch};
use crate::model::{ExternalId, FestivalId};
use rusqlite::{params, Connection, Row};

const FESTIVAL_SELECT_SQL: &str = "SELECT
    id,
    external_id,
    name,
    description,
    country,
    city,
    address,
    genre,
    prices,
    owner,
    official,
    votes,
    last_modified,
    last_synchronised
FROM festivals";

/// Repository interface for festival CRUD operations.
pub trait FestivalRepository {
    /// Whether at least one festival is stored.
    fn has_festivals(&self) -> RepoResult<bool>;
    /// Lists all festivals ordered by name, then id.
    fn list_festivals(&self) -> RepoResult<Vec<Festival>>;
    fn get_festival(&self, id: FestivalId) -> RepoResult<Option<Festival>>;
    fn get_festival_by_external_id(&self, external_id: ExternalId)
        -> RepoResult<Option<Festival>>;
    /// Inserts a festival and returns its new local id. `festival.id` is ignored.
    fn create_festival(&self, festival: &Festival) -> RepoResult<FestivalId>;
    /// Applies a partial update to an existing festival.
    fn update_festival(&self, id: FestivalId, patch: &FestivalPatch) -> RepoResult<()>;
    /// Deletes a festival and, through the foreign key, its concerts.
    fn delete_festival(&self, id: FestivalId) -> RepoResult<()>;
    /// Clears the external id of a festival whose remote record is gone.
    fn unlink_festival(&self, id: FestivalId) -> RepoResult<()>;
}

/// SQLite-backed festival repository.
pub struct SqliteFestivalRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFestivalRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl FestivalRepository for SqliteFestivalRepository<'_> {
    fn has_festivals(&self) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM festivals);",
            [],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn list_festivals(&self) -> RepoResult<Vec<Festival>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{FESTIVAL_SELECT_SQL} ORDER BY name ASC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut festivals = Vec::new();

        while let Some(row) = rows.next()? {
            festivals.push(parse_festival_row(row)?);
        }

        Ok(festivals)
    }

    fn get_festival(&self, id: FestivalId) -> RepoResult<Option<Festival>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{FESTIVAL_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_festival_row(row)?));
        }

        Ok(None)
    }

    fn get_festival_by_external_id(
        &self,
        external_id: ExternalId,
    ) -> RepoResult<Option<Festival>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{FESTIVAL_SELECT_SQL} WHERE external_id = ?1;"))?;
        let mut rows = stmt.query([external_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_festival_row(row)?));
        }

        Ok(None)
    }

    fn create_festival(&self, festival: &Festival) -> RepoResult<FestivalId> {
        festival.validate()?;

        self.conn.execute(
            "INSERT INTO festivals (
                external_id,
                name,
                description,
                country,
                city,
                address,
                genre,
                prices,
                owner,
                official,
                votes,
                last_modified,
                last_synchronised
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
            params![
                festival.external_id,
                festival.name.as_str(),
                festival.description.as_str(),
                festival.country.as_str(),
                festival.city.as_str(),
                festival.address.as_str(),
                festival.genre.as_str(),
                festival.prices.as_str(),
                festival.owner.as_str(),
                bool_to_int(festival.official),
                i64::from(festival.votes),
                festival.last_modified_ms,
                festival.last_synchronised_ms,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_festival(&self, id: FestivalId, patch: &FestivalPatch) -> RepoResult<()> {
        let mut festival = self
            .get_festival(id)?
            .ok_or(RepoError::FestivalNotFound(id))?;

        if patch.is_noop() {
            return Ok(());
        }

        patch.apply_to(&mut festival);
        festival.validate()?;

        self.conn.execute(
            "UPDATE festivals
             SET
                external_id = ?2,
                name = ?3,
                description = ?4,
                country = ?5,
                city = ?6,
                address = ?7,
                genre = ?8,
                prices = ?9,
                owner = ?10,
                official = ?11,
                votes = ?12,
                last_modified = ?13,
                last_synchronised = ?14
             WHERE id = ?1;",
            params![
                id,
                festival.external_id,
                festival.name.as_str(),
                festival.description.as_str(),
                festival.country.as_str(),
                festival.city.as_str(),
                festival.address.as_str(),
                festival.genre.as_str(),
                festival.prices.as_str(),
                festival.owner.as_str(),
                bool_to_int(festival.official),
                i64::from(festival.votes),
                festival.last_modified_ms,
                festival.last_synchronised_ms,
            ],
        )?;

        Ok(())
    }

    fn delete_festival(&self, id: FestivalId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM festivals WHERE id = ?1;", [id])?;

        if changed == 0 {
            return Err(RepoError::FestivalNotFound(id));
        }

        Ok(())
    }

    fn unlink_festival(&self, id: FestivalId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE festivals SET external_id = NULL WHERE id = ?1;",
            [id],
        )?;

        if changed == 0 {
            return Err(RepoError::FestivalNotFound(id));
        }

        Ok(())
    }
}

fn parse_festival_row(row: &Row<'_>) -> RepoResult<Festival> {
    let festival = Festival {
        id: Some(row.get("id")?),
        external_id: row.get("external_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        country: row.get("country")?,
        city: row.get("city")?,
        address: row.get("address")?,
        genre: row.get("genre")?,
        prices: row.get("prices")?,
        owner: row.get("owner")?,
        official: parse_bool(row.get("official")?, "festivals.official")?,
        votes: parse_u32(row.get("votes")?, "festivals.votes")?,
        last_modified_ms: row.get("last_modified")?,
        last_synchronised_ms: row.get("last_synchronised")?,
    };
    festival.validate()?;
    Ok(festival)
}
