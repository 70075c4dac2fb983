//! `DataModel`: session, read/write and synchronisation entry points.
//!
//! # Responsibility
//! - Track the logged-in username of the external service session.
//! - Route reads and writes to the internal database and, when asked, to
//!   the external one.
//! - Reconcile both databases field by field in `synchronise`.
//!
//! # Invariants
//! - Online writes require a logged-in owner of the festival; a stored
//!   festival is checked against its stored owner.
//! - A festival the service acknowledged without an id is looked up, never
//!   published twice.
//! - Remote writes happen before local writes; a remote failure leaves the
//!   internal database untouched.
//! - `last_modified` moves only when a field actually changed.
//! - `notify` is never overwritten by remote data.

use crate::db::DbError;
use crate::model::concert::{Concert, ConcertPatch};
use crate::model::festival::{Festival, FestivalPatch};
use crate::model::{now_epoch_ms, ConcertId, ExternalId, FestivalId, ModelValidationError};
use crate::remote::{
    ConnectivityStatus, FestivalQuery, LoginOutcome, RegisterOutcome, Registration, RemoteError,
    RemoteRejection, RemoteStore,
};
use crate::repo::{
    ConcertRepository, FestivalRepository, RepoError, SqliteConcertRepository,
    SqliteFestivalRepository,
};
use crate::sync::{
    can_push, concert_patch, decide_direction, festival_patch, SkipReason, SkippedFestival,
    SyncDirection, SyncReport,
};
use log::{info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type DataModelResult<T> = Result<T, DataModelError>;

const PUBLISHED_LOOKUP_LIMIT: u32 = 100;

/// Error for data model use-cases.
#[derive(Debug)]
pub enum DataModelError {
    NotLoggedIn,
    /// The session user does not own the festival.
    NotOwner { owner: String },
    /// A stored festival keeps its owner.
    OwnerChange { owner: String, requested: String },
    FestivalNotFound(FestivalId),
    ConcertNotFound(ConcertId),
    /// Online concert operations need the festival to exist remotely first.
    FestivalNotPublished(FestivalId),
    /// The service acknowledged the festival but its external id is unknown.
    ExternalIdUnresolved(FestivalId),
    Repo(RepoError),
    Remote(RemoteError),
}

impl Display for DataModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotLoggedIn => write!(f, "not logged in to the festival service"),
            Self::NotOwner { owner } => write!(f, "festival is owned by `{owner}`"),
            Self::OwnerChange { owner, requested } => write!(
                f,
                "festival owner `{owner}` cannot be changed to `{requested}`"
            ),
            Self::FestivalNotFound(id) => write!(f, "festival not found: {id}"),
            Self::ConcertNotFound(id) => write!(f, "concert not found: {id}"),
            Self::FestivalNotPublished(id) => write!(f, "festival {id} is not published"),
            Self::ExternalIdUnresolved(id) => write!(
                f,
                "festival {id} was published but its external id is unknown"
            ),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Remote(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DataModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Remote(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for DataModelError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::FestivalNotFound(id) => Self::FestivalNotFound(id),
            RepoError::ConcertNotFound(id) => Self::ConcertNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<RemoteError> for DataModelError {
    fn from(value: RemoteError) -> Self {
        Self::Remote(value)
    }
}

impl From<ModelValidationError> for DataModelError {
    fn from(value: ModelValidationError) -> Self {
        Self::Repo(RepoError::Validation(value))
    }
}

impl From<rusqlite::Error> for DataModelError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::Db(DbError::Sqlite(value)))
    }
}

/// Facade over the internal database, the external service and the session.
pub struct DataModel<R: RemoteStore> {
    conn: Connection,
    remote: R,
    username: Option<String>,
}

impl<R: RemoteStore> DataModel<R> {
    /// Creates a logged-out data model over a migrated connection.
    pub fn new(conn: Connection, remote: R) -> Self {
        Self {
            conn,
            remote,
            username: None,
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn festivals(&self) -> SqliteFestivalRepository<'_> {
        SqliteFestivalRepository::new(&self.conn)
    }

    fn concerts(&self) -> SqliteConcertRepository<'_> {
        SqliteConcertRepository::new(&self.conn)
    }

    // Session

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Overrides the session username without contacting the service.
    pub fn set_username(&mut self, username: Option<String>) {
        self.username = username;
    }

    pub fn register(&self, registration: &Registration) -> DataModelResult<RegisterOutcome> {
        let outcome = self.remote.register(registration)?;
        info!("event=session_register module=service status=ok outcome={outcome:?}");
        Ok(outcome)
    }

    /// Logs in and, on success, remembers `username` for ownership checks.
    pub fn login(&mut self, username: &str, password: &str) -> DataModelResult<LoginOutcome> {
        let outcome = self.remote.login(username, password)?;
        if outcome == LoginOutcome::LoggedIn {
            self.username = Some(username.to_string());
        }
        info!("event=session_login module=service status=ok outcome={outcome:?}");
        Ok(outcome)
    }

    /// Logs out; the username is cleared only when the service confirms.
    pub fn logout(&mut self) -> DataModelResult<bool> {
        let logged_out = self.remote.logout()?;
        if logged_out {
            self.username = None;
        }
        info!("event=session_logout module=service status=ok logged_out={logged_out}");
        Ok(logged_out)
    }

    fn require_owner(&self, festival: &Festival) -> DataModelResult<()> {
        if self.username.is_none() {
            return Err(DataModelError::NotLoggedIn);
        }
        if !festival.is_owned_by(self.username()) {
            return Err(DataModelError::NotOwner {
                owner: festival.owner.clone(),
            });
        }
        Ok(())
    }

    // Listing and status

    pub fn connectivity(&self) -> ConnectivityStatus {
        self.remote.connectivity()
    }

    /// Festivals matching `query` on the external service, as unsaved records.
    pub fn online_festivals(&self, query: &FestivalQuery) -> DataModelResult<Vec<Festival>> {
        let now = now_epoch_ms();
        let festivals = self.remote.read_festivals(query)?;
        Ok(festivals
            .iter()
            .map(|remote| remote.to_festival(now))
            .collect())
    }

    pub fn offline_festivals(&self) -> DataModelResult<Vec<Festival>> {
        Ok(self.festivals().list_festivals()?)
    }

    pub fn internal_has_festivals(&self) -> DataModelResult<bool> {
        Ok(self.festivals().has_festivals()?)
    }

    pub fn festival_has_concerts(&self, festival_id: FestivalId) -> DataModelResult<bool> {
        Ok(self.concerts().festival_has_concerts(festival_id)?)
    }

    pub fn concerts_for(&self, festival_id: FestivalId) -> DataModelResult<Vec<Concert>> {
        if self.festivals().get_festival(festival_id)?.is_none() {
            return Err(DataModelError::FestivalNotFound(festival_id));
        }
        Ok(self.concerts().list_concerts(festival_id)?)
    }

    // Festivals

    /// Reads a local festival, optionally refreshing it from the external service.
    ///
    /// Returns `None` when the festival is not stored locally. An unpublished
    /// festival, or one unknown remotely, is returned as stored.
    pub fn read_festival_info(
        &self,
        id: FestivalId,
        update: bool,
    ) -> DataModelResult<Option<Festival>> {
        let Some(mut festival) = self.festivals().get_festival(id)? else {
            return Ok(None);
        };
        if !update {
            return Ok(Some(festival));
        }
        let Some(external_id) = festival.external_id else {
            return Ok(Some(festival));
        };
        let Some(remote) = self.remote.read_festival(external_id)? else {
            return Ok(Some(festival));
        };

        let now = now_epoch_ms();
        let patch = festival_patch(&festival, &remote.to_festival(now)).with_last_synchronised(now);
        self.festivals().update_festival(id, &patch)?;
        patch.apply_to(&mut festival);
        Ok(Some(festival))
    }

    /// Saves a festival owned by the session user; returns its local id.
    ///
    /// A stored festival is checked against its stored owner, which cannot
    /// change. With `online`, the festival is first updated remotely with only
    /// the changed fields, or published when the service does not know it.
    pub fn write_festival_info(
        &self,
        festival: &Festival,
        online: bool,
    ) -> DataModelResult<FestivalId> {
        let repo = self.festivals();
        let existing = match festival.id {
            Some(id) => repo.get_festival(id)?,
            None => None,
        };
        match &existing {
            Some(stored) => {
                self.require_owner(stored)?;
                if festival.owner != stored.owner {
                    return Err(DataModelError::OwnerChange {
                        owner: stored.owner.clone(),
                        requested: festival.owner.clone(),
                    });
                }
            }
            None => self.require_owner(festival)?,
        }
        festival.validate()?;

        let now = now_epoch_ms();
        let mut record = festival.clone();
        if online {
            record.external_id = self.push_festival(&record, existing.as_ref(), now)?;
        } else if let Some(stored) = &existing {
            record.external_id = stored.external_id;
        }

        let id = match existing {
            Some(existing) => {
                let id = record.id.unwrap_or_default();
                let mut patch = festival_patch(&existing, &record);
                if !patch.is_empty() {
                    patch.last_modified_ms = Some(now);
                }
                if online {
                    patch.last_synchronised_ms = Some(now);
                }
                repo.update_festival(id, &patch)?;
                self.relink_published(id, existing.external_id, record.external_id)?;
                id
            }
            None => {
                record.last_modified_ms = now;
                if online {
                    record.last_synchronised_ms = now;
                }
                repo.create_festival(&record)?
            }
        };

        info!(
            "event=festival_write module=service status=ok festival_id={} online={}",
            id, online
        );
        Ok(id)
    }

    /// Updates or publishes `festival` remotely; returns the external id to keep.
    ///
    /// `stored` is the local row being overwritten, if any. Its link wins over
    /// the caller's, and a festival awaiting its id is looked up, never rewritten.
    fn push_festival(
        &self,
        festival: &Festival,
        stored: Option<&Festival>,
        now: i64,
    ) -> DataModelResult<Option<ExternalId>> {
        let known = match stored {
            Some(stored) if stored.awaits_external_id() => {
                let found = self.find_published_id(stored)?;
                if found.is_none() {
                    return Err(DataModelError::ExternalIdUnresolved(
                        stored.id.unwrap_or_default(),
                    ));
                }
                found
            }
            Some(stored) => stored.external_id,
            None => festival.external_id,
        };
        let remote = match known {
            Some(external_id) => self.remote.read_festival(external_id)?,
            None => None,
        };
        match remote {
            Some(remote) => {
                let patch = festival_patch(&remote.to_festival(now), festival).remote_fields();
                if !patch.is_empty() {
                    self.remote.update_festival(remote.id, &patch)?;
                }
                Ok(Some(remote.id))
            }
            None => self.publish_festival(festival),
        }
    }

    /// Writes `festival` to the service and returns its external id.
    ///
    /// A bare `OK` acknowledgement is resolved by lookup; `None` means the
    /// service holds the festival under an id that could not be found.
    fn publish_festival(&self, festival: &Festival) -> DataModelResult<Option<ExternalId>> {
        match self.remote.write_festival(festival)? {
            Some(external_id) => Ok(Some(external_id)),
            None => self.find_published_id(festival),
        }
    }

    /// Finds a published festival by exact name and owner; the newest match wins.
    fn find_published_id(&self, festival: &Festival) -> DataModelResult<Option<ExternalId>> {
        let query = FestivalQuery {
            name: Some(festival.name.clone()),
            ..FestivalQuery::top(PUBLISHED_LOOKUP_LIMIT)
        };
        let found = self
            .remote
            .read_festivals(&query)?
            .into_iter()
            .filter(|remote| remote.name == festival.name && remote.owner == festival.owner)
            .map(|remote| remote.id)
            .max();
        match found {
            Some(external_id) => info!(
                "event=festival_lookup module=service status=ok external_id={}",
                external_id
            ),
            None => warn!(
                "event=festival_lookup module=service status=not_found owner={}",
                festival.owner
            ),
        }
        Ok(found)
    }

    /// Drops links into a remote festival that was replaced or is unknown.
    ///
    /// Concerts lose their external ids so the next push recreates them under
    /// the festival's current remote record.
    fn relink_published(
        &self,
        id: FestivalId,
        previous: Option<ExternalId>,
        current: Option<ExternalId>,
    ) -> DataModelResult<()> {
        let Some(previous) = previous else {
            return Ok(());
        };
        if current == Some(previous) {
            return Ok(());
        }
        if current.is_none() {
            self.festivals().unlink_festival(id)?;
        }
        let unlinked = self.concerts().unlink_concerts(id)?;
        info!(
            "event=festival_relink module=service status=ok festival_id={} previous_external_id={} concerts_unlinked={}",
            id, previous, unlinked
        );
        Ok(())
    }

    /// Deletes a festival and its concerts; with `online`, remotely first.
    ///
    /// A festival already gone remotely does not block the local delete.
    pub fn delete_festival(&self, id: FestivalId, online: bool) -> DataModelResult<()> {
        let festival = self
            .festivals()
            .get_festival(id)?
            .ok_or(DataModelError::FestivalNotFound(id))?;

        if online {
            self.require_owner(&festival)?;
            if let Some(external_id) = festival.external_id {
                match self.remote.delete_festival(external_id) {
                    Ok(()) | Err(RemoteError::Rejected(RemoteRejection::InvalidFestivalId)) => {}
                    Err(err) => return Err(err.into()),
                }
            }
        }

        self.festivals().delete_festival(id)?;
        info!(
            "event=festival_delete module=service status=ok festival_id={} online={}",
            id, online
        );
        Ok(())
    }

    /// Votes for a published festival and stores the returned count locally.
    pub fn vote(&self, festival_id: FestivalId) -> DataModelResult<u32> {
        let festival = self
            .festivals()
            .get_festival(festival_id)?
            .ok_or(DataModelError::FestivalNotFound(festival_id))?;
        let external_id = festival
            .external_id
            .ok_or(DataModelError::FestivalNotPublished(festival_id))?;

        let votes = self.remote.vote(external_id)?;
        let patch = FestivalPatch {
            votes: Some(votes),
            ..FestivalPatch::default()
        };
        self.festivals().update_festival(festival_id, &patch)?;
        Ok(votes)
    }

    /// Copies a remote festival and its concerts into the internal database.
    ///
    /// Returns the local id, or `None` when the service does not know the festival.
    pub fn save_online_festival(
        &self,
        external_id: ExternalId,
    ) -> DataModelResult<Option<FestivalId>> {
        let Some(remote) = self.remote.read_festival(external_id)? else {
            return Ok(None);
        };

        let now = now_epoch_ms();
        let incoming = remote.to_festival(now);
        let repo = self.festivals();
        let mut report = SyncReport::default();
        let festival = match repo.get_festival_by_external_id(external_id)? {
            Some(mut local) => {
                let id = local.id.unwrap_or_default();
                let patch = festival_patch(&local, &incoming).with_last_synchronised(now);
                repo.update_festival(id, &patch)?;
                patch.apply_to(&mut local);
                local
            }
            None => {
                let id = repo.create_festival(&incoming)?;
                Festival {
                    id: Some(id),
                    ..incoming
                }
            }
        };

        self.synchronise_concerts(&festival, external_id, false, now, &mut report)?;
        let id = festival.id.unwrap_or_default();
        info!(
            "event=festival_save_online module=service status=ok festival_id={} concerts_created={}",
            id, report.concerts.created_locally
        );
        Ok(Some(id))
    }

    // Concerts

    /// Reads a concert of `festival_id`, optionally refreshing it remotely.
    ///
    /// Returns `None` when the concert is missing or belongs to another festival.
    pub fn read_concert_info(
        &self,
        festival_id: FestivalId,
        concert_id: ConcertId,
        update: bool,
    ) -> DataModelResult<Option<Concert>> {
        let Some(mut concert) = self.concerts().get_concert(concert_id)? else {
            return Ok(None);
        };
        if concert.festival_id != festival_id {
            return Ok(None);
        }
        if !update {
            return Ok(Some(concert));
        }
        let Some(external_id) = concert.external_id else {
            return Ok(Some(concert));
        };
        let Some(remote) = self.remote.read_concert(external_id)? else {
            return Ok(Some(concert));
        };

        let now = now_epoch_ms();
        let patch = pull_concert_patch(&concert, &remote.to_concert(festival_id, now), now);
        self.concerts().update_concert(concert_id, &patch)?;
        patch.apply_to(&mut concert);
        Ok(Some(concert))
    }

    /// Saves a concert; with `online`, writes it remotely first.
    ///
    /// Offline saves need no login; online saves need the festival owner and
    /// a published festival.
    pub fn write_concert_info(&self, concert: &Concert, online: bool) -> DataModelResult<ConcertId> {
        let festival = self
            .festivals()
            .get_festival(concert.festival_id)?
            .ok_or(DataModelError::FestivalNotFound(concert.festival_id))?;
        concert.validate()?;

        let now = now_epoch_ms();
        let mut record = concert.clone();
        if online {
            self.require_owner(&festival)?;
            let festival_external_id = festival
                .external_id
                .ok_or(DataModelError::FestivalNotPublished(concert.festival_id))?;
            record.external_id = self.push_concert(festival_external_id, &record, now)?;
        }

        let repo = self.concerts();
        let existing = match record.id {
            Some(id) => repo.get_concert(id)?,
            None => None,
        };
        let id = match existing {
            Some(existing) => {
                let id = record.id.unwrap_or_default();
                let mut patch = concert_patch(&existing, &record);
                if !patch.is_empty() {
                    patch.last_modified_ms = Some(now);
                }
                if online {
                    patch.last_synchronised_ms = Some(now);
                }
                repo.update_concert(id, &patch)?;
                id
            }
            None => {
                record.last_modified_ms = now;
                if online {
                    record.last_synchronised_ms = now;
                }
                repo.create_concert(&record)?
            }
        };

        info!(
            "event=concert_write module=service status=ok concert_id={} festival_id={} online={}",
            id, record.festival_id, online
        );
        Ok(id)
    }

    fn push_concert(
        &self,
        festival_external_id: ExternalId,
        concert: &Concert,
        now: i64,
    ) -> DataModelResult<Option<ExternalId>> {
        let remote = match concert.external_id {
            Some(external_id) => self.remote.read_concert(external_id)?,
            None => None,
        };
        match remote {
            Some(remote) => {
                let patch = concert_patch(&remote.to_concert(concert.festival_id, now), concert)
                    .remote_fields();
                if !patch.is_empty() {
                    self.remote.update_concert(remote.id, &patch)?;
                }
                Ok(Some(remote.id))
            }
            None => {
                let external_id = self.remote.write_concert(festival_external_id, concert)?;
                Ok(external_id.or(concert.external_id))
            }
        }
    }

    /// Deletes a concert; with `online`, remotely first.
    pub fn delete_concert(&self, id: ConcertId, online: bool) -> DataModelResult<()> {
        let concert = self
            .concerts()
            .get_concert(id)?
            .ok_or(DataModelError::ConcertNotFound(id))?;

        if online {
            let festival = self
                .festivals()
                .get_festival(concert.festival_id)?
                .ok_or(DataModelError::FestivalNotFound(concert.festival_id))?;
            self.require_owner(&festival)?;
            if let Some(external_id) = concert.external_id {
                match self.remote.delete_concert(external_id) {
                    Ok(()) | Err(RemoteError::Rejected(RemoteRejection::ConcertNotFound)) => {}
                    Err(err) => return Err(err.into()),
                }
            }
        }

        self.concerts().delete_concert(id)?;
        info!(
            "event=concert_delete module=service status=ok concert_id={} online={}",
            id, online
        );
        Ok(())
    }

    // Synchronisation

    /// Reconciles every local festival and its concerts with the external service.
    ///
    /// # Errors
    /// - Transport, permission and rejection errors abort the run; work
    ///   already done stays committed.
    ///
    /// A local-only festival that cannot be pushed is skipped and reported, as
    /// is one whose external id stays unknown after publishing. A festival
    /// republished under a new id has its concerts unlinked and pushed again.
    pub fn synchronise(&self, write_to_online: bool) -> DataModelResult<SyncReport> {
        let started_at = Instant::now();
        info!(
            "event=sync_run module=sync status=start write_to_online={}",
            write_to_online
        );

        let mut report = SyncReport::default();
        let result = self.synchronise_all(write_to_online, &mut report);
        match &result {
            Ok(()) => info!(
                "event=sync_run module=sync status=ok duration_ms={} festivals_pulled={} festivals_pushed={} festivals_skipped={} concerts_pulled={} concerts_pushed={}",
                started_at.elapsed().as_millis(),
                report.festivals.pulled,
                report.festivals.pushed,
                report.festivals.skipped,
                report.concerts.pulled,
                report.concerts.pushed
            ),
            Err(err) => warn!(
                "event=sync_run module=sync status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result.map(|()| report)
    }

    fn synchronise_all(&self, write_to_online: bool, report: &mut SyncReport) -> DataModelResult<()> {
        for festival in self.festivals().list_festivals()? {
            let now = now_epoch_ms();
            let Some(festival) = self.synchronise_festival(festival, write_to_online, now, report)?
            else {
                continue;
            };
            if let Some(external_id) = festival.external_id {
                self.synchronise_concerts(&festival, external_id, write_to_online, now, report)?;
            }
        }
        Ok(())
    }

    /// Returns the reconciled festival, or `None` when it was skipped.
    fn synchronise_festival(
        &self,
        mut local: Festival,
        write_to_online: bool,
        now: i64,
        report: &mut SyncReport,
    ) -> DataModelResult<Option<Festival>> {
        let Some(id) = local.id else {
            return Ok(None);
        };
        let username = self.username.as_deref();
        let repo = self.festivals();

        if local.awaits_external_id() {
            let Some(external_id) = self.find_published_id(&local)? else {
                skip_festival(report, &local, id, SkipReason::UnresolvedExternalId);
                return Ok(None);
            };
            let patch = FestivalPatch {
                external_id: Some(external_id),
                ..FestivalPatch::default()
            };
            repo.update_festival(id, &patch)?;
            patch.apply_to(&mut local);
        }

        let remote = match local.external_id {
            Some(external_id) => self.remote.read_festival(external_id)?,
            None => None,
        };

        let Some(remote) = remote else {
            if let Some(reason) = SkipReason::for_push(&local.owner, username, write_to_online) {
                skip_festival(report, &local, id, reason);
                return Ok(None);
            }

            let previous = local.external_id;
            let external_id = self.publish_festival(&local)?;
            let patch = FestivalPatch {
                external_id,
                ..FestivalPatch::default()
            }
            .with_last_synchronised(now);
            repo.update_festival(id, &patch)?;
            patch.apply_to(&mut local);
            self.relink_published(id, previous, external_id)?;
            local.external_id = external_id;
            if external_id.is_none() {
                skip_festival(report, &local, id, SkipReason::UnresolvedExternalId);
                return Ok(None);
            }
            report.festivals.created_remotely += 1;
            info!(
                "event=sync_festival module=sync status=ok festival_id={} direction=publish",
                id
            );
            return Ok(Some(local));
        };

        let incoming = remote.to_festival(now);
        if local.sync_eq(&incoming) {
            let patch = FestivalPatch::default().with_last_synchronised(now);
            repo.update_festival(id, &patch)?;
            patch.apply_to(&mut local);
            report.festivals.unchanged += 1;
            return Ok(Some(local));
        }

        let direction = decide_direction(&local.owner, username, write_to_online, &local);
        let patch = match direction {
            SyncDirection::Push => {
                let outgoing = festival_patch(&incoming, &local).remote_fields();
                if !outgoing.is_empty() {
                    self.remote.update_festival(remote.id, &outgoing)?;
                }
                report.festivals.pushed += 1;
                festival_patch(&local, &incoming).remote_authoritative_fields()
            }
            SyncDirection::Pull => {
                report.festivals.pulled += 1;
                festival_patch(&local, &incoming)
            }
        }
        .with_last_synchronised(now);
        repo.update_festival(id, &patch)?;
        patch.apply_to(&mut local);
        info!(
            "event=sync_festival module=sync status=ok festival_id={} direction={}",
            id,
            direction_name(direction)
        );
        Ok(Some(local))
    }

    fn synchronise_concerts(
        &self,
        festival: &Festival,
        festival_external_id: ExternalId,
        write_to_online: bool,
        now: i64,
        report: &mut SyncReport,
    ) -> DataModelResult<()> {
        let Some(festival_id) = festival.id else {
            return Ok(());
        };
        let Some(remote_concerts) = self.remote.read_festival_concerts(festival_external_id)?
        else {
            return Ok(());
        };
        let username = self.username.as_deref();
        let repo = self.concerts();

        for remote in &remote_concerts {
            let incoming = remote.to_concert(festival_id, now);
            let Some(local) = repo.get_concert_by_external_id(festival_id, remote.id)? else {
                match repo.create_concert(&incoming) {
                    Ok(_) => report.concerts.created_locally += 1,
                    Err(RepoError::Validation(err)) => {
                        skip_invalid_concert(report, festival_id, remote.id, &err)
                    }
                    Err(err) => return Err(err.into()),
                }
                continue;
            };
            let Some(local_id) = local.id else {
                continue;
            };

            if local.sync_eq(&incoming) {
                repo.update_concert(
                    local_id,
                    &ConcertPatch::default().with_last_synchronised(now),
                )?;
                report.concerts.unchanged += 1;
                continue;
            }

            let direction = decide_direction(&festival.owner, username, write_to_online, &local);
            let patch = match direction {
                SyncDirection::Push => {
                    let outgoing = concert_patch(&incoming, &local).remote_fields();
                    self.remote.update_concert(remote.id, &outgoing)?;
                    ConcertPatch::default().with_last_synchronised(now)
                }
                SyncDirection::Pull => pull_concert_patch(&local, &incoming, now),
            };
            match repo.update_concert(local_id, &patch) {
                Ok(()) => match direction {
                    SyncDirection::Push => report.concerts.pushed += 1,
                    SyncDirection::Pull => report.concerts.pulled += 1,
                },
                Err(RepoError::Validation(err)) => {
                    skip_invalid_concert(report, festival_id, remote.id, &err)
                }
                Err(err) => return Err(err.into()),
            }
        }

        if can_push(&festival.owner, username, write_to_online) {
            for local in repo.list_concerts(festival_id)? {
                let (Some(local_id), None) = (local.id, local.external_id) else {
                    continue;
                };
                let external_id = self.remote.write_concert(festival_external_id, &local)?;
                let patch = ConcertPatch {
                    external_id,
                    ..ConcertPatch::default()
                }
                .with_last_synchronised(now);
                repo.update_concert(local_id, &patch)?;
                report.concerts.created_remotely += 1;
            }
        }

        Ok(())
    }
}

fn skip_festival(
    report: &mut SyncReport,
    festival: &Festival,
    festival_id: FestivalId,
    reason: SkipReason,
) {
    info!(
        "event=sync_festival module=sync status=skipped festival_id={} reason={}",
        festival_id,
        reason.as_str()
    );
    report.festivals.skipped += 1;
    report.skipped.push(SkippedFestival {
        festival_id,
        external_id: festival.external_id,
        reason,
    });
}

fn skip_invalid_concert(
    report: &mut SyncReport,
    festival_id: FestivalId,
    external_id: ExternalId,
    err: &ModelValidationError,
) {
    warn!(
        "event=sync_concert module=sync status=skipped festival_id={} external_id={} error={}",
        festival_id, external_id, err
    );
    report.concerts.skipped += 1;
}

/// Remote-to-local patch that keeps the local `notify` preference.
fn pull_concert_patch(local: &Concert, incoming: &Concert, now: i64) -> ConcertPatch {
    let mut patch = concert_patch(local, incoming).with_last_synchronised(now);
    patch.notify = None;
    patch
}

fn direction_name(direction: SyncDirection) -> &'static str {
    match direction {
        SyncDirection::Push => "push",
        SyncDirection::Pull => "pull",
    }
}
