//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Own the process-wide `DataModel` created by `configure`.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every data call fails with a message until `configure` succeeded.

use festpal_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, logging_status,
    open_db,
    ping as ping_inner, Concert, ConnectivityStatus, DataModel, Festival, FestivalQuery,
    FestpalConfig, HttpRemoteStore, LoginOutcome, RegisterOutcome, Registration, SyncReport,
};
use log::info;
use std::path::Path;
use std::sync::Mutex;

const ONLINE_DEFAULT_LIMIT: u32 = 20;
const ONLINE_LIMIT_MAX: u32 = 100;

static DATA_MODEL: Mutex<Option<DataModel<HttpRemoteStore>>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Festival record exchanged with Dart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FestivalItem {
    /// Local id; `None` for festivals not stored locally.
    pub id: Option<i64>,
    /// Id on the festival service; `None` until published.
    pub external_id: Option<i64>,
    pub name: String,
    pub description: String,
    pub country: String,
    pub city: String,
    pub address: String,
    pub genre: String,
    pub prices: String,
    pub owner: String,
    pub official: bool,
    pub votes: u32,
    pub last_modified_ms: i64,
    pub last_synchronised_ms: i64,
}

/// Concert record exchanged with Dart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcertItem {
    pub id: Option<i64>,
    pub external_id: Option<i64>,
    pub festival_id: i64,
    pub artist: String,
    pub stage: u32,
    pub day: u32,
    pub start_ms: i64,
    pub end_ms: i64,
    /// Local reminder flag; never sent to the service.
    pub notify: bool,
    pub last_modified_ms: i64,
    pub last_synchronised_ms: i64,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Affected local id, or the vote count for `festival_vote`.
    pub value: Option<i64>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, value: Option<i64>) -> Self {
        Self {
            ok: true,
            value,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            value: None,
            message: message.into(),
        }
    }

    fn from_result(result: Result<(String, Option<i64>), String>) -> Self {
        match result {
            Ok((message, value)) => Self::success(message, value),
            Err(message) => Self::failure(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FestivalListResponse {
    pub ok: bool,
    pub items: Vec<FestivalItem>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FestivalResponse {
    pub ok: bool,
    /// `None` when the festival is not stored locally.
    pub item: Option<FestivalItem>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcertListResponse {
    pub ok: bool,
    pub items: Vec<ConcertItem>,
    pub message: String,
}

/// Festival left out of a synchronisation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    pub festival_id: i64,
    pub external_id: Option<i64>,
    /// One of `online_writes_disabled|not_logged_in|not_owner|unresolved_external_id`.
    pub reason: String,
}

/// Synchronisation summary envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResponse {
    pub ok: bool,
    pub message: String,
    pub skipped: Vec<SkippedItem>,
    pub festivals_pulled: u32,
    pub festivals_pushed: u32,
    pub festivals_skipped: u32,
    pub concerts_pulled: u32,
    pub concerts_pushed: u32,
}

/// Opens the festival database under `data_dir` and connects the service client.
///
/// `config_toml` may be empty to use defaults. Unless `init_logging` ran
/// first, logging starts at `[logging].level` under `<data_dir>/logs`. A
/// later call replaces the current data model and logs the session out.
///
/// # FFI contract
/// - Sync call; opens and migrates the SQLite file.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn configure(data_dir: String, config_toml: String) -> ActionResponse {
    let data_dir = data_dir.trim();
    if data_dir.is_empty() {
        return ActionResponse::failure("configure failed: data_dir must not be empty");
    }
    let config = match FestpalConfig::from_toml_str(&config_toml) {
        Ok(config) => config,
        Err(err) => return ActionResponse::failure(format!("configure failed: {err}")),
    };
    if logging_status().is_none() {
        let (level, log_dir) = log_settings(data_dir, &config);
        if let Err(err) = init_logging_inner(&level, &log_dir) {
            return ActionResponse::failure(format!("configure failed: {err}"));
        }
    }
    let model = match build_data_model(data_dir, &config) {
        Ok(model) => model,
        Err(err) => return ActionResponse::failure(format!("configure failed: {err}")),
    };
    match DATA_MODEL.lock() {
        Ok(mut guard) => {
            *guard = Some(model);
            info!("event=ffi_configure module=ffi status=ok");
            ActionResponse::success("Configured.", None)
        }
        Err(_) => ActionResponse::failure("configure failed: data model lock poisoned"),
    }
}

/// Lists festivals stored locally.
#[flutter_rust_bridge::frb(sync)]
pub fn festivals_list() -> FestivalListResponse {
    festival_list_response(
        "festivals_list",
        with_data_model(|model| model.offline_festivals().map_err(|err| err.to_string())),
    )
}

/// Lists festivals from the service, optionally filtered by name.
///
/// `limit` defaults to 20 and is capped at 100.
#[flutter_rust_bridge::frb(sync)]
pub fn festivals_online(limit: Option<u32>, name: Option<String>) -> FestivalListResponse {
    let mut query = FestivalQuery::top(normalize_online_limit(limit));
    query.name = name
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    festival_list_response(
        "festivals_online",
        with_data_model(|model| model.online_festivals(&query).map_err(|err| err.to_string())),
    )
}

/// Reads one local festival; `update` refreshes it from the service first.
#[flutter_rust_bridge::frb(sync)]
pub fn festival_get(id: i64, update: bool) -> FestivalResponse {
    match with_data_model(|model| {
        model
            .read_festival_info(id, update)
            .map_err(|err| err.to_string())
    }) {
        Ok(Some(festival)) => FestivalResponse {
            ok: true,
            item: Some(to_festival_item(festival)),
            message: "Festival found.".to_string(),
        },
        Ok(None) => FestivalResponse {
            ok: true,
            item: None,
            message: "Festival not found.".to_string(),
        },
        Err(err) => FestivalResponse {
            ok: false,
            item: None,
            message: format!("festival_get failed: {err}"),
        },
    }
}

/// Saves a festival owned by the session user.
#[flutter_rust_bridge::frb(sync)]
pub fn festival_save(item: FestivalItem, online: bool) -> ActionResponse {
    let festival = from_festival_item(item);
    ActionResponse::from_result(with_data_model(|model| {
        model
            .write_festival_info(&festival, online)
            .map(|id| ("Festival saved.".to_string(), Some(id)))
            .map_err(|err| format!("festival_save failed: {err}"))
    }))
}

/// Deletes a festival and its concerts.
#[flutter_rust_bridge::frb(sync)]
pub fn festival_delete(id: i64, online: bool) -> ActionResponse {
    ActionResponse::from_result(with_data_model(|model| {
        model
            .delete_festival(id, online)
            .map(|()| ("Festival deleted.".to_string(), Some(id)))
            .map_err(|err| format!("festival_delete failed: {err}"))
    }))
}

/// Votes for a published festival; `value` carries the new vote count.
#[flutter_rust_bridge::frb(sync)]
pub fn festival_vote(id: i64) -> ActionResponse {
    ActionResponse::from_result(with_data_model(|model| {
        model
            .vote(id)
            .map(|votes| ("Vote counted.".to_string(), Some(i64::from(votes))))
            .map_err(|err| format!("festival_vote failed: {err}"))
    }))
}

/// Stores a service festival and its concerts locally.
#[flutter_rust_bridge::frb(sync)]
pub fn festival_save_online(external_id: i64) -> ActionResponse {
    ActionResponse::from_result(with_data_model(|model| {
        match model.save_online_festival(external_id) {
            Ok(Some(id)) => Ok(("Festival stored.".to_string(), Some(id))),
            Ok(None) => Err(format!(
                "festival_save_online failed: festival {external_id} not found online"
            )),
            Err(err) => Err(format!("festival_save_online failed: {err}")),
        }
    }))
}

/// Lists the local concerts of a festival by day and start time.
#[flutter_rust_bridge::frb(sync)]
pub fn concerts_list(festival_id: i64) -> ConcertListResponse {
    match with_data_model(|model| {
        model
            .concerts_for(festival_id)
            .map_err(|err| err.to_string())
    }) {
        Ok(concerts) => {
            let items = concerts.into_iter().map(to_concert_item).collect::<Vec<_>>();
            let message = format!("Found {} concert(s).", items.len());
            ConcertListResponse {
                ok: true,
                items,
                message,
            }
        }
        Err(err) => ConcertListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("concerts_list failed: {err}"),
        },
    }
}

/// Saves a concert; `online` also writes it to the service.
#[flutter_rust_bridge::frb(sync)]
pub fn concert_save(item: ConcertItem, online: bool) -> ActionResponse {
    let concert = from_concert_item(item);
    ActionResponse::from_result(with_data_model(|model| {
        model
            .write_concert_info(&concert, online)
            .map(|id| ("Concert saved.".to_string(), Some(id)))
            .map_err(|err| format!("concert_save failed: {err}"))
    }))
}

#[flutter_rust_bridge::frb(sync)]
pub fn concert_delete(id: i64, online: bool) -> ActionResponse {
    ActionResponse::from_result(with_data_model(|model| {
        model
            .delete_concert(id, online)
            .map(|()| ("Concert deleted.".to_string(), Some(id)))
            .map_err(|err| format!("concert_delete failed: {err}"))
    }))
}

/// Creates a service account. Blank optional fields are omitted.
#[flutter_rust_bridge::frb(sync)]
#[allow(clippy::too_many_arguments)]
pub fn session_register(
    username: String,
    email: String,
    password: String,
    first_name: Option<String>,
    last_name: Option<String>,
    country: Option<String>,
    city: Option<String>,
    representative: bool,
) -> ActionResponse {
    let registration = Registration {
        username: username.trim().to_string(),
        email: email.trim().to_string(),
        password,
        first_name: non_blank(first_name),
        last_name: non_blank(last_name),
        country: non_blank(country),
        city: non_blank(city),
        representative,
    };
    ActionResponse::from_result(with_data_model(|model| {
        match model.register(&registration) {
            Ok(RegisterOutcome::Registered) => Ok(("Registered.".to_string(), None)),
            Ok(outcome) => Err(format!("session_register rejected: {outcome:?}")),
            Err(err) => Err(format!("session_register failed: {err}")),
        }
    }))
}

#[flutter_rust_bridge::frb(sync)]
pub fn session_login(username: String, password: String) -> ActionResponse {
    ActionResponse::from_result(with_data_model(|model| {
        match model.login(username.trim(), &password) {
            Ok(LoginOutcome::LoggedIn) => Ok(("Logged in.".to_string(), None)),
            Ok(outcome) => Err(format!("session_login rejected: {outcome:?}")),
            Err(err) => Err(format!("session_login failed: {err}")),
        }
    }))
}

#[flutter_rust_bridge::frb(sync)]
pub fn session_logout() -> ActionResponse {
    ActionResponse::from_result(with_data_model(|model| match model.logout() {
        Ok(true) => Ok(("Logged out.".to_string(), None)),
        Ok(false) => Err("session_logout rejected by service".to_string()),
        Err(err) => Err(format!("session_logout failed: {err}")),
    }))
}

/// Current session username, empty when logged out or not configured.
#[flutter_rust_bridge::frb(sync)]
pub fn session_username() -> String {
    with_data_model(|model| Ok(model.username().unwrap_or_default().to_string()))
        .unwrap_or_default()
}

/// Reachability of the service: `reachable|server_unavailable|offline`.
#[flutter_rust_bridge::frb(sync)]
pub fn connectivity_status() -> String {
    match with_data_model(|model| Ok(model.connectivity())) {
        Ok(status) => connectivity_label(status).to_string(),
        Err(err) => err,
    }
}

/// Reconciles all local festivals with the service.
#[flutter_rust_bridge::frb(sync)]
pub fn sync_run(write_to_online: bool) -> SyncResponse {
    match with_data_model(|model| {
        model
            .synchronise(write_to_online)
            .map_err(|err| err.to_string())
    }) {
        Ok(report) => to_sync_response(&report),
        Err(err) => SyncResponse {
            ok: false,
            message: format!("sync_run failed: {err}"),
            skipped: Vec::new(),
            festivals_pulled: 0,
            festivals_pushed: 0,
            festivals_skipped: 0,
            concerts_pulled: 0,
            concerts_pushed: 0,
        },
    }
}

fn build_data_model(
    data_dir: &str,
    config: &FestpalConfig,
) -> Result<DataModel<HttpRemoteStore>, String> {
    if data_dir.is_empty() {
        return Err("data_dir must not be empty".to_string());
    }
    let remote = HttpRemoteStore::new(&config.remote).map_err(|err| err.to_string())?;
    let db_path = Path::new(data_dir).join(&config.storage.db_file_name);
    let conn = open_db(&db_path).map_err(|err| format!("DB open failed: {err}"))?;
    Ok(DataModel::new(conn, remote))
}

/// Level and directory used when `configure` starts logging.
fn log_settings(data_dir: &str, config: &FestpalConfig) -> (String, String) {
    let log_dir = Path::new(data_dir).join("logs");
    (
        config.logging.level.clone(),
        log_dir.to_string_lossy().into_owned(),
    )
}

fn with_data_model<T>(
    f: impl FnOnce(&mut DataModel<HttpRemoteStore>) -> Result<T, String>,
) -> Result<T, String> {
    let mut guard = DATA_MODEL
        .lock()
        .map_err(|_| "data model lock poisoned".to_string())?;
    let model = guard
        .as_mut()
        .ok_or_else(|| "not configured; call configure first".to_string())?;
    f(model)
}

fn festival_list_response(
    operation: &str,
    result: Result<Vec<Festival>, String>,
) -> FestivalListResponse {
    match result {
        Ok(festivals) => {
            let items = festivals
                .into_iter()
                .map(to_festival_item)
                .collect::<Vec<_>>();
            let message = if items.is_empty() {
                "No festivals.".to_string()
            } else {
                format!("Found {} festival(s).", items.len())
            };
            FestivalListResponse {
                ok: true,
                items,
                message,
            }
        }
        Err(err) => FestivalListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("{operation} failed: {err}"),
        },
    }
}

fn normalize_online_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => ONLINE_DEFAULT_LIMIT,
        Some(value) if value > ONLINE_LIMIT_MAX => ONLINE_LIMIT_MAX,
        Some(value) => value,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn connectivity_label(status: ConnectivityStatus) -> &'static str {
    match status {
        ConnectivityStatus::Reachable => "reachable",
        ConnectivityStatus::ServerUnavailable => "server_unavailable",
        ConnectivityStatus::Offline => "offline",
    }
}

fn to_sync_response(report: &SyncReport) -> SyncResponse {
    let skipped = report
        .skipped
        .iter()
        .map(|skipped| SkippedItem {
            festival_id: skipped.festival_id,
            external_id: skipped.external_id,
            reason: skipped.reason.as_str().to_string(),
        })
        .collect::<Vec<_>>();
    let message = if skipped.is_empty() {
        "Synchronised.".to_string()
    } else {
        format!("Synchronised; skipped {} festival(s).", skipped.len())
    };
    SyncResponse {
        ok: true,
        message,
        skipped,
        festivals_pulled: report.festivals.pulled,
        festivals_pushed: report.festivals.pushed + report.festivals.created_remotely,
        festivals_skipped: report.festivals.skipped,
        concerts_pulled: report.concerts.pulled + report.concerts.created_locally,
        concerts_pushed: report.concerts.pushed + report.concerts.created_remotely,
    }
}

fn to_festival_item(festival: Festival) -> FestivalItem {
    FestivalItem {
        id: festival.id,
        external_id: festival.external_id,
        name: festival.name,
        description: festival.description,
        country: festival.country,
        city: festival.city,
        address: festival.address,
        genre: festival.genre,
        prices: festival.prices,
        owner: festival.owner,
        official: festival.official,
        votes: festival.votes,
        last_modified_ms: festival.last_modified_ms,
        last_synchronised_ms: festival.last_synchronised_ms,
    }
}

fn from_festival_item(item: FestivalItem) -> Festival {
    Festival {
        id: item.id,
        external_id: item.external_id,
        name: item.name.trim().to_string(),
        description: item.description,
        country: item.country,
        city: item.city,
        address: item.address,
        genre: item.genre,
        prices: item.prices,
        owner: item.owner.trim().to_string(),
        official: item.official,
        votes: item.votes,
        last_modified_ms: item.last_modified_ms,
        last_synchronised_ms: item.last_synchronised_ms,
    }
}

fn to_concert_item(concert: Concert) -> ConcertItem {
    ConcertItem {
        id: concert.id,
        external_id: concert.external_id,
        festival_id: concert.festival_id,
        artist: concert.artist,
        stage: concert.stage,
        day: concert.day,
        start_ms: concert.start_ms,
        end_ms: concert.end_ms,
        notify: concert.notify,
        last_modified_ms: concert.last_modified_ms,
        last_synchronised_ms: concert.last_synchronised_ms,
    }
}

fn from_concert_item(item: ConcertItem) -> Concert {
    Concert {
        id: item.id,
        external_id: item.external_id,
        festival_id: item.festival_id,
        artist: item.artist.trim().to_string(),
        stage: item.stage,
        day: item.day,
        start_ms: item.start_ms,
        end_ms: item.end_ms,
        notify: item.notify,
        last_modified_ms: item.last_modified_ms,
        last_synchronised_ms: item.last_synchronised_ms,
    }
}
