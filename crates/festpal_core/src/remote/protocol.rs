//! Wire protocol of the festival service: endpoints, form fields, sentinels.
//!
//! Requests are form-encoded POSTs; responses are either a plain-text
//! sentinel line or a JSON document. Everything here is pure so it can be
//! tested without a server.

use super::{
    LoginOutcome, RegisterOutcome, Registration, RegistrationField, RemoteError, RemoteRejection,
    RemoteResult,
};
use crate::model::concert::{Concert, ConcertPatch};
use crate::model::festival::{Festival, FestivalPatch};
use crate::model::ExternalId;

pub const PATH_LOGIN: &str = "login/";
pub const PATH_LOGOUT: &str = "logout/";
pub const PATH_REGISTER: &str = "register/";
pub const PATH_VOTE: &str = "v/";
pub const PATH_FESTIVALS: &str = "mult/fest/";
pub const PATH_FESTIVAL_CONCERTS: &str = "mult/conc/";
pub const PATH_READ_FESTIVAL: &str = "r/fest/";
pub const PATH_WRITE_FESTIVAL: &str = "w/fest/";
pub const PATH_UPDATE_FESTIVAL: &str = "u/fest/";
pub const PATH_DELETE_FESTIVAL: &str = "d/fest/";
pub const PATH_READ_CONCERT: &str = "r/conc/";
pub const PATH_WRITE_CONCERT: &str = "w/conc/";
pub const PATH_UPDATE_CONCERT: &str = "u/conc/";
pub const PATH_DELETE_CONCERT: &str = "d/conc/";

pub const PARAM_CLIENT: &str = "client";

const RESPONSE_OK: &str = "OK";
const RESPONSE_LOGGED_OUT: &str = "Logged out";
const RESPONSE_NO_CLIENT_NAME: &str = "Client name not provided";
const RESPONSE_PERMISSION_NOT_GRANTED: &str = "Permission not granted";
const RESPONSE_INVALID_FESTIVAL_ID: &str = "Invalid Festival ID";
const RESPONSE_CONCERT_NOT_FOUND: &str = "Concert Not Found";
const RESPONSE_INCORRECT_INPUT: &str = "Incorrect input";
const RESPONSE_NAME_EXISTS: &str = "Name exists";
const RESPONSE_ARTIST_EXISTS: &str = "Artist exists";

const LOGIN_DISABLED: &str = "Disabled account";
const LOGIN_INVALID: &str = "Invalid login";
const LOGIN_NO_PASSWORD: &str = "No password";
const LOGIN_NO_USERNAME: &str = "No username";

const REGISTER_MISSING_FIELDS: &str = "Missing fields";

/// Ordered form fields for one request.
pub type Form = Vec<(&'static str, String)>;

/// Strips trailing line terminators the service appends to every body.
pub fn normalize_body(body: &str) -> &str {
    body.trim_end_matches(['\n', '\r'])
}

/// Fails with `PermissionDenied` when the body is a client permission sentinel.
pub fn check_client_permission(body: &str) -> RemoteResult<()> {
    match normalize_body(body) {
        reason @ (RESPONSE_NO_CLIENT_NAME | RESPONSE_PERMISSION_NOT_GRANTED) => {
            Err(RemoteError::PermissionDenied(reason.to_string()))
        }
        _ => Ok(()),
    }
}

pub fn rejection(body: &str) -> Option<RemoteRejection> {
    match normalize_body(body) {
        RESPONSE_INVALID_FESTIVAL_ID => Some(RemoteRejection::InvalidFestivalId),
        RESPONSE_CONCERT_NOT_FOUND => Some(RemoteRejection::ConcertNotFound),
        RESPONSE_INCORRECT_INPUT => Some(RemoteRejection::IncorrectInput),
        RESPONSE_NAME_EXISTS => Some(RemoteRejection::NameExists),
        RESPONSE_ARTIST_EXISTS => Some(RemoteRejection::ArtistExists),
        _ => None,
    }
}

/// Whether the body means "no such record" on a read path.
pub fn is_not_found(body: &str) -> bool {
    matches!(
        rejection(body),
        Some(RemoteRejection::InvalidFestivalId | RemoteRejection::ConcertNotFound)
    )
}

/// Parses a write acknowledgement: `OK`, optionally followed by the new id line.
pub fn parse_write_ack(body: &str) -> RemoteResult<Option<ExternalId>> {
    let normalized = normalize_body(body);
    let mut lines = normalized.lines();
    match lines.next().map(str::trim) {
        Some(RESPONSE_OK) => {}
        _ => return Err(unexpected_or_rejected(normalized)),
    }
    match lines.next().map(str::trim) {
        None | Some("") => Ok(None),
        Some(id) => id
            .parse::<ExternalId>()
            .map(Some)
            .map_err(|_| RemoteError::UnexpectedResponse(normalized.to_string())),
    }
}

/// Parses an acknowledgement without payload (update/delete).
pub fn parse_ok(body: &str) -> RemoteResult<()> {
    parse_write_ack(body).map(|_| ())
}

pub fn parse_vote(body: &str) -> RemoteResult<u32> {
    let normalized = normalize_body(body).trim();
    normalized
        .parse::<u32>()
        .map_err(|_| unexpected_or_rejected(normalized))
}

pub fn parse_logout(body: &str) -> bool {
    normalize_body(body) == RESPONSE_LOGGED_OUT
}

pub fn parse_login(body: &str) -> RemoteResult<LoginOutcome> {
    match normalize_body(body) {
        RESPONSE_OK => Ok(LoginOutcome::LoggedIn),
        LOGIN_INVALID => Ok(LoginOutcome::InvalidCredentials),
        LOGIN_NO_USERNAME => Ok(LoginOutcome::MissingUsername),
        LOGIN_NO_PASSWORD => Ok(LoginOutcome::MissingPassword),
        LOGIN_DISABLED => Ok(LoginOutcome::DisabledAccount),
        other => Err(RemoteError::UnexpectedResponse(other.to_string())),
    }
}

pub fn parse_register(body: &str) -> RemoteResult<RegisterOutcome> {
    use RegistrationField::*;

    let outcome = match normalize_body(body) {
        RESPONSE_OK => RegisterOutcome::Registered,
        REGISTER_MISSING_FIELDS => RegisterOutcome::MissingRequiredFields,
        "Invalid username" => RegisterOutcome::InvalidRequiredField(Username),
        "Invalid email" => RegisterOutcome::InvalidRequiredField(Email),
        "Invalid password" => RegisterOutcome::InvalidRequiredField(Password),
        "Invalid first name" => RegisterOutcome::InvalidOptionalField(FirstName),
        "Invalid last name" => RegisterOutcome::InvalidOptionalField(LastName),
        "Invalid country" => RegisterOutcome::InvalidOptionalField(Country),
        "Invalid city" => RegisterOutcome::InvalidOptionalField(City),
        other => return Err(RemoteError::UnexpectedResponse(other.to_string())),
    };
    Ok(outcome)
}

fn unexpected_or_rejected(normalized: &str) -> RemoteError {
    match rejection(normalized) {
        Some(reason) => RemoteError::Rejected(reason),
        None => RemoteError::UnexpectedResponse(normalized.to_string()),
    }
}

pub fn bool_param(value: bool) -> String {
    let text = if value { "true" } else { "false" };
    text.to_string()
}

pub fn login_form(username: &str, password: &str) -> Form {
    vec![
        ("username", username.to_string()),
        ("password", password.to_string()),
    ]
}

pub fn register_form(registration: &Registration) -> Form {
    let mut form = vec![
        ("username", registration.username.clone()),
        ("email", registration.email.clone()),
        ("password", registration.password.clone()),
    ];
    push_some(&mut form, "first_name", &registration.first_name);
    push_some(&mut form, "last_name", &registration.last_name);
    push_some(&mut form, "country", &registration.country);
    push_some(&mut form, "city", &registration.city);
    if registration.representative {
        form.push(("representative", "1".to_string()));
    }
    form
}

pub fn id_form(external_id: ExternalId) -> Form {
    vec![("id", external_id.to_string())]
}

pub fn festival_query_form(query: &super::FestivalQuery) -> Form {
    let mut form = vec![("num", query.limit.to_string())];
    if let Some(official) = query.official {
        form.push(("official", bool_param(official)));
    }
    push_some(&mut form, "name", &query.name);
    push_some(&mut form, "country", &query.country);
    push_some(&mut form, "city", &query.city);
    push_some(&mut form, "genre", &query.genre);
    push_some(&mut form, "min_price", &query.min_price);
    push_some(&mut form, "max_price", &query.max_price);
    push_some(&mut form, "artist", &query.artist);
    form
}

/// Full publish form; owner and votes are assigned by the service.
pub fn festival_write_form(festival: &Festival) -> Form {
    vec![
        ("name", festival.name.clone()),
        ("description", festival.description.clone()),
        ("country", festival.country.clone()),
        ("city", festival.city.clone()),
        ("address", festival.address.clone()),
        ("genre", festival.genre.clone()),
        ("prices", festival.prices.clone()),
        ("official", bool_param(festival.official)),
    ]
}

/// Update form carrying only the remote-editable fields set in `patch`.
pub fn festival_update_form(external_id: ExternalId, patch: &FestivalPatch) -> Form {
    let patch = patch.remote_fields();
    let mut form = id_form(external_id);
    push_some(&mut form, "name", &patch.name);
    push_some(&mut form, "description", &patch.description);
    push_some(&mut form, "country", &patch.country);
    push_some(&mut form, "city", &patch.city);
    push_some(&mut form, "address", &patch.address);
    push_some(&mut form, "genre", &patch.genre);
    push_some(&mut form, "prices", &patch.prices);
    if let Some(official) = patch.official {
        form.push(("official", bool_param(official)));
    }
    form
}

pub fn concert_write_form(festival_external_id: ExternalId, concert: &Concert) -> Form {
    vec![
        ("festival", festival_external_id.to_string()),
        ("artist", concert.artist.clone()),
        ("scene", concert.stage.to_string()),
        ("day", concert.day.to_string()),
        ("start", concert.start_ms.to_string()),
        ("end", concert.end_ms.to_string()),
    ]
}

pub fn concert_update_form(external_id: ExternalId, patch: &ConcertPatch) -> Form {
    let patch = patch.remote_fields();
    let mut form = id_form(external_id);
    push_some(&mut form, "artist", &patch.artist);
    if let Some(stage) = patch.stage {
        form.push(("scene", stage.to_string()));
    }
    if let Some(day) = patch.day {
        form.push(("day", day.to_string()));
    }
    if let Some(start) = patch.start_ms {
        form.push(("start", start.to_string()));
    }
    if let Some(end) = patch.end_ms {
        form.push(("end", end.to_string()));
    }
    form
}

fn push_some(form: &mut Form, key: &'static str, value: &Option<String>) {
    if let Some(value) = value {
        form.push((key, value.clone()));
    }
}
