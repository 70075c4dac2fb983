//! Blocking HTTP implementation of `RemoteStore`.
//!
//! # Responsibility
//! - POST form-encoded requests to `{base_url}{op}/{entity}/`.
//! - Keep the login session in a cookie store for the client's lifetime.
//!
//! # Invariants
//! - Every request carries `client=<client_name>`.
//! - Log lines carry the endpoint path and status only, never form values.

use super::protocol::{self, Form, PARAM_CLIENT};
use super::{
    ConnectivityStatus, FestivalQuery, LoginOutcome, RegisterOutcome, Registration, RemoteConcert,
    RemoteError, RemoteFestival, RemoteResult, RemoteStore,
};
use crate::config::RemoteConfig;
use crate::model::concert::{Concert, ConcertPatch};
use crate::model::festival::{Festival, FestivalPatch};
use crate::model::ExternalId;
use log::{debug, warn};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use url::Url;

/// `RemoteStore` over the festival service HTTP API.
pub struct HttpRemoteStore {
    client: Client,
    base_url: Url,
    client_name: String,
}

impl HttpRemoteStore {
    /// Builds a client from validated remote settings.
    ///
    /// A base URL without a trailing slash is treated as a directory.
    pub fn new(config: &RemoteConfig) -> RemoteResult<Self> {
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|err| RemoteError::InvalidBaseUrl(err.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(RemoteError::InvalidBaseUrl(format!(
                "unsupported scheme `{}`",
                base_url.scheme()
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .cookie_store(true)
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.read_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url,
            client_name: config.client_name.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn post(&self, path: &'static str, mut form: Form) -> RemoteResult<String> {
        let url = self
            .base_url
            .join(path)
            .map_err(|err| RemoteError::InvalidBaseUrl(err.to_string()))?;
        form.push((PARAM_CLIENT, self.client_name.clone()));

        let started_at = Instant::now();
        let response = match self.client.post(url).form(&form).send() {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    "event=remote_call module=remote status=error path={} duration_ms={} error_code=transport",
                    path,
                    started_at.elapsed().as_millis()
                );
                return Err(err.into());
            }
        };

        let status = response.status();
        let body = response.text()?;
        if let Err(err) = protocol::check_client_permission(&body) {
            warn!(
                "event=remote_call module=remote status=error path={} http_status={} error_code=permission_denied",
                path,
                status.as_u16()
            );
            return Err(err);
        }
        if !status.is_success() {
            warn!(
                "event=remote_call module=remote status=error path={} http_status={} error_code=http_status",
                path,
                status.as_u16()
            );
            return Err(RemoteError::Status(status.as_u16()));
        }

        debug!(
            "event=remote_call module=remote status=ok path={} http_status={} duration_ms={}",
            path,
            status.as_u16(),
            started_at.elapsed().as_millis()
        );
        Ok(body)
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> RemoteResult<T> {
    if let Some(reason) = protocol::rejection(body) {
        return Err(RemoteError::Rejected(reason));
    }
    Ok(serde_json::from_str(protocol::normalize_body(body))?)
}

impl RemoteStore for HttpRemoteStore {
    fn connectivity(&self) -> ConnectivityStatus {
        let status = match self.client.get(self.base_url.clone()).send() {
            Ok(response) if response.status().is_server_error() => {
                ConnectivityStatus::ServerUnavailable
            }
            Ok(_) => ConnectivityStatus::Reachable,
            Err(err) if err.is_timeout() => ConnectivityStatus::ServerUnavailable,
            Err(_) => ConnectivityStatus::Offline,
        };
        debug!("event=remote_connectivity module=remote status=ok result={status:?}");
        status
    }

    fn register(&self, registration: &Registration) -> RemoteResult<RegisterOutcome> {
        let body = self.post(protocol::PATH_REGISTER, protocol::register_form(registration))?;
        protocol::parse_register(&body)
    }

    fn login(&self, username: &str, password: &str) -> RemoteResult<LoginOutcome> {
        let body = self.post(
            protocol::PATH_LOGIN,
            protocol::login_form(username, password),
        )?;
        protocol::parse_login(&body)
    }

    fn logout(&self) -> RemoteResult<bool> {
        let body = self.post(protocol::PATH_LOGOUT, Form::new())?;
        Ok(protocol::parse_logout(&body))
    }

    fn read_festivals(&self, query: &FestivalQuery) -> RemoteResult<Vec<RemoteFestival>> {
        let body = self.post(
            protocol::PATH_FESTIVALS,
            protocol::festival_query_form(query),
        )?;
        decode(&body)
    }

    fn read_festival(&self, external_id: ExternalId) -> RemoteResult<Option<RemoteFestival>> {
        let body = self.post(
            protocol::PATH_READ_FESTIVAL,
            protocol::id_form(external_id),
        )?;
        if protocol::is_not_found(&body) {
            return Ok(None);
        }
        decode(&body).map(Some)
    }

    fn write_festival(&self, festival: &Festival) -> RemoteResult<Option<ExternalId>> {
        let body = self.post(
            protocol::PATH_WRITE_FESTIVAL,
            protocol::festival_write_form(festival),
        )?;
        protocol::parse_write_ack(&body)
    }

    fn update_festival(
        &self,
        external_id: ExternalId,
        patch: &FestivalPatch,
    ) -> RemoteResult<()> {
        let body = self.post(
            protocol::PATH_UPDATE_FESTIVAL,
            protocol::festival_update_form(external_id, patch),
        )?;
        protocol::parse_ok(&body)
    }

    fn delete_festival(&self, external_id: ExternalId) -> RemoteResult<()> {
        let body = self.post(
            protocol::PATH_DELETE_FESTIVAL,
            protocol::id_form(external_id),
        )?;
        protocol::parse_ok(&body)
    }

    fn vote(&self, external_id: ExternalId) -> RemoteResult<u32> {
        let body = self.post(protocol::PATH_VOTE, protocol::id_form(external_id))?;
        protocol::parse_vote(&body)
    }

    fn read_festival_concerts(
        &self,
        festival_external_id: ExternalId,
    ) -> RemoteResult<Option<Vec<RemoteConcert>>> {
        let body = self.post(
            protocol::PATH_FESTIVAL_CONCERTS,
            protocol::id_form(festival_external_id),
        )?;
        if protocol::is_not_found(&body) {
            return Ok(None);
        }
        decode(&body).map(Some)
    }

    fn read_concert(&self, external_id: ExternalId) -> RemoteResult<Option<RemoteConcert>> {
        let body = self.post(protocol::PATH_READ_CONCERT, protocol::id_form(external_id))?;
        if protocol::is_not_found(&body) {
            return Ok(None);
        }
        decode(&body).map(Some)
    }

    fn write_concert(
        &self,
        festival_external_id: ExternalId,
        concert: &Concert,
    ) -> RemoteResult<Option<ExternalId>> {
        let body = self.post(
            protocol::PATH_WRITE_CONCERT,
            protocol::concert_write_form(festival_external_id, concert),
        )?;
        protocol::parse_write_ack(&body)
    }

    fn update_concert(&self, external_id: ExternalId, patch: &ConcertPatch) -> RemoteResult<()> {
        let body = self.post(
            protocol::PATH_UPDATE_CONCERT,
            protocol::concert_update_form(external_id, patch),
        )?;
        protocol::parse_ok(&body)
    }

    fn delete_concert(&self, external_id: ExternalId) -> RemoteResult<()> {
        let body = self.post(
            protocol::PATH_DELETE_CONCERT,
            protocol::id_form(external_id),
        )?;
        protocol::parse_ok(&body)
    }
}
