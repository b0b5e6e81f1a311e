use std::collections::HashSet;
use std::sync::Mutex;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigStore, GatewayConfig};
use crate::fallback::{bundled_events, bundled_locations, SnapshotStore};
use crate::models::{Event, Location};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid collection: {0}")]
    Invalid(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("server error: {0}")]
    Server(String),
    #[error("conflicting concurrent edit: {0}")]
    Conflict(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Which backing store serviced a read. Informational only; callers must not
/// branch on it beyond showing a warning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataSource {
    Remote,
    Snapshot,
    Bundled,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Remote => "remote",
            DataSource::Snapshot => "snapshot",
            DataSource::Bundled => "bundled",
        }
    }
}

#[derive(Debug)]
pub struct FetchOutcome<T> {
    pub items: Vec<T>,
    pub source: DataSource,
    pub revision: Option<u64>,
    /// Set when the read was serviced by a fallback; shown to the user as a
    /// soft, non-blocking notice.
    pub warning: Option<String>,
}

/// Read/write boundary to the JSON document store. Reads degrade softly to a
/// local fallback; writes replace the whole document and either succeed or
/// surface an error.
pub trait Gateway: Send + Sync {
    fn fetch_events(&self) -> FetchOutcome<Event>;
    fn save_events(
        &self,
        events: &[Event],
        expected_revision: Option<u64>,
    ) -> Result<(), GatewayError>;
    fn fetch_locations(&self) -> FetchOutcome<Location>;
    fn save_locations(
        &self,
        locations: &[Location],
        expected_revision: Option<u64>,
    ) -> Result<(), GatewayError>;
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct DocumentMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug)]
struct EventsDocument {
    events: Vec<Event>,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    meta: Option<DocumentMeta>,
    /// Optimistic concurrency token; omitted for plain last-write-wins saves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    revision: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug)]
struct LocationsDocument {
    locations: Vec<Location>,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    meta: Option<DocumentMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    revision: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    error: String,
    details: Option<String>,
}

/// Picks the most specific message the response offers: structured
/// error/details fields, else the raw body text, else the status code.
fn extract_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return match parsed.details {
            Some(details) if !details.trim().is_empty() => {
                format!("{}: {}", parsed.error, details)
            }
            _ => parsed.error,
        };
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    format!("HTTP {status}")
}

fn validate_events(events: &[Event]) -> Result<(), GatewayError> {
    let mut seen = HashSet::new();
    for event in events {
        if event.id.trim().is_empty() {
            return Err(GatewayError::Invalid("event without id".to_string()));
        }
        if !seen.insert(event.id.as_str()) {
            return Err(GatewayError::Invalid(format!(
                "duplicate event id {}",
                event.id
            )));
        }
        for (field, value) in [
            ("title", &event.title),
            ("location", &event.location),
            ("description", &event.description),
        ] {
            if value.trim().is_empty() {
                return Err(GatewayError::Invalid(format!(
                    "event {} is missing {field}",
                    event.id
                )));
            }
        }
        if event.parsed_date().is_none() {
            return Err(GatewayError::Invalid(format!(
                "event {} has unparseable date {:?}",
                event.id, event.date
            )));
        }
    }
    Ok(())
}

fn validate_locations(locations: &[Location]) -> Result<(), GatewayError> {
    let mut seen = HashSet::new();
    for location in locations {
        if location.id.trim().is_empty() {
            return Err(GatewayError::Invalid("location without id".to_string()));
        }
        if !seen.insert(location.id.as_str()) {
            return Err(GatewayError::Invalid(format!(
                "duplicate location id {}",
                location.id
            )));
        }
        if location.name.trim().is_empty() {
            return Err(GatewayError::Invalid(format!(
                "location {} is missing name",
                location.id
            )));
        }
        if location.periods.is_empty() {
            return Err(GatewayError::Invalid(format!(
                "location {} has no opening periods",
                location.id
            )));
        }
    }
    Ok(())
}

pub struct HttpGateway {
    config: GatewayConfig,
    client: Client,
    snapshots: SnapshotStore,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_snapshots(config, SnapshotStore::open_default())
    }

    /// Resolves the endpoint and timeout from the persisted app config,
    /// with environment overrides on top.
    pub fn from_config_store(store: &ConfigStore) -> Self {
        Self::new(GatewayConfig::from_app_config(&store.read()))
    }

    pub fn with_snapshots(config: GatewayConfig, snapshots: SnapshotStore) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent("AmrumData/0.1 (+https://www.amrum-urlaub.de)")
            .build()
            .expect("http client");
        Self {
            config,
            client,
            snapshots,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn get_document<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let url = self.endpoint(path);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| GatewayError::Http(format!("request failed for {url}: {err}")))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|err| GatewayError::Http(format!("unable to read body for {url}: {err}")))?;
        if !status.is_success() {
            return Err(GatewayError::Server(extract_error_message(status, &body)));
        }
        serde_json::from_str(&body).map_err(|err| GatewayError::Decode(err.to_string()))
    }

    fn post_document<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        expecting_revision: bool,
    ) -> Result<(), GatewayError> {
        let url = self.endpoint(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|err| GatewayError::Http(format!("request failed for {url}: {err}")))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().unwrap_or_default();
        let message = extract_error_message(status, &text);
        if status == StatusCode::CONFLICT && expecting_revision {
            Err(GatewayError::Conflict(message))
        } else {
            Err(GatewayError::Server(message))
        }
    }
}

impl Gateway for HttpGateway {
    fn fetch_events(&self) -> FetchOutcome<Event> {
        match self.get_document::<EventsDocument>("/api/events") {
            Ok(document) => {
                if let Err(err) = self.snapshots.write_events(&document.events) {
                    eprintln!("events snapshot refresh failed: {err}");
                }
                FetchOutcome {
                    items: document.events,
                    source: DataSource::Remote,
                    revision: document.meta.and_then(|meta| meta.revision),
                    warning: None,
                }
            }
            Err(err) => {
                let warning = format!("Veranstaltungen konnten nicht geladen werden ({err})");
                match self.snapshots.read_events() {
                    Some(events) => FetchOutcome {
                        items: events,
                        source: DataSource::Snapshot,
                        revision: None,
                        warning: Some(warning),
                    },
                    None => FetchOutcome {
                        items: bundled_events(),
                        source: DataSource::Bundled,
                        revision: None,
                        warning: Some(warning),
                    },
                }
            }
        }
    }

    fn save_events(
        &self,
        events: &[Event],
        expected_revision: Option<u64>,
    ) -> Result<(), GatewayError> {
        validate_events(events)?;
        let body = EventsDocument {
            events: events.to_vec(),
            meta: None,
            revision: expected_revision,
        };
        self.post_document("/api/events", &body, expected_revision.is_some())?;
        if let Err(err) = self.snapshots.write_events(events) {
            eprintln!("events snapshot refresh failed: {err}");
        }
        Ok(())
    }

    fn fetch_locations(&self) -> FetchOutcome<Location> {
        match self.get_document::<LocationsDocument>("/api/locations") {
            Ok(document) => {
                if let Err(err) = self.snapshots.write_locations(&document.locations) {
                    eprintln!("locations snapshot refresh failed: {err}");
                }
                FetchOutcome {
                    items: document.locations,
                    source: DataSource::Remote,
                    revision: document.meta.and_then(|meta| meta.revision),
                    warning: None,
                }
            }
            Err(err) => {
                let warning = format!("Öffnungszeiten konnten nicht geladen werden ({err})");
                match self.snapshots.read_locations() {
                    Some(locations) => FetchOutcome {
                        items: locations,
                        source: DataSource::Snapshot,
                        revision: None,
                        warning: Some(warning),
                    },
                    None => FetchOutcome {
                        items: bundled_locations(),
                        source: DataSource::Bundled,
                        revision: None,
                        warning: Some(warning),
                    },
                }
            }
        }
    }

    fn save_locations(
        &self,
        locations: &[Location],
        expected_revision: Option<u64>,
    ) -> Result<(), GatewayError> {
        validate_locations(locations)?;
        let body = LocationsDocument {
            locations: locations.to_vec(),
            meta: None,
            revision: expected_revision,
        };
        self.post_document("/api/locations", &body, expected_revision.is_some())?;
        if let Err(err) = self.snapshots.write_locations(locations) {
            eprintln!("locations snapshot refresh failed: {err}");
        }
        Ok(())
    }
}

/// In-memory implementation for tests and offline tooling. Follows the same
/// whole-document-overwrite contract, with an optional revision check.
#[derive(Default)]
pub struct MemoryGateway {
    events: Mutex<Vec<Event>>,
    locations: Mutex<Vec<Location>>,
    revision: Mutex<u64>,
    fail_next_save: Mutex<Option<String>>,
}

impl MemoryGateway {
    pub fn with_events(events: Vec<Event>) -> Self {
        Self {
            events: Mutex::new(events),
            ..Default::default()
        }
    }

    pub fn with_locations(locations: Vec<Location>) -> Self {
        Self {
            locations: Mutex::new(locations),
            ..Default::default()
        }
    }

    /// The next save fails with the given server message.
    pub fn fail_next_save(&self, message: &str) {
        *self.fail_next_save.lock().expect("gateway mutex poisoned") = Some(message.to_string());
    }

    fn take_failure(&self) -> Option<String> {
        self.fail_next_save
            .lock()
            .expect("gateway mutex poisoned")
            .take()
    }

    fn check_revision(&self, expected: Option<u64>) -> Result<(), GatewayError> {
        let current = *self.revision.lock().expect("gateway mutex poisoned");
        if let Some(expected) = expected {
            if expected != current {
                return Err(GatewayError::Conflict(format!(
                    "expected revision {expected}, store is at {current}"
                )));
            }
        }
        Ok(())
    }

    fn bump_revision(&self) {
        *self.revision.lock().expect("gateway mutex poisoned") += 1;
    }
}

impl Gateway for MemoryGateway {
    fn fetch_events(&self) -> FetchOutcome<Event> {
        FetchOutcome {
            items: self.events.lock().expect("gateway mutex poisoned").clone(),
            source: DataSource::Remote,
            revision: Some(*self.revision.lock().expect("gateway mutex poisoned")),
            warning: None,
        }
    }

    fn save_events(
        &self,
        events: &[Event],
        expected_revision: Option<u64>,
    ) -> Result<(), GatewayError> {
        validate_events(events)?;
        if let Some(message) = self.take_failure() {
            return Err(GatewayError::Server(message));
        }
        self.check_revision(expected_revision)?;
        *self.events.lock().expect("gateway mutex poisoned") = events.to_vec();
        self.bump_revision();
        Ok(())
    }

    fn fetch_locations(&self) -> FetchOutcome<Location> {
        FetchOutcome {
            items: self
                .locations
                .lock()
                .expect("gateway mutex poisoned")
                .clone(),
            source: DataSource::Remote,
            revision: Some(*self.revision.lock().expect("gateway mutex poisoned")),
            warning: None,
        }
    }

    fn save_locations(
        &self,
        locations: &[Location],
        expected_revision: Option<u64>,
    ) -> Result<(), GatewayError> {
        validate_locations(locations)?;
        if let Some(message) = self.take_failure() {
            return Err(GatewayError::Server(message));
        }
        self.check_revision(expected_revision)?;
        *self.locations.lock().expect("gateway mutex poisoned") = locations.to_vec();
        self.bump_revision();
        Ok(())
    }
}
