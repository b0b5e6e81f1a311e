use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::utils::island_today;
use crate::gateway::{DataSource, Gateway, GatewayError};
use crate::models::{Event, Location, OpeningPeriod};

#[derive(Debug, Error)]
pub enum FormError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid date: {0:?}")]
    InvalidDate(String),
    #[error("entry not found: {0}")]
    NotFound(String),
    #[error("a save is already in progress")]
    SubmitInFlight,
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Clone, Debug, PartialEq)]
pub enum SubmitState {
    Idle,
    Submitting,
    Saved,
    Failed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum FormMode {
    Create,
    Edit { id: String },
}

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// "<prefix>-<millis>-<hash>", retried until it collides with nothing in the
/// collection.
fn generate_id(prefix: &str, taken: &[&str]) -> String {
    let millis = Utc::now().timestamp_millis();
    loop {
        let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut hasher = Sha256::new();
        hasher.update(millis.to_le_bytes());
        hasher.update(counter.to_le_bytes());
        let digest = format!("{:x}", hasher.finalize());
        let candidate = format!("{prefix}-{millis}-{}", &digest[..8]);
        if !taken.contains(&candidate.as_str()) {
            return candidate;
        }
    }
}

pub fn generate_event_id(existing: &[Event]) -> String {
    let taken: Vec<&str> = existing.iter().map(|event| event.id.as_str()).collect();
    generate_id("evt", &taken)
}

pub fn generate_location_id(existing: &[Location]) -> String {
    let taken: Vec<&str> = existing
        .iter()
        .map(|location| location.id.as_str())
        .collect();
    generate_id("loc", &taken)
}

fn none_if_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Edit lifecycle for a single event inside the wholesale-persisted
/// collection. Draft fields stay untouched on failure so the user can retry.
#[derive(Clone, Debug)]
pub struct EventForm {
    pub title: String,
    pub location: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub category: String,
    pub organizer: String,
    pub link: String,
    pub image: String,
    pub featured: bool,
    pub mode: FormMode,
    pub state: SubmitState,
    revision: Option<u64>,
}

impl EventForm {
    pub fn new_entry() -> Self {
        Self {
            title: String::new(),
            location: String::new(),
            description: String::new(),
            date: island_today().format("%Y-%m-%d").to_string(),
            time: String::new(),
            category: String::new(),
            organizer: String::new(),
            link: String::new(),
            image: String::new(),
            featured: false,
            mode: FormMode::Create,
            state: SubmitState::Idle,
            revision: None,
        }
    }

    /// Pre-fills from the stored entry; a missing id is an error, never a
    /// silent switch to create-mode.
    pub fn load_for_edit(gateway: &dyn Gateway, id: &str) -> Result<Self, FormError> {
        let outcome = gateway.fetch_events();
        let event = outcome
            .items
            .iter()
            .find(|event| event.id == id)
            .ok_or_else(|| FormError::NotFound(id.to_string()))?;

        Ok(Self {
            title: event.title.clone(),
            location: event.location.clone(),
            description: event.description.clone(),
            date: event.date.clone(),
            time: event.time.clone().unwrap_or_default(),
            category: event.category.clone().unwrap_or_default(),
            organizer: event.organizer.clone().unwrap_or_default(),
            link: event.link.clone().unwrap_or_default(),
            image: event.image.clone().unwrap_or_default(),
            featured: event.featured,
            mode: FormMode::Edit { id: id.to_string() },
            state: SubmitState::Idle,
            revision: outcome.revision,
        })
    }

    pub fn validate(&self) -> Result<(), FormError> {
        if self.title.trim().is_empty() {
            return Err(FormError::MissingField("title"));
        }
        if self.date.trim().is_empty() {
            return Err(FormError::MissingField("date"));
        }
        if chrono::NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").is_err() {
            return Err(FormError::InvalidDate(self.date.clone()));
        }
        if self.location.trim().is_empty() {
            return Err(FormError::MissingField("location"));
        }
        if self.description.trim().is_empty() {
            return Err(FormError::MissingField("description"));
        }
        Ok(())
    }

    fn build_event(&self, id: String) -> Event {
        Event {
            id,
            title: self.title.trim().to_string(),
            location: self.location.trim().to_string(),
            description: self.description.trim().to_string(),
            date: self.date.trim().to_string(),
            time: none_if_empty(&self.time),
            category: none_if_empty(&self.category),
            organizer: none_if_empty(&self.organizer),
            link: none_if_empty(&self.link),
            image: none_if_empty(&self.image),
            featured: self.featured,
        }
    }

    /// Builds the resulting full collection and writes it wholesale. Create
    /// resets the form on success; edit keeps it populated and flags `Saved`.
    pub fn submit(&mut self, gateway: &dyn Gateway) -> Result<(), FormError> {
        if self.state == SubmitState::Submitting {
            return Err(FormError::SubmitInFlight);
        }
        if let Err(err) = self.validate() {
            self.state = SubmitState::Failed(err.to_string());
            return Err(err);
        }
        self.state = SubmitState::Submitting;

        let outcome = gateway.fetch_events();
        if outcome.source != DataSource::Remote {
            let message = outcome
                .warning
                .unwrap_or_else(|| "store unreachable".to_string());
            self.state = SubmitState::Failed(message.clone());
            return Err(FormError::StoreUnavailable(message));
        }
        let mut events = outcome.items;

        match self.mode.clone() {
            FormMode::Edit { id } => {
                let slot = match events.iter_mut().find(|event| event.id == id) {
                    Some(slot) => slot,
                    None => {
                        self.state = SubmitState::Failed(format!("entry not found: {id}"));
                        return Err(FormError::NotFound(id));
                    }
                };
                *slot = self.build_event(id);
            }
            FormMode::Create => {
                let id = generate_event_id(&events);
                events.push(self.build_event(id));
            }
        }

        match gateway.save_events(&events, self.revision.or(outcome.revision)) {
            Ok(()) => {
                if self.mode == FormMode::Create {
                    *self = Self::new_entry();
                }
                // The load-time revision is spent; the next save checks
                // against a fresh fetch instead of conflicting with itself.
                self.revision = None;
                self.state = SubmitState::Saved;
                Ok(())
            }
            Err(err) => {
                self.state = SubmitState::Failed(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Clears the transient saved acknowledgment.
    pub fn acknowledge_saved(&mut self) {
        if self.state == SubmitState::Saved {
            self.state = SubmitState::Idle;
        }
    }
}

/// Same lifecycle for a location and its opening-hour rows.
#[derive(Clone, Debug)]
pub struct LocationForm {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub periods: Vec<OpeningPeriod>,
    pub mode: FormMode,
    pub state: SubmitState,
    revision: Option<u64>,
}

impl LocationForm {
    pub fn new_entry() -> Self {
        Self {
            name: String::new(),
            address: String::new(),
            phone: String::new(),
            email: String::new(),
            website: String::new(),
            periods: vec![OpeningPeriod::default()],
            mode: FormMode::Create,
            state: SubmitState::Idle,
            revision: None,
        }
    }

    pub fn load_for_edit(gateway: &dyn Gateway, id: &str) -> Result<Self, FormError> {
        let outcome = gateway.fetch_locations();
        let location = outcome
            .items
            .iter()
            .find(|location| location.id == id)
            .ok_or_else(|| FormError::NotFound(id.to_string()))?;

        Ok(Self {
            name: location.name.clone(),
            address: location.address.clone(),
            phone: location.phone.clone().unwrap_or_default(),
            email: location.email.clone().unwrap_or_default(),
            website: location.website.clone().unwrap_or_default(),
            periods: location.periods.clone(),
            mode: FormMode::Edit { id: id.to_string() },
            state: SubmitState::Idle,
            revision: outcome.revision,
        })
    }

    pub fn validate(&self) -> Result<(), FormError> {
        if self.name.trim().is_empty() {
            return Err(FormError::MissingField("name"));
        }
        if self.periods.is_empty() {
            return Err(FormError::MissingField("periods"));
        }
        Ok(())
    }

    fn build_location(&self, id: String) -> Location {
        Location {
            id,
            name: self.name.trim().to_string(),
            address: self.address.trim().to_string(),
            phone: none_if_empty(&self.phone),
            email: none_if_empty(&self.email),
            website: none_if_empty(&self.website),
            periods: self.periods.clone(),
        }
    }

    pub fn submit(&mut self, gateway: &dyn Gateway) -> Result<(), FormError> {
        if self.state == SubmitState::Submitting {
            return Err(FormError::SubmitInFlight);
        }
        if let Err(err) = self.validate() {
            self.state = SubmitState::Failed(err.to_string());
            return Err(err);
        }
        self.state = SubmitState::Submitting;

        let outcome = gateway.fetch_locations();
        if outcome.source != DataSource::Remote {
            let message = outcome
                .warning
                .unwrap_or_else(|| "store unreachable".to_string());
            self.state = SubmitState::Failed(message.clone());
            return Err(FormError::StoreUnavailable(message));
        }
        let mut locations = outcome.items;

        match self.mode.clone() {
            FormMode::Edit { id } => {
                let slot = match locations.iter_mut().find(|location| location.id == id) {
                    Some(slot) => slot,
                    None => {
                        self.state = SubmitState::Failed(format!("entry not found: {id}"));
                        return Err(FormError::NotFound(id));
                    }
                };
                *slot = self.build_location(id);
            }
            FormMode::Create => {
                let id = generate_location_id(&locations);
                locations.push(self.build_location(id));
            }
        }

        match gateway.save_locations(&locations, self.revision.or(outcome.revision)) {
            Ok(()) => {
                if self.mode == FormMode::Create {
                    *self = Self::new_entry();
                }
                self.revision = None;
                self.state = SubmitState::Saved;
                Ok(())
            }
            Err(err) => {
                self.state = SubmitState::Failed(err.to_string());
                Err(err.into())
            }
        }
    }

    pub fn acknowledge_saved(&mut self) {
        if self.state == SubmitState::Saved {
            self.state = SubmitState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;

    fn seeded_gateway() -> MemoryGateway {
        MemoryGateway::with_events(vec![
            Event {
                id: "evt-1".to_string(),
                title: "Wattwanderung".to_string(),
                location: "Norddorf".to_string(),
                description: "Durchs Watt.".to_string(),
                date: "2025-08-18".to_string(),
                category: Some("Natur".to_string()),
                ..Default::default()
            },
            Event {
                id: "evt-2".to_string(),
                title: "Hafenfest".to_string(),
                location: "Wittdün".to_string(),
                description: "Fest am Hafen.".to_string(),
                date: "2025-07-12".to_string(),
                ..Default::default()
            },
        ])
    }

    #[test]
    fn create_appends_with_generated_id_and_resets_form() {
        let gateway = seeded_gateway();
        let mut form = EventForm::new_entry();
        form.title = "Dünensingen".to_string();
        form.location = "Nebel".to_string();
        form.description = "Offenes Singen in den Dünen.".to_string();
        form.date = "2025-09-01".to_string();
        form.time = "19:30".to_string();

        form.submit(&gateway).expect("create succeeds");
        assert_eq!(form.state, SubmitState::Saved);
        // Form cleared for the next entry.
        assert!(form.title.is_empty());

        let stored = gateway.fetch_events().items;
        assert_eq!(stored.len(), 3);
        let created = &stored[2];
        assert!(created.id.starts_with("evt-"));
        assert_ne!(created.id, "evt-1");
        assert_ne!(created.id, "evt-2");
        assert_eq!(created.title, "Dünensingen");
        assert_eq!(created.time.as_deref(), Some("19:30"));
        assert_eq!(created.category, None);
    }

    #[test]
    fn edit_round_trip_preserves_fields_exactly() {
        let gateway = seeded_gateway();
        let mut form = EventForm::load_for_edit(&gateway, "evt-2").expect("entry exists");
        assert_eq!(form.title, "Hafenfest");

        form.description = "Fest am Hafen mit Kutterregatta.".to_string();
        form.featured = true;
        form.submit(&gateway).expect("edit succeeds");

        assert_eq!(form.state, SubmitState::Saved);
        // Edit path keeps the populated form.
        assert_eq!(form.title, "Hafenfest");

        let stored = gateway.fetch_events().items;
        assert_eq!(stored.len(), 2);
        let edited = stored.iter().find(|e| e.id == "evt-2").expect("still there");
        assert_eq!(edited.description, "Fest am Hafen mit Kutterregatta.");
        assert!(edited.featured);
        assert_eq!(edited.date, "2025-07-12");
    }

    #[test]
    fn edit_form_can_save_twice_in_a_row() {
        let gateway = seeded_gateway();
        let mut form = EventForm::load_for_edit(&gateway, "evt-1").expect("entry exists");

        form.description = "Erster Stand.".to_string();
        form.submit(&gateway).expect("first save");

        form.description = "Zweiter Stand.".to_string();
        form.submit(&gateway)
            .expect("second save of the same form");
        assert_eq!(form.state, SubmitState::Saved);

        let stored = gateway.fetch_events().items;
        let edited = stored.iter().find(|e| e.id == "evt-1").expect("still there");
        assert_eq!(edited.description, "Zweiter Stand.");
    }

    #[test]
    fn stale_load_revision_still_conflicts_with_a_concurrent_editor() {
        let gateway = seeded_gateway();
        let mut form = EventForm::load_for_edit(&gateway, "evt-1").expect("entry exists");

        // Another editor overwrites the document between load and submit.
        let other = gateway.fetch_events();
        gateway
            .save_events(&other.items, other.revision)
            .expect("other editor saves first");

        form.description = "Veralteter Stand.".to_string();
        let err = form.submit(&gateway).expect_err("stale edit must conflict");
        assert!(matches!(
            err,
            FormError::Gateway(GatewayError::Conflict(_))
        ));
    }

    #[test]
    fn load_for_edit_reports_missing_entries() {
        let gateway = seeded_gateway();
        let err = EventForm::load_for_edit(&gateway, "evt-999").expect_err("unknown id");
        assert!(matches!(err, FormError::NotFound(id) if id == "evt-999"));
    }

    #[test]
    fn validation_blocks_submit_before_any_write() {
        let gateway = seeded_gateway();
        let mut form = EventForm::new_entry();
        form.title = "Ohne Ort".to_string();
        form.description = "Fehlt was.".to_string();

        let err = form.submit(&gateway).expect_err("location missing");
        assert!(matches!(err, FormError::MissingField("location")));
        assert_eq!(gateway.fetch_events().items.len(), 2);

        form.location = "Steenodde".to_string();
        form.date = "bald".to_string();
        let err = form.submit(&gateway).expect_err("date malformed");
        assert!(matches!(err, FormError::InvalidDate(_)));
    }

    #[test]
    fn failed_save_keeps_draft_and_surfaces_server_text() {
        let gateway = seeded_gateway();
        let mut form = EventForm::new_entry();
        form.title = "Strandkonzert".to_string();
        form.location = "Kniepsand".to_string();
        form.description = "Musik am Strand.".to_string();
        form.date = "2025-08-20".to_string();

        gateway.fail_next_save("Speicher voll: bitte später erneut versuchen");
        let err = form.submit(&gateway).expect_err("save fails");
        assert!(matches!(err, FormError::Gateway(_)));

        match &form.state {
            SubmitState::Failed(message) => {
                assert!(
                    message.contains("Speicher voll: bitte später erneut versuchen"),
                    "message was: {message}"
                );
            }
            other => panic!("unexpected state: {other:?}"),
        }
        // Draft retained for retry.
        assert_eq!(form.title, "Strandkonzert");
        assert_eq!(gateway.fetch_events().items.len(), 2);

        // Retry without the simulated failure goes through.
        form.submit(&gateway).expect("retry succeeds");
        assert_eq!(gateway.fetch_events().items.len(), 3);
    }

    #[test]
    fn in_flight_guard_refuses_overlapping_submit() {
        let gateway = seeded_gateway();
        let mut form = EventForm::new_entry();
        form.state = SubmitState::Submitting;
        let err = form.submit(&gateway).expect_err("guarded");
        assert!(matches!(err, FormError::SubmitInFlight));
    }

    #[test]
    fn generated_ids_do_not_collide() {
        let mut events = seeded_gateway().fetch_events().items;
        for _ in 0..100 {
            let id = generate_event_id(&events);
            assert!(id.starts_with("evt-"));
            assert!(events.iter().all(|event| event.id != id));
            let mut event = Event::default();
            event.id = id;
            events.push(event);
        }
    }

    #[test]
    fn location_form_requires_name_and_periods() {
        let gateway = MemoryGateway::with_locations(Vec::new());
        let mut form = LocationForm::new_entry();
        assert!(matches!(
            form.submit(&gateway),
            Err(FormError::MissingField("name"))
        ));

        form.name = "Strandkorbverleih".to_string();
        form.periods.clear();
        assert!(matches!(
            form.submit(&gateway),
            Err(FormError::MissingField("periods"))
        ));
    }

    #[test]
    fn location_create_and_edit_round_trip() {
        let gateway = MemoryGateway::with_locations(Vec::new());
        let mut form = LocationForm::new_entry();
        form.name = "Strandkorbverleih Norddorf".to_string();
        form.address = "Strandweg 1, Norddorf".to_string();
        form.periods = vec![OpeningPeriod {
            name: "Saison".to_string(),
            days: "täglich".to_string(),
            hours: "09:00–18:00".to_string(),
        }];
        form.submit(&gateway).expect("create location");

        let stored = gateway.fetch_locations().items;
        assert_eq!(stored.len(), 1);
        assert!(stored[0].id.starts_with("loc-"));

        let mut edit = LocationForm::load_for_edit(&gateway, &stored[0].id).expect("loads");
        edit.phone = "04682 12345".to_string();
        edit.submit(&gateway).expect("edit location");

        let stored = gateway.fetch_locations().items;
        assert_eq!(stored[0].phone.as_deref(), Some("04682 12345"));

        // Saving the same form again must not conflict with its own save.
        edit.email = "verleih@amrum.de".to_string();
        edit.submit(&gateway).expect("second location save");
        let stored = gateway.fetch_locations().items;
        assert_eq!(stored[0].email.as_deref(), Some("verleih@amrum.de"));
    }
}
