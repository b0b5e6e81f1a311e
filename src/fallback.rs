use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{de::DeserializeOwned, Serialize};

use crate::models::{Event, Location, OpeningPeriod};
use crate::utils::{self, island_today};

/// Local last-known-good copies of the remote documents. A fresh remote read
/// refreshes the snapshot; a failed remote read falls back to it.
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn open_default() -> Self {
        Self {
            root: utils::data_root(),
        }
    }

    /// Rooted at an arbitrary directory, used by tests.
    pub fn at(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn read_events(&self) -> Option<Vec<Event>> {
        self.read_document("events")
    }

    pub fn write_events(&self, events: &[Event]) -> Result<()> {
        self.write_document("events", events)
    }

    pub fn read_locations(&self) -> Option<Vec<Location>> {
        self.read_document("locations")
    }

    pub fn write_locations(&self, locations: &[Location]) -> Result<()> {
        self.write_document("locations", locations)
    }

    /// Missing or corrupt snapshots read as absent, never as an error.
    fn read_document<T: DeserializeOwned>(&self, name: &str) -> Option<Vec<T>> {
        let path = self.document_path(name);
        if !path.exists() {
            return None;
        }
        let contents = fs::read_to_string(&path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    fn write_document<T: Serialize>(&self, name: &str, items: &[T]) -> Result<()> {
        let path = self.document_path(name);
        utils::ensure_parent(&path);
        let contents = serde_json::to_string_pretty(items)
            .with_context(|| format!("unable to serialize {name} snapshot"))?;
        fs::write(&path, contents)
            .with_context(|| format!("unable to write snapshot {}", path.display()))
    }

    fn document_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }
}

/// Built-in seed collection shown when neither the remote store nor a local
/// snapshot is available. Dates are relative to today so the seeds always
/// look upcoming.
pub fn bundled_events() -> Vec<Event> {
    let today = island_today();
    vec![
        sample_event(
            "evt-seed-wattwanderung",
            "Geführte Wattwanderung",
            "Norddorf, Strandübergang",
            "Mit dem Wattführer durchs Weltnaturerbe zwischen Amrum und Föhr.",
            today + Duration::days(2),
            Some("Natur"),
        ),
        sample_event(
            "evt-seed-leuchtturm",
            "Leuchtturmführung",
            "Amrumer Leuchtturm, Wittdün",
            "Aufstieg auf den höchsten Leuchtturm der Nordseeküste.",
            today + Duration::days(6),
            Some("Kultur"),
        ),
        sample_event(
            "evt-seed-hafenfest",
            "Hafenfest Wittdün",
            "Hafen Wittdün",
            "Livemusik, Fischbrötchen und Kutterregatta am Anleger.",
            today + Duration::days(14),
            Some("Fest"),
        ),
    ]
}

pub fn bundled_locations() -> Vec<Location> {
    vec![
        Location {
            id: "loc-seed-tourismusbuero".to_string(),
            name: "Tourismusbüro Wittdün".to_string(),
            address: "Mittelstraße 34, 25946 Wittdün".to_string(),
            phone: Some("04682 94030".to_string()),
            email: Some("info@amrum.de".to_string()),
            website: Some("https://www.amrum.de".to_string()),
            periods: vec![
                OpeningPeriod {
                    name: "Hauptsaison".to_string(),
                    days: "Mo–Fr".to_string(),
                    hours: "09:00–17:00".to_string(),
                },
                OpeningPeriod {
                    name: "Wochenende".to_string(),
                    days: "Sa".to_string(),
                    hours: "10:00–13:00".to_string(),
                },
            ],
        },
        Location {
            id: "loc-seed-naturzentrum".to_string(),
            name: "Naturzentrum Norddorf".to_string(),
            address: "Strunwai 31, 25946 Norddorf".to_string(),
            phone: Some("04682 1635".to_string()),
            email: None,
            website: Some("https://www.naturzentrum-amrum.de".to_string()),
            periods: vec![OpeningPeriod {
                name: "Ausstellung".to_string(),
                days: "täglich".to_string(),
                hours: "10:00–17:00".to_string(),
            }],
        },
    ]
}

fn sample_event(
    id: &str,
    title: &str,
    location: &str,
    description: &str,
    date: chrono::NaiveDate,
    category: Option<&str>,
) -> Event {
    Event {
        id: id.to_string(),
        title: title.to_string(),
        location: location.to_string(),
        description: description.to_string(),
        date: date.format("%Y-%m-%d").to_string(),
        time: None,
        category: category.map(str::to_string),
        organizer: None,
        link: None,
        image: None,
        featured: false,
    }
}
