use std::{fs, path::PathBuf};

use chrono::{NaiveDate, Utc};
use chrono_tz::Europe::Berlin;
use dirs::data_dir;
use once_cell::sync::Lazy;

static DATA_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    let base = data_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let root = base.join("amrum-data");
    if let Err(err) = fs::create_dir_all(&root) {
        eprintln!("failed to create data root {:?}: {err}", root);
    }
    root
});

/// Home of the persisted config and the document snapshots.
pub fn data_root() -> PathBuf {
    DATA_ROOT.clone()
}

pub fn ensure_parent(path: &PathBuf) {
    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            eprintln!("failed to create parent {:?}: {err}", parent);
        }
    }
}

/// Current date on the island; schedules and new-entry defaults run on
/// local time, not UTC.
pub fn island_today() -> NaiveDate {
    Utc::now().with_timezone(&Berlin).date_naive()
}
