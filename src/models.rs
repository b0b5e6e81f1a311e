use chrono::{NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Event {
    pub id: String, // "evt-<millis>-<hash>" for entries created here
    pub title: String,
    pub location: String,
    pub description: String,
    pub date: String, // ISO YYYY-MM-DD
    pub time: Option<String>,
    pub category: Option<String>,
    pub organizer: Option<String>,
    pub link: Option<String>,
    pub image: Option<String>,
    pub featured: bool,
}

impl Default for Event {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            location: String::new(),
            description: String::new(),
            date: String::new(),
            time: None,
            category: None,
            organizer: None,
            link: None,
            image: None,
            featured: false,
        }
    }
}

impl Event {
    /// Tolerant date parse; entries with malformed dates must not break
    /// filtering or sorting.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").ok()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub periods: Vec<OpeningPeriod>,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            address: String::new(),
            phone: None,
            email: None,
            website: None,
            periods: Vec::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct OpeningPeriod {
    pub name: String,  // label, e.g. "Hauptsaison"
    pub days: String,  // free text, e.g. "Mo–Fr", "Sa, So", "täglich"
    pub hours: String, // free text, e.g. "10:00–18:00"
}

static DAY_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(mo|di|mi|do|fr|sa|so)\s*[–-]\s*(mo|di|mi|do|fr|sa|so)$")
        .expect("valid day range regex")
});
static DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(mo|di|mi|do|fr|sa|so)\b").expect("valid day regex"));

fn day_index(abbrev: &str) -> Option<u32> {
    match abbrev.to_lowercase().as_str() {
        "mo" => Some(0),
        "di" => Some(1),
        "mi" => Some(2),
        "do" => Some(3),
        "fr" => Some(4),
        "sa" => Some(5),
        "so" => Some(6),
        _ => None,
    }
}

impl OpeningPeriod {
    /// Interprets common German day specs: "täglich", single days, comma
    /// lists, and "Mo–Fr" style ranges (wrapping ranges like "Fr–Mo" count
    /// every day from start through end). Unrecognized specs never match.
    pub fn covers_weekday(&self, weekday: Weekday) -> bool {
        let spec = self.days.trim();
        if spec.is_empty() {
            return false;
        }
        if spec.to_lowercase().contains("täglich") {
            return true;
        }

        let target = weekday.num_days_from_monday();
        for segment in spec.split(',') {
            let segment = segment.trim();
            if let Some(caps) = DAY_RANGE_RE.captures(segment) {
                let start = day_index(caps.get(1).map(|m| m.as_str()).unwrap_or(""));
                let end = day_index(caps.get(2).map(|m| m.as_str()).unwrap_or(""));
                if let (Some(start), Some(end)) = (start, end) {
                    let span = (end + 7 - start) % 7;
                    let offset = (target + 7 - start) % 7;
                    if offset <= span {
                        return true;
                    }
                }
            } else if let Some(caps) = DAY_RE.captures(segment) {
                if day_index(caps.get(1).map(|m| m.as_str()).unwrap_or("")) == Some(target) {
                    return true;
                }
            }
        }
        false
    }
}

/// Which kind of lodging a listing is; star ratings only exist for the
/// classified kinds (hotels and pensions).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AccommodationKind {
    Hotel { stars: u8 },
    Ferienhaus,
    Ferienwohnung,
    Pension { stars: u8 },
}

impl AccommodationKind {
    pub fn key(&self) -> &'static str {
        match self {
            AccommodationKind::Hotel { .. } => "hotel",
            AccommodationKind::Ferienhaus => "ferienhaus",
            AccommodationKind::Ferienwohnung => "ferienwohnung",
            AccommodationKind::Pension { .. } => "pension",
        }
    }

    pub fn stars(&self) -> Option<u8> {
        match self {
            AccommodationKind::Hotel { stars } | AccommodationKind::Pension { stars } => {
                Some(*stars)
            }
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Accommodation {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub kind: AccommodationKind,
    pub city: String,
    pub price_range: String, // "budget", "mittel", "premium"
    pub features: Vec<String>,
    pub rating: f32,
    pub description: String,
    pub image: Option<String>,
    pub website: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DiningKind {
    Restaurant,
    Cafe,
    BeachBar,
}

impl DiningKind {
    pub fn key(&self) -> &'static str {
        match self {
            DiningKind::Restaurant => "restaurant",
            DiningKind::Cafe => "cafe",
            DiningKind::BeachBar => "beach-bar",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub kind: DiningKind,
    pub city: String,
    pub price_range: String,
    pub features: Vec<String>,
    pub description: String,
    pub image: Option<String>,
    pub website: Option<String>,
}
