use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

pub use crate::utils::island_today;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Route {
    DagebuellToWittduen,
    WittduenToDagebuell,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::DagebuellToWittduen => write!(f, "Dagebüll – Wittdün"),
            Route::WittduenToDagebuell => write!(f, "Wittdün – Dagebüll"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Sailing {
    pub date: NaiveDate,
    pub departure: NaiveTime,
    pub arrival: NaiveTime,
    pub route: Route,
}

static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2}):(\d{2})").expect("valid time regex"));

fn parse_time(text: &str) -> Option<NaiveTime> {
    let caps = TIME_RE.captures(text)?;
    let hour = caps.get(1)?.as_str().parse().ok()?;
    let minute = caps.get(2)?.as_str().parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

// Pre-supplied timetable, bundled with the build; rows that fail to parse
// are dropped rather than failing the whole table.
const SCHEDULE_ROWS: &[(&str, &str, &str, Route)] = &[
    ("2025-08-18", "07:10", "09:00", Route::DagebuellToWittduen),
    ("2025-08-18", "09:40", "11:25", Route::WittduenToDagebuell),
    ("2025-08-18", "12:10", "14:00", Route::DagebuellToWittduen),
    ("2025-08-18", "14:40", "16:25", Route::WittduenToDagebuell),
    ("2025-08-18", "17:10", "19:00", Route::DagebuellToWittduen),
    ("2025-08-19", "07:10", "09:00", Route::DagebuellToWittduen),
    ("2025-08-19", "09:40", "11:25", Route::WittduenToDagebuell),
    ("2025-08-19", "12:10", "14:00", Route::DagebuellToWittduen),
    ("2025-08-19", "14:40", "16:25", Route::WittduenToDagebuell),
    ("2025-08-20", "08:30", "10:20", Route::DagebuellToWittduen),
    ("2025-08-20", "11:00", "12:45", Route::WittduenToDagebuell),
    ("2025-08-20", "15:30", "17:20", Route::DagebuellToWittduen),
];

static SCHEDULE: Lazy<Vec<Sailing>> = Lazy::new(|| {
    SCHEDULE_ROWS
        .iter()
        .filter_map(|(date, departure, arrival, route)| {
            Some(Sailing {
                date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?,
                departure: parse_time(departure)?,
                arrival: parse_time(arrival)?,
                route: *route,
            })
        })
        .collect()
});

pub fn schedule() -> &'static [Sailing] {
    &SCHEDULE
}

/// Rows for one calendar day, in timetable order.
pub fn sailings_on(date: NaiveDate) -> Vec<Sailing> {
    SCHEDULE
        .iter()
        .filter(|sailing| sailing.date == date)
        .copied()
        .collect()
}

/// First sailing leaving strictly after the given time that day.
pub fn next_departure(date: NaiveDate, after: NaiveTime) -> Option<Sailing> {
    SCHEDULE
        .iter()
        .filter(|sailing| sailing.date == date && sailing.departure > after)
        .min_by_key(|sailing| sailing.departure)
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(text: &str) -> NaiveDate {
        NaiveDate::parse_from_str(text, "%Y-%m-%d").expect("valid test date")
    }

    fn time(text: &str) -> NaiveTime {
        parse_time(text).expect("valid test time")
    }

    #[test]
    fn sailings_on_filters_by_calendar_day() {
        let rows = sailings_on(date("2025-08-18"));
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|s| s.date == date("2025-08-18")));
        // Timetable order is preserved.
        assert_eq!(rows[0].departure, time("07:10"));
        assert_eq!(rows[4].departure, time("17:10"));

        assert!(sailings_on(date("2025-12-24")).is_empty());
    }

    #[test]
    fn next_departure_is_strictly_after() {
        let next = next_departure(date("2025-08-18"), time("12:10")).expect("afternoon sailing");
        assert_eq!(next.departure, time("14:40"));
        assert_eq!(next.route, Route::WittduenToDagebuell);

        assert!(next_departure(date("2025-08-18"), time("17:10")).is_none());
    }

    #[test]
    fn time_parsing_rejects_garbage() {
        assert_eq!(parse_time("14:40"), NaiveTime::from_hms_opt(14, 40, 0));
        assert_eq!(parse_time("ab mittags"), None);
        assert_eq!(parse_time("25:99"), None);
    }

    #[test]
    fn route_labels_read_naturally() {
        assert_eq!(
            Route::DagebuellToWittduen.to_string(),
            "Dagebüll – Wittdün"
        );
    }
}
