use chrono::NaiveDate;

use crate::models::{Accommodation, Event, Restaurant};

/// The two date modes are mutually exclusive by construction: picking a
/// single day replaces any active range and vice versa.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DateSelection {
    Single(NaiveDate),
    Range { from: NaiveDate, to: NaiveDate },
}

impl DateSelection {
    fn matches(&self, date: Option<NaiveDate>) -> bool {
        let date = match date {
            Some(date) => date,
            // Malformed dates never match an active date filter.
            None => return false,
        };
        match self {
            DateSelection::Single(day) => date == *day,
            // Inclusive on both ends.
            DateSelection::Range { from, to } => *from <= date && date <= *to,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct EventFilters {
    pub search: Option<String>,
    pub category: Option<String>,
    pub date: Option<DateSelection>,
    pub featured_only: bool,
}

#[derive(Clone, Debug, Default)]
pub struct AccommodationFilters {
    pub search: Option<String>,
    pub kind: Option<String>, // tag key, e.g. "hotel"; None means all
    pub price_range: Option<String>,
    pub feature: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct RestaurantFilters {
    pub search: Option<String>,
    pub kind: Option<String>,
    pub price_range: Option<String>,
    pub feature: Option<String>,
}

/// Case-insensitive substring match across the given haystacks. An empty or
/// whitespace-only query imposes no constraint.
fn matches_search(query: &Option<String>, haystacks: &[&str]) -> bool {
    let query = match query {
        Some(q) => q.trim().to_lowercase(),
        None => return true,
    };
    if query.is_empty() {
        return true;
    }
    haystacks
        .iter()
        .any(|text| text.to_lowercase().contains(&query))
}

fn matches_exact(wanted: &Option<String>, actual: &str) -> bool {
    match wanted {
        Some(wanted) => wanted == actual,
        None => true,
    }
}

fn matches_optional(wanted: &Option<String>, actual: Option<&str>) -> bool {
    match wanted {
        Some(wanted) => actual == Some(wanted.as_str()),
        None => true,
    }
}

/// All active criteria must hold (AND); input order is preserved and the
/// input collection is untouched.
pub fn filter_events(events: &[Event], filters: &EventFilters) -> Vec<Event> {
    events
        .iter()
        .filter(|event| {
            matches_search(
                &filters.search,
                &[&event.title, &event.description, &event.location],
            ) && matches_optional(&filters.category, event.category.as_deref())
                && filters
                    .date
                    .map_or(true, |selection| selection.matches(event.parsed_date()))
                && (!filters.featured_only || event.featured)
        })
        .cloned()
        .collect()
}

/// Ascending by calendar date, stable; entries with unparseable dates sort
/// to the end in their original relative order.
pub fn sort_events_by_date(events: &mut [Event]) {
    events.sort_by_key(|event| (event.parsed_date().is_none(), event.parsed_date()));
}

pub fn filter_accommodations(
    listings: &[Accommodation],
    filters: &AccommodationFilters,
) -> Vec<Accommodation> {
    listings
        .iter()
        .filter(|listing| {
            matches_search(&filters.search, &[&listing.name, &listing.description])
                && matches_exact(&filters.kind, listing.kind.key())
                && matches_exact(&filters.price_range, &listing.price_range)
                && filters.feature.as_ref().map_or(true, |feature| {
                    listing.features.iter().any(|f| f == feature)
                })
        })
        .cloned()
        .collect()
}

pub fn filter_restaurants(listings: &[Restaurant], filters: &RestaurantFilters) -> Vec<Restaurant> {
    listings
        .iter()
        .filter(|listing| {
            matches_search(&filters.search, &[&listing.name, &listing.description])
                && matches_exact(&filters.kind, listing.kind.key())
                && matches_exact(&filters.price_range, &listing.price_range)
                && filters.feature.as_ref().map_or(true, |feature| {
                    listing.features.iter().any(|f| f == feature)
                })
        })
        .cloned()
        .collect()
}
