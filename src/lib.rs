//! Data layer for the Amrum tourism site: entity models, collection
//! filtering, the JSON document persistence gateway with local fallback,
//! the event/opening-hours editing workflow, and the ferry timetable.

pub mod config;
pub mod fallback;
pub mod ferry;
pub mod filter;
pub mod gateway;
pub mod models;
pub mod utils;
pub mod workflow;

pub use config::{AppConfig, ConfigStore, GatewayConfig};
pub use fallback::SnapshotStore;
pub use filter::{
    filter_accommodations, filter_events, filter_restaurants, sort_events_by_date,
    AccommodationFilters, DateSelection, EventFilters, RestaurantFilters,
};
pub use gateway::{DataSource, FetchOutcome, Gateway, GatewayError, HttpGateway, MemoryGateway};
pub use models::{
    Accommodation, AccommodationKind, DiningKind, Event, Location, OpeningPeriod, Restaurant,
};
pub use workflow::{EventForm, FormError, FormMode, LocationForm, SubmitState};
