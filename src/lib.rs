//! Regional GTFS feed preparation.
//!
//! A [`RegionalFeedManager`] downloads one region's published GTFS archive,
//! unpacks it under a region/date directory, reads its tables, and derives
//! a city-scoped feed from a geocoded boundary.

pub mod archive;
pub mod config;
pub mod content;
pub mod error;
pub mod fetch;
pub mod geocode;
pub mod layout;
pub mod manager;
pub mod subset;
pub mod table;

pub use content::{GtfsContent, GtfsFeature};
pub use error::{GtfsError, Result};
pub use geocode::{CityBoundary, Geocoder, NominatimGeocoder};
pub use manager::{CitySubset, FeedIdentity, FetchedArchive, RegionalFeedManager};
pub use table::{ColumnKind, GtfsTable, Value};
