// GTFS content files and the columns this crate knows how to summarise.

use std::fmt;
use std::str::FromStr;

use crate::error::GtfsError;

// ============================================================================
// Content Files
// ============================================================================

/// One of the text tables a GTFS feed ships as `<name>.txt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GtfsContent {
    Agency,
    Calendar,
    CalendarDates,
    FeedInfo,
    Routes,
    Shapes,
    StopTimes,
    Stops,
    Transfers,
    Trips,
}

impl GtfsContent {
    pub const ALL: [GtfsContent; 10] = [
        GtfsContent::Agency,
        GtfsContent::Calendar,
        GtfsContent::CalendarDates,
        GtfsContent::FeedInfo,
        GtfsContent::Routes,
        GtfsContent::Shapes,
        GtfsContent::StopTimes,
        GtfsContent::Stops,
        GtfsContent::Transfers,
        GtfsContent::Trips,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GtfsContent::Agency => "agency",
            GtfsContent::Calendar => "calendar",
            GtfsContent::CalendarDates => "calendar_dates",
            GtfsContent::FeedInfo => "feed_info",
            GtfsContent::Routes => "routes",
            GtfsContent::Shapes => "shapes",
            GtfsContent::StopTimes => "stop_times",
            GtfsContent::Stops => "stops",
            GtfsContent::Transfers => "transfers",
            GtfsContent::Trips => "trips",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.txt", self.name())
    }
}

impl fmt::Display for GtfsContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GtfsContent {
    type Err = GtfsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_suffix(".txt").unwrap_or(s);
        GtfsContent::ALL
            .into_iter()
            .find(|content| content.name() == name)
            .ok_or_else(|| GtfsError::UnknownContent(s.to_string()))
    }
}

// ============================================================================
// Features
// ============================================================================

/// A column whose distinct values can be listed for a whole region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GtfsFeature {
    RouteId,
    TripId,
    ServiceId,
    RouteType,
    AgencyId,
    StopId,
}

/// Which table owns each feature. Extend by adding a variant and a row;
/// rows are in variant declaration order.
static FEATURE_TABLES: [(GtfsFeature, &str, GtfsContent); 6] = [
    (GtfsFeature::RouteId, "route_id", GtfsContent::Trips),
    (GtfsFeature::TripId, "trip_id", GtfsContent::Trips),
    (GtfsFeature::ServiceId, "service_id", GtfsContent::Trips),
    (GtfsFeature::RouteType, "route_type", GtfsContent::Routes),
    (GtfsFeature::AgencyId, "agency_id", GtfsContent::Routes),
    (GtfsFeature::StopId, "stop_id", GtfsContent::Stops),
];

impl GtfsFeature {
    fn entry(self) -> &'static (GtfsFeature, &'static str, GtfsContent) {
        &FEATURE_TABLES[self as usize]
    }

    /// Column name as it appears in the feed header.
    pub fn column(self) -> &'static str {
        self.entry().1
    }

    /// The table holding this column.
    pub fn content(self) -> GtfsContent {
        self.entry().2
    }

    pub fn all() -> impl Iterator<Item = GtfsFeature> {
        FEATURE_TABLES.iter().map(|(feature, _, _)| *feature)
    }
}

impl fmt::Display for GtfsFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for GtfsFeature {
    type Err = GtfsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FEATURE_TABLES
            .iter()
            .find(|(_, column, _)| *column == s)
            .map(|(feature, _, _)| *feature)
            .ok_or_else(|| GtfsError::UnsupportedFeature(s.to_string()))
    }
}
