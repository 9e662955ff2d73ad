// Restriction of a regional feed to the stops inside a city boundary.
//
// Stops inside the boundary (and the stations they belong to) are kept,
// then every other table is cut down to what those stops reach:
// stop_times -> trips -> routes -> agency, trips -> shapes,
// trips -> calendar / calendar_dates, and transfers between kept stops.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::content::GtfsContent;
use crate::error::{GtfsError, Result};
use crate::geocode::CityBoundary;
use crate::table::GtfsTable;

fn load(source_dir: &Path, content: GtfsContent) -> Result<Option<GtfsTable>> {
    let path = source_dir.join(content.file_name());
    if !path.is_file() {
        return Ok(None);
    }
    GtfsTable::read(content, &path).map(Some)
}

fn keep_by(table: &GtfsTable, column: &str, keys: &HashSet<String>) -> Result<GtfsTable> {
    let col = table.require_column(column)?;
    Ok(table.retain_rows(|r| r.get(col).is_some_and(|v| keys.contains(v))))
}

fn stops_inside(stops: &GtfsTable, boundary: &CityBoundary) -> Result<HashSet<String>> {
    let id = stops.require_column("stop_id")?;
    let lat = stops.require_column("stop_lat")?;
    let lon = stops.require_column("stop_lon")?;

    let mut inside = HashSet::new();
    for record in stops.records() {
        let coords = (
            record.get(lat).and_then(|v| v.trim().parse::<f64>().ok()),
            record.get(lon).and_then(|v| v.trim().parse::<f64>().ok()),
        );
        if let (Some(lat), Some(lon)) = coords {
            if boundary.contains(lon, lat) {
                inside.extend(record.get(id).map(str::to_string));
            }
        }
    }

    // Parent stations stay even when their centroid is outside.
    if let Some(parent) = stops.column_index("parent_station") {
        let parents: Vec<String> = stops
            .records()
            .filter(|r| r.get(id).is_some_and(|v| inside.contains(v)))
            .filter_map(|r| r.get(parent))
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        inside.extend(parents);
    }

    Ok(inside)
}

/// Writes the city-scoped tables into `dest_dir` and returns the row count
/// of each table written. Tables missing upstream are skipped.
pub fn write_city_subset(
    source_dir: &Path,
    boundary: &CityBoundary,
    dest_dir: &Path,
) -> Result<Vec<(GtfsContent, usize)>> {
    let stops = load(source_dir, GtfsContent::Stops)?
        .ok_or(GtfsError::MissingContent(GtfsContent::Stops))?;

    let stop_ids = stops_inside(&stops, boundary)?;
    let mut kept: Vec<GtfsTable> = vec![keep_by(&stops, "stop_id", &stop_ids)?];

    let mut trip_ids = HashSet::new();
    if let Some(stop_times) = load(source_dir, GtfsContent::StopTimes)? {
        let stop_times = keep_by(&stop_times, "stop_id", &stop_ids)?;
        trip_ids = stop_times.raw_set("trip_id")?;
        kept.push(stop_times);
    }

    let mut route_ids = HashSet::new();
    let mut service_ids = HashSet::new();
    let mut shape_ids = HashSet::new();
    if let Some(trips) = load(source_dir, GtfsContent::Trips)? {
        let trips = keep_by(&trips, "trip_id", &trip_ids)?;
        route_ids = trips.raw_set("route_id")?;
        service_ids = trips.raw_set("service_id")?;
        if trips.column_index("shape_id").is_some() {
            shape_ids = trips.raw_set("shape_id")?;
        }
        kept.push(trips);
    }

    let mut agency_ids = None;
    if let Some(routes) = load(source_dir, GtfsContent::Routes)? {
        let routes = keep_by(&routes, "route_id", &route_ids)?;
        if routes.column_index("agency_id").is_some() {
            agency_ids = Some(routes.raw_set("agency_id")?);
        }
        kept.push(routes);
    }

    if let Some(agency) = load(source_dir, GtfsContent::Agency)? {
        // Single-agency feeds may leave agency_id out entirely.
        match (&agency_ids, agency.column_index("agency_id")) {
            (Some(ids), Some(_)) => kept.push(keep_by(&agency, "agency_id", ids)?),
            _ => kept.push(agency),
        }
    }

    if let Some(shapes) = load(source_dir, GtfsContent::Shapes)? {
        kept.push(keep_by(&shapes, "shape_id", &shape_ids)?);
    }

    for content in [GtfsContent::Calendar, GtfsContent::CalendarDates] {
        if let Some(table) = load(source_dir, content)? {
            kept.push(keep_by(&table, "service_id", &service_ids)?);
        }
    }

    if let Some(transfers) = load(source_dir, GtfsContent::Transfers)? {
        let from = transfers.require_column("from_stop_id")?;
        let to = transfers.require_column("to_stop_id")?;
        kept.push(transfers.retain_rows(|r| {
            [from, to]
                .iter()
                .all(|&col| r.get(col).is_some_and(|v| stop_ids.contains(v)))
        }));
    }

    if let Some(feed_info) = load(source_dir, GtfsContent::FeedInfo)? {
        kept.push(feed_info);
    }

    fs::create_dir_all(dest_dir).map_err(|e| GtfsError::io(dest_dir, e))?;

    kept.sort_by_key(|t| t.content());
    let mut written = Vec::with_capacity(kept.len());
    for table in &kept {
        table.write(&dest_dir.join(table.content().file_name()))?;
        tracing::debug!(content = %table.content(), rows = table.len(), "Wrote city table");
        written.push((table.content(), table.len()));
    }

    Ok(written)
}
