//! End-to-end tests of the regional pipeline: fetch, extract, read, subset.
//!
//! Archives are served from a local mock server and every test works in
//! its own temporary data root.

mod common;

use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;

use geo_types::{MultiPolygon, polygon};
use regional_gtfs::fetch::HttpSettings;
use regional_gtfs::{
    CityBoundary, Geocoder, GtfsContent, GtfsError, GtfsFeature, RegionalFeedManager, Value,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn serve(body: Vec<u8>, status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gtfs-nl.zip"))
        .respond_with(ResponseTemplate::new(status).set_body_bytes(body))
        .mount(&server)
        .await;
    server
}

fn manager(server: &MockServer, root: &Path) -> RegionalFeedManager {
    RegionalFeedManager::new(
        "Netherlands",
        "08032021",
        format!("{}/gtfs-nl.zip", server.uri()),
    )
    .with_data_root(root)
    .with_settings(HttpSettings {
        chunk_size: 128,
        ..HttpSettings::default()
    })
}

async fn fetch_and_extract(manager: RegionalFeedManager) -> RegionalFeedManager {
    tokio::task::spawn_blocking(move || {
        let fetched = manager.fetch().unwrap();
        manager.extract(&fetched.path).unwrap();
        manager
    })
    .await
    .unwrap()
}

fn text(values: &[&str]) -> Vec<Value> {
    values.iter().map(|v| Value::Text(v.to_string())).collect()
}

struct FixedGeocoder(MultiPolygon<f64>);

impl Geocoder for FixedGeocoder {
    fn city_boundary(&self, city: &str) -> regional_gtfs::Result<CityBoundary> {
        Ok(CityBoundary {
            name: city.to_string(),
            display_name: format!("{}, Zuid-Holland", city),
            area: self.0.clone(),
        })
    }
}

struct NoMatch;

impl Geocoder for NoMatch {
    fn city_boundary(&self, city: &str) -> regional_gtfs::Result<CityBoundary> {
        Err(GtfsError::PlaceNotFound(city.to_string()))
    }
}

// ============================================================================
// Fetch
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_writes_archive_to_region_date_dir() {
    let body = common::sample_feed();
    let server = serve(body.clone(), 200).await;
    let root = tempfile::tempdir().unwrap();
    let manager = manager(&server, root.path());

    let fetched = tokio::task::spawn_blocking(move || manager.fetch())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        fetched.path,
        root.path().join("raw/gtfs_zip/Netherlands/08032021/Netherlands_08032021.zip")
    );
    assert_eq!(fetched.bytes, body.len() as u64);
    assert_eq!(fs::read(&fetched.path).unwrap(), body);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_non_success_status_is_an_error() {
    let server = serve(b"gone".to_vec(), 404).await;
    let root = tempfile::tempdir().unwrap();
    let manager = manager(&server, root.path());

    let err = tokio::task::spawn_blocking(move || manager.fetch())
        .await
        .unwrap()
        .unwrap_err();

    assert!(matches!(err, GtfsError::HttpStatus { status: 404, .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_unreachable_host_is_a_network_error() {
    let root = tempfile::tempdir().unwrap();
    let manager = RegionalFeedManager::new("Netherlands", "08032021", "http://127.0.0.1:1/gtfs.zip")
        .with_data_root(root.path());

    let err = tokio::task::spawn_blocking(move || manager.fetch())
        .await
        .unwrap()
        .unwrap_err();

    assert!(matches!(err, GtfsError::Network(_)));
}

// ============================================================================
// Extract and Read
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_unique_values_of_sample_feed() {
    let server = serve(common::sample_feed(), 200).await;
    let root = tempfile::tempdir().unwrap();
    let manager = fetch_and_extract(manager(&server, root.path())).await;

    let routes = manager.unique_values(GtfsFeature::RouteId).unwrap();
    assert_eq!(routes, text(&["R10", "R20"]));

    let stops = manager.unique_values(GtfsFeature::StopId).unwrap();
    assert_eq!(stops, text(&["S1", "S2", "S3", "S4"]));

    let services = manager.unique_values(GtfsFeature::ServiceId).unwrap();
    assert_eq!(services, text(&["WD", "WE"]));

    let route_types = manager.unique_values(GtfsFeature::RouteType).unwrap();
    assert_eq!(route_types, vec![Value::Integer(0), Value::Integer(3)]);

    let agencies = manager.unique_values("agency_id".parse().unwrap()).unwrap();
    assert_eq!(agencies, text(&["HTM"]));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_loaded_table_matches_source_file() {
    let server = serve(common::sample_feed(), 200).await;
    let root = tempfile::tempdir().unwrap();
    let manager = fetch_and_extract(manager(&server, root.path())).await;

    let trips = manager.load_table(GtfsContent::Trips).unwrap().unwrap();
    assert_eq!(trips.len(), common::TRIPS.lines().count() - 1);
    assert_eq!(
        trips.headers().collect::<Vec<_>>(),
        common::TRIPS.lines().next().unwrap().split(',').collect::<Vec<_>>()
    );

    let mut available = manager.available_contents();
    available.sort();
    assert_eq!(
        available,
        vec![GtfsContent::Routes, GtfsContent::Stops, GtfsContent::Trips]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_absent_table_is_none_not_error() {
    let server = serve(common::sample_feed(), 200).await;
    let root = tempfile::tempdir().unwrap();
    let manager = fetch_and_extract(manager(&server, root.path())).await;

    assert!(manager.load_table(GtfsContent::Agency).unwrap().is_none());
}

#[test]
fn test_extract_twice_is_idempotent() {
    let root = tempfile::tempdir().unwrap();
    let archive = root.path().join("feed.zip");
    fs::write(&archive, common::sample_feed()).unwrap();

    let manager = RegionalFeedManager::new("Netherlands", "08032021", "unused")
        .with_data_root(root.path());

    let snapshot = |m: &RegionalFeedManager| {
        let mut files: Vec<_> = fs::read_dir(m.extract_dir())
            .unwrap()
            .map(|e| {
                let path = e.unwrap().path();
                (path.clone(), fs::read(path).unwrap())
            })
            .collect();
        files.sort();
        files
    };

    manager.extract(&archive).unwrap();
    let first = snapshot(&manager);
    manager.extract(&archive).unwrap();
    let second = snapshot(&manager);

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
}

#[test]
fn test_extract_corrupt_archive_is_a_format_error() {
    let root = tempfile::tempdir().unwrap();
    let archive = root.path().join("truncated.zip");
    let mut bytes = common::sample_feed();
    bytes.truncate(bytes.len() / 2);
    fs::write(&archive, bytes).unwrap();

    let manager = RegionalFeedManager::new("Netherlands", "08032021", "unused")
        .with_data_root(root.path());

    assert!(matches!(manager.extract(&archive), Err(GtfsError::Archive(_))));
}

// ============================================================================
// City Subset
// ============================================================================

#[test]
fn test_derive_city_subset_writes_city_dir() {
    let root = tempfile::tempdir().unwrap();
    let archive = root.path().join("feed.zip");
    fs::write(&archive, common::sample_feed()).unwrap();

    let mut manager = RegionalFeedManager::new("Netherlands", "08032021", "unused")
        .with_data_root(root.path());
    manager.extract(&archive).unwrap();

    let den_haag = FixedGeocoder(MultiPolygon(vec![polygon![
        (x: 4.2, y: 52.0),
        (x: 4.45, y: 52.0),
        (x: 4.45, y: 52.15),
        (x: 4.2, y: 52.15),
    ]]));
    let subset = manager.derive_city_subset("Den Haag", &den_haag).unwrap();

    let expected_dir = root
        .path()
        .join("processed/city_gtfs/Netherlands/Den Haag/08032021");
    assert_eq!(subset.output_dir, expected_dir);
    assert_eq!(manager.city_dir(), Some(expected_dir.as_path()));
    assert!(subset.tables.contains(&(GtfsContent::Stops, 2)));

    let stops = fs::read_to_string(expected_dir.join("stops.txt")).unwrap();
    assert_eq!(
        stops,
        "stop_id,stop_name,stop_lat,stop_lon\nS1,Centraal,52.0800,4.3240\nS2,Spui,52.0770,4.3160\n"
    );
}

#[test]
fn test_unresolvable_place_is_an_error() {
    let root = tempfile::tempdir().unwrap();
    let mut manager = RegionalFeedManager::new("Netherlands", "08032021", "unused")
        .with_data_root(root.path());

    let err = manager.derive_city_subset("Atlantis", &NoMatch).unwrap_err();
    assert!(matches!(err, GtfsError::PlaceNotFound(_)));
    assert!(root.path().join("processed/city_gtfs/Netherlands/Atlantis/08032021").is_dir());
    assert!(!root.path().join("raw/gtfs_zip").exists());
}
