// Place-name geocoding to city boundaries.
//
// Nominatim search API: https://nominatim.org/release-docs/latest/api/Search/

use geo::Intersects;
use geo_types::{Geometry, MultiPolygon, Point};
use reqwest::blocking;
use serde::Deserialize;

use crate::error::{GtfsError, Result};
use crate::fetch::{HttpSettings, create_http_client};

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

// ============================================================================
// Boundary
// ============================================================================

/// The administrative area a place name resolved to.
#[derive(Debug, Clone)]
pub struct CityBoundary {
    pub name: String,
    pub display_name: String,
    pub area: MultiPolygon<f64>,
}

impl CityBoundary {
    /// Whether a WGS84 coordinate lies inside the area or on its edge.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.area.intersects(&Point::new(lon, lat))
    }
}

/// Resolves a city name to exactly one boundary.
pub trait Geocoder {
    fn city_boundary(&self, city: &str) -> Result<CityBoundary>;
}

// ============================================================================
// Nominatim
// ============================================================================

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    display_name: String,
    #[serde(default)]
    geojson: Option<serde_json::Value>,
}

pub struct NominatimGeocoder {
    base_url: String,
    settings: HttpSettings,
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>, settings: HttpSettings) -> Self {
        NominatimGeocoder {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            settings,
        }
    }

    fn search(&self, client: &blocking::Client, city: &str) -> Result<Vec<NominatimPlace>> {
        let url = format!("{}/search", self.base_url);
        let response = client
            .get(&url)
            .query(&[("city", city), ("format", "json"), ("polygon_geojson", "1")])
            .send()?;

        if !response.status().is_success() {
            return Err(GtfsError::HttpStatus {
                url,
                status: response.status().as_u16(),
            });
        }

        response
            .json()
            .map_err(|e| GtfsError::Geocoder(format!("Unreadable search response from {}: {}", url, e)))
    }
}

impl Default for NominatimGeocoder {
    fn default() -> Self {
        NominatimGeocoder::new(NOMINATIM_URL, HttpSettings::default())
    }
}

impl Geocoder for NominatimGeocoder {
    /// Takes the highest-ranked result with an areal geometry. Points and
    /// lines are skipped since a city has to cover an area.
    fn city_boundary(&self, city: &str) -> Result<CityBoundary> {
        let client = create_http_client(&self.settings)?;
        let places = self.search(&client, city)?;
        let total = places.len();

        let mut areas = places
            .into_iter()
            .filter_map(|place| to_area(place.geojson?).map(|area| (place.display_name, area)));

        let (display_name, area) = areas
            .next()
            .ok_or_else(|| GtfsError::PlaceNotFound(city.to_string()))?;

        let skipped = areas.count();
        if skipped > 0 {
            tracing::warn!(
                city,
                chosen = %display_name,
                skipped,
                "Place name matched several areas, using the top-ranked one"
            );
        }
        tracing::info!(city, place = %display_name, results = total, "Geocoded city boundary");

        Ok(CityBoundary {
            name: city.to_string(),
            display_name,
            area,
        })
    }
}

fn to_area(value: serde_json::Value) -> Option<MultiPolygon<f64>> {
    let geometry = match geojson::Geometry::from_json_value(value) {
        Ok(g) => g,
        Err(e) => {
            tracing::debug!(error = %e, "Skipping result with unreadable geometry");
            return None;
        }
    };
    match Geometry::<f64>::try_from(geometry).ok()? {
        Geometry::Polygon(polygon) => Some(MultiPolygon(vec![polygon])),
        Geometry::MultiPolygon(multi) => Some(multi),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn square() -> serde_json::Value {
        json!({
            "type": "Polygon",
            "coordinates": [[[4.0, 52.0], [4.5, 52.0], [4.5, 52.2], [4.0, 52.2], [4.0, 52.0]]]
        })
    }

    async fn geocode(server: &MockServer, city: &'static str) -> Result<CityBoundary> {
        let geocoder = NominatimGeocoder::new(server.uri(), HttpSettings::default());
        tokio::task::spawn_blocking(move || geocoder.city_boundary(city))
            .await
            .unwrap()
    }

    #[test]
    fn test_boundary_contains() {
        let boundary = CityBoundary {
            name: "Den Haag".to_string(),
            display_name: "Den Haag".to_string(),
            area: MultiPolygon(vec![polygon![
                (x: 4.0, y: 52.0),
                (x: 4.5, y: 52.0),
                (x: 4.5, y: 52.2),
                (x: 4.0, y: 52.2),
            ]]),
        };
        assert!(boundary.contains(4.3, 52.08));
        assert!(boundary.contains(4.0, 52.1));
        assert!(!boundary.contains(4.9, 52.37));
    }

    #[test]
    fn test_to_area_ignores_points() {
        assert!(to_area(json!({"type": "Point", "coordinates": [4.3, 52.08]})).is_none());
        assert!(to_area(square()).is_some());
        assert!(to_area(json!({"type": "Nonsense"})).is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_takes_first_areal_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("city", "Den Haag"))
            .and(query_param("polygon_geojson", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"display_name": "Den Haag (node)", "geojson": {"type": "Point", "coordinates": [4.3, 52.08]}},
                {"display_name": "Den Haag, Zuid-Holland", "geojson": square()},
                {"display_name": "Den Haag (other)", "geojson": square()}
            ])))
            .mount(&server)
            .await;

        let boundary = geocode(&server, "Den Haag").await.unwrap();
        assert_eq!(boundary.name, "Den Haag");
        assert_eq!(boundary.display_name, "Den Haag, Zuid-Holland");
        assert!(boundary.contains(4.3, 52.08));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_no_areal_result_is_place_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let err = geocode(&server, "Atlantis").await.unwrap_err();
        assert!(matches!(err, GtfsError::PlaceNotFound(city) if city == "Atlantis"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_malformed_body_is_a_geocoder_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
            .mount(&server)
            .await;

        let err = geocode(&server, "Den Haag").await.unwrap_err();
        assert!(matches!(err, GtfsError::Geocoder(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_server_error_is_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = geocode(&server, "Den Haag").await.unwrap_err();
        assert!(matches!(err, GtfsError::HttpStatus { status: 503, .. }));
    }
}
