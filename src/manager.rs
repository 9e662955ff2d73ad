// Lifecycle of one regional feed: download, unpack, read, and cut down to a city.

use std::fs;
use std::path::{Path, PathBuf};

use crate::archive;
use crate::content::{GtfsContent, GtfsFeature};
use crate::error::{GtfsError, Result};
use crate::fetch::{self, HttpSettings};
use crate::geocode::{CityBoundary, Geocoder};
use crate::layout::{DEFAULT_DATA_ROOT, FeedLayout};
use crate::subset;
use crate::table::{GtfsTable, Value};

// ============================================================================
// Data Structures
// ============================================================================

/// Which feed a manager works on. Every path it touches derives from this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedIdentity {
    /// Region or country, e.g. "Netherlands".
    pub region: String,
    /// Publish date in DDMMYYYY form. Not validated.
    pub publish_date: String,
    pub source_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArchive {
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub struct CitySubset {
    pub city: String,
    pub boundary: CityBoundary,
    pub output_dir: PathBuf,
    /// Row count per table written.
    pub tables: Vec<(GtfsContent, usize)>,
}

// ============================================================================
// Main Implementation
// ============================================================================

#[derive(Debug, Clone)]
pub struct RegionalFeedManager {
    identity: FeedIdentity,
    layout: FeedLayout,
    settings: HttpSettings,
    city_dir: Option<PathBuf>,
}

impl RegionalFeedManager {
    /// Records the identity and derives the raw-stage directories.
    /// Nothing touches the network or the disk until a stage is called.
    pub fn new(
        region: impl Into<String>,
        publish_date: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        let identity = FeedIdentity {
            region: region.into(),
            publish_date: publish_date.into(),
            source_url: source_url.into(),
        };
        let layout = FeedLayout::new(DEFAULT_DATA_ROOT, &identity.region, &identity.publish_date);
        RegionalFeedManager {
            identity,
            layout,
            settings: HttpSettings::default(),
            city_dir: None,
        }
    }

    pub fn with_data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.layout = FeedLayout::new(root, &self.identity.region, &self.identity.publish_date);
        self.city_dir = None;
        self
    }

    pub fn with_settings(mut self, settings: HttpSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn identity(&self) -> &FeedIdentity {
        &self.identity
    }

    pub fn layout(&self) -> &FeedLayout {
        &self.layout
    }

    /// Where `fetch` writes the archive.
    pub fn archive_path(&self) -> &Path {
        &self.layout.archive_path
    }

    pub fn extract_dir(&self) -> &Path {
        &self.layout.unzip_dir
    }

    /// Output directory of the last `derive_city_subset` call.
    pub fn city_dir(&self) -> Option<&Path> {
        self.city_dir.as_deref()
    }

    /// Downloads the feed archive into the region/date zip directory.
    pub fn fetch(&self) -> Result<FetchedArchive> {
        let zip_dir = &self.layout.zip_dir;
        fs::create_dir_all(zip_dir).map_err(|e| GtfsError::io(zip_dir, e))?;

        tracing::info!(
            region = %self.identity.region,
            url = %self.identity.source_url,
            "Downloading regional GTFS"
        );

        let client = fetch::create_http_client(&self.settings)?;
        let path = self.layout.archive_path.clone();
        let bytes = fetch::download_to(
            &client,
            &self.identity.source_url,
            &path,
            self.settings.chunk_size,
        )?;

        tracing::info!(path = %path.display(), kb = bytes / 1024, "Downloaded regional GTFS");
        Ok(FetchedArchive { path, bytes })
    }

    /// Unpacks `archive_path` (any zip, not necessarily the fetched one)
    /// into the region/date extract directory.
    pub fn extract(&self, archive_path: &Path) -> Result<Vec<PathBuf>> {
        let files = archive::extract_all(archive_path, &self.layout.unzip_dir)?;
        tracing::info!(
            region = %self.identity.region,
            published = %self.identity.publish_date,
            dest = %self.layout.unzip_dir.display(),
            files = files.len(),
            "Successfully extracted GTFS dataset"
        );
        Ok(files)
    }

    /// Recognised content files present in the extract directory.
    pub fn available_contents(&self) -> Vec<GtfsContent> {
        GtfsContent::ALL
            .into_iter()
            .filter(|c| self.content_path(*c).is_file())
            .collect()
    }

    fn content_path(&self, content: GtfsContent) -> PathBuf {
        self.layout.unzip_dir.join(content.file_name())
    }

    /// Reads one table from the extract directory.
    ///
    /// An absent file is not an error: it is logged and `Ok(None)` comes back.
    pub fn load_table(&self, content: GtfsContent) -> Result<Option<GtfsTable>> {
        let path = self.content_path(content);
        if !path.is_file() {
            tracing::warn!(
                content = %content,
                dir = %self.layout.unzip_dir.display(),
                "The requested GTFS content is not available, check the source dataset"
            );
            return Ok(None);
        }
        GtfsTable::read(content, &path).map(Some)
    }

    /// Distinct values of `feature` across the region, in first-seen order.
    pub fn unique_values(&self, feature: GtfsFeature) -> Result<Vec<Value>> {
        let content = feature.content();
        let table = self
            .load_table(content)?
            .ok_or(GtfsError::MissingContent(content))?;
        table.unique(feature.column())
    }

    /// Geocodes `city`, then writes the part of the feed inside its
    /// boundary to `processed/city_gtfs/<region>/<city>/<date>/`.
    pub fn derive_city_subset(
        &mut self,
        city: &str,
        geocoder: &dyn Geocoder,
    ) -> Result<CitySubset> {
        let output_dir = self.layout.city_dir(
            &self.identity.region,
            city,
            &self.identity.publish_date,
        );
        self.city_dir = Some(output_dir.clone());
        fs::create_dir_all(&output_dir).map_err(|e| GtfsError::io(&output_dir, e))?;

        let boundary = geocoder.city_boundary(city)?;
        let tables = subset::write_city_subset(&self.layout.unzip_dir, &boundary, &output_dir)?;

        let stops = tables
            .iter()
            .find(|(content, _)| *content == GtfsContent::Stops)
            .map_or(0, |(_, rows)| *rows);
        tracing::info!(
            city,
            region = %self.identity.region,
            stops,
            tables = tables.len(),
            dest = %output_dir.display(),
            "Generated city-level GTFS"
        );

        Ok(CitySubset {
            city: city.to_string(),
            boundary,
            output_dir,
            tables,
        })
    }
}
