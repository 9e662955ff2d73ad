// Error taxonomy shared by every pipeline stage.

use std::path::PathBuf;
use thiserror::Error;

use crate::content::GtfsContent;

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug, Error)]
pub enum GtfsError {
    /// Transport-level failure (DNS, connection, TLS, body read).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Download of {url} failed with status: {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("File error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive is not a readable zip file.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// An archive entry whose name would land outside the extract directory.
    #[error("Archive entry escapes the extract directory: {0}")]
    UnsafeEntry(String),

    #[error("Parse error in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Line {line} of {} has {found} fields, header has {expected}", .path.display())]
    TooManyFields {
        path: PathBuf,
        line: u64,
        found: usize,
        expected: usize,
    },

    #[error("Unsupported GTFS feature: {0} (expected one of route_id, trip_id, service_id, route_type, agency_id, stop_id)")]
    UnsupportedFeature(String),

    #[error("Unknown GTFS content: {0}")]
    UnknownContent(String),

    #[error("GTFS content {0} is not available in the extracted dataset")]
    MissingContent(GtfsContent),

    #[error("Column {column} not found in {content}")]
    MissingColumn { content: GtfsContent, column: String },

    #[error("No boundary found for place: {0}")]
    PlaceNotFound(String),

    #[error("Geocoder error: {0}")]
    Geocoder(String),
}

impl GtfsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GtfsError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        GtfsError::Csv {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, GtfsError>;
