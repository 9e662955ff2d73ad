// HTTP download of feed archives.

use reqwest::blocking;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use crate::error::{GtfsError, Result};

pub const DEFAULT_USER_AGENT: &str = concat!("regional_gtfs/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Client settings shared by the feed download and the geocoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout: Duration,
    pub chunk_size: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpSettings {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

pub fn create_http_client(settings: &HttpSettings) -> Result<blocking::Client> {
    let client = blocking::Client::builder()
        .timeout(settings.timeout)
        .user_agent(settings.user_agent.as_str())
        .build()?;
    Ok(client)
}

/// Streams the body of `url` into `dest` `chunk_size` bytes at a time.
///
/// Returns the number of bytes written. A failure part-way through leaves
/// the truncated file in place.
pub fn download_to(
    client: &blocking::Client,
    url: &str,
    dest: &Path,
    chunk_size: usize,
) -> Result<u64> {
    let mut response = client.get(url).send()?;

    if !response.status().is_success() {
        return Err(GtfsError::HttpStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let mut file = fs::File::create(dest).map_err(|e| GtfsError::io(dest, e))?;
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut written = 0u64;

    loop {
        let n = response.read(&mut buf).map_err(|e| GtfsError::io(dest, e))?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(|e| GtfsError::io(dest, e))?;
        written += n as u64;
    }

    file.flush().map_err(|e| GtfsError::io(dest, e))?;
    tracing::debug!(url, bytes = written, dest = %dest.display(), "Download finished");
    Ok(written)
}
