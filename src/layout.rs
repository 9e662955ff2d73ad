// On-disk layout of raw and processed feeds.
//
//   <root>/raw/gtfs_zip/<region>/<date>/<region>_<date>.zip
//   <root>/raw/gtfs_unzip/<region>/<date>/<table>.txt
//   <root>/processed/city_gtfs/<region>/<city>/<date>/<table>.txt

use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_ROOT: &str = "data";

pub fn raw_zip_dir(root: &Path, region: &str, date: &str) -> PathBuf {
    root.join("raw").join("gtfs_zip").join(region).join(date)
}

pub fn raw_unzip_dir(root: &Path, region: &str, date: &str) -> PathBuf {
    root.join("raw").join("gtfs_unzip").join(region).join(date)
}

pub fn city_dir(root: &Path, region: &str, city: &str, date: &str) -> PathBuf {
    root.join("processed")
        .join("city_gtfs")
        .join(region)
        .join(city)
        .join(date)
}

pub fn archive_file_name(region: &str, date: &str) -> String {
    format!("{}_{}.zip", region, date)
}

/// The raw-stage directories of one (region, date) feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLayout {
    pub root: PathBuf,
    pub zip_dir: PathBuf,
    pub unzip_dir: PathBuf,
    pub archive_path: PathBuf,
}

impl FeedLayout {
    pub fn new(root: impl Into<PathBuf>, region: &str, date: &str) -> Self {
        let root = root.into();
        let zip_dir = raw_zip_dir(&root, region, date);
        let archive_path = zip_dir.join(archive_file_name(region, date));
        FeedLayout {
            unzip_dir: raw_unzip_dir(&root, region, date),
            zip_dir,
            archive_path,
            root,
        }
    }

    pub fn city_dir(&self, region: &str, city: &str, date: &str) -> PathBuf {
        city_dir(&self.root, region, city, date)
    }
}
