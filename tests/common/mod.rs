//! Shared fixtures: a small three-table feed, as zip bytes.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use zip::write::FileOptions;

pub const TRIPS: &str = "route_id,service_id,trip_id\n\
    R10,WD,T1\n\
    R10,WD,T2\n\
    R20,WD,T3\n\
    R10,WE,T4\n\
    R20,WE,T5\n";

pub const ROUTES: &str = "route_id,agency_id,route_short_name,route_type\n\
    R10,HTM,1,0\n\
    R20,HTM,2,3\n";

pub const STOPS: &str = "stop_id,stop_name,stop_lat,stop_lon\n\
    S1,Centraal,52.0800,4.3240\n\
    S2,Spui,52.0770,4.3160\n\
    S3,Amsterdam Centraal,52.3780,4.9000\n\
    S4,Rotterdam Centraal,51.9250,4.4690\n";

pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in entries {
        zip.start_file(*name, FileOptions::default()).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn sample_feed() -> Vec<u8> {
    zip_bytes(&[("trips.txt", TRIPS), ("routes.txt", ROUTES), ("stops.txt", STOPS)])
}
