//! EXIF capture-metadata extractor
//!
//! Reads embedded GPS coordinates, capture timestamp and camera identity
//! from an image, then scores location plausibility against the reporter's
//! claimed position. Missing or malformed metadata is treated as absence,
//! never as an extraction failure: plenty of legitimate photos (screenshots
//! aside) arrive stripped of EXIF.

use crate::extractors::geo::haversine_km;
use crate::types::{ExifSignal, GeoPoint};
use chrono::NaiveDateTime;
use exif::{Exif, In, Rational, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, warn};

/// Capture-time fields in priority order: original capture time first,
/// then the generic datetime, then digitized time.
const TIMESTAMP_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTime, Tag::DateTimeDigitized];

/// EXIF datetime fields are fixed-width `YYYY:MM:DD HH:MM:SS`.
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

#[derive(Debug, Clone, Copy)]
pub struct ExifExtractor {
    /// Allowed radius between image GPS and claimed location, km.
    radius_km: f64,
}

impl ExifExtractor {
    pub fn new(radius_km: f64) -> Self {
        Self { radius_km }
    }

    /// Extract capture metadata and location plausibility for one image.
    ///
    /// Never fails: an image without EXIF (or with a malformed block)
    /// yields a signal with everything absent.
    pub fn extract(&self, image_path: &Path, claimed: Option<GeoPoint>) -> ExifSignal {
        let exif = match read_exif(image_path) {
            Some(exif) => exif,
            None => {
                debug!(path = %image_path.display(), "no EXIF data in image");
                return ExifSignal::default();
            }
        };

        let coordinates = extract_gps(&exif);
        let timestamp = extract_timestamp(&exif);
        let camera_make = ascii_field(&exif, Tag::Make);
        let camera_model = ascii_field(&exif, Tag::Model);

        // Plausibility is only defined when both positions are known.
        let (distance_km, location_valid) = match (coordinates, claimed) {
            (Some(image_coords), Some(user_coords)) => {
                let distance = haversine_km(image_coords, user_coords);
                if distance > self.radius_km {
                    warn!(
                        distance_km = distance,
                        radius_km = self.radius_km,
                        "image GPS outside allowed radius of claimed location"
                    );
                }
                (Some(distance), Some(distance <= self.radius_km))
            }
            _ => (None, None),
        };

        ExifSignal {
            has_gps: coordinates.is_some(),
            coordinates,
            location_valid,
            distance_km,
            timestamp,
            camera_make,
            camera_model,
            address: None,
        }
    }
}

fn read_exif(path: &Path) -> Option<Exif> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    exif::Reader::new().read_from_container(&mut reader).ok()
}

fn extract_gps(exif: &Exif) -> Option<GeoPoint> {
    let latitude = dms_field(exif, Tag::GPSLatitude)?;
    let longitude = dms_field(exif, Tag::GPSLongitude)?;

    // Hemisphere references default to N/E when absent.
    let latitude = match ascii_field(exif, Tag::GPSLatitudeRef).as_deref() {
        Some("S") => -latitude,
        _ => latitude,
    };
    let longitude = match ascii_field(exif, Tag::GPSLongitudeRef).as_deref() {
        Some("W") => -longitude,
        _ => longitude,
    };

    Some(GeoPoint {
        latitude,
        longitude,
    })
}

fn dms_field(exif: &Exif, tag: Tag) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Rational(triple) => dms_to_degrees(triple),
        _ => None,
    }
}

/// Convert a degrees/minutes/seconds rational triple to decimal degrees.
pub fn dms_to_degrees(triple: &[Rational]) -> Option<f64> {
    if triple.len() < 3 {
        return None;
    }
    let degrees = rational_to_f64(triple[0])?;
    let minutes = rational_to_f64(triple[1])?;
    let seconds = rational_to_f64(triple[2])?;
    Some(degrees + minutes / 60.0 + seconds / 3600.0)
}

fn rational_to_f64(r: Rational) -> Option<f64> {
    if r.denom == 0 {
        return None;
    }
    Some(r.num as f64 / r.denom as f64)
}

fn extract_timestamp(exif: &Exif) -> Option<NaiveDateTime> {
    for tag in TIMESTAMP_TAGS {
        let Some(raw) = ascii_field(exif, tag) else {
            continue;
        };
        match NaiveDateTime::parse_from_str(&raw, EXIF_DATETIME_FORMAT) {
            Ok(timestamp) => return Some(timestamp),
            Err(e) => debug!(tag = ?tag, raw = %raw, "unparseable EXIF timestamp: {}", e),
        }
    }
    None
}

fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(parts) if !parts.is_empty() => {
            let s = String::from_utf8_lossy(&parts[0]);
            let s = s.trim_end_matches('\0').trim();
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        }
        _ => None,
    }
}
