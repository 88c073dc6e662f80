//! Capture-metadata extractors

pub mod exif_extractor;
pub mod geo;

pub use exif_extractor::ExifExtractor;
