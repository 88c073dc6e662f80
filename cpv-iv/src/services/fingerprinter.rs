//! Perceptual image fingerprinting
//!
//! Produces a fixed-width 64-bit DCT mean hash (8x8), robust to minor
//! recompression and resizing: visually identical content yields identical
//! or near-identical bit patterns, unrelated images differ in roughly half
//! their bits.

use cpv_common::{Error, Result};
use image_hasher::{HashAlg, Hasher, HasherConfig, ImageHash};
use std::fmt;
use std::path::Path;

/// Fixed fingerprint width in bits.
pub const FINGERPRINT_BITS: u32 = 64;

/// A perceptual fingerprint with base64 wire conversions.
#[derive(Clone)]
pub struct Fingerprint(ImageHash);

impl Fingerprint {
    /// Decode the stored (base64) representation. `None` for corrupt data.
    pub fn from_base64(s: &str) -> Option<Self> {
        ImageHash::from_base64(s).ok().map(Self)
    }

    pub fn to_base64(&self) -> String {
        self.0.to_base64()
    }

    /// Hamming distance to another fingerprint of the same width.
    pub fn distance(&self, other: &Fingerprint) -> u32 {
        self.0.dist(&other.0)
    }
}

impl PartialEq for Fingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes() == other.0.as_bytes()
    }
}

impl Eq for Fingerprint {}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_base64())
    }
}

/// Computes perceptual fingerprints for images.
pub struct Fingerprinter {
    hasher: Hasher,
}

impl Fingerprinter {
    pub fn new() -> Self {
        // DCT preprocessing + mean hash is the classic pHash configuration.
        let hasher = HasherConfig::new()
            .hash_size(8, 8)
            .hash_alg(HashAlg::Mean)
            .preproc_dct()
            .to_hasher();
        Self { hasher }
    }

    /// Fingerprint an image already decoded in memory.
    pub fn fingerprint(&self, image: &image::DynamicImage) -> Fingerprint {
        Fingerprint(self.hasher.hash_image(image))
    }

    /// Decode and fingerprint an image file.
    ///
    /// An unreadable or undecodable file is invalid input to the whole
    /// request, not a degraded signal.
    pub fn fingerprint_file(&self, path: &Path) -> Result<Fingerprint> {
        let image = image::open(path).map_err(|e| {
            Error::InvalidInput(format!("unreadable image {}: {}", path.display(), e))
        })?;
        Ok(self.fingerprint(&image))
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}
