//! Core signal types and adapter traits for the validation engine.
//!
//! Every authenticity signal consumed by the decision engine is defined
//! here, together with the traits that external analysis providers
//! implement. Adapters are fail-open: instead of propagating provider
//! failures they return a neutral signal marked `skipped`, which must not
//! influence the decision.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Immutable input to one validation run.
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    /// Reference to the already-stored image (upload/storage is handled
    /// upstream of this service).
    pub image_path: PathBuf,
    /// Issue category declared by the reporter (e.g. "garbage", "roads").
    pub issue_type: String,
    /// Complaint identifier, when the image is attached to one.
    pub issue_id: Option<String>,
    /// Location the reporter claims to be at.
    pub claimed_location: Option<GeoPoint>,
    /// Free-text description, forwarded to the content classifier.
    pub description: Option<String>,
}

/// AI-generation detector output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiSignal {
    /// Probability the image is synthetic, 0.0-1.0.
    pub ai_probability: f64,
    /// Probability met or exceeded the configured threshold.
    pub is_ai_generated: bool,
    /// Signal could not be obtained; must not influence the decision.
    pub skipped: bool,
    pub error: Option<String>,
}

impl AiSignal {
    /// Neutral signal used when the detector is unavailable.
    pub fn skipped(error: impl Into<String>) -> Self {
        Self {
            ai_probability: 0.0,
            is_ai_generated: false,
            skipped: true,
            error: Some(error.into()),
        }
    }
}

/// Address enrichment from the reverse geocoder. Cosmetic only: it lands
/// in the audit record but plays no part in the decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub formatted: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postcode: Option<String>,
}

/// Embedded capture metadata extracted from the image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExifSignal {
    pub has_gps: bool,
    pub coordinates: Option<GeoPoint>,
    /// `None` when no claimed location was supplied: plausibility is
    /// unknown, which is not the same as invalid.
    pub location_valid: Option<bool>,
    /// Great-circle distance between image GPS and claimed location, km.
    pub distance_km: Option<f64>,
    /// Capture timestamp from the EXIF datetime fields.
    pub timestamp: Option<NaiveDateTime>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub address: Option<Address>,
}

impl ExifSignal {
    /// True when any capture metadata is present (GPS, timestamp or camera
    /// make). Strict mode rejects images where this is false.
    pub fn has_any_metadata(&self) -> bool {
        self.has_gps || self.timestamp.is_some() || self.camera_make.is_some()
    }
}

/// Perceptual-hash duplicate search result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HashSignal {
    /// Fingerprint of the submitted image (base64).
    pub phash: String,
    /// At least one resolved record lies within the distance threshold.
    pub is_duplicate: bool,
    /// Closest match similarity, 0.0-1.0. Zero when no match.
    pub similarity_score: f64,
    /// Issue the closest match belongs to.
    pub original_issue_id: Option<String>,
    /// Hamming distance of the closest match. Zero when no match.
    pub distance: u32,
}

/// Content/category match, normalized from the vision adapter output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueMatchSignal {
    /// The photographed scene is consistent with the declared category.
    pub is_match: bool,
    pub expected_type: String,
    pub detected_type: Option<String>,
    /// Normalized match score, 0.0-1.0.
    pub confidence: f64,
    pub skipped: bool,
    pub error: Option<String>,
}

impl IssueMatchSignal {
    /// Neutral signal used when the classifier is unavailable. `is_match`
    /// stays true so the mismatch warning never fires on missing evidence.
    pub fn skipped(expected_type: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            is_match: true,
            expected_type: expected_type.into(),
            detected_type: None,
            confidence: 0.5,
            skipped: true,
            error: Some(error.into()),
        }
    }
}

/// Severity class of a reason code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Forces rejection.
    Critical,
    /// Lowers confidence only.
    Warning,
}

/// Symbolic flag explaining why confidence was reduced or a submission
/// rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    AiGenerated,
    ResubmittedImage,
    NoExifData,
    LocationNotAvailable,
    LocationMismatch,
    ImageIssueMismatch,
}

impl ReasonCode {
    pub fn severity(&self) -> Severity {
        match self {
            ReasonCode::AiGenerated | ReasonCode::ResubmittedImage | ReasonCode::NoExifData => {
                Severity::Critical
            }
            ReasonCode::LocationNotAvailable
            | ReasonCode::LocationMismatch
            | ReasonCode::ImageIssueMismatch => Severity::Warning,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.severity() == Severity::Critical
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::AiGenerated => "AI_GENERATED",
            ReasonCode::ResubmittedImage => "RESUBMITTED_IMAGE",
            ReasonCode::NoExifData => "NO_EXIF_DATA",
            ReasonCode::LocationNotAvailable => "LOCATION_NOT_AVAILABLE",
            ReasonCode::LocationMismatch => "LOCATION_MISMATCH",
            ReasonCode::ImageIssueMismatch => "IMAGE_ISSUE_MISMATCH",
        }
    }

    /// User-facing explanation, composed into the decision message.
    pub fn explanation(&self) -> &'static str {
        match self {
            ReasonCode::AiGenerated => {
                "This image appears to be AI-generated or synthetic. \
                 Please upload a genuine photograph of the issue."
            }
            ReasonCode::ResubmittedImage => {
                "This image has already been submitted for a resolved complaint. \
                 Please upload a new photo."
            }
            ReasonCode::NoExifData => {
                "This image does not contain capture metadata. Please upload a photo \
                 taken directly from your camera with location services enabled. \
                 Note: WhatsApp and social media images are not accepted."
            }
            ReasonCode::LocationNotAvailable => {
                "No GPS data found in the image. For verification, please ensure \
                 location services are enabled when taking photos."
            }
            ReasonCode::LocationMismatch => {
                "The GPS location in the image does not match your reported location. \
                 This may indicate the photo was taken elsewhere."
            }
            ReasonCode::ImageIssueMismatch => {
                "The image content may not match the selected issue type. \
                 Please verify you've selected the correct category."
            }
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final verdict classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Accepted,
    Rejected,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Accepted => "accepted",
            ValidationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All signals gathered for one image, input to the decision fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSet {
    pub ai: AiSignal,
    pub exif: ExifSignal,
    pub hash: HashSignal,
    pub issue_match: IssueMatchSignal,
}

/// Final verdict for one validation run. Immutable once produced; the
/// pipeline persists it verbatim as an audit record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub status: ValidationStatus,
    /// Insertion order equals evaluation order; no duplicates.
    pub reason_codes: Vec<ReasonCode>,
    /// Clamped to 0.0-1.0.
    pub confidence_score: f64,
    /// Human-readable summary of the verdict.
    pub message: String,
    /// The exact inputs the verdict was derived from.
    pub signals: SignalSet,
}

/// AI-generation detector adapter.
///
/// Implementations never fail the request: any provider trouble yields a
/// signal with `skipped = true`.
#[async_trait::async_trait]
pub trait AiDetector: Send + Sync {
    /// Adapter name for logging and provenance.
    fn name(&self) -> &'static str;

    async fn analyze(&self, image_path: &Path) -> AiSignal;
}

/// Content/category classification adapter. Same fail-open contract as
/// [`AiDetector`].
#[async_trait::async_trait]
pub trait VisionClassifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn analyze(&self, request: &ValidationRequest) -> IssueMatchSignal;
}
