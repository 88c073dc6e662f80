//! Decision engine
//!
//! Folds all authenticity signals gathered for one image into a single
//! accept/reject verdict with a confidence score and an ordered set of
//! reason codes. `decide` is a pure function of its inputs: identical
//! signals always produce the identical decision.

use crate::types::{Decision, ReasonCode, SignalSet, ValidationStatus};
use tracing::{info, warn};

/// Policy knobs consumed by the fold. Immutable, injected at construction,
/// never read from ambient state during a decision.
#[derive(Debug, Clone, Copy)]
pub struct DecisionPolicy {
    /// Reject outright when the image carries no capture metadata at all
    /// (no GPS, no timestamp, no camera make).
    pub strict_exif_required: bool,
    /// Allowed radius between image GPS and the claimed location, km.
    /// Also scales the location-mismatch penalty.
    pub location_radius_km: f64,
}

/// Fold all signals into the final verdict.
///
/// Evaluation order is fixed and defines the reason-code ordering:
/// 1. AI generation (critical)
/// 2. Duplicate of a resolved complaint (critical)
/// 3. Strict-EXIF requirement (critical, only when configured)
/// 4. GPS presence / plausibility (warnings, skipped once rejected;
///    the two location codes are mutually exclusive)
/// 5. Content/category match (warning)
pub fn decide(signals: &SignalSet, policy: &DecisionPolicy) -> Decision {
    let mut reason_codes: Vec<ReasonCode> = Vec::new();
    let mut status = ValidationStatus::Accepted;

    if signals.ai.is_ai_generated {
        reason_codes.push(ReasonCode::AiGenerated);
        status = ValidationStatus::Rejected;
        warn!(
            ai_probability = signals.ai.ai_probability,
            "image rejected: AI-generated"
        );
    }

    if signals.hash.is_duplicate {
        reason_codes.push(ReasonCode::ResubmittedImage);
        status = ValidationStatus::Rejected;
        warn!(
            original_issue_id = ?signals.hash.original_issue_id,
            "image rejected: duplicate of resolved complaint"
        );
    }

    if policy.strict_exif_required && !signals.exif.has_any_metadata() {
        reason_codes.push(ReasonCode::NoExifData);
        status = ValidationStatus::Rejected;
        warn!("image rejected: no capture metadata (strict mode)");
    }

    if status != ValidationStatus::Rejected {
        if !signals.exif.has_gps {
            reason_codes.push(ReasonCode::LocationNotAvailable);
        } else if signals.exif.location_valid == Some(false) {
            // GPS present but outside the allowed radius. An unknown
            // plausibility (no claimed location) fires neither code.
            reason_codes.push(ReasonCode::LocationMismatch);
        }
    }

    if !signals.issue_match.is_match {
        reason_codes.push(ReasonCode::ImageIssueMismatch);
    }

    let confidence_score = confidence_score(signals, policy, &reason_codes);
    let message = compose_message(status, &reason_codes);

    debug_assert_eq!(
        status == ValidationStatus::Rejected,
        reason_codes.iter().any(|c| c.is_critical()),
        "rejection must coincide with a critical reason code"
    );

    info!(
        status = %status,
        confidence = confidence_score,
        codes = ?reason_codes,
        "validation decision"
    );

    Decision {
        status,
        reason_codes,
        confidence_score,
        message,
        signals: signals.clone(),
    }
}

/// Confidence starts at 1.0; every reason code present applies an
/// independent deduction; the sum is clamped to 0.0-1.0. Deductions are
/// additive, so their order never changes the result.
fn confidence_score(signals: &SignalSet, policy: &DecisionPolicy, reason_codes: &[ReasonCode]) -> f64 {
    let mut score = 1.0_f64;

    for code in reason_codes {
        score -= match code {
            ReasonCode::AiGenerated => signals.ai.ai_probability,
            ReasonCode::ResubmittedImage => 0.7 * signals.hash.similarity_score,
            ReasonCode::NoExifData => 0.9,
            ReasonCode::LocationNotAvailable => 0.15,
            ReasonCode::LocationMismatch => {
                location_mismatch_penalty(signals.exif.distance_km, policy.location_radius_km)
            }
            ReasonCode::ImageIssueMismatch => 0.10,
        };
    }

    score.clamp(0.0, 1.0)
}

/// Scales with how far outside the allowed radius the photo was taken,
/// capped at 0.25. Falls back to a flat 0.15 when the distance is unknown.
fn location_mismatch_penalty(distance_km: Option<f64>, max_allowed_km: f64) -> f64 {
    match distance_km {
        Some(distance) if max_allowed_km > 0.0 => (distance / max_allowed_km * 0.1).min(0.25),
        _ => 0.15,
    }
}

fn compose_message(status: ValidationStatus, reason_codes: &[ReasonCode]) -> String {
    match status {
        ValidationStatus::Accepted => "Image validation passed.".to_string(),
        ValidationStatus::Rejected => reason_codes
            .iter()
            .map(|code| code.explanation())
            .collect::<Vec<_>>()
            .join(" | "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AiSignal, ExifSignal, GeoPoint, HashSignal, IssueMatchSignal};

    fn policy() -> DecisionPolicy {
        DecisionPolicy {
            strict_exif_required: false,
            location_radius_km: 10.0,
        }
    }

    /// A fully clean submission: genuine photo, GPS inside the radius,
    /// unique fingerprint, matching content.
    fn clean_signals() -> SignalSet {
        SignalSet {
            ai: AiSignal {
                ai_probability: 0.02,
                is_ai_generated: false,
                skipped: false,
                error: None,
            },
            exif: ExifSignal {
                has_gps: true,
                coordinates: Some(GeoPoint {
                    latitude: 26.9124,
                    longitude: 75.7873,
                }),
                location_valid: Some(true),
                distance_km: Some(0.4),
                timestamp: Some(
                    chrono::NaiveDateTime::parse_from_str(
                        "2025:12:13 16:42:17",
                        "%Y:%m:%d %H:%M:%S",
                    )
                    .unwrap(),
                ),
                camera_make: Some("Nothing".to_string()),
                camera_model: Some("A059".to_string()),
                address: None,
            },
            hash: HashSignal {
                phash: "JJlmzJkzZg".to_string(),
                is_duplicate: false,
                similarity_score: 0.0,
                original_issue_id: None,
                distance: 0,
            },
            issue_match: IssueMatchSignal {
                is_match: true,
                expected_type: "garbage".to_string(),
                detected_type: Some("garbage".to_string()),
                confidence: 0.85,
                skipped: false,
                error: None,
            },
        }
    }

    #[test]
    fn clean_submission_is_accepted_at_full_confidence() {
        let decision = decide(&clean_signals(), &policy());
        assert_eq!(decision.status, ValidationStatus::Accepted);
        assert!(decision.reason_codes.is_empty());
        assert_eq!(decision.confidence_score, 1.0);
        assert_eq!(decision.message, "Image validation passed.");
    }

    #[test]
    fn ai_generated_image_is_rejected() {
        // AI probability 0.95 over a 0.8 threshold
        let mut signals = clean_signals();
        signals.ai.ai_probability = 0.95;
        signals.ai.is_ai_generated = true;

        let decision = decide(&signals, &policy());
        assert_eq!(decision.status, ValidationStatus::Rejected);
        assert_eq!(decision.reason_codes, vec![ReasonCode::AiGenerated]);
        assert!(decision.confidence_score <= 0.05 + 1e-9);
        assert!(decision.message.contains("AI-generated"));
    }

    #[test]
    fn missing_gps_is_a_warning_only() {
        let mut signals = clean_signals();
        signals.exif = ExifSignal {
            timestamp: signals.exif.timestamp,
            camera_make: signals.exif.camera_make.clone(),
            camera_model: signals.exif.camera_model.clone(),
            ..ExifSignal::default()
        };

        let decision = decide(&signals, &policy());
        assert_eq!(decision.status, ValidationStatus::Accepted);
        assert_eq!(decision.reason_codes, vec![ReasonCode::LocationNotAvailable]);
        assert!((decision.confidence_score - 0.85).abs() < 1e-9);
        assert_eq!(decision.message, "Image validation passed.");
    }

    #[test]
    fn location_mismatch_penalty_scales_with_distance() {
        // 50 km away with a 10 km radius: min(0.25, 50/10 * 0.1) = 0.25
        let mut signals = clean_signals();
        signals.exif.location_valid = Some(false);
        signals.exif.distance_km = Some(50.0);

        let decision = decide(&signals, &policy());
        assert_eq!(decision.status, ValidationStatus::Accepted);
        assert_eq!(decision.reason_codes, vec![ReasonCode::LocationMismatch]);
        assert!((decision.confidence_score - 0.75).abs() < 1e-9);
    }

    #[test]
    fn location_mismatch_without_distance_uses_flat_penalty() {
        let mut signals = clean_signals();
        signals.exif.location_valid = Some(false);
        signals.exif.distance_km = None;

        let decision = decide(&signals, &policy());
        assert!((decision.confidence_score - 0.85).abs() < 1e-9);
    }

    #[test]
    fn location_codes_are_mutually_exclusive() {
        // No GPS: only LOCATION_NOT_AVAILABLE, never LOCATION_MISMATCH
        let mut signals = clean_signals();
        signals.exif.has_gps = false;
        signals.exif.coordinates = None;
        signals.exif.location_valid = Some(false);

        let decision = decide(&signals, &policy());
        assert_eq!(decision.reason_codes, vec![ReasonCode::LocationNotAvailable]);
    }

    #[test]
    fn unknown_plausibility_fires_no_location_code() {
        // GPS present but no claimed location to compare against
        let mut signals = clean_signals();
        signals.exif.location_valid = None;
        signals.exif.distance_km = None;

        let decision = decide(&signals, &policy());
        assert!(decision.reason_codes.is_empty());
        assert_eq!(decision.confidence_score, 1.0);
    }

    #[test]
    fn duplicate_image_is_rejected_with_scaled_penalty() {
        // Hash distance 3 at threshold 5: similarity (5-3)/5 = 0.4
        let mut signals = clean_signals();
        signals.hash.is_duplicate = true;
        signals.hash.similarity_score = 0.4;
        signals.hash.distance = 3;
        signals.hash.original_issue_id = Some("GG-2025-001".to_string());

        let decision = decide(&signals, &policy());
        assert_eq!(decision.status, ValidationStatus::Rejected);
        assert_eq!(decision.reason_codes, vec![ReasonCode::ResubmittedImage]);
        // 1.0 - 0.7 * 0.4 = 0.72
        assert!((decision.confidence_score - 0.72).abs() < 1e-9);
        assert!(decision.message.contains("already been submitted"));
    }

    #[test]
    fn strict_mode_rejects_bare_images() {
        let mut signals = clean_signals();
        signals.exif = ExifSignal::default();

        let strict = DecisionPolicy {
            strict_exif_required: true,
            location_radius_km: 10.0,
        };
        let decision = decide(&signals, &strict);
        assert_eq!(decision.status, ValidationStatus::Rejected);
        // Rejection suppresses the GPS-presence warning
        assert_eq!(decision.reason_codes, vec![ReasonCode::NoExifData]);
        assert!((decision.confidence_score - 0.1).abs() < 1e-9);
    }

    #[test]
    fn strict_mode_off_keeps_bare_images_acceptable() {
        let mut signals = clean_signals();
        signals.exif = ExifSignal::default();

        let decision = decide(&signals, &policy());
        assert_eq!(decision.status, ValidationStatus::Accepted);
        assert_eq!(decision.reason_codes, vec![ReasonCode::LocationNotAvailable]);
    }

    #[test]
    fn content_mismatch_is_a_warning() {
        let mut signals = clean_signals();
        signals.issue_match.is_match = false;

        let decision = decide(&signals, &policy());
        assert_eq!(decision.status, ValidationStatus::Accepted);
        assert_eq!(decision.reason_codes, vec![ReasonCode::ImageIssueMismatch]);
        assert!((decision.confidence_score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn confidence_is_clamped_under_stacked_deductions() {
        let mut signals = clean_signals();
        signals.ai.ai_probability = 1.0;
        signals.ai.is_ai_generated = true;
        signals.hash.is_duplicate = true;
        signals.hash.similarity_score = 1.0;
        signals.issue_match.is_match = false;

        let decision = decide(&signals, &policy());
        assert_eq!(decision.status, ValidationStatus::Rejected);
        assert_eq!(decision.confidence_score, 0.0);
    }

    #[test]
    fn rejected_iff_critical_code_present() {
        // Warnings only: accepted
        let mut warnings_only = clean_signals();
        warnings_only.exif.has_gps = false;
        warnings_only.exif.coordinates = None;
        warnings_only.exif.location_valid = None;
        warnings_only.issue_match.is_match = false;
        let decision = decide(&warnings_only, &policy());
        assert_eq!(decision.status, ValidationStatus::Accepted);
        assert!(decision.reason_codes.iter().all(|c| !c.is_critical()));

        // Any critical: rejected
        let mut critical = clean_signals();
        critical.hash.is_duplicate = true;
        critical.hash.similarity_score = 1.0;
        let decision = decide(&critical, &policy());
        assert_eq!(decision.status, ValidationStatus::Rejected);
        assert!(decision.reason_codes.iter().any(|c| c.is_critical()));
    }

    #[test]
    fn rejection_skips_location_warnings() {
        let mut signals = clean_signals();
        signals.ai.is_ai_generated = true;
        signals.ai.ai_probability = 0.9;
        signals.exif.has_gps = false;
        signals.exif.coordinates = None;
        signals.exif.location_valid = None;

        let decision = decide(&signals, &policy());
        assert_eq!(decision.reason_codes, vec![ReasonCode::AiGenerated]);
    }

    #[test]
    fn rejected_message_concatenates_explanations() {
        let mut signals = clean_signals();
        signals.ai.is_ai_generated = true;
        signals.ai.ai_probability = 0.9;
        signals.issue_match.is_match = false;

        let decision = decide(&signals, &policy());
        assert!(decision.message.contains(" | "));
        assert!(decision.message.contains("AI-generated"));
        assert!(decision.message.contains("correct category"));
    }

    #[test]
    fn decision_is_deterministic() {
        let signals = clean_signals();
        let first = decide(&signals, &policy());
        let second = decide(&signals, &policy());
        assert_eq!(first, second);
    }
}
