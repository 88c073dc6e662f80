//! Content/category classification adapter
//!
//! Determines whether the photographed scene is consistent with the issue
//! category the reporter declared. The production implementation queries
//! the Gemini `generateContent` endpoint with a structured-JSON prompt;
//! a deterministic mock serves development and tests. Which one runs is a
//! configuration choice, and the decision engine only ever sees the
//! normalized `IssueMatchSignal`.

use crate::types::{IssueMatchSignal, ValidationRequest, VisionClassifier};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const USER_AGENT: &str = "cpv/0.1.0 (civic photo validator)";

/// Map the reporter-facing category to the vision vocabulary the
/// classifier reasons in.
pub fn expected_vision_category(user_issue_type: &str) -> &'static str {
    match user_issue_type {
        "electricity" => "streetlight",
        "garbage" => "garbage",
        "roads" => "pothole",
        "water" => "water_leak",
        "drainage" => "sewage_overflow",
        "infrastructure" => "road_damage",
        "others" => "public_safety_other",
        _ => "unknown",
    }
}

/// Verdict on whether the detected issue matches the declared category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Match,
    PartialMatch,
    Mismatch,
}

/// Overall flag the provider attaches to its analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalFlag {
    ValidIssue,
    ImageIssueMismatch,
    InsufficientVisualEvidence,
}

/// Structured analysis contract returned by the vision provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionAnalysis {
    pub visual_summary: String,
    #[serde(default)]
    pub detected_objects: Vec<String>,
    pub issue_type_detected: String,
    pub issue_match_status: MatchStatus,
    pub severity: String,
    /// Provider confidence, 0-100.
    pub confidence_score: f64,
    pub final_flag: FinalFlag,
    #[serde(default)]
    pub reasoning: String,
}

impl VisionAnalysis {
    /// Normalize to the decision-engine signal: a boolean match verdict
    /// and a 0.0-1.0 score.
    pub fn into_signal(self, expected_type: &str) -> IssueMatchSignal {
        let confidence = (self.confidence_score / 100.0).clamp(0.0, 1.0);

        let mut base = match self.issue_match_status {
            MatchStatus::Match => 1.0,
            MatchStatus::PartialMatch => 0.7,
            MatchStatus::Mismatch => 0.3,
        };
        match self.final_flag {
            FinalFlag::ImageIssueMismatch => base *= 0.5,
            FinalFlag::InsufficientVisualEvidence => base = 0.5,
            FinalFlag::ValidIssue => {}
        }

        let is_match = !(self.final_flag == FinalFlag::ImageIssueMismatch
            || self.issue_match_status == MatchStatus::Mismatch);

        IssueMatchSignal {
            is_match,
            expected_type: expected_type.to_string(),
            detected_type: Some(self.issue_type_detected),
            confidence: base * confidence,
            skipped: false,
            error: None,
        }
    }
}

// ============================================================================
// Gemini implementation
// ============================================================================

/// Gemini Vision API client.
pub struct GeminiVisionClassifier {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiVisionClassifier {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            api_key,
            model,
        })
    }

    fn build_prompt(request: &ValidationRequest) -> String {
        let expected = expected_vision_category(&request.issue_type);
        let mut context = format!("User reported issue type: {}", request.issue_type);
        if let Some(location) = request.claimed_location {
            context.push_str(&format!(
                "\nReported location: ({}, {})",
                location.latitude, location.longitude
            ));
        }
        if let Some(description) = &request.description {
            context.push_str(&format!("\nUser description: {}", description));
        }

        format!(
            "You are an expert civic issue analyst. Analyze this image and extract \
             structured information.\n\n\
             CONTEXT:\n{context}\n\
             Expected vision category: {expected}\n\n\
             CONTROLLED ISSUE TYPES:\n\
             - streetlight (street lights, lamp posts, lighting issues)\n\
             - garbage (trash, waste, litter, dumps)\n\
             - pothole (holes in roads, road cracks)\n\
             - water_leak (water leaks, pipe bursts, tap leaks)\n\
             - sewage_overflow (sewage, drainage overflow, sewer issues)\n\
             - road_damage (damaged roads, pavement issues)\n\
             - drain_block (blocked drains, clogged gutters)\n\
             - public_safety_other (other safety hazards)\n\
             - unknown (cannot determine)\n\n\
             ANALYSIS RULES:\n\
             1. Describe ONLY what is visible - no assumptions\n\
             2. If image is unclear/dark/blurry, lower confidence\n\
             3. If no civic issue visible, mark as \"unknown\"\n\
             4. Compare detected issue with user-reported type\n\
             5. Assess severity: LOW (minor), MEDIUM (functional problem), HIGH (safety risk)\n\
             6. Be conservative - accuracy over optimism\n\n\
             MATCH STATUS RULES:\n\
             - MATCH: Detected issue matches user report\n\
             - PARTIAL_MATCH: Related but not exact\n\
             - MISMATCH: Completely different issue or no issue visible\n\n\
             FINAL FLAG RULES:\n\
             - VALID_ISSUE: Clear civic issue visible that matches or partially matches\n\
             - IMAGE_ISSUE_MISMATCH: Image shows different issue or no issue\n\
             - INSUFFICIENT_VISUAL_EVIDENCE: Image too unclear to determine\n\n\
             Return ONLY valid JSON (no markdown, no code blocks):\n\
             {{\n\
               \"visual_summary\": \"Brief factual description of what is visible\",\n\
               \"detected_objects\": [\"object1\", \"object2\"],\n\
               \"issue_type_detected\": \"one of the controlled types above\",\n\
               \"issue_match_status\": \"MATCH or PARTIAL_MATCH or MISMATCH\",\n\
               \"severity\": \"LOW or MEDIUM or HIGH\",\n\
               \"confidence_score\": 0,\n\
               \"final_flag\": \"VALID_ISSUE or IMAGE_ISSUE_MISMATCH or INSUFFICIENT_VISUAL_EVIDENCE\",\n\
               \"reasoning\": \"Brief explanation of the decision\"\n\
             }}"
        )
    }

    async fn classify(&self, request: &ValidationRequest) -> Result<VisionAnalysis, String> {
        let bytes = tokio::fs::read(&request.image_path)
            .await
            .map_err(|e| format!("read image: {}", e))?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);

        let body = serde_json::json!({
            "contents": [{
                "parts": [
                    { "text": Self::build_prompt(request) },
                    { "inline_data": { "mime_type": mime_for(&request.image_path), "data": encoded } }
                ]
            }]
        });

        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_BASE_URL, self.model, self.api_key
        );

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let http_status = response.status();
        if !http_status.is_success() {
            return Err(format!("HTTP {}", http_status));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| format!("parse response: {}", e))?;

        let text = value["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| "response carried no text part".to_string())?;

        serde_json::from_str(strip_code_fences(text))
            .map_err(|e| format!("malformed analysis JSON: {}", e))
    }
}

#[async_trait]
impl VisionClassifier for GeminiVisionClassifier {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn analyze(&self, request: &ValidationRequest) -> IssueMatchSignal {
        match self.classify(request).await {
            Ok(analysis) => {
                info!(
                    detected = %analysis.issue_type_detected,
                    status = ?analysis.issue_match_status,
                    confidence = analysis.confidence_score,
                    "vision analysis complete"
                );
                analysis.into_signal(&request.issue_type)
            }
            Err(e) => {
                warn!(error = %e, "vision analysis unavailable, proceeding without it");
                IssueMatchSignal::skipped(&request.issue_type, e)
            }
        }
    }
}

fn mime_for(path: &std::path::Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    }
}

/// Providers occasionally wrap the JSON in markdown code fences despite
/// instructions.
fn strip_code_fences(text: &str) -> &str {
    let mut t = text.trim();
    if let Some(rest) = t.strip_prefix("```json") {
        t = rest;
    } else if let Some(rest) = t.strip_prefix("```") {
        t = rest;
    }
    if let Some(rest) = t.strip_suffix("```") {
        t = rest;
    }
    t.trim()
}

// ============================================================================
// Mock implementation
// ============================================================================

/// Deterministic classifier used when no vision provider is configured.
/// Serves one canned, realistic analysis per category.
pub struct MockVisionClassifier;

impl MockVisionClassifier {
    fn canned_analysis(user_issue_type: &str) -> VisionAnalysis {
        let (summary, objects, detected, severity, confidence, reasoning) = match user_issue_type {
            "roads" => (
                "Damaged road surface with multiple potholes and cracks; weathered \
                 asphalt with loose stones and debris around the damaged area.",
                vec!["pothole", "damaged_asphalt", "road_surface", "loose_stones"],
                "pothole",
                "HIGH",
                92.0,
                "Significant road damage visible that poses safety risk to vehicles",
            ),
            "electricity" => (
                "Non-functioning streetlight in a dark alley; the fixture shows \
                 signs of damage or malfunction.",
                vec!["streetlight", "led_fixture", "electrical_pole"],
                "streetlight",
                "MEDIUM",
                78.0,
                "Non-functioning streetlight identified in area requiring illumination",
            ),
            "water" => (
                "Water leakage from a pipe connection with visible accumulation and \
                 wet surfaces indicating an ongoing leak.",
                vec!["water_leak", "pipe", "wet_surface"],
                "water_leak",
                "HIGH",
                88.0,
                "Active water leak detected causing water wastage and potential damage",
            ),
            "drainage" => (
                "Blocked drainage with water stagnation and debris accumulation \
                 around the drain cover.",
                vec!["blocked_drain", "stagnant_water", "debris"],
                "drain_block",
                "MEDIUM",
                82.0,
                "Drainage blockage identified with water stagnation issues",
            ),
            // "garbage" and anything unrecognized
            _ => (
                "Two garbage bins on a concrete surface with scattered plastic \
                 bottles and loose waste around a painted curb.",
                vec!["garbage_bins", "plastic_bottles", "concrete_surface"],
                "garbage",
                "MEDIUM",
                85.0,
                "Clear garbage overflow issue visible with scattered waste around bins",
            ),
        };

        VisionAnalysis {
            visual_summary: summary.to_string(),
            detected_objects: objects.into_iter().map(String::from).collect(),
            issue_type_detected: detected.to_string(),
            issue_match_status: MatchStatus::Match,
            severity: severity.to_string(),
            confidence_score: confidence,
            final_flag: FinalFlag::ValidIssue,
            reasoning: reasoning.to_string(),
        }
    }
}

#[async_trait]
impl VisionClassifier for MockVisionClassifier {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn analyze(&self, request: &ValidationRequest) -> IssueMatchSignal {
        let analysis = Self::canned_analysis(&request.issue_type);
        info!(
            detected = %analysis.issue_type_detected,
            confidence = analysis.confidence_score,
            "mock vision analysis"
        );
        analysis.into_signal(&request.issue_type)
    }
}

/// Fixed-output classifier for tests.
pub struct FixedVisionClassifier {
    pub is_match: bool,
    pub confidence: f64,
}

#[async_trait]
impl VisionClassifier for FixedVisionClassifier {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn analyze(&self, request: &ValidationRequest) -> IssueMatchSignal {
        IssueMatchSignal {
            is_match: self.is_match,
            expected_type: request.issue_type.clone(),
            detected_type: None,
            confidence: self.confidence,
            skipped: false,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(status: MatchStatus, flag: FinalFlag, confidence: f64) -> VisionAnalysis {
        VisionAnalysis {
            visual_summary: String::new(),
            detected_objects: vec![],
            issue_type_detected: "garbage".to_string(),
            issue_match_status: status,
            severity: "MEDIUM".to_string(),
            confidence_score: confidence,
            final_flag: flag,
            reasoning: String::new(),
        }
    }

    #[test]
    fn clean_match_normalizes_to_full_score() {
        let signal =
            analysis(MatchStatus::Match, FinalFlag::ValidIssue, 85.0).into_signal("garbage");
        assert!(signal.is_match);
        assert!((signal.confidence - 0.85).abs() < 1e-9);
        assert_eq!(signal.detected_type.as_deref(), Some("garbage"));
    }

    #[test]
    fn partial_match_scales_base_score() {
        let signal =
            analysis(MatchStatus::PartialMatch, FinalFlag::ValidIssue, 100.0).into_signal("roads");
        assert!(signal.is_match);
        assert!((signal.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn mismatch_is_not_a_match() {
        let signal =
            analysis(MatchStatus::Mismatch, FinalFlag::ValidIssue, 90.0).into_signal("roads");
        assert!(!signal.is_match);
        assert!((signal.confidence - 0.27).abs() < 1e-9);
    }

    #[test]
    fn mismatch_flag_halves_score_and_fails_match() {
        let signal = analysis(MatchStatus::Match, FinalFlag::ImageIssueMismatch, 80.0)
            .into_signal("garbage");
        assert!(!signal.is_match);
        assert!((signal.confidence - 0.4).abs() < 1e-9);
    }

    #[test]
    fn insufficient_evidence_is_neutral_base() {
        let signal =
            analysis(MatchStatus::Mismatch, FinalFlag::InsufficientVisualEvidence, 40.0)
                .into_signal("water");
        // Insufficient evidence never fails the match on its own
        assert!(!signal.is_match); // mismatch status still fails it
        assert!((signal.confidence - 0.2).abs() < 1e-9);
    }

    #[test]
    fn match_status_serde_wire_format() {
        assert_eq!(
            serde_json::to_string(&MatchStatus::PartialMatch).unwrap(),
            "\"PARTIAL_MATCH\""
        );
        let flag: FinalFlag = serde_json::from_str("\"INSUFFICIENT_VISUAL_EVIDENCE\"").unwrap();
        assert_eq!(flag, FinalFlag::InsufficientVisualEvidence);
    }

    #[test]
    fn analysis_json_parses_with_code_fences() {
        let raw = "```json\n{\"visual_summary\":\"s\",\"issue_type_detected\":\"pothole\",\
                   \"issue_match_status\":\"MATCH\",\"severity\":\"HIGH\",\
                   \"confidence_score\":92,\"final_flag\":\"VALID_ISSUE\"}\n```";
        let analysis: VisionAnalysis = serde_json::from_str(strip_code_fences(raw)).unwrap();
        assert_eq!(analysis.issue_type_detected, "pothole");
        assert_eq!(analysis.issue_match_status, MatchStatus::Match);
    }

    #[test]
    fn category_mapping() {
        assert_eq!(expected_vision_category("electricity"), "streetlight");
        assert_eq!(expected_vision_category("roads"), "pothole");
        assert_eq!(expected_vision_category("unheard-of"), "unknown");
    }

    #[tokio::test]
    async fn mock_classifier_is_deterministic() {
        let classifier = MockVisionClassifier;
        let request = ValidationRequest {
            image_path: "/tmp/photo.jpg".into(),
            issue_type: "roads".to_string(),
            issue_id: None,
            claimed_location: None,
            description: None,
        };
        let first = classifier.analyze(&request).await;
        let second = classifier.analyze(&request).await;
        assert_eq!(first, second);
        assert!(first.is_match);
        assert!((first.confidence - 0.92).abs() < 1e-9);
    }
}
