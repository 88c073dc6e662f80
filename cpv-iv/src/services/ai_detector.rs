//! AI-generation detection adapter
//!
//! Wraps the Sightengine `genai` model endpoint. The adapter is fail-open:
//! missing credentials, transport errors, API failure responses and
//! timeouts all degrade to a skipped signal so the decision proceeds on
//! the remaining evidence.

use crate::types::{AiDetector, AiSignal};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

const SIGHTENGINE_URL: &str = "https://api.sightengine.com/1.0/check.json";
const USER_AGENT: &str = "cpv/0.1.0 (civic photo validator)";

/// Sightengine response subset for the `genai` model.
#[derive(Debug, Deserialize)]
struct CheckResponse {
    status: String,
    #[serde(default)]
    error: Option<ApiFailure>,
    #[serde(rename = "type", default)]
    scores: Option<TypeScores>,
}

#[derive(Debug, Deserialize)]
struct ApiFailure {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TypeScores {
    #[serde(default)]
    ai_generated: f64,
}

/// Sightengine API client.
pub struct SightengineDetector {
    http_client: reqwest::Client,
    api_user: String,
    api_secret: String,
    threshold: f64,
}

impl SightengineDetector {
    pub fn new(
        api_user: String,
        api_secret: String,
        threshold: f64,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            api_user,
            api_secret,
            threshold,
        })
    }

    async fn check(&self, image_path: &Path) -> Result<AiSignal, String> {
        let bytes = tokio::fs::read(image_path)
            .await
            .map_err(|e| format!("read image: {}", e))?;
        let file_name = image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new()
            .text("api_user", self.api_user.clone())
            .text("api_secret", self.api_secret.clone())
            .text("models", "genai")
            .part("media", part);

        let response = self
            .http_client
            .post(SIGHTENGINE_URL)
            .multipart(form)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let http_status = response.status();
        if !http_status.is_success() {
            return Err(format!("HTTP {}", http_status));
        }

        let body: CheckResponse = response
            .json()
            .await
            .map_err(|e| format!("parse response: {}", e))?;

        if body.status == "failure" {
            return Err(body
                .error
                .and_then(|e| e.message)
                .unwrap_or_else(|| "unknown API error".to_string()));
        }

        let ai_probability = body.scores.unwrap_or_default().ai_generated;
        info!(
            ai_probability,
            threshold = self.threshold,
            "AI-generation check complete"
        );

        Ok(AiSignal {
            ai_probability,
            is_ai_generated: ai_probability >= self.threshold,
            skipped: false,
            error: None,
        })
    }
}

#[async_trait]
impl AiDetector for SightengineDetector {
    fn name(&self) -> &'static str {
        "sightengine"
    }

    async fn analyze(&self, image_path: &Path) -> AiSignal {
        match self.check(image_path).await {
            Ok(signal) => signal,
            Err(e) => {
                warn!(error = %e, "AI detection unavailable, proceeding without it");
                AiSignal::skipped(e)
            }
        }
    }
}

/// Stand-in used when no detector credentials are configured.
pub struct DisabledAiDetector;

#[async_trait]
impl AiDetector for DisabledAiDetector {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn analyze(&self, _image_path: &Path) -> AiSignal {
        AiSignal::skipped("AI detection credentials not configured")
    }
}

/// Deterministic detector for tests and offline development.
pub struct FixedAiDetector {
    pub signal: AiSignal,
}

#[async_trait]
impl AiDetector for FixedAiDetector {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn analyze(&self, _image_path: &Path) -> AiSignal {
        self.signal.clone()
    }
}
