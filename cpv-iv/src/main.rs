//! cpv-iv - Image Validation Microservice
//!
//! Decides whether a submitted photograph of a civic issue is authentic
//! evidence worth accepting into the complaint record: AI-generation
//! likelihood, embedded capture metadata and GPS plausibility,
//! perceptual-hash duplicate detection against resolved complaints, and
//! content/category match, folded into one accept/reject verdict.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use cpv_iv::config::{ValidationConfig, VisionMode};
use cpv_iv::services::ai_detector::{DisabledAiDetector, SightengineDetector};
use cpv_iv::services::content_classifier::{GeminiVisionClassifier, MockVisionClassifier};
use cpv_iv::services::ValidationPipeline;
use cpv_iv::types::{AiDetector, VisionClassifier};
use cpv_iv::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting cpv-iv (Image Validation) microservice");
    info!("Port: 5730");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Resolve root folder and configuration
    let root_folder = cpv_common::config::resolve_root_folder();
    cpv_common::config::ensure_root_folder(&root_folder)?;
    let toml_config = cpv_common::config::load_toml_config();
    let config = ValidationConfig::resolve(&toml_config);

    // Open or create database
    let db_path = cpv_common::config::database_path(&root_folder);
    info!("Database: {}", db_path.display());
    let db = cpv_common::db::init_database(&db_path).await?;
    info!("Database connection established");

    // Wire the external adapters; missing credentials select the
    // fail-open stand-ins instead of failing startup
    let ai_detector: Arc<dyn AiDetector> = if config.has_sightengine_credentials() {
        let user = config.sightengine_api_user.clone().unwrap_or_default();
        let secret = config.sightengine_api_secret.clone().unwrap_or_default();
        Arc::new(SightengineDetector::new(
            user,
            secret,
            config.ai_generation_threshold,
            config.adapter_timeout(),
        )?)
    } else {
        warn!("Sightengine credentials not configured, AI detection disabled");
        Arc::new(DisabledAiDetector)
    };

    let vision_classifier: Arc<dyn VisionClassifier> = match config.vision_mode {
        VisionMode::Gemini => match &config.gemini_api_key {
            Some(key) => Arc::new(GeminiVisionClassifier::new(
                key.clone(),
                config.gemini_model.clone(),
                config.adapter_timeout(),
            )?),
            None => Arc::new(MockVisionClassifier),
        },
        VisionMode::Mock => Arc::new(MockVisionClassifier),
    };
    info!(classifier = vision_classifier.name(), "content classifier selected");

    // Create application state
    let pipeline = Arc::new(ValidationPipeline::new(
        db.clone(),
        &config,
        ai_detector,
        vision_classifier,
    ));
    let state = AppState::new(db, pipeline);

    // Build router
    let app = cpv_iv::build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind("127.0.0.1:5730").await?;
    info!("Listening on http://127.0.0.1:5730");
    info!("Health check: http://127.0.0.1:5730/health");

    axum::serve(listener, app).await?;

    Ok(())
}
