//! Validation services
//!
//! Local analysis (fingerprinting, hash matching, decision fold) and
//! external-collaborator adapters (AI detection, content classification,
//! reverse geocoding), orchestrated by the validation pipeline.

pub mod ai_detector;
pub mod content_classifier;
pub mod decision_engine;
pub mod fingerprinter;
pub mod geocoder;
pub mod hash_store;
pub mod validation_pipeline;

pub use decision_engine::{decide, DecisionPolicy};
pub use fingerprinter::{Fingerprint, Fingerprinter};
pub use hash_store::{HashMatch, HashStore};
pub use validation_pipeline::{ValidationOutcome, ValidationPipeline};
