//! HTTP API for cpv-iv

pub mod hashes;
pub mod health;
pub mod validate;
pub mod validations;

pub use hashes::hash_routes;
pub use health::health_routes;
pub use validate::validate_routes;
pub use validations::validation_routes;
