//! # CPV Common Library
//!
//! Shared code for the Civic Photo Validator services:
//! - Error taxonomy
//! - Configuration and root folder resolution
//! - Database initialization and row models

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
