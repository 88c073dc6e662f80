//! Database access for cpv-iv
//!
//! Query modules over the shared schema created by `cpv_common::db::init`.

pub mod hashes;
pub mod validations;
