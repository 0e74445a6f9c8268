//! # dailytodo Shared Library
//!
//! Domain types, storage and quota enforcement used by the dailytodo API
//! server.
//!
//! ## Module Organization
//!
//! - `clock`: Time source and calendar-day bucketing
//! - `db`: PostgreSQL pool and migrations
//! - `locks`: Per-user admission locks
//! - `models`: User and task records
//! - `quota`: Daily task quota enforcement
//! - `store`: Storage traits with in-memory and PostgreSQL backends

pub mod clock;
pub mod db;
pub mod locks;
pub mod models;
pub mod quota;
pub mod store;

/// Current version of the dailytodo shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
