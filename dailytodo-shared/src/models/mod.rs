//! Database models
//!
//! Each model carries its own SQL for the PostgreSQL backend. The in-memory
//! backend reuses the same structs.
//!
//! # Models
//!
//! - `user`: task owners and their daily quota
//! - `task`: todo items, bucketed by creation day

pub mod task;
pub mod user;
