//! Repair engine
//!
//! Selective (per-table) and whole-database repair of sequences and
//! `updated_at` triggers, plus the event-trigger toggle.

mod cache;
mod engine;


pub use cache::*;
pub use engine::*;
