//! pgkeep Standards - schema validation, repair and health scoring
//!
//! This crate holds the logic of the helper:
//! - Rule matching of table names against configured glob patterns
//! - Structure validation producing typed findings
//! - Idempotent sequence and trigger repair, per table or database-wide
//! - Five independent health checks and their aggregate score
//! - Timing and per-operation statistics
//! - Generation of deferred repair migrations

mod engine;
mod error;
pub mod health;
pub mod migration;
pub mod repair;
pub mod rules;
pub mod settings;
pub mod timing;
pub mod validator;

pub use engine::*;
pub use error::*;
pub use health::*;
pub use migration::*;
pub use repair::*;
pub use rules::*;
pub use settings::*;
pub use timing::*;
pub use validator::*;
