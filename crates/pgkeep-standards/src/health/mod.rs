//! Health scoring
//!
//! Five independent checks (sequences, triggers, structure, performance,
//! indexes), each scored 0-100, and their aggregate.

mod checker;
mod scoring;


pub use checker::*;
pub use scoring::*;
