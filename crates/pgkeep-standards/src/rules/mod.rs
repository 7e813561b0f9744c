//! Table validation rules and glob matching
//!
//! Rules are keyed by a glob pattern over table names. Every rule whose
//! pattern matches a table contributes to the merged rule for that table.

mod matcher;


pub use matcher::*;
