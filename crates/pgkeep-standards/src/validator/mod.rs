//! Structure validation
//!
//! Applies the merged validation rule for a table plus the rule-independent
//! sequence and trigger checks, producing typed [`Finding`]s.

mod finding;
mod structure;


pub use finding::*;
pub use structure::*;
