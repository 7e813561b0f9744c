//! Deferred repair migrations
//!
//! Captures the tables that still need sequence or trigger repair into a
//! standalone SQL script that can be reviewed and applied later.

mod generator;


pub use generator::*;
