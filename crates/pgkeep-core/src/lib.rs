//! pgkeep Core - Core abstractions and traits for the maintenance helper
//!
//! This crate provides the fundamental traits and types that all other
//! pgkeep crates depend on. It defines:
//!
//! - `Connection` - Trait for database connections
//! - `Catalog` - Read-only access to catalog metadata
//! - `Maintenance` - The small set of mutating statements the helper issues
//! - Common types like `Value`, `Row`, `QueryResult`, etc.

mod catalog;
mod connection;
mod error;
mod sql;
mod types;


pub use catalog::*;
pub use connection::*;
pub use error::*;
pub use sql::*;
pub use types::*;
