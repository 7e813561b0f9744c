//! PostgreSQL adapter for pgkeep
//!
//! Connection handling, the catalog/maintenance implementation and the
//! packaged SQL routines.

mod assets;
mod catalog;
mod connection;
mod maintenance;
mod tls;

pub use assets::SqlAssets;
pub use catalog::PgCatalog;
pub use connection::{ConnectionOptions, PostgresConnection};
pub use tls::{SslMode, build_tls_connector};
