//! Helper settings
//!
//! Settings come from built-in defaults, an optional TOML file and then
//! `POSTGRES_HELPER_*` environment overrides, in that order.

mod config;

#[cfg(test)]
mod tests;

pub use config::*;
