//! Packaged SQL routines
//!
//! The scripts ship inside the binary. A directory override lets operators
//! substitute their own versions; every script must then be present.

use pgkeep_core::{PgKeepError, Result, SqlAsset};
use std::collections::HashMap;
use std::path::Path;

const UPDATE_UPDATED_AT_COLUMN: &str = include_str!("../sql/update_updated_at_column.sql");
const FIX_DB: &str = include_str!("../sql/fix_db.sql");
const AUTO_APPLY_STANDARDS: &str = include_str!("../sql/auto_apply_standards.sql");

/// The set of SQL scripts the maintenance layer runs verbatim
#[derive(Debug, Clone)]
pub struct SqlAssets {
    scripts: HashMap<SqlAsset, String>,
}

impl SqlAssets {
    /// Scripts compiled into the binary
    pub fn embedded() -> Self {
        let scripts = SqlAsset::ALL
            .iter()
            .map(|asset| {
                let text = match asset {
                    SqlAsset::UpdatedAtFunction => UPDATE_UPDATED_AT_COLUMN,
                    SqlAsset::FixDb => FIX_DB,
                    SqlAsset::AutoApplyStandards => AUTO_APPLY_STANDARDS,
                };
                (*asset, text.to_string())
            })
            .collect();
        Self { scripts }
    }

    /// Load every script from `dir`.
    ///
    /// A missing file is reported as `MissingAsset`; callers treat this as a
    /// broken installation and abort before touching the database.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut scripts = HashMap::new();
        for asset in SqlAsset::ALL {
            let path = dir.join(asset.file_name());
            if !path.is_file() {
                return Err(PgKeepError::MissingAsset(path.display().to_string()));
            }
            let text = std::fs::read_to_string(&path)?;
            tracing::debug!(file = %path.display(), "loaded SQL asset");
            scripts.insert(asset, text);
        }
        Ok(Self { scripts })
    }

    /// Embedded scripts, or the directory override when one is configured
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        match dir {
            Some(dir) => Self::from_dir(dir),
            None => Ok(Self::embedded()),
        }
    }

    /// Script text for an asset
    pub fn get(&self, asset: SqlAsset) -> Result<&str> {
        self.scripts
            .get(&asset)
            .map(String::as_str)
            .ok_or_else(|| PgKeepError::MissingAsset(asset.file_name().to_string()))
    }
}

impl Default for SqlAssets {
    fn default() -> Self {
        Self::embedded()
    }
}
