//! PostgreSQL TLS Support
//!
//! Maps `sslmode` strings onto tokio-postgres settings and builds the
//! native-tls connector used for encrypted connections.

use native_tls::{Certificate, Identity, TlsConnector as NativeTlsConnector};
use pgkeep_core::{PgKeepError, Result};
use postgres_native_tls::MakeTlsConnector;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// libpq-style `sslmode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    Disable,
    #[default]
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl SslMode {
    pub fn uses_tls(&self) -> bool {
        !matches!(self, SslMode::Disable)
    }

    pub(crate) fn to_pg(self) -> tokio_postgres::config::SslMode {
        match self {
            SslMode::Disable => tokio_postgres::config::SslMode::Disable,
            SslMode::Prefer => tokio_postgres::config::SslMode::Prefer,
            SslMode::Require | SslMode::VerifyCa | SslMode::VerifyFull => {
                tokio_postgres::config::SslMode::Require
            }
        }
    }
}

impl FromStr for SslMode {
    type Err = PgKeepError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "allow" | "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            "verify-ca" | "verify_ca" => Ok(SslMode::VerifyCa),
            "verify-full" | "verify_full" => Ok(SslMode::VerifyFull),
            other => Err(PgKeepError::Configuration(format!(
                "unknown sslmode '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SslMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SslMode::Disable => "disable",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
            SslMode::VerifyCa => "verify-ca",
            SslMode::VerifyFull => "verify-full",
        };
        f.write_str(s)
    }
}

/// Build a TLS connector for the given mode and optional certificates.
///
/// `require` without a CA certificate accepts any server certificate, like
/// libpq. `verify-ca` checks the chain but not the hostname.
pub fn build_tls_connector(
    mode: SslMode,
    ca_cert: Option<&Path>,
    client_cert: Option<&Path>,
    client_key: Option<&Path>,
) -> Result<MakeTlsConnector> {
    tracing::debug!(mode = %mode, "building PostgreSQL TLS connector");

    let mut builder = NativeTlsConnector::builder();

    if let Some(path) = ca_cert {
        let pem = read_file(path, "CA certificate")?;
        let cert = Certificate::from_pem(&pem).map_err(|e| {
            PgKeepError::Connection(format!("Failed to parse CA certificate: {}", e))
        })?;
        builder.add_root_certificate(cert);
    }

    if let (Some(cert_path), Some(key_path)) = (client_cert, client_key) {
        let cert = read_file(cert_path, "client certificate")?;
        let key = read_file(key_path, "client key")?;
        let identity = Identity::from_pkcs8(&cert, &key).map_err(|e| {
            PgKeepError::Connection(format!(
                "Failed to create identity from certificate and key: {}",
                e
            ))
        })?;
        builder.identity(identity);
    }

    builder.danger_accept_invalid_hostnames(matches!(
        mode,
        SslMode::Prefer | SslMode::Require | SslMode::VerifyCa
    ));
    builder.danger_accept_invalid_certs(
        matches!(mode, SslMode::Prefer | SslMode::Require) && ca_cert.is_none(),
    );

    let connector = builder
        .build()
        .map_err(|e| PgKeepError::Connection(format!("Failed to build TLS connector: {}", e)))?;
    Ok(MakeTlsConnector::new(connector))
}

fn read_file(path: &Path, what: &str) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| {
        PgKeepError::Connection(format!(
            "Failed to read {} from {}: {}",
            what,
            path.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests;
