//! Tests for PostgreSQL TLS support

use super::*;
use std::io::Write;
use tempfile::NamedTempFile;

// =============================================================================
// SSL Mode Parsing Tests
// =============================================================================

#[test]
fn test_ssl_mode_parse_known_values() {
    assert_eq!("disable".parse::<SslMode>().unwrap(), SslMode::Disable);
    assert_eq!("allow".parse::<SslMode>().unwrap(), SslMode::Prefer);
    assert_eq!("PREFER".parse::<SslMode>().unwrap(), SslMode::Prefer);
    assert_eq!("require".parse::<SslMode>().unwrap(), SslMode::Require);
    assert_eq!("verify_ca".parse::<SslMode>().unwrap(), SslMode::VerifyCa);
    assert_eq!("verify-full".parse::<SslMode>().unwrap(), SslMode::VerifyFull);
}

#[test]
fn test_ssl_mode_parse_rejects_unknown() {
    let err = "sometimes".parse::<SslMode>().unwrap_err();
    assert!(err.to_string().contains("unknown sslmode"));
}

#[test]
fn test_ssl_mode_display_round_trips() {
    for mode in [
        SslMode::Disable,
        SslMode::Prefer,
        SslMode::Require,
        SslMode::VerifyCa,
        SslMode::VerifyFull,
    ] {
        assert_eq!(mode.to_string().parse::<SslMode>().unwrap(), mode);
    }
    assert!(!SslMode::Disable.uses_tls());
    assert!(SslMode::Require.uses_tls());
}

// =============================================================================
// Connector Tests
// =============================================================================

#[test]
fn test_missing_ca_file_is_connection_error() {
    let result = build_tls_connector(
        SslMode::VerifyFull,
        Some(Path::new("/nonexistent/ca.pem")),
        None,
        None,
    );
    let err = result.err().expect("should fail to read CA file");
    assert!(err.to_string().contains("Failed to read CA certificate"));
}

#[test]
fn test_garbage_ca_file_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"not a certificate").unwrap();
    file.flush().unwrap();

    let result = build_tls_connector(SslMode::VerifyCa, Some(file.path()), None, None);
    let err = result.err().expect("should fail to parse CA file");
    assert!(err.to_string().contains("Failed to parse CA certificate"));
}
