//! TLS certificate loading for the listener.

use std::io;
use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

use crate::config::TlsConfig;

fn require_file(path: &Path, what: &str) -> io::Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} not found: {}", what, path.display()),
        ))
    }
}

/// Load the PEM certificate chain and private key named by `config`.
pub async fn load_tls_config(config: &TlsConfig) -> io::Result<RustlsConfig> {
    require_file(Path::new(&config.cert_path), "Certificate file")?;
    require_file(Path::new(&config.key_path), "Private key file")?;

    RustlsConfig::from_pem_file(&config.cert_path, &config.key_path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_certificate_is_not_found() {
        let config = TlsConfig {
            cert_path: "/nonexistent/gateway-cert.pem".into(),
            key_path: "/nonexistent/gateway-key.pem".into(),
        };
        let err = load_tls_config(&config).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().contains("gateway-cert.pem"));
    }
}
