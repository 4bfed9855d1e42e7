//! Optional HTTPS listener material.
//!
//! Kiosk browsers only grant camera and microphone access on secure
//! origins, so the server also listens on `HTTPS_PORT` with a self-signed
//! certificate. When `cert.pem`/`key.pem` are missing from `CERTS_DIR` we
//! shell out to `openssl` once to create them. Any failure here disables
//! HTTPS with a warning; the plain HTTP listener is unaffected.

use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;
use tracing::{info, warn};

const CERT_FILE: &str = "cert.pem";
const KEY_FILE: &str = "key.pem";

#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("certificate I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("openssl failed: {0}")]
    Openssl(String),
}

/// Locations of the certificate pair inside a certs directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl CertPaths {
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self { cert: dir.join(CERT_FILE), key: dir.join(KEY_FILE) }
    }

    #[must_use]
    pub fn exist(&self) -> bool {
        self.cert.is_file() && self.key.is_file()
    }
}

/// Make sure a certificate pair exists, generating a self-signed one if not.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created or `openssl`
/// cannot be spawned, or `Openssl` if it exits unsuccessfully.
pub async fn ensure_self_signed(dir: &Path) -> Result<CertPaths, TlsError> {
    let paths = CertPaths::in_dir(dir);
    if paths.exist() {
        return Ok(paths);
    }

    tokio::fs::create_dir_all(dir).await?;
    info!(dir = %dir.display(), "generating self-signed certificate");
    let output = tokio::process::Command::new("openssl")
        .args(["req", "-x509", "-newkey", "rsa:4096", "-keyout"])
        .arg(&paths.key)
        .arg("-out")
        .arg(&paths.cert)
        .args(["-days", "365", "-nodes", "-subj", "/CN=localhost"])
        .output()
        .await?;

    if !output.status.success() {
        return Err(TlsError::Openssl(String::from_utf8_lossy(&output.stderr).trim().to_owned()));
    }
    info!("self-signed certificate generated");
    Ok(paths)
}

/// Prepare rustls config for the HTTPS listener, or `None` if unavailable.
pub async fn load_or_generate(dir: &Path) -> Option<RustlsConfig> {
    // Both ring (reqwest) and aws-lc-rs (axum-server) are linked; pick one.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let paths = match ensure_self_signed(dir).await {
        Ok(paths) => paths,
        Err(e) => {
            warn!(error = %e, "HTTPS disabled: no certificate available");
            return None;
        }
    };

    match RustlsConfig::from_pem_file(&paths.cert, &paths.key).await {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(error = %e, cert = %paths.cert.display(), "HTTPS disabled: certificate could not be loaded");
            None
        }
    }
}

#[cfg(test)]
#[path = "tls_test.rs"]
mod tests;
