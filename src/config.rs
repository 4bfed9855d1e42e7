//! Server configuration parsed from environment variables.
//!
//! Every knob has a default so a bare `floorboard` invocation serves a
//! working kiosk backend on the local network. The ERP proxy is the only
//! feature that needs a secret; without `ERP_API_KEY` its endpoints answer
//! with the error-shaped empty payloads.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HTTP_PORT: u16 = 3001;
pub const DEFAULT_HTTPS_PORT: u16 = 3443;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://floorboard.db?mode=rwc";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_UPLOADS_DIR: &str = "uploads/pdfs";
pub const DEFAULT_CERTS_DIR: &str = "certs";
pub const DEFAULT_PDF_MAX_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_SIGNALING_RETENTION_SECS: u64 = 5 * 60;
pub const DEFAULT_ERP_BASE_URL: &str = "https://integrasystems.fulcrumpro.com/api";
pub const DEFAULT_ERP_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_RETENTION_DAYS: u64 = 0;
pub const DEFAULT_RETENTION_SWEEP_SECS: u64 = 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErpConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub http_port: u16,
    pub https_port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub uploads_dir: PathBuf,
    pub certs_dir: PathBuf,
    pub pdf_max_bytes: usize,
    pub signaling_retention: Duration,
    /// `None` disables the ERP proxy.
    pub erp: Option<ErpConfig>,
    /// Age after which devices, chat messages and notifications are pruned.
    /// `None` keeps them forever.
    pub retention: Option<Duration>,
    pub retention_sweep: Duration,
}

impl ServerConfig {
    /// Build config from the process environment.
    ///
    /// - `HTTP_PORT` / `HTTPS_PORT`: listener ports (3001 / 3443)
    /// - `DATABASE_URL`: SQLite URL (`sqlite://floorboard.db?mode=rwc`)
    /// - `DB_MAX_CONNECTIONS`: pool size (5)
    /// - `UPLOADS_DIR`, `CERTS_DIR`: on-disk locations
    /// - `PDF_MAX_BYTES`: upload limit (10 MiB)
    /// - `SIGNALING_RETENTION_SECS`: signaling backlog expiry (300)
    /// - `ERP_API_KEY`, `ERP_BASE_URL`, `ERP_TIMEOUT_SECS`: ERP proxy
    /// - `RETENTION_DAYS`: prune stale rows after N days (0 = never)
    /// - `RETENTION_SWEEP_SECS`: sweeper period (3600)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let erp = parse("ERP_API_KEY").map(|api_key| ErpConfig {
            base_url: parse("ERP_BASE_URL")
                .unwrap_or_else(|| DEFAULT_ERP_BASE_URL.to_owned())
                .trim_end_matches('/')
                .to_owned(),
            api_key,
            timeout: Duration::from_secs(parse_or(&parse, "ERP_TIMEOUT_SECS", DEFAULT_ERP_TIMEOUT_SECS)),
        });

        let retention_days = parse_or(&parse, "RETENTION_DAYS", DEFAULT_RETENTION_DAYS);
        let retention = (retention_days > 0).then(|| Duration::from_secs(retention_days * 24 * 60 * 60));

        Self {
            http_port: parse_or(&parse, "HTTP_PORT", DEFAULT_HTTP_PORT),
            https_port: parse_or(&parse, "HTTPS_PORT", DEFAULT_HTTPS_PORT),
            database_url: parse("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned()),
            db_max_connections: parse_or(&parse, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            uploads_dir: PathBuf::from(parse("UPLOADS_DIR").unwrap_or_else(|| DEFAULT_UPLOADS_DIR.to_owned())),
            certs_dir: PathBuf::from(parse("CERTS_DIR").unwrap_or_else(|| DEFAULT_CERTS_DIR.to_owned())),
            pdf_max_bytes: parse_or(&parse, "PDF_MAX_BYTES", DEFAULT_PDF_MAX_BYTES),
            signaling_retention: Duration::from_secs(parse_or(
                &parse,
                "SIGNALING_RETENTION_SECS",
                DEFAULT_SIGNALING_RETENTION_SECS,
            )),
            erp,
            retention,
            retention_sweep: Duration::from_secs(parse_or(&parse, "RETENTION_SWEEP_SECS", DEFAULT_RETENTION_SWEEP_SECS)),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_or<T, P>(parse: &P, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    P: Fn(&str) -> Option<String>,
{
    parse(key)
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
