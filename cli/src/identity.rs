//! Device identity and durable local settings.
//!
//! The settings file is the agent's only local storage: device id, display
//! name, server URL and whether first-run setup finished. It is read once at
//! startup into a [`DeviceIdentity`] that is then passed explicitly to the
//! sync engine, poller and call session. Nothing re-reads the file mid-run.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::random_base36;
use crate::source::DataSource;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3001";

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("device is not set up; run `floorboard-agent setup` first")]
    NotConfigured,
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("Could not connect to server. Please check the URL and try again.")]
    ServerUnreachable,
    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persisted agent settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    #[serde(default)]
    pub setup_complete: bool,
}

impl LocalSettings {
    /// Load settings from `path`. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, IdentityError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write settings to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), IdentityError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    #[must_use]
    pub fn server_url(&self) -> &str {
        self.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }
}

/// Who this device is and where its server lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub device_id: String,
    pub device_name: String,
    pub server_url: String,
}

impl DeviceIdentity {
    /// Build the identity from completed settings.
    ///
    /// # Errors
    ///
    /// Returns `NotConfigured` if setup never finished or the id is missing.
    pub fn from_settings(settings: &LocalSettings) -> Result<Self, IdentityError> {
        if !settings.setup_complete {
            return Err(IdentityError::NotConfigured);
        }
        let device_id = settings.device_id.clone().ok_or(IdentityError::NotConfigured)?;
        Ok(Self {
            device_name: settings.device_name.clone().unwrap_or_else(|| device_id.clone()),
            device_id,
            server_url: settings.server_url().to_owned(),
        })
    }

    /// Identity used when running against fixtures without setup.
    #[must_use]
    pub fn preview() -> Self {
        Self {
            device_id: "preview".to_owned(),
            device_name: "Preview Kiosk".to_owned(),
            server_url: DEFAULT_SERVER_URL.to_owned(),
        }
    }
}

/// Generate a device id: `device_{ms}_{7 base-36 chars}`.
#[must_use]
pub fn generate_device_id(now_ms: i64) -> String {
    format!("device_{now_ms}_{}", random_base36(7))
}

/// First-run setup for a kiosk.
///
/// Probes the server through `source`; only when it answers is an id
/// generated, persisted, and registered. Nothing is written on failure.
///
/// # Errors
///
/// Returns `InvalidInput` for blank arguments, `ServerUnreachable` if the
/// health probe fails, or an I/O error if settings cannot be saved.
pub async fn setup(
    source: &dyn DataSource,
    settings_path: &Path,
    server_url: &str,
    device_name: &str,
    now_ms: i64,
) -> Result<DeviceIdentity, IdentityError> {
    let server_url = server_url.trim();
    let device_name = device_name.trim();
    if server_url.is_empty() {
        return Err(IdentityError::InvalidInput("Please enter a server URL"));
    }
    if device_name.is_empty() {
        return Err(IdentityError::InvalidInput("Please enter a device name"));
    }

    if !source.health().await {
        warn!(server_url, "setup health check failed");
        return Err(IdentityError::ServerUnreachable);
    }

    let device_id = generate_device_id(now_ms);
    let mut settings = LocalSettings {
        device_id: Some(device_id.clone()),
        device_name: Some(device_name.to_owned()),
        server_url: Some(server_url.to_owned()),
        setup_complete: false,
    };
    settings.save(settings_path)?;

    if let Err(e) = source.register_device(&device_id, device_name).await {
        warn!(error = %e, %device_id, "device registration failed during setup");
    }

    settings.setup_complete = true;
    settings.save(settings_path)?;
    info!(%device_id, device_name, server_url, "device setup complete");
    DeviceIdentity::from_settings(&settings)
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
