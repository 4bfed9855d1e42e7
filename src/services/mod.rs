//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and persistence concerns so route
//! handlers can stay focused on protocol translation and status mapping.

pub mod chat;
pub mod devices;
pub mod document;
pub mod erp;
pub mod notices;
pub mod notification;
pub mod retention;
pub mod signaling;
pub mod staff;

use rand::Rng;
use rand::distr::Alphanumeric;

/// Reject empty or whitespace-only required text fields.
pub(crate) fn require<'a>(value: &'a str, field: &'static str) -> Result<&'a str, &'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() { Err(field) } else { Ok(trimmed) }
}

/// Lowercase alphanumeric suffix used in generated ids and file names.
pub(crate) fn random_suffix(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}
