//! Shared wire model for the floorboard server and device agent.
//!
//! This crate owns the JSON representation exchanged over `/api/*`. Request
//! bodies and most records are camelCase. [`Device`] and [`Notification`]
//! are the exception: they are returned as stored rows, so their keys are
//! the snake_case column names (`last_seen`, `from_device`, ...) the kiosk
//! shell reads.
//!
//! The synchronized document stays loosely typed (`serde_json::Map`): its
//! content is application configuration the server never interprets. Only
//! the two metadata fields are modeled explicitly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod erp;
pub mod staff;

/// Header carrying the pushing device's id on `POST /api/state`.
pub const DEVICE_ID_HEADER: &str = "x-device-id";

/// Metadata key stamped by the server: write time in epoch milliseconds.
pub const LAST_MODIFIED_KEY: &str = "lastModified";

/// Metadata key stamped by the server: id of the writing device.
pub const MODIFIED_BY_KEY: &str = "modifiedBy";

/// Error returned when parsing a tag string into one of the wire enums.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WireError {
    #[error("unknown signaling message type: {0}")]
    UnknownSignalKind(String),
}

// =============================================================================
// SHARED STATE DOCUMENT
// =============================================================================

/// The single synchronized application document.
///
/// `content` is everything except the server-stamped metadata. Devices never
/// set `last_modified`/`modified_by` themselves; the server overwrites them
/// on every push.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedStateDocument {
    #[serde(flatten)]
    pub content: Map<String, Value>,
    #[serde(rename = "lastModified", default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,
    #[serde(rename = "modifiedBy", default, skip_serializing_if = "Option::is_none")]
    pub modified_by: Option<String>,
}

impl SharedStateDocument {
    /// Build an unstamped document from raw content, dropping any metadata
    /// keys a caller may have left in it.
    #[must_use]
    pub fn from_content(mut content: Map<String, Value>) -> Self {
        strip_metadata(&mut content);
        Self { content, last_modified: None, modified_by: None }
    }

    /// Return a copy of this document stamped with server metadata.
    #[must_use]
    pub fn stamped(&self, last_modified: i64, modified_by: &str) -> Self {
        Self {
            content: self.content.clone(),
            last_modified: Some(last_modified),
            modified_by: Some(modified_by.to_owned()),
        }
    }

    /// Write timestamp, `0` when the document was never stamped.
    #[must_use]
    pub fn last_modified_or_zero(&self) -> i64 {
        self.last_modified.unwrap_or(0)
    }
}

/// Remove server-owned metadata keys from a raw document body.
pub fn strip_metadata(content: &mut Map<String, Value>) {
    content.remove(LAST_MODIFIED_KEY);
    content.remove(MODIFIED_BY_KEY);
}

/// Response body of `POST /api/state`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushStateResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,
}

// =============================================================================
// GENERIC RESPONSES
// =============================================================================

/// `{ "success": bool }` acknowledgement used by most write endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// `GET /api/health` body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// RFC 3339 server time.
    pub timestamp: String,
}

/// Error body returned with 4xx/5xx statuses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// =============================================================================
// DEVICES
// =============================================================================

/// A known kiosk device, keyed by column name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    /// Epoch milliseconds of the last register/rename.
    pub last_seen: i64,
    /// Epoch milliseconds of first registration.
    pub created_at: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceRequest {
    pub device_id: String,
    pub device_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameDeviceRequest {
    pub device_name: String,
}

// =============================================================================
// CHAT MESSAGES
// =============================================================================

/// Device-to-device chat message. Immutable once stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub from: String,
    pub to: String,
    pub text: String,
    /// Sender-assigned epoch milliseconds.
    pub timestamp: i64,
}

/// `GET /api/messages` body, newest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessagesResponse {
    pub messages: Vec<ChatMessage>,
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Notification type tag. Unknown tags are preserved verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    Message,
    Call,
    Other(String),
}

impl NotificationKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Message => "message",
            Self::Call => "call",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for NotificationKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "message" => Self::Message,
            "call" => Self::Call,
            _ => Self::Other(tag),
        }
    }
}

impl From<&str> for NotificationKind {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_owned())
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        match kind {
            NotificationKind::Other(tag) => tag,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable device-to-device event record, keyed by column name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub to_device: String,
    pub from_device: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    #[serde(default)]
    pub message: Option<String>,
    /// Opaque payload, e.g. a call offer descriptor.
    #[serde(default)]
    pub data: Option<Value>,
    pub read: bool,
    pub created_at: i64,
}

/// `POST /api/notifications` body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationRequest {
    pub to_device: String,
    pub from_device: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationResponse {
    pub success: bool,
    pub notification_id: String,
}

// =============================================================================
// SIGNALING
// =============================================================================

/// WebRTC handshake / call-control message type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
    CallRequest,
    CallAccept,
    CallReject,
    CallEnd,
}

impl SignalKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::IceCandidate => "ice-candidate",
            Self::CallRequest => "call-request",
            Self::CallAccept => "call-accept",
            Self::CallReject => "call-reject",
            Self::CallEnd => "call-end",
        }
    }
}

impl FromStr for SignalKind {
    type Err = WireError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "offer" => Ok(Self::Offer),
            "answer" => Ok(Self::Answer),
            "ice-candidate" => Ok(Self::IceCandidate),
            "call-request" => Ok(Self::CallRequest),
            "call-accept" => Ok(Self::CallAccept),
            "call-reject" => Ok(Self::CallReject),
            "call-end" => Ok(Self::CallEnd),
            other => Err(WireError::UnknownSignalKind(other.to_owned())),
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient handshake payload routed by destination device id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalingMessage {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: SignalKind,
    #[serde(default)]
    pub data: Value,
    /// Sender-assigned epoch milliseconds; drives backlog expiry.
    pub timestamp: i64,
}

/// `GET /api/signaling` body.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalingResponse {
    pub messages: Vec<SignalingMessage>,
}

// =============================================================================
// PDF NOTICES
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPdfResponse {
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletePdfRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
