//! Video call setup.
//!
//! A caller builds an offer and sends it inside a `call` notification. The
//! callee's poller turns that into an [`IncomingCall`], which rings here;
//! accepting builds an answer from the offer.
//!
//! KNOWN GAP
//! =========
//! The answer is never sent back to the caller. Nothing in the relay
//! carries it, so the caller stays in `Offering` and media never flows end
//! to end. [`CallSession::answer_delivery`] reports this explicitly rather
//! than inventing a return channel.

use std::fmt;
use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{info, warn};
use wire::{NotificationKind, SendNotificationRequest};

use crate::identity::DeviceIdentity;
use crate::poller::IncomingCall;
use crate::source::{DataSource, SourceError};

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("cannot {action} while {state}")]
    InvalidState { action: &'static str, state: &'static str },
    #[error("incoming call carried no offer")]
    MissingOffer,
    #[error("media failed: {0}")]
    Media(String),
    #[error("failed to reach callee: {0}")]
    Source(#[from] SourceError),
}

/// Local media: produces session descriptions.
#[async_trait::async_trait]
pub trait CallMedia: Send + Sync {
    /// # Errors
    ///
    /// Returns `CallError::Media` if capture or negotiation fails.
    async fn create_offer(&self) -> Result<Value, CallError>;

    /// # Errors
    ///
    /// Returns `CallError::Media` if the offer cannot be answered.
    async fn create_answer(&self, offer: &Value) -> Result<Value, CallError>;
}

/// Placeholder media producing minimal session descriptions.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubMedia;

#[async_trait::async_trait]
impl CallMedia for StubMedia {
    async fn create_offer(&self) -> Result<Value, CallError> {
        Ok(json!({ "type": "offer", "sdp": "v=0\r\ns=floorboard\r\n" }))
    }

    async fn create_answer(&self, offer: &Value) -> Result<Value, CallError> {
        if offer.get("type").and_then(Value::as_str) != Some("offer") {
            return Err(CallError::Media("not an offer".to_owned()));
        }
        Ok(json!({ "type": "answer", "sdp": "v=0\r\ns=floorboard\r\n" }))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CallState {
    Idle,
    Offering { to_device: String },
    Ringing { call: IncomingCall },
    Answering { from_device: String },
    Connected { peer: String },
}

impl CallState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Offering { .. } => "offering",
            Self::Ringing { .. } => "ringing",
            Self::Answering { .. } => "answering",
            Self::Connected { .. } => "connected",
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether an accepted call's answer reaches the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnswerDelivery {
    /// The answer stays on the callee; there is no return path.
    NotTransmitted,
}

pub struct CallSession {
    source: Arc<dyn DataSource>,
    media: Arc<dyn CallMedia>,
    device_id: String,
    display_name: String,
    state: CallState,
}

impl CallSession {
    #[must_use]
    pub fn new(source: Arc<dyn DataSource>, media: Arc<dyn CallMedia>, identity: &DeviceIdentity) -> Self {
        Self {
            source,
            media,
            device_id: identity.device_id.clone(),
            display_name: identity.device_name.clone(),
            state: CallState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> &CallState {
        &self.state
    }

    #[must_use]
    pub fn answer_delivery(&self) -> AnswerDelivery {
        AnswerDelivery::NotTransmitted
    }

    fn require_idle(&self, action: &'static str) -> Result<(), CallError> {
        match self.state {
            CallState::Idle => Ok(()),
            ref other => Err(CallError::InvalidState { action, state: other.name() }),
        }
    }

    /// Create an offer and send it to `to_device` as a call notification.
    /// Returns the notification id.
    ///
    /// # Errors
    ///
    /// Fails if not idle, if media fails, or if the notification cannot be
    /// sent. The session is back in `Idle` after any failure.
    pub async fn start_call(&mut self, to_device: &str) -> Result<String, CallError> {
        self.require_idle("start a call")?;
        self.state = CallState::Offering { to_device: to_device.to_owned() };

        let result = self.send_offer(to_device).await;
        if result.is_err() {
            self.state = CallState::Idle;
        }
        result
    }

    async fn send_offer(&self, to_device: &str) -> Result<String, CallError> {
        let offer = self.media.create_offer().await?;
        let request = SendNotificationRequest {
            to_device: to_device.to_owned(),
            from_device: self.device_id.clone(),
            kind: NotificationKind::Call,
            title: format!("Incoming call from {}", self.display_name),
            message: None,
            data: Some(json!({ "offer": offer, "fromName": self.display_name })),
        };
        let id = self.source.send_notification(&request).await?;
        info!(to = %to_device, notification_id = %id, "call offer sent");
        Ok(id)
    }

    /// Present an incoming call.
    ///
    /// # Errors
    ///
    /// Fails if a call is already in progress.
    pub fn ring(&mut self, call: IncomingCall) -> Result<(), CallError> {
        self.require_idle("ring")?;
        self.state = CallState::Ringing { call };
        Ok(())
    }

    /// Accept the ringing call and return the local answer.
    ///
    /// # Errors
    ///
    /// Fails if nothing is ringing, the call has no offer, or media fails.
    /// The session returns to `Idle` on failure.
    pub async fn accept(&mut self) -> Result<Value, CallError> {
        let call = match &self.state {
            CallState::Ringing { call } => call.clone(),
            other => return Err(CallError::InvalidState { action: "accept", state: other.name() }),
        };
        self.state = CallState::Answering { from_device: call.from_device.clone() };

        let answer = match &call.offer {
            Some(offer) => self.media.create_answer(offer).await,
            None => Err(CallError::MissingOffer),
        };
        match answer {
            Ok(answer) => {
                warn!(
                    peer = %call.from_device,
                    delivery = ?self.answer_delivery(),
                    "call accepted; answer is not sent back to the caller"
                );
                self.state = CallState::Connected { peer: call.from_device };
                Ok(answer)
            }
            Err(e) => {
                self.state = CallState::Idle;
                Err(e)
            }
        }
    }

    /// Dismiss a ringing call.
    ///
    /// # Errors
    ///
    /// Fails if nothing is ringing.
    pub fn decline(&mut self) -> Result<(), CallError> {
        match self.state {
            CallState::Ringing { .. } => {
                self.state = CallState::Idle;
                Ok(())
            }
            ref other => Err(CallError::InvalidState { action: "decline", state: other.name() }),
        }
    }

    /// Hang up from any state.
    pub fn end(&mut self) {
        if self.state != CallState::Idle {
            info!(state = %self.state, "call ended");
        }
        self.state = CallState::Idle;
    }
}

#[cfg(test)]
#[path = "call_test.rs"]
mod tests;
