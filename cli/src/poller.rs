//! Notification inbox poller.
//!
//! Every tick lists this device's unread notifications. Call notifications
//! become [`Incoming::Call`] prompts and message notifications become
//! [`Incoming::Chat`] alerts; each is marked read right after it is handed
//! to the consumer. Other tags are left unread for whoever understands them.
//!
//! A prompt is presented at most once even when marking it read fails: the
//! poller remembers presented ids and, on later ticks, only retries the
//! mark-read for them.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use wire::{Notification, NotificationKind};

use crate::identity::DeviceIdentity;
use crate::source::DataSource;
use crate::sync::BusyGuard;

const UNKNOWN_CALLER: &str = "Unknown";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingCall {
    pub notification_id: String,
    pub from_device: String,
    pub from_name: String,
    /// Session description from the caller, if the notification carried one.
    pub offer: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingChat {
    pub notification_id: String,
    pub from_device: String,
    pub title: String,
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Incoming {
    Call(IncomingCall),
    Chat(IncomingChat),
}

impl Incoming {
    fn from_notification(notification: &Notification) -> Option<Self> {
        match notification.kind {
            NotificationKind::Call => {
                let data = notification.data.as_ref();
                Some(Self::Call(IncomingCall {
                    notification_id: notification.id.clone(),
                    from_device: notification.from_device.clone(),
                    from_name: data
                        .and_then(|d| d.get("fromName"))
                        .and_then(Value::as_str)
                        .unwrap_or(UNKNOWN_CALLER)
                        .to_owned(),
                    offer: data.and_then(|d| d.get("offer")).filter(|o| !o.is_null()).cloned(),
                }))
            }
            NotificationKind::Message => Some(Self::Chat(IncomingChat {
                notification_id: notification.id.clone(),
                from_device: notification.from_device.clone(),
                title: notification.title.clone(),
                message: notification.message.clone(),
            })),
            NotificationKind::Other(_) => None,
        }
    }
}

/// Result of one poller tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InboxPoll {
    Skipped,
    Failed,
    /// Number of events handed to the consumer.
    Delivered(usize),
}

pub struct NotificationPoller {
    source: Arc<dyn DataSource>,
    device_id: String,
    busy: AtomicBool,
    events: mpsc::Sender<Incoming>,
    /// Presented but not yet confirmed read.
    presented: Mutex<HashSet<String>>,
}

impl NotificationPoller {
    #[must_use]
    pub fn new(source: Arc<dyn DataSource>, identity: &DeviceIdentity, events: mpsc::Sender<Incoming>) -> Self {
        Self {
            source,
            device_id: identity.device_id.clone(),
            busy: AtomicBool::new(false),
            events,
            presented: Mutex::new(HashSet::new()),
        }
    }

    fn presented(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.presented.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn mark_read(&self, notification_id: &str) {
        match self.source.mark_notification_read(notification_id).await {
            Ok(()) => {
                self.presented().remove(notification_id);
            }
            Err(e) => warn!(error = %e, id = %notification_id, "failed to mark notification read"),
        }
    }

    /// List unread notifications and surface the ones this device handles.
    pub async fn poll_once(&self) -> InboxPoll {
        let Some(_busy) = BusyGuard::try_acquire(&self.busy) else {
            return InboxPoll::Skipped;
        };

        let unread = match self.source.notifications(&self.device_id, true).await {
            Ok(unread) => unread,
            Err(e) => {
                warn!(error = %e, device_id = %self.device_id, "notification poll failed");
                return InboxPoll::Failed;
            }
        };

        self.presented().retain(|id| unread.iter().any(|n| &n.id == id));

        let mut delivered = 0;
        // Listing is newest first; present in arrival order.
        for notification in unread.iter().rev().filter(|n| !n.read) {
            if self.presented().contains(&notification.id) {
                self.mark_read(&notification.id).await;
                continue;
            }
            let Some(event) = Incoming::from_notification(notification) else {
                continue;
            };
            if let Incoming::Call(call) = &event {
                info!(from = %call.from_device, from_name = %call.from_name, "incoming call");
            }
            if self.events.send(event).await.is_err() {
                debug!("event consumer gone; stopping delivery");
                break;
            }
            delivered += 1;
            self.presented().insert(notification.id.clone());
            self.mark_read(&notification.id).await;
        }
        InboxPoll::Delivered(delivered)
    }

    /// Poll now and then on every `interval`.
    #[must_use]
    pub fn spawn(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if self.events.is_closed() {
                    break;
                }
                let poller = Arc::clone(&self);
                tokio::spawn(async move {
                    poller.poll_once().await;
                });
            }
        })
    }
}

#[cfg(test)]
#[path = "poller_test.rs"]
mod tests;
