//! Instrumented data source for engine and poller tests.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tokio::sync::Semaphore;
use wire::erp::{InventoryPayload, OperationsPayload, ProductionPayload};
use wire::staff::{Employee, EmployeeUpdate, TrainingRecord};
use wire::{ChatMessage, Device, Notification, PushStateResponse, SendNotificationRequest, SharedStateDocument, SignalingMessage};

use crate::identity::DeviceIdentity;
use crate::source::{DataSource, InMemoryFixtureSource, SourceError};

pub fn identity(device_id: &str) -> DeviceIdentity {
    DeviceIdentity {
        device_id: device_id.to_owned(),
        device_name: format!("{device_id} kiosk"),
        server_url: "http://127.0.0.1:3001".to_owned(),
    }
}

/// Shared manual clock driving fixture stamps.
#[derive(Clone, Default)]
pub struct TestClock(Arc<AtomicI64>);

impl TestClock {
    pub fn at(ms: i64) -> Self {
        Self(Arc::new(AtomicI64::new(ms)))
    }

    pub fn set(&self, ms: i64) {
        self.0.store(ms, Ordering::SeqCst);
    }

    pub fn fixture(&self, device_id: &str) -> InMemoryFixtureSource {
        let clock = self.0.clone();
        InMemoryFixtureSource::empty(device_id).with_clock(move || clock.load(Ordering::SeqCst))
    }
}

/// Wraps a fixture store with switches and counters.
pub struct ProbeSource {
    pub inner: InMemoryFixtureSource,
    pub online: AtomicBool,
    pub fail_fetch: AtomicBool,
    pub fail_mark_read: AtomicBool,
    pub fetch_calls: AtomicUsize,
    pub pushes: Mutex<Vec<Map<String, Value>>>,
    pub marked_read: Mutex<Vec<String>>,
    /// When set, each fetch waits for one permit.
    pub fetch_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl ProbeSource {
    pub fn new(inner: InMemoryFixtureSource) -> Arc<Self> {
        Arc::new(Self {
            inner,
            online: AtomicBool::new(true),
            fail_fetch: AtomicBool::new(false),
            fail_mark_read: AtomicBool::new(false),
            fetch_calls: AtomicUsize::new(0),
            pushes: Mutex::new(Vec::new()),
            marked_read: Mutex::new(Vec::new()),
            fetch_gate: Mutex::new(None),
        })
    }

    pub fn gate_fetches(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.fetch_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn push_count(&self) -> usize {
        self.pushes.lock().unwrap().len()
    }

    pub fn last_push(&self) -> Option<Map<String, Value>> {
        self.pushes.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl DataSource for ProbeSource {
    async fn health(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    async fn fetch_state(&self) -> Result<Option<SharedStateDocument>, SourceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.fetch_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate open").forget();
        }
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(SourceError::Status { status: 500, message: "Internal server error".into() });
        }
        self.inner.fetch_state().await
    }

    async fn push_state(&self, content: &Map<String, Value>) -> Result<PushStateResponse, SourceError> {
        self.pushes.lock().unwrap().push(content.clone());
        self.inner.push_state(content).await
    }

    async fn register_device(&self, device_id: &str, device_name: &str) -> Result<(), SourceError> {
        self.inner.register_device(device_id, device_name).await
    }

    async fn rename_device(&self, device_id: &str, device_name: &str) -> Result<(), SourceError> {
        self.inner.rename_device(device_id, device_name).await
    }

    async fn devices(&self) -> Result<Vec<Device>, SourceError> {
        self.inner.devices().await
    }

    async fn messages(&self) -> Result<Vec<ChatMessage>, SourceError> {
        self.inner.messages().await
    }

    async fn send_message(&self, message: &ChatMessage) -> Result<(), SourceError> {
        self.inner.send_message(message).await
    }

    async fn send_signal(&self, message: &SignalingMessage) -> Result<(), SourceError> {
        self.inner.send_signal(message).await
    }

    async fn receive_signals(&self, device_id: &str) -> Result<Vec<SignalingMessage>, SourceError> {
        self.inner.receive_signals(device_id).await
    }

    async fn send_notification(&self, request: &SendNotificationRequest) -> Result<String, SourceError> {
        self.inner.send_notification(request).await
    }

    async fn notifications(&self, device_id: &str, unread_only: bool) -> Result<Vec<Notification>, SourceError> {
        self.inner.notifications(device_id, unread_only).await
    }

    async fn mark_notification_read(&self, notification_id: &str) -> Result<(), SourceError> {
        if self.fail_mark_read.load(Ordering::SeqCst) {
            return Err(SourceError::Status { status: 500, message: "Internal server error".into() });
        }
        self.marked_read.lock().unwrap().push(notification_id.to_owned());
        self.inner.mark_notification_read(notification_id).await
    }

    async fn delete_notification(&self, notification_id: &str) -> Result<(), SourceError> {
        self.inner.delete_notification(notification_id).await
    }

    async fn employees(&self) -> Result<Vec<Employee>, SourceError> {
        self.inner.employees().await
    }

    async fn create_employee(&self, employee: &Employee) -> Result<(), SourceError> {
        self.inner.create_employee(employee).await
    }

    async fn update_employee(&self, id: &str, update: &EmployeeUpdate) -> Result<(), SourceError> {
        self.inner.update_employee(id, update).await
    }

    async fn delete_employee(&self, id: &str) -> Result<(), SourceError> {
        self.inner.delete_employee(id).await
    }

    async fn training_records(&self) -> Result<Vec<TrainingRecord>, SourceError> {
        self.inner.training_records().await
    }

    async fn create_training_record(&self, record: &TrainingRecord) -> Result<(), SourceError> {
        self.inner.create_training_record(record).await
    }

    async fn delete_training_record(&self, id: &str) -> Result<(), SourceError> {
        self.inner.delete_training_record(id).await
    }

    async fn inventory(&self) -> Result<InventoryPayload, SourceError> {
        self.inner.inventory().await
    }

    async fn operations(&self) -> Result<OperationsPayload, SourceError> {
        self.inner.operations().await
    }

    async fn production(&self) -> Result<ProductionPayload, SourceError> {
        self.inner.production().await
    }
}
