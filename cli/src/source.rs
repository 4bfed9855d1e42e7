//! Data sources: every network operation a device issues.
//!
//! DESIGN
//! ======
//! [`DataSource`] is chosen once at startup. [`RemoteHttpSource`] talks to a
//! floorboard server; [`InMemoryFixtureSource`] serves fabricated data for
//! preview mode and stamps pushed documents exactly like the server does, so
//! the sync engine behaves identically against either.
//!
//! ERROR HANDLING
//! ==============
//! Methods return `Result<_, SourceError>`; callers decide on the
//! best-effort default. `health` is a plain boolean because a failed probe
//! means "offline", never an error.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;
use wire::erp::{InventoryItem, InventoryPayload, Operation, OperationsPayload, ProductionPayload, WorkCenter};
use wire::staff::{Employee, EmployeeUpdate, TrainingRecord};
use wire::{
    ChatMessage, ChatMessagesResponse, DEVICE_ID_HEADER, Device, ErrorResponse, Notification,
    PushStateResponse, RegisterDeviceRequest, RenameDeviceRequest, SendNotificationRequest,
    SendNotificationResponse, SharedStateDocument, SignalingMessage, SignalingResponse,
};

use crate::identity::DeviceIdentity;
use crate::{now_ms, random_base36};

pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("{0}")]
    Rejected(String),
    #[error("invalid server URL: {0}")]
    InvalidUrl(String),
}

/// Every operation a device performs against its backing store.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    /// Liveness probe. A timeout or error is `false`.
    async fn health(&self) -> bool;

    /// Current shared document, `None` before the first write.
    async fn fetch_state(&self) -> Result<Option<SharedStateDocument>, SourceError>;
    /// Replace the shared document; the store stamps the metadata.
    async fn push_state(&self, content: &Map<String, Value>) -> Result<PushStateResponse, SourceError>;

    async fn register_device(&self, device_id: &str, device_name: &str) -> Result<(), SourceError>;
    async fn rename_device(&self, device_id: &str, device_name: &str) -> Result<(), SourceError>;
    async fn devices(&self) -> Result<Vec<Device>, SourceError>;

    async fn messages(&self) -> Result<Vec<ChatMessage>, SourceError>;
    async fn send_message(&self, message: &ChatMessage) -> Result<(), SourceError>;

    async fn send_signal(&self, message: &SignalingMessage) -> Result<(), SourceError>;
    async fn receive_signals(&self, device_id: &str) -> Result<Vec<SignalingMessage>, SourceError>;

    /// Returns the new notification id.
    async fn send_notification(&self, request: &SendNotificationRequest) -> Result<String, SourceError>;
    async fn notifications(&self, device_id: &str, unread_only: bool) -> Result<Vec<Notification>, SourceError>;
    async fn mark_notification_read(&self, notification_id: &str) -> Result<(), SourceError>;
    async fn delete_notification(&self, notification_id: &str) -> Result<(), SourceError>;

    async fn employees(&self) -> Result<Vec<Employee>, SourceError>;
    async fn create_employee(&self, employee: &Employee) -> Result<(), SourceError>;
    async fn update_employee(&self, id: &str, update: &EmployeeUpdate) -> Result<(), SourceError>;
    async fn delete_employee(&self, id: &str) -> Result<(), SourceError>;
    async fn training_records(&self) -> Result<Vec<TrainingRecord>, SourceError>;
    async fn create_training_record(&self, record: &TrainingRecord) -> Result<(), SourceError>;
    async fn delete_training_record(&self, id: &str) -> Result<(), SourceError>;

    async fn inventory(&self) -> Result<InventoryPayload, SourceError>;
    async fn operations(&self) -> Result<OperationsPayload, SourceError>;
    async fn production(&self) -> Result<ProductionPayload, SourceError>;
}

// =============================================================================
// REMOTE
// =============================================================================

/// HTTP client for a floorboard server.
pub struct RemoteHttpSource {
    http: reqwest::Client,
    base_url: String,
    device_id: String,
    health_timeout: Duration,
}

impl RemoteHttpSource {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str, device_id: &str) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            device_id: device_id.to_owned(),
            health_timeout: HEALTH_TIMEOUT,
        })
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn for_identity(identity: &DeviceIdentity) -> Result<Self, SourceError> {
        Self::new(&identity.server_url, &identity.device_id)
    }

    #[must_use]
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    /// Endpoint URL with each segment percent-encoded, so ids can never
    /// change which route is hit.
    pub(crate) fn url(&self, segments: &[&str]) -> Result<reqwest::Url, SourceError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| SourceError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| SourceError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, SourceError> {
        read(self.http.get(self.url(segments)?).send().await?).await
    }

    async fn send<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<T, SourceError> {
        let request = self.http.request(method, self.url(segments)?);
        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };
        read(request.send().await?).await
    }

    async fn acknowledge<B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<(), SourceError> {
        let _: Value = self.send(method, segments, body).await?;
        Ok(())
    }
}

async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }
    let message = response
        .json::<ErrorResponse>()
        .await
        .map_or_else(|_| status.canonical_reason().unwrap_or("request failed").to_owned(), |body| body.error);
    Err(SourceError::Status { status: status.as_u16(), message })
}

const NO_BODY: Option<&Value> = None;

#[async_trait::async_trait]
impl DataSource for RemoteHttpSource {
    async fn health(&self) -> bool {
        let url = match self.url(&["api", "health"]) {
            Ok(url) => url,
            Err(e) => {
                debug!(error = %e, "health probe skipped");
                return false;
            }
        };
        let probe = self.http.get(url).timeout(self.health_timeout).send().await;
        match probe {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "health probe failed");
                false
            }
        }
    }

    async fn fetch_state(&self) -> Result<Option<SharedStateDocument>, SourceError> {
        self.get(&["api", "state"]).await
    }

    async fn push_state(&self, content: &Map<String, Value>) -> Result<PushStateResponse, SourceError> {
        let response = self
            .http
            .post(self.url(&["api", "state"])?)
            .header(DEVICE_ID_HEADER, &self.device_id)
            .json(content)
            .send()
            .await?;
        read(response).await
    }

    async fn register_device(&self, device_id: &str, device_name: &str) -> Result<(), SourceError> {
        let body = RegisterDeviceRequest { device_id: device_id.to_owned(), device_name: device_name.to_owned() };
        self.acknowledge(reqwest::Method::POST, &["api", "devices", "register"], Some(&body)).await
    }

    async fn rename_device(&self, device_id: &str, device_name: &str) -> Result<(), SourceError> {
        let body = RenameDeviceRequest { device_name: device_name.to_owned() };
        self.acknowledge(reqwest::Method::PATCH, &["api", "devices", device_id], Some(&body)).await
    }

    async fn devices(&self) -> Result<Vec<Device>, SourceError> {
        self.get(&["api", "devices"]).await
    }

    async fn messages(&self) -> Result<Vec<ChatMessage>, SourceError> {
        let body: ChatMessagesResponse = self.get(&["api", "messages"]).await?;
        Ok(body.messages)
    }

    async fn send_message(&self, message: &ChatMessage) -> Result<(), SourceError> {
        self.acknowledge(reqwest::Method::POST, &["api", "messages"], Some(message)).await
    }

    async fn send_signal(&self, message: &SignalingMessage) -> Result<(), SourceError> {
        self.acknowledge(reqwest::Method::POST, &["api", "signaling"], Some(message)).await
    }

    async fn receive_signals(&self, device_id: &str) -> Result<Vec<SignalingMessage>, SourceError> {
        let response = self.http.get(self.url(&["api", "signaling"])?).query(&[("deviceId", device_id)]).send().await?;
        let body: SignalingResponse = read(response).await?;
        Ok(body.messages)
    }

    async fn send_notification(&self, request: &SendNotificationRequest) -> Result<String, SourceError> {
        let body: SendNotificationResponse =
            self.send(reqwest::Method::POST, &["api", "notifications"], Some(request)).await?;
        Ok(body.notification_id)
    }

    async fn notifications(&self, device_id: &str, unread_only: bool) -> Result<Vec<Notification>, SourceError> {
        let mut request = self.http.get(self.url(&["api", "notifications", device_id])?);
        if unread_only {
            request = request.query(&[("unreadOnly", "true")]);
        }
        read(request.send().await?).await
    }

    async fn mark_notification_read(&self, notification_id: &str) -> Result<(), SourceError> {
        self.acknowledge(reqwest::Method::PATCH, &["api", "notifications", notification_id, "read"], NO_BODY).await
    }

    async fn delete_notification(&self, notification_id: &str) -> Result<(), SourceError> {
        self.acknowledge(reqwest::Method::DELETE, &["api", "notifications", notification_id], NO_BODY).await
    }

    async fn employees(&self) -> Result<Vec<Employee>, SourceError> {
        self.get(&["api", "employees"]).await
    }

    async fn create_employee(&self, employee: &Employee) -> Result<(), SourceError> {
        self.acknowledge(reqwest::Method::POST, &["api", "employees"], Some(employee)).await
    }

    async fn update_employee(&self, id: &str, update: &EmployeeUpdate) -> Result<(), SourceError> {
        self.acknowledge(reqwest::Method::PUT, &["api", "employees", id], Some(update)).await
    }

    async fn delete_employee(&self, id: &str) -> Result<(), SourceError> {
        self.acknowledge(reqwest::Method::DELETE, &["api", "employees", id], NO_BODY).await
    }

    async fn training_records(&self) -> Result<Vec<TrainingRecord>, SourceError> {
        self.get(&["api", "training-records"]).await
    }

    async fn create_training_record(&self, record: &TrainingRecord) -> Result<(), SourceError> {
        self.acknowledge(reqwest::Method::POST, &["api", "training-records"], Some(record)).await
    }

    async fn delete_training_record(&self, id: &str) -> Result<(), SourceError> {
        self.acknowledge(reqwest::Method::DELETE, &["api", "training-records", id], NO_BODY).await
    }

    async fn inventory(&self) -> Result<InventoryPayload, SourceError> {
        self.get(&["api", "fulcrum", "inventory"]).await
    }

    async fn operations(&self) -> Result<OperationsPayload, SourceError> {
        self.get(&["api", "fulcrum", "operations"]).await
    }

    async fn production(&self) -> Result<ProductionPayload, SourceError> {
        self.get(&["api", "fulcrum", "production"]).await
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

type ClockFn = Arc<dyn Fn() -> i64 + Send + Sync>;

#[derive(Default)]
struct FixtureStore {
    document: Option<SharedStateDocument>,
    devices: Vec<Device>,
    messages: Vec<ChatMessage>,
    notifications: Vec<Notification>,
    signals: Vec<SignalingMessage>,
    employees: Vec<Employee>,
    training: Vec<TrainingRecord>,
    inventory: Vec<InventoryItem>,
    operations: Vec<Operation>,
    production: Vec<WorkCenter>,
}

/// In-memory store for preview mode and tests.
///
/// Handles made with [`InMemoryFixtureSource::share`] see the same store
/// under a different device id, standing in for several kiosks on one server.
#[derive(Clone)]
pub struct InMemoryFixtureSource {
    store: Arc<Mutex<FixtureStore>>,
    device_id: String,
    clock: ClockFn,
}

impl InMemoryFixtureSource {
    /// Store seeded with sample devices, chat, staff and ERP data.
    #[must_use]
    pub fn new(device_id: &str) -> Self {
        let source = Self::empty(device_id);
        source.lock().seed(now_ms());
        source
    }

    /// Store with nothing in it.
    #[must_use]
    pub fn empty(device_id: &str) -> Self {
        Self {
            store: Arc::new(Mutex::new(FixtureStore::default())),
            device_id: device_id.to_owned(),
            clock: Arc::new(now_ms),
        }
    }

    /// Replace the wall clock used for stamps and timestamps.
    #[must_use]
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> i64 + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Another handle on the same store, acting as `device_id`.
    #[must_use]
    pub fn share(&self, device_id: &str) -> Self {
        Self { store: Arc::clone(&self.store), device_id: device_id.to_owned(), clock: Arc::clone(&self.clock) }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FixtureStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now(&self) -> i64 {
        (self.clock)()
    }
}

impl FixtureStore {
    fn seed(&mut self, now: i64) {
        self.devices = vec![
            fixture_device("device-1", "Production Floor - Station 1", now),
            fixture_device("device-2", "Quality Lab - Terminal", now),
            fixture_device("device-3", "Office - Manager Desk", now),
        ];
        self.messages = vec![
            ChatMessage {
                id: "1".into(),
                from: "device-1".into(),
                to: "device-2".into(),
                text: "Quality check needed on batch 1234".into(),
                timestamp: now - 300_000,
            },
            ChatMessage {
                id: "2".into(),
                from: "device-3".into(),
                to: "device-1".into(),
                text: "Production meeting at 2pm".into(),
                timestamp: now - 600_000,
            },
        ];
        self.employees = vec![
            fixture_employee("1", "John Smith", "Production", "Operator", "2020-01-15"),
            fixture_employee("2", "Sarah Johnson", "Quality", "Inspector", "2019-06-20"),
            fixture_employee("3", "Mike Wilson", "Maintenance", "Technician", "2021-03-10"),
            fixture_employee("4", "Emily Brown", "Production", "Supervisor", "2018-11-05"),
        ];
        self.training = vec![
            fixture_training("1", "1", "safety-101", "2024-01-15", "2025-01-15", 95),
            fixture_training("2", "1", "forklift", "2024-02-20", "2027-02-20", 88),
            fixture_training("3", "2", "quality-control", "2024-03-10", "2025-03-10", 92),
        ];
        self.inventory = vec![
            fixture_item("MAT-004", "Fastener Kit", 0.0, 0.0, "KIT"),
            fixture_item("MAT-003", "Plastic Pellets", 5.0, 0.0, "LB"),
            fixture_item("MAT-001", "Steel Sheet 4x8", 150.0, 30.0, "EA"),
            fixture_item("MAT-002", "Aluminum Rod 1in", 45.0, 0.0, "FT"),
            fixture_item("MAT-005", "Paint - Blue", 25.0, 5.0, "GAL"),
        ];
        self.operations = vec![
            fixture_operation("JOB-1001", "Cutting", "CNC-01", "John Smith", 75),
            fixture_operation("JOB-1002", "Welding", "WELD-03", "Mike Wilson", 45),
            fixture_operation("JOB-1003", "Assembly", "ASSY-02", "Sarah Johnson", 90),
        ];
        self.production = vec![
            fixture_work_center("wc1", "Machining", 45, 50),
            fixture_work_center("wc2", "Welding", 32, 40),
            fixture_work_center("wc3", "Assembly", 58, 60),
            fixture_work_center("wc4", "Finishing", 28, 45),
        ];
    }
}

fn fixture_device(id: &str, name: &str, now: i64) -> Device {
    Device { id: id.into(), name: name.into(), last_seen: now, created_at: now }
}

fn fixture_employee(id: &str, name: &str, department: &str, position: &str, hire_date: &str) -> Employee {
    Employee {
        id: id.into(),
        name: name.into(),
        department: department.into(),
        position: position.into(),
        hire_date: hire_date.into(),
        created_at: None,
    }
}

fn fixture_training(id: &str, employee: &str, training: &str, completed: &str, expiry: &str, score: i64) -> TrainingRecord {
    TrainingRecord {
        id: id.into(),
        employee_id: employee.into(),
        training_id: training.into(),
        training_type: "certification".into(),
        completed_date: completed.into(),
        expiry_date: Some(expiry.into()),
        score: Some(score),
        notes: None,
    }
}

fn fixture_item(number: &str, description: &str, on_hand: f64, reserved: f64, unit: &str) -> InventoryItem {
    InventoryItem {
        item_id: number.to_ascii_lowercase(),
        item_number: number.into(),
        description: description.into(),
        on_hand,
        available: on_hand - reserved,
        reserved,
        unit: unit.into(),
        low_stock_threshold: 10.0,
    }
}

fn fixture_operation(job: &str, operation: &str, machine: &str, operator: &str, progress: u32) -> Operation {
    Operation {
        id: job.to_ascii_lowercase(),
        status: "in-progress".into(),
        machine: machine.into(),
        job_number: job.into(),
        part_number: String::new(),
        description: operation.into(),
        personnel: vec![operator.into()],
        time_spent: f64::from(progress) * 36.0,
        time_estimated: 3600.0,
        completion_percentage: progress,
        is_late: false,
    }
}

fn fixture_work_center(id: &str, name: &str, completed: u32, target: u32) -> WorkCenter {
    WorkCenter { id: id.into(), name: name.into(), completed, target, efficiency: completed * 100 / target }
}

fn iso_now(ms: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| ms.to_string())
}

#[async_trait::async_trait]
impl DataSource for InMemoryFixtureSource {
    async fn health(&self) -> bool {
        true
    }

    async fn fetch_state(&self) -> Result<Option<SharedStateDocument>, SourceError> {
        Ok(self.lock().document.clone())
    }

    async fn push_state(&self, content: &Map<String, Value>) -> Result<PushStateResponse, SourceError> {
        let now = self.now();
        let mut store = self.lock();
        let previous = store.document.as_ref().map_or(0, SharedStateDocument::last_modified_or_zero);
        let stamp = now.max(previous + 1);
        let document = SharedStateDocument::from_content(content.clone()).stamped(stamp, &self.device_id);
        store.document = Some(document);
        Ok(PushStateResponse { success: true, last_modified: Some(stamp) })
    }

    async fn register_device(&self, device_id: &str, device_name: &str) -> Result<(), SourceError> {
        let now = self.now();
        let mut store = self.lock();
        if let Some(device) = store.devices.iter_mut().find(|d| d.id == device_id) {
            device.name = device_name.to_owned();
            device.last_seen = now;
        } else {
            store.devices.push(fixture_device(device_id, device_name, now));
        }
        Ok(())
    }

    async fn rename_device(&self, device_id: &str, device_name: &str) -> Result<(), SourceError> {
        let now = self.now();
        if let Some(device) = self.lock().devices.iter_mut().find(|d| d.id == device_id) {
            device.name = device_name.to_owned();
            device.last_seen = now;
        }
        Ok(())
    }

    async fn devices(&self) -> Result<Vec<Device>, SourceError> {
        let mut devices = self.lock().devices.clone();
        devices.sort_by(|a, b| b.last_seen.cmp(&a.last_seen).then_with(|| a.id.cmp(&b.id)));
        Ok(devices)
    }

    async fn messages(&self) -> Result<Vec<ChatMessage>, SourceError> {
        let mut messages = self.lock().messages.clone();
        messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(messages)
    }

    async fn send_message(&self, message: &ChatMessage) -> Result<(), SourceError> {
        let now = self.now();
        let mut store = self.lock();
        if store.messages.iter().any(|m| m.id == message.id) {
            return Err(SourceError::Rejected(format!("duplicate message id: {}", message.id)));
        }
        store.messages.push(message.clone());
        store.notifications.push(Notification {
            id: format!("notif_{now}_{}", random_base36(7)),
            to_device: message.to.clone(),
            from_device: message.from.clone(),
            kind: wire::NotificationKind::Message,
            title: "New Message".into(),
            message: Some(message.text.clone()),
            data: None,
            read: false,
            created_at: now,
        });
        Ok(())
    }

    async fn send_signal(&self, message: &SignalingMessage) -> Result<(), SourceError> {
        self.lock().signals.push(message.clone());
        Ok(())
    }

    async fn receive_signals(&self, device_id: &str) -> Result<Vec<SignalingMessage>, SourceError> {
        let mut store = self.lock();
        let (delivered, kept): (Vec<_>, Vec<_>) = store.signals.drain(..).partition(|m| m.to == device_id);
        store.signals = kept;
        Ok(delivered)
    }

    async fn send_notification(&self, request: &SendNotificationRequest) -> Result<String, SourceError> {
        let now = self.now();
        let id = format!("notif_{now}_{}", random_base36(7));
        self.lock().notifications.push(Notification {
            id: id.clone(),
            to_device: request.to_device.clone(),
            from_device: request.from_device.clone(),
            kind: request.kind.clone(),
            title: request.title.clone(),
            message: request.message.clone(),
            data: request.data.clone(),
            read: false,
            created_at: now,
        });
        Ok(id)
    }

    async fn notifications(&self, device_id: &str, unread_only: bool) -> Result<Vec<Notification>, SourceError> {
        let store = self.lock();
        Ok(store
            .notifications
            .iter()
            .rev()
            .filter(|n| n.to_device == device_id && (!unread_only || !n.read))
            .take(50)
            .cloned()
            .collect())
    }

    async fn mark_notification_read(&self, notification_id: &str) -> Result<(), SourceError> {
        if let Some(n) = self.lock().notifications.iter_mut().find(|n| n.id == notification_id) {
            n.read = true;
        }
        Ok(())
    }

    async fn delete_notification(&self, notification_id: &str) -> Result<(), SourceError> {
        self.lock().notifications.retain(|n| n.id != notification_id);
        Ok(())
    }

    async fn employees(&self) -> Result<Vec<Employee>, SourceError> {
        let mut employees = self.lock().employees.clone();
        employees.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(employees)
    }

    async fn create_employee(&self, employee: &Employee) -> Result<(), SourceError> {
        let now = self.now();
        let mut employee = employee.clone();
        employee.created_at.get_or_insert(now);
        self.lock().employees.push(employee);
        Ok(())
    }

    async fn update_employee(&self, id: &str, update: &EmployeeUpdate) -> Result<(), SourceError> {
        if let Some(e) = self.lock().employees.iter_mut().find(|e| e.id == id) {
            e.name.clone_from(&update.name);
            e.department.clone_from(&update.department);
            e.position.clone_from(&update.position);
            e.hire_date.clone_from(&update.hire_date);
        }
        Ok(())
    }

    async fn delete_employee(&self, id: &str) -> Result<(), SourceError> {
        let mut store = self.lock();
        store.employees.retain(|e| e.id != id);
        store.training.retain(|t| t.employee_id != id);
        Ok(())
    }

    async fn training_records(&self) -> Result<Vec<TrainingRecord>, SourceError> {
        let mut records = self.lock().training.clone();
        records.sort_by(|a, b| b.completed_date.cmp(&a.completed_date));
        Ok(records)
    }

    async fn create_training_record(&self, record: &TrainingRecord) -> Result<(), SourceError> {
        let mut store = self.lock();
        if !store.employees.iter().any(|e| e.id == record.employee_id) {
            return Err(SourceError::Rejected(format!("Unknown employee: {}", record.employee_id)));
        }
        store.training.push(record.clone());
        Ok(())
    }

    async fn delete_training_record(&self, id: &str) -> Result<(), SourceError> {
        self.lock().training.retain(|t| t.id != id);
        Ok(())
    }

    async fn inventory(&self) -> Result<InventoryPayload, SourceError> {
        let items = self.lock().inventory.clone();
        Ok(InventoryPayload { items, last_updated: iso_now(self.now()), error: None })
    }

    async fn operations(&self) -> Result<OperationsPayload, SourceError> {
        let operations = self.lock().operations.clone();
        Ok(OperationsPayload { operations, last_updated: iso_now(self.now()), error: None })
    }

    async fn production(&self) -> Result<ProductionPayload, SourceError> {
        let production = self.lock().production.clone();
        let total_completed = production.iter().map(|w| w.completed).sum();
        Ok(ProductionPayload { production, total_completed, last_updated: iso_now(self.now()), error: None })
    }
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
