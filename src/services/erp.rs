//! ERP proxy — fetches manufacturing data and normalizes it for widgets.
//!
//! DESIGN
//! ======
//! The upstream API is reached through the [`ErpApi`] trait so tests can
//! substitute canned JSON. Upstream payloads are loosely shaped: lists may be
//! bare arrays or wrapped under `data`/`items`/`jobs`, and field names vary in
//! case. The `normalize_*` functions are pure and absorb that variance.
//!
//! ERROR HANDLING
//! ==============
//! Read endpoints never fail at the HTTP level. Any upstream error (including
//! a missing credential) becomes an empty collection plus an `error` string.
//! Clock-in/out report `{success: false, error}` instead. Only a missing
//! request field is surfaced as `ErpError::MissingField` for a 400.

use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};
use wire::erp::{
    ActiveTimer, ClockInRequest, ClockOutRequest, ClockResponse, ErpEmployee, ErpEmployeesPayload, InventoryItem,
    InventoryPayload, Operation, OperationsPayload, ProductionPayload, TimersPayload, WorkCenter,
};

use crate::clock::iso_timestamp;
use crate::config::ErpConfig;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_ESTIMATED_SECS: f64 = 3600.0;
const DEFAULT_LOW_STOCK_THRESHOLD: f64 = 10.0;
const NO_INVENTORY: &str = "No inventory data available from Fulcrum";

/// Fixed work centres: (id, name, share of completed jobs, daily target).
const WORK_CENTERS: [(&str, &str, f64, u32); 5] = [
    ("wc1", "Assembly", 0.30, 100),
    ("wc2", "Machining", 0.25, 80),
    ("wc3", "Welding", 0.20, 60),
    ("wc4", "Finishing", 0.15, 50),
    ("wc5", "QC", 0.10, 40),
];

#[derive(Debug, thiserror::Error)]
pub enum ErpError {
    #[error("ERP proxy is not configured")]
    NotConfigured,
    #[error("Missing {0}")]
    MissingField(&'static str),
    #[error("ERP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{message}")]
    Status { status: u16, message: String },
}

// =============================================================================
// CLIENT
// =============================================================================

/// Minimal JSON transport to the ERP. Enables mocking in tests.
#[async_trait::async_trait]
pub trait ErpApi: Send + Sync {
    /// GET `path` (relative to the API base, query string included).
    ///
    /// # Errors
    ///
    /// Returns an [`ErpError`] on transport failure or a non-2xx status.
    async fn get_json(&self, path: &str) -> Result<Value, ErpError>;

    /// POST a JSON body to `path`.
    ///
    /// # Errors
    ///
    /// Returns an [`ErpError`] on transport failure or a non-2xx status.
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ErpError>;
}

/// reqwest-backed client holding the bearer credential server-side.
pub struct HttpErpClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpErpClient {
    /// Build a client from ERP config.
    ///
    /// # Errors
    ///
    /// Returns a request error if the HTTP client cannot be constructed.
    pub fn new(config: &ErpConfig) -> Result<Self, ErpError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http, base_url: config.base_url.trim_end_matches('/').to_owned(), api_key: config.api_key.clone() })
    }

    async fn read(response: reqwest::Response) -> Result<Value, ErpError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<Value>().await?);
        }
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| format!("Fulcrum API error: {}", status.as_u16()), str::to_owned);
        Err(ErpError::Status { status: status.as_u16(), message })
    }
}

#[async_trait::async_trait]
impl ErpApi for HttpErpClient {
    async fn get_json(&self, path: &str) -> Result<Value, ErpError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "erp get");
        let response = self.http.get(url).bearer_auth(&self.api_key).send().await?;
        Self::read(response).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ErpError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "erp post");
        let response = self.http.post(url).bearer_auth(&self.api_key).json(body).send().await?;
        Self::read(response).await
    }
}

// =============================================================================
// FETCH
// =============================================================================

async fn get(erp: Option<&dyn ErpApi>, path: &str) -> Result<Value, ErpError> {
    erp.ok_or(ErpError::NotConfigured)?.get_json(path).await
}

/// On-hand inventory, out-of-stock items first.
pub async fn inventory(erp: Option<&dyn ErpApi>, now_ms: i64) -> InventoryPayload {
    let last_updated = iso_timestamp(now_ms);
    match get(erp, "/inventory/onhand").await {
        Ok(raw) => {
            let items = normalize_inventory(&raw);
            let error = items.is_empty().then(|| NO_INVENTORY.to_owned());
            debug!(count = items.len(), "inventory normalized");
            InventoryPayload { items, last_updated, error }
        }
        Err(e) => {
            warn!(error = %e, "inventory fetch failed");
            InventoryPayload { items: Vec::new(), last_updated, error: Some(format!("Failed to fetch inventory: {e}")) }
        }
    }
}

/// Jobs currently in progress.
pub async fn operations(erp: Option<&dyn ErpApi>, now_ms: i64) -> OperationsPayload {
    let last_updated = iso_timestamp(now_ms);
    match get(erp, "/jobs?status=InProgress").await {
        Ok(raw) => OperationsPayload { operations: normalize_operations(&raw), last_updated, error: None },
        Err(e) => {
            warn!(error = %e, "operations fetch failed");
            OperationsPayload {
                operations: Vec::new(),
                last_updated,
                error: Some(format!("Failed to fetch operations: {e}")),
            }
        }
    }
}

/// Completed-job counts spread across the fixed work centres.
pub async fn production(erp: Option<&dyn ErpApi>, now_ms: i64) -> ProductionPayload {
    let last_updated = iso_timestamp(now_ms);
    match get(erp, "/jobs?status=Complete").await {
        Ok(raw) => {
            let completed = rows(&raw, &["data", "jobs"]).len();
            let (production, total_completed) = normalize_production(completed);
            ProductionPayload { production, total_completed, last_updated, error: None }
        }
        Err(e) => {
            warn!(error = %e, "production fetch failed");
            ProductionPayload {
                production: Vec::new(),
                total_completed: 0,
                last_updated,
                error: Some(format!("Failed to fetch production: {e}")),
            }
        }
    }
}

/// ERP employee directory.
pub async fn employees(erp: Option<&dyn ErpApi>) -> ErpEmployeesPayload {
    match get(erp, "/employees").await {
        Ok(raw) => ErpEmployeesPayload { employees: normalize_employees(&raw), error: None },
        Err(e) => {
            warn!(error = %e, "employee fetch failed");
            ErpEmployeesPayload { employees: Vec::new(), error: Some(format!("Failed to fetch employees: {e}")) }
        }
    }
}

/// Active time-clock timers.
pub async fn timers(erp: Option<&dyn ErpApi>) -> TimersPayload {
    match get(erp, "/timeclock/timers?status=active").await {
        Ok(raw) => TimersPayload { timers: normalize_timers(&raw), error: None },
        Err(e) => {
            warn!(error = %e, "timer fetch failed");
            TimersPayload { timers: Vec::new(), error: Some(format!("Failed to fetch timers: {e}")) }
        }
    }
}

/// Start a timer for an employee.
///
/// # Errors
///
/// Returns `MissingField("employeeId")` when the request has no employee id.
/// Upstream failures are reported inside the `ClockResponse`.
pub async fn clock_in(erp: Option<&dyn ErpApi>, request: &ClockInRequest, now_ms: i64) -> Result<ClockResponse, ErpError> {
    let employee_id = non_blank(request.employee_id.as_deref()).ok_or(ErpError::MissingField("employeeId"))?;
    let body = json!({ "employeeId": employee_id, "clockInTime": iso_timestamp(now_ms) });

    Ok(match post(erp, "/timeclock/clockin", &body).await {
        Ok(timer) => {
            info!(employee_id, "employee clocked in");
            ClockResponse { success: true, timer: Some(timer), ..ClockResponse::default() }
        }
        Err(e) => {
            warn!(employee_id, error = %e, "clock-in failed");
            ClockResponse { success: false, error: Some(e.to_string()), ..ClockResponse::default() }
        }
    })
}

/// Stop a running timer.
///
/// # Errors
///
/// Returns `MissingField("timerId")` when the request has no timer id.
/// Upstream failures are reported inside the `ClockResponse`.
pub async fn clock_out(erp: Option<&dyn ErpApi>, request: &ClockOutRequest, now_ms: i64) -> Result<ClockResponse, ErpError> {
    let timer_id = non_blank(request.timer_id.as_deref()).ok_or(ErpError::MissingField("timerId"))?;
    let body = json!({ "timerId": timer_id, "clockOutTime": iso_timestamp(now_ms) });

    Ok(match post(erp, "/timeclock/clockout", &body).await {
        Ok(result) => {
            info!(timer_id, "timer clocked out");
            ClockResponse { success: true, result: Some(result), ..ClockResponse::default() }
        }
        Err(e) => {
            warn!(timer_id, error = %e, "clock-out failed");
            ClockResponse { success: false, error: Some(e.to_string()), ..ClockResponse::default() }
        }
    })
}

async fn post(erp: Option<&dyn ErpApi>, path: &str, body: &Value) -> Result<Value, ErpError> {
    erp.ok_or(ErpError::NotConfigured)?.post_json(path, body).await
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// =============================================================================
// NORMALIZERS
// =============================================================================

/// Map raw on-hand rows and sort them out-of-stock, then low, then ok,
/// then by item number.
#[must_use]
pub fn normalize_inventory(raw: &Value) -> Vec<InventoryItem> {
    let mut items: Vec<InventoryItem> = rows(raw, &["data", "items"])
        .iter()
        .enumerate()
        .map(|(i, row)| InventoryItem {
            item_id: text(row, &["itemId", "id", "ItemId"]).unwrap_or_else(|| format!("item-{i}")),
            item_number: text(row, &["itemNumber", "ItemNumber", "number", "id"]).unwrap_or_else(|| "Unknown".into()),
            description: text(row, &["description", "Description", "name"]).unwrap_or_else(|| "No description".into()),
            on_hand: number(row, &["quantity", "onHand", "OnHand"]).unwrap_or(0.0),
            available: number(row, &["available", "Available", "quantity"]).unwrap_or(0.0),
            reserved: number(row, &["reserved", "Reserved"]).unwrap_or(0.0),
            unit: text(row, &["unit", "Unit", "uom"]).unwrap_or_else(|| "EA".into()),
            low_stock_threshold: number(row, &["reorderPoint", "ReorderPoint", "minQuantity"])
                .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD),
        })
        .collect();

    items.sort_by(|a, b| {
        stock_rank(a)
            .cmp(&stock_rank(b))
            .then_with(|| a.item_number.cmp(&b.item_number))
    });
    items
}

fn stock_rank(item: &InventoryItem) -> u8 {
    if item.on_hand == 0.0 {
        0
    } else if item.on_hand <= item.low_stock_threshold {
        1
    } else {
        2
    }
}

/// Map in-progress jobs to operations with a capped completion percentage.
#[must_use]
pub fn normalize_operations(raw: &Value) -> Vec<Operation> {
    rows(raw, &["data", "jobs"])
        .iter()
        .enumerate()
        .map(|(i, job)| {
            let time_spent = number(job, &["actualTime", "ActualTime"]).unwrap_or(0.0);
            let time_estimated =
                number(job, &["estimatedTime", "EstimatedTime", "standardTime"]).unwrap_or(DEFAULT_ESTIMATED_SECS);
            Operation {
                id: text(job, &["id", "Id"]).unwrap_or_else(|| format!("op-{i}")),
                status: text(job, &["status", "Status"]).unwrap_or_else(|| "InProgress".into()),
                machine: text(job, &["equipmentName", "EquipmentName", "workCenter", "WorkCenter"])
                    .unwrap_or_else(|| "Machine".into()),
                job_number: text(job, &["jobNumber", "JobNumber", "number", "id"]).unwrap_or_else(|| "Unknown".into()),
                part_number: text(job, &["partNumber", "PartNumber", "part"]).unwrap_or_default(),
                description: text(job, &["description", "Description", "name"]).unwrap_or_default(),
                personnel: Vec::new(),
                time_spent,
                time_estimated,
                completion_percentage: completion_percentage(time_spent, time_estimated),
                is_late: false,
            }
        })
        .collect()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn completion_percentage(spent: f64, estimated: f64) -> u32 {
    if estimated <= 0.0 {
        return 0;
    }
    (spent / estimated * 100.0).round().clamp(0.0, 100.0) as u32
}

/// Distribute `completed_jobs` across the fixed work centres.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn normalize_production(completed_jobs: usize) -> (Vec<WorkCenter>, u32) {
    let total = u32::try_from(completed_jobs).unwrap_or(u32::MAX);
    let centers = WORK_CENTERS
        .iter()
        .map(|&(id, name, share, target)| {
            let completed = (f64::from(total) * share).floor() as u32;
            let efficiency = if target > 0 { (f64::from(completed) / f64::from(target) * 100.0).round() as u32 } else { 0 };
            WorkCenter { id: id.to_owned(), name: name.to_owned(), completed, target, efficiency }
        })
        .collect();
    (centers, total)
}

/// Map ERP employees, splitting a combined `name` when first/last are absent.
#[must_use]
pub fn normalize_employees(raw: &Value) -> Vec<ErpEmployee> {
    rows(raw, &["data", "employees"])
        .iter()
        .map(|emp| {
            let full_name = text(emp, &["name"]).unwrap_or_default();
            let mut parts = full_name.split(' ');
            let first_from_name = parts.next().filter(|p| !p.is_empty()).map(str::to_owned);
            let last_from_name = parts.collect::<Vec<_>>().join(" ");
            let id = text(emp, &["id"]).unwrap_or_default();
            let employee_number = text(emp, &["employeeNumber"]);
            ErpEmployee {
                first_name: text(emp, &["firstName"]).or(first_from_name).unwrap_or_else(|| "Unknown".into()),
                last_name: text(emp, &["lastName"]).unwrap_or(last_from_name),
                pin: text(emp, &["pin"]).or_else(|| employee_number.clone()),
                employee_number: employee_number.unwrap_or_else(|| id.clone()),
                id,
            }
        })
        .collect()
}

/// Map active timers, composing a display name when none is given.
#[must_use]
pub fn normalize_timers(raw: &Value) -> Vec<ActiveTimer> {
    rows(raw, &["data", "timers"])
        .iter()
        .map(|timer| {
            let composed = format!(
                "{} {}",
                text(timer, &["firstName"]).unwrap_or_default(),
                text(timer, &["lastName"]).unwrap_or_default()
            );
            ActiveTimer {
                id: text(timer, &["id"]).unwrap_or_default(),
                employee_id: text(timer, &["employeeId"]).unwrap_or_default(),
                employee_name: text(timer, &["employeeName"]).unwrap_or_else(|| composed.trim().to_owned()),
                start_time: text(timer, &["startTime", "clockInTime"]),
                job_number: text(timer, &["jobNumber", "jobId"]),
            }
        })
        .collect()
}

/// The list inside an upstream payload: the value itself when it is an
/// array, otherwise the first array found under `wrappers`.
fn rows<'a>(raw: &'a Value, wrappers: &[&str]) -> &'a [Value] {
    if let Some(list) = raw.as_array() {
        return list;
    }
    wrappers
        .iter()
        .find_map(|key| raw.get(*key).and_then(Value::as_array))
        .map_or(&[], Vec::as_slice)
}

/// First present, non-empty string (or non-zero number) among `keys`.
fn text(row: &Value, keys: &[&str]) -> Option<String> {
    let obj: &Map<String, Value> = row.as_object()?;
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    })
}

/// First present, non-zero numeric value (numbers or numeric strings) among `keys`.
fn number(row: &Value, keys: &[&str]) -> Option<f64> {
    let obj = row.as_object()?;
    keys.iter().find_map(|key| {
        let value = match obj.get(*key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        (value != 0.0 && value.is_finite()).then_some(value)
    })
}

#[cfg(test)]
#[path = "erp_test.rs"]
mod tests;
