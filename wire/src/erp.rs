//! Normalized ERP payloads served by `/api/fulcrum/*`.
//!
//! Every payload carries an optional `error`. On upstream failure the server
//! still answers 200 with an empty collection and the error text, so
//! consumers only ever need to check that one field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub item_id: String,
    pub item_number: String,
    pub description: String,
    pub on_hand: f64,
    pub available: f64,
    pub reserved: f64,
    pub unit: String,
    pub low_stock_threshold: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryPayload {
    pub items: Vec<InventoryItem>,
    pub last_updated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: String,
    pub status: String,
    pub machine: String,
    pub job_number: String,
    pub part_number: String,
    pub description: String,
    pub personnel: Vec<String>,
    /// Seconds.
    pub time_spent: f64,
    /// Seconds.
    pub time_estimated: f64,
    pub completion_percentage: u32,
    pub is_late: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationsPayload {
    pub operations: Vec<Operation>,
    pub last_updated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCenter {
    pub id: String,
    pub name: String,
    pub completed: u32,
    pub target: u32,
    pub efficiency: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionPayload {
    pub production: Vec<WorkCenter>,
    pub total_completed: u32,
    pub last_updated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErpEmployee {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub employee_number: String,
    pub pin: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErpEmployeesPayload {
    pub employees: Vec<ErpEmployee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTimer {
    pub id: String,
    pub employee_id: String,
    pub employee_name: String,
    pub start_time: Option<String>,
    pub job_number: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimersPayload {
    pub timers: Vec<ActiveTimer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockInRequest {
    #[serde(default)]
    pub employee_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockOutRequest {
    #[serde(default)]
    pub timer_id: Option<String>,
}

/// Clock-in/clock-out outcome. The upstream body is passed through verbatim,
/// under `timer` for clock-in and under `result` for clock-out.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClockResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
