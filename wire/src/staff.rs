//! Employee roster and training-record payloads.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub department: String,
    pub position: String,
    pub hire_date: String,
    /// Epoch milliseconds; the server fills it in when omitted.
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// `PUT /api/employees/:id` body. The id comes from the path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeUpdate {
    pub name: String,
    pub department: String,
    pub position: String,
    pub hire_date: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingRecord {
    pub id: String,
    pub employee_id: String,
    pub training_id: String,
    pub training_type: String,
    pub completed_date: String,
    #[serde(default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}
