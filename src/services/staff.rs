//! Employee roster and training records.
//!
//! Plain CRUD over two tables. Training records reference their employee;
//! deleting an employee removes its records through the foreign-key cascade.

use sqlx::SqlitePool;
use tracing::info;
use wire::staff::{Employee, EmployeeUpdate, TrainingRecord};

use super::require;

#[derive(Debug, thiserror::Error)]
pub enum StaffError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("unknown employee: {0}")]
    UnknownEmployee(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

type TrainingRow = (String, String, String, String, String, Option<String>, Option<i64>, Option<String>);

// =============================================================================
// EMPLOYEES
// =============================================================================

/// Every employee ordered by name.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_employees(pool: &SqlitePool) -> Result<Vec<Employee>, StaffError> {
    let rows = sqlx::query_as::<_, (String, String, String, String, String, i64)>(
        "SELECT id, name, department, position, hire_date, created_at FROM employees ORDER BY name ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, name, department, position, hire_date, created_at)| Employee {
            id,
            name,
            department,
            position,
            hire_date,
            created_at: Some(created_at),
        })
        .collect())
}

/// Create an employee. `created_at` defaults to `now_ms` when absent.
///
/// # Errors
///
/// Returns `MissingField` for a blank mandatory field, or a database error
/// (including a duplicate id).
pub async fn create_employee(pool: &SqlitePool, employee: &Employee, now_ms: i64) -> Result<(), StaffError> {
    require(&employee.id, "id").map_err(StaffError::MissingField)?;
    validate_employee_fields(&employee.name, &employee.department, &employee.position, &employee.hire_date)?;

    sqlx::query(
        "INSERT INTO employees (id, name, department, position, hire_date, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(&employee.id)
    .bind(&employee.name)
    .bind(&employee.department)
    .bind(&employee.position)
    .bind(&employee.hire_date)
    .bind(employee.created_at.unwrap_or(now_ms))
    .execute(pool)
    .await?;

    info!(employee_id = %employee.id, name = %employee.name, "employee created");
    Ok(())
}

/// Overwrite an employee's mutable fields. Returns whether a row matched.
///
/// # Errors
///
/// Returns `MissingField` for a blank field, or a database error.
pub async fn update_employee(pool: &SqlitePool, id: &str, update: &EmployeeUpdate) -> Result<bool, StaffError> {
    validate_employee_fields(&update.name, &update.department, &update.position, &update.hire_date)?;

    let result = sqlx::query(
        "UPDATE employees SET name = ?1, department = ?2, position = ?3, hire_date = ?4 WHERE id = ?5",
    )
    .bind(&update.name)
    .bind(&update.department)
    .bind(&update.position)
    .bind(&update.hire_date)
    .bind(id)
    .execute(pool)
    .await?;

    info!(employee_id = %id, matched = result.rows_affected(), "employee updated");
    Ok(result.rows_affected() > 0)
}

/// Delete an employee and, by cascade, its training records.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn delete_employee(pool: &SqlitePool, id: &str) -> Result<(), StaffError> {
    let result = sqlx::query("DELETE FROM employees WHERE id = ?1").bind(id).execute(pool).await?;
    info!(employee_id = %id, matched = result.rows_affected(), "employee deleted");
    Ok(())
}

fn validate_employee_fields(name: &str, department: &str, position: &str, hire_date: &str) -> Result<(), StaffError> {
    require(name, "name").map_err(StaffError::MissingField)?;
    require(department, "department").map_err(StaffError::MissingField)?;
    require(position, "position").map_err(StaffError::MissingField)?;
    require(hire_date, "hireDate").map_err(StaffError::MissingField)?;
    Ok(())
}

// =============================================================================
// TRAINING RECORDS
// =============================================================================

/// Every training record, most recently completed first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_training(pool: &SqlitePool) -> Result<Vec<TrainingRecord>, StaffError> {
    let rows = sqlx::query_as::<_, TrainingRow>(
        "SELECT id, employee_id, training_id, training_type, completed_date, expiry_date, score, notes
         FROM training_records ORDER BY completed_date DESC, rowid DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(id, employee_id, training_id, training_type, completed_date, expiry_date, score, notes)| TrainingRecord {
                id,
                employee_id,
                training_id,
                training_type,
                completed_date,
                expiry_date,
                score,
                notes,
            },
        )
        .collect())
}

/// Create a training record for an existing employee.
///
/// # Errors
///
/// Returns `MissingField` for a blank mandatory field, `UnknownEmployee` if
/// the referenced employee does not exist, or a database error.
pub async fn create_training(pool: &SqlitePool, record: &TrainingRecord, now_ms: i64) -> Result<(), StaffError> {
    require(&record.id, "id").map_err(StaffError::MissingField)?;
    require(&record.employee_id, "employeeId").map_err(StaffError::MissingField)?;
    require(&record.training_id, "trainingId").map_err(StaffError::MissingField)?;
    require(&record.training_type, "trainingType").map_err(StaffError::MissingField)?;
    require(&record.completed_date, "completedDate").map_err(StaffError::MissingField)?;

    let known = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees WHERE id = ?1")
        .bind(&record.employee_id)
        .fetch_one(pool)
        .await?;
    if known == 0 {
        return Err(StaffError::UnknownEmployee(record.employee_id.clone()));
    }

    sqlx::query(
        "INSERT INTO training_records
            (id, employee_id, training_id, training_type, completed_date, expiry_date, score, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(&record.id)
    .bind(&record.employee_id)
    .bind(&record.training_id)
    .bind(&record.training_type)
    .bind(&record.completed_date)
    .bind(record.expiry_date.as_deref().filter(|d| !d.is_empty()))
    .bind(record.score)
    .bind(record.notes.as_deref().filter(|n| !n.is_empty()))
    .bind(now_ms)
    .execute(pool)
    .await?;

    info!(record_id = %record.id, employee_id = %record.employee_id, "training record created");
    Ok(())
}

/// Delete a training record. Unknown ids are no-ops.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn delete_training(pool: &SqlitePool, id: &str) -> Result<(), StaffError> {
    sqlx::query("DELETE FROM training_records WHERE id = ?1").bind(id).execute(pool).await?;
    info!(record_id = %id, "training record deleted");
    Ok(())
}

#[cfg(test)]
#[path = "staff_test.rs"]
mod tests;
