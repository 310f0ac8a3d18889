// src/models/leave.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "leave_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeaveType {
    PaidLeave, // Congés payés
    Rtt,
    Sick,
    Unpaid,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "leave_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LeaveRequest {
    pub id: Uuid,

    #[schema(ignore)]
    pub organization_id: Uuid,

    pub employee_id: Uuid,
    pub leave_type: LeaveType,

    #[schema(value_type = String, format = Date, example = "2024-02-01")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = Date, example = "2024-02-05")]
    pub end_date: NaiveDate,

    // Dias corridos, inclusivos
    #[schema(example = 5)]
    pub days: i32,

    pub status: LeaveStatus,
    pub approver_id: Option<Uuid>,
    pub comment: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

fn validate_leave_dates(input: &CreateLeaveRequest) -> Result<(), ValidationError> {
    if input.end_date < input.start_date {
        let mut err = ValidationError::new("date_order");
        err.message = Some("La date de fin doit être postérieure ou égale à la date de début.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_leave_dates", skip_on_field_errors = false))]
pub struct CreateLeaveRequest {
    pub employee_id: Uuid,
    pub leave_type: LeaveType,

    #[schema(value_type = String, format = Date, example = "2024-02-01")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = Date, example = "2024-02-05")]
    pub end_date: NaiveDate,

    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct DecideLeaveRequest {
    #[validate(length(max = 1000))]
    #[schema(example = "Bonnes vacances !")]
    pub comment: Option<String>,
}
