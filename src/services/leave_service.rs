// src/services/leave_service.rs

use chrono::NaiveDate;
use sqlx::{Acquire, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{EmployeeRepository, LeaveRepository},
    middleware::{auth::AuthenticatedUser, organization::OrganizationContext},
    models::{
        employee::Employee,
        leave::{CreateLeaveRequest, LeaveRequest, LeaveStatus},
        organization::MemberRole,
    },
};

/// Dias corridos, inclusivos: 2024-02-01 a 2024-02-05 = 5.
pub fn count_days(start_date: NaiveDate, end_date: NaiveDate) -> Result<i32, AppError> {
    if end_date < start_date {
        return Err(AppError::InvalidInput("end_date < start_date".into()));
    }

    let days = (end_date - start_date).num_days() + 1;
    i32::try_from(days).map_err(|_| AppError::InvalidInput("leave period too long".into()))
}

/// pending -> approved | rejected. Estados finais não voltam atrás.
pub fn decide_transition(current: LeaveStatus, decision: LeaveStatus) -> Result<LeaveStatus, AppError> {
    match (current, decision) {
        (LeaveStatus::Pending, LeaveStatus::Approved | LeaveStatus::Rejected) => Ok(decision),
        (LeaveStatus::Pending, LeaveStatus::Pending) => {
            Err(AppError::InvalidInput("decision must be approved or rejected".into()))
        }
        _ => Err(AppError::StateConflict("leave_already_decided")),
    }
}

/// Membros simples só pedem férias para o próprio cadastro
/// (casado pelo e-mail do token).
pub fn ensure_can_file_for(role: MemberRole, user: &AuthenticatedUser, employee: &Employee) -> Result<(), AppError> {
    if role != MemberRole::Member {
        return Ok(());
    }

    let own = user
        .0
        .email
        .as_deref()
        .is_some_and(|email| email.eq_ignore_ascii_case(&employee.email));
    if own {
        Ok(())
    } else {
        Err(AppError::Forbidden("hr:manage".into()))
    }
}

#[derive(Clone)]
pub struct LeaveService {
    repo: LeaveRepository,
    employee_repo: EmployeeRepository,
}

impl LeaveService {
    pub fn new(repo: LeaveRepository, employee_repo: EmployeeRepository) -> Self {
        Self { repo, employee_repo }
    }

    pub async fn create_request<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        user: &AuthenticatedUser,
        input: &CreateLeaveRequest,
    ) -> Result<LeaveRequest, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let days = count_days(input.start_date, input.end_date)?;

        let mut tx = executor.begin().await?;

        let employee = self.employee_repo.find_employee(&mut *tx, org, input.employee_id).await?;
        if !employee.is_active {
            return Err(AppError::ResourceNotFound(format!("employee {}", employee.id)));
        }
        ensure_can_file_for(org.role, user, &employee)?;

        let request = self
            .repo
            .insert_request(
                &mut *tx,
                org,
                employee.id,
                input.leave_type,
                input.start_date,
                input.end_date,
                days,
                input.comment.as_deref(),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            organization_id = %org.organization_id,
            leave_request_id = %request.id,
            employee_id = %employee.id,
            days,
            "Pedido de férias criado"
        );

        Ok(request)
    }

    pub async fn list_requests<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        status: Option<LeaveStatus>,
        employee_id: Option<Uuid>,
    ) -> Result<Vec<LeaveRequest>, AppError>
    where
        E: Acquire<'e, Database = Postgres, Connection = &'e mut sqlx::PgConnection>,
    {
        let mut conn = executor.acquire().await?;
        self.repo.list_requests(&mut *conn, org, status, employee_id).await
    }

    /// Aprova ou recusa. O aprovador é sempre quem chama.
    pub async fn decide<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        request_id: Uuid,
        decision: LeaveStatus,
        approver: &AuthenticatedUser,
        comment: Option<&str>,
    ) -> Result<LeaveRequest, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self.repo.find_request(&mut *tx, org, request_id).await?;
        let status = decide_transition(current.status, decision)?;

        let decided = self
            .repo
            .record_decision(&mut *tx, org, request_id, status, approver.0.id, comment)
            .await?
            .ok_or(AppError::StateConflict("leave_already_decided"))?;

        tx.commit().await?;

        tracing::info!(
            organization_id = %org.organization_id,
            leave_request_id = %request_id,
            status = ?status,
            approver_id = %approver.0.id,
            "Pedido de férias decidido"
        );

        Ok(decided)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::User;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn employee(email: &str) -> Employee {
        Employee {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            first_name: "Camille".into(),
            last_name: "Lefèvre".into(),
            email: email.into(),
            job_title: None,
            monthly_salary: Decimal::from(3200),
            hired_at: date(2024, 9, 2),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn user(email: &str) -> AuthenticatedUser {
        AuthenticatedUser(User { id: Uuid::new_v4(), email: Some(email.into()) })
    }

    #[test]
    fn counts_calendar_days_inclusively() {
        assert_eq!(count_days(date(2024, 2, 1), date(2024, 2, 5)).unwrap(), 5);
        assert_eq!(count_days(date(2024, 2, 1), date(2024, 2, 1)).unwrap(), 1);
        // atravessa o 29 de fevereiro e o fim de semana
        assert_eq!(count_days(date(2024, 2, 26), date(2024, 3, 3)).unwrap(), 7);
    }

    #[test]
    fn rejects_end_before_start() {
        assert!(matches!(
            count_days(date(2024, 2, 5), date(2024, 2, 1)),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn pending_requests_can_be_decided_once() {
        assert_eq!(
            decide_transition(LeaveStatus::Pending, LeaveStatus::Approved).unwrap(),
            LeaveStatus::Approved
        );
        assert_eq!(
            decide_transition(LeaveStatus::Pending, LeaveStatus::Rejected).unwrap(),
            LeaveStatus::Rejected
        );
        for terminal in [LeaveStatus::Approved, LeaveStatus::Rejected] {
            assert!(matches!(
                decide_transition(terminal, LeaveStatus::Approved),
                Err(AppError::StateConflict("leave_already_decided"))
            ));
        }
    }

    #[test]
    fn members_file_only_for_themselves() {
        let camille = employee("camille.lefevre@atelier-dupont.fr");

        assert!(ensure_can_file_for(MemberRole::Member, &user("Camille.Lefevre@atelier-dupont.fr"), &camille).is_ok());
        assert!(matches!(
            ensure_can_file_for(MemberRole::Member, &user("paul@atelier-dupont.fr"), &camille),
            Err(AppError::Forbidden(permission)) if permission == "hr:manage"
        ));
        assert!(ensure_can_file_for(MemberRole::Admin, &user("paul@atelier-dupont.fr"), &camille).is_ok());
    }
}
