// src/services/payroll_service.rs

use std::{collections::HashMap, sync::Arc};

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;
use sqlx::{Acquire, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{DocumentRepository, EmployeeRepository, LeaveRepository},
    middleware::organization::OrganizationContext,
    models::{
        document::{DocumentKind, DocumentLink},
        employee::Employee,
        leave::{LeaveRequest, LeaveType},
    },
    services::storage::{Storage, UrlSigner},
};

/// Primeiro e último dia de um mês `YYYY-MM`.
pub fn parse_month(month: &str) -> Result<(NaiveDate, NaiveDate), AppError> {
    let invalid = || AppError::InvalidInput(format!("month '{month}' (YYYY-MM)"));

    let (year, mon) = month.split_once('-').ok_or_else(invalid)?;
    if year.len() != 4 || mon.len() != 2 {
        return Err(invalid());
    }
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let mon: u32 = mon.parse().map_err(|_| invalid())?;

    let first = NaiveDate::from_ymd_opt(year, mon, 1).ok_or_else(invalid)?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(invalid)?;

    Ok((first, last))
}

/// Dias do pedido que caem dentro de `[from, to]`.
pub fn overlap_days(request: &LeaveRequest, from: NaiveDate, to: NaiveDate) -> i64 {
    let start = request.start_date.max(from);
    let end = request.end_date.min(to);
    if end < start {
        0
    } else {
        (end - start).num_days() + 1
    }
}

/// Uma linha do CSV da folha.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayrollRow {
    pub employee_id: Uuid,
    pub last_name: String,
    pub first_name: String,
    pub email: String,
    pub job_title: String,
    pub monthly_salary: String,
    pub paid_leave_days: i64,
    pub sick_days: i64,
    pub unpaid_days: i64,
}

#[derive(Default)]
struct LeaveTally {
    paid: i64,
    sick: i64,
    unpaid: i64,
}

/// Cruza funcionários ativos com as férias aprovadas do período.
pub fn build_rows(
    employees: &[Employee],
    leaves: &[LeaveRequest],
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<PayrollRow> {
    let mut tallies: HashMap<Uuid, LeaveTally> = HashMap::new();
    for leave in leaves {
        let days = overlap_days(leave, from, to);
        let tally = tallies.entry(leave.employee_id).or_default();
        match leave.leave_type {
            LeaveType::PaidLeave | LeaveType::Rtt => tally.paid += days,
            LeaveType::Sick => tally.sick += days,
            LeaveType::Unpaid | LeaveType::Other => tally.unpaid += days,
        }
    }

    let mut rows: Vec<PayrollRow> = employees
        .iter()
        .filter(|employee| employee.is_active)
        .map(|employee| {
            let tally = tallies.remove(&employee.id).unwrap_or_default();
            PayrollRow {
                employee_id: employee.id,
                last_name: employee.last_name.clone(),
                first_name: employee.first_name.clone(),
                email: employee.email.clone(),
                job_title: employee.job_title.clone().unwrap_or_default(),
                monthly_salary: format!("{:.2}", employee.monthly_salary),
                paid_leave_days: tally.paid,
                sick_days: tally.sick,
                unpaid_days: tally.unpaid,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        a.last_name
            .to_lowercase()
            .cmp(&b.last_name.to_lowercase())
            .then_with(|| a.first_name.to_lowercase().cmp(&b.first_name.to_lowercase()))
    });
    rows
}

pub fn write_csv(rows: &[PayrollRow]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::Document(e.to_string()))?;
    }
    // Sem linhas o cabeçalho não sai sozinho
    if rows.is_empty() {
        writer
            .write_record([
                "employee_id", "last_name", "first_name", "email", "job_title",
                "monthly_salary", "paid_leave_days", "sick_days", "unpaid_days",
            ])
            .map_err(|e| AppError::Document(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Document(e.to_string()))
}

pub fn export_storage_key(organization_id: Uuid, first_day: NaiveDate, export_id: Uuid) -> String {
    format!(
        "payroll-exports/{organization_id}/{:04}-{:02}-{export_id}.csv",
        first_day.year(),
        first_day.month()
    )
}

#[derive(Clone)]
pub struct PayrollService {
    employee_repo: EmployeeRepository,
    leave_repo: LeaveRepository,
    document_repo: DocumentRepository,
    storage: Arc<dyn Storage>,
}

impl PayrollService {
    pub fn new(
        employee_repo: EmployeeRepository,
        leave_repo: LeaveRepository,
        document_repo: DocumentRepository,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self { employee_repo, leave_repo, document_repo, storage }
    }

    /// Gera o CSV do mês, guarda e devolve o documento com URL assinada.
    pub async fn export_month<'e, E>(
        &self,
        executor: E,
        org: &OrganizationContext,
        month: &str,
        signer: &UrlSigner,
        now: i64,
    ) -> Result<DocumentLink, AppError>
    where
        E: Acquire<'e, Database = Postgres, Connection = &'e mut sqlx::PgConnection>,
    {
        let (first_day, last_day) = parse_month(month)?;
        let mut conn = executor.acquire().await?;

        let employees = self.employee_repo.list_employees(&mut *conn, org, true).await?;
        let leaves = self
            .leave_repo
            .list_approved_overlapping(&mut *conn, org, first_day, last_day)
            .await?;

        let rows = build_rows(&employees, &leaves, first_day, last_day);
        let csv = write_csv(&rows)?;

        let key = export_storage_key(org.organization_id, first_day, Uuid::new_v4());
        self.storage.put(&key, csv).await?;
        let document = self
            .document_repo
            .record_document(&mut *conn, org, DocumentKind::PayrollExport, &key)
            .await?;

        tracing::info!(
            organization_id = %org.organization_id,
            month,
            employees = rows.len(),
            key = %key,
            "Exportação da folha gerada"
        );

        let url = signer.sign(&document.storage_key, now)?;
        Ok(DocumentLink { document, url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::leave::LeaveStatus;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn employee(first: &str, last: &str, active: bool) -> Employee {
        Employee {
            id: Uuid::new_v4(),
            organization_id: Uuid::nil(),
            first_name: first.into(),
            last_name: last.into(),
            email: format!("{}@atelier-dupont.fr", first.to_lowercase()),
            job_title: Some("Artisan".into()),
            monthly_salary: Decimal::new(320000, 2),
            hired_at: date(2024, 1, 1),
            is_active: active,
            created_at: Utc::now(),
        }
    }

    fn leave(employee_id: Uuid, leave_type: LeaveType, start: NaiveDate, end: NaiveDate) -> LeaveRequest {
        LeaveRequest {
            id: Uuid::new_v4(),
            organization_id: Uuid::nil(),
            employee_id,
            leave_type,
            start_date: start,
            end_date: end,
            days: ((end - start).num_days() + 1) as i32,
            status: LeaveStatus::Approved,
            approver_id: None,
            comment: None,
            decided_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn parses_months_including_leap_february() {
        assert_eq!(parse_month("2024-02").unwrap(), (date(2024, 2, 1), date(2024, 2, 29)));
        assert_eq!(parse_month("2026-12").unwrap(), (date(2026, 12, 1), date(2026, 12, 31)));
        for bad in ["2026-13", "2026-1", "26-01", "2026/01", ""] {
            assert!(parse_month(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn only_days_inside_the_month_count() {
        let id = Uuid::new_v4();
        let (from, to) = parse_month("2026-09").unwrap();

        let spanning = leave(id, LeaveType::PaidLeave, date(2026, 8, 28), date(2026, 9, 3));
        assert_eq!(overlap_days(&spanning, from, to), 3);

        let outside = leave(id, LeaveType::PaidLeave, date(2026, 10, 1), date(2026, 10, 2));
        assert_eq!(overlap_days(&outside, from, to), 0);
    }

    #[test]
    fn rows_split_leave_types_and_sort_by_name() {
        let zoe = employee("Zoé", "Bernard", true);
        let alain = employee("Alain", "Bernard", true);
        let marc = employee("Marc", "Aubert", true);
        let gone = employee("Paul", "Petit", false);
        let (from, to) = parse_month("2026-09").unwrap();

        let leaves = vec![
            leave(alain.id, LeaveType::PaidLeave, date(2026, 9, 1), date(2026, 9, 2)),
            leave(alain.id, LeaveType::Rtt, date(2026, 9, 10), date(2026, 9, 10)),
            leave(alain.id, LeaveType::Sick, date(2026, 9, 20), date(2026, 9, 21)),
            leave(zoe.id, LeaveType::Unpaid, date(2026, 9, 29), date(2026, 10, 5)),
        ];

        let rows = build_rows(&[zoe.clone(), alain.clone(), marc, gone], &leaves, from, to);
        let names: Vec<_> = rows.iter().map(|r| r.first_name.as_str()).collect();
        assert_eq!(names, vec!["Marc", "Alain", "Zoé"]);

        assert_eq!((rows[1].paid_leave_days, rows[1].sick_days, rows[1].unpaid_days), (3, 2, 0));
        assert_eq!(rows[2].unpaid_days, 2);
        assert_eq!(rows[0].monthly_salary, "3200.00");
    }

    #[test]
    fn csv_has_a_header_row() {
        let (from, to) = parse_month("2026-09").unwrap();
        let rows = build_rows(&[employee("Marc", "Aubert", true)], &[], from, to);

        let csv = String::from_utf8(write_csv(&rows).unwrap()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("employee_id,last_name,first_name,email,job_title,monthly_salary,paid_leave_days,sick_days,unpaid_days")
        );
        assert!(lines.next().unwrap().contains(",Aubert,Marc,marc@atelier-dupont.fr,Artisan,3200.00,0,0,0"));

        let empty = String::from_utf8(write_csv(&[]).unwrap()).unwrap();
        assert!(empty.starts_with("employee_id,"));
    }

    #[test]
    fn export_keys_are_scoped_by_organization_and_month() {
        let key = export_storage_key(Uuid::nil(), date(2026, 9, 1), Uuid::nil());
        assert_eq!(
            key,
            "payroll-exports/00000000-0000-0000-0000-000000000000/2026-09-00000000-0000-0000-0000-000000000000.csv"
        );
    }
}
