//! Employee repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use xlsmart_core::{
    AssignmentStatus, Employee, EmployeeRepository, EntityScope, Error, Result,
};

/// PostgreSQL implementation of EmployeeRepository.
#[derive(Clone)]
pub struct PgEmployeeRepository {
    pool: Pool<Postgres>,
}

const EMPLOYEE_COLUMNS: &str = "id, employee_number, name, position, department, skills, \
     experience_years, certifications, assigned_role_id, assignment_status, \
     created_at, updated_at";

impl PgEmployeeRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Convert AssignmentStatus to string for database.
    fn status_to_str(status: AssignmentStatus) -> &'static str {
        match status {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::NeedsReview => "needs_review",
        }
    }

    /// Convert string from database to AssignmentStatus.
    fn str_to_status(s: &str) -> AssignmentStatus {
        match s {
            "assigned" => AssignmentStatus::Assigned,
            "needs_review" => AssignmentStatus::NeedsReview,
            _ => AssignmentStatus::Pending, // fallback
        }
    }

    /// Parse an employee row into an Employee struct.
    fn parse_row(row: sqlx::postgres::PgRow) -> Employee {
        Employee {
            id: row.get("id"),
            employee_number: row.get("employee_number"),
            name: row.get("name"),
            position: row.get("position"),
            department: row.get("department"),
            skills: row.get("skills"),
            experience_years: row.get("experience_years"),
            certifications: row.get("certifications"),
            assigned_role_id: row.get("assigned_role_id"),
            assignment_status: Self::str_to_status(row.get("assignment_status")),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl EmployeeRepository for PgEmployeeRepository {
    async fn get(&self, id: Uuid) -> Result<Option<Employee>> {
        let row = sqlx::query(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM xlsmart_employees WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_row))
    }

    async fn resolve_scope(&self, scope: &EntityScope) -> Result<Vec<Employee>> {
        // Employee number gives a stable processing order across retries.
        let rows = match scope {
            EntityScope::All => {
                sqlx::query(&format!(
                    "SELECT {EMPLOYEE_COLUMNS} FROM xlsmart_employees
                     ORDER BY employee_number"
                ))
                .fetch_all(&self.pool)
                .await
            }
            EntityScope::Department { identifier } => {
                sqlx::query(&format!(
                    "SELECT {EMPLOYEE_COLUMNS} FROM xlsmart_employees
                     WHERE department ILIKE $1
                     ORDER BY employee_number"
                ))
                .bind(identifier)
                .fetch_all(&self.pool)
                .await
            }
            EntityScope::EmployeeIds { employee_ids } => {
                sqlx::query(&format!(
                    "SELECT {EMPLOYEE_COLUMNS} FROM xlsmart_employees
                     WHERE id = ANY($1)
                     ORDER BY employee_number"
                ))
                .bind(employee_ids)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_row).collect())
    }

    async fn assign_role(
        &self,
        employee_id: Uuid,
        role_id: Uuid,
        status: AssignmentStatus,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE xlsmart_employees
             SET assigned_role_id = $1, assignment_status = $2, updated_at = $3
             WHERE id = $4",
        )
        .bind(role_id)
        .bind(Self::status_to_str(status))
        .bind(Utc::now())
        .bind(employee_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::EmployeeNotFound(employee_id));
        }
        Ok(())
    }

    async fn mark_pending(&self, employee_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE xlsmart_employees
             SET assigned_role_id = NULL, assignment_status = 'pending', updated_at = $1
             WHERE id = $2",
        )
        .bind(Utc::now())
        .bind(employee_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::EmployeeNotFound(employee_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        for status in [
            AssignmentStatus::Pending,
            AssignmentStatus::Assigned,
            AssignmentStatus::NeedsReview,
        ] {
            let s = PgEmployeeRepository::status_to_str(status);
            assert_eq!(PgEmployeeRepository::str_to_status(s), status);
        }
    }

    #[test]
    fn unknown_status_falls_back_to_pending() {
        assert_eq!(
            PgEmployeeRepository::str_to_status("garbage"),
            AssignmentStatus::Pending
        );
        assert_eq!(
            PgEmployeeRepository::str_to_status(""),
            AssignmentStatus::Pending
        );
    }
}
