//! Standard-role catalog repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use xlsmart_core::{Error, Result, StandardRole, StandardRoleRepository};

/// PostgreSQL implementation of StandardRoleRepository.
#[derive(Clone)]
pub struct PgStandardRoleRepository {
    pool: Pool<Postgres>,
}

const ROLE_COLUMNS: &str = "id, role_title, department, job_family, required_skills, \
     experience_range, description, active";

impl PgStandardRoleRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_row(row: sqlx::postgres::PgRow) -> StandardRole {
        StandardRole {
            id: row.get("id"),
            role_title: row.get("role_title"),
            department: row.get("department"),
            job_family: row.get("job_family"),
            required_skills: row.get("required_skills"),
            experience_range: row.get("experience_range"),
            description: row.get("description"),
            active: row.get("active"),
        }
    }
}

#[async_trait]
impl StandardRoleRepository for PgStandardRoleRepository {
    async fn list_active(&self) -> Result<Vec<StandardRole>> {
        let rows = sqlx::query(&format!(
            "SELECT {ROLE_COLUMNS} FROM xlsmart_standard_roles
             WHERE active = TRUE
             ORDER BY role_title"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_row).collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<StandardRole>> {
        let row = sqlx::query(&format!(
            "SELECT {ROLE_COLUMNS} FROM xlsmart_standard_roles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_row))
    }
}
