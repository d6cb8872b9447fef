//! Role-mapping repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use xlsmart_core::{
    new_v7, Error, MappingStatus, NewRoleMapping, Result, RoleMappingRepository,
};

/// PostgreSQL implementation of RoleMappingRepository.
#[derive(Clone)]
pub struct PgRoleMappingRepository {
    pool: Pool<Postgres>,
}

impl PgRoleMappingRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Convert MappingStatus to string for database.
    fn status_to_str(status: MappingStatus) -> &'static str {
        match status {
            MappingStatus::AutoMapped => "auto_mapped",
            MappingStatus::ManualReview => "manual_review",
            MappingStatus::Approved => "approved",
            MappingStatus::Rejected => "rejected",
        }
    }
}

#[async_trait]
impl RoleMappingRepository for PgRoleMappingRepository {
    async fn insert(&self, mapping: NewRoleMapping) -> Result<Uuid> {
        // The schema carries a matching CHECK constraint; rejecting here
        // gives a typed error instead of a database error.
        if !(0.0..=100.0).contains(&mapping.mapping_confidence) {
            return Err(Error::InvalidInput(format!(
                "mapping_confidence {} outside [0, 100]",
                mapping.mapping_confidence
            )));
        }

        let id = new_v7();
        sqlx::query(
            "INSERT INTO xlsmart_role_mappings
                 (id, original_role_title, standardized_role_title, standard_role_id,
                  mapping_confidence, mapping_status, requires_manual_review, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(id)
        .bind(&mapping.original_role_title)
        .bind(&mapping.standardized_role_title)
        .bind(mapping.standard_role_id)
        .bind(mapping.mapping_confidence)
        .bind(Self::status_to_str(mapping.mapping_status))
        .bind(mapping.requires_manual_review)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn update_status(&self, id: Uuid, status: MappingStatus) -> Result<()> {
        let result = sqlx::query(
            "UPDATE xlsmart_role_mappings SET mapping_status = $1 WHERE id = $2",
        )
        .bind(Self::status_to_str(status))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("role mapping {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_are_unique() {
        let statuses = [
            MappingStatus::AutoMapped,
            MappingStatus::ManualReview,
            MappingStatus::Approved,
            MappingStatus::Rejected,
        ];
        let mut strings: Vec<&str> = statuses
            .iter()
            .map(|s| PgRoleMappingRepository::status_to_str(*s))
            .collect();
        strings.sort();
        strings.dedup();
        assert_eq!(strings.len(), statuses.len());
    }
}
