//! Analysis-result repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use xlsmart_core::{
    new_v7, AnalysisKind, AnalysisResultRecord, AnalysisResultRepository, Error,
    NewAnalysisResult, Result,
};

/// PostgreSQL implementation of AnalysisResultRepository.
///
/// Result rows are insert-only; there is no update path.
#[derive(Clone)]
pub struct PgAnalysisResultRepository {
    pool: Pool<Postgres>,
}

impl PgAnalysisResultRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Convert AnalysisKind to its stored string.
    fn kind_to_str(kind: AnalysisKind) -> &'static str {
        match kind {
            AnalysisKind::RoleAssignment => "role_assignment",
            AnalysisKind::RoleStandardization => "role_standardization",
            AnalysisKind::CareerPath => "career_path",
            AnalysisKind::MobilityPlan => "mobility_plan",
            AnalysisKind::DevelopmentPathway => "development_pathway",
            AnalysisKind::TrainingAnalysis => "training_analysis",
            AnalysisKind::RetentionPlan => "retention_plan",
        }
    }

    /// Convert string from database to AnalysisKind, by function name or
    /// stored name.
    fn str_to_kind(s: &str) -> Option<AnalysisKind> {
        AnalysisKind::all()
            .iter()
            .copied()
            .find(|k| k.function_name() == s)
            .or_else(|| AnalysisKind::from_path_segment(s))
    }

    fn parse_row(row: sqlx::postgres::PgRow) -> AnalysisResultRecord {
        let kind_str: String = row.get("analysis_kind");
        AnalysisResultRecord {
            id: row.get("id"),
            session_id: row.get("session_id"),
            // Unknown kinds cannot appear unless the table was written by a
            // newer version; map them to CareerPath rather than dropping rows.
            analysis_kind: Self::str_to_kind(&kind_str).unwrap_or(AnalysisKind::CareerPath),
            function_name: row.get("function_name"),
            input_parameters: row.get("input_parameters"),
            analysis_result: row.get("analysis_result"),
            status: row.get("status"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl AnalysisResultRepository for PgAnalysisResultRepository {
    async fn insert(&self, result: NewAnalysisResult) -> Result<Uuid> {
        let id = new_v7();
        sqlx::query(
            "INSERT INTO ai_analysis_results
                 (id, session_id, analysis_kind, function_name, input_parameters,
                  analysis_result, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, 'completed', $7)",
        )
        .bind(id)
        .bind(result.session_id)
        .bind(Self::kind_to_str(result.analysis_kind))
        .bind(result.analysis_kind.function_name())
        .bind(&result.input_parameters)
        .bind(&result.analysis_result)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn list_for_session(&self, session_id: Uuid) -> Result<Vec<AnalysisResultRecord>> {
        let rows = sqlx::query(
            "SELECT id, session_id, analysis_kind, function_name, input_parameters,
                    analysis_result, status, created_at
             FROM ai_analysis_results
             WHERE session_id = $1
             ORDER BY created_at ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_from_function_name() {
        assert_eq!(
            PgAnalysisResultRepository::str_to_kind("bulk-career-paths"),
            Some(AnalysisKind::CareerPath)
        );
        assert_eq!(
            PgAnalysisResultRepository::str_to_kind("employee-role-assignment"),
            Some(AnalysisKind::RoleAssignment)
        );
    }

    #[test]
    fn kind_parses_from_serde_name() {
        assert_eq!(
            PgAnalysisResultRepository::str_to_kind("training_analysis"),
            Some(AnalysisKind::TrainingAnalysis)
        );
    }

    #[test]
    fn kind_round_trip() {
        for kind in AnalysisKind::all() {
            let s = PgAnalysisResultRepository::kind_to_str(*kind);
            assert_eq!(PgAnalysisResultRepository::str_to_kind(s), Some(*kind));
        }
    }

    #[test]
    fn unknown_kind_is_none() {
        assert_eq!(PgAnalysisResultRepository::str_to_kind("nonsense"), None);
    }
}
