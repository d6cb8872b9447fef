//! # xlsmart-db
//!
//! PostgreSQL database layer for the XLSMART analysis backend.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for employees, the standard-role catalog,
//!   role mappings, upload sessions, analysis results, and the bulk job
//!   queue
//!
//! ## Example
//!
//! ```rust,ignore
//! use xlsmart_db::Database;
//! use xlsmart_core::{EntityScope, EmployeeRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/xlsmart").await?;
//!     let employees = db.employees.resolve_scope(&EntityScope::All).await?;
//!     println!("{} employees", employees.len());
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod employees;
pub mod jobs;
pub mod mappings;
pub mod pool;
pub mod roles;
pub mod sessions;

// Re-export core types
pub use xlsmart_core::*;

// Re-export repository implementations
pub use analysis::PgAnalysisResultRepository;
pub use employees::PgEmployeeRepository;
pub use jobs::PgBulkJobRepository;
pub use mappings::PgRoleMappingRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use roles::PgStandardRoleRepository;
pub use sessions::PgSessionRepository;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Employee repository.
    pub employees: PgEmployeeRepository,
    /// Standard-role catalog repository.
    pub roles: PgStandardRoleRepository,
    /// Role-mapping repository.
    pub mappings: PgRoleMappingRepository,
    /// Upload-session ledger repository.
    pub sessions: PgSessionRepository,
    /// Analysis-result repository.
    pub analysis: PgAnalysisResultRepository,
    /// Bulk-job queue repository.
    pub jobs: PgBulkJobRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            employees: PgEmployeeRepository::new(pool.clone()),
            roles: PgStandardRoleRepository::new(pool.clone()),
            mappings: PgRoleMappingRepository::new(pool.clone()),
            sessions: PgSessionRepository::new(pool.clone()),
            analysis: PgAnalysisResultRepository::new(pool.clone()),
            jobs: PgBulkJobRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}
