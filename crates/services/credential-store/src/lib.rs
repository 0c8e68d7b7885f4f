//! Credential store.
//!
//! Durable persistence for user credentials: password hashes, lockout
//! counters and password reset tokens, backed by PostgreSQL through SeaORM.
//! The auth service talks to it only through [`UserRepository`].

pub mod infra;
pub mod repository;

pub use infra::{Database, MigrationState, Migrator};
pub use repository::{UserRepository, UserStore};

#[cfg(any(test, feature = "test-utils"))]
pub use repository::MockUserRepository;

/// Migration action type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Run a migration action against an already-open database.
///
/// Returns the migration table for [`MigrateAction::Status`] and an empty
/// list otherwise.
pub async fn run_migrations(
    db: &Database,
    action: MigrateAction,
) -> Result<Vec<MigrationState>, sea_orm::DbErr> {
    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            tracing::info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            tracing::info!("Rolled back last migration");
        }
        MigrateAction::Status => return db.migration_status().await,
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            tracing::info!("Database reset and migrations applied");
        }
    }

    Ok(Vec::new())
}
