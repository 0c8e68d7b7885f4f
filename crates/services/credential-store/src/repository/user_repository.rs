//! User repository implementation.
//!
//! Users are never hard-deleted; deactivation is an `is_active` flip done
//! through [`UserRepository::update`]. Races between concurrent writers are
//! settled by conditional `UPDATE ... WHERE` statements, never by locks held
//! in this process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, SqlErr,
};
use uuid::Uuid;

use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use common::{AppError, AppResult};
use domain::{normalize_email, LoginAttempts, NewUser, User, UserPatch};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Credential store contract.
///
/// Email lookups are case-insensitive: every email is normalized before it
/// is written or compared.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find user by email address (case-insensitive exact match)
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Find the user holding `token`, only while `now < password_reset_expiry`.
    async fn find_by_reset_token(&self, token: &str, now: DateTime<Utc>)
        -> AppResult<Option<User>>;

    /// Create a new user; `Conflict` if the email is taken
    async fn create(&self, new_user: NewUser) -> AppResult<User>;

    /// Merge `patch` into the stored user and bump `updated_at`
    async fn update(&self, id: Uuid, patch: UserPatch) -> AppResult<User>;

    /// Write login-attempt counters only if `failed_login_count` still equals
    /// `expected_count`. Returns `false` when another writer got there first.
    async fn record_login_attempts(
        &self,
        id: Uuid,
        expected_count: u32,
        attempts: LoginAttempts,
    ) -> AppResult<bool>;

    /// Set a new password hash and clear the reset token in one conditional
    /// write. At most one caller can consume a given token.
    async fn consume_reset_token(
        &self,
        token: &str,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> AppResult<Option<User>>;
}

/// SeaORM-backed implementation of UserRepository
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Map an insert failure, turning a unique-email violation into `Conflict`.
fn insert_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::conflict("User"),
        _ => AppError::from(err),
    }
}

fn to_db_count(count: u32) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let result = UserEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn find_by_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::PasswordResetToken.eq(token))
            .filter(user::Column::PasswordResetExpiry.gt(now))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        let email = normalize_email(&new_user.email);

        if self.find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("User"));
        }

        let now = Utc::now();
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            password_hash: Set(new_user.password_hash),
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            role: Set(new_user.role.to_string()),
            is_active: Set(true),
            email_verified: Set(false),
            last_login: Set(None),
            failed_login_count: Set(0),
            locked_until: Set(None),
            password_reset_token: Set(None),
            password_reset_expiry: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        // The unique index still guards the window between check and insert.
        let model = active_model.insert(&self.db).await.map_err(insert_error)?;
        Ok(User::from(model))
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> AppResult<User> {
        let user = UserEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: ActiveModel = user.into();

        if let Some(v) = patch.password_hash {
            active.password_hash = Set(v);
        }
        if let Some(v) = patch.first_name {
            active.first_name = Set(v);
        }
        if let Some(v) = patch.last_name {
            active.last_name = Set(v);
        }
        if let Some(v) = patch.role {
            active.role = Set(v.to_string());
        }
        if let Some(v) = patch.is_active {
            active.is_active = Set(v);
        }
        if let Some(v) = patch.email_verified {
            active.email_verified = Set(v);
        }
        if let Some(v) = patch.last_login {
            active.last_login = Set(v);
        }
        if let Some(v) = patch.failed_login_count {
            active.failed_login_count = Set(to_db_count(v));
        }
        if let Some(v) = patch.locked_until {
            active.locked_until = Set(v);
        }
        if let Some(v) = patch.password_reset_token {
            active.password_reset_token = Set(v);
        }
        if let Some(v) = patch.password_reset_expiry {
            active.password_reset_expiry = Set(v);
        }
        active.updated_at = Set(Utc::now());

        let model = active.update(&self.db).await.map_err(AppError::from)?;
        Ok(User::from(model))
    }

    async fn record_login_attempts(
        &self,
        id: Uuid,
        expected_count: u32,
        attempts: LoginAttempts,
    ) -> AppResult<bool> {
        let result = UserEntity::update_many()
            .col_expr(
                user::Column::FailedLoginCount,
                Expr::value(to_db_count(attempts.failed_login_count)),
            )
            .col_expr(user::Column::LockedUntil, Expr::value(attempts.locked_until))
            .col_expr(user::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(user::Column::Id.eq(id))
            .filter(user::Column::FailedLoginCount.eq(to_db_count(expected_count)))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected == 1)
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> AppResult<Option<User>> {
        let Some(holder) = self.find_by_reset_token(token, now).await? else {
            return Ok(None);
        };

        let result = UserEntity::update_many()
            .col_expr(user::Column::PasswordHash, Expr::value(password_hash))
            .col_expr(
                user::Column::PasswordResetToken,
                Expr::value(Option::<String>::None),
            )
            .col_expr(
                user::Column::PasswordResetExpiry,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .col_expr(user::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(user::Column::Id.eq(holder.id))
            .filter(user::Column::PasswordResetToken.eq(token))
            .filter(user::Column::PasswordResetExpiry.gt(now))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            tracing::debug!(user_id = %holder.id, "Reset token consumed concurrently");
            return Ok(None);
        }

        self.find_by_id(holder.id).await
    }
}
