//! User database entity for SeaORM.

use sea_orm::entity::prelude::*;

use domain::{User, UserRole};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Always stored lowercased
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub is_active: bool,
    pub email_verified: bool,
    pub last_login: Option<DateTimeUtc>,
    pub failed_login_count: i32,
    pub locked_until: Option<DateTimeUtc>,
    #[sea_orm(unique)]
    pub password_reset_token: Option<String>,
    pub password_reset_expiry: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Convert database model to domain entity
impl From<Model> for User {
    fn from(model: Model) -> Self {
        User {
            id: model.id,
            email: model.email,
            password_hash: model.password_hash,
            first_name: model.first_name,
            last_name: model.last_name,
            role: UserRole::from(model.role.as_str()),
            is_active: model.is_active,
            email_verified: model.email_verified,
            last_login: model.last_login,
            failed_login_count: u32::try_from(model.failed_login_count).unwrap_or(0),
            locked_until: model.locked_until,
            password_reset_token: model.password_reset_token,
            password_reset_expiry: model.password_reset_expiry,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
