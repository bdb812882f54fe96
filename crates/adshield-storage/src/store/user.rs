use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};

use crate::entities::user::{self, Column as UserCol, Entity as UserEntity};
use crate::store::Store;

/// Digest recipient. No credentials live here; auth is out of scope for
/// the server (cron/admin routes use a shared secret).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub company_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn model_to_user(m: user::Model) -> UserRow {
    UserRow {
        id: m.id,
        email: m.email,
        company_id: m.company_id,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl Store {
    pub async fn insert_user(&self, email: &str, company_id: Option<&str>) -> Result<UserRow> {
        let now = Utc::now().fixed_offset();
        let am = user::ActiveModel {
            id: Set(adshield_common::id::next_id()),
            email: Set(email.to_string()),
            company_id: Set(company_id.map(str::to_string)),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(model_to_user(model))
    }

    pub async fn list_users_by_company(&self, company_id: &str) -> Result<Vec<UserRow>> {
        let rows = UserEntity::find()
            .filter(UserCol::CompanyId.eq(company_id))
            .order_by(UserCol::CreatedAt, Order::Asc)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(model_to_user).collect())
    }
}
