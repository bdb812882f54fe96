use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::company::{self, Column as CompanyCol, Entity as CompanyEntity};
use crate::store::Store;

/// Company row with its notification preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyRow {
    pub id: String,
    pub name: String,
    pub timezone: String,
    pub currency_code: String,
    pub min_severity: String,
    pub quiet_hours_start: Option<String>,
    pub quiet_hours_end: Option<String>,
    pub digest_hour_local: i32,
    pub slack_webhook_url: Option<String>,
    pub summary_webhook_url: Option<String>,
    pub brand_webhook_urls: Option<String>,
    pub daily_meta_cap: Option<f64>,
    pub alerts_csv_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Settings update; `None` leaves a field unchanged, `Some(None)` clears a
/// nullable field.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CompanyUpdate {
    pub name: Option<String>,
    pub timezone: Option<String>,
    pub currency_code: Option<String>,
    pub min_severity: Option<String>,
    pub quiet_hours_start: Option<Option<String>>,
    pub quiet_hours_end: Option<Option<String>>,
    pub digest_hour_local: Option<i32>,
    pub slack_webhook_url: Option<Option<String>>,
    pub summary_webhook_url: Option<Option<String>>,
    pub brand_webhook_urls: Option<Option<String>>,
    pub daily_meta_cap: Option<Option<f64>>,
    pub alerts_csv_url: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct CompanyFilter {
    pub name_contains: Option<String>,
}

fn model_to_company(m: company::Model) -> CompanyRow {
    CompanyRow {
        id: m.id,
        name: m.name,
        timezone: m.timezone,
        currency_code: m.currency_code,
        min_severity: m.min_severity,
        quiet_hours_start: m.quiet_hours_start,
        quiet_hours_end: m.quiet_hours_end,
        digest_hour_local: m.digest_hour_local,
        slack_webhook_url: m.slack_webhook_url,
        summary_webhook_url: m.summary_webhook_url,
        brand_webhook_urls: m.brand_webhook_urls,
        daily_meta_cap: m.daily_meta_cap,
        alerts_csv_url: m.alerts_csv_url,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl Store {
    pub async fn insert_company(&self, c: &CompanyRow) -> Result<CompanyRow> {
        let now = Utc::now().fixed_offset();
        let am = company::ActiveModel {
            id: Set(c.id.clone()),
            name: Set(c.name.clone()),
            timezone: Set(c.timezone.clone()),
            currency_code: Set(c.currency_code.clone()),
            min_severity: Set(c.min_severity.clone()),
            quiet_hours_start: Set(c.quiet_hours_start.clone()),
            quiet_hours_end: Set(c.quiet_hours_end.clone()),
            digest_hour_local: Set(c.digest_hour_local),
            slack_webhook_url: Set(c.slack_webhook_url.clone()),
            summary_webhook_url: Set(c.summary_webhook_url.clone()),
            brand_webhook_urls: Set(c.brand_webhook_urls.clone()),
            daily_meta_cap: Set(c.daily_meta_cap),
            alerts_csv_url: Set(c.alerts_csv_url.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(model_to_company(model))
    }

    pub async fn get_company_by_id(&self, id: &str) -> Result<Option<CompanyRow>> {
        let model = CompanyEntity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(model_to_company))
    }

    /// Companies in stable creation order: the batch iteration order every
    /// digest/scan cycle uses.
    pub async fn list_companies(
        &self,
        filter: &CompanyFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CompanyRow>> {
        let mut q = CompanyEntity::find();
        if let Some(ref s) = filter.name_contains {
            q = q.filter(CompanyCol::Name.contains(s.as_str()));
        }
        let rows = q
            .order_by(CompanyCol::CreatedAt, Order::Asc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(model_to_company).collect())
    }

    pub async fn count_companies(&self, filter: &CompanyFilter) -> Result<u64> {
        let mut q = CompanyEntity::find();
        if let Some(ref s) = filter.name_contains {
            q = q.filter(CompanyCol::Name.contains(s.as_str()));
        }
        Ok(q.count(self.db()).await?)
    }

    /// All companies, creation order, for batch loops.
    pub async fn list_all_companies(&self) -> Result<Vec<CompanyRow>> {
        let rows = CompanyEntity::find()
            .order_by(CompanyCol::CreatedAt, Order::Asc)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(model_to_company).collect())
    }

    pub async fn update_company(
        &self,
        id: &str,
        upd: &CompanyUpdate,
    ) -> Result<Option<CompanyRow>> {
        let model = CompanyEntity::find_by_id(id).one(self.db()).await?;
        let Some(m) = model else { return Ok(None) };

        let now = Utc::now().fixed_offset();
        let mut am: company::ActiveModel = m.into();
        if let Some(ref v) = upd.name {
            am.name = Set(v.clone());
        }
        if let Some(ref v) = upd.timezone {
            am.timezone = Set(v.clone());
        }
        if let Some(ref v) = upd.currency_code {
            am.currency_code = Set(v.to_uppercase());
        }
        if let Some(ref v) = upd.min_severity {
            am.min_severity = Set(v.clone());
        }
        if let Some(ref v) = upd.quiet_hours_start {
            am.quiet_hours_start = Set(v.clone());
        }
        if let Some(ref v) = upd.quiet_hours_end {
            am.quiet_hours_end = Set(v.clone());
        }
        if let Some(v) = upd.digest_hour_local {
            am.digest_hour_local = Set(v);
        }
        if let Some(ref v) = upd.slack_webhook_url {
            am.slack_webhook_url = Set(v.clone());
        }
        if let Some(ref v) = upd.summary_webhook_url {
            am.summary_webhook_url = Set(v.clone());
        }
        if let Some(ref v) = upd.brand_webhook_urls {
            am.brand_webhook_urls = Set(v.clone());
        }
        if let Some(v) = upd.daily_meta_cap {
            am.daily_meta_cap = Set(v);
        }
        if let Some(ref v) = upd.alerts_csv_url {
            am.alerts_csv_url = Set(v.clone());
        }
        am.updated_at = Set(now);
        let updated = am.update(self.db()).await?;
        Ok(Some(model_to_company(updated)))
    }
}
