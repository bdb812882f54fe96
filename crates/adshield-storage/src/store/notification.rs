use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};

use crate::entities::notification_log::{self, Column as LogCol, Entity as LogEntity};
use crate::store::Store;

/// One dispatch attempt, success or failure. Append-only audit trail;
/// duplicate suppression is the run ledger's job, not this table's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationLogRow {
    pub id: String,
    pub company_id: String,
    pub purpose: String,
    pub destination: String,
    pub status: String,
    pub http_status: Option<i32>,
    pub error_message: Option<String>,
    pub request_body: Option<String>,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NotificationLogFilter {
    pub company_id: Option<String>,
    pub purpose: Option<String>,
    pub status: Option<String>,
}

fn model_to_log(m: notification_log::Model) -> NotificationLogRow {
    NotificationLogRow {
        id: m.id,
        company_id: m.company_id,
        purpose: m.purpose,
        destination: m.destination,
        status: m.status,
        http_status: m.http_status,
        error_message: m.error_message,
        request_body: m.request_body,
        duration_ms: m.duration_ms,
        created_at: m.created_at.with_timezone(&Utc),
    }
}

impl Store {
    pub async fn insert_notification_log(&self, log: &NotificationLogRow) -> Result<()> {
        let now = Utc::now().fixed_offset();
        let am = notification_log::ActiveModel {
            id: Set(log.id.clone()),
            company_id: Set(log.company_id.clone()),
            purpose: Set(log.purpose.clone()),
            destination: Set(log.destination.clone()),
            status: Set(log.status.clone()),
            http_status: Set(log.http_status),
            error_message: Set(log.error_message.clone()),
            request_body: Set(log.request_body.clone()),
            duration_ms: Set(log.duration_ms),
            created_at: Set(now),
        };
        am.insert(self.db()).await?;
        Ok(())
    }

    pub async fn list_notification_logs(
        &self,
        filter: &NotificationLogFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<NotificationLogRow>> {
        let mut q = LogEntity::find();
        q = apply_log_filter(q, filter);
        let rows = q
            .order_by(LogCol::CreatedAt, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(model_to_log).collect())
    }

    pub async fn count_notification_logs(&self, filter: &NotificationLogFilter) -> Result<u64> {
        let mut q = LogEntity::find();
        q = apply_log_filter(q, filter);
        Ok(q.count(self.db()).await?)
    }

    pub async fn cleanup_notification_logs(&self, retention_days: u32) -> Result<u64> {
        let cutoff = (Utc::now() - chrono::Duration::days(retention_days as i64)).fixed_offset();
        let result = LogEntity::delete_many()
            .filter(LogCol::CreatedAt.lt(cutoff))
            .exec(self.db())
            .await?;
        Ok(result.rows_affected)
    }
}

type LogSelect = sea_orm::Select<LogEntity>;

fn apply_log_filter(mut q: LogSelect, filter: &NotificationLogFilter) -> LogSelect {
    if let Some(ref v) = filter.company_id {
        q = q.filter(LogCol::CompanyId.eq(v.as_str()));
    }
    if let Some(ref v) = filter.purpose {
        q = q.filter(LogCol::Purpose.eq(v.as_str()));
    }
    if let Some(ref v) = filter.status {
        q = q.filter(LogCol::Status.eq(v.as_str()));
    }
    q
}
