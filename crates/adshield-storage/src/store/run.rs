use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};

use crate::entities::run_ledger::{self, Column as RunCol, Entity as RunEntity};
use crate::store::Store;

/// One run-ledger entry: the idempotency record for a
/// (company, business-day, source) bucket.
///
/// Lifecycle: written with `ok=true, posted=false` before a dispatch attempt
/// (Pending), then finished as Posted (`posted=true`) or Failed
/// (`ok=false` with error detail). A crash between the two leaves Pending
/// visible, which is the point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRow {
    pub id: String,
    pub company_id: String,
    pub run_date: String,
    pub source: String,
    pub ok: bool,
    pub posted: bool,
    pub spend: Option<f64>,
    pub cap: Option<f64>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    pub company_id: Option<String>,
    pub run_date: Option<String>,
    pub source: Option<String>,
    pub posted_eq: Option<bool>,
}

fn model_to_run(m: run_ledger::Model) -> RunRow {
    RunRow {
        id: m.id,
        company_id: m.company_id,
        run_date: m.run_date,
        source: m.source,
        ok: m.ok,
        posted: m.posted,
        spend: m.spend,
        cap: m.cap,
        error: m.error,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl Store {
    pub async fn get_run(
        &self,
        company_id: &str,
        run_date: &str,
        source: &str,
    ) -> Result<Option<RunRow>> {
        let model = RunEntity::find()
            .filter(RunCol::CompanyId.eq(company_id))
            .filter(RunCol::RunDate.eq(run_date))
            .filter(RunCol::Source.eq(source))
            .one(self.db())
            .await?;
        Ok(model.map(model_to_run))
    }

    /// Write the Pending record BEFORE attempting dispatch, carrying the
    /// latest metric snapshot. An existing row keeps its `posted` flag so a
    /// rerun after success cannot regress the bucket to unposted.
    ///
    /// This is a read-then-write upsert, not an atomic conditional update:
    /// two racing invocations for the same bucket can both proceed. The
    /// scheduler fires once per bucket, which is what makes this acceptable.
    pub async fn begin_run(
        &self,
        company_id: &str,
        run_date: &str,
        source: &str,
        spend: Option<f64>,
        cap: Option<f64>,
    ) -> Result<RunRow> {
        let now = Utc::now().fixed_offset();
        let existing = RunEntity::find()
            .filter(RunCol::CompanyId.eq(company_id))
            .filter(RunCol::RunDate.eq(run_date))
            .filter(RunCol::Source.eq(source))
            .one(self.db())
            .await?;

        let model = match existing {
            Some(m) => {
                let mut am: run_ledger::ActiveModel = m.into();
                am.ok = Set(true);
                am.spend = Set(spend);
                am.cap = Set(cap);
                am.updated_at = Set(now);
                am.update(self.db()).await?
            }
            None => {
                let am = run_ledger::ActiveModel {
                    id: Set(adshield_common::id::next_id()),
                    company_id: Set(company_id.to_string()),
                    run_date: Set(run_date.to_string()),
                    source: Set(source.to_string()),
                    ok: Set(true),
                    posted: Set(false),
                    spend: Set(spend),
                    cap: Set(cap),
                    error: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                am.insert(self.db()).await?
            }
        };
        Ok(model_to_run(model))
    }

    /// Record the outcome of a dispatch attempt. Returns `None` when no
    /// Pending record exists for the bucket.
    pub async fn finish_run(
        &self,
        company_id: &str,
        run_date: &str,
        source: &str,
        posted: bool,
        ok: bool,
        error: Option<&str>,
    ) -> Result<Option<RunRow>> {
        let existing = RunEntity::find()
            .filter(RunCol::CompanyId.eq(company_id))
            .filter(RunCol::RunDate.eq(run_date))
            .filter(RunCol::Source.eq(source))
            .one(self.db())
            .await?;
        let Some(m) = existing else { return Ok(None) };

        let now = Utc::now().fixed_offset();
        let mut am: run_ledger::ActiveModel = m.into();
        am.posted = Set(posted);
        am.ok = Set(ok);
        am.error = Set(error.map(str::to_string));
        am.updated_at = Set(now);
        let updated = am.update(self.db()).await?;
        Ok(Some(model_to_run(updated)))
    }

    pub async fn list_runs(
        &self,
        filter: &RunFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<RunRow>> {
        let mut q = RunEntity::find();
        q = apply_run_filter(q, filter);
        let rows = q
            .order_by(RunCol::RunDate, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(model_to_run).collect())
    }

    pub async fn count_runs(&self, filter: &RunFilter) -> Result<u64> {
        let mut q = RunEntity::find();
        q = apply_run_filter(q, filter);
        Ok(q.count(self.db()).await?)
    }

    /// Ledger rows for one company between two business days (inclusive),
    /// oldest first. The weekly receipt aggregates over this.
    pub async fn list_runs_in_range(
        &self,
        company_id: &str,
        from_date: &str,
        to_date: &str,
    ) -> Result<Vec<RunRow>> {
        let rows = RunEntity::find()
            .filter(RunCol::CompanyId.eq(company_id))
            .filter(RunCol::RunDate.gte(from_date))
            .filter(RunCol::RunDate.lte(to_date))
            .order_by(RunCol::RunDate, Order::Asc)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(model_to_run).collect())
    }
}

type RunSelect = sea_orm::Select<RunEntity>;

fn apply_run_filter(mut q: RunSelect, filter: &RunFilter) -> RunSelect {
    if let Some(ref v) = filter.company_id {
        q = q.filter(RunCol::CompanyId.eq(v.as_str()));
    }
    if let Some(ref v) = filter.run_date {
        q = q.filter(RunCol::RunDate.eq(v.as_str()));
    }
    if let Some(ref v) = filter.source {
        q = q.filter(RunCol::Source.eq(v.as_str()));
    }
    if let Some(v) = filter.posted_eq {
        q = q.filter(RunCol::Posted.eq(v));
    }
    q
}
