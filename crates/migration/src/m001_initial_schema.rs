use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_initial_schema"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.get_connection().execute_unprepared(UP_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.get_connection().execute_unprepared(DOWN_SQL).await?;
        Ok(())
    }
}

const UP_SQL: &str = "
CREATE TABLE IF NOT EXISTS companies (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    timezone TEXT NOT NULL DEFAULT 'UTC',
    currency_code TEXT NOT NULL DEFAULT 'USD',
    min_severity TEXT NOT NULL DEFAULT 'OK',
    quiet_hours_start TEXT,
    quiet_hours_end TEXT,
    digest_hour_local INTEGER NOT NULL DEFAULT 9,
    slack_webhook_url TEXT,
    summary_webhook_url TEXT,
    brand_webhook_urls TEXT,
    daily_meta_cap REAL,
    alerts_csv_url TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_companies_name ON companies(name);

CREATE TABLE IF NOT EXISTS brands (
    id TEXT PRIMARY KEY NOT NULL,
    company_id TEXT NOT NULL,
    name TEXT NOT NULL,
    currency_code TEXT NOT NULL DEFAULT 'USD',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(company_id, name)
);
CREATE INDEX IF NOT EXISTS idx_brands_company_id ON brands(company_id);

CREATE TABLE IF NOT EXISTS ad_accounts (
    id TEXT PRIMARY KEY NOT NULL,
    brand_id TEXT NOT NULL,
    provider TEXT NOT NULL,
    external_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(brand_id, provider, external_id)
);
CREATE INDEX IF NOT EXISTS idx_ad_accounts_brand_id ON ad_accounts(brand_id);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    email TEXT NOT NULL UNIQUE,
    company_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_users_company_id ON users(company_id);

CREATE TABLE IF NOT EXISTS run_ledger (
    id TEXT PRIMARY KEY NOT NULL,
    company_id TEXT NOT NULL,
    run_date TEXT NOT NULL,
    source TEXT NOT NULL,
    ok INTEGER NOT NULL DEFAULT 1,
    posted INTEGER NOT NULL DEFAULT 0,
    spend REAL,
    cap REAL,
    error TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(company_id, run_date, source)
);
CREATE INDEX IF NOT EXISTS idx_run_ledger_company_date ON run_ledger(company_id, run_date);

CREATE TABLE IF NOT EXISTS notification_logs (
    id TEXT PRIMARY KEY NOT NULL,
    company_id TEXT NOT NULL,
    purpose TEXT NOT NULL,
    destination TEXT NOT NULL,
    status TEXT NOT NULL,
    http_status INTEGER,
    error_message TEXT,
    request_body TEXT,
    duration_ms INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_notification_logs_company_id ON notification_logs(company_id);
CREATE INDEX IF NOT EXISTS idx_notification_logs_created_at ON notification_logs(created_at);
";

const DOWN_SQL: &str = "
DROP TABLE IF EXISTS notification_logs;
DROP TABLE IF EXISTS run_ledger;
DROP TABLE IF EXISTS users;
DROP TABLE IF EXISTS ad_accounts;
DROP TABLE IF EXISTS brands;
DROP TABLE IF EXISTS companies;
";
