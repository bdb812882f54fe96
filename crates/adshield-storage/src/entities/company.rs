use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "companies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
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
    /// JSON object text: brand name -> webhook URL.
    pub brand_webhook_urls: Option<String>,
    pub daily_meta_cap: Option<f64>,
    pub alerts_csv_url: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
