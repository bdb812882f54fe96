use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};

use crate::entities::ad_account::{self, Column as AdCol, Entity as AdEntity};
use crate::entities::brand::{self, Column as BrandCol, Entity as BrandEntity};
use crate::store::Store;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandRow {
    pub id: String,
    pub company_id: String,
    pub name: String,
    pub currency_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdAccountRow {
    pub id: String,
    pub brand_id: String,
    pub provider: String,
    pub external_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn model_to_brand(m: brand::Model) -> BrandRow {
    BrandRow {
        id: m.id,
        company_id: m.company_id,
        name: m.name,
        currency_code: m.currency_code,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

fn model_to_ad_account(m: ad_account::Model) -> AdAccountRow {
    AdAccountRow {
        id: m.id,
        brand_id: m.brand_id,
        provider: m.provider,
        external_id: m.external_id,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl Store {
    pub async fn insert_brand(&self, b: &BrandRow) -> Result<BrandRow> {
        let now = Utc::now().fixed_offset();
        let am = brand::ActiveModel {
            id: Set(b.id.clone()),
            company_id: Set(b.company_id.clone()),
            name: Set(b.name.clone()),
            currency_code: Set(b.currency_code.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(model_to_brand(model))
    }

    pub async fn list_brands_by_company(&self, company_id: &str) -> Result<Vec<BrandRow>> {
        let rows = BrandEntity::find()
            .filter(BrandCol::CompanyId.eq(company_id))
            .order_by(BrandCol::CreatedAt, Order::Asc)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(model_to_brand).collect())
    }

    /// Returns the company's first brand, creating one named after the
    /// company when none exists yet. Onboarding leaves companies brandless;
    /// ad-account attachment needs a brand to hang off.
    pub async fn ensure_default_brand(
        &self,
        company_id: &str,
        company_name: &str,
        currency_code: &str,
    ) -> Result<BrandRow> {
        let existing = BrandEntity::find()
            .filter(BrandCol::CompanyId.eq(company_id))
            .order_by(BrandCol::CreatedAt, Order::Asc)
            .one(self.db())
            .await?;
        if let Some(m) = existing {
            return Ok(model_to_brand(m));
        }

        let name = company_name.trim();
        let name = if name.is_empty() { "Default" } else { name };
        let row = BrandRow {
            id: adshield_common::id::next_id(),
            company_id: company_id.to_string(),
            name: name.to_string(),
            currency_code: currency_code.to_uppercase(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.insert_brand(&row).await
    }

    pub async fn attach_ad_account(
        &self,
        brand_id: &str,
        provider: &str,
        external_id: &str,
    ) -> Result<AdAccountRow> {
        let now = Utc::now().fixed_offset();
        let am = ad_account::ActiveModel {
            id: Set(adshield_common::id::next_id()),
            brand_id: Set(brand_id.to_string()),
            provider: Set(provider.to_string()),
            external_id: Set(external_id.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        Ok(model_to_ad_account(model))
    }

    pub async fn list_ad_accounts_by_brand(&self, brand_id: &str) -> Result<Vec<AdAccountRow>> {
        let rows = AdEntity::find()
            .filter(AdCol::BrandId.eq(brand_id))
            .order_by(AdCol::CreatedAt, Order::Asc)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(model_to_ad_account).collect())
    }

    /// The most recently updated ad account of `provider` across all of a
    /// company's brands, used to pick which account a spend fetch targets.
    pub async fn find_provider_account_for_company(
        &self,
        company_id: &str,
        provider: &str,
    ) -> Result<Option<AdAccountRow>> {
        let brand_ids: Vec<String> = BrandEntity::find()
            .filter(BrandCol::CompanyId.eq(company_id))
            .all(self.db())
            .await?
            .into_iter()
            .map(|b| b.id)
            .collect();
        if brand_ids.is_empty() {
            return Ok(None);
        }

        let model = AdEntity::find()
            .filter(AdCol::BrandId.is_in(brand_ids))
            .filter(AdCol::Provider.eq(provider))
            .order_by(AdCol::UpdatedAt, Order::Desc)
            .one(self.db())
            .await?;
        Ok(model.map(model_to_ad_account))
    }
}
