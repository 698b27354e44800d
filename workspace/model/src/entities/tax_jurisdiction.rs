use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Level of government levying the tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum JurisdictionType {
    #[sea_orm(string_value = "FEDERAL")]
    Federal,
    #[sea_orm(string_value = "STATE")]
    State,
    #[sea_orm(string_value = "COUNTY")]
    County,
    #[sea_orm(string_value = "CITY")]
    City,
    #[sea_orm(string_value = "SPECIAL")]
    Special,
}

impl std::str::FromStr for JurisdictionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FEDERAL" => Ok(JurisdictionType::Federal),
            "STATE" => Ok(JurisdictionType::State),
            "COUNTY" => Ok(JurisdictionType::County),
            "CITY" => Ok(JurisdictionType::City),
            "SPECIAL" => Ok(JurisdictionType::Special),
            other => Err(format!("unknown jurisdiction type '{}'", other)),
        }
    }
}

/// Reference data for percentage tax calculation. Not linked to invoices.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tax_jurisdictions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub jurisdiction_id: i32,
    #[sea_orm(unique)]
    pub jurisdiction_name: String,
    pub jurisdiction_type: JurisdictionType,
    /// Rate in percent, e.g. 7.25.
    #[sea_orm(column_type = "Decimal(Some((8, 4)))")]
    pub tax_rate: Decimal,
    #[sea_orm(default_value = "true")]
    pub is_active: bool,
    pub effective_date: NaiveDate,
    pub expiration_date: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
