use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Whether a customer can currently be billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum CustomerStatus {
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "INACTIVE")]
    Inactive,
    #[sea_orm(string_value = "SUSPENDED")]
    Suspended,
}

/// Agreed payment terms, used to derive due dates for new invoices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum PaymentTerms {
    #[sea_orm(string_value = "DUE_ON_RECEIPT")]
    DueOnReceipt,
    #[sea_orm(string_value = "NET_15")]
    Net15,
    #[sea_orm(string_value = "NET_30")]
    Net30,
    #[sea_orm(string_value = "NET_45")]
    Net45,
    #[sea_orm(string_value = "NET_60")]
    Net60,
    #[sea_orm(string_value = "NET_90")]
    Net90,
}

impl PaymentTerms {
    /// Number of days between the invoice date and its due date.
    pub fn days(self) -> i64 {
        match self {
            PaymentTerms::DueOnReceipt => 0,
            PaymentTerms::Net15 => 15,
            PaymentTerms::Net30 => 30,
            PaymentTerms::Net45 => 45,
            PaymentTerms::Net60 => 60,
            PaymentTerms::Net90 => 90,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentTerms::DueOnReceipt => "DUE_ON_RECEIPT",
            PaymentTerms::Net15 => "NET_15",
            PaymentTerms::Net30 => "NET_30",
            PaymentTerms::Net45 => "NET_45",
            PaymentTerms::Net60 => "NET_60",
            PaymentTerms::Net90 => "NET_90",
        }
    }
}

impl std::fmt::Display for PaymentTerms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentTerms {
    type Err = String;

    /// Accepts `NET_30`, `net-30`, `net30` and the like.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' ', '_'], "");
        match normalized.as_str() {
            "DUEONRECEIPT" => Ok(PaymentTerms::DueOnReceipt),
            "NET15" => Ok(PaymentTerms::Net15),
            "NET30" => Ok(PaymentTerms::Net30),
            "NET45" => Ok(PaymentTerms::Net45),
            "NET60" => Ok(PaymentTerms::Net60),
            "NET90" => Ok(PaymentTerms::Net90),
            _ => Err(format!("unknown payment terms '{}'", s)),
        }
    }
}

/// A billed party. Invoices and quotations reference it by `customer_id`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub customer_id: i32,
    /// Business key, unique across customers.
    #[sea_orm(unique)]
    pub customer_code: String,
    pub company_name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub tax_id: Option<String>,
    pub status: CustomerStatus,
    pub payment_terms: PaymentTerms,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub credit_limit: Decimal,
    pub created_date: NaiveDateTime,
    pub last_modified: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::invoice::Entity")]
    Invoice,
    #[sea_orm(has_many = "super::quotation::Entity")]
    Quotation,
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl Related<super::quotation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quotation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_terms_parse_loosely() {
        assert_eq!("NET_30".parse::<PaymentTerms>(), Ok(PaymentTerms::Net30));
        assert_eq!("net-15".parse::<PaymentTerms>(), Ok(PaymentTerms::Net15));
        assert_eq!(
            "due on receipt".parse::<PaymentTerms>(),
            Ok(PaymentTerms::DueOnReceipt)
        );
        assert!("NET_10".parse::<PaymentTerms>().is_err());
        assert_eq!(PaymentTerms::Net90.to_string(), "NET_90");
    }
}
