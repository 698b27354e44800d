use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ActiveValue::NotSet, Set};

use crate::entities::tax_jurisdiction::{self, JurisdictionType};
use crate::invoice::round_money;

/// In-memory tax jurisdiction snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxJurisdiction {
    pub jurisdiction_id: Option<i32>,
    pub jurisdiction_name: String,
    pub jurisdiction_type: JurisdictionType,
    /// Percent.
    pub tax_rate: Decimal,
    pub is_active: bool,
    pub effective_date: NaiveDate,
    pub expiration_date: Option<NaiveDate>,
    pub description: Option<String>,
}

impl TaxJurisdiction {
    pub fn new(
        jurisdiction_name: impl Into<String>,
        jurisdiction_type: JurisdictionType,
        tax_rate: Decimal,
        effective_date: NaiveDate,
    ) -> Self {
        Self {
            jurisdiction_id: None,
            jurisdiction_name: jurisdiction_name.into(),
            jurisdiction_type,
            tax_rate,
            is_active: true,
            effective_date,
            expiration_date: None,
            description: None,
        }
    }

    /// Active, already in effect, and not yet expired on `date`.
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        self.is_active
            && self.effective_date <= date
            && self.expiration_date.is_none_or(|expires| date <= expires)
    }

    /// Tax due on `amount` at this jurisdiction's rate, rounded to cents.
    pub fn calculate_tax(&self, amount: Decimal) -> Decimal {
        round_money(amount * self.tax_rate / Decimal::ONE_HUNDRED)
    }

    pub fn from_model(model: tax_jurisdiction::Model) -> Self {
        Self {
            jurisdiction_id: Some(model.jurisdiction_id),
            jurisdiction_name: model.jurisdiction_name,
            jurisdiction_type: model.jurisdiction_type,
            tax_rate: model.tax_rate,
            is_active: model.is_active,
            effective_date: model.effective_date,
            expiration_date: model.expiration_date,
            description: model.description,
        }
    }

    pub fn to_active_model(&self) -> tax_jurisdiction::ActiveModel {
        tax_jurisdiction::ActiveModel {
            jurisdiction_id: match self.jurisdiction_id {
                Some(id) => Set(id),
                None => NotSet,
            },
            jurisdiction_name: Set(self.jurisdiction_name.clone()),
            jurisdiction_type: Set(self.jurisdiction_type),
            tax_rate: Set(self.tax_rate),
            is_active: Set(self.is_active),
            effective_date: Set(self.effective_date),
            expiration_date: Set(self.expiration_date),
            description: Set(self.description.clone()),
        }
    }
}

/// Sum of the rates of all jurisdictions in effect on `date`.
pub fn combined_rate(jurisdictions: &[TaxJurisdiction], date: NaiveDate) -> Decimal {
    jurisdictions
        .iter()
        .filter(|j| j.is_effective_on(date))
        .map(|j| j.tax_rate)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_effective_window() {
        let mut state = TaxJurisdiction::new(
            "California",
            JurisdictionType::State,
            Decimal::new(725, 2),
            date(2024, 1, 1),
        );
        state.expiration_date = Some(date(2024, 12, 31));

        assert!(!state.is_effective_on(date(2023, 12, 31)));
        assert!(state.is_effective_on(date(2024, 1, 1)));
        assert!(state.is_effective_on(date(2024, 12, 31)));
        assert!(!state.is_effective_on(date(2025, 1, 1)));

        state.is_active = false;
        assert!(!state.is_effective_on(date(2024, 6, 1)));
    }

    #[test]
    fn test_calculate_tax_rounds_to_cents() {
        let city = TaxJurisdiction::new(
            "Springfield",
            JurisdictionType::City,
            Decimal::new(725, 2),
            date(2024, 1, 1),
        );
        // 19.99 * 7.25% = 1.449275
        assert_eq!(city.calculate_tax(Decimal::new(1999, 2)), Decimal::new(145, 2));
    }

    #[test]
    fn test_combined_rate_skips_inactive() {
        let state = TaxJurisdiction::new(
            "State",
            JurisdictionType::State,
            Decimal::new(6, 0),
            date(2024, 1, 1),
        );
        let county = TaxJurisdiction::new(
            "County",
            JurisdictionType::County,
            Decimal::new(125, 2),
            date(2024, 1, 1),
        );
        let mut city = TaxJurisdiction::new(
            "City",
            JurisdictionType::City,
            Decimal::ONE,
            date(2024, 1, 1),
        );
        city.is_active = false;

        let rate = combined_rate(&[state, county, city], date(2024, 5, 1));
        assert_eq!(rate, Decimal::new(725, 2));
    }
}
