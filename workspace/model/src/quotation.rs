use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue::NotSet, Set};

use crate::entities::quotation::{self, QuotationStatus};
use crate::entities::quotation_item;
use crate::invoice::{LineItem, round_money};

/// In-memory quotation snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Quotation {
    pub quotation_id: Option<i32>,
    pub quotation_number: String,
    pub customer_id: i32,
    pub quotation_date: NaiveDate,
    pub valid_until_date: NaiveDate,
    pub status: QuotationStatus,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    pub notes: Option<String>,
    pub converted_to_invoice: bool,
    pub converted_invoice_number: Option<String>,
    pub conversion_date: Option<NaiveDate>,
    pub created_by: Option<String>,
    pub last_modified_by: Option<String>,
    pub created_date: Option<NaiveDateTime>,
    pub last_modified: Option<NaiveDateTime>,
    pub items: Vec<LineItem>,
}

impl Quotation {
    pub fn new_draft(
        quotation_number: impl Into<String>,
        customer_id: i32,
        quotation_date: NaiveDate,
        valid_until_date: NaiveDate,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            quotation_id: None,
            quotation_number: quotation_number.into(),
            customer_id,
            quotation_date,
            valid_until_date,
            status: QuotationStatus::Draft,
            subtotal: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            currency: currency.into(),
            notes: None,
            converted_to_invoice: false,
            converted_invoice_number: None,
            conversion_date: None,
            created_by: None,
            last_modified_by: None,
            created_date: None,
            last_modified: None,
            items: Vec::new(),
        }
    }

    pub fn recalculate_totals(&mut self) {
        self.subtotal = self.items.iter().map(LineItem::total).sum();
        self.total_amount =
            round_money(self.subtotal + self.tax_amount - self.discount_amount).max(Decimal::ZERO);
    }

    pub fn from_model(model: quotation::Model, items: Vec<quotation_item::Model>) -> Self {
        Self {
            quotation_id: Some(model.quotation_id),
            quotation_number: model.quotation_number,
            customer_id: model.customer_id,
            quotation_date: model.quotation_date,
            valid_until_date: model.valid_until_date,
            status: model.status,
            subtotal: model.subtotal,
            tax_amount: model.tax_amount,
            discount_amount: model.discount_amount,
            total_amount: model.total_amount,
            currency: model.currency,
            notes: model.notes,
            converted_to_invoice: model.converted_to_invoice,
            converted_invoice_number: model.converted_invoice_number,
            conversion_date: model.conversion_date,
            created_by: model.created_by,
            last_modified_by: model.last_modified_by,
            created_date: Some(model.created_date),
            last_modified: Some(model.last_modified),
            items: items.into_iter().map(LineItem::from_quotation_item).collect(),
        }
    }

    pub fn to_active_model(&self, now: NaiveDateTime) -> quotation::ActiveModel {
        quotation::ActiveModel {
            quotation_id: match self.quotation_id {
                Some(id) => Set(id),
                None => NotSet,
            },
            quotation_number: Set(self.quotation_number.clone()),
            customer_id: Set(self.customer_id),
            quotation_date: Set(self.quotation_date),
            valid_until_date: Set(self.valid_until_date),
            status: Set(self.status),
            subtotal: Set(self.subtotal),
            tax_amount: Set(self.tax_amount),
            discount_amount: Set(self.discount_amount),
            total_amount: Set(self.total_amount),
            currency: Set(self.currency.clone()),
            notes: Set(self.notes.clone()),
            converted_to_invoice: Set(self.converted_to_invoice),
            converted_invoice_number: Set(self.converted_invoice_number.clone()),
            conversion_date: Set(self.conversion_date),
            created_by: Set(self.created_by.clone()),
            last_modified_by: Set(self.last_modified_by.clone()),
            created_date: Set(self.created_date.unwrap_or(now)),
            last_modified: Set(now),
        }
    }
}
