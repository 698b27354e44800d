//! In-memory invoice snapshot.
//!
//! The SeaORM `Model` always has a surrogate key, while an invoice created in
//! a session has none until it is first persisted. This struct carries the
//! invoice and its lines with an optional `invoice_id` and keeps the amount
//! invariants (`balance == total - paid`, `0 <= paid <= total`).

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{ActiveValue::NotSet, Set};

use crate::entities::invoice::{self, InvoiceStatus};
use crate::entities::{invoice_item, quotation_item};

/// Rounds a monetary amount to cents, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// A billed line shared by invoices and quotations.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub description: String,
    pub product_code: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Absolute discount for the whole line.
    pub discount: Decimal,
    /// Tax rate in percent.
    pub tax_rate: Decimal,
    pub unit: Option<String>,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            description: description.into(),
            product_code: None,
            quantity,
            unit_price,
            discount: Decimal::ZERO,
            tax_rate: Decimal::ZERO,
            unit: None,
        }
    }

    /// `(quantity * unit_price - discount) * (1 + tax_rate / 100)`, rounded to
    /// cents and never negative.
    pub fn total(&self) -> Decimal {
        let net = (self.quantity * self.unit_price - self.discount).max(Decimal::ZERO);
        let gross = net * (Decimal::ONE + self.tax_rate / Decimal::ONE_HUNDRED);
        round_money(gross)
    }

    pub fn from_invoice_item(model: invoice_item::Model) -> Self {
        Self {
            description: model.description,
            product_code: model.product_code,
            quantity: model.quantity,
            unit_price: model.unit_price,
            discount: model.discount,
            tax_rate: model.tax_rate,
            unit: model.unit,
        }
    }

    pub fn from_quotation_item(model: quotation_item::Model) -> Self {
        Self {
            description: model.description,
            product_code: model.product_code,
            quantity: model.quantity,
            unit_price: model.unit_price,
            discount: model.discount,
            tax_rate: model.tax_rate,
            unit: model.unit,
        }
    }

    pub fn to_invoice_item(&self, invoice_id: i32) -> invoice_item::ActiveModel {
        invoice_item::ActiveModel {
            item_id: NotSet,
            invoice_id: Set(invoice_id),
            description: Set(self.description.clone()),
            product_code: Set(self.product_code.clone()),
            quantity: Set(self.quantity),
            unit_price: Set(self.unit_price),
            discount: Set(self.discount),
            tax_rate: Set(self.tax_rate),
            total: Set(self.total()),
            unit: Set(self.unit.clone()),
        }
    }

    pub fn to_quotation_item(&self, quotation_id: i32) -> quotation_item::ActiveModel {
        quotation_item::ActiveModel {
            item_id: NotSet,
            quotation_id: Set(quotation_id),
            description: Set(self.description.clone()),
            product_code: Set(self.product_code.clone()),
            quantity: Set(self.quantity),
            unit_price: Set(self.unit_price),
            discount: Set(self.discount),
            tax_rate: Set(self.tax_rate),
            total: Set(self.total()),
            unit: Set(self.unit.clone()),
        }
    }
}

/// Result of an amount edit. `substituted` is set whenever `applied` differs
/// from `requested`; `warning` explains why.
#[derive(Debug, Clone, PartialEq)]
pub struct AmountChange {
    pub requested: Decimal,
    pub applied: Decimal,
    pub substituted: bool,
    pub warning: Option<String>,
}

impl AmountChange {
    fn accepted(amount: Decimal) -> Self {
        Self {
            requested: amount,
            applied: amount,
            substituted: false,
            warning: None,
        }
    }

    fn substituted(requested: Decimal, applied: Decimal, warning: String) -> Self {
        Self {
            requested,
            applied,
            substituted: true,
            warning: Some(warning),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    /// Store-assigned key, `None` until first persisted.
    pub invoice_id: Option<i32>,
    pub invoice_number: String,
    pub customer_id: i32,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub manual_status: InvoiceStatus,
    pub confirmed: bool,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub balance_amount: Decimal,
    pub currency: String,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    pub last_modified_by: Option<String>,
    pub created_date: Option<NaiveDateTime>,
    pub last_modified: Option<NaiveDateTime>,
    pub items: Vec<LineItem>,
}

impl Invoice {
    /// A fresh, unpersisted DRAFT invoice with zero amounts.
    pub fn new_draft(
        invoice_number: impl Into<String>,
        customer_id: i32,
        invoice_date: NaiveDate,
        due_date: NaiveDate,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            invoice_id: None,
            invoice_number: invoice_number.into(),
            customer_id,
            invoice_date,
            due_date,
            status: InvoiceStatus::Draft,
            manual_status: InvoiceStatus::Draft,
            confirmed: false,
            subtotal: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            paid_amount: Decimal::ZERO,
            balance_amount: Decimal::ZERO,
            currency: currency.into(),
            notes: None,
            created_by: None,
            last_modified_by: None,
            created_date: None,
            last_modified: None,
            items: Vec::new(),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.invoice_id.is_some()
    }

    /// Restores `balance == total - paid` after any amount change.
    pub fn recalculate_balance(&mut self) {
        if self.paid_amount > self.total_amount {
            self.paid_amount = self.total_amount;
        }
        self.balance_amount = (self.total_amount - self.paid_amount).max(Decimal::ZERO);
    }

    /// Recomputes subtotal and total from the line items, keeping the manually
    /// entered tax and discount amounts.
    pub fn recalculate_totals(&mut self) {
        self.subtotal = self.items.iter().map(LineItem::total).sum();
        self.total_amount =
            round_money(self.subtotal + self.tax_amount - self.discount_amount).max(Decimal::ZERO);
        self.recalculate_balance();
    }

    /// Sets the paid amount. Negative amounts are rejected and amounts above the
    /// total are clamped to the total.
    pub fn set_paid_amount(&mut self, amount: Decimal) -> AmountChange {
        let change = if amount < Decimal::ZERO {
            AmountChange::substituted(
                amount,
                self.paid_amount,
                format!("Paid amount cannot be negative; keeping {}", self.paid_amount),
            )
        } else if amount > self.total_amount {
            AmountChange::substituted(
                amount,
                self.total_amount,
                format!(
                    "Paid amount {} exceeds total {}; clamped to total",
                    amount, self.total_amount
                ),
            )
        } else {
            AmountChange::accepted(amount)
        };
        self.paid_amount = change.applied;
        self.recalculate_balance();
        change
    }

    /// Sets the total amount. Negative totals are rejected; a total below the
    /// paid amount pulls the paid amount down with it.
    pub fn set_total_amount(&mut self, amount: Decimal) -> AmountChange {
        if amount < Decimal::ZERO {
            return AmountChange::substituted(
                amount,
                self.total_amount,
                format!("Total amount cannot be negative; keeping {}", self.total_amount),
            );
        }
        let mut change = AmountChange::accepted(amount);
        if self.paid_amount > amount {
            change.warning = Some(format!(
                "Paid amount {} exceeds new total {}; clamped to total",
                self.paid_amount, amount
            ));
        }
        self.total_amount = amount;
        self.recalculate_balance();
        change
    }

    pub fn from_model(model: invoice::Model, items: Vec<invoice_item::Model>) -> Self {
        Self {
            invoice_id: Some(model.invoice_id),
            invoice_number: model.invoice_number,
            customer_id: model.customer_id,
            invoice_date: model.invoice_date,
            due_date: model.due_date,
            status: model.status,
            manual_status: model.manual_status,
            confirmed: model.confirmed,
            subtotal: model.subtotal,
            tax_amount: model.tax_amount,
            discount_amount: model.discount_amount,
            total_amount: model.total_amount,
            paid_amount: model.paid_amount,
            balance_amount: model.balance_amount,
            currency: model.currency,
            notes: model.notes,
            created_by: model.created_by,
            last_modified_by: model.last_modified_by,
            created_date: Some(model.created_date),
            last_modified: Some(model.last_modified),
            items: items.into_iter().map(LineItem::from_invoice_item).collect(),
        }
    }

    /// Builds the header row. The key is left unset for unpersisted invoices
    /// so the database assigns it.
    pub fn to_active_model(&self, now: NaiveDateTime) -> invoice::ActiveModel {
        invoice::ActiveModel {
            invoice_id: match self.invoice_id {
                Some(id) => Set(id),
                None => NotSet,
            },
            invoice_number: Set(self.invoice_number.clone()),
            customer_id: Set(self.customer_id),
            invoice_date: Set(self.invoice_date),
            due_date: Set(self.due_date),
            status: Set(self.status),
            manual_status: Set(self.manual_status),
            confirmed: Set(self.confirmed),
            subtotal: Set(self.subtotal),
            tax_amount: Set(self.tax_amount),
            discount_amount: Set(self.discount_amount),
            total_amount: Set(self.total_amount),
            paid_amount: Set(self.paid_amount),
            balance_amount: Set(self.balance_amount),
            currency: Set(self.currency.clone()),
            notes: Set(self.notes.clone()),
            created_by: Set(self.created_by.clone()),
            last_modified_by: Set(self.last_modified_by.clone()),
            created_date: Set(self.created_date.unwrap_or(now)),
            last_modified: Set(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice_with_total(total: i64) -> Invoice {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut invoice = Invoice::new_draft("INV-001", 1, date, date, "USD");
        invoice.set_total_amount(Decimal::new(total, 0));
        invoice
    }

    #[test]
    fn test_line_item_total_applies_discount_then_tax() {
        let mut item = LineItem::new("Consulting", Decimal::new(3, 0), Decimal::new(5000, 2));
        item.discount = Decimal::new(1000, 2);
        item.tax_rate = Decimal::new(10, 0);
        // (3 * 50.00 - 10.00) * 1.10 = 154.00
        assert_eq!(item.total(), Decimal::new(15400, 2));
    }

    #[test]
    fn test_line_item_total_never_negative() {
        let mut item = LineItem::new("Refund", Decimal::ONE, Decimal::new(500, 2));
        item.discount = Decimal::new(1000, 2);
        assert_eq!(item.total(), Decimal::ZERO);
    }

    #[test]
    fn test_paid_above_total_is_clamped() {
        let mut invoice = invoice_with_total(100);
        let change = invoice.set_paid_amount(Decimal::new(150, 0));

        assert!(change.substituted);
        assert!(change.warning.is_some());
        assert_eq!(invoice.paid_amount, Decimal::new(100, 0));
        assert_eq!(invoice.balance_amount, Decimal::ZERO);
    }

    #[test]
    fn test_negative_paid_is_rejected() {
        let mut invoice = invoice_with_total(100);
        invoice.set_paid_amount(Decimal::new(40, 0));
        let change = invoice.set_paid_amount(Decimal::new(-5, 0));

        assert!(change.substituted);
        assert_eq!(change.applied, Decimal::new(40, 0));
        assert_eq!(invoice.balance_amount, Decimal::new(60, 0));
    }

    #[test]
    fn test_lowering_total_pulls_paid_down() {
        let mut invoice = invoice_with_total(100);
        invoice.set_paid_amount(Decimal::new(80, 0));
        let change = invoice.set_total_amount(Decimal::new(50, 0));

        assert!(!change.substituted);
        assert!(change.warning.is_some());
        assert_eq!(invoice.paid_amount, Decimal::new(50, 0));
        assert_eq!(invoice.balance_amount, Decimal::ZERO);
    }

    #[test]
    fn test_recalculate_totals_from_items() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut invoice = Invoice::new_draft("INV-002", 1, date, date, "USD");
        invoice
            .items
            .push(LineItem::new("Hosting", Decimal::new(2, 0), Decimal::new(2500, 2)));
        invoice
            .items
            .push(LineItem::new("Domain", Decimal::ONE, Decimal::new(1200, 2)));
        invoice.tax_amount = Decimal::new(620, 2);
        invoice.discount_amount = Decimal::new(200, 2);
        invoice.recalculate_totals();

        assert_eq!(invoice.subtotal, Decimal::new(6200, 2));
        assert_eq!(invoice.total_amount, Decimal::new(6620, 2));
        assert_eq!(invoice.balance_amount, Decimal::new(6620, 2));
    }
}
