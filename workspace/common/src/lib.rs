//! Transport-layer types shared between the workflow crates and whatever
//! presents their results (currently the CLI). Everything here is plain data
//! with serde support so it can be printed as JSON or shipped elsewhere.

mod money;
mod save;

pub use money::{format_amount, parse_amount};
pub use save::{ItemOutcome, SaveFailure, SaveProgress, SaveReport, SavedEntity};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

// ===================== Customers =====================

/// Input for creating a customer. Checked with [`Validate`] before it is
/// turned into a domain object.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct NewCustomer {
    #[validate(length(min = 1, max = 32))]
    pub customer_code: String,
    #[validate(length(min = 1, max = 200))]
    pub company_name: String,
    pub contact_person: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Payment terms label, e.g. `NET_30`.
    pub payment_terms: Option<String>,
    #[validate(custom(function = "non_negative"))]
    pub credit_limit: Option<Decimal>,
}

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("negative_amount"));
    }
    Ok(())
}

// ===================== Invoices =====================

/// Flat invoice view for listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceSummary {
    pub invoice_number: String,
    pub customer_id: i32,
    pub due_date: chrono::NaiveDate,
    pub status: String,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub balance_amount: Decimal,
    pub currency: String,
    pub dirty: bool,
}
