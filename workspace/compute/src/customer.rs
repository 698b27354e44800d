use common::NewCustomer;
use model::customer::Customer;
use model::entities::customer::PaymentTerms;
use tracing::debug;
use validator::Validate;

use crate::error::{ComputeError, Result};

/// Validates `input` and builds an unpersisted customer from it.
/// Nothing that fails here ever reaches a store.
pub fn customer_from_input(input: NewCustomer) -> Result<Customer> {
    input
        .validate()
        .map_err(|e| ComputeError::Validation(e.to_string()))?;

    let code = input.customer_code.trim();
    let name = input.company_name.trim();
    if code.is_empty() || name.is_empty() {
        return Err(ComputeError::Validation(
            "customer code and company name must not be blank".to_string(),
        ));
    }

    let payment_terms = match input.payment_terms.as_deref() {
        Some(label) => label
            .parse::<PaymentTerms>()
            .map_err(ComputeError::Validation)?,
        None => PaymentTerms::Net30,
    };

    let mut customer = Customer::new(code, name);
    customer.contact_person = input.contact_person;
    customer.email = input.email;
    customer.phone = input.phone;
    customer.payment_terms = payment_terms;
    if let Some(limit) = input.credit_limit {
        customer.credit_limit = limit;
    }

    debug!("Customer {} passed validation", customer.customer_code);
    Ok(customer)
}
