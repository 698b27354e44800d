use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sea_orm::{ActiveValue::NotSet, Set};

use crate::entities::customer::{self, CustomerStatus, PaymentTerms};

/// In-memory customer snapshot. `customer_id` is `None` until persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub customer_id: Option<i32>,
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
    pub credit_limit: Decimal,
    pub created_date: Option<NaiveDateTime>,
    pub last_modified: Option<NaiveDateTime>,
}

impl Customer {
    pub fn new(customer_code: impl Into<String>, company_name: impl Into<String>) -> Self {
        Self {
            customer_id: None,
            customer_code: customer_code.into(),
            company_name: company_name.into(),
            contact_person: None,
            email: None,
            phone: None,
            address: None,
            city: None,
            state: None,
            postal_code: None,
            country: None,
            tax_id: None,
            status: CustomerStatus::Active,
            payment_terms: PaymentTerms::Net30,
            credit_limit: Decimal::ZERO,
            created_date: None,
            last_modified: None,
        }
    }

    pub fn from_model(model: customer::Model) -> Self {
        Self {
            customer_id: Some(model.customer_id),
            customer_code: model.customer_code,
            company_name: model.company_name,
            contact_person: model.contact_person,
            email: model.email,
            phone: model.phone,
            address: model.address,
            city: model.city,
            state: model.state,
            postal_code: model.postal_code,
            country: model.country,
            tax_id: model.tax_id,
            status: model.status,
            payment_terms: model.payment_terms,
            credit_limit: model.credit_limit,
            created_date: Some(model.created_date),
            last_modified: Some(model.last_modified),
        }
    }

    pub fn to_active_model(&self, now: NaiveDateTime) -> customer::ActiveModel {
        customer::ActiveModel {
            customer_id: match self.customer_id {
                Some(id) => Set(id),
                None => NotSet,
            },
            customer_code: Set(self.customer_code.clone()),
            company_name: Set(self.company_name.clone()),
            contact_person: Set(self.contact_person.clone()),
            email: Set(self.email.clone()),
            phone: Set(self.phone.clone()),
            address: Set(self.address.clone()),
            city: Set(self.city.clone()),
            state: Set(self.state.clone()),
            postal_code: Set(self.postal_code.clone()),
            country: Set(self.country.clone()),
            tax_id: Set(self.tax_id.clone()),
            status: Set(self.status),
            payment_terms: Set(self.payment_terms),
            credit_limit: Set(self.credit_limit),
            created_date: Set(self.created_date.unwrap_or(now)),
            last_modified: Set(now),
        }
    }
}
