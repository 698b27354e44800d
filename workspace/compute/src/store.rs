//! Persistence seam.
//!
//! The workflow only talks to [`Store`]; [`DatabaseStore`] backs it with
//! SeaORM and [`MemoryStore`] keeps records in memory (tests, and the
//! read-only fallback when the database cannot be opened).

pub mod database;
pub mod memory;

pub use database::DatabaseStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use model::customer::Customer;
use model::invoice::Invoice;
use model::quotation::Quotation;
use model::tax::TaxJurisdiction;

use crate::error::StoreResult;

/// An entity addressed by a business key before it has a surrogate key.
pub trait Keyed: Clone + PartialEq + Send + Sync + 'static {
    /// Human-readable entity name used in logs.
    const KIND: &'static str;

    fn business_key(&self) -> &str;

    fn surrogate_id(&self) -> Option<i32>;

    fn set_surrogate_id(&mut self, id: i32);

    /// Copies this snapshot's mutable fields onto `persisted`, keeping the
    /// persisted identity and audit metadata. The result equals `persisted`
    /// when nothing changed.
    fn merge_onto(&self, persisted: Self) -> Self;
}

/// CRUD access used by the reconciliation workflow.
///
/// A successful `insert` or `update` must be visible to the next
/// `find_by_business_key` call.
#[async_trait]
pub trait Store<T: Keyed>: Send + Sync {
    async fn find_by_business_key(&self, key: &str) -> StoreResult<Option<T>>;

    /// Inserts a new record and returns its surrogate key.
    async fn insert(&self, entity: &T) -> StoreResult<i32>;

    /// Updates the record identified by the entity's surrogate key and returns
    /// the number of rows affected.
    async fn update(&self, entity: &T) -> StoreResult<u64>;

    async fn delete(&self, id: i32) -> StoreResult<bool>;

    async fn list_all(&self) -> StoreResult<Vec<T>>;

    /// Looks a record up by surrogate key. The default scans `list_all`.
    async fn find_by_id(&self, id: i32) -> StoreResult<Option<T>> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .find(|entity| entity.surrogate_id() == Some(id)))
    }
}

impl Keyed for Invoice {
    const KIND: &'static str = "invoice";

    fn business_key(&self) -> &str {
        &self.invoice_number
    }

    fn surrogate_id(&self) -> Option<i32> {
        self.invoice_id
    }

    fn set_surrogate_id(&mut self, id: i32) {
        self.invoice_id = Some(id);
    }

    fn merge_onto(&self, persisted: Self) -> Self {
        Invoice {
            invoice_id: persisted.invoice_id,
            invoice_number: persisted.invoice_number,
            created_by: persisted.created_by,
            created_date: persisted.created_date,
            last_modified_by: persisted.last_modified_by,
            last_modified: persisted.last_modified,
            ..self.clone()
        }
    }
}

impl Keyed for Quotation {
    const KIND: &'static str = "quotation";

    fn business_key(&self) -> &str {
        &self.quotation_number
    }

    fn surrogate_id(&self) -> Option<i32> {
        self.quotation_id
    }

    fn set_surrogate_id(&mut self, id: i32) {
        self.quotation_id = Some(id);
    }

    fn merge_onto(&self, persisted: Self) -> Self {
        // The conversion flag is one-way.
        let converted = persisted.converted_to_invoice || self.converted_to_invoice;
        Quotation {
            quotation_id: persisted.quotation_id,
            quotation_number: persisted.quotation_number,
            created_by: persisted.created_by,
            created_date: persisted.created_date,
            last_modified_by: persisted.last_modified_by,
            last_modified: persisted.last_modified,
            converted_to_invoice: converted,
            converted_invoice_number: self
                .converted_invoice_number
                .clone()
                .or(persisted.converted_invoice_number),
            conversion_date: self.conversion_date.or(persisted.conversion_date),
            ..self.clone()
        }
    }
}

impl Keyed for Customer {
    const KIND: &'static str = "customer";

    fn business_key(&self) -> &str {
        &self.customer_code
    }

    fn surrogate_id(&self) -> Option<i32> {
        self.customer_id
    }

    fn set_surrogate_id(&mut self, id: i32) {
        self.customer_id = Some(id);
    }

    fn merge_onto(&self, persisted: Self) -> Self {
        Customer {
            customer_id: persisted.customer_id,
            customer_code: persisted.customer_code,
            created_date: persisted.created_date,
            last_modified: persisted.last_modified,
            ..self.clone()
        }
    }
}

impl Keyed for TaxJurisdiction {
    const KIND: &'static str = "tax jurisdiction";

    fn business_key(&self) -> &str {
        &self.jurisdiction_name
    }

    fn surrogate_id(&self) -> Option<i32> {
        self.jurisdiction_id
    }

    fn set_surrogate_id(&mut self, id: i32) {
        self.jurisdiction_id = Some(id);
    }

    fn merge_onto(&self, persisted: Self) -> Self {
        TaxJurisdiction {
            jurisdiction_id: persisted.jurisdiction_id,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_invoice_merge_keeps_identity() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut persisted = Invoice::new_draft("INV-001", 1, date, date, "USD");
        persisted.invoice_id = Some(42);
        persisted.created_by = Some("alice".to_string());

        let mut edited = Invoice::new_draft("INV-001", 2, date, date, "EUR");
        edited.created_by = Some("bob".to_string());
        edited.notes = Some("edited".to_string());

        let merged = edited.merge_onto(persisted);
        assert_eq!(merged.invoice_id, Some(42));
        assert_eq!(merged.created_by.as_deref(), Some("alice"));
        assert_eq!(merged.customer_id, 2);
        assert_eq!(merged.currency, "EUR");
        assert_eq!(merged.notes.as_deref(), Some("edited"));
    }

    #[test]
    fn test_unchanged_snapshot_merges_to_persisted() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut persisted = Invoice::new_draft("INV-001", 1, date, date, "USD");
        persisted.invoice_id = Some(42);
        persisted.created_date = date.and_hms_opt(9, 0, 0);
        persisted.last_modified = date.and_hms_opt(10, 0, 0);

        let mut snapshot = persisted.clone();
        snapshot.invoice_id = None;
        snapshot.last_modified = None;

        assert_eq!(snapshot.merge_onto(persisted.clone()), persisted);
    }

    #[test]
    fn test_quotation_merge_never_clears_conversion() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut persisted = Quotation::new_draft("Q-001", 1, date, date, "USD");
        persisted.quotation_id = Some(3);
        persisted.converted_to_invoice = true;
        persisted.converted_invoice_number = Some("INV-100".to_string());
        persisted.conversion_date = Some(date);

        let stale = Quotation::new_draft("Q-001", 1, date, date, "USD");
        let merged = stale.merge_onto(persisted);

        assert!(merged.converted_to_invoice);
        assert_eq!(merged.converted_invoice_number.as_deref(), Some("INV-100"));
        assert_eq!(merged.conversion_date, Some(date));
    }
}
