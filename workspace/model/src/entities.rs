//! This file serves as the root for all SeaORM entity modules.
//! Column names follow the billing schema: surrogate keys are named
//! `<entity>_id` and each top-level entity carries a unique business key.

pub mod customer;
pub mod invoice;
pub mod invoice_item;
pub mod quotation;
pub mod quotation_item;
pub mod tax_jurisdiction;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::customer::Entity as Customer;
    pub use super::invoice::Entity as Invoice;
    pub use super::invoice_item::Entity as InvoiceItem;
    pub use super::quotation::Entity as Quotation;
    pub use super::quotation_item::Entity as QuotationItem;
    pub use super::tax_jurisdiction::Entity as TaxJurisdiction;
}
