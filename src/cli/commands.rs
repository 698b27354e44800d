pub mod customer;
pub mod initdb;
pub mod invoice;
pub mod quotation;
pub mod tax;

pub use customer::CustomerCommand;
pub use initdb::init_database;
pub use invoice::InvoiceCommand;
pub use quotation::QuotationCommand;
pub use tax::TaxCommand;
