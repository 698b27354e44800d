use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create customers table
        manager
            .create_table(
                Table::create()
                    .table(Customers::Table)
                    .if_not_exists()
                    .col(pk_auto(Customers::CustomerId))
                    .col(string(Customers::CustomerCode).unique_key())
                    .col(string(Customers::CompanyName))
                    .col(string_null(Customers::ContactPerson))
                    .col(string_null(Customers::Email))
                    .col(string_null(Customers::Phone))
                    .col(string_null(Customers::Address))
                    .col(string_null(Customers::City))
                    .col(string_null(Customers::State))
                    .col(string_null(Customers::PostalCode))
                    .col(string_null(Customers::Country))
                    .col(string_null(Customers::TaxId))
                    .col(string_len(Customers::Status, 20).default("ACTIVE"))
                    .col(string_len(Customers::PaymentTerms, 20).default("NET_30"))
                    .col(decimal(Customers::CreditLimit).decimal_len(16, 4))
                    .col(date_time(Customers::CreatedDate))
                    .col(date_time(Customers::LastModified))
                    .to_owned(),
            )
            .await?;

        // Create invoices table
        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(pk_auto(Invoices::InvoiceId))
                    .col(string(Invoices::InvoiceNumber).unique_key())
                    .col(integer(Invoices::CustomerId))
                    .col(date(Invoices::InvoiceDate))
                    .col(date(Invoices::DueDate))
                    .col(string_len(Invoices::Status, 20))
                    .col(string_len(Invoices::ManualStatus, 20).default("DRAFT"))
                    .col(boolean(Invoices::Confirmed).default(false))
                    .col(decimal(Invoices::Subtotal).decimal_len(16, 4))
                    .col(decimal(Invoices::TaxAmount).decimal_len(16, 4))
                    .col(decimal(Invoices::DiscountAmount).decimal_len(16, 4))
                    .col(decimal(Invoices::TotalAmount).decimal_len(16, 4))
                    .col(decimal(Invoices::PaidAmount).decimal_len(16, 4))
                    .col(decimal(Invoices::BalanceAmount).decimal_len(16, 4))
                    .col(string_len(Invoices::Currency, 3))
                    .col(string_null(Invoices::Notes))
                    .col(string_null(Invoices::CreatedBy))
                    .col(string_null(Invoices::LastModifiedBy))
                    .col(date_time(Invoices::CreatedDate))
                    .col(date_time(Invoices::LastModified))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_customer")
                            .from(Invoices::Table, Invoices::CustomerId)
                            .to(Customers::Table, Customers::CustomerId)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create invoice_items table
        manager
            .create_table(
                Table::create()
                    .table(InvoiceItems::Table)
                    .if_not_exists()
                    .col(pk_auto(InvoiceItems::ItemId))
                    .col(integer(InvoiceItems::InvoiceId))
                    .col(string(InvoiceItems::Description))
                    .col(string_null(InvoiceItems::ProductCode))
                    .col(decimal(InvoiceItems::Quantity).decimal_len(16, 4))
                    .col(decimal(InvoiceItems::UnitPrice).decimal_len(16, 4))
                    .col(decimal(InvoiceItems::Discount).decimal_len(16, 4))
                    .col(decimal(InvoiceItems::TaxRate).decimal_len(16, 4))
                    .col(decimal(InvoiceItems::Total).decimal_len(16, 4))
                    .col(string_null(InvoiceItems::Unit))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoice_items_invoice")
                            .from(InvoiceItems::Table, InvoiceItems::InvoiceId)
                            .to(Invoices::Table, Invoices::InvoiceId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invoices_customer")
                    .table(Invoices::Table)
                    .col(Invoices::CustomerId)
                    .to_owned(),
            )
            .await?;

        // Create tax_jurisdictions table
        manager
            .create_table(
                Table::create()
                    .table(TaxJurisdictions::Table)
                    .if_not_exists()
                    .col(pk_auto(TaxJurisdictions::JurisdictionId))
                    .col(string(TaxJurisdictions::JurisdictionName).unique_key())
                    .col(string_len(TaxJurisdictions::JurisdictionType, 20))
                    .col(decimal(TaxJurisdictions::TaxRate).decimal_len(8, 4))
                    .col(boolean(TaxJurisdictions::IsActive).default(true))
                    .col(date(TaxJurisdictions::EffectiveDate))
                    .col(date_null(TaxJurisdictions::ExpirationDate))
                    .col(string_null(TaxJurisdictions::Description))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order to avoid foreign key constraints
        manager
            .drop_table(Table::drop().table(TaxJurisdictions::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(InvoiceItems::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Customers::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Customers {
    Table,
    CustomerId,
    CustomerCode,
    CompanyName,
    ContactPerson,
    Email,
    Phone,
    Address,
    City,
    State,
    PostalCode,
    Country,
    TaxId,
    Status,
    PaymentTerms,
    CreditLimit,
    CreatedDate,
    LastModified,
}

#[derive(DeriveIden)]
enum Invoices {
    Table,
    InvoiceId,
    InvoiceNumber,
    CustomerId,
    InvoiceDate,
    DueDate,
    Status,
    ManualStatus,
    Confirmed,
    Subtotal,
    TaxAmount,
    DiscountAmount,
    TotalAmount,
    PaidAmount,
    BalanceAmount,
    Currency,
    Notes,
    CreatedBy,
    LastModifiedBy,
    CreatedDate,
    LastModified,
}

#[derive(DeriveIden)]
enum InvoiceItems {
    Table,
    ItemId,
    InvoiceId,
    Description,
    ProductCode,
    Quantity,
    UnitPrice,
    Discount,
    TaxRate,
    Total,
    Unit,
}

#[derive(DeriveIden)]
enum TaxJurisdictions {
    Table,
    JurisdictionId,
    JurisdictionName,
    JurisdictionType,
    TaxRate,
    IsActive,
    EffectiveDate,
    ExpirationDate,
    Description,
}
