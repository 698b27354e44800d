use sea_orm_migration::{prelude::*, schema::*};

use crate::m20240101_000001_create_billing_tables::Customers;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Quotations::Table)
                    .if_not_exists()
                    .col(pk_auto(Quotations::QuotationId))
                    .col(string(Quotations::QuotationNumber).unique_key())
                    .col(integer(Quotations::CustomerId))
                    .col(date(Quotations::QuotationDate))
                    .col(date(Quotations::ValidUntilDate))
                    .col(string_len(Quotations::Status, 20))
                    .col(decimal(Quotations::Subtotal).decimal_len(16, 4))
                    .col(decimal(Quotations::TaxAmount).decimal_len(16, 4))
                    .col(decimal(Quotations::DiscountAmount).decimal_len(16, 4))
                    .col(decimal(Quotations::TotalAmount).decimal_len(16, 4))
                    .col(string_len(Quotations::Currency, 3))
                    .col(string_null(Quotations::Notes))
                    .col(boolean(Quotations::ConvertedToInvoice).default(false))
                    .col(string_null(Quotations::ConvertedInvoiceNumber))
                    .col(date_null(Quotations::ConversionDate))
                    .col(string_null(Quotations::CreatedBy))
                    .col(string_null(Quotations::LastModifiedBy))
                    .col(date_time(Quotations::CreatedDate))
                    .col(date_time(Quotations::LastModified))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_quotations_customer")
                            .from(Quotations::Table, Quotations::CustomerId)
                            .to(Customers::Table, Customers::CustomerId)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(QuotationItems::Table)
                    .if_not_exists()
                    .col(pk_auto(QuotationItems::ItemId))
                    .col(integer(QuotationItems::QuotationId))
                    .col(string(QuotationItems::Description))
                    .col(string_null(QuotationItems::ProductCode))
                    .col(decimal(QuotationItems::Quantity).decimal_len(16, 4))
                    .col(decimal(QuotationItems::UnitPrice).decimal_len(16, 4))
                    .col(decimal(QuotationItems::Discount).decimal_len(16, 4))
                    .col(decimal(QuotationItems::TaxRate).decimal_len(16, 4))
                    .col(decimal(QuotationItems::Total).decimal_len(16, 4))
                    .col(string_null(QuotationItems::Unit))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_quotation_items_quotation")
                            .from(QuotationItems::Table, QuotationItems::QuotationId)
                            .to(Quotations::Table, Quotations::QuotationId)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QuotationItems::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Quotations::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Quotations {
    Table,
    QuotationId,
    QuotationNumber,
    CustomerId,
    QuotationDate,
    ValidUntilDate,
    Status,
    Subtotal,
    TaxAmount,
    DiscountAmount,
    TotalAmount,
    Currency,
    Notes,
    ConvertedToInvoice,
    ConvertedInvoiceNumber,
    ConversionDate,
    CreatedBy,
    LastModifiedBy,
    CreatedDate,
    LastModified,
}

#[derive(DeriveIden)]
enum QuotationItems {
    Table,
    ItemId,
    QuotationId,
    Description,
    ProductCode,
    Quantity,
    UnitPrice,
    Discount,
    TaxRate,
    Total,
    Unit,
}
