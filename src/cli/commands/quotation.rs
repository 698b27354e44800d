use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::Subcommand;
use common::{format_amount, parse_amount};
use compute::quotation::{convert_to_invoice, evaluate_quotation_status};
use model::invoice::LineItem;
use model::quotation::Quotation;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument};

use crate::cli::context::Context;

#[derive(Subcommand, Debug)]
pub enum QuotationCommand {
    /// List quotations with their status for today
    List,
    /// Create a DRAFT quotation with a single line
    Create {
        /// Quotation number (business key)
        #[arg(long)]
        number: String,
        /// Customer code
        #[arg(long)]
        customer: String,
        /// Last day the offer is valid (YYYY-MM-DD)
        #[arg(long)]
        valid_until: NaiveDate,
        #[arg(long, value_parser = parse_amount)]
        total: Decimal,
        #[arg(long, default_value = "Quoted work")]
        description: String,
        #[arg(long)]
        currency: Option<String>,
    },
    /// Convert a quotation into a DRAFT invoice (only once)
    Convert {
        quotation_number: String,
        invoice_number: String,
    },
}

#[derive(Serialize)]
struct QuotationRow {
    quotation_number: String,
    customer_id: i32,
    valid_until_date: NaiveDate,
    status: String,
    total_amount: Decimal,
    currency: String,
    converted_invoice_number: Option<String>,
}

#[instrument(skip(ctx))]
pub async fn run(ctx: &Context, command: QuotationCommand) -> Result<()> {
    match command {
        QuotationCommand::List => {
            let rows: Vec<QuotationRow> = ctx
                .quotations
                .list_all()
                .await?
                .into_iter()
                .map(|q| QuotationRow {
                    status: evaluate_quotation_status(&q, ctx.today).to_string(),
                    quotation_number: q.quotation_number,
                    customer_id: q.customer_id,
                    valid_until_date: q.valid_until_date,
                    total_amount: q.total_amount,
                    currency: q.currency,
                    converted_invoice_number: q.converted_invoice_number,
                })
                .collect();
            ctx.emit(&rows, || {
                for row in &rows {
                    println!(
                        "{:<14} {:>8} {:<10} {:<9} {:>14} {}",
                        row.quotation_number,
                        row.customer_id,
                        row.valid_until_date,
                        row.status,
                        format_amount(row.total_amount, &row.currency),
                        row.converted_invoice_number.as_deref().unwrap_or("")
                    );
                }
            })?;
        }
        QuotationCommand::Create {
            number,
            customer,
            valid_until,
            total,
            description,
            currency,
        } => {
            let customer = ctx.find_customer(&customer).await?;
            let Some(customer_id) = customer.customer_id else {
                bail!("Customer '{}' is not saved yet", customer.customer_code);
            };
            if total <= Decimal::ZERO {
                bail!("Quotation total must be positive");
            }
            if ctx.quotations.find_by_business_key(&number).await?.is_some() {
                bail!("Quotation '{}' already exists", number);
            }
            let currency = currency.unwrap_or_else(|| ctx.config.default_currency.clone());
            let mut quotation =
                Quotation::new_draft(&number, customer_id, ctx.today, valid_until, currency);
            quotation
                .items
                .push(LineItem::new(description, Decimal::ONE, total));
            quotation.recalculate_totals();
            quotation.created_by = Some(ctx.config.operator.clone());

            ctx.save_entities(&ctx.quotations, vec![quotation]).await?;
            info!("Quotation {} created", number);
        }
        QuotationCommand::Convert {
            quotation_number,
            invoice_number,
        } => {
            let Some(mut quotation) = ctx
                .quotations
                .find_by_business_key(&quotation_number)
                .await?
            else {
                bail!("Quotation '{}' not found", quotation_number);
            };
            let customer = ctx.find_customer_by_id(quotation.customer_id).await?;

            let mut session = ctx.load_session().await?;
            let invoice = convert_to_invoice(
                &mut quotation,
                &invoice_number,
                customer.payment_terms,
                ctx.today,
            )?;
            session.insert_invoice(invoice, ctx.today)?;

            // The invoice goes first so the quotation never points at a
            // missing invoice.
            ctx.save_session(&mut session).await?;
            ctx.save_entities(&ctx.quotations, vec![quotation]).await?;

            if !ctx.json {
                println!("Quotation {} converted to {}", quotation_number, invoice_number);
            }
        }
    }
    Ok(())
}
