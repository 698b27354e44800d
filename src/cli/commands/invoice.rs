use anyhow::{Result, bail};
use chrono::{Duration, NaiveDate};
use clap::Subcommand;
use common::{InvoiceSummary, format_amount, parse_amount};
use compute::session::InvoiceSession;
use model::entities::invoice::InvoiceStatus;
use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::cli::context::Context;

#[derive(Subcommand, Debug)]
pub enum InvoiceCommand {
    /// List invoices with their current status
    List,
    /// Create a DRAFT invoice
    Create {
        /// Invoice number (business key)
        #[arg(long)]
        number: String,
        /// Customer code
        #[arg(long)]
        customer: String,
        /// Due date (YYYY-MM-DD); defaults to the customer's payment terms
        #[arg(long)]
        due: Option<NaiveDate>,
        /// Invoice date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Total amount
        #[arg(long, value_parser = parse_amount)]
        total: Option<Decimal>,
        /// ISO currency code; defaults to the configured currency
        #[arg(long)]
        currency: Option<String>,
    },
    /// Request a status (DRAFT, SENT, OVERDUE; payment statuses come from confirming)
    SetStatus { number: String, status: InvoiceStatus },
    /// Record a payment against an invoice
    Pay {
        number: String,
        #[arg(value_parser = parse_amount)]
        amount: Decimal,
    },
    /// Start payment tracking on a SENT invoice
    Confirm { number: String },
    /// Delete an invoice and its items
    Delete { number: String },
    /// Re-evaluate every status for today and save the changes
    Refresh,
}

#[instrument(skip(ctx))]
pub async fn run(ctx: &Context, command: InvoiceCommand) -> Result<()> {
    let mut session = ctx.load_session().await?;

    match command {
        InvoiceCommand::List => {
            list(ctx, &session)?;
            // Statuses that moved on load are not saved by a listing.
            return Ok(());
        }
        InvoiceCommand::Create {
            number,
            customer,
            due,
            date,
            total,
            currency,
        } => {
            let customer = ctx.find_customer(&customer).await?;
            let Some(customer_id) = customer.customer_id else {
                bail!("Customer '{}' is not saved yet", customer.customer_code);
            };
            let invoice_date = date.unwrap_or(ctx.today);
            let due_date =
                due.unwrap_or(invoice_date + Duration::days(customer.payment_terms.days()));
            let currency = currency.unwrap_or_else(|| ctx.config.default_currency.clone());

            session.create_invoice(
                &number,
                customer_id,
                invoice_date,
                due_date,
                &currency,
                ctx.today,
            )?;
            if let Some(total) = total {
                let change = session.set_total_amount(&number, total, ctx.today)?;
                ctx.report_amount_change(&change, &currency);
            }
            info!("Invoice {} created for {}", number, customer.customer_code);
            show(ctx, &session, &number)?;
        }
        InvoiceCommand::SetStatus { number, status } => {
            let change = session.set_status(&number, status, ctx.today)?;
            if change.substituted {
                let why = change
                    .reason
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "the due date has passed".to_string());
                eprintln!(
                    "warning: {} not allowed ({}); status is {}",
                    change.requested, why, change.allowed
                );
            }
            show(ctx, &session, &number)?;
        }
        InvoiceCommand::Pay { number, amount } => {
            if amount <= Decimal::ZERO {
                bail!("Payment amount must be positive");
            }
            let Some(invoice) = session.invoice(&number) else {
                bail!("Invoice '{}' not found", number);
            };
            let currency = invoice.currency.clone();
            let paid = invoice.paid_amount + amount;
            let change = session.set_paid_amount(&number, paid, ctx.today)?;
            ctx.report_amount_change(&change, &currency);
            show(ctx, &session, &number)?;
        }
        InvoiceCommand::Confirm { number } => {
            let status = session.confirm(&number, ctx.today)?;
            info!("Invoice {} is now {}", number, status);
            show(ctx, &session, &number)?;
        }
        InvoiceCommand::Delete { number } => {
            session.delete(ctx.invoices.as_ref(), &number).await?;
            if !ctx.json {
                println!("Deleted {}", number);
            }
            return Ok(());
        }
        InvoiceCommand::Refresh => {
            // Loading already re-evaluated every status; what moved is dirty.
            session.refresh_statuses(ctx.today);
            if !ctx.json {
                for invoice in session.dirty_snapshot() {
                    println!("{}: {}", invoice.invoice_number, invoice.status);
                }
            }
        }
    }

    ctx.save_session(&mut session).await?;
    Ok(())
}

fn list(ctx: &Context, session: &InvoiceSession) -> Result<()> {
    let rows = session.summaries();
    ctx.emit(&rows, || {
        if rows.is_empty() {
            println!("No invoices");
            return;
        }
        println!(
            "{:<14} {:>8} {:<10} {:<15} {:>14} {:>14} {:>14}",
            "NUMBER", "CUSTOMER", "DUE", "STATUS", "TOTAL", "PAID", "BALANCE"
        );
        for row in &rows {
            print_row(row);
        }
    })
}

fn show(ctx: &Context, session: &InvoiceSession, number: &str) -> Result<()> {
    let Some(row) = session
        .summaries()
        .into_iter()
        .find(|row| row.invoice_number == number)
    else {
        bail!("Invoice '{}' not found", number);
    };
    ctx.emit(&row, || print_row(&row))
}

fn print_row(row: &InvoiceSummary) {
    println!(
        "{:<14} {:>8} {:<10} {:<15} {:>14} {:>14} {:>14}{}",
        row.invoice_number,
        row.customer_id,
        row.due_date,
        row.status,
        format_amount(row.total_amount, &row.currency),
        format_amount(row.paid_amount, &row.currency),
        format_amount(row.balance_amount, &row.currency),
        if row.dirty { " *" } else { "" }
    );
}
