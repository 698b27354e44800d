use anyhow::{Result, bail};
use clap::Subcommand;
use common::{NewCustomer, format_amount, parse_amount};
use compute::customer::customer_from_input;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument};

use crate::cli::context::Context;

#[derive(Subcommand, Debug)]
pub enum CustomerCommand {
    /// List customers
    List,
    /// Add a customer
    Add {
        /// Customer code (business key)
        #[arg(long)]
        code: String,
        /// Company name
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        /// Payment terms, e.g. NET_30 or DUE_ON_RECEIPT
        #[arg(long)]
        terms: Option<String>,
        #[arg(long, value_parser = parse_amount)]
        credit_limit: Option<Decimal>,
    },
    /// Delete a customer that no invoice or quotation references
    Delete { code: String },
}

#[derive(Serialize)]
struct CustomerRow {
    customer_code: String,
    company_name: String,
    email: Option<String>,
    status: String,
    payment_terms: String,
    credit_limit: Decimal,
}

#[instrument(skip(ctx))]
pub async fn run(ctx: &Context, command: CustomerCommand) -> Result<()> {
    match command {
        CustomerCommand::List => {
            let rows: Vec<CustomerRow> = ctx
                .customers
                .list_all()
                .await?
                .into_iter()
                .map(|c| CustomerRow {
                    customer_code: c.customer_code,
                    company_name: c.company_name,
                    email: c.email,
                    status: format!("{:?}", c.status).to_uppercase(),
                    payment_terms: c.payment_terms.to_string(),
                    credit_limit: c.credit_limit,
                })
                .collect();
            ctx.emit(&rows, || {
                for row in &rows {
                    println!(
                        "{:<12} {:<30} {:<10} {:<15} {:>14}",
                        row.customer_code,
                        row.company_name,
                        row.status,
                        row.payment_terms,
                        format_amount(row.credit_limit, &ctx.config.default_currency)
                    );
                }
            })?;
        }
        CustomerCommand::Add {
            code,
            name,
            email,
            contact,
            phone,
            terms,
            credit_limit,
        } => {
            let customer = customer_from_input(NewCustomer {
                customer_code: code,
                company_name: name,
                contact_person: contact,
                email,
                phone,
                payment_terms: terms,
                credit_limit,
            })?;
            if ctx
                .customers
                .find_by_business_key(&customer.customer_code)
                .await?
                .is_some()
            {
                bail!("Customer '{}' already exists", customer.customer_code);
            }
            let code = customer.customer_code.clone();
            ctx.save_entities(&ctx.customers, vec![customer]).await?;
            info!("Customer {} added", code);
        }
        CustomerCommand::Delete { code } => {
            let customer = ctx.find_customer(&code).await?;
            let Some(id) = customer.customer_id else {
                bail!("Customer '{}' has no stored record", code);
            };
            ctx.customers.delete(id).await?;
            if !ctx.json {
                println!("Deleted customer {}", code);
            }
        }
    }
    Ok(())
}
