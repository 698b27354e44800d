use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::Subcommand;
use common::{format_amount, parse_amount};
use model::entities::tax_jurisdiction::JurisdictionType;
use model::invoice::round_money;
use model::tax::{TaxJurisdiction, combined_rate};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use crate::cli::context::Context;

#[derive(Subcommand, Debug)]
pub enum TaxCommand {
    /// Register a tax jurisdiction
    Add {
        #[arg(long)]
        name: String,
        /// FEDERAL, STATE, COUNTY, CITY or SPECIAL
        #[arg(long = "type")]
        kind: JurisdictionType,
        /// Rate in percent, e.g. 7.25
        #[arg(long, value_parser = parse_amount)]
        rate: Decimal,
        /// First day the rate applies; defaults to today
        #[arg(long)]
        effective: Option<NaiveDate>,
        /// Last day the rate applies
        #[arg(long)]
        expires: Option<NaiveDate>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Tax due on an amount across all jurisdictions in effect
    Calc {
        #[arg(value_parser = parse_amount)]
        amount: Decimal,
        /// Date to evaluate the rates on; defaults to today
        #[arg(long)]
        on: Option<NaiveDate>,
    },
}

#[derive(Serialize)]
struct TaxLine {
    jurisdiction: String,
    rate: Decimal,
    tax: Decimal,
}

#[derive(Serialize)]
struct TaxCalculation {
    amount: Decimal,
    date: NaiveDate,
    combined_rate: Decimal,
    lines: Vec<TaxLine>,
    total_tax: Decimal,
}

#[instrument(skip(ctx))]
pub async fn run(ctx: &Context, command: TaxCommand) -> Result<()> {
    match command {
        TaxCommand::Add {
            name,
            kind,
            rate,
            effective,
            expires,
            description,
        } => {
            if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
                bail!("Tax rate must be between 0 and 100 percent");
            }
            let effective = effective.unwrap_or(ctx.today);
            if expires.is_some_and(|expires| expires < effective) {
                bail!("Expiration date is before the effective date");
            }
            let mut jurisdiction = TaxJurisdiction::new(name, kind, rate, effective);
            jurisdiction.expiration_date = expires;
            jurisdiction.description = description;
            ctx.save_entities(&ctx.taxes, vec![jurisdiction]).await?;
        }
        TaxCommand::Calc { amount, on } => {
            let date = on.unwrap_or(ctx.today);
            let jurisdictions = ctx.taxes.list_all().await?;
            let lines: Vec<TaxLine> = jurisdictions
                .iter()
                .filter(|j| j.is_effective_on(date))
                .map(|j| TaxLine {
                    jurisdiction: j.jurisdiction_name.clone(),
                    rate: j.tax_rate,
                    tax: j.calculate_tax(amount),
                })
                .collect();
            let calculation = TaxCalculation {
                amount,
                date,
                combined_rate: combined_rate(&jurisdictions, date),
                total_tax: round_money(lines.iter().map(|l| l.tax).sum()),
                lines,
            };

            let currency = &ctx.config.default_currency;
            ctx.emit(&calculation, || {
                for line in &calculation.lines {
                    println!(
                        "{:<30} {:>8}% {:>14}",
                        line.jurisdiction,
                        line.rate,
                        format_amount(line.tax, currency)
                    );
                }
                println!(
                    "{:<30} {:>8}% {:>14}",
                    "TOTAL",
                    calculation.combined_rate,
                    format_amount(calculation.total_tax, currency)
                );
            })?;
        }
    }
    Ok(())
}
