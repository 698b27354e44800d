use chrono::{Duration, NaiveDate};
use model::entities::customer::PaymentTerms;
use model::entities::quotation::QuotationStatus;
use model::invoice::Invoice;
use model::quotation::Quotation;
use tracing::{info, warn};

use crate::error::{ComputeError, Result};

/// The status `quotation` should carry on `today`. Open offers past their
/// validity date expire; everything else is kept.
pub fn evaluate_quotation_status(quotation: &Quotation, today: NaiveDate) -> QuotationStatus {
    match quotation.status {
        QuotationStatus::Draft | QuotationStatus::Sent
            if !quotation.converted_to_invoice && quotation.valid_until_date < today =>
        {
            QuotationStatus::Expired
        }
        status => status,
    }
}

/// Turns an open quotation into a DRAFT invoice numbered `invoice_number`.
///
/// The invoice copies customer, currency, notes, amounts and items; its due
/// date follows the customer's payment terms. The quotation is marked
/// ACCEPTED and converted, and can never be converted again.
pub fn convert_to_invoice(
    quotation: &mut Quotation,
    invoice_number: &str,
    terms: PaymentTerms,
    today: NaiveDate,
) -> Result<Invoice> {
    let reject = |reason: String| {
        warn!("Conversion of {} refused: {}", quotation.quotation_number, reason);
        ComputeError::ConversionRejected {
            key: quotation.quotation_number.clone(),
            reason,
        }
    };

    if quotation.converted_to_invoice {
        return Err(reject(format!(
            "already converted to {}",
            quotation.converted_invoice_number.as_deref().unwrap_or("an invoice")
        )));
    }
    match evaluate_quotation_status(quotation, today) {
        status @ (QuotationStatus::Expired | QuotationStatus::Rejected) => {
            return Err(reject(format!("quotation is {}", status)));
        }
        _ => {}
    }
    if invoice_number.trim().is_empty() {
        return Err(reject("invoice number is empty".to_string()));
    }

    let mut invoice = Invoice::new_draft(
        invoice_number,
        quotation.customer_id,
        today,
        today + Duration::days(terms.days()),
        quotation.currency.clone(),
    );
    invoice.items = quotation.items.clone();
    invoice.subtotal = quotation.subtotal;
    invoice.tax_amount = quotation.tax_amount;
    invoice.discount_amount = quotation.discount_amount;
    invoice.set_total_amount(quotation.total_amount);
    invoice.notes = quotation.notes.clone();

    quotation.status = QuotationStatus::Accepted;
    quotation.converted_to_invoice = true;
    quotation.converted_invoice_number = Some(invoice_number.to_string());
    quotation.conversion_date = Some(today);

    info!(
        "Quotation {} converted to invoice {}",
        quotation.quotation_number, invoice_number
    );
    Ok(invoice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::entities::invoice::InvoiceStatus;
    use model::invoice::LineItem;
    use rust_decimal::Decimal;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 10).unwrap()
    }

    fn quotation(valid_for_days: i64) -> Quotation {
        let mut q = Quotation::new_draft(
            "Q-001",
            3,
            today() - Duration::days(5),
            today() + Duration::days(valid_for_days),
            "EUR",
        );
        q.items.push(LineItem::new("Audit", Decimal::new(2, 0), Decimal::new(30000, 2)));
        q.tax_amount = Decimal::new(12000, 2);
        q.recalculate_totals();
        q.notes = Some("as discussed".to_string());
        q.status = QuotationStatus::Sent;
        q
    }

    #[test]
    fn test_open_quotation_expires_after_validity() {
        assert_eq!(
            evaluate_quotation_status(&quotation(0), today()),
            QuotationStatus::Sent
        );
        assert_eq!(
            evaluate_quotation_status(&quotation(-1), today()),
            QuotationStatus::Expired
        );

        let mut accepted = quotation(-1);
        accepted.status = QuotationStatus::Accepted;
        assert_eq!(
            evaluate_quotation_status(&accepted, today()),
            QuotationStatus::Accepted
        );
    }

    #[test]
    fn test_conversion_copies_offer() {
        let mut q = quotation(10);
        let invoice = convert_to_invoice(&mut q, "INV-100", PaymentTerms::Net30, today()).unwrap();

        assert_eq!(invoice.invoice_number, "INV-100");
        assert_eq!(invoice.customer_id, 3);
        assert_eq!(invoice.currency, "EUR");
        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert_eq!(invoice.due_date, today() + Duration::days(30));
        assert_eq!(invoice.items, q.items);
        assert_eq!(invoice.total_amount, Decimal::new(72000, 2));
        assert_eq!(invoice.balance_amount, Decimal::new(72000, 2));
        assert_eq!(invoice.notes.as_deref(), Some("as discussed"));

        assert!(q.converted_to_invoice);
        assert_eq!(q.status, QuotationStatus::Accepted);
        assert_eq!(q.converted_invoice_number.as_deref(), Some("INV-100"));
        assert_eq!(q.conversion_date, Some(today()));
    }

    #[test]
    fn test_conversion_happens_once() {
        let mut q = quotation(10);
        convert_to_invoice(&mut q, "INV-100", PaymentTerms::Net15, today()).unwrap();

        let err = convert_to_invoice(&mut q, "INV-101", PaymentTerms::Net15, today()).unwrap_err();
        assert!(matches!(err, ComputeError::ConversionRejected { .. }));
        assert_eq!(q.converted_invoice_number.as_deref(), Some("INV-100"));
    }

    #[test]
    fn test_expired_or_rejected_cannot_convert() {
        let mut expired = quotation(-2);
        assert!(convert_to_invoice(&mut expired, "INV-1", PaymentTerms::Net15, today()).is_err());
        assert!(!expired.converted_to_invoice);

        let mut rejected = quotation(5);
        rejected.status = QuotationStatus::Rejected;
        assert!(convert_to_invoice(&mut rejected, "INV-2", PaymentTerms::Net15, today()).is_err());
        assert_eq!(rejected.status, QuotationStatus::Rejected);
    }
}
