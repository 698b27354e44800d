//! Invoice status rules.
//!
//! Everything here is pure: callers pass the invoice snapshot and "today", and
//! get back the status it should carry. [`transition`] is the single table
//! that decides which user actions are allowed; [`apply`] runs it against a
//! mutable invoice.

use chrono::NaiveDate;
use model::entities::invoice::InvoiceStatus;
use model::invoice::Invoice;
use rust_decimal::Decimal;
use tracing::{debug, trace};

/// Payment-tracking status derived from amounts alone.
///
/// A non-positive total yields UNPAID so a confirmed invoice can never get
/// stuck without a status.
pub fn paid_status(total: Decimal, paid: Decimal, balance: Decimal) -> InvoiceStatus {
    if total <= Decimal::ZERO || paid <= Decimal::ZERO {
        InvoiceStatus::Unpaid
    } else if paid >= total && balance <= Decimal::ZERO {
        InvoiceStatus::Paid
    } else {
        InvoiceStatus::PartiallyPaid
    }
}

/// The status `invoice` should have on `today`.
///
/// 1. Past due → OVERDUE, whatever the current status.
/// 2. DRAFT and SENT are kept.
/// 3. Confirmed statuses follow the amounts.
/// 4. OVERDUE that is no longer past due goes back to the amount-derived
///    status if the invoice was confirmed, otherwise to the last manual status.
pub fn compute_status(invoice: &Invoice, today: NaiveDate) -> InvoiceStatus {
    if invoice.due_date < today {
        return InvoiceStatus::Overdue;
    }
    match invoice.status {
        InvoiceStatus::Draft | InvoiceStatus::Sent => invoice.status,
        InvoiceStatus::Unpaid | InvoiceStatus::PartiallyPaid | InvoiceStatus::Paid => {
            amount_status(invoice)
        }
        InvoiceStatus::Overdue if invoice.confirmed => amount_status(invoice),
        InvoiceStatus::Overdue => invoice.manual_status,
    }
}

fn amount_status(invoice: &Invoice) -> InvoiceStatus {
    paid_status(
        invoice.total_amount,
        invoice.paid_amount,
        invoice.balance_amount,
    )
}

/// A user or clock driven request against the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    /// The user picked a status in the editor.
    SetStatus(InvoiceStatus),
    /// The user asked to start payment tracking.
    Confirm,
    /// Dates or amounts changed; recompute.
    Reevaluate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Confirmed invoices only accept the computed status.
    AlreadyConfirmed,
    /// UNPAID, PARTIALLY_PAID and PAID need a confirmation first.
    RequiresConfirmation,
    /// Only SENT invoices can be confirmed.
    NotSent,
    /// Confirmation needs a positive total.
    NonPositiveTotal,
    /// OVERDUE cannot be picked before the due date has passed.
    NotOverdue,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            RejectReason::AlreadyConfirmed => {
                "invoice is confirmed; status follows payments and due date"
            }
            RejectReason::RequiresConfirmation => "payment statuses are set by confirming the invoice",
            RejectReason::NotSent => "only SENT invoices can be confirmed",
            RejectReason::NonPositiveTotal => "total amount must be greater than zero",
            RejectReason::NotOverdue => "invoice is not past its due date",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied {
        from: InvoiceStatus,
        to: InvoiceStatus,
    },
    Rejected {
        kept: InvoiceStatus,
        reason: RejectReason,
    },
}

impl Transition {
    /// The status the invoice carries after the event.
    pub fn status(&self) -> InvoiceStatus {
        match self {
            Transition::Applied { to, .. } => *to,
            Transition::Rejected { kept, .. } => *kept,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied { .. })
    }
}

/// Decides the outcome of `event` without touching the invoice.
pub fn transition(invoice: &Invoice, event: StatusEvent, today: NaiveDate) -> Transition {
    let from = invoice.status;
    let reject = |reason| Transition::Rejected { kept: from, reason };

    match (event, invoice.confirmed) {
        (StatusEvent::Reevaluate, _) => Transition::Applied {
            from,
            to: compute_status(invoice, today),
        },

        (StatusEvent::Confirm, true) => reject(RejectReason::AlreadyConfirmed),
        (StatusEvent::Confirm, false) if from != InvoiceStatus::Sent => {
            reject(RejectReason::NotSent)
        }
        (StatusEvent::Confirm, false) if invoice.total_amount <= Decimal::ZERO => {
            reject(RejectReason::NonPositiveTotal)
        }
        (StatusEvent::Confirm, false) => {
            let mut confirmed = invoice.clone();
            confirmed.confirmed = true;
            confirmed.status = amount_status(invoice);
            Transition::Applied {
                from,
                to: compute_status(&confirmed, today),
            }
        }

        (StatusEvent::SetStatus(requested), true) => {
            if requested == compute_status(invoice, today) {
                Transition::Applied {
                    from,
                    to: requested,
                }
            } else {
                reject(RejectReason::AlreadyConfirmed)
            }
        }
        (StatusEvent::SetStatus(requested), false) if requested.is_payment_tracking() => {
            reject(RejectReason::RequiresConfirmation)
        }
        (StatusEvent::SetStatus(InvoiceStatus::Overdue), false) => {
            if invoice.due_date < today {
                Transition::Applied {
                    from,
                    to: InvoiceStatus::Overdue,
                }
            } else {
                reject(RejectReason::NotOverdue)
            }
        }
        (StatusEvent::SetStatus(requested), false) => {
            let mut edited = invoice.clone();
            edited.status = requested;
            edited.manual_status = requested;
            Transition::Applied {
                from,
                to: compute_status(&edited, today),
            }
        }
    }
}

/// Runs `event` against `invoice`, updating it when the transition applies.
pub fn apply(invoice: &mut Invoice, event: StatusEvent, today: NaiveDate) -> Transition {
    trace!("Applying {:?} to invoice {}", event, invoice.invoice_number);
    let outcome = transition(invoice, event, today);

    if let Transition::Applied { to, .. } = outcome {
        match event {
            StatusEvent::Confirm => invoice.confirmed = true,
            StatusEvent::SetStatus(requested) if requested.is_manual() => {
                invoice.manual_status = requested;
            }
            _ => {}
        }
        invoice.status = to;
    }

    debug!(
        "Invoice {} {:?} -> {:?}",
        invoice.invoice_number, event, outcome
    );
    outcome
}

/// Result of a status edit from the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub requested: InvoiceStatus,
    pub allowed: InvoiceStatus,
    /// True when `allowed` differs from `requested`; callers must tell the user.
    pub substituted: bool,
    pub reason: Option<RejectReason>,
}

/// Returns the status the invoice may take when the user asks for `requested`.
/// Disallowed requests keep the current status.
pub fn validate_status_change(
    invoice: &Invoice,
    requested: InvoiceStatus,
    today: NaiveDate,
) -> StatusChange {
    match transition(invoice, StatusEvent::SetStatus(requested), today) {
        Transition::Applied { to, .. } => StatusChange {
            requested,
            allowed: to,
            substituted: to != requested,
            reason: None,
        },
        Transition::Rejected { kept, reason } => StatusChange {
            requested,
            allowed: kept,
            substituted: true,
            reason: Some(reason),
        },
    }
}

/// Confirms a SENT invoice with a positive total, moving it into payment
/// tracking. Any other invoice is left untouched and the rejection returned.
pub fn confirm_invoice(invoice: &mut Invoice, today: NaiveDate) -> Transition {
    apply(invoice, StatusEvent::Confirm, today)
}
