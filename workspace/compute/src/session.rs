//! Editing session over the invoice list.
//!
//! [`InvoiceSession`] owns the in-memory invoices and their [`ChangeTracker`].
//! Every edit goes through it, so after each call the amount invariants hold
//! and the status matches what the rule engine computes for "today".
//! Saving happens elsewhere: take [`InvoiceSession::dirty_snapshot`], hand it
//! to a [`Reconciler`](crate::reconcile::Reconciler) and feed the report back
//! through [`InvoiceSession::apply_report`].

use std::collections::BTreeMap;

use chrono::NaiveDate;
use common::{InvoiceSummary, SaveReport};
use model::entities::invoice::InvoiceStatus;
use model::invoice::{AmountChange, Invoice, LineItem};
use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::error::{ComputeError, Result};
use crate::status::{self, StatusChange, StatusEvent, Transition};
use crate::store::Store;
use crate::tracker::ChangeTracker;

#[derive(Debug, Default)]
pub struct InvoiceSession {
    invoices: BTreeMap<String, Invoice>,
    tracker: ChangeTracker,
    operator: Option<String>,
}

impl InvoiceSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name recorded as creator/last editor of invoices touched in this session.
    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    /// Loads every invoice from `store` and re-evaluates its status for
    /// `today`. Invoices whose status moved are marked dirty.
    #[instrument(skip(store))]
    pub async fn load<S>(store: &S, today: NaiveDate) -> Result<Self>
    where
        S: Store<Invoice> + ?Sized,
    {
        let mut session = Self::new();
        for invoice in store.list_all().await? {
            session
                .invoices
                .insert(invoice.invoice_number.clone(), invoice);
        }
        let changed = session.refresh_statuses(today);
        info!(
            "Loaded {} invoices, {} status change(s)",
            session.invoices.len(),
            changed.len()
        );
        Ok(session)
    }

    /// Adds a new DRAFT invoice with zero amounts.
    pub fn create_invoice(
        &mut self,
        invoice_number: &str,
        customer_id: i32,
        invoice_date: NaiveDate,
        due_date: NaiveDate,
        currency: &str,
        today: NaiveDate,
    ) -> Result<&Invoice> {
        let number = invoice_number.trim();
        if number.is_empty() {
            return Err(ComputeError::Validation(
                "invoice number must not be blank".to_string(),
            ));
        }
        let invoice = Invoice::new_draft(number, customer_id, invoice_date, due_date, currency);
        self.insert_invoice(invoice, today)?;
        self.get(number)
    }

    /// Adds an invoice built elsewhere, e.g. from a quotation.
    pub fn insert_invoice(&mut self, mut invoice: Invoice, today: NaiveDate) -> Result<()> {
        let key = invoice.invoice_number.clone();
        if self.invoices.contains_key(&key) {
            return Err(ComputeError::DuplicateEntity(key));
        }
        if invoice.created_by.is_none() {
            invoice.created_by = self.operator.clone();
        }
        invoice.recalculate_balance();
        status::apply(&mut invoice, StatusEvent::Reevaluate, today);

        if invoice.is_persisted() {
            self.tracker.mark_dirty(&key);
        } else {
            self.tracker.mark_new(&key);
        }
        debug!("Invoice {} added to session", key);
        self.invoices.insert(key, invoice);
        Ok(())
    }

    pub fn invoice(&self, key: &str) -> Option<&Invoice> {
        self.invoices.get(key)
    }

    /// All invoices ordered by invoice number.
    pub fn invoices(&self) -> impl Iterator<Item = &Invoice> {
        self.invoices.values()
    }

    pub fn len(&self) -> usize {
        self.invoices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty()
    }

    /// Listing rows, flagged with their unsaved state.
    pub fn summaries(&self) -> Vec<InvoiceSummary> {
        self.invoices
            .values()
            .map(|invoice| InvoiceSummary {
                invoice_number: invoice.invoice_number.clone(),
                customer_id: invoice.customer_id,
                due_date: invoice.due_date,
                status: invoice.status.to_string(),
                total_amount: invoice.total_amount,
                paid_amount: invoice.paid_amount,
                balance_amount: invoice.balance_amount,
                currency: invoice.currency.clone(),
                dirty: self.tracker.is_dirty(&invoice.invoice_number),
            })
            .collect()
    }

    /// Requests a status from the editor. The returned change carries the
    /// status actually applied; `substituted` tells the caller to warn.
    pub fn set_status(
        &mut self,
        key: &str,
        requested: InvoiceStatus,
        today: NaiveDate,
    ) -> Result<StatusChange> {
        self.edit(key, |invoice| {
            let change = status::validate_status_change(invoice, requested, today);
            status::apply(invoice, StatusEvent::SetStatus(requested), today);
            if change.substituted {
                warn!(
                    "Invoice {}: requested {} but kept {}",
                    invoice.invoice_number, requested, change.allowed
                );
            }
            change
        })
    }

    pub fn set_paid_amount(
        &mut self,
        key: &str,
        amount: Decimal,
        today: NaiveDate,
    ) -> Result<AmountChange> {
        self.edit(key, |invoice| {
            let change = invoice.set_paid_amount(amount);
            status::apply(invoice, StatusEvent::Reevaluate, today);
            change
        })
    }

    pub fn set_total_amount(
        &mut self,
        key: &str,
        amount: Decimal,
        today: NaiveDate,
    ) -> Result<AmountChange> {
        self.edit(key, |invoice| {
            let change = invoice.set_total_amount(amount);
            status::apply(invoice, StatusEvent::Reevaluate, today);
            change
        })
    }

    pub fn set_due_date(
        &mut self,
        key: &str,
        due_date: NaiveDate,
        today: NaiveDate,
    ) -> Result<InvoiceStatus> {
        self.edit(key, |invoice| {
            invoice.due_date = due_date;
            status::apply(invoice, StatusEvent::Reevaluate, today).status()
        })
    }

    pub fn set_notes(&mut self, key: &str, notes: Option<String>) -> Result<()> {
        self.edit(key, |invoice| invoice.notes = notes)
    }

    /// Appends a line item and recomputes subtotal, total and balance.
    pub fn add_item(&mut self, key: &str, item: LineItem, today: NaiveDate) -> Result<()> {
        self.edit(key, |invoice| {
            invoice.items.push(item);
            invoice.recalculate_totals();
            status::apply(invoice, StatusEvent::Reevaluate, today);
        })
    }

    /// Moves a SENT invoice into payment tracking.
    pub fn confirm(&mut self, key: &str, today: NaiveDate) -> Result<InvoiceStatus> {
        match self.edit(key, |invoice| status::confirm_invoice(invoice, today))? {
            Transition::Applied { to, .. } => {
                info!("Invoice {} confirmed as {}", key, to);
                Ok(to)
            }
            Transition::Rejected { reason, .. } => Err(ComputeError::ConfirmationRejected {
                key: key.to_string(),
                reason: reason.to_string(),
            }),
        }
    }

    /// Re-evaluates every invoice for `today` and returns the ones whose
    /// status changed as `(number, old, new)`.
    pub fn refresh_statuses(
        &mut self,
        today: NaiveDate,
    ) -> Vec<(String, InvoiceStatus, InvoiceStatus)> {
        let mut changed = Vec::new();
        for invoice in self.invoices.values_mut() {
            if let Transition::Applied { from, to } =
                status::apply(invoice, StatusEvent::Reevaluate, today)
            {
                if from != to {
                    changed.push((invoice.invoice_number.clone(), from, to));
                }
            }
        }
        for (key, _, _) in &changed {
            self.tracker.mark_dirty(key);
        }
        changed
    }

    /// Copies of every dirty invoice, new ones first.
    pub fn dirty_snapshot(&self) -> Vec<Invoice> {
        self.tracker
            .dirty_keys()
            .iter()
            .filter_map(|key| self.invoices.get(key))
            .cloned()
            .collect()
    }

    /// Folds the outcome of a save pass over `saved` back into the session.
    ///
    /// Saved invoices get their surrogate key and stop being dirty, unless
    /// they were edited again while the pass ran; those stay dirty as plain
    /// modifications. Failed and skipped invoices stay dirty.
    pub fn apply_report(&mut self, saved: &[Invoice], report: &SaveReport) {
        let snapshots: BTreeMap<&str, &Invoice> = saved
            .iter()
            .map(|invoice| (invoice.invoice_number.as_str(), invoice))
            .collect();

        let mut clean = Vec::new();
        let mut edited = Vec::new();
        for entity in &report.succeeded {
            let Some(current) = self.invoices.get_mut(&entity.key) else {
                continue;
            };
            current.invoice_id = Some(entity.id);

            let unchanged = snapshots
                .get(entity.key.as_str())
                .is_some_and(|snapshot| same_content(snapshot, current));
            if unchanged {
                clean.push(entity.key.clone());
            } else {
                edited.push(entity.key.clone());
            }
        }

        self.tracker.remove(clean.iter().map(String::as_str));
        for key in &edited {
            debug!("Invoice {} changed during save, keeping it dirty", key);
            self.tracker.remove([key.as_str()]);
            self.tracker.mark_dirty(key);
        }

        for failure in &report.failed {
            warn!("Invoice {} not saved: {}", failure.key, failure.reason);
        }
    }

    /// Removes an invoice from the session and, if persisted, from `store`.
    #[instrument(skip(self, store))]
    pub async fn delete<S>(&mut self, store: &S, key: &str) -> Result<bool>
    where
        S: Store<Invoice> + ?Sized,
    {
        let invoice = self.get(key)?;
        if let Some(id) = invoice.invoice_id {
            if !store.delete(id).await? {
                warn!("Invoice {} (ID {}) was already gone from the store", key, id);
            }
        }
        self.invoices.remove(key);
        self.tracker.forget(key);
        info!("Invoice {} deleted", key);
        Ok(true)
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.tracker.has_unsaved_changes()
    }

    pub fn is_dirty(&self, key: &str) -> bool {
        self.tracker.is_dirty(key)
    }

    /// Receives `true` whenever the session gains unsaved changes and
    /// `false` once they are all saved.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tracker.subscribe()
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    fn get(&self, key: &str) -> Result<&Invoice> {
        self.invoices
            .get(key)
            .ok_or_else(|| ComputeError::UnknownEntity(key.to_string()))
    }

    /// Runs `f` on the invoice and marks it dirty if anything changed.
    fn edit<R>(&mut self, key: &str, f: impl FnOnce(&mut Invoice) -> R) -> Result<R> {
        let invoice = self
            .invoices
            .get_mut(key)
            .ok_or_else(|| ComputeError::UnknownEntity(key.to_string()))?;
        let before = invoice.clone();
        let result = f(invoice);
        if *invoice != before {
            if let Some(operator) = &self.operator {
                invoice.last_modified_by = Some(operator.clone());
            }
            self.tracker.mark_dirty(key);
        }
        Ok(result)
    }
}

/// Equality ignoring the surrogate key, which the store assigns.
fn same_content(a: &Invoice, b: &Invoice) -> bool {
    Invoice {
        invoice_id: None,
        ..a.clone()
    } == Invoice {
        invoice_id: None,
        ..b.clone()
    }
}
