use std::sync::Arc;

use anyhow::{Result, bail};
use chrono::{NaiveDate, Utc};
use common::{SaveReport, format_amount};
use compute::default_reconciler;
use compute::reconcile::Reconciler;
use compute::session::InvoiceSession;
use compute::store::{DatabaseStore, Keyed, MemoryStore, Store};
use model::customer::Customer;
use model::invoice::{AmountChange, Invoice};
use model::quotation::Quotation;
use model::tax::TaxJurisdiction;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::AppConfig;

/// Everything a command needs: configuration, stores and output mode.
pub struct Context {
    pub config: AppConfig,
    pub json: bool,
    pub today: NaiveDate,
    pub read_only: bool,
    pub invoices: Arc<dyn Store<Invoice>>,
    pub customers: Arc<dyn Store<Customer>>,
    pub quotations: Arc<dyn Store<Quotation>>,
    pub taxes: Arc<dyn Store<TaxJurisdiction>>,
}

impl Context {
    /// Connects to the configured database. When that fails the context
    /// falls back to empty read-only stores so read commands still run.
    pub async fn connect(config: AppConfig, json: bool) -> Self {
        match DatabaseStore::connect(&config.database_url).await {
            Ok(store) => Self::from_store(config, json, store),
            Err(e) => {
                warn!(
                    "Database unavailable ({}); continuing read-only with no data",
                    e
                );
                Self::read_only(config, json)
            }
        }
    }

    pub fn from_store(config: AppConfig, json: bool, store: DatabaseStore) -> Self {
        let store = Arc::new(store.with_operator(config.operator.clone()));
        Self {
            config,
            json,
            today: Utc::now().date_naive(),
            read_only: false,
            invoices: store.clone(),
            customers: store.clone(),
            quotations: store.clone(),
            taxes: store,
        }
    }

    pub fn read_only(config: AppConfig, json: bool) -> Self {
        Self {
            config,
            json,
            today: Utc::now().date_naive(),
            read_only: true,
            invoices: Arc::new(MemoryStore::read_only()),
            customers: Arc::new(MemoryStore::read_only()),
            quotations: Arc::new(MemoryStore::read_only()),
            taxes: Arc::new(MemoryStore::read_only()),
        }
    }

    pub fn reconciler<T: Keyed>(&self, store: &Arc<dyn Store<T>>) -> Reconciler<dyn Store<T>> {
        default_reconciler(Arc::clone(store), Some(self.config.save_timeout()))
    }

    pub async fn load_session(&self) -> Result<InvoiceSession> {
        let session = InvoiceSession::load(self.invoices.as_ref(), self.today)
            .await?
            .with_operator(self.config.operator.clone());
        Ok(session)
    }

    pub async fn find_customer(&self, code: &str) -> Result<Customer> {
        match self.customers.find_by_business_key(code).await? {
            Some(customer) => Ok(customer),
            None => bail!("Customer '{}' not found", code),
        }
    }

    pub async fn find_customer_by_id(&self, id: i32) -> Result<Customer> {
        match self.customers.find_by_id(id).await? {
            Some(customer) => Ok(customer),
            None => bail!("Customer with ID {} not found", id),
        }
    }

    /// Saves the session's dirty invoices on a background task, printing
    /// progress as it arrives. Ctrl-C cancels the remaining entities.
    pub async fn save_session(&self, session: &mut InvoiceSession) -> Result<SaveReport> {
        let snapshot = session.dirty_snapshot();
        if snapshot.is_empty() {
            debug!("No unsaved invoices");
            return Ok(SaveReport::default());
        }

        let reconciler = self.reconciler(&self.invoices);
        let report = self.run_save(&reconciler, snapshot.clone()).await?;
        session.apply_report(&snapshot, &report);
        self.finish(report)
    }

    /// Saves standalone entities (customers, quotations) the same way.
    pub async fn save_entities<T: Keyed>(
        &self,
        store: &Arc<dyn Store<T>>,
        entities: Vec<T>,
    ) -> Result<SaveReport> {
        let reconciler = self.reconciler(store);
        let report = self.run_save(&reconciler, entities).await?;
        self.finish(report)
    }

    async fn run_save<T: Keyed>(
        &self,
        reconciler: &Reconciler<dyn Store<T>>,
        entities: Vec<T>,
    ) -> Result<SaveReport> {
        if self.read_only {
            warn!("Store is read-only; nothing will be saved");
        }
        let mut task = reconciler.spawn(entities);
        let mut interrupted = false;

        loop {
            tokio::select! {
                progress = task.next_progress() => match progress {
                    Some(progress) if !self.json => {
                        println!(
                            "[{}/{}] {} {:?}",
                            progress.index + 1,
                            progress.total,
                            progress.key,
                            progress.outcome
                        );
                    }
                    Some(_) => {}
                    None => break,
                },
                _ = tokio::signal::ctrl_c(), if !interrupted => {
                    warn!("Interrupted, cancelling save");
                    interrupted = true;
                    task.cancel();
                }
            }
        }

        Ok(task.join().await?)
    }

    fn finish(&self, report: SaveReport) -> Result<SaveReport> {
        self.emit(&report, || {
            println!(
                "Saved {}, failed {}, skipped {}",
                report.succeeded.len(),
                report.failed.len(),
                report.skipped.len()
            );
            for failure in &report.failed {
                println!("  {}: {}", failure.key, failure.reason);
            }
        })?;
        if report.is_complete() {
            info!("Save pass complete");
            Ok(report)
        } else {
            bail!(
                "{} record(s) were not saved and remain pending",
                report.failed.len() + report.skipped.len()
            )
        }
    }

    /// Prints `value` as JSON in `--json` mode, otherwise runs `human`.
    pub fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce()) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human();
        }
        Ok(())
    }

    pub fn report_amount_change(&self, change: &AmountChange, currency: &str) {
        if let Some(warning) = &change.warning {
            eprintln!("warning: {}", warning);
        } else if change.substituted {
            eprintln!(
                "warning: requested {} but {} was applied",
                format_amount(change.requested, currency),
                format_amount(change.applied, currency)
            );
        }
    }
}
