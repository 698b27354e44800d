//! Saving session changes back to a [`Store`].
//!
//! A pass walks the dirty entities in order and upserts each one by business
//! key. Every entity is its own error boundary: a failure is recorded in the
//! [`SaveReport`] and the pass moves on. A pass can be cancelled between
//! entities and is bounded by a single deadline.

use std::sync::Arc;
use std::time::Duration;

use common::{ItemOutcome, SaveFailure, SaveProgress, SaveReport, SavedEntity};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{ComputeError, Result, StoreError};
use crate::store::{Keyed, Store};

/// Time budget of a whole save pass.
pub const DEFAULT_SAVE_TIMEOUT: Duration = Duration::from_secs(60);

pub struct Reconciler<S: ?Sized> {
    store: Arc<S>,
    timeout: Duration,
}

impl<S: ?Sized> Clone for Reconciler<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            timeout: self.timeout,
        }
    }
}

impl<S: ?Sized> Reconciler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            timeout: DEFAULT_SAVE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Persists `entities` one by one.
    ///
    /// Existing records (found by business key) are updated in place keeping
    /// their surrogate key, others are inserted. An insert that collides with a
    /// concurrently created record falls back to an update.
    ///
    /// Progress for every attempted entity is sent on `progress` if given.
    /// When `cancel` fires the remaining entities are reported as skipped.
    /// When the deadline passes, the entity in flight and all remaining ones
    /// are reported as failed.
    #[instrument(skip_all, fields(kind = T::KIND, total = entities.len()))]
    pub async fn save_all<T>(
        &self,
        entities: &[T],
        progress: Option<&mpsc::UnboundedSender<SaveProgress>>,
        cancel: &CancellationToken,
    ) -> SaveReport
    where
        T: Keyed,
        S: Store<T>,
    {
        let deadline = Instant::now() + self.timeout;
        let total = entities.len();
        let mut report = SaveReport::default();

        for (index, entity) in entities.iter().enumerate() {
            let key = entity.business_key().to_string();

            if cancel.is_cancelled() {
                info!("Save cancelled, skipping {} remaining", total - index);
                report.cancelled = true;
                report
                    .skipped
                    .extend(entities[index..].iter().map(|e| e.business_key().to_string()));
                break;
            }

            let outcome = match tokio::time::timeout_at(deadline, self.persist_one(entity)).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(err)) => {
                    error!("Failed to save {} {}: {}", T::KIND, key, err);
                    ItemOutcome::Failed {
                        reason: err.to_string(),
                    }
                }
                Err(_) => {
                    warn!(
                        "Save pass timed out after {:?} at {} {}",
                        self.timeout,
                        T::KIND,
                        key
                    );
                    report.timed_out = true;
                    let reason = format!("timed out after {:?}", self.timeout);
                    for (offset, rest) in entities[index..].iter().enumerate() {
                        let failure = SaveFailure {
                            key: rest.business_key().to_string(),
                            reason: reason.clone(),
                        };
                        send_progress(
                            progress,
                            index + offset,
                            total,
                            &failure.key,
                            ItemOutcome::Failed {
                                reason: reason.clone(),
                            },
                        );
                        report.failed.push(failure);
                    }
                    break;
                }
            };

            match &outcome {
                ItemOutcome::Inserted { id }
                | ItemOutcome::Updated { id }
                | ItemOutcome::Unchanged { id } => report.succeeded.push(SavedEntity {
                    key: key.clone(),
                    id: *id,
                }),
                ItemOutcome::Failed { reason } => report.failed.push(SaveFailure {
                    key: key.clone(),
                    reason: reason.clone(),
                }),
            }
            send_progress(progress, index, total, &key, outcome);
        }

        info!(
            "Saved {}/{} {} record(s): {} failed, {} skipped",
            report.succeeded.len(),
            total,
            T::KIND,
            report.failed.len(),
            report.skipped.len()
        );
        report
    }

    async fn persist_one<T>(&self, entity: &T) -> std::result::Result<ItemOutcome, StoreError>
    where
        T: Keyed,
        S: Store<T>,
    {
        let key = entity.business_key();

        if let Some(persisted) = self.store.find_by_business_key(key).await? {
            return self.update_existing(entity, persisted).await;
        }

        match self.store.insert(entity).await {
            Ok(id) => {
                debug!("Inserted {} {} as {}", T::KIND, key, id);
                Ok(ItemOutcome::Inserted { id })
            }
            Err(StoreError::Duplicate(_)) => {
                warn!("{} {} appeared concurrently, updating instead", T::KIND, key);
                let persisted = self
                    .store
                    .find_by_business_key(key)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
                self.update_existing(entity, persisted).await
            }
            Err(err) => Err(err),
        }
    }

    async fn update_existing<T>(
        &self,
        entity: &T,
        persisted: T,
    ) -> std::result::Result<ItemOutcome, StoreError>
    where
        T: Keyed,
        S: Store<T>,
    {
        let id = persisted
            .surrogate_id()
            .ok_or_else(|| StoreError::NotFound(entity.business_key().to_string()))?;

        let merged = entity.merge_onto(persisted.clone());
        if merged == persisted {
            debug!("{} {} unchanged", T::KIND, entity.business_key());
            return Ok(ItemOutcome::Unchanged { id });
        }

        match self.store.update(&merged).await? {
            0 => Err(StoreError::NotFound(entity.business_key().to_string())),
            _ => Ok(ItemOutcome::Updated { id }),
        }
    }
}

fn send_progress(
    progress: Option<&mpsc::UnboundedSender<SaveProgress>>,
    index: usize,
    total: usize,
    key: &str,
    outcome: ItemOutcome,
) {
    if let Some(tx) = progress {
        // A dropped receiver only means nobody is watching.
        let _ = tx.send(SaveProgress {
            index,
            total,
            key: key.to_string(),
            outcome,
        });
    }
}

impl<S: ?Sized + Send + Sync + 'static> Reconciler<S> {
    /// Runs [`Reconciler::save_all`] on a background task.
    ///
    /// The caller keeps the session; it reads progress from the returned
    /// [`SaveTask`] and applies the final report on its own task.
    pub fn spawn<T>(&self, entities: Vec<T>) -> SaveTask
    where
        T: Keyed,
        S: Store<T>,
    {
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let this = self.clone();
        let token = cancel.clone();

        let handle = tokio::spawn(async move { this.save_all(&entities, Some(&tx), &token).await });

        SaveTask {
            cancel,
            progress: rx,
            handle,
        }
    }
}

/// Handle to a save pass running in the background.
pub struct SaveTask {
    cancel: CancellationToken,
    progress: mpsc::UnboundedReceiver<SaveProgress>,
    handle: JoinHandle<SaveReport>,
}

impl SaveTask {
    /// Asks the pass to stop before the next entity.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Next progress event, or `None` once the pass has finished.
    pub async fn next_progress(&mut self) -> Option<SaveProgress> {
        self.progress.recv().await
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the pass and returns its report.
    pub async fn join(self) -> Result<SaveReport> {
        self.handle
            .await
            .map_err(|e| ComputeError::Background(e.to_string()))
    }
}
