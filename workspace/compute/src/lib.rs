pub mod customer;
pub mod error;
pub mod quotation;
pub mod reconcile;
pub mod session;
pub mod status;
pub mod store;
pub mod tracker;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use reconcile::{DEFAULT_SAVE_TIMEOUT, Reconciler};

/// Returns the reconciler used by the application for `store`.
///
/// `timeout` bounds a whole save pass; `None` keeps the default of one minute.
pub fn default_reconciler<S: ?Sized>(store: Arc<S>, timeout: Option<Duration>) -> Reconciler<S> {
    Reconciler::new(store).with_timeout(timeout.unwrap_or(DEFAULT_SAVE_TIMEOUT))
}
