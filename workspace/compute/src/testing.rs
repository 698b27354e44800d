//! Shared fixtures for the store-backed tests.

use migration::{Migrator, MigratorTrait};
use model::customer::Customer;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Create an in-memory SQLite database with the schema applied.
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    db.execute_unprepared("PRAGMA foreign_keys = ON;")
        .await
        .expect("Failed to enable foreign keys");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

pub fn sample_customer(code: &str) -> Customer {
    let mut customer = Customer::new(code, format!("{} Ltd.", code));
    customer.email = Some(format!("billing@{}.test", code.to_lowercase()));
    customer
}

/// Initialize tracing for tests with output to STDERR.
///
/// The level comes from `RUST_LOG` and defaults to WARN. Keep the guard alive
/// for the duration of the test.
pub fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|level| level.parse::<Level>().ok())
        .unwrap_or(Level::WARN);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_default(subscriber)
}
