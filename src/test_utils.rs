#[cfg(test)]
pub mod test_utils {
    use chrono::NaiveDate;
    use compute::store::DatabaseStore;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{Database, DatabaseConnection};
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    use crate::cli::context::Context;
    use crate::config::AppConfig;

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    pub fn test_config() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".to_string(),
            save_timeout_secs: 10,
            default_currency: "USD".to_string(),
            log_filter: "warn".to_string(),
            operator: "tester".to_string(),
        }
    }

    pub fn test_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    /// A context over a fresh database, in JSON mode, with a fixed "today".
    pub struct TestContext {
        pub ctx: Context,
        pub db: DatabaseConnection,
        _tracing: tracing::subscriber::DefaultGuard,
    }

    pub async fn setup_test_context() -> TestContext {
        let tracing = init_test_tracing();
        let db = setup_test_db().await;
        let mut ctx = Context::from_store(test_config(), true, DatabaseStore::new(db.clone()));
        ctx.today = test_today();
        TestContext {
            ctx,
            db,
            _tracing: tracing,
        }
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The log level is determined by the RUST_LOG environment variable,
    /// defaulting to WARN if not set.
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
}
