use anyhow::{Context as _, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use tracing::{debug, error, info, trace};

/// Applies every pending migration to the database at `database_url`.
pub async fn init_database(database_url: &str) -> Result<()> {
    trace!("Entering init_database function");
    info!("Initializing database");
    debug!("Database URL: {}", database_url);

    let db = Database::connect(database_url)
        .await
        .with_context(|| format!("Failed to connect to database '{}'", database_url))?;
    info!("Successfully connected to database");

    let pending = Migrator::get_pending_migrations(&db).await?;
    if pending.is_empty() {
        info!("Schema is up to date, nothing to apply");
        println!("Database already initialized");
        return Ok(());
    }
    for step in &pending {
        debug!("Pending migration: {}", step.name());
    }

    if let Err(e) = Migrator::up(&db, None).await {
        error!("Failed to run database migrations: {}", e);
        return Err(e.into());
    }

    info!("Applied {} migration(s)", pending.len());
    println!("Database initialized ({} migration(s) applied)", pending.len());
    Ok(())
}
