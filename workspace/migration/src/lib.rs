pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_billing_tables;
mod m20240201_000001_create_quotations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_billing_tables::Migration),
            Box::new(m20240201_000001_create_quotations::Migration),
        ]
    }
}
