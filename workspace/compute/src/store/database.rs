use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use model::customer::Customer;
use model::entities::{customer, invoice, invoice_item, quotation, quotation_item, tax_jurisdiction};
use model::invoice::Invoice;
use model::quotation::Quotation;
use model::tax::TaxJurisdiction;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, error, info, instrument, trace, warn};

use super::Store;
use crate::error::{StoreError, StoreResult};

/// SeaORM-backed [`Store`] for every billing entity.
///
/// Invoice and quotation writes touch the header row and the item rows, so
/// each insert/update runs in its own database transaction.
#[derive(Clone, Debug)]
pub struct DatabaseStore {
    db: DatabaseConnection,
    operator: Option<String>,
}

impl DatabaseStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db, operator: None }
    }

    /// Name recorded in `created_by` / `last_modified_by` on writes.
    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    /// Opens a connection to `database_url`.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        trace!("Connecting to database");
        let db = Database::connect(database_url).await.map_err(|e| {
            error!("Failed to connect to database '{}': {}", database_url, e);
            StoreError::Unavailable(e.to_string())
        })?;
        info!("Successfully connected to database");
        Ok(Self::new(db))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    fn now() -> NaiveDateTime {
        Utc::now().naive_utc()
    }

    fn stamp_invoice(&self, model: &mut invoice::ActiveModel, inserting: bool) {
        if let Some(operator) = &self.operator {
            if inserting {
                model.created_by = Set(Some(operator.clone()));
            }
            model.last_modified_by = Set(Some(operator.clone()));
        }
    }

    fn stamp_quotation(&self, model: &mut quotation::ActiveModel, inserting: bool) {
        if let Some(operator) = &self.operator {
            if inserting {
                model.created_by = Set(Some(operator.clone()));
            }
            model.last_modified_by = Set(Some(operator.clone()));
        }
    }

    async fn replace_invoice_items<C: ConnectionTrait>(
        conn: &C,
        invoice_id: i32,
        invoice: &Invoice,
    ) -> StoreResult<()> {
        invoice_item::Entity::delete_many()
            .filter(invoice_item::Column::InvoiceId.eq(invoice_id))
            .exec(conn)
            .await?;
        if !invoice.items.is_empty() {
            invoice_item::Entity::insert_many(
                invoice.items.iter().map(|item| item.to_invoice_item(invoice_id)),
            )
            .exec(conn)
            .await?;
        }
        Ok(())
    }

    async fn replace_quotation_items<C: ConnectionTrait>(
        conn: &C,
        quotation_id: i32,
        quotation: &Quotation,
    ) -> StoreResult<()> {
        quotation_item::Entity::delete_many()
            .filter(quotation_item::Column::QuotationId.eq(quotation_id))
            .exec(conn)
            .await?;
        if !quotation.items.is_empty() {
            quotation_item::Entity::insert_many(
                quotation
                    .items
                    .iter()
                    .map(|item| item.to_quotation_item(quotation_id)),
            )
            .exec(conn)
            .await?;
        }
        Ok(())
    }
}

fn require_id(id: Option<i32>, key: &str) -> StoreResult<i32> {
    id.ok_or_else(|| StoreError::NotFound(format!("{} has no surrogate key", key)))
}

#[async_trait]
impl Store<Invoice> for DatabaseStore {
    #[instrument(skip(self))]
    async fn find_by_business_key(&self, key: &str) -> StoreResult<Option<Invoice>> {
        let Some(header) = invoice::Entity::find()
            .filter(invoice::Column::InvoiceNumber.eq(key))
            .one(&self.db)
            .await?
        else {
            debug!("Invoice {} not found", key);
            return Ok(None);
        };
        let items = header.find_related(invoice_item::Entity).all(&self.db).await?;
        Ok(Some(Invoice::from_model(header, items)))
    }

    #[instrument(skip(self, entity), fields(key = %entity.invoice_number))]
    async fn insert(&self, entity: &Invoice) -> StoreResult<i32> {
        let mut header = entity.to_active_model(Self::now());
        header.invoice_id = NotSet;
        self.stamp_invoice(&mut header, true);

        let txn = self.db.begin().await?;
        let inserted = header.insert(&txn).await?;
        Self::replace_invoice_items(&txn, inserted.invoice_id, entity).await?;
        txn.commit().await?;

        info!(
            "Invoice {} inserted with ID {}",
            entity.invoice_number, inserted.invoice_id
        );
        Ok(inserted.invoice_id)
    }

    #[instrument(skip(self, entity), fields(key = %entity.invoice_number))]
    async fn update(&self, entity: &Invoice) -> StoreResult<u64> {
        let id = require_id(entity.invoice_id, &entity.invoice_number)?;
        let mut header = entity.to_active_model(Self::now());
        header.created_date = NotSet;
        header.created_by = NotSet;
        self.stamp_invoice(&mut header, false);

        let txn = self.db.begin().await?;
        let result = invoice::Entity::update_many()
            .set(header)
            .filter(invoice::Column::InvoiceId.eq(id))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            warn!("Invoice {} (ID {}) not updated: no such row", entity.invoice_number, id);
            txn.rollback().await?;
            return Ok(0);
        }
        Self::replace_invoice_items(&txn, id, entity).await?;
        txn.commit().await?;

        debug!("Invoice {} updated", entity.invoice_number);
        Ok(result.rows_affected)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> StoreResult<bool> {
        let txn = self.db.begin().await?;
        invoice_item::Entity::delete_many()
            .filter(invoice_item::Column::InvoiceId.eq(id))
            .exec(&txn)
            .await?;
        let result = invoice::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> StoreResult<Vec<Invoice>> {
        let rows = invoice::Entity::find()
            .order_by_asc(invoice::Column::InvoiceNumber)
            .find_with_related(invoice_item::Entity)
            .all(&self.db)
            .await?;
        debug!("Loaded {} invoices", rows.len());
        Ok(rows
            .into_iter()
            .map(|(header, items)| Invoice::from_model(header, items))
            .collect())
    }
}

#[async_trait]
impl Store<Quotation> for DatabaseStore {
    #[instrument(skip(self))]
    async fn find_by_business_key(&self, key: &str) -> StoreResult<Option<Quotation>> {
        let Some(header) = quotation::Entity::find()
            .filter(quotation::Column::QuotationNumber.eq(key))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };
        let items = header
            .find_related(quotation_item::Entity)
            .all(&self.db)
            .await?;
        Ok(Some(Quotation::from_model(header, items)))
    }

    #[instrument(skip(self, entity), fields(key = %entity.quotation_number))]
    async fn insert(&self, entity: &Quotation) -> StoreResult<i32> {
        let mut header = entity.to_active_model(Self::now());
        header.quotation_id = NotSet;
        self.stamp_quotation(&mut header, true);

        let txn = self.db.begin().await?;
        let inserted = header.insert(&txn).await?;
        Self::replace_quotation_items(&txn, inserted.quotation_id, entity).await?;
        txn.commit().await?;
        Ok(inserted.quotation_id)
    }

    #[instrument(skip(self, entity), fields(key = %entity.quotation_number))]
    async fn update(&self, entity: &Quotation) -> StoreResult<u64> {
        let id = require_id(entity.quotation_id, &entity.quotation_number)?;
        let mut header = entity.to_active_model(Self::now());
        header.created_date = NotSet;
        header.created_by = NotSet;
        self.stamp_quotation(&mut header, false);

        let txn = self.db.begin().await?;
        let result = quotation::Entity::update_many()
            .set(header)
            .filter(quotation::Column::QuotationId.eq(id))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(0);
        }
        Self::replace_quotation_items(&txn, id, entity).await?;
        txn.commit().await?;
        Ok(result.rows_affected)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> StoreResult<bool> {
        let txn = self.db.begin().await?;
        quotation_item::Entity::delete_many()
            .filter(quotation_item::Column::QuotationId.eq(id))
            .exec(&txn)
            .await?;
        let result = quotation::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> StoreResult<Vec<Quotation>> {
        let rows = quotation::Entity::find()
            .order_by_asc(quotation::Column::QuotationNumber)
            .find_with_related(quotation_item::Entity)
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(header, items)| Quotation::from_model(header, items))
            .collect())
    }
}

#[async_trait]
impl Store<Customer> for DatabaseStore {
    #[instrument(skip(self))]
    async fn find_by_business_key(&self, key: &str) -> StoreResult<Option<Customer>> {
        Ok(customer::Entity::find()
            .filter(customer::Column::CustomerCode.eq(key))
            .one(&self.db)
            .await?
            .map(Customer::from_model))
    }

    #[instrument(skip(self, entity), fields(key = %entity.customer_code))]
    async fn insert(&self, entity: &Customer) -> StoreResult<i32> {
        let mut model = entity.to_active_model(Self::now());
        model.customer_id = NotSet;
        let inserted = model.insert(&self.db).await?;
        info!(
            "Customer {} inserted with ID {}",
            inserted.customer_code, inserted.customer_id
        );
        Ok(inserted.customer_id)
    }

    #[instrument(skip(self, entity), fields(key = %entity.customer_code))]
    async fn update(&self, entity: &Customer) -> StoreResult<u64> {
        let id = require_id(entity.customer_id, &entity.customer_code)?;
        let mut model = entity.to_active_model(Self::now());
        model.created_date = NotSet;
        let result = customer::Entity::update_many()
            .set(model)
            .filter(customer::Column::CustomerId.eq(id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Customer>> {
        Ok(customer::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Customer::from_model))
    }

    /// Refuses to delete a customer that invoices or quotations still reference.
    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> StoreResult<bool> {
        let invoices = invoice::Entity::find()
            .filter(invoice::Column::CustomerId.eq(id))
            .count(&self.db)
            .await?;
        let quotations = quotation::Entity::find()
            .filter(quotation::Column::CustomerId.eq(id))
            .count(&self.db)
            .await?;
        if invoices + quotations > 0 {
            warn!(
                "Customer {} still has {} invoice(s) and {} quotation(s)",
                id, invoices, quotations
            );
            return Err(StoreError::Referenced(format!(
                "customer {} ({} invoice(s), {} quotation(s))",
                id, invoices, quotations
            )));
        }
        let result = customer::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> StoreResult<Vec<Customer>> {
        let rows = customer::Entity::find()
            .order_by_asc(customer::Column::CustomerCode)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Customer::from_model).collect())
    }
}

#[async_trait]
impl Store<TaxJurisdiction> for DatabaseStore {
    async fn find_by_business_key(&self, key: &str) -> StoreResult<Option<TaxJurisdiction>> {
        Ok(tax_jurisdiction::Entity::find()
            .filter(tax_jurisdiction::Column::JurisdictionName.eq(key))
            .one(&self.db)
            .await?
            .map(TaxJurisdiction::from_model))
    }

    async fn insert(&self, entity: &TaxJurisdiction) -> StoreResult<i32> {
        let mut model = entity.to_active_model();
        model.jurisdiction_id = NotSet;
        Ok(model.insert(&self.db).await?.jurisdiction_id)
    }

    async fn update(&self, entity: &TaxJurisdiction) -> StoreResult<u64> {
        let id = require_id(entity.jurisdiction_id, &entity.jurisdiction_name)?;
        let result = tax_jurisdiction::Entity::update_many()
            .set(entity.to_active_model())
            .filter(tax_jurisdiction::Column::JurisdictionId.eq(id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn delete(&self, id: i32) -> StoreResult<bool> {
        let result = tax_jurisdiction::Entity::delete_by_id(id)
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn list_all(&self) -> StoreResult<Vec<TaxJurisdiction>> {
        let rows = tax_jurisdiction::Entity::find()
            .order_by_asc(tax_jurisdiction::Column::JurisdictionName)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(TaxJurisdiction::from_model).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_customer, setup_test_db};
    use chrono::NaiveDate;
    use model::invoice::LineItem;
    use rust_decimal::Decimal;

    async fn store_with_customer() -> (DatabaseStore, i32) {
        let store = DatabaseStore::new(setup_test_db().await).with_operator("tester");
        let customer_id = store.insert(&sample_customer("ACME")).await.unwrap();
        (store, customer_id)
    }

    fn invoice(number: &str, customer_id: i32) -> Invoice {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let mut invoice = Invoice::new_draft(
            number,
            customer_id,
            date,
            date + chrono::Duration::days(30),
            "USD",
        );
        invoice
            .items
            .push(LineItem::new("Consulting", Decimal::new(4, 0), Decimal::new(2500, 2)));
        invoice.recalculate_totals();
        invoice.set_paid_amount(Decimal::new(2000, 2));
        invoice
    }

    #[tokio::test]
    async fn test_invoice_round_trip() {
        let (store, customer_id) = store_with_customer().await;
        let original = invoice("INV-001", customer_id);

        let id = store.insert(&original).await.unwrap();
        let found: Invoice = Store::<Invoice>::find_by_business_key(&store, "INV-001").await.unwrap().unwrap();

        assert_eq!(found.invoice_id, Some(id));
        assert_eq!(found.customer_id, original.customer_id);
        assert_eq!(found.due_date, original.due_date);
        assert_eq!(found.status, original.status);
        assert_eq!(found.total_amount, Decimal::new(10000, 2));
        assert_eq!(found.paid_amount, original.paid_amount);
        assert_eq!(found.balance_amount, Decimal::new(8000, 2));
        assert_eq!(found.items, original.items);
        assert_eq!(found.created_by.as_deref(), Some("tester"));
    }

    #[tokio::test]
    async fn test_duplicate_invoice_number_maps_to_duplicate() {
        let (store, customer_id) = store_with_customer().await;
        store.insert(&invoice("INV-001", customer_id)).await.unwrap();

        let err = store
            .insert(&invoice("INV-001", customer_id))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_update_replaces_items() {
        let (store, customer_id) = store_with_customer().await;
        let id = store.insert(&invoice("INV-001", customer_id)).await.unwrap();

        let mut edited: Invoice = Store::<Invoice>::find_by_business_key(&store, "INV-001").await.unwrap().unwrap();
        edited.items = vec![LineItem::new("Support", Decimal::ONE, Decimal::new(5000, 2))];
        edited.recalculate_totals();
        assert_eq!(store.update(&edited).await.unwrap(), 1);

        let found: Invoice = Store::<Invoice>::find_by_business_key(&store, "INV-001").await.unwrap().unwrap();
        assert_eq!(found.invoice_id, Some(id));
        assert_eq!(found.items.len(), 1);
        assert_eq!(found.total_amount, Decimal::new(5000, 2));
        assert_eq!(found.balance_amount, Decimal::new(3000, 2));
    }

    #[tokio::test]
    async fn test_update_of_missing_row_affects_nothing() {
        let (store, customer_id) = store_with_customer().await;
        let mut ghost = invoice("INV-404", customer_id);
        ghost.invoice_id = Some(404);
        assert_eq!(store.update(&ghost).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_referenced_customer_cannot_be_deleted() {
        let (store, customer_id) = store_with_customer().await;
        let invoice_id = store.insert(&invoice("INV-001", customer_id)).await.unwrap();

        let err = Store::<Customer>::delete(&store, customer_id)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Referenced(_)));

        assert!(Store::<Invoice>::delete(&store, invoice_id).await.unwrap());
        assert!(Store::<Customer>::delete(&store, customer_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_customer_by_id() {
        let (store, customer_id) = store_with_customer().await;

        let found = Store::<Customer>::find_by_id(&store, customer_id)
            .await
            .unwrap()
            .expect("Customer not found");
        assert_eq!(found.customer_id, Some(customer_id));

        let missing = Store::<Customer>::find_by_id(&store, customer_id + 1)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_list_all_orders_by_number() {
        let (store, customer_id) = store_with_customer().await;
        store.insert(&invoice("INV-002", customer_id)).await.unwrap();
        store.insert(&invoice("INV-001", customer_id)).await.unwrap();

        let all = Store::<Invoice>::list_all(&store).await.unwrap();
        let numbers: Vec<_> = all.iter().map(|i| i.invoice_number.as_str()).collect();
        assert_eq!(numbers, vec!["INV-001", "INV-002"]);
        assert!(all.iter().all(|i| i.items.len() == 1));
    }
}
