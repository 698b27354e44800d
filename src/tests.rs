#[cfg(test)]
mod integration_tests {
    use chrono::Duration;
    use compute::store::{DatabaseStore, Store};
    use model::customer::Customer;
    use model::entities::invoice::InvoiceStatus;
    use model::entities::quotation::QuotationStatus;
    use model::entities::tax_jurisdiction::JurisdictionType;
    use model::invoice::Invoice;
    use model::quotation::Quotation;
    use rust_decimal::Decimal;
    use sea_orm::DatabaseConnection;

    use crate::cli::commands::{
        CustomerCommand, InvoiceCommand, QuotationCommand, TaxCommand, customer, invoice,
        quotation, tax,
    };
    use crate::cli::context::Context;
    use crate::test_utils::test_utils::{setup_test_context, test_config, test_today};

    async fn add_customer(ctx: &Context, code: &str) {
        customer::run(
            ctx,
            CustomerCommand::Add {
                code: code.to_string(),
                name: format!("{} Corp", code),
                email: Some(format!("ap@{}.test", code.to_lowercase())),
                contact: None,
                phone: None,
                terms: Some("NET_30".to_string()),
                credit_limit: None,
            },
        )
        .await
        .expect("Failed to add customer");
    }

    async fn create_invoice(ctx: &Context, number: &str, due_in_days: i64, total: i64) {
        invoice::run(
            ctx,
            InvoiceCommand::Create {
                number: number.to_string(),
                customer: "ACME".to_string(),
                due: Some(test_today() + Duration::days(due_in_days)),
                date: Some(test_today() - Duration::days(10)),
                total: Some(Decimal::new(total, 0)),
                currency: None,
            },
        )
        .await
        .expect("Failed to create invoice");
    }

    async fn stored_invoice(db: &DatabaseConnection, number: &str) -> Invoice {
        let store = DatabaseStore::new(db.clone());
        Store::<Invoice>::find_by_business_key(&store, number)
            .await
            .unwrap()
            .expect("Invoice not stored")
    }

    #[tokio::test]
    async fn test_confirm_and_pay_flow() {
        let test = setup_test_context().await;
        let (ctx, db) = (&test.ctx, &test.db);
        add_customer(ctx, "ACME").await;
        create_invoice(ctx, "INV-001", 1, 100).await;

        let created = stored_invoice(db, "INV-001").await;
        assert_eq!(created.status, InvoiceStatus::Draft);
        assert_eq!(created.created_by.as_deref(), Some("tester"));

        invoice::run(
            ctx,
            InvoiceCommand::SetStatus {
                number: "INV-001".to_string(),
                status: InvoiceStatus::Sent,
            },
        )
        .await
        .unwrap();
        invoice::run(
            ctx,
            InvoiceCommand::Confirm {
                number: "INV-001".to_string(),
            },
        )
        .await
        .unwrap();

        let confirmed = stored_invoice(db, "INV-001").await;
        assert_eq!(confirmed.status, InvoiceStatus::Unpaid);
        assert_eq!(confirmed.balance_amount, Decimal::new(100, 0));
        assert_eq!(confirmed.invoice_id, created.invoice_id);

        // Overpaying clamps to the total.
        invoice::run(
            ctx,
            InvoiceCommand::Pay {
                number: "INV-001".to_string(),
                amount: Decimal::new(150, 0),
            },
        )
        .await
        .unwrap();

        let paid = stored_invoice(db, "INV-001").await;
        assert_eq!(paid.status, InvoiceStatus::Paid);
        assert_eq!(paid.paid_amount, Decimal::new(100, 0));
        assert_eq!(paid.balance_amount, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_confirm_rejected_for_draft() {
        let test = setup_test_context().await;
        let (ctx, db) = (&test.ctx, &test.db);
        add_customer(ctx, "ACME").await;
        create_invoice(ctx, "INV-002", 5, 40).await;

        let result = invoice::run(
            ctx,
            InvoiceCommand::Confirm {
                number: "INV-002".to_string(),
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(
            stored_invoice(db, "INV-002").await.status,
            InvoiceStatus::Draft
        );
    }

    #[tokio::test]
    async fn test_refresh_marks_past_due_invoices_overdue() {
        let mut test = setup_test_context().await;
        add_customer(&test.ctx, "ACME").await;
        create_invoice(&test.ctx, "INV-003", 2, 75).await;
        assert_eq!(
            stored_invoice(&test.db, "INV-003").await.status,
            InvoiceStatus::Draft
        );

        test.ctx.today = test_today() + Duration::days(3);
        invoice::run(&test.ctx, InvoiceCommand::Refresh).await.unwrap();

        let refreshed = stored_invoice(&test.db, "INV-003").await;
        assert_eq!(refreshed.status, InvoiceStatus::Overdue);
        assert_eq!(refreshed.balance_amount, Decimal::new(75, 0));
    }

    #[tokio::test]
    async fn test_referenced_customer_cannot_be_deleted() {
        let test = setup_test_context().await;
        let (ctx, db) = (&test.ctx, &test.db);
        add_customer(ctx, "ACME").await;
        create_invoice(ctx, "INV-004", 5, 10).await;

        let result = customer::run(
            ctx,
            CustomerCommand::Delete {
                code: "ACME".to_string(),
            },
        )
        .await;
        assert!(result.is_err());

        invoice::run(
            ctx,
            InvoiceCommand::Delete {
                number: "INV-004".to_string(),
            },
        )
        .await
        .unwrap();
        customer::run(
            ctx,
            CustomerCommand::Delete {
                code: "ACME".to_string(),
            },
        )
        .await
        .unwrap();

        let store = DatabaseStore::new(db.clone());
        assert!(Store::<Customer>::list_all(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quotation_converts_once() {
        let test = setup_test_context().await;
        let (ctx, db) = (&test.ctx, &test.db);
        add_customer(ctx, "ACME").await;
        quotation::run(
            ctx,
            QuotationCommand::Create {
                number: "Q-001".to_string(),
                customer: "ACME".to_string(),
                valid_until: test_today() + Duration::days(10),
                total: Decimal::new(500, 0),
                description: "Migration project".to_string(),
                currency: None,
            },
        )
        .await
        .unwrap();

        let convert = || QuotationCommand::Convert {
            quotation_number: "Q-001".to_string(),
            invoice_number: "INV-100".to_string(),
        };
        quotation::run(ctx, convert()).await.unwrap();

        let invoice = stored_invoice(db, "INV-100").await;
        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert_eq!(invoice.total_amount, Decimal::new(500, 0));
        assert_eq!(invoice.due_date, test_today() + Duration::days(30));
        assert_eq!(invoice.items.len(), 1);

        let store = DatabaseStore::new(db.clone());
        let quoted = Store::<Quotation>::find_by_business_key(&store, "Q-001")
            .await
            .unwrap()
            .unwrap();
        assert!(quoted.converted_to_invoice);
        assert_eq!(quoted.converted_invoice_number.as_deref(), Some("INV-100"));

        assert!(quotation::run(ctx, convert()).await.is_err());
    }

    #[tokio::test]
    async fn test_quotation_number_cannot_be_reused() {
        let test = setup_test_context().await;
        let (ctx, db) = (&test.ctx, &test.db);
        add_customer(ctx, "ACME").await;

        let create = |total: i64, description: &str| QuotationCommand::Create {
            number: "Q-001".to_string(),
            customer: "ACME".to_string(),
            valid_until: test_today() + Duration::days(10),
            total: Decimal::new(total, 0),
            description: description.to_string(),
            currency: None,
        };
        quotation::run(ctx, create(500, "Original")).await.unwrap();
        quotation::run(
            ctx,
            QuotationCommand::Convert {
                quotation_number: "Q-001".to_string(),
                invoice_number: "INV-100".to_string(),
            },
        )
        .await
        .unwrap();

        let result = quotation::run(ctx, create(1, "Replacement")).await;
        assert!(result.is_err());

        let store = DatabaseStore::new(db.clone());
        let stored = Store::<Quotation>::find_by_business_key(&store, "Q-001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, QuotationStatus::Accepted);
        assert_eq!(stored.total_amount, Decimal::new(500, 0));
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.items[0].description, "Original");
        assert!(stored.converted_to_invoice);
    }

    #[tokio::test]
    async fn test_tax_calculation() {
        let test = setup_test_context().await;
        let ctx = &test.ctx;
        tax::run(
            ctx,
            TaxCommand::Add {
                name: "State".to_string(),
                kind: JurisdictionType::State,
                rate: Decimal::new(600, 2),
                effective: Some(test_today() - Duration::days(30)),
                expires: None,
                description: None,
            },
        )
        .await
        .unwrap();

        tax::run(
            ctx,
            TaxCommand::Calc {
                amount: Decimal::new(100, 0),
                on: None,
            },
        )
        .await
        .unwrap();

        let bad_rate = tax::run(
            ctx,
            TaxCommand::Add {
                name: "Broken".to_string(),
                kind: JurisdictionType::City,
                rate: Decimal::new(-1, 0),
                effective: None,
                expires: None,
                description: None,
            },
        )
        .await;
        assert!(bad_rate.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_database_falls_back_to_read_only() {
        let mut config = test_config();
        config.database_url = "sqlite:///nonexistent-billbook-dir/billbook.db".to_string();

        let ctx = &Context::connect(config, true).await;
        assert!(ctx.read_only);

        invoice::run(ctx, InvoiceCommand::List).await.unwrap();

        let result = tax::run(
            ctx,
            TaxCommand::Add {
                name: "Federal".to_string(),
                kind: JurisdictionType::Federal,
                rate: Decimal::ONE,
                effective: None,
                expires: None,
                description: None,
            },
        )
        .await;
        assert!(result.is_err());
    }
}
