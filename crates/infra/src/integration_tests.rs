//! Integration tests for the full orchestration pipeline:
//! use case -> repository -> event sink -> bus subscriber.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::Value as JsonValue;

use cobrado_billing::{FeeSchedule, PaymentMethod};
use cobrado_core::DomainError;
use cobrado_customers::{Address, Customer};
use cobrado_events::{EventBus, EventEnvelope, InMemoryEventBus};
use cobrado_invoicing::{Invoice, InvoiceStatus};
use cobrado_ledger::{TransactionStatus, TransactionType};
use cobrado_payments::PaymentStatus;
use cobrado_subscriptions::{BillingCycle, SubscriptionStatus};
use cobrado_tenants::Tenant;

use crate::event_sink::{BusSink, EventSink};
use crate::memory::{
    InMemoryCustomerRepository, InMemoryInvoiceRepository, InMemoryPaymentRepository,
    InMemorySubscriptionRepository, InMemoryTenantRepository, InMemoryTransactionRepository,
};
use crate::reconciliation::ReconcilePayments;
use crate::repository::{
    CustomerRepository, InvoiceRepository, PaymentRepository, SubscriptionRepository,
    TenantRepository, TransactionRepository,
};
use crate::use_cases::customers::{
    ActivateCustomer, CreateCustomer, CreateCustomerInput, DeactivateCustomer, DeleteCustomer,
    UpdateCustomer, UpdateCustomerInput,
};
use crate::use_cases::invoices::{
    AttachGatewayCharge, AttachGatewayChargeInput, CancelInvoice, CreateInvoice,
    CreateInvoiceInput, MarkOverdueInvoices,
};
use crate::use_cases::payments::{
    ConfirmPayment, ConfirmPaymentInput, CreatePayment, CreatePaymentInput, FailPayment,
    RefundPayment,
};
use crate::use_cases::subscriptions::{
    CancelSubscription, CreateSubscription, CreateSubscriptionInput, PauseSubscription,
    ResumeSubscription, RunBillingCycle, UpdateSubscriptionAmount,
};
use crate::use_cases::tenants::{
    ActivateTenant, CreateTenant, CreateTenantInput, DeactivateTenant, LinkGatewayAccount,
    UpdateTenant, UpdateTenantInput,
};
use crate::use_cases::transactions::{
    CompleteTransaction, CreateTransaction, CreateTransactionInput, FailTransaction,
    RecordPlatformFee,
};

struct World {
    tenants: Arc<InMemoryTenantRepository>,
    customers: Arc<InMemoryCustomerRepository>,
    subscriptions: Arc<InMemorySubscriptionRepository>,
    invoices: Arc<InMemoryInvoiceRepository>,
    payments: Arc<InMemoryPaymentRepository>,
    transactions: Arc<InMemoryTransactionRepository>,
    bus: Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>,
    events: Arc<dyn EventSink>,
}

fn world() -> World {
    cobrado_observability::init();

    let bus: Arc<InMemoryEventBus<EventEnvelope<JsonValue>>> = Arc::new(InMemoryEventBus::new());
    let events: Arc<dyn EventSink> = Arc::new(BusSink::new(bus.clone()));

    World {
        tenants: Arc::new(InMemoryTenantRepository::new()),
        customers: Arc::new(InMemoryCustomerRepository::new()),
        subscriptions: Arc::new(InMemorySubscriptionRepository::new()),
        invoices: Arc::new(InMemoryInvoiceRepository::new()),
        payments: Arc::new(InMemoryPaymentRepository::new()),
        transactions: Arc::new(InMemoryTransactionRepository::new()),
        bus,
        events,
    }
}

async fn seed_tenant(w: &World) -> Tenant {
    CreateTenant::new(w.tenants.clone(), w.events.clone())
        .execute(CreateTenantInput {
            email: "merchant@example.com".to_string(),
            name: "Acme Cobros".to_string(),
            phone: Some("+5511999990000".to_string()),
            document: Some("12345678000190".to_string()),
            business_type: Some("services".to_string()),
        })
        .await
        .unwrap()
}

async fn seed_customer(w: &World, tenant: &Tenant) -> Customer {
    CreateCustomer::new(w.customers.clone(), w.tenants.clone(), w.events.clone())
        .execute(CreateCustomerInput {
            tenant_id: tenant.id_typed(),
            name: "Maria Silva".to_string(),
            email: "maria@example.com".to_string(),
            phone: "+5511988887777".to_string(),
            document: Some("12345678901".to_string()),
        })
        .await
        .unwrap()
}

async fn seed_invoice(w: &World, tenant: &Tenant, customer: &Customer, amount: u64) -> Invoice {
    CreateInvoice::new(
        w.invoices.clone(),
        w.tenants.clone(),
        w.events.clone(),
        FeeSchedule::default(),
    )
    .execute(CreateInvoiceInput {
        tenant_id: tenant.id_typed(),
        customer_id: customer.id_typed(),
        subscription_id: None,
        amount,
        due_date: Utc::now() + Duration::days(7),
        payment_method: PaymentMethod::Pix,
        invoice_number: None,
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn full_billing_flow_settles_invoice_and_audits_fee() {
    let w = world();
    let subscriber = w.bus.subscribe();

    let tenant = seed_tenant(&w).await;
    let customer = seed_customer(&w, &tenant).await;

    // Subscription started long enough ago that a billing cycle is due.
    let subscription = CreateSubscription::new(
        w.subscriptions.clone(),
        w.customers.clone(),
        w.events.clone(),
    )
    .execute(CreateSubscriptionInput {
        tenant_id: tenant.id_typed(),
        customer_id: customer.id_typed(),
        description: Some("Gold plan".to_string()),
        amount: 10_000,
        billing_cycle: BillingCycle::Monthly,
        payment_method: PaymentMethod::Pix,
        start_date: Utc::now() - Duration::days(35),
    })
    .await
    .unwrap();

    let issued = RunBillingCycle::new(
        w.subscriptions.clone(),
        w.tenants.clone(),
        w.invoices.clone(),
        w.transactions.clone(),
        w.events.clone(),
        FeeSchedule::default(),
        Duration::days(5),
    )
    .execute(Utc::now())
    .await
    .unwrap();

    assert_eq!(issued.len(), 1);
    let invoice = &issued[0];
    assert_eq!(invoice.amount(), 10_000);
    assert_eq!(invoice.platform_fee(), 150);
    assert_eq!(invoice.gateway_fee(), 0);
    assert_eq!(invoice.tenant_receives(), 9_850);
    assert_eq!(invoice.subscription_id(), Some(subscription.id_typed()));

    // Platform fee audited as a completed ledger entry.
    let audit = w
        .transactions
        .find_by_invoice(invoice.id_typed())
        .await
        .unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].kind(), TransactionType::PlatformFee);
    assert!(audit[0].is_completed());
    assert_eq!(audit[0].amount(), 150);

    // Cycle advanced off the old anchor.
    let advanced = w
        .subscriptions
        .find_by_id(subscription.id_typed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        advanced.last_billing_date(),
        Some(subscription.next_billing_date())
    );

    // Pay the invoice.
    let payment = CreatePayment::new(w.payments.clone(), w.invoices.clone(), w.events.clone())
        .execute(CreatePaymentInput {
            invoice_id: invoice.id_typed(),
            tenant_id: tenant.id_typed(),
            customer_id: customer.id_typed(),
            amount: invoice.amount(),
            payment_method: PaymentMethod::Pix,
            payment_date: None,
            gateway_payment_id: Some("pay_1".to_string()),
        })
        .await
        .unwrap();

    ConfirmPayment::new(w.payments.clone(), w.invoices.clone(), w.events.clone())
        .execute(ConfirmPaymentInput {
            payment_id: payment.id_typed(),
            confirmed_at: None,
        })
        .await
        .unwrap();

    let settled = w
        .invoices
        .find_by_id(invoice.id_typed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(settled.status(), InvoiceStatus::Paid);
    assert!(settled.paid_date().is_some());

    let confirmed = w
        .payments
        .find_by_id(payment.id_typed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(confirmed.status(), PaymentStatus::Confirmed);

    // Every committed change reached the bus.
    let mut published = 0;
    while subscriber.try_recv().is_ok() {
        published += 1;
    }
    assert!(published >= 8, "expected a full event trail, got {published}");
}

#[tokio::test]
async fn create_customer_enforces_uniqueness_and_tenant_existence() {
    let w = world();
    let tenant = seed_tenant(&w).await;
    let _customer = seed_customer(&w, &tenant).await;

    let use_case = CreateCustomer::new(w.customers.clone(), w.tenants.clone(), w.events.clone());

    // Duplicate email.
    let err = use_case
        .execute(CreateCustomerInput {
            tenant_id: tenant.id_typed(),
            name: "Other Person".to_string(),
            email: "maria@example.com".to_string(),
            phone: "+5511911112222".to_string(),
            document: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    // Duplicate document.
    let err = use_case
        .execute(CreateCustomerInput {
            tenant_id: tenant.id_typed(),
            name: "Other Person".to_string(),
            email: "other@example.com".to_string(),
            phone: "+5511911112222".to_string(),
            document: Some("12345678901".to_string()),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    // Missing tenant.
    let err = use_case
        .execute(CreateCustomerInput {
            tenant_id: cobrado_core::TenantId::new(),
            name: "Other Person".to_string(),
            email: "third@example.com".to_string(),
            phone: "+5511911112222".to_string(),
            document: None,
        })
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn reconciliation_repairs_the_confirm_payment_window() {
    let w = world();
    let tenant = seed_tenant(&w).await;
    let customer = seed_customer(&w, &tenant).await;
    let invoice = seed_invoice(&w, &tenant, &customer, 10_000).await;

    let payment = CreatePayment::new(w.payments.clone(), w.invoices.clone(), w.events.clone())
        .execute(CreatePaymentInput {
            invoice_id: invoice.id_typed(),
            tenant_id: tenant.id_typed(),
            customer_id: customer.id_typed(),
            amount: 10_000,
            payment_method: PaymentMethod::Pix,
            payment_date: None,
            gateway_payment_id: None,
        })
        .await
        .unwrap();

    // Simulate the crash window: the payment write landed, the invoice
    // write never happened.
    let confirmed_at = Utc::now();
    let mut stranded = w
        .payments
        .find_by_id(payment.id_typed())
        .await
        .unwrap()
        .unwrap();
    stranded.confirm(confirmed_at).unwrap();
    w.payments.update(&stranded).await.unwrap();

    let pending = w
        .invoices
        .find_by_id(invoice.id_typed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pending.status(), InvoiceStatus::Pending);

    let reconciler =
        ReconcilePayments::new(w.payments.clone(), w.invoices.clone(), w.events.clone());

    let repaired = reconciler.execute().await.unwrap();
    assert_eq!(repaired, 1);

    let settled = w
        .invoices
        .find_by_id(invoice.id_typed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(settled.status(), InvoiceStatus::Paid);
    assert_eq!(settled.paid_date(), Some(confirmed_at));

    // Idempotent: nothing left to repair.
    assert_eq!(reconciler.execute().await.unwrap(), 0);
}

#[tokio::test]
async fn overdue_sweep_flags_pending_invoices_which_can_still_be_paid() {
    let w = world();
    let tenant = seed_tenant(&w).await;
    let customer = seed_customer(&w, &tenant).await;
    let invoice = seed_invoice(&w, &tenant, &customer, 20_000).await;

    let sweep = MarkOverdueInvoices::new(w.invoices.clone(), w.events.clone());

    // Not yet due: nothing flagged.
    assert!(sweep.execute(Utc::now()).await.unwrap().is_empty());

    let flagged = sweep
        .execute(Utc::now() + Duration::days(8))
        .await
        .unwrap();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].status(), InvoiceStatus::Overdue);

    // A late payment still settles the flagged invoice.
    let payment = CreatePayment::new(w.payments.clone(), w.invoices.clone(), w.events.clone())
        .execute(CreatePaymentInput {
            invoice_id: invoice.id_typed(),
            tenant_id: tenant.id_typed(),
            customer_id: customer.id_typed(),
            amount: 20_000,
            payment_method: PaymentMethod::Pix,
            payment_date: None,
            gateway_payment_id: None,
        })
        .await
        .unwrap();
    ConfirmPayment::new(w.payments.clone(), w.invoices.clone(), w.events.clone())
        .execute(ConfirmPaymentInput {
            payment_id: payment.id_typed(),
            confirmed_at: None,
        })
        .await
        .unwrap();

    let settled = w
        .invoices
        .find_by_id(invoice.id_typed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(settled.status(), InvoiceStatus::Paid);
}

#[tokio::test]
async fn tenant_profile_use_cases_cover_toggles_updates_and_linkage() {
    let w = world();
    let tenant = seed_tenant(&w).await;

    let deactivate = DeactivateTenant::new(w.tenants.clone(), w.events.clone());
    let once = deactivate.execute(tenant.id_typed()).await.unwrap();
    assert!(!once.is_active());
    let twice = deactivate.execute(tenant.id_typed()).await.unwrap();
    assert!(!twice.is_active());
    assert!(twice.updated_at() >= once.updated_at());

    let reactivated = ActivateTenant::new(w.tenants.clone(), w.events.clone())
        .execute(tenant.id_typed())
        .await
        .unwrap();
    assert!(reactivated.is_active());

    let updated = UpdateTenant::new(w.tenants.clone(), w.events.clone())
        .execute(UpdateTenantInput {
            tenant_id: tenant.id_typed(),
            name: Some("Acme Cobros LTDA".to_string()),
            phone: None,
            business_type: None,
        })
        .await
        .unwrap();
    assert_eq!(updated.name(), "Acme Cobros LTDA");

    let linked = LinkGatewayAccount::new(w.tenants.clone(), w.events.clone())
        .execute(
            tenant.id_typed(),
            "cus_123".to_string(),
            "wal_456".to_string(),
        )
        .await
        .unwrap();
    assert_eq!(linked.gateway_customer_id(), Some("cus_123"));
    assert_eq!(linked.gateway_wallet_id(), Some("wal_456"));
}

#[tokio::test]
async fn subscription_use_cases_cover_the_whole_lifecycle() {
    let w = world();
    let tenant = seed_tenant(&w).await;
    let customer = seed_customer(&w, &tenant).await;

    let subscription = CreateSubscription::new(
        w.subscriptions.clone(),
        w.customers.clone(),
        w.events.clone(),
    )
    .execute(CreateSubscriptionInput {
        tenant_id: tenant.id_typed(),
        customer_id: customer.id_typed(),
        description: None,
        amount: 5_000,
        billing_cycle: BillingCycle::Weekly,
        payment_method: PaymentMethod::Boleto,
        start_date: Utc::now(),
    })
    .await
    .unwrap();
    let id = subscription.id_typed();

    let paused = PauseSubscription::new(w.subscriptions.clone(), w.events.clone())
        .execute(id)
        .await
        .unwrap();
    assert_eq!(paused.status(), SubscriptionStatus::Paused);

    let resumed = ResumeSubscription::new(w.subscriptions.clone(), w.events.clone())
        .execute(id)
        .await
        .unwrap();
    assert_eq!(resumed.status(), SubscriptionStatus::Active);

    let repriced = UpdateSubscriptionAmount::new(w.subscriptions.clone(), w.events.clone())
        .execute(id, 7_500)
        .await
        .unwrap();
    assert_eq!(repriced.amount(), 7_500);

    let canceled = CancelSubscription::new(w.subscriptions.clone(), w.events.clone())
        .execute(id)
        .await
        .unwrap();
    assert_eq!(canceled.status(), SubscriptionStatus::Canceled);
    assert!(canceled.end_date().is_some());

    let err = PauseSubscription::new(w.subscriptions.clone(), w.events.clone())
        .execute(id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvariantViolation(_)));
}

#[tokio::test]
async fn payment_failure_and_refund_paths() {
    let w = world();
    let tenant = seed_tenant(&w).await;
    let customer = seed_customer(&w, &tenant).await;
    let invoice = seed_invoice(&w, &tenant, &customer, 10_000).await;

    let create = CreatePayment::new(w.payments.clone(), w.invoices.clone(), w.events.clone());
    let confirm = ConfirmPayment::new(w.payments.clone(), w.invoices.clone(), w.events.clone());

    // First attempt fails at the gateway; a failed payment cannot confirm.
    let attempt = create
        .execute(CreatePaymentInput {
            invoice_id: invoice.id_typed(),
            tenant_id: tenant.id_typed(),
            customer_id: customer.id_typed(),
            amount: 10_000,
            payment_method: PaymentMethod::CreditCard,
            payment_date: None,
            gateway_payment_id: None,
        })
        .await
        .unwrap();
    FailPayment::new(w.payments.clone(), w.events.clone())
        .execute(attempt.id_typed())
        .await
        .unwrap();
    let err = confirm
        .execute(ConfirmPaymentInput {
            payment_id: attempt.id_typed(),
            confirmed_at: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvariantViolation(_)));

    // Retry succeeds, then the charge is disputed and refunded.
    let retry = create
        .execute(CreatePaymentInput {
            invoice_id: invoice.id_typed(),
            tenant_id: tenant.id_typed(),
            customer_id: customer.id_typed(),
            amount: 10_000,
            payment_method: PaymentMethod::CreditCard,
            payment_date: None,
            gateway_payment_id: None,
        })
        .await
        .unwrap();
    confirm
        .execute(ConfirmPaymentInput {
            payment_id: retry.id_typed(),
            confirmed_at: None,
        })
        .await
        .unwrap();

    let refunded = RefundPayment::new(w.payments.clone(), w.events.clone())
        .execute(retry.id_typed())
        .await
        .unwrap();
    assert_eq!(refunded.status(), PaymentStatus::Refunded);

    // Refunding the failed attempt is rejected.
    let err = RefundPayment::new(w.payments.clone(), w.events.clone())
        .execute(attempt.id_typed())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvariantViolation(_)));
}

#[tokio::test]
async fn ledger_use_cases_record_complete_and_fail() {
    let w = world();
    let tenant = seed_tenant(&w).await;
    let customer = seed_customer(&w, &tenant).await;
    let invoice = seed_invoice(&w, &tenant, &customer, 10_000).await;

    // Platform fee audited from the persisted invoice.
    let fee = RecordPlatformFee::new(
        w.transactions.clone(),
        w.invoices.clone(),
        w.tenants.clone(),
        w.events.clone(),
    )
    .execute(invoice.id_typed())
    .await
    .unwrap();
    assert!(fee.is_completed());
    assert_eq!(fee.amount(), invoice.platform_fee());
    assert_eq!(fee.base_amount(), invoice.amount());

    // A manual adjustment goes through the pending phase.
    let adjustment = CreateTransaction::new(w.transactions.clone(), w.events.clone())
        .execute(CreateTransactionInput {
            tenant_id: tenant.id_typed(),
            invoice_id: invoice.id_typed(),
            kind: TransactionType::Adjustment,
            amount: 250,
            percentage_bps: 0,
            base_amount: 10_000,
        })
        .await
        .unwrap();
    assert_eq!(adjustment.status(), TransactionStatus::Pending);

    let completed = CompleteTransaction::new(w.transactions.clone(), w.events.clone())
        .execute(adjustment.id_typed(), None)
        .await
        .unwrap();
    assert!(completed.is_completed());

    let err = FailTransaction::new(w.transactions.clone(), w.events.clone())
        .execute(adjustment.id_typed())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvariantViolation(_)));
}

#[tokio::test]
async fn customer_update_deactivate_and_delete() {
    let w = world();
    let tenant = seed_tenant(&w).await;
    let customer = seed_customer(&w, &tenant).await;

    let update = UpdateCustomer::new(w.customers.clone(), w.events.clone());

    // Email without phone is rejected before any mutation.
    let err = update
        .execute(UpdateCustomerInput {
            customer_id: customer.id_typed(),
            email: Some("new@example.com".to_string()),
            phone: None,
            address: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let updated = update
        .execute(UpdateCustomerInput {
            customer_id: customer.id_typed(),
            email: Some("new@example.com".to_string()),
            phone: Some("+5511900001111".to_string()),
            address: Some(Address {
                street: "Rua das Flores".to_string(),
                number: "42".to_string(),
                city: "São Paulo".to_string(),
                state: "SP".to_string(),
                zip_code: "01000-000".to_string(),
                complement: None,
            }),
        })
        .await
        .unwrap();
    assert_eq!(updated.email(), "new@example.com");
    assert!(updated.address().is_some());

    let deactivated = DeactivateCustomer::new(w.customers.clone(), w.events.clone())
        .execute(customer.id_typed())
        .await
        .unwrap();
    assert!(!deactivated.is_active());

    let reactivated = ActivateCustomer::new(w.customers.clone(), w.events.clone())
        .execute(customer.id_typed())
        .await
        .unwrap();
    assert!(reactivated.is_active());

    DeleteCustomer::new(w.customers.clone())
        .execute(customer.id_typed())
        .await
        .unwrap();
    assert!(
        w.customers
            .find_by_id(customer.id_typed())
            .await
            .unwrap()
            .is_none()
    );

    // Deleting again is a not-found error.
    let err = DeleteCustomer::new(w.customers.clone())
        .execute(customer.id_typed())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn gateway_charge_attachment_and_invoice_cancellation() {
    let w = world();
    let tenant = seed_tenant(&w).await;
    let customer = seed_customer(&w, &tenant).await;
    let invoice = seed_invoice(&w, &tenant, &customer, 10_000).await;

    let linked = AttachGatewayCharge::new(w.invoices.clone(), w.events.clone())
        .execute(AttachGatewayChargeInput {
            invoice_id: invoice.id_typed(),
            gateway_charge_id: "ch_789".to_string(),
            payment_link: "https://pay.example/ch_789".to_string(),
            pix_qr_code: Some("qr".to_string()),
            pix_copy_paste: None,
        })
        .await
        .unwrap();
    assert_eq!(linked.gateway_charge_id(), Some("ch_789"));
    assert_eq!(linked.status(), InvoiceStatus::Pending);

    let canceled = CancelInvoice::new(w.invoices.clone(), w.events.clone())
        .execute(invoice.id_typed())
        .await
        .unwrap();
    assert_eq!(canceled.status(), InvoiceStatus::Canceled);
}

#[tokio::test]
async fn repository_update_and_delete_require_existing_rows() {
    let w = world();

    let (tenant, _) = Tenant::register(cobrado_tenants::RegisterTenant {
        email: "ghost@example.com".to_string(),
        name: "Ghost Tenant".to_string(),
        phone: None,
        document: None,
        business_type: None,
        occurred_at: Utc::now(),
    })
    .unwrap();

    // Never persisted: update and delete both miss.
    let err = w.tenants.update(&tenant).await.unwrap_err();
    assert!(err.is_not_found());
    let err = w.tenants.delete(tenant.id_typed()).await.unwrap_err();
    assert!(err.is_not_found());
}
