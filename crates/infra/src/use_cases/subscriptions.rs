use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use cobrado_billing::{FeeSchedule, PaymentMethod};
use cobrado_core::{AggregateRoot, DomainError, DomainResult, TenantId};
use cobrado_customers::CustomerId;
use cobrado_invoicing::{Invoice, IssueInvoice};
use cobrado_ledger::{RecordPlatformFee, Transaction};
use cobrado_subscriptions::{
    BillingCycle, CreateSubscription as CreateSubscriptionCmd, Subscription, SubscriptionId,
    SubscriptionStatus,
};

use crate::event_sink::{EventSink, envelope_for};
use crate::repository::{
    CustomerRepository, InvoiceRepository, SubscriptionRepository, TenantRepository,
    TransactionRepository,
};
use crate::use_cases::invoices::generate_invoice_number;
use crate::use_cases::transactions::LEDGER_AGGREGATE_TYPE;

const AGGREGATE_TYPE: &str = "subscriptions.subscription";

async fn load(
    subscriptions: &dyn SubscriptionRepository,
    id: SubscriptionId,
) -> DomainResult<Subscription> {
    subscriptions
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Subscription", id))
}

#[derive(Debug, Clone)]
pub struct CreateSubscriptionInput {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub description: Option<String>,
    pub amount: u64,
    pub billing_cycle: BillingCycle,
    pub payment_method: PaymentMethod,
    pub start_date: DateTime<Utc>,
}

/// Create a recurring billing schedule for an existing customer.
pub struct CreateSubscription {
    subscriptions: Arc<dyn SubscriptionRepository>,
    customers: Arc<dyn CustomerRepository>,
    events: Arc<dyn EventSink>,
}

impl CreateSubscription {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        customers: Arc<dyn CustomerRepository>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            subscriptions,
            customers,
            events,
        }
    }

    pub async fn execute(&self, input: CreateSubscriptionInput) -> DomainResult<Subscription> {
        if self
            .customers
            .find_by_id(input.customer_id)
            .await?
            .is_none()
        {
            return Err(DomainError::not_found("Customer", input.customer_id));
        }

        let (subscription, event) = Subscription::create(CreateSubscriptionCmd {
            tenant_id: input.tenant_id,
            customer_id: input.customer_id,
            description: input.description,
            amount: input.amount,
            billing_cycle: input.billing_cycle,
            payment_method: input.payment_method,
            start_date: input.start_date,
            occurred_at: Utc::now(),
        })?;

        self.subscriptions.create(&subscription).await?;
        self.events.publish(envelope_for(
            subscription.tenant_id(),
            subscription.id_typed().0,
            AGGREGATE_TYPE,
            subscription.version(),
            &event,
        ));
        tracing::info!(
            tenant_id = %subscription.tenant_id(),
            subscription_id = %subscription.id_typed(),
            "subscription created"
        );

        Ok(subscription)
    }
}

macro_rules! transition_use_case {
    ($(#[$doc:meta])* $name:ident, |$sub:ident, $now:ident| $transition:expr) => {
        $(#[$doc])*
        pub struct $name {
            subscriptions: Arc<dyn SubscriptionRepository>,
            events: Arc<dyn EventSink>,
        }

        impl $name {
            pub fn new(
                subscriptions: Arc<dyn SubscriptionRepository>,
                events: Arc<dyn EventSink>,
            ) -> Self {
                Self {
                    subscriptions,
                    events,
                }
            }

            pub async fn execute(&self, id: SubscriptionId) -> DomainResult<Subscription> {
                let mut $sub = load(self.subscriptions.as_ref(), id).await?;
                let $now = Utc::now();
                let event = $transition;

                self.subscriptions.update(&$sub).await?;
                self.events.publish(envelope_for(
                    $sub.tenant_id(),
                    $sub.id_typed().0,
                    AGGREGATE_TYPE,
                    $sub.version(),
                    &event,
                ));

                Ok($sub)
            }
        }
    };
}

transition_use_case!(
    /// Pause billing. Fails when the subscription is canceled.
    PauseSubscription,
    |sub, now| sub.pause(now)?
);

transition_use_case!(
    /// Resume a paused subscription.
    ResumeSubscription,
    |sub, now| sub.resume(now)?
);

transition_use_case!(
    /// Cancel the schedule for good.
    CancelSubscription,
    |sub, now| sub.cancel(now)
);

/// Change the amount billed each cycle.
pub struct UpdateSubscriptionAmount {
    subscriptions: Arc<dyn SubscriptionRepository>,
    events: Arc<dyn EventSink>,
}

impl UpdateSubscriptionAmount {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            subscriptions,
            events,
        }
    }

    pub async fn execute(
        &self,
        id: SubscriptionId,
        new_amount: u64,
    ) -> DomainResult<Subscription> {
        let mut subscription = load(self.subscriptions.as_ref(), id).await?;
        let event = subscription.update_amount(new_amount, Utc::now())?;

        self.subscriptions.update(&subscription).await?;
        self.events.publish(envelope_for(
            subscription.tenant_id(),
            subscription.id_typed().0,
            AGGREGATE_TYPE,
            subscription.version(),
            &event,
        ));

        Ok(subscription)
    }
}

/// The billing run the external scheduler invokes.
///
/// For every active subscription that is due at `now`: issue the invoice,
/// record the platform-fee audit entry, then advance the billing cycle.
/// Each step is an independent persistence write — there is no atomicity
/// across them.
pub struct RunBillingCycle {
    subscriptions: Arc<dyn SubscriptionRepository>,
    tenants: Arc<dyn TenantRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    transactions: Arc<dyn TransactionRepository>,
    events: Arc<dyn EventSink>,
    fee_schedule: FeeSchedule,
    /// How long after issuance a generated invoice is due.
    due_after: Duration,
}

impl RunBillingCycle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        tenants: Arc<dyn TenantRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        transactions: Arc<dyn TransactionRepository>,
        events: Arc<dyn EventSink>,
        fee_schedule: FeeSchedule,
        due_after: Duration,
    ) -> Self {
        Self {
            subscriptions,
            tenants,
            invoices,
            transactions,
            events,
            fee_schedule,
            due_after,
        }
    }

    pub async fn execute(&self, now: DateTime<Utc>) -> DomainResult<Vec<Invoice>> {
        let active = self
            .subscriptions
            .find_by_status(SubscriptionStatus::Active)
            .await?;

        let mut issued = Vec::new();
        for mut subscription in active {
            if !subscription.should_generate_invoice(now) {
                continue;
            }

            let tenant = self
                .tenants
                .find_by_id(subscription.tenant_id())
                .await?
                .ok_or_else(|| DomainError::not_found("Tenant", subscription.tenant_id()))?;

            let (invoice, invoice_event) = Invoice::issue(IssueInvoice {
                tenant_id: subscription.tenant_id(),
                customer_id: subscription.customer_id(),
                subscription_id: Some(subscription.id_typed()),
                invoice_number: generate_invoice_number(),
                amount: subscription.amount(),
                due_date: now + self.due_after,
                payment_method: subscription.payment_method(),
                platform_fee_bps: tenant.fee_percentage_bps(),
                fee_schedule: self.fee_schedule,
                occurred_at: now,
            })?;

            self.invoices.create(&invoice).await?;
            self.events.publish(envelope_for(
                invoice.tenant_id(),
                invoice.id_typed().0,
                crate::use_cases::invoices::AGGREGATE_TYPE,
                invoice.version(),
                &invoice_event,
            ));

            // Tiny amounts can round the fee to zero; there is nothing to
            // audit then.
            if invoice.platform_fee() > 0 {
                let (transaction, transaction_event) =
                    Transaction::record_platform_fee(RecordPlatformFee {
                        tenant_id: invoice.tenant_id(),
                        invoice_id: invoice.id_typed(),
                        amount: invoice.platform_fee(),
                        percentage_bps: tenant.fee_percentage_bps(),
                        base_amount: invoice.amount(),
                        occurred_at: now,
                    })?;
                self.transactions.create(&transaction).await?;
                self.events.publish(envelope_for(
                    transaction.tenant_id(),
                    transaction.id_typed().0,
                    LEDGER_AGGREGATE_TYPE,
                    transaction.version(),
                    &transaction_event,
                ));
            }

            let advance_event = subscription.advance_billing_cycle(now)?;
            self.subscriptions.update(&subscription).await?;
            self.events.publish(envelope_for(
                subscription.tenant_id(),
                subscription.id_typed().0,
                AGGREGATE_TYPE,
                subscription.version(),
                &advance_event,
            ));

            tracing::info!(
                subscription_id = %subscription.id_typed(),
                invoice_id = %invoice.id_typed(),
                next_billing_date = %subscription.next_billing_date(),
                "billing cycle invoice issued"
            );
            issued.push(invoice);
        }

        Ok(issued)
    }
}
