//! Invoice aggregate: a billable charge carrying its fee breakdown and a
//! payment-status state machine.

mod invoice;

pub use invoice::{
    GatewayChargeLinked, Invoice, InvoiceCanceled, InvoiceEvent, InvoiceId, InvoiceIssued,
    InvoiceMarkedOverdue, InvoicePaid, InvoiceProps, InvoiceStatus, IssueInvoice,
};
