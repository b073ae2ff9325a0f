//! Payment aggregate: funds received against an invoice, with its own
//! confirmation state machine.

mod payment;

pub use payment::{
    GatewayPaymentLinked, Payment, PaymentConfirmed, PaymentEvent, PaymentFailed, PaymentId,
    PaymentProps, PaymentRecorded, PaymentRefunded, PaymentStatus, RecordPayment,
};
