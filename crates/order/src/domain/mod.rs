mod lifecycle;
mod payment;

pub use self::lifecycle::{OrderEvent, OrderStatus};
pub use self::payment::{PaymentReceipt, capture_key, refund_key};
