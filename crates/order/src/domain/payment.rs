use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub payment_id: String,
    pub status: String,
}

/// Payment calls are keyed by the order's current payment key, so a retried
/// or resumed pay never charges twice. The key only changes once no payment
/// is held under it.
pub fn capture_key(payment_key: Uuid) -> String {
    format!("capture-{payment_key}")
}

pub fn refund_key(payment_key: Uuid) -> String {
    format!("refund-{payment_key}")
}
