use super::payment::{PaymentId, PaymentStatus, PixPayment};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_MESSAGE: &str = "Current payment status";

/// Human-readable description of reaching `status`.
pub fn transition_message(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Created => "PIX payment created",
        PaymentStatus::Authorized => "PIX payment authorized by the central bank",
        PaymentStatus::Settled => "PIX payment settled",
    }
}

/// A status change of one payment, as seen by observers.
///
/// Events are never persisted and never mutated once built; the broadcaster
/// shares one instance between every subscriber of the payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentEvent {
    payment_id: PaymentId,
    status: PaymentStatus,
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
    timestamp: DateTime<Utc>,
    message: String,
}

impl PaymentEvent {
    /// Event for the payment's current status, stamped at `timestamp`.
    pub fn transition(payment: &PixPayment, timestamp: DateTime<Utc>) -> Self {
        Self::with_message(payment, timestamp, transition_message(payment.status()))
    }

    /// Out-of-band event describing where the payment is right now.
    pub fn snapshot(payment: &PixPayment, timestamp: DateTime<Utc>) -> Self {
        Self::with_message(payment, timestamp, SNAPSHOT_MESSAGE)
    }

    fn with_message(payment: &PixPayment, timestamp: DateTime<Utc>, message: &str) -> Self {
        Self {
            payment_id: payment.id(),
            status: payment.status(),
            amount: payment.amount().value(),
            timestamp,
            message: message.to_string(),
        }
    }

    pub fn payment_id(&self) -> PaymentId {
        self.payment_id
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
