use super::payment::{Amount, NewPixPayment, PaymentId, PaymentStatus, PixPayment};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Persistence of payments. Implementations must be safe to share between
/// lifecycles of different payments.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Persists a new payment and hands back its identity.
    async fn create(&self, payment: &NewPixPayment) -> Result<(PaymentId, DateTime<Utc>)>;
    async fn update_status(&self, id: PaymentId, status: PaymentStatus) -> Result<()>;
    async fn get(&self, id: PaymentId) -> Result<PixPayment>;
    /// All payments, newest first.
    async fn list(&self) -> Result<Vec<PixPayment>>;
}

/// The external authorization and settlement system.
#[async_trait]
pub trait PixGateway: Send + Sync {
    async fn notify_creation(&self, payment: &PixPayment);
    async fn authorize(&self, payment: &PixPayment) -> Result<()>;
    async fn settle(&self, payment: &PixPayment) -> Result<()>;
}

/// Best-effort delivery of payment notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_created(&self, payment_id: PaymentId, amount: Amount) -> Result<()>;
    async fn send_authorized(&self, payment_id: PaymentId, amount: Amount) -> Result<()>;
    async fn send_settled(&self, payment_id: PaymentId, amount: Amount) -> Result<()>;
}

/// Source of event timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Waits between lifecycle steps and inside simulated external calls.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, duration: Duration);
}

pub type PaymentStoreRef = Arc<dyn PaymentStore>;
pub type PixGatewayRef = Arc<dyn PixGateway>;
pub type NotifierRef = Arc<dyn Notifier>;
pub type ClockRef = Arc<dyn Clock>;
pub type PacerRef = Arc<dyn Pacer>;
