use crate::domain::notification::{Notification, NotificationKind};
use crate::domain::payment::{Amount, NewPixPayment, PaymentId, PaymentStatus, PixPayment};
use crate::domain::ports::{Notifier, PaymentStore};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// A thread-safe in-memory store for payments.
///
/// Uses `Arc<RwLock<HashMap<PaymentId, PixPayment>>>` to allow shared concurrent access.
/// Ids are handed out from a counter starting at 1.
#[derive(Clone)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<PaymentId, PixPayment>>>,
    next_id: Arc<AtomicU64>,
}

impl Default for InMemoryPaymentStore {
    fn default() -> Self {
        Self {
            payments: Arc::default(),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl InMemoryPaymentStore {
    /// Creates a new, empty in-memory payment store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn create(&self, payment: &NewPixPayment) -> Result<(PaymentId, DateTime<Utc>)> {
        let id = PaymentId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let created_at = Utc::now();
        let mut payments = self.payments.write().await;
        payments.insert(id, payment.clone().persisted(id, created_at));
        Ok((id, created_at))
    }

    async fn update_status(&self, id: PaymentId, status: PaymentStatus) -> Result<()> {
        let mut payments = self.payments.write().await;
        let stored = payments.get(&id).ok_or(PaymentError::NotFound(id))?;
        let updated = PixPayment::restore(id, stored.amount(), status, stored.created_at());
        payments.insert(id, updated);
        Ok(())
    }

    async fn get(&self, id: PaymentId) -> Result<PixPayment> {
        let payments = self.payments.read().await;
        payments.get(&id).cloned().ok_or(PaymentError::NotFound(id))
    }

    async fn list(&self) -> Result<Vec<PixPayment>> {
        let payments = self.payments.read().await;
        let mut all: Vec<PixPayment> = payments.values().cloned().collect();
        all.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        Ok(all)
    }
}

/// Records notifications instead of delivering them anywhere.
///
/// Each send creates a `PENDING` notification and immediately marks it
/// `SENT`, or `FAILED` when the notifier was built with
/// [`InMemoryNotifier::failing`].
#[derive(Clone, Default)]
pub struct InMemoryNotifier {
    notifications: Arc<RwLock<Vec<Notification>>>,
    fail_deliveries: bool,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails.
    pub fn failing() -> Self {
        Self {
            fail_deliveries: true,
            ..Self::default()
        }
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.notifications.read().await.clone()
    }

    pub async fn notifications_for(&self, payment_id: PaymentId) -> Vec<Notification> {
        self.notifications
            .read()
            .await
            .iter()
            .filter(|n| n.payment_id == payment_id)
            .cloned()
            .collect()
    }

    async fn record(
        &self,
        payment_id: PaymentId,
        kind: NotificationKind,
        amount: Amount,
    ) -> Result<()> {
        let mut notifications = self.notifications.write().await;
        let id = notifications.len() as u64 + 1;
        let mut notification = Notification::new(id, payment_id, kind, amount);

        let outcome = if self.fail_deliveries {
            notification.mark_failed()?;
            Err(PaymentError::ExternalCallError(format!(
                "notification {:?} for payment {} was not delivered",
                kind, payment_id
            )))
        } else {
            notification.mark_sent()?;
            Ok(())
        };

        debug!(%payment_id, ?kind, status = ?notification.status(), "Notification recorded");
        notifications.push(notification);
        outcome
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn send_created(&self, payment_id: PaymentId, amount: Amount) -> Result<()> {
        self.record(payment_id, NotificationKind::PaymentCreated, amount)
            .await
    }

    async fn send_authorized(&self, payment_id: PaymentId, amount: Amount) -> Result<()> {
        self.record(payment_id, NotificationKind::PaymentAuthorized, amount)
            .await
    }

    async fn send_settled(&self, payment_id: PaymentId, amount: Amount) -> Result<()> {
        self.record(payment_id, NotificationKind::PaymentSettled, amount)
            .await
    }
}
