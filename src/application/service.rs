use super::broadcaster::EventBroadcaster;
use super::lifecycle::LifecycleExecutor;
use crate::domain::payment::{Amount, NewPixPayment, PaymentId, PixPayment};
use crate::domain::ports::PaymentStoreRef;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// The main entry point for PIX payments.
///
/// `create` validates, persists and broadcasts synchronously, then returns
/// while the payment's lifecycle keeps running in the background.
pub struct PaymentService {
    executor: Arc<LifecycleExecutor>,
    lifecycles: Mutex<Vec<JoinHandle<Result<PixPayment>>>>,
}

impl PaymentService {
    pub fn new(executor: LifecycleExecutor) -> Self {
        Self {
            executor: Arc::new(executor),
            lifecycles: Mutex::new(Vec::new()),
        }
    }

    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        self.executor.broadcaster()
    }

    pub fn store(&self) -> &PaymentStoreRef {
        self.executor.store()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.executor.clock().now()
    }

    /// Creates a payment in `CREATED` and starts its lifecycle.
    ///
    /// Non-positive amounts are rejected before anything is stored or
    /// broadcast.
    pub async fn create(&self, amount: Decimal) -> Result<PixPayment> {
        let draft = NewPixPayment::new(Amount::new(amount)?);
        info!(amount = %draft.amount, "Creating PIX payment");

        let (id, created_at) = self.store().create(&draft).await?;
        let payment = draft.persisted(id, created_at);
        info!(payment_id = %id, status = %payment.status(), "PIX payment created");

        let handle = self.executor.launch(payment.clone());
        let mut lifecycles = self.lifecycles.lock().await;
        lifecycles.retain(|h| !h.is_finished());
        lifecycles.push(handle);

        Ok(payment)
    }

    pub async fn get(&self, id: PaymentId) -> Result<PixPayment> {
        self.store().get(id).await
    }

    pub async fn list(&self) -> Result<Vec<PixPayment>> {
        self.store().list().await
    }

    /// Lifecycles still running.
    pub async fn in_flight(&self) -> usize {
        let lifecycles = self.lifecycles.lock().await;
        lifecycles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Waits until every lifecycle started so far has settled or aborted.
    ///
    /// Returns why each aborted lifecycle stopped.
    pub async fn wait_idle(&self) -> Vec<PaymentError> {
        let handles = std::mem::take(&mut *self.lifecycles.lock().await);
        let mut failures = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => failures.push(e),
                Err(join_error) => {
                    error!(error = %join_error, "Lifecycle task panicked");
                    failures.push(PaymentError::InternalError(Box::new(join_error)));
                }
            }
        }
        failures
    }

    /// Drains all lifecycles and returns the final state of every payment.
    pub async fn shutdown(self) -> Result<Vec<PixPayment>> {
        let failures = self.wait_idle().await;
        if !failures.is_empty() {
            info!(aborted = failures.len(), "Some lifecycles ended before settlement");
        }
        self.list().await
    }
}
