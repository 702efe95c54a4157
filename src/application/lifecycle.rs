use super::broadcaster::EventBroadcaster;
use crate::config::LifecycleConfig;
use crate::domain::event::PaymentEvent;
use crate::domain::notification::NotificationKind;
use crate::domain::payment::{PaymentStatus, PixPayment};
use crate::domain::ports::{
    ClockRef, NotifierRef, PacerRef, PaymentStoreRef, PixGatewayRef,
};
use crate::error::{PaymentError, Result};
use crate::infrastructure::clock::{SystemClock, TokioPacer};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Drives payments from `CREATED` to `SETTLED`.
///
/// Each payment gets exactly one background task; its steps run strictly in
/// order and every successful step is persisted and broadcast before the
/// next one starts. The first failing step ends the lifecycle, leaving the
/// payment at its last successful status. There is no retry and no way to
/// abort a running lifecycle.
pub struct LifecycleExecutor {
    store: PaymentStoreRef,
    gateway: PixGatewayRef,
    notifier: NotifierRef,
    broadcaster: Arc<EventBroadcaster>,
    clock: ClockRef,
    pacer: PacerRef,
    config: LifecycleConfig,
}

/// Keeps one payment's event timestamps from going backwards.
#[derive(Debug, Default)]
struct EventStamp {
    last: Option<DateTime<Utc>>,
}

impl EventStamp {
    fn next(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let stamp = match self.last {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last = Some(stamp);
        stamp
    }
}

impl LifecycleExecutor {
    pub fn new(
        store: PaymentStoreRef,
        gateway: PixGatewayRef,
        notifier: NotifierRef,
        broadcaster: Arc<EventBroadcaster>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            notifier,
            broadcaster,
            clock: Arc::new(SystemClock),
            pacer: Arc::new(TokioPacer),
            config,
        }
    }

    pub fn with_clock(mut self, clock: ClockRef) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_pacer(mut self, pacer: PacerRef) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn store(&self) -> &PaymentStoreRef {
        &self.store
    }

    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        &self.broadcaster
    }

    pub fn clock(&self) -> &ClockRef {
        &self.clock
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Broadcasts the freshly persisted payment's initial status, then
    /// hands the rest of its lifecycle to a background task.
    ///
    /// The initial event goes out before this returns, so anyone who
    /// subscribed before creation finished cannot miss it.
    pub fn launch(self: &Arc<Self>, payment: PixPayment) -> JoinHandle<Result<PixPayment>> {
        let mut stamp = EventStamp::default();
        self.publish(&payment, &mut stamp);

        let executor = Arc::clone(self);
        tokio::spawn(async move {
            let payment_id = payment.id();
            let outcome = executor.drive(payment, stamp).await;
            if let Err(e) = &outcome {
                error!(%payment_id, error = %e, "Lifecycle aborted");
            }
            outcome
        })
    }

    async fn drive(&self, mut payment: PixPayment, mut stamp: EventStamp) -> Result<PixPayment> {
        self.pacer.pause(self.config.initial_delay).await;
        self.gateway.notify_creation(&payment).await;
        self.notify(&payment).await;

        while let Some(next) = payment.status().next() {
            self.pacer.pause(self.config.delay_before(next)).await;
            self.step(&mut payment, next, &mut stamp).await?;
            self.notify(&payment).await;
        }

        info!(payment_id = %payment.id(), status = %payment.status(), "Lifecycle complete");
        Ok(payment)
    }

    /// Runs the external call for `next`, then checks the precondition,
    /// advances, persists and broadcasts.
    async fn step(
        &self,
        payment: &mut PixPayment,
        next: PaymentStatus,
        stamp: &mut EventStamp,
    ) -> Result<()> {
        match next {
            PaymentStatus::Authorized => self.gateway.authorize(payment).await?,
            PaymentStatus::Settled => self.gateway.settle(payment).await?,
            PaymentStatus::Created => {}
        }

        payment.advance_to(next)?;

        self.store
            .update_status(payment.id(), next)
            .await
            .map_err(|e| {
                PaymentError::ExternalCallError(format!(
                    "persisting {} for payment {}: {}",
                    next,
                    payment.id(),
                    e
                ))
            })?;

        info!(payment_id = %payment.id(), status = %next, "Payment advanced");
        self.publish(payment, stamp);
        Ok(())
    }

    fn publish(&self, payment: &PixPayment, stamp: &mut EventStamp) {
        let timestamp = stamp.next(self.clock.now());
        self.broadcaster
            .broadcast(PaymentEvent::transition(payment, timestamp));
    }

    async fn notify(&self, payment: &PixPayment) {
        let (id, amount) = (payment.id(), payment.amount());
        let kind = NotificationKind::for_status(payment.status());
        let sent = match kind {
            NotificationKind::PaymentCreated => self.notifier.send_created(id, amount).await,
            NotificationKind::PaymentAuthorized => {
                self.notifier.send_authorized(id, amount).await
            }
            NotificationKind::PaymentSettled => self.notifier.send_settled(id, amount).await,
        };
        if let Err(e) = sent {
            warn!(payment_id = %id, ?kind, error = %e, "Notification not delivered");
        }
    }
}
