use super::frame::EventFrame;
use crate::application::broadcaster::{EventBroadcaster, Subscription};
use crate::application::service::PaymentService;
use crate::domain::event::PaymentEvent;
use crate::domain::lifecycle::Lifecycle;
use crate::domain::payment::{PaymentId, PaymentStatus};
use crate::error::Result;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// One observer's live view of a payment.
///
/// Subscribes before reading the current status, so a transition racing the
/// open is either in the snapshot or in the queue. Queued events at or
/// before the snapshot status are skipped, so nothing is seen twice.
///
/// The session ends after a terminal status or when the broadcaster closes
/// the subscription (including slow-consumer eviction, which looks the same
/// as a normal close). Dropping the session unsubscribes.
pub struct MonitorSession {
    broadcaster: Arc<EventBroadcaster>,
    subscription: Subscription,
    snapshot: Option<Arc<PaymentEvent>>,
    seen: PaymentStatus,
    finished: bool,
}

impl MonitorSession {
    pub async fn open(service: &PaymentService, payment_id: PaymentId) -> Result<Self> {
        let broadcaster = Arc::clone(service.broadcaster());
        let subscription = broadcaster.subscribe(payment_id);
        let mut session = Self {
            broadcaster,
            subscription,
            snapshot: None,
            seen: PaymentStatus::INITIAL,
            finished: false,
        };

        // An unknown payment drops the session here, which unsubscribes.
        let payment = service.get(payment_id).await?;
        debug!(%payment_id, status = %payment.status(), "Monitor session opened");

        session.seen = payment.status();
        session.snapshot = Some(Arc::new(PaymentEvent::snapshot(&payment, service.now())));
        Ok(session)
    }

    pub fn payment_id(&self) -> PaymentId {
        self.subscription.payment_id()
    }

    /// Next frame for the observer, `None` once the stream is over.
    pub async fn next_frame(&mut self) -> Option<EventFrame> {
        if let Some(snapshot) = self.snapshot.take() {
            self.finished = snapshot.status().is_terminal();
            return Some(EventFrame::initial(snapshot));
        }

        while !self.finished {
            let Some(event) = self.subscription.recv().await else {
                debug!(payment_id = %self.payment_id(), "Subscription closed");
                self.finished = true;
                break;
            };
            if event.status() <= self.seen {
                continue;
            }
            self.seen = event.status();
            self.finished = self.seen.is_terminal();
            return Some(EventFrame::status_change(event));
        }
        None
    }

    /// Writes every frame to `writer`, flushing after each one, and returns
    /// how many were written. A write error ends the session.
    pub async fn pipe_to<W>(mut self, writer: &mut W) -> Result<usize>
    where
        W: AsyncWrite + Unpin,
    {
        let mut written = 0;
        while let Some(frame) = self.next_frame().await {
            writer.write_all(frame.encode()?.as_bytes()).await?;
            writer.flush().await?;
            written += 1;
        }
        Ok(written)
    }
}

impl Drop for MonitorSession {
    fn drop(&mut self) {
        self.broadcaster.unsubscribe(&mut self.subscription);
        debug!(payment_id = %self.subscription.payment_id(), "Monitor session closed");
    }
}
