#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pix_monitor::application::broadcaster::{EventBroadcaster, Subscription};
use pix_monitor::application::lifecycle::LifecycleExecutor;
use pix_monitor::application::service::PaymentService;
use pix_monitor::config::{GatewayConfig, LifecycleConfig};
use pix_monitor::domain::event::PaymentEvent;
use pix_monitor::domain::payment::{PaymentStatus, PixPayment};
use pix_monitor::domain::ports::{Clock, ClockRef, PacerRef, PixGateway, PixGatewayRef};
use pix_monitor::error::{PaymentError, Result};
use pix_monitor::infrastructure::clock::InstantPacer;
use pix_monitor::infrastructure::gateway::SimulatedPixGateway;
use pix_monitor::infrastructure::in_memory::{InMemoryNotifier, InMemoryPaymentStore};
use rand::Rng;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub struct Harness {
    pub service: PaymentService,
    pub notifier: Arc<InMemoryNotifier>,
}

impl Harness {
    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        self.service.broadcaster()
    }
}

/// A service whose lifecycles run without any pause.
pub fn harness() -> Harness {
    harness_with(simulated_gateway(), InMemoryNotifier::new())
}

pub fn simulated_gateway() -> PixGatewayRef {
    let pacer: PacerRef = Arc::new(InstantPacer);
    Arc::new(SimulatedPixGateway::new(GatewayConfig::immediate(), pacer))
}

pub fn harness_with(gateway: PixGatewayRef, notifier: InMemoryNotifier) -> Harness {
    build(gateway, notifier, None)
}

/// Instant harness whose event timestamps come from `clock`.
pub fn harness_with_clock(clock: ClockRef) -> Harness {
    build(simulated_gateway(), InMemoryNotifier::new(), Some(clock))
}

fn build(gateway: PixGatewayRef, notifier: InMemoryNotifier, clock: Option<ClockRef>) -> Harness {
    let notifier = Arc::new(notifier);
    let mut executor = LifecycleExecutor::new(
        Arc::new(InMemoryPaymentStore::new()),
        gateway,
        notifier.clone(),
        Arc::new(EventBroadcaster::new()),
        LifecycleConfig::immediate(),
    )
    .with_pacer(Arc::new(InstantPacer));
    if let Some(clock) = clock {
        executor = executor.with_clock(clock);
    }

    Harness {
        service: PaymentService::new(executor),
        notifier,
    }
}

/// Gateway that rejects one step and accepts everything else.
pub struct RejectingGateway {
    pub reject: PaymentStatus,
}

impl RejectingGateway {
    fn answer(&self, payment: &PixPayment, step: PaymentStatus) -> Result<()> {
        if step == self.reject {
            Err(PaymentError::ExternalCallError(format!(
                "gateway rejected {} for payment {}",
                step,
                payment.id()
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PixGateway for RejectingGateway {
    async fn notify_creation(&self, _payment: &PixPayment) {}

    async fn authorize(&self, payment: &PixPayment) -> Result<()> {
        self.answer(payment, PaymentStatus::Authorized)
    }

    async fn settle(&self, payment: &PixPayment) -> Result<()> {
        self.answer(payment, PaymentStatus::Settled)
    }
}

/// Gateway that holds every authorization and settlement until the test
/// hands out a permit.
pub struct GatedGateway {
    gate: Arc<Semaphore>,
}

impl GatedGateway {
    pub fn new() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        (
            Self {
                gate: Arc::clone(&gate),
            },
            gate,
        )
    }

    async fn pass(&self) -> Result<()> {
        self.gate
            .acquire()
            .await
            .map_err(|e| PaymentError::InternalError(Box::new(e)))?
            .forget();
        Ok(())
    }
}

#[async_trait]
impl PixGateway for GatedGateway {
    async fn notify_creation(&self, _payment: &PixPayment) {}

    async fn authorize(&self, _payment: &PixPayment) -> Result<()> {
        self.pass().await
    }

    async fn settle(&self, _payment: &PixPayment) -> Result<()> {
        self.pass().await
    }
}

/// Clock that moves one second backwards on every reading.
pub struct RewindingClock {
    next: std::sync::Mutex<DateTime<Utc>>,
}

impl RewindingClock {
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            next: std::sync::Mutex::new(start),
        }
    }
}

impl Clock for RewindingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut next = self.next.lock().unwrap();
        let now = *next;
        *next = now - chrono::Duration::seconds(1);
        now
    }
}

/// Reads events until the queue closes or a terminal status arrives.
pub async fn collect_until_settled(subscription: &mut Subscription) -> Vec<Arc<PaymentEvent>> {
    let mut events = Vec::new();
    while let Ok(Some(event)) =
        tokio::time::timeout(Duration::from_secs(5), subscription.recv()).await
    {
        let settled = event.status() == PaymentStatus::Settled;
        events.push(event);
        if settled {
            break;
        }
    }
    events
}

pub fn generate_csv(path: &Path, rows: usize) -> std::result::Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    let mut rng = rand::thread_rng();

    wtr.write_record(["amount"])?;
    for _ in 0..rows {
        let cents: u64 = rng.gen_range(1..=10_000_000);
        wtr.write_record([format!("{}.{:02}", cents / 100, cents % 100)])?;
    }

    wtr.flush()?;
    Ok(())
}
