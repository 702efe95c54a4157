use crate::config::GatewayConfig;
use crate::domain::payment::PixPayment;
use crate::domain::ports::{PacerRef, PixGateway};
use crate::error::Result;
use async_trait::async_trait;
use tracing::{info, warn};

/// Stand-in for the central bank's PIX system: logs each call and waits
/// for the configured latency. Never rejects a payment.
pub struct SimulatedPixGateway {
    config: GatewayConfig,
    pacer: PacerRef,
}

impl SimulatedPixGateway {
    pub fn new(config: GatewayConfig, pacer: PacerRef) -> Self {
        Self { config, pacer }
    }
}

#[async_trait]
impl PixGateway for SimulatedPixGateway {
    async fn notify_creation(&self, payment: &PixPayment) {
        info!(payment_id = %payment.id(), amount = %payment.amount(), "Gateway: registering payment");
        self.pacer.pause(self.config.notify_latency).await;
        info!(payment_id = %payment.id(), "Gateway: payment registered");
    }

    async fn authorize(&self, payment: &PixPayment) -> Result<()> {
        info!(payment_id = %payment.id(), "Gateway: processing authorization");
        self.pacer.pause(self.config.authorize_latency).await;

        if payment.amount().value() > self.config.review_threshold {
            warn!(
                payment_id = %payment.id(),
                amount = %payment.amount(),
                threshold = %self.config.review_threshold,
                "Gateway: amount requires additional review"
            );
        }

        info!(payment_id = %payment.id(), "Gateway: payment authorized");
        Ok(())
    }

    async fn settle(&self, payment: &PixPayment) -> Result<()> {
        info!(payment_id = %payment.id(), "Gateway: processing settlement");
        self.pacer.pause(self.config.settle_latency).await;
        info!(payment_id = %payment.id(), amount = %payment.amount(), "Gateway: payment settled");
        Ok(())
    }
}
