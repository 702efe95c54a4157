use crate::domain::payment::PaymentStatus;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

/// Pacing of the background lifecycle.
///
/// The initial delay gives observers a window to subscribe between the
/// creation response and the first external call.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleConfig {
    pub initial_delay: Duration,
    pub authorize_delay: Duration,
    pub settle_delay: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            authorize_delay: Duration::from_secs(2),
            settle_delay: Duration::from_secs(3),
        }
    }
}

impl LifecycleConfig {
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            authorize_delay: Duration::ZERO,
            settle_delay: Duration::ZERO,
        }
    }

    /// Pause taken right before the step that reaches `status`.
    pub fn delay_before(&self, status: PaymentStatus) -> Duration {
        match status {
            PaymentStatus::Created => self.initial_delay,
            PaymentStatus::Authorized => self.authorize_delay,
            PaymentStatus::Settled => self.settle_delay,
        }
    }
}

/// Latencies of the simulated gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub notify_latency: Duration,
    pub authorize_latency: Duration,
    pub settle_latency: Duration,
    /// Amounts above this are flagged for additional review (logged only).
    pub review_threshold: Decimal,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            notify_latency: Duration::from_millis(100),
            authorize_latency: Duration::from_millis(200),
            settle_latency: Duration::from_millis(300),
            review_threshold: dec!(100000),
        }
    }
}

impl GatewayConfig {
    pub fn immediate() -> Self {
        Self {
            notify_latency: Duration::ZERO,
            authorize_latency: Duration::ZERO,
            settle_latency: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Same latency for every call.
    pub fn with_uniform_latency(latency: Duration) -> Self {
        Self {
            notify_latency: latency,
            authorize_latency: latency,
            settle_latency: latency,
            ..Self::default()
        }
    }
}
