use super::lifecycle::{Lifecycle, advance};
use super::payment::{Amount, PaymentId, PaymentStatus};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_RECIPIENT: &str = "user@example.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    PaymentCreated,
    PaymentAuthorized,
    PaymentSettled,
}

impl NotificationKind {
    pub fn for_status(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Created => NotificationKind::PaymentCreated,
            PaymentStatus::Authorized => NotificationKind::PaymentAuthorized,
            PaymentStatus::Settled => NotificationKind::PaymentSettled,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            NotificationKind::PaymentCreated => "PIX payment created successfully",
            NotificationKind::PaymentAuthorized => "PIX payment authorized by the central bank",
            NotificationKind::PaymentSettled => "PIX payment settled successfully",
        }
    }
}

/// Delivery state of a notification attempt: `Pending` resolves to exactly
/// one of two terminal outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

impl Lifecycle for NotificationStatus {
    const ENTITY: &'static str = "notification";

    fn name(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "PENDING",
            NotificationStatus::Sent => "SENT",
            NotificationStatus::Failed => "FAILED",
        }
    }

    fn successors(&self) -> &'static [Self] {
        match self {
            NotificationStatus::Pending => &[NotificationStatus::Sent, NotificationStatus::Failed],
            NotificationStatus::Sent | NotificationStatus::Failed => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub payment_id: PaymentId,
    pub kind: NotificationKind,
    pub amount: Amount,
    pub recipient: String,
    pub message: String,
    status: NotificationStatus,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(id: u64, payment_id: PaymentId, kind: NotificationKind, amount: Amount) -> Self {
        Self {
            id,
            payment_id,
            kind,
            amount,
            recipient: DEFAULT_RECIPIENT.to_string(),
            message: kind.message().to_string(),
            status: NotificationStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn status(&self) -> NotificationStatus {
        self.status
    }

    pub fn mark_sent(&mut self) -> Result<()> {
        advance(&mut self.status, NotificationStatus::Sent)
    }

    pub fn mark_failed(&mut self) -> Result<()> {
        advance(&mut self.status, NotificationStatus::Failed)
    }
}
