use super::lifecycle::{Lifecycle, advance};
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Store-assigned identifier of a PIX payment. Also the key observers
/// subscribe under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(pub u64);

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Represents a positive monetary amount for a payment.
///
/// The only way to obtain one is through [`Amount::new`] (or deserialization,
/// which goes through the same check), so a payment can never carry a zero
/// or negative value.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PaymentError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> std::result::Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Amount::new(value).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Created,
    Authorized,
    Settled,
}

impl PaymentStatus {
    pub const INITIAL: Self = PaymentStatus::Created;

    /// The next status along the chain, `None` once settled.
    pub fn next(&self) -> Option<Self> {
        self.successors().first().copied()
    }
}

impl Lifecycle for PaymentStatus {
    const ENTITY: &'static str = "payment";

    fn name(&self) -> &'static str {
        match self {
            PaymentStatus::Created => "CREATED",
            PaymentStatus::Authorized => "AUTHORIZED",
            PaymentStatus::Settled => "SETTLED",
        }
    }

    fn successors(&self) -> &'static [Self] {
        match self {
            PaymentStatus::Created => &[PaymentStatus::Authorized],
            PaymentStatus::Authorized => &[PaymentStatus::Settled],
            PaymentStatus::Settled => &[],
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A payment that exists in memory but has not been persisted yet, so it
/// has no id or creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPixPayment {
    pub amount: Amount,
    pub status: PaymentStatus,
}

impl NewPixPayment {
    pub fn new(amount: Amount) -> Self {
        Self {
            amount,
            status: PaymentStatus::INITIAL,
        }
    }

    /// Attaches the identity handed out by the store.
    pub fn persisted(self, id: PaymentId, created_at: DateTime<Utc>) -> PixPayment {
        PixPayment {
            id,
            amount: self.amount,
            status: self.status,
            created_at,
        }
    }
}

/// A persisted PIX payment.
///
/// `id`, `amount` and `created_at` never change after persistence; `status`
/// only moves forward through [`PixPayment::authorize`] and
/// [`PixPayment::settle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixPayment {
    id: PaymentId,
    amount: Amount,
    status: PaymentStatus,
    created_at: DateTime<Utc>,
}

impl PixPayment {
    /// Rebuilds a payment from stored fields.
    pub fn restore(
        id: PaymentId,
        amount: Amount,
        status: PaymentStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            amount,
            status,
            created_at,
        }
    }

    pub fn id(&self) -> PaymentId {
        self.id
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Only `CREATED` payments can be authorized.
    pub fn authorize(&mut self) -> Result<()> {
        self.advance_to(PaymentStatus::Authorized)
    }

    /// Only `AUTHORIZED` payments can be settled.
    pub fn settle(&mut self) -> Result<()> {
        self.advance_to(PaymentStatus::Settled)
    }

    pub fn advance_to(&mut self, next: PaymentStatus) -> Result<()> {
        advance(&mut self.status, next)
    }
}
