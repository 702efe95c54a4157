use crate::domain::payment::{NewPixPayment, PaymentId, PaymentStatus, PixPayment};
use crate::domain::ports::PaymentStore;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Column Family for storing payments.
pub const CF_PAYMENTS: &str = "payments";

/// A persistent payment store backed by RocksDB.
///
/// Payments live in their own column family, keyed by the big-endian id so
/// iteration order matches id order. Values are JSON.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbPaymentStore {
    db: Arc<DB>,
    next_id: Arc<AtomicU64>,
    // Serializes read-modify-write status updates.
    write_lock: Arc<Mutex<()>>,
}

impl RocksDbPaymentStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// The id counter resumes after the highest id already stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_payments = ColumnFamilyDescriptor::new(CF_PAYMENTS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_payments])?;

        let last_id = {
            let cf = Self::handle(&db)?;
            match db.iterator_cf(cf, IteratorMode::End).next() {
                Some(item) => {
                    let (key, _) = item?;
                    decode_key(&key)?
                }
                None => 0,
            }
        };

        Ok(Self {
            db: Arc::new(db),
            next_id: Arc::new(AtomicU64::new(last_id + 1)),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn handle(db: &DB) -> Result<&ColumnFamily> {
        db.cf_handle(CF_PAYMENTS).ok_or_else(|| {
            PaymentError::InternalError(Box::new(std::io::Error::other(
                "Payments column family not found",
            )))
        })
    }

    fn put(&self, payment: &PixPayment) -> Result<()> {
        let cf = Self::handle(&self.db)?;
        let value = serde_json::to_vec(payment)?;
        self.db.put_cf(cf, payment.id().0.to_be_bytes(), value)?;
        Ok(())
    }

    fn read(&self, id: PaymentId) -> Result<PixPayment> {
        let cf = Self::handle(&self.db)?;
        match self.db.get_cf(cf, id.0.to_be_bytes())? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Err(PaymentError::NotFound(id)),
        }
    }
}

fn decode_key(key: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = key.try_into().map_err(|_| {
        PaymentError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Malformed payment key of {} bytes", key.len()),
        )))
    })?;
    Ok(u64::from_be_bytes(bytes))
}

#[async_trait]
impl PaymentStore for RocksDbPaymentStore {
    async fn create(&self, payment: &NewPixPayment) -> Result<(PaymentId, DateTime<Utc>)> {
        let id = PaymentId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let created_at = Utc::now();
        self.put(&payment.clone().persisted(id, created_at))?;
        Ok((id, created_at))
    }

    async fn update_status(&self, id: PaymentId, status: PaymentStatus) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let stored = self.read(id)?;
        self.put(&PixPayment::restore(
            id,
            stored.amount(),
            status,
            stored.created_at(),
        ))
    }

    async fn get(&self, id: PaymentId) -> Result<PixPayment> {
        self.read(id)
    }

    async fn list(&self) -> Result<Vec<PixPayment>> {
        let cf = Self::handle(&self.db)?;
        let mut payments = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::End) {
            let (_key, value) = item?;
            payments.push(serde_json::from_slice::<PixPayment>(&value)?);
        }
        payments.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        Ok(payments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::Amount;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn new_payment() -> NewPixPayment {
        NewPixPayment::new(Amount::new(dec!(123.45)).unwrap())
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDbPaymentStore::open(dir.path()).expect("Failed to open RocksDB");
        assert!(store.db.cf_handle(CF_PAYMENTS).is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_payment_roundtrip() {
        let dir = tempdir().unwrap();
        let store = RocksDbPaymentStore::open(dir.path()).unwrap();

        let (id, _) = store.create(&new_payment()).await.unwrap();
        store
            .update_status(id, PaymentStatus::Authorized)
            .await
            .unwrap();

        let retrieved = store.get(id).await.unwrap();
        assert_eq!(retrieved.status(), PaymentStatus::Authorized);
        assert_eq!(retrieved.amount().value(), dec!(123.45));

        assert!(matches!(
            store.get(PaymentId(42)).await,
            Err(PaymentError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rocksdb_ids_resume_after_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = RocksDbPaymentStore::open(dir.path()).unwrap();
            store.create(&new_payment()).await.unwrap();
            store.create(&new_payment()).await.unwrap();
        }

        let store = RocksDbPaymentStore::open(dir.path()).unwrap();
        let (id, _) = store.create(&new_payment()).await.unwrap();
        assert_eq!(id, PaymentId(3));
        assert_eq!(store.list().await.unwrap().len(), 3);
    }
}
