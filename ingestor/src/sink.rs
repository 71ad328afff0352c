use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::errors::StorageError;
use crate::model::TelemetryRecord;

/// Durable store the ingest pipeline writes into.
///
/// Implementations assign the record identifier and must tolerate
/// concurrent calls from several writer tasks.
pub trait TelemetrySink: Send + Sync + 'static {
    fn insert(
        &self,
        record: TelemetryRecord,
    ) -> impl Future<Output = Result<Uuid, StorageError>> + Send;
}

/// A record as held by [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTelemetry {
    pub id: Uuid,
    pub record: TelemetryRecord,
}

/// In-process sink used by tests and when no database is configured.
///
/// Records are kept in insertion order. Cloning shares the same storage.
#[derive(Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<StoredTelemetry>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent insert fail until re-enabled.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn records(&self) -> Vec<StoredTelemetry> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<StoredTelemetry>> {
        // a poisoned lock only means another writer panicked mid-push
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TelemetrySink for MemorySink {
    async fn insert(&self, record: TelemetryRecord) -> Result<Uuid, StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "memory sink disabled".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        self.lock().push(StoredTelemetry { id, record });
        Ok(id)
    }
}
