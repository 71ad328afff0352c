use crate::metrics::{
    INSERTS_IN_FLIGHT, INSERT_LATENCY_SECONDS, STORED_RECORDS_TOTAL, STORE_FAILURES_TOTAL,
};
use crate::model::TelemetryRecord;
use crate::sink::TelemetrySink;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::Instant;
use tracing::{debug, error, info};

/// Largest insert pool the writer can wait out on shutdown.
pub const MAX_IN_FLIGHT_LIMIT: usize = if Semaphore::MAX_PERMITS < u32::MAX as usize {
    Semaphore::MAX_PERMITS
} else {
    u32::MAX as usize
};

/// Drains the record channel into `sink`.
///
/// Each record gets its own insert task, with at most `max_in_flight` running
/// at once. Once the channel closes, waits for outstanding inserts and
/// returns. Failed inserts are logged and dropped.
pub async fn run_writer<S: TelemetrySink>(
    mut rx: mpsc::Receiver<TelemetryRecord>,
    sink: Arc<S>,
    max_in_flight: usize,
) {
    let max_in_flight = max_in_flight.clamp(1, MAX_IN_FLIGHT_LIMIT);
    info!("Starting writer with max_in_flight={}", max_in_flight);

    let permits = Arc::new(Semaphore::new(max_in_flight));

    while let Some(record) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };

        let sink = sink.clone();
        tokio::spawn(async move {
            store_record(sink.as_ref(), record).await;
            drop(permit);
        });
    }

    info!("Channel closed, waiting for in-flight inserts");
    // lossless, the pool size is clamped to u32 range above
    let _ = permits.acquire_many(max_in_flight as u32).await;
    info!("Writer stopped");
}

async fn store_record<S: TelemetrySink>(sink: &S, record: TelemetryRecord) {
    INSERTS_IN_FLIGHT.inc();
    let start = Instant::now();
    let result = sink.insert(record).await;
    INSERTS_IN_FLIGHT.dec();

    match result {
        Ok(id) => {
            let elapsed = start.elapsed().as_secs_f64();
            INSERT_LATENCY_SECONDS.observe(elapsed);
            STORED_RECORDS_TOTAL.inc();
            debug!("Stored record {} in {:.3}s", id, elapsed);
        }
        Err(e) => {
            STORE_FAILURES_TOTAL.inc();
            error!("Failed to store telemetry record, dropping it: {}", e);
        }
    }
}
