use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref DATAGRAMS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_datagrams_total",
        "Total datagrams received on the UDP socket"
    ))
    .unwrap();
    pub static ref DECODED_PACKETS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_decoded_packets_total",
        "Total datagrams decoded into telemetry records"
    ))
    .unwrap();
    pub static ref DECODE_FAILURES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            "ingestor_decode_failures_total",
            "Total datagrams discarded because they could not be decoded"
        ),
        &["reason"]
    )
    .unwrap();
    pub static ref ANOMALIES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            "ingestor_anomalies_total",
            "Total threshold crossings detected, per measurement"
        ),
        &["measurement"]
    )
    .unwrap();
    pub static ref STORED_RECORDS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_stored_records_total",
        "Total records accepted by the storage sink"
    ))
    .unwrap();
    pub static ref STORE_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_store_failures_total",
        "Total records dropped because the storage sink rejected them"
    ))
    .unwrap();
    pub static ref INSERT_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "ingestor_insert_latency_seconds",
            "Time taken to insert one record into the storage sink"
        )
        .buckets(vec![
            0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5
        ])
    )
    .unwrap();
    pub static ref INSERTS_IN_FLIGHT: Gauge = Gauge::with_opts(Opts::new(
        "ingestor_inserts_in_flight",
        "Inserts currently waiting on the storage sink"
    ))
    .unwrap();
    pub static ref CHANNEL_FULL_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_channel_full_total",
        "Total number of times channel was full (backpressure events)"
    ))
    .unwrap();
}

pub fn init_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(DATAGRAMS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DECODED_PACKETS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DECODE_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ANOMALIES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STORED_RECORDS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STORE_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(INSERT_LATENCY_SECONDS.clone()))?;
    REGISTRY.register(Box::new(INSERTS_IN_FLIGHT.clone()))?;
    REGISTRY.register(Box::new(CHANNEL_FULL_TOTAL.clone()))?;
    Ok(())
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
