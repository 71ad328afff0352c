mod telemetry;

use ccsds_ingestor::codec::encode;
use ccsds_ingestor::model::Packet;
use chrono::Utc;
use clap::Parser;
use rand::Rng;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Sends randomly generated CCSDS telemetry packets to an ingestor over UDP.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Ingestor UDP address
    #[arg(long, env = "SIM_TARGET", default_value = "127.0.0.1:8089")]
    target: String,

    /// Packets per second
    #[arg(long, env = "RATE", default_value_t = 1)]
    rate: u64,

    /// Application process identifier stamped on every packet
    #[arg(long, env = "APID", default_value_t = 0x42)]
    apid: u16,

    /// Share of packets carrying an out-of-threshold measurement
    #[arg(long, env = "ANOMALY_RATE", default_value_t = 0.1)]
    anomaly_rate: f64,

    /// Share of datagrams deliberately truncated
    #[arg(long, env = "MALFORMED_RATE", default_value_t = 0.0)]
    malformed_rate: f64,

    /// Stop after this many datagrams; runs forever if omitted
    #[arg(long)]
    count: Option<u64>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if !(0.0..=1.0).contains(&args.anomaly_rate) || !(0.0..=1.0).contains(&args.malformed_rate) {
        error!("ANOMALY_RATE and MALFORMED_RATE must be within [0, 1]");
        std::process::exit(2);
    }

    info!("Starting CCSDS telemetry simulator");
    info!(
        "Target: {}, Rate: {} packets/s, APID: {:#05x}",
        args.target, args.rate, args.apid
    );

    let socket = match UdpSocket::bind("0.0.0.0:0").await {
        Ok(socket) => socket,
        Err(e) => {
            error!("Failed to bind UDP socket: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = socket.connect(&args.target).await {
        error!("Failed to resolve {}: {}", args.target, e);
        std::process::exit(1);
    }

    let mut rng = rand::thread_rng();
    let mut ticker = tokio::time::interval(send_period(args.rate));
    let mut sequence: u16 = 0;
    let mut sent = 0u64;

    loop {
        if args.count.is_some_and(|count| sent >= count) {
            break;
        }
        ticker.tick().await;

        let payload = telemetry::generate_payload(&mut rng, args.anomaly_rate);
        let timestamp = Utc::now().timestamp().max(0) as u64;
        let bytes = encode(&Packet::telemetry(args.apid, sequence, timestamp, payload));
        // sequence count is 14 bits on the wire
        sequence = (sequence + 1) & 0x3FFF;

        let datagram = if rng.gen_bool(args.malformed_rate) {
            telemetry::truncate(&mut rng, &bytes)
        } else {
            bytes.to_vec()
        };

        match socket.send(&datagram).await {
            Ok(_) => sent += 1,
            Err(e) => warn!("Failed to send packet: {}", e),
        }

        // Log progress periodically
        if sent > 0 && sent % 1000 == 0 {
            info!("Sent {} packets", sent);
        }
    }

    info!("Done, sent {} datagrams", sent);
}

/// Interval between packets for `rate` packets per second. Never zero, as
/// `tokio::time::interval` rejects a zero period.
fn send_period(rate: u64) -> Duration {
    Duration::from_micros((1_000_000 / rate.max(1)).max(1))
}
