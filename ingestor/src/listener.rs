use crate::anomaly::classify;
use crate::codec::decode_packet;
use crate::errors::{DecodeError, Error, Result};
use crate::metrics::{
    ANOMALIES_TOTAL, CHANNEL_FULL_TOTAL, DATAGRAMS_TOTAL, DECODED_PACKETS_TOTAL,
    DECODE_FAILURES_TOTAL,
};
use crate::model::TelemetryRecord;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{ToSocketAddrs, UdpSocket};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Largest payload a single UDP datagram can carry.
const MAX_DATAGRAM_LEN: usize = 65_535;
const RECV_ERROR_BACKOFF_MS: u64 = 100;

/// Decodes and classifies one datagram.
pub fn process_datagram(datagram: &[u8]) -> std::result::Result<TelemetryRecord, DecodeError> {
    let packet = decode_packet(datagram)?;
    let timestamp = packet.secondary.time()?;
    let anomaly_flags = classify(&packet.payload);

    Ok(TelemetryRecord::from_packet(&packet, timestamp, anomaly_flags))
}

/// Receive loop over a UDP socket feeding the writer channel.
pub struct Listener {
    socket: UdpSocket,
    tx: mpsc::Sender<TelemetryRecord>,
}

impl Listener {
    pub async fn bind(addr: impl ToSocketAddrs, tx: mpsc::Sender<TelemetryRecord>) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self::from_socket(socket, tx))
    }

    pub fn from_socket(socket: UdpSocket, tx: mpsc::Sender<TelemetryRecord>) -> Self {
        Self { socket, tx }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receives datagrams until `shutdown` resolves, then drops the socket
    /// and the channel sender so the writer can drain.
    ///
    /// Undecodable datagrams are counted and discarded. The loop only ends
    /// early if the writer side of the channel has gone away. Shutdown is
    /// honoured while waiting for writer capacity too.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        info!("Listening for telemetry on {}", self.local_addr()?);

        tokio::pin!(shutdown);
        let mut buf = vec![0u8; MAX_DATAGRAM_LEN];

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, closing telemetry socket");
                    break;
                }

                received = self.socket.recv_from(&mut buf) => {
                    match received {
                        Ok((len, peer)) => {
                            if let Some(record) = inspect_datagram(&buf[..len], peer) {
                                tokio::select! {
                                    _ = &mut shutdown => {
                                        info!("Shutdown requested while waiting for writer capacity");
                                        break;
                                    }
                                    forwarded = forward(&self.tx, record) => forwarded?,
                                }
                            }
                        }
                        Err(e) => {
                            warn!("UDP receive error: {}", e);
                            tokio::time::sleep(Duration::from_millis(RECV_ERROR_BACKOFF_MS)).await;
                        }
                    }
                }
            }
        }

        info!("Listener stopped");
        Ok(())
    }
}

/// Decodes one received datagram, updating counters. Returns `None` when the
/// datagram is discarded.
fn inspect_datagram(datagram: &[u8], peer: SocketAddr) -> Option<TelemetryRecord> {
    DATAGRAMS_TOTAL.inc();
    debug!("Received datagram from {}, size: {} bytes", peer, datagram.len());

    let record = match process_datagram(datagram) {
        Ok(record) => record,
        Err(e) => {
            DECODE_FAILURES_TOTAL.with_label_values(&[e.reason()]).inc();
            warn!("Discarding datagram from {}: {}", peer, e);
            return None;
        }
    };

    DECODED_PACKETS_TOTAL.inc();
    if record.is_anomalous() {
        for measurement in record.anomaly_flags.measurement_names() {
            ANOMALIES_TOTAL.with_label_values(&[measurement]).inc();
        }
        debug!(
            "Anomalous telemetry at {}: flags={:#06b}",
            record.timestamp,
            record.anomaly_flags.bits()
        );
    }

    Some(record)
}

async fn forward(tx: &mpsc::Sender<TelemetryRecord>, record: TelemetryRecord) -> Result<()> {
    match tx.try_send(record) {
        Ok(()) => Ok(()),
        Err(mpsc::error::TrySendError::Full(record)) => {
            CHANNEL_FULL_TOTAL.inc();
            debug!("Channel full, waiting for writer capacity");
            tx.send(record).await.map_err(|_| Error::ChannelSend)
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            error!("Channel closed, cannot forward telemetry");
            Err(Error::ChannelSend)
        }
    }
}
