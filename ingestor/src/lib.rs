//! Ingest pipeline for CCSDS-style telemetry packets received over UDP.
//!
//! datagram -> [`codec`] -> [`anomaly`] -> [`listener`] -> channel ->
//! [`writer`] -> [`sink::TelemetrySink`]

pub mod anomaly;
pub mod codec;
pub mod config;
pub mod db;
pub mod errors;
pub mod listener;
pub mod metrics;
pub mod model;
pub mod sink;
pub mod writer;
