use bitflags::bitflags;
use chrono::{DateTime, Utc};

use crate::errors::DecodeError;

/// CCSDS primary header, kept as the three raw big-endian words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryHeader {
    pub packet_id: u16,
    pub sequence_control: u16,
    /// Bytes following the primary header, minus one.
    pub data_length: u16,
}

impl PrimaryHeader {
    pub fn version(&self) -> u8 {
        (self.packet_id >> 13) as u8
    }

    /// 0 for telemetry, 1 for telecommand.
    pub fn packet_type(&self) -> u8 {
        ((self.packet_id >> 12) & 0x1) as u8
    }

    pub fn has_secondary_header(&self) -> bool {
        self.packet_id & 0x0800 != 0
    }

    pub fn apid(&self) -> u16 {
        self.packet_id & 0x07FF
    }

    pub fn sequence_flags(&self) -> u8 {
        (self.sequence_control >> 14) as u8
    }

    pub fn sequence_count(&self) -> u16 {
        self.sequence_control & 0x3FFF
    }

    /// Number of bytes the header says follow it.
    pub fn declared_data_len(&self) -> usize {
        self.data_length as usize + 1
    }
}

/// Secondary header carrying the packet generation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecondaryHeader {
    /// Whole seconds since 1970-01-01T00:00:00Z.
    pub timestamp: u64,
}

impl SecondaryHeader {
    /// Converts the raw seconds into a UTC instant without wrapping or clamping.
    pub fn time(&self) -> Result<DateTime<Utc>, DecodeError> {
        i64::try_from(self.timestamp)
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .ok_or(DecodeError::TimestampOutOfRange(self.timestamp))
    }
}

/// The four engineering measurements carried by every packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryPayload {
    /// Degrees Celsius
    pub temperature: f32,
    /// Percent of capacity
    pub battery: f32,
    /// Kilometres
    pub altitude: f32,
    /// Decibels
    pub signal: f32,
}

/// One fully decoded datagram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Packet {
    pub primary: PrimaryHeader,
    pub secondary: SecondaryHeader,
    pub payload: TelemetryPayload,
}

bitflags! {
    /// Per-measurement anomaly bits, stored as a single byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AnomalyFlags: u8 {
        const TEMPERATURE = 0b0000_0001;
        const BATTERY = 0b0000_0010;
        const ALTITUDE = 0b0000_0100;
        const SIGNAL = 0b0000_1000;
    }
}

impl AnomalyFlags {
    pub fn has_temperature_anomaly(&self) -> bool {
        self.contains(Self::TEMPERATURE)
    }

    pub fn has_battery_anomaly(&self) -> bool {
        self.contains(Self::BATTERY)
    }

    pub fn has_altitude_anomaly(&self) -> bool {
        self.contains(Self::ALTITUDE)
    }

    pub fn has_signal_anomaly(&self) -> bool {
        self.contains(Self::SIGNAL)
    }

    /// A record counts as anomalous when any bit is set.
    pub fn is_anomalous(&self) -> bool {
        !self.is_empty()
    }

    /// Lowercase measurement names of the set bits, for metrics labels.
    pub fn measurement_names(&self) -> Vec<&'static str> {
        [
            (Self::TEMPERATURE, "temperature"),
            (Self::BATTERY, "battery"),
            (Self::ALTITUDE, "altitude"),
            (Self::SIGNAL, "signal"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect()
    }
}

/// Decoded, classified telemetry ready for storage.
///
/// The storage identifier is assigned by the sink on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    pub timestamp: DateTime<Utc>,
    pub temperature: f32,
    pub battery: f32,
    pub altitude: f32,
    pub signal: f32,
    pub anomaly_flags: AnomalyFlags,
}

impl TelemetryRecord {
    /// Assembles a record from a decoded packet, its converted generation
    /// time and the classifier's verdict on its payload.
    pub fn from_packet(packet: &Packet, timestamp: DateTime<Utc>, anomaly_flags: AnomalyFlags) -> Self {
        Self {
            timestamp,
            temperature: packet.payload.temperature,
            battery: packet.payload.battery,
            altitude: packet.payload.altitude,
            signal: packet.payload.signal,
            anomaly_flags,
        }
    }

    pub fn is_anomalous(&self) -> bool {
        self.anomaly_flags.is_anomalous()
    }
}
