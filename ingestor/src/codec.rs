//! Big-endian fixed-layout codec for CCSDS telemetry packets.
//!
//! Layout (30 bytes):
//!
//! | offset | width | field                                   |
//! |--------|-------|-----------------------------------------|
//! | 0      | 2     | packet identification                   |
//! | 2      | 2     | sequence control                        |
//! | 4      | 2     | packet data length (bytes after hdr - 1) |
//! | 6      | 8     | timestamp, seconds since Unix epoch     |
//! | 14     | 4     | temperature (f32)                       |
//! | 18     | 4     | battery (f32)                           |
//! | 22     | 4     | altitude (f32)                          |
//! | 26     | 4     | signal (f32)                            |
//!
//! Every width is checked against the buffer before any field is read.

use crate::errors::DecodeError;
use crate::model::{Packet, PrimaryHeader, SecondaryHeader, TelemetryPayload};

pub const PRIMARY_HEADER_LEN: usize = 6;
pub const SECONDARY_HEADER_LEN: usize = 8;
pub const PAYLOAD_LEN: usize = 16;
pub const HEADERS_LEN: usize = PRIMARY_HEADER_LEN + SECONDARY_HEADER_LEN;
pub const PACKET_LEN: usize = HEADERS_LEN + PAYLOAD_LEN;

/// Value of the data length field for a well-formed packet.
pub const DATA_LENGTH_FIELD: u16 = (SECONDARY_HEADER_LEN + PAYLOAD_LEN - 1) as u16;

/// Decodes one datagram into its three sections.
///
/// Fails with `TruncatedHeader` if either header does not fit,
/// `TruncatedPayload` if the measurements do not fit, and `LengthMismatch`
/// if the declared data length disagrees with the bytes actually present.
pub fn decode_packet(buf: &[u8]) -> Result<Packet, DecodeError> {
    if buf.len() < PRIMARY_HEADER_LEN {
        return Err(DecodeError::TruncatedHeader {
            needed: PRIMARY_HEADER_LEN,
            actual: buf.len(),
        });
    }
    if buf.len() < HEADERS_LEN {
        return Err(DecodeError::TruncatedHeader {
            needed: HEADERS_LEN,
            actual: buf.len(),
        });
    }
    if buf.len() < PACKET_LEN {
        return Err(DecodeError::TruncatedPayload {
            needed: PACKET_LEN,
            actual: buf.len(),
        });
    }

    let mut reader = Reader::new(buf);

    let primary = PrimaryHeader {
        packet_id: reader.u16(),
        sequence_control: reader.u16(),
        data_length: reader.u16(),
    };

    let actual = buf.len() - PRIMARY_HEADER_LEN;
    if primary.declared_data_len() != actual {
        return Err(DecodeError::LengthMismatch {
            declared: primary.declared_data_len(),
            actual,
        });
    }

    let secondary = SecondaryHeader {
        timestamp: reader.u64(),
    };

    let payload = TelemetryPayload {
        temperature: reader.f32(),
        battery: reader.f32(),
        altitude: reader.f32(),
        signal: reader.f32(),
    };

    Ok(Packet {
        primary,
        secondary,
        payload,
    })
}

/// Serializes a packet into its wire form. The data length field is written
/// as given so callers can produce deliberately inconsistent packets.
pub fn encode(packet: &Packet) -> [u8; PACKET_LEN] {
    let mut buf = [0u8; PACKET_LEN];
    buf[0..2].copy_from_slice(&packet.primary.packet_id.to_be_bytes());
    buf[2..4].copy_from_slice(&packet.primary.sequence_control.to_be_bytes());
    buf[4..6].copy_from_slice(&packet.primary.data_length.to_be_bytes());
    buf[6..14].copy_from_slice(&packet.secondary.timestamp.to_be_bytes());
    buf[14..18].copy_from_slice(&packet.payload.temperature.to_be_bytes());
    buf[18..22].copy_from_slice(&packet.payload.battery.to_be_bytes());
    buf[22..26].copy_from_slice(&packet.payload.altitude.to_be_bytes());
    buf[26..30].copy_from_slice(&packet.payload.signal.to_be_bytes());
    buf
}

impl Packet {
    /// Builds a well-formed telemetry packet for `apid` with the given
    /// sequence count.
    pub fn telemetry(apid: u16, sequence_count: u16, timestamp: u64, payload: TelemetryPayload) -> Self {
        Packet {
            primary: PrimaryHeader {
                // version 0, type telemetry, secondary header present
                packet_id: 0x0800 | (apid & 0x07FF),
                // unsegmented
                sequence_control: 0xC000 | (sequence_count & 0x3FFF),
                data_length: DATA_LENGTH_FIELD,
            },
            secondary: SecondaryHeader { timestamp },
            payload,
        }
    }
}

/// Cursor over a buffer whose length has already been checked.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn u16(&mut self) -> u16 {
        u16::from_be_bytes(self.take())
    }

    fn u64(&mut self) -> u64 {
        u64::from_be_bytes(self.take())
    }

    fn f32(&mut self) -> f32 {
        f32::from_be_bytes(self.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn sample_payload() -> TelemetryPayload {
        TelemetryPayload {
            temperature: 22.5,
            battery: 87.25,
            altitude: 512.0,
            signal: -61.5,
        }
    }

    fn sample_bytes() -> [u8; PACKET_LEN] {
        encode(&Packet::telemetry(0x123, 7, 1_700_000_000, sample_payload()))
    }

    #[test]
    fn test_wire_layout() {
        let bytes = sample_bytes();
        assert_eq!(&bytes[0..2], &[0x09, 0x23]);
        assert_eq!(&bytes[2..4], &[0xC0, 0x07]);
        assert_eq!(&bytes[4..6], &[0x00, 23]);
        assert_eq!(&bytes[6..14], &1_700_000_000u64.to_be_bytes());
        assert_eq!(&bytes[14..18], &22.5f32.to_be_bytes());
        assert_eq!(&bytes[26..30], &(-61.5f32).to_be_bytes());
    }

    #[test]
    fn test_decode_valid_packet() {
        let packet = decode_packet(&sample_bytes()).unwrap();
        assert_eq!(packet.primary.apid(), 0x123);
        assert_eq!(packet.primary.sequence_count(), 7);
        assert!(packet.primary.has_secondary_header());
        assert_eq!(packet.secondary.timestamp, 1_700_000_000);
        assert_eq!(packet.payload, sample_payload());
    }

    #[test]
    fn test_decode_timestamp() {
        let packet = decode_packet(&sample_bytes()).unwrap();
        let time = packet.secondary.time().unwrap();
        assert_eq!(time.timestamp(), 1_700_000_000);
        assert_eq!(time.to_rfc3339(), "2023-11-14T22:13:20+00:00");
    }

    #[test]
    fn test_payload_bits_survive_round_trip() {
        let mut rng = rand::thread_rng();
        for _ in 0..256 {
            // arbitrary bit patterns, NaN and infinities included
            let payload = TelemetryPayload {
                temperature: f32::from_bits(rng.gen()),
                battery: f32::from_bits(rng.gen()),
                altitude: f32::from_bits(rng.gen()),
                signal: f32::from_bits(rng.gen()),
            };
            let bytes = encode(&Packet::telemetry(1, 0, 0, payload));
            let decoded = decode_packet(&bytes).unwrap();
            assert_eq!(encode(&decoded), bytes);
            assert_eq!(decoded.payload.temperature.to_bits(), payload.temperature.to_bits());
            assert_eq!(decoded.payload.signal.to_bits(), payload.signal.to_bits());
        }
    }

    #[test]
    fn test_short_buffers_truncate_header() {
        let bytes = sample_bytes();
        for len in 0..HEADERS_LEN {
            let err = decode_packet(&bytes[..len]).unwrap_err();
            assert!(
                matches!(err, DecodeError::TruncatedHeader { actual, .. } if actual == len),
                "len {len}: {err:?}"
            );
        }
    }

    #[test]
    fn test_header_only_truncates_payload() {
        let bytes = sample_bytes();
        assert_eq!(
            decode_packet(&bytes[..HEADERS_LEN]),
            Err(DecodeError::TruncatedPayload {
                needed: PACKET_LEN,
                actual: HEADERS_LEN
            })
        );
        assert!(matches!(
            decode_packet(&bytes[..PACKET_LEN - 1]),
            Err(DecodeError::TruncatedPayload { .. })
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = sample_bytes().to_vec();
        bytes.push(0);
        assert_eq!(
            decode_packet(&bytes),
            Err(DecodeError::LengthMismatch {
                declared: 24,
                actual: 25
            })
        );
    }

    #[test]
    fn test_declared_length_mismatch_rejected() {
        let mut packet = Packet::telemetry(1, 0, 0, sample_payload());
        packet.primary.data_length = 100;
        assert_eq!(
            decode_packet(&encode(&packet)),
            Err(DecodeError::LengthMismatch {
                declared: 101,
                actual: 24
            })
        );
    }

    #[test]
    fn test_timestamp_offsets_from_epoch() {
        for secs in [0u64, 1, 86_400, 4_102_444_800] {
            let packet = decode_packet(&encode(&Packet::telemetry(1, 0, secs, sample_payload()))).unwrap();
            let time = packet.secondary.time().unwrap();
            assert_eq!(time.timestamp(), secs as i64);
            assert_eq!(time.timestamp_subsec_nanos(), 0);
        }
    }

    #[test]
    fn test_unrepresentable_timestamp_rejected() {
        let packet = decode_packet(&encode(&Packet::telemetry(1, 0, u64::MAX, sample_payload()))).unwrap();
        assert_eq!(packet.secondary.timestamp, u64::MAX);
        assert_eq!(packet.secondary.time(), Err(DecodeError::TimestampOutOfRange(u64::MAX)));
    }
}
