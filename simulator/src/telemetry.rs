use ccsds_ingestor::model::TelemetryPayload;
use rand::Rng;

/// Generates one set of measurements. With probability `anomaly_rate` a
/// single measurement is pushed past its threshold.
pub fn generate_payload(rng: &mut impl Rng, anomaly_rate: f64) -> TelemetryPayload {
    let mut payload = TelemetryPayload {
        temperature: rng.gen_range(20.0..30.0),
        battery: rng.gen_range(70.0..100.0),
        altitude: rng.gen_range(500.0..550.0),
        signal: rng.gen_range(-60.0..-40.0),
    };

    if rng.gen_bool(anomaly_rate) {
        match rng.gen_range(0..4) {
            0 => payload.temperature = rng.gen_range(35.5..50.0),
            1 => payload.battery = rng.gen_range(5.0..39.0),
            2 => payload.altitude = rng.gen_range(300.0..399.0),
            _ => payload.signal = rng.gen_range(-100.0..-81.0),
        }
    }

    payload
}

/// Cuts a valid packet short to exercise the ingestor's discard path.
pub fn truncate(rng: &mut impl Rng, bytes: &[u8]) -> Vec<u8> {
    let len = rng.gen_range(0..bytes.len());
    bytes[..len].to_vec()
}
