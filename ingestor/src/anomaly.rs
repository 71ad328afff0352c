use crate::model::{AnomalyFlags, TelemetryPayload};

const TEMPERATURE_MAX: f32 = 35.0;
const BATTERY_MIN: f32 = 40.0;
const ALTITUDE_MIN: f32 = 400.0;
const SIGNAL_MIN: f32 = -80.0;

/// Flags every measurement that crosses its threshold.
///
/// Comparisons are strict, so a value sitting exactly on a threshold is
/// nominal. NaN never compares past a threshold and is never flagged.
pub fn classify(payload: &TelemetryPayload) -> AnomalyFlags {
    let mut flags = AnomalyFlags::empty();

    if payload.temperature > TEMPERATURE_MAX {
        flags |= AnomalyFlags::TEMPERATURE;
    }

    if payload.battery < BATTERY_MIN {
        flags |= AnomalyFlags::BATTERY;
    }

    if payload.altitude < ALTITUDE_MIN {
        flags |= AnomalyFlags::ALTITUDE;
    }

    if payload.signal < SIGNAL_MIN {
        flags |= AnomalyFlags::SIGNAL;
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nominal() -> TelemetryPayload {
        TelemetryPayload {
            temperature: 20.0,
            battery: 90.0,
            altitude: 500.0,
            signal: -50.0,
        }
    }

    #[test]
    fn test_no_anomaly() {
        assert_eq!(classify(&nominal()).bits(), 0);
    }

    #[test]
    fn test_combined_anomaly() {
        let payload = TelemetryPayload {
            temperature: 36.0,
            battery: 35.0,
            altitude: 500.0,
            signal: -70.0,
        };

        let flags = classify(&payload);
        assert_eq!(flags, AnomalyFlags::TEMPERATURE | AnomalyFlags::BATTERY);
        assert_eq!(flags.bits(), 3);
    }

    #[test]
    fn test_all_anomalies() {
        let payload = TelemetryPayload {
            temperature: 120.0,
            battery: 1.0,
            altitude: 100.0,
            signal: -120.0,
        };

        assert_eq!(classify(&payload), AnomalyFlags::all());
        assert_eq!(classify(&payload).bits(), 0b1111);
    }

    #[test]
    fn test_temperature_boundary() {
        let at = TelemetryPayload { temperature: 35.0, ..nominal() };
        let over = TelemetryPayload { temperature: 35.000_01, ..nominal() };

        assert!(!classify(&at).has_temperature_anomaly());
        assert_eq!(classify(&over), AnomalyFlags::TEMPERATURE);
    }

    #[test]
    fn test_battery_boundary() {
        let at = TelemetryPayload { battery: 40.0, ..nominal() };
        let under = TelemetryPayload { battery: 39.999_99, ..nominal() };

        assert!(!classify(&at).has_battery_anomaly());
        assert_eq!(classify(&under), AnomalyFlags::BATTERY);
    }

    #[test]
    fn test_altitude_boundary() {
        let at = TelemetryPayload { altitude: 400.0, ..nominal() };
        let under = TelemetryPayload { altitude: 399.999_97, ..nominal() };

        assert!(!classify(&at).has_altitude_anomaly());
        assert_eq!(classify(&under), AnomalyFlags::ALTITUDE);
    }

    #[test]
    fn test_signal_boundary() {
        let at = TelemetryPayload { signal: -80.0, ..nominal() };
        let under = TelemetryPayload { signal: -80.000_01, ..nominal() };

        assert!(!classify(&at).has_signal_anomaly());
        assert_eq!(classify(&under), AnomalyFlags::SIGNAL);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let payload = TelemetryPayload {
            temperature: 36.0,
            battery: 35.0,
            altitude: 399.0,
            signal: -81.0,
        };

        assert_eq!(classify(&payload), classify(&payload));
    }

    #[test]
    fn test_nan_is_not_flagged() {
        let payload = TelemetryPayload {
            temperature: f32::NAN,
            battery: f32::NAN,
            altitude: f32::NAN,
            signal: f32::NAN,
        };

        assert!(classify(&payload).is_empty());
    }
}
