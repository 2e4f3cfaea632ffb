//! Telemetry normalization.
//!
//! Raw measurements arrive in incompatible units (dBm, Mbps, ms, percent).
//! Every field is mapped onto `[0, 1]` by clamped min-max scaling against a
//! fixed physical range, and "lower is better" metrics are inverted so that
//! `1.0` always means good.

use crate::types::{Channel, NormalizedSignal, TelemetrySnapshot};

const DEGENERATE_VALUE: f64 = 0.5;

/// Primary radio signal range (dBm).
pub const RSSI_RANGE: (f64, f64) = (-100.0, -30.0);
/// Link bandwidth range (Mbps).
pub const BANDWIDTH_RANGE: (f64, f64) = (0.0, 600.0);
/// Latency range (ms).
pub const LATENCY_RANGE: (f64, f64) = (1.0, 500.0);
/// CPU load range (%).
pub const CPU_RANGE: (f64, f64) = (0.0, 100.0);
/// Memory load range (%).
pub const MEM_RANGE: (f64, f64) = (0.0, 100.0);
/// Secondary radio signal range (dBm).
pub const BT_RSSI_RANGE: (f64, f64) = (-100.0, -30.0);
/// Device count at which secondary-radio activity saturates.
pub const BT_ACTIVE_SATURATION: f64 = 5.0;

/// Min-max normalize `value` into `[0, 1]` within `[lo, hi]`.
///
/// Equal bounds return `0.5`. Out-of-range values clamp to the nearest end;
/// a non-finite `value` maps to `0.0`.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn normalize(value: f64, lo: f64, hi: f64) -> f64 {
    if hi == lo {
        return DEGENERATE_VALUE;
    }
    let scaled = (value - lo) / (hi - lo);
    if scaled.is_nan() {
        return 0.0;
    }
    scaled.clamp(0.0, 1.0)
}

/// Inverted normalization for metrics where lower is better.
#[must_use]
pub fn normalize_inverted(value: f64, lo: f64, hi: f64) -> f64 {
    1.0 - normalize(value, lo, hi)
}

#[must_use]
pub fn normalize_rssi(dbm: f64) -> f64 {
    normalize(dbm, RSSI_RANGE.0, RSSI_RANGE.1)
}

#[must_use]
pub fn normalize_bandwidth(mbps: f64) -> f64 {
    normalize(mbps, BANDWIDTH_RANGE.0, BANDWIDTH_RANGE.1)
}

/// Latency score: lower latency scores higher.
#[must_use]
pub fn normalize_latency_inv(ms: f64) -> f64 {
    normalize_inverted(ms, LATENCY_RANGE.0, LATENCY_RANGE.1)
}

#[must_use]
pub fn normalize_cpu_inv(pct: f64) -> f64 {
    normalize_inverted(pct, CPU_RANGE.0, CPU_RANGE.1)
}

#[must_use]
pub fn normalize_memory_inv(pct: f64) -> f64 {
    normalize_inverted(pct, MEM_RANGE.0, MEM_RANGE.1)
}

/// Packet loss is already a ratio; clamp it and invert.
#[must_use]
pub fn normalize_packet_loss_inv(ratio: f64) -> f64 {
    normalize_inverted(ratio, 0.0, 1.0)
}

#[must_use]
pub fn normalize_bt_rssi(dbm: f64) -> f64 {
    normalize(dbm, BT_RSSI_RANGE.0, BT_RSSI_RANGE.1)
}

/// Secondary-radio activity, saturating at [`BT_ACTIVE_SATURATION`] devices.
#[must_use]
pub fn bt_activity(devices: u32) -> f64 {
    (f64::from(devices) / BT_ACTIVE_SATURATION).min(1.0)
}

/// Normalize every field of a snapshot.
#[must_use]
pub fn normalize_snapshot(snapshot: &TelemetrySnapshot) -> NormalizedSignal {
    NormalizedSignal {
        wifi_signal: normalize_rssi(snapshot.rssi),
        wifi_bandwidth: normalize_bandwidth(snapshot.bandwidth_mbps),
        latency_score: normalize_latency_inv(snapshot.latency_ms),
        net_quality: normalize_packet_loss_inv(snapshot.packet_loss_ratio),
        cpu_score: normalize_cpu_inv(snapshot.cpu_pct),
        mem_score: normalize_memory_inv(snapshot.mem_pct),
        bt_signal: normalize_bt_rssi(snapshot.bt_rssi),
        bt_active: bt_activity(snapshot.bt_count),
    }
}

impl NormalizedSignal {
    /// Composite signal for one channel: the mean of its two quality scores.
    #[must_use]
    pub fn channel_signal(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Wifi => (self.wifi_signal + self.wifi_bandwidth) / 2.0,
            Channel::Bt => (self.bt_signal + self.bt_active) / 2.0,
            Channel::Net => (self.latency_score + self.net_quality) / 2.0,
            Channel::Sys => (self.cpu_score + self.mem_score) / 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPSILON,
            "{actual} != {expected} within {EPSILON}"
        );
    }

    #[test]
    fn bounds_map_to_unit_interval_ends() {
        assert_close(normalize(-100.0, -100.0, -30.0), 0.0);
        assert_close(normalize(-30.0, -100.0, -30.0), 1.0);
        assert_close(normalize(5.0, 5.0, 10.0), 0.0);
        assert_close(normalize(10.0, 5.0, 10.0), 1.0);
    }

    #[test]
    fn degenerate_bounds_return_midpoint() {
        assert_close(normalize(42.0, 7.0, 7.0), 0.5);
        assert_close(normalize(f64::NAN, 7.0, 7.0), 0.5);
    }

    #[test]
    fn out_of_range_values_clamp() {
        assert_close(normalize(-150.0, -100.0, -30.0), 0.0);
        assert_close(normalize(0.0, -100.0, -30.0), 1.0);
        assert_close(normalize(f64::INFINITY, 0.0, 1.0), 1.0);
        assert_close(normalize(f64::NAN, 0.0, 1.0), 0.0);
    }

    #[test]
    fn normalization_is_monotonic() {
        let mut previous = -1.0;
        for step in 0..=70 {
            let value = normalize(-100.0 + f64::from(step), -100.0, -30.0);
            assert!(value >= previous);
            previous = value;
        }
    }

    #[test]
    fn inverted_metrics_reward_low_values() {
        assert_close(normalize_cpu_inv(0.0), 1.0);
        assert_close(normalize_cpu_inv(100.0), 0.0);
        assert_close(normalize_latency_inv(1.0), 1.0);
        assert_close(normalize_latency_inv(500.0), 0.0);
        assert_close(normalize_packet_loss_inv(0.25), 0.75);
        assert_close(normalize_packet_loss_inv(3.0), 0.0);
    }

    #[test]
    fn bt_activity_saturates_at_five_devices() {
        assert_close(bt_activity(0), 0.0);
        assert_close(bt_activity(2), 0.4);
        assert_close(bt_activity(5), 1.0);
        assert_close(bt_activity(40), 1.0);
    }

    #[test]
    fn default_snapshot_normalizes_to_known_values() {
        let norm = normalize_snapshot(&TelemetrySnapshot::default());
        assert_close(norm.wifi_signal, 30.0 / 70.0);
        assert_close(norm.wifi_bandwidth, 54.0 / 600.0);
        assert_close(norm.latency_score, 1.0 - 19.0 / 499.0);
        assert_close(norm.net_quality, 1.0);
        assert_close(norm.cpu_score, 0.7);
        assert_close(norm.mem_score, 0.5);
        assert_close(norm.bt_signal, 30.0 / 70.0);
        assert_close(norm.bt_active, 0.0);
    }

    #[test]
    fn channel_signal_averages_pairs() {
        let norm = normalize_snapshot(&TelemetrySnapshot::default());
        assert_close(norm.channel_signal(Channel::Sys), 0.6);
        assert_close(norm.channel_signal(Channel::Bt), 15.0 / 70.0);
        assert_close(
            norm.channel_signal(Channel::Net),
            (1.0 - 19.0 / 499.0 + 1.0) / 2.0,
        );
    }
}
