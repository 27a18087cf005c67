// Load scoring: raw counters -> bounded [0,100] per-resource and composite scores.
// Pure functions, no I/O. Absent inputs skip their derived field.

use crate::models::{RawSample, ScoredSample};

/// Disk band edges in KB/s: 1 MB/s, 10 MB/s, 50 MB/s, 100 MB/s.
const DISK_BANDS: [f64; 4] = [1_024.0, 10_240.0, 51_200.0, 102_400.0];

/// Network band edges in KB/s: 1 / 10 / 50 / 100 Mbps.
const NETWORK_BANDS: [f64; 4] = [128.0, 1_280.0, 6_400.0, 12_800.0];

/// rx/tx ratio difference above which traffic counts as one-directional.
const IMBALANCE_THRESHOLD: f64 = 0.8;
const IMBALANCE_MULTIPLIER: f64 = 1.1;

/// Derive all load scores from a raw sample. Idempotent: the same raw values
/// always yield the same scores.
pub fn score(raw: &RawSample) -> ScoredSample {
    let memory_usage_percent = match (raw.memory_usage_bytes, raw.memory_capacity_bytes) {
        (Some(used), Some(cap)) if cap > 0.0 => Some(((used / cap) * 100.0).clamp(0.0, 100.0)),
        _ => None,
    };

    // CPU usage is already a 0-100 percentage; clamp out-of-range readings.
    let cpu_load_score = raw.cpu_usage_percent.map(|v| v.clamp(0.0, 100.0));

    let disk_load_score = match (raw.disk_read_throughput_kbs, raw.disk_write_throughput_kbs) {
        (Some(read), Some(write)) => {
            let total = read.max(0.0) + write.max(0.0);
            Some(banded_score(total, &DISK_BANDS))
        }
        _ => None,
    };

    let network_load_score = network_score(
        raw.network_received_throughput_kbs,
        raw.network_transmitted_throughput_kbs,
    );

    let io_load_score = match (disk_load_score, network_load_score) {
        (Some(d), Some(n)) => Some(d * 0.6 + n * 0.4),
        (Some(d), None) => Some(d),
        (None, Some(n)) => Some(n),
        (None, None) => None,
    };

    // Weighted composite. Missing disk/network terms contribute 0 rather than
    // renormalizing the remaining weights (see DESIGN.md).
    let overall_load_score = match (cpu_load_score, memory_usage_percent, io_load_score) {
        (Some(cpu), Some(mem), Some(_)) => Some(
            (cpu * 0.35
                + mem * 0.35
                + disk_load_score.unwrap_or(0.0) * 0.2
                + network_load_score.unwrap_or(0.0) * 0.1)
                .clamp(0.0, 100.0),
        ),
        _ => None,
    };

    ScoredSample {
        raw: raw.clone(),
        memory_usage_percent,
        cpu_load_score,
        disk_load_score,
        network_load_score,
        io_load_score,
        overall_load_score,
    }
}

/// Piecewise-linear mapping of total throughput through four bands, each
/// worth 25 points; clips at 100 above the top edge.
fn banded_score(total: f64, bands: &[f64; 4]) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    let score = if total <= bands[0] {
        (total / bands[0]) * 25.0
    } else if total <= bands[1] {
        25.0 + ((total - bands[0]) / (bands[1] - bands[0])) * 25.0
    } else if total <= bands[2] {
        50.0 + ((total - bands[1]) / (bands[2] - bands[1])) * 25.0
    } else if total <= bands[3] {
        75.0 + ((total - bands[2]) / (bands[3] - bands[2])) * 25.0
    } else {
        100.0
    };
    score.clamp(0.0, 100.0)
}

/// Banded network score with a one-directional-saturation bump: a heavily
/// imbalanced flow (large download or upload) above the medium band is
/// treated as higher pressure than balanced traffic of equal magnitude.
fn network_score(rx_kbs: Option<f64>, tx_kbs: Option<f64>) -> Option<f64> {
    let (rx, tx) = match (rx_kbs, tx_kbs) {
        (Some(rx), Some(tx)) => (rx.max(0.0), tx.max(0.0)),
        _ => return None,
    };
    let total = rx + tx;
    if total <= 0.0 {
        return Some(0.0);
    }

    let mut score = banded_score(total, &NETWORK_BANDS);

    let imbalance = ((rx / total) - (tx / total)).abs();
    if imbalance > IMBALANCE_THRESHOLD && total > NETWORK_BANDS[1] {
        score = (score * IMBALANCE_MULTIPLIER).min(100.0);
    }

    Some(score.clamp(0.0, 100.0))
}
