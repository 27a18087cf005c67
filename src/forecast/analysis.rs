// Stateless analysis of a parsed prediction series: anomaly flag and
// ranked textual recommendations.

use crate::models::PredictionPoint;

/// Any predicted point above this flags the series as anomalous.
pub const ANOMALY_THRESHOLD: f64 = 90.0;

const SCALE_UP_THRESHOLD: f64 = 85.0;
const MONITOR_THRESHOLD: f64 = 70.0;
const SCALE_DOWN_THRESHOLD: f64 = 30.0;
const TREND_THRESHOLD: f64 = 20.0;

/// True iff any point's predicted value exceeds the anomaly threshold.
pub fn detect_anomaly(points: &[PredictionPoint]) -> bool {
    points
        .iter()
        .any(|p| p.predicted_value > ANOMALY_THRESHOLD)
}

/// Guidance from the series' final value, plus a trend note when the series
/// moved by more than the trend threshold end to end.
pub fn recommendations(points: &[PredictionPoint], period: &str) -> Vec<String> {
    let mut out = Vec::new();
    let Some(last) = points.last() else {
        return out;
    };
    let v = last.predicted_value;

    if v > SCALE_UP_THRESHOLD {
        out.push(format!(
            "High system load predicted for {} ({:.1}%). Consider scaling up resources.",
            period, v
        ));
    } else if v > MONITOR_THRESHOLD {
        out.push(format!(
            "Moderate system load predicted for {} ({:.1}%). Monitor resource usage closely.",
            period, v
        ));
    } else if v < SCALE_DOWN_THRESHOLD {
        out.push(format!(
            "Low system load predicted for {} ({:.1}%). Consider scaling down to optimize costs.",
            period, v
        ));
    } else {
        out.push(format!(
            "Normal system load predicted for {} ({:.1}%). Current resource allocation appears adequate.",
            period, v
        ));
    }

    if points.len() > 1 {
        let trend = v - points[0].predicted_value;
        if trend > TREND_THRESHOLD {
            out.push(
                "Increasing load trend detected. Prepare for potential resource scaling.".into(),
            );
        } else if trend < -TREND_THRESHOLD {
            out.push("Decreasing load trend detected. Resources may be over-provisioned.".into());
        }
    }

    out
}
