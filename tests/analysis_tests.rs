// Anomaly threshold and recommendation tiers

use loadwatch::forecast::analysis::{detect_anomaly, recommendations};
use loadwatch::models::PredictionPoint;

fn series(values: &[f64]) -> Vec<PredictionPoint> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| PredictionPoint {
            timestamp: format!("2025-06-01T00:{:02}:00", i),
            predicted_value: v,
            lower_bound: v - 5.0,
            upper_bound: v + 5.0,
        })
        .collect()
}

#[test]
fn anomaly_requires_strictly_above_ninety() {
    assert!(!detect_anomaly(&series(&[50.0, 90.0])));
    assert!(detect_anomaly(&series(&[50.0, 90.01])));
    // any point trips it, not just the last
    assert!(detect_anomaly(&series(&[95.0, 40.0])));
    assert!(!detect_anomaly(&series(&[])));
}

#[test]
fn high_load_recommends_scaling_up() {
    let recs = recommendations(&series(&[80.0, 88.0]), "1 hour");
    assert_eq!(recs.len(), 1);
    assert_eq!(
        recs[0],
        "High system load predicted for 1 hour (88.0%). Consider scaling up resources."
    );
}

#[test]
fn moderate_load_recommends_monitoring() {
    let recs = recommendations(&series(&[70.5]), "6 hours");
    assert_eq!(recs.len(), 1);
    assert!(recs[0].starts_with("Moderate system load predicted for 6 hours (70.5%)."));
}

#[test]
fn low_load_recommends_scaling_down() {
    let recs = recommendations(&series(&[25.0]), "24 hours");
    assert_eq!(
        recs[0],
        "Low system load predicted for 24 hours (25.0%). Consider scaling down to optimize costs."
    );
}

#[test]
fn mid_range_load_is_normal() {
    // band edges: 70.0 is not moderate, 30.0 is not low
    for v in [30.0, 50.0, 70.0] {
        let recs = recommendations(&series(&[v]), "1 hour");
        assert!(recs[0].starts_with("Normal system load predicted"), "{}", v);
    }
}

#[test]
fn trend_notes_need_more_than_twenty_points_of_drift() {
    let recs = recommendations(&series(&[40.0, 60.0]), "1 hour");
    assert_eq!(recs.len(), 1, "exactly 20 is not a trend");

    let recs = recommendations(&series(&[40.0, 60.5]), "1 hour");
    assert_eq!(recs.len(), 2);
    assert_eq!(
        recs[1],
        "Increasing load trend detected. Prepare for potential resource scaling."
    );

    let recs = recommendations(&series(&[60.5, 40.0]), "1 hour");
    assert_eq!(recs.len(), 2);
    assert_eq!(
        recs[1],
        "Decreasing load trend detected. Resources may be over-provisioned."
    );
}

#[test]
fn single_point_series_never_reports_a_trend() {
    let recs = recommendations(&series(&[95.0]), "1 hour");
    assert_eq!(recs.len(), 1);
}

#[test]
fn empty_series_yields_no_recommendations() {
    assert!(recommendations(&series(&[]), "1 hour").is_empty());
}
