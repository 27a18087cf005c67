// Metrics store: append, range reads, aggregates, pruning

mod common;

use common::{scored_sample, temp_repo};
use loadwatch::metrics_repo::MetricsRepo;

#[tokio::test]
async fn append_and_read_back_round_trips_fields() {
    let dir = tempfile::TempDir::new().unwrap();
    let repo = temp_repo(&dir).await;

    let sample = scored_sample(1_000);
    repo.append(&sample).await.unwrap();

    let got = repo.latest().await.unwrap().expect("sample stored");
    assert_eq!(got.raw.timestamp, 1_000);
    assert_eq!(got.raw.cpu_usage_percent, sample.raw.cpu_usage_percent);
    assert_eq!(got.memory_usage_percent, sample.memory_usage_percent);
    assert_eq!(got.overall_load_score, sample.overall_load_score);
}

#[tokio::test]
async fn range_query_is_half_open_and_ascending() {
    let dir = tempfile::TempDir::new().unwrap();
    let repo = temp_repo(&dir).await;

    for ts in [3_000, 1_000, 2_000, 4_000] {
        repo.append(&scored_sample(ts)).await.unwrap();
    }

    let got = repo.range_query(1_000, 4_000).await.unwrap();
    let timestamps: Vec<i64> = got.iter().map(|s| s.raw.timestamp).collect();
    assert_eq!(timestamps, vec![1_000, 2_000, 3_000]);
}

#[tokio::test]
async fn latest_n_returns_newest_in_ascending_order() {
    let dir = tempfile::TempDir::new().unwrap();
    let repo = temp_repo(&dir).await;

    for ts in 1..=5 {
        repo.append(&scored_sample(ts * 1_000)).await.unwrap();
    }

    let got = repo.latest_n(3).await.unwrap();
    let timestamps: Vec<i64> = got.iter().map(|s| s.raw.timestamp).collect();
    assert_eq!(timestamps, vec![3_000, 4_000, 5_000]);
}

#[tokio::test]
async fn average_overall_load_over_window() {
    let dir = tempfile::TempDir::new().unwrap();
    let repo = temp_repo(&dir).await;

    assert_eq!(repo.average_overall_load(0, 10_000).await.unwrap(), None);

    repo.append(&scored_sample(1_000)).await.unwrap();
    repo.append(&scored_sample(2_000)).await.unwrap();

    let expected = scored_sample(0).overall_load_score.unwrap();
    let avg = repo.average_overall_load(0, 10_000).await.unwrap().unwrap();
    assert!((avg - expected).abs() < 1e-9);
}

#[tokio::test]
async fn prune_removes_samples_past_retention() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("metrics.db");
    // 1-day retention
    let repo = MetricsRepo::connect(path.to_str().unwrap(), 1).await.unwrap();
    repo.init().await.unwrap();

    let now = chrono::Local::now().timestamp_millis();
    repo.append(&scored_sample(now)).await.unwrap();
    repo.append(&scored_sample(now - 2 * 24 * 3_600_000)).await.unwrap();

    let pruned = repo.prune_old_samples().await.unwrap();
    assert_eq!(pruned, 1);
    assert_eq!(repo.count().await.unwrap(), 1);
    repo.vacuum().await.unwrap();
}
