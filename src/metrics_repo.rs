// SQLite store of scored load samples. Append-only from the core's
// perspective: the worker appends, everything else reads ranges.

use crate::models::{RawSample, ScoredSample};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

pub struct MetricsRepo {
    pool: SqlitePool,
    retention_ms: i64,
}

impl MetricsRepo {
    pub async fn connect(path: &str, retention_days: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new().connect_with(opts).await?;
        let retention_ms = (retention_days as i64) * 24 * 60 * 60 * 1000;
        Ok(Self { pool, retention_ms })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS load_samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at INTEGER NOT NULL,
                cpu_usage_percent REAL,
                memory_usage_bytes REAL,
                memory_capacity_bytes REAL,
                disk_read_kbs REAL,
                disk_write_kbs REAL,
                network_rx_kbs REAL,
                network_tx_kbs REAL,
                memory_usage_percent REAL,
                cpu_load_score REAL,
                disk_load_score REAL,
                network_load_score REAL,
                io_load_score REAL,
                overall_load_score REAL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_load_samples_created_at ON load_samples(created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self, sample), fields(repo = "metrics", operation = "append"))]
    pub async fn append(&self, sample: &ScoredSample) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO load_samples
            (created_at, cpu_usage_percent, memory_usage_bytes, memory_capacity_bytes,
             disk_read_kbs, disk_write_kbs, network_rx_kbs, network_tx_kbs,
             memory_usage_percent, cpu_load_score, disk_load_score,
             network_load_score, io_load_score, overall_load_score)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(sample.raw.timestamp)
        .bind(sample.raw.cpu_usage_percent)
        .bind(sample.raw.memory_usage_bytes)
        .bind(sample.raw.memory_capacity_bytes)
        .bind(sample.raw.disk_read_throughput_kbs)
        .bind(sample.raw.disk_write_throughput_kbs)
        .bind(sample.raw.network_received_throughput_kbs)
        .bind(sample.raw.network_transmitted_throughput_kbs)
        .bind(sample.memory_usage_percent)
        .bind(sample.cpu_load_score)
        .bind(sample.disk_load_score)
        .bind(sample.network_load_score)
        .bind(sample.io_load_score)
        .bind(sample.overall_load_score)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Samples in [from_ts, to_ts), ascending by created_at.
    #[instrument(skip(self), fields(repo = "metrics", operation = "range_query"))]
    pub async fn range_query(&self, from_ts: i64, to_ts: i64) -> anyhow::Result<Vec<ScoredSample>> {
        let rows = sqlx::query(
            "SELECT * FROM load_samples WHERE created_at >= $1 AND created_at < $2 ORDER BY created_at ASC",
        )
        .bind(from_ts)
        .bind(to_ts)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::parse_sample_row).collect()
    }

    /// Most recently appended sample, if any.
    pub async fn latest(&self) -> anyhow::Result<Option<ScoredSample>> {
        let row = sqlx::query("SELECT * FROM load_samples ORDER BY id DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::parse_sample_row).transpose()
    }

    /// Latest N samples, returned ascending by insertion order.
    #[instrument(skip(self), fields(repo = "metrics", operation = "latest_n"))]
    pub async fn latest_n(&self, limit: u32) -> anyhow::Result<Vec<ScoredSample>> {
        let rows = sqlx::query("SELECT * FROM load_samples ORDER BY id DESC LIMIT $1")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        let mut out: Vec<ScoredSample> = rows
            .iter()
            .map(Self::parse_sample_row)
            .collect::<anyhow::Result<_>>()?;
        out.reverse();
        Ok(out)
    }

    /// Mean overall load score over [from_ts, to_ts); None when the window
    /// holds no scored rows.
    pub async fn average_overall_load(
        &self,
        from_ts: i64,
        to_ts: i64,
    ) -> anyhow::Result<Option<f64>> {
        let avg = sqlx::query_scalar::<_, Option<f64>>(
            "SELECT AVG(overall_load_score) FROM load_samples WHERE created_at >= $1 AND created_at < $2",
        )
        .bind(from_ts)
        .bind(to_ts)
        .fetch_one(&self.pool)
        .await?;
        Ok(avg)
    }

    pub async fn count(&self) -> anyhow::Result<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM load_samples")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Delete samples older than the configured retention. Returns rows deleted.
    #[instrument(skip(self), fields(repo = "metrics", operation = "prune_old_samples"))]
    pub async fn prune_old_samples(&self) -> anyhow::Result<u64> {
        let cutoff = (std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)?
            .as_millis() as i64)
            - self.retention_ms;
        let r = sqlx::query("DELETE FROM load_samples WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected())
    }

    /// Reclaim space after deletes (run periodically after pruning).
    #[instrument(skip(self), fields(repo = "metrics", operation = "vacuum"))]
    pub async fn vacuum(&self) -> anyhow::Result<()> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }

    fn parse_sample_row(row: &SqliteRow) -> anyhow::Result<ScoredSample> {
        let created_at: i64 = row.try_get("created_at")?;
        Ok(ScoredSample {
            raw: RawSample {
                timestamp: created_at,
                cpu_usage_percent: row.try_get("cpu_usage_percent")?,
                memory_usage_bytes: row.try_get("memory_usage_bytes")?,
                memory_capacity_bytes: row.try_get("memory_capacity_bytes")?,
                disk_read_throughput_kbs: row.try_get("disk_read_kbs")?,
                disk_write_throughput_kbs: row.try_get("disk_write_kbs")?,
                network_received_throughput_kbs: row.try_get("network_rx_kbs")?,
                network_transmitted_throughput_kbs: row.try_get("network_tx_kbs")?,
            },
            memory_usage_percent: row.try_get("memory_usage_percent")?,
            cpu_load_score: row.try_get("cpu_load_score")?,
            disk_load_score: row.try_get("disk_load_score")?,
            network_load_score: row.try_get("network_load_score")?,
            io_load_score: row.try_get("io_load_score")?,
            overall_load_score: row.try_get("overall_load_score")?,
        })
    }
}
