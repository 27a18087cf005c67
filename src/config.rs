use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub collector: CollectorConfig,
    pub forecast: ForecastConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_retention_days() -> u32 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    pub sample_interval_secs: u64,
    /// How often to log app stats (samples saved/pruned) at INFO level.
    pub stats_log_interval_secs: u64,
    /// How often to prune retention-expired samples and stale artifacts.
    pub prune_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastConfig {
    /// Base URL of the forecasting engine, e.g. "http://ml-models:8010".
    pub engine_url: String,
    /// Directory for training handoff artifacts.
    pub export_dir: String,
    /// Artifacts older than this are deleted on the prune tick.
    #[serde(default = "default_export_ttl_hours")]
    pub export_ttl_hours: u64,
    #[serde(default = "default_health_timeout_secs")]
    pub health_timeout_secs: u64,
    #[serde(default = "default_train_timeout_secs")]
    pub train_timeout_secs: u64,
    #[serde(default = "default_predict_timeout_secs")]
    pub predict_timeout_secs: u64,
    /// Consecutive engine failures before the circuit opens.
    #[serde(default = "default_breaker_failure_threshold")]
    pub breaker_failure_threshold: u32,
    #[serde(default = "default_breaker_cooldown_secs")]
    pub breaker_cooldown_secs: u64,
}

fn default_export_ttl_hours() -> u64 {
    24
}

fn default_health_timeout_secs() -> u64 {
    5
}

fn default_train_timeout_secs() -> u64 {
    600
}

fn default_predict_timeout_secs() -> u64 {
    120
}

fn default_breaker_failure_threshold() -> u32 {
    3
}

fn default_breaker_cooldown_secs() -> u64 {
    30
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.retention_days > 0,
            "database.retention_days must be > 0, got {}",
            self.database.retention_days
        );
        anyhow::ensure!(
            self.collector.sample_interval_secs > 0,
            "collector.sample_interval_secs must be > 0, got {}",
            self.collector.sample_interval_secs
        );
        anyhow::ensure!(
            self.collector.stats_log_interval_secs > 0,
            "collector.stats_log_interval_secs must be > 0, got {}",
            self.collector.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.collector.prune_interval_secs > 0,
            "collector.prune_interval_secs must be > 0, got {}",
            self.collector.prune_interval_secs
        );
        anyhow::ensure!(
            self.forecast.engine_url.starts_with("http://")
                || self.forecast.engine_url.starts_with("https://"),
            "forecast.engine_url must be an http(s) URL, got '{}'",
            self.forecast.engine_url
        );
        anyhow::ensure!(
            !self.forecast.export_dir.is_empty(),
            "forecast.export_dir must be non-empty"
        );
        anyhow::ensure!(
            self.forecast.export_ttl_hours > 0,
            "forecast.export_ttl_hours must be > 0, got {}",
            self.forecast.export_ttl_hours
        );
        anyhow::ensure!(
            self.forecast.health_timeout_secs > 0,
            "forecast.health_timeout_secs must be > 0, got {}",
            self.forecast.health_timeout_secs
        );
        anyhow::ensure!(
            self.forecast.train_timeout_secs > 0,
            "forecast.train_timeout_secs must be > 0, got {}",
            self.forecast.train_timeout_secs
        );
        anyhow::ensure!(
            self.forecast.predict_timeout_secs > 0,
            "forecast.predict_timeout_secs must be > 0, got {}",
            self.forecast.predict_timeout_secs
        );
        anyhow::ensure!(
            self.forecast.breaker_failure_threshold > 0,
            "forecast.breaker_failure_threshold must be > 0, got {}",
            self.forecast.breaker_failure_threshold
        );
        anyhow::ensure!(
            self.forecast.breaker_cooldown_secs > 0,
            "forecast.breaker_cooldown_secs must be > 0, got {}",
            self.forecast.breaker_cooldown_secs
        );
        Ok(())
    }
}
