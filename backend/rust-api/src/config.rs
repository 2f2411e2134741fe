use serde::Deserialize;
use std::env;

/// Where exam documents are loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamSource {
    Mongo,
    Http,
}

impl ExamSource {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Some(ExamSource::Mongo),
            "http" | "api" => Some(ExamSource::Http),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub mongo_uri: String,
    pub mongo_database: String,
    pub redis_uri: String,
    pub exam_source: ExamSource,
    pub exam_api_url: String,
    pub timer_tick_ms: u64,
    pub result_cache_ttl_seconds: u64,
    /// How long a submitted attempt stays in memory before lookups go to the result store.
    pub attempt_retention_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8081".to_string(),
            mongo_uri: "mongodb://localhost:27017".to_string(),
            mongo_database: "mockexam".to_string(),
            redis_uri: "redis://127.0.0.1:6379/0".to_string(),
            exam_source: ExamSource::Mongo,
            exam_api_url: "http://localhost:5000".to_string(),
            timer_tick_ms: 1000,
            result_cache_ttl_seconds: 86400,
            attempt_retention_seconds: 300,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first, then the crate-local one
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/*.toml + APP__* overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", app_env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let defaults = Config::default();

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or(defaults.bind_addr);

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or(defaults.mongo_uri);

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or(defaults.mongo_database);

        let redis_uri = settings
            .get_string("redis.uri")
            .or_else(|_| env::var("REDIS_URI"))
            .unwrap_or_else(|_| {
                let host = env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
                let port = env::var("REDIS_PORT").unwrap_or_else(|_| "6379".to_string());
                match env::var("REDIS_PASSWORD") {
                    Ok(password) => format!("redis://:{}@{}:{}/0", password, host, port),
                    Err(_) => format!("redis://{}:{}/0", host, port),
                }
            });

        let exam_source_raw = settings
            .get_string("exams.source")
            .or_else(|_| env::var("EXAM_SOURCE"))
            .unwrap_or_else(|_| "mongo".to_string());
        let exam_source = ExamSource::parse(&exam_source_raw).ok_or_else(|| {
            config::ConfigError::Message(format!("unknown exam source: {}", exam_source_raw))
        })?;

        let exam_api_url = settings
            .get_string("exams.api_url")
            .or_else(|_| env::var("EXAM_API_URL"))
            .unwrap_or(defaults.exam_api_url);

        let timer_tick_ms = settings
            .get_int("timer.tick_ms")
            .ok()
            .map(|v| v as u64)
            .or_else(|| env::var("TIMER_TICK_MS").ok().and_then(|v| v.parse().ok()))
            .filter(|v| *v > 0)
            .unwrap_or(defaults.timer_tick_ms);

        let result_cache_ttl_seconds = settings
            .get_int("results.cache_ttl_seconds")
            .ok()
            .map(|v| v as u64)
            .or_else(|| {
                env::var("RESULT_CACHE_TTL_SECONDS")
                    .ok()
                    .and_then(|v| v.parse().ok())
            })
            .filter(|v| *v > 0)
            .unwrap_or(defaults.result_cache_ttl_seconds);

        let attempt_retention_seconds = settings
            .get_int("attempts.retention_seconds")
            .ok()
            .and_then(|v| u64::try_from(v).ok())
            .or_else(|| {
                env::var("ATTEMPT_RETENTION_SECONDS")
                    .ok()
                    .and_then(|v| v.parse().ok())
            })
            .unwrap_or(defaults.attempt_retention_seconds);

        Ok(Config {
            bind_addr,
            mongo_uri,
            mongo_database,
            redis_uri,
            exam_source,
            exam_api_url,
            timer_tick_ms,
            result_cache_ttl_seconds,
            attempt_retention_seconds,
        })
    }
}
