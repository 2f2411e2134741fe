use crate::config::{Config, ExamSource};
use mongodb::Client as MongoClient;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use std::time::Duration;

use attempt_service::AttemptRegistry;
use exam_catalog::{ExamCatalog, HttpExamCatalog, MongoExamCatalog};
use result_store::{MongoResultStore, ResultStore};

pub struct AppState {
    pub config: Config,
    pub attempts: AttemptRegistry,
}

impl AppState {
    pub fn new(
        config: Config,
        exams: Arc<dyn ExamCatalog>,
        results: Arc<dyn ResultStore>,
    ) -> Self {
        Self {
            attempts: AttemptRegistry::new(
                exams,
                results,
                Duration::from_millis(config.timer_tick_ms),
                Duration::from_secs(config.attempt_retention_seconds),
            ),
            config,
        }
    }

    /// Builds the production collaborators: MongoDB for exams and results,
    /// Redis for the review cache, optionally the exam API for questions.
    pub async fn connect(config: Config, mongo_client: MongoClient) -> anyhow::Result<Self> {
        let mongo = mongo_client.database(&config.mongo_database);

        tracing::info!("Attempting to connect to Redis...");
        let redis_client = redis::Client::open(config.redis_uri.clone())?;

        let redis = tokio::time::timeout(
            Duration::from_secs(30),
            ConnectionManager::new(redis_client),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis connection timeout after 30s"))??;

        let mut conn = redis.clone();
        tokio::time::timeout(
            Duration::from_secs(5),
            redis::cmd("PING").query_async::<String>(&mut conn),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis PING timeout after 5s"))??;

        tracing::info!("Redis connection established successfully");

        let exams: Arc<dyn ExamCatalog> = match config.exam_source {
            ExamSource::Mongo => Arc::new(MongoExamCatalog::new(mongo.clone())),
            ExamSource::Http => Arc::new(HttpExamCatalog::new(config.exam_api_url.clone())),
        };
        tracing::info!("Exam source: {:?}", config.exam_source);

        let results: Arc<dyn ResultStore> = Arc::new(MongoResultStore::new(
            mongo,
            redis,
            config.result_cache_ttl_seconds,
        ));

        Ok(Self::new(config, exams, results))
    }
}

pub mod attempt_service;
pub mod exam_catalog;
pub mod result_store;
