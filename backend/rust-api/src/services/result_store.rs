use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::Database;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::metrics::{record_cache_hit, record_cache_miss, track_cache_operation, track_db_operation};
use crate::models::AttemptRecord;
use crate::utils::retry::RetryPolicy;

const RESULTS_COLLECTION: &str = "attempt_results";
/// Serialized name of `AttemptRecord::attempt_id`; one document per attempt.
const ATTEMPT_ID_FIELD: &str = "attemptId";

fn record_filter(attempt_id: &str) -> Document {
    doc! { ATTEMPT_ID_FIELD: attempt_id }
}

/// Persistence collaborator for submitted attempts.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn save(&self, record: &AttemptRecord) -> Result<()>;
    async fn find(&self, attempt_id: &str) -> Result<Option<AttemptRecord>>;

    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

/// MongoDB is the record of truth; Redis keeps recent results for review.
pub struct MongoResultStore {
    mongo: Database,
    redis: ConnectionManager,
    cache_ttl_seconds: u64,
    retry: RetryPolicy,
}

impl MongoResultStore {
    pub fn new(mongo: Database, redis: ConnectionManager, cache_ttl_seconds: u64) -> Self {
        Self {
            mongo,
            redis,
            cache_ttl_seconds,
            retry: RetryPolicy::persist(),
        }
    }

    fn cache_key(attempt_id: &str) -> String {
        format!("attempt:result:{}", attempt_id)
    }

    async fn cache(&self, record: &AttemptRecord) -> Result<()> {
        let mut conn = self.redis.clone();
        let json = serde_json::to_string(record).context("Failed to serialize attempt record")?;

        track_cache_operation("setex", async {
            redis::cmd("SETEX")
                .arg(Self::cache_key(&record.attempt_id))
                .arg(self.cache_ttl_seconds)
                .arg(json)
                .query_async::<()>(&mut conn)
                .await
                .context("Failed to cache attempt result in Redis")
        })
        .await
    }

    async fn cached(&self, attempt_id: &str) -> Result<Option<AttemptRecord>> {
        let mut conn = self.redis.clone();

        let cached: Option<String> = track_cache_operation("get", async {
            redis::cmd("GET")
                .arg(Self::cache_key(attempt_id))
                .query_async(&mut conn)
                .await
                .context("Failed to read attempt result from Redis")
        })
        .await?;

        cached
            .map(|json| serde_json::from_str(&json).context("Failed to deserialize cached result"))
            .transpose()
    }
}

#[async_trait]
impl ResultStore for MongoResultStore {
    async fn save(&self, record: &AttemptRecord) -> Result<()> {
        let collection: mongodb::Collection<AttemptRecord> =
            self.mongo.collection(RESULTS_COLLECTION);

        // Upsert keyed on the attempt id, so a retry after a lost reply
        // overwrites the same document instead of adding a second one.
        let collection = &collection;
        track_db_operation("replace_one", RESULTS_COLLECTION, async {
            self.retry
                .run(move || async move {
                    collection
                        .replace_one(record_filter(&record.attempt_id), record)
                        .upsert(true)
                        .await
                        .map(|_| ())
                })
                .await
                .context("Failed to upsert attempt result")
        })
        .await?;

        tracing::info!(
            "Attempt result saved: attempt={}, exam={}, score={}",
            record.attempt_id,
            record.exam_id,
            record.score
        );

        // Cache is best effort; Mongo already has the record.
        if let Err(e) = self.cache(record).await {
            tracing::warn!("Failed to cache attempt result {}: {:#}", record.attempt_id, e);
        }
        Ok(())
    }

    async fn find(&self, attempt_id: &str) -> Result<Option<AttemptRecord>> {
        match self.cached(attempt_id).await {
            Ok(Some(record)) => {
                record_cache_hit();
                return Ok(Some(record));
            }
            Ok(None) => record_cache_miss(),
            Err(e) => tracing::warn!("Result cache lookup failed for {}: {:#}", attempt_id, e),
        }

        let collection: mongodb::Collection<AttemptRecord> =
            self.mongo.collection(RESULTS_COLLECTION);
        track_db_operation("find_one", RESULTS_COLLECTION, async {
            collection
                .find_one(record_filter(attempt_id))
                .await
                .context("Failed to query attempt results")
        })
        .await
    }

    async fn health(&self) -> Result<()> {
        tokio::time::timeout(
            Duration::from_secs(1),
            self.mongo.run_command(doc! { "ping": 1 }),
        )
        .await
        .map_err(|_| anyhow!("MongoDB timeout after 1s"))?
        .context("MongoDB ping failed")?;

        let mut conn = self.redis.clone();
        tokio::time::timeout(
            Duration::from_millis(500),
            redis::cmd("PING").query_async::<String>(&mut conn),
        )
        .await
        .map_err(|_| anyhow!("Redis timeout after 500ms"))?
        .context("Redis ping failed")?;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryResultStore {
    records: RwLock<HashMap<String, AttemptRecord>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn save(&self, record: &AttemptRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.attempt_id.clone(), record.clone());
        Ok(())
    }

    async fn find(&self, attempt_id: &str) -> Result<Option<AttemptRecord>> {
        Ok(self.records.read().await.get(attempt_id).cloned())
    }
}
