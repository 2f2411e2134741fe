use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::Database;
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::time::Duration;

use crate::metrics::track_db_operation;
use crate::models::Exam;

/// Source of exam documents. Returns `Ok(None)` when the exam does not exist.
#[async_trait]
pub trait ExamCatalog: Send + Sync {
    async fn fetch_exam(&self, exam_id: &str) -> Result<Option<Exam>>;

    /// Cheap reachability check for `/health`.
    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

pub struct MongoExamCatalog {
    mongo: Database,
}

impl MongoExamCatalog {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }
}

#[async_trait]
impl ExamCatalog for MongoExamCatalog {
    async fn fetch_exam(&self, exam_id: &str) -> Result<Option<Exam>> {
        let collection: mongodb::Collection<Exam> = self.mongo.collection("exams");

        let exam = track_db_operation("find_one", "exams", async {
            collection
                .find_one(doc! { "_id": exam_id })
                .await
                .context("Failed to query exams collection")
        })
        .await?;

        if let Some(ref exam) = exam {
            tracing::info!(
                "Loaded exam {} ({} questions) from MongoDB",
                exam.id,
                exam.questions.len()
            );
        }
        Ok(exam)
    }

    async fn health(&self) -> Result<()> {
        tokio::time::timeout(
            Duration::from_secs(1),
            self.mongo.run_command(doc! { "ping": 1 }),
        )
        .await
        .map_err(|_| anyhow!("MongoDB timeout after 1s"))?
        .context("MongoDB ping failed")?;
        Ok(())
    }
}

/// Fetches exams from the CRUD API (`GET {base}/api/exams/{id}`).
pub struct HttpExamCatalog {
    http_client: Client,
    base_url: String,
}

impl HttpExamCatalog {
    pub fn new(base_url: String) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ExamCatalog for HttpExamCatalog {
    async fn fetch_exam(&self, exam_id: &str) -> Result<Option<Exam>> {
        let url = format!("{}/api/exams/{}", self.base_url, exam_id);
        tracing::debug!("Fetching exam from API: {}", url);

        let response = self
            .http_client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .context("Failed to call exam API")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("Exam API returned error {}: {}", status, error_text));
        }

        let exam: Exam = response
            .json()
            .await
            .context("Failed to parse exam API response")?;

        tracing::info!(
            "Loaded exam {} ({} questions) from API",
            exam.id,
            exam.questions.len()
        );
        Ok(Some(exam))
    }
}

/// Fixed set of exams held in memory.
#[derive(Default)]
pub struct InMemoryExamCatalog {
    exams: HashMap<String, Exam>,
}

impl InMemoryExamCatalog {
    pub fn new(exams: impl IntoIterator<Item = Exam>) -> Self {
        Self {
            exams: exams.into_iter().map(|e| (e.id.clone(), e)).collect(),
        }
    }
}

#[async_trait]
impl ExamCatalog for InMemoryExamCatalog {
    async fn fetch_exam(&self, exam_id: &str) -> Result<Option<Exam>> {
        Ok(self.exams.get(exam_id).cloned())
    }
}
