//! # MongoDB
//!
//! Document store holding the scraped catalog.
//!
//! ## Collections
//!
//! - `courses`: one document per catalog course, `sections` holds section ids
//! - `sections`: one document per offered section, `professors` holds professor ids
//! - `professors`: one document per instructor
//! - `evaluations`: course evaluation results, keyed by `section`
//!
//! ## Access
//!
//! Handlers never touch the driver directly. They go through [`DocumentStore`],
//! which exposes the three operations the API needs: aggregation pipelines,
//! paginated finds, and single-document lookups. The production handle is
//! [`MongoStore`], built once at startup and injected through the router state.
//!
//! The request timeout is applied by the caller, see [`with_deadline`].
use std::{future::Future, time::Duration};

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    Client, Database,
    bson::{Document, doc},
    options::FindOptions,
};
use tokio::time::timeout;
use tracing::debug;

use crate::error::StoreError;

pub const COURSES: &str = "courses";
pub const SECTIONS: &str = "sections";
pub const PROFESSORS: &str = "professors";
pub const EVALUATIONS: &str = "evaluations";

const PING_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub skip: u64,
    pub limit: i64,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> Result<Vec<Document>, StoreError>;

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        page: Option<Pagination>,
    ) -> Result<Vec<Document>, StoreError>;

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, StoreError>;
}

pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database_name: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let database = client.database(database_name);

        with_deadline(PING_TIMEOUT, async {
            database.run_command(doc! { "ping": 1 }).await?;
            Ok::<_, StoreError>(())
        })
        .await?;

        debug!("Connected to MongoDB database {database_name}");

        Ok(Self { database })
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        let cursor = self
            .database
            .collection::<Document>(collection)
            .aggregate(pipeline)
            .await?;

        Ok(cursor.try_collect().await?)
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        page: Option<Pagination>,
    ) -> Result<Vec<Document>, StoreError> {
        let mut options = FindOptions::default();
        if let Some(page) = page {
            options.skip = Some(page.skip);
            options.limit = Some(page.limit);
        }

        let cursor = self
            .database
            .collection::<Document>(collection)
            .find(filter)
            .with_options(options)
            .await?;

        Ok(cursor.try_collect().await?)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .database
            .collection::<Document>(collection)
            .find_one(filter)
            .await?)
    }
}

/// Bounds a store call; an elapsed deadline becomes [`StoreError::Timeout`].
pub async fn with_deadline<T, F>(deadline: Duration, operation: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    timeout(deadline, operation)
        .await
        .map_err(|_| StoreError::Timeout(deadline))?
}
