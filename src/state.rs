use std::sync::Arc;

use mongodb::bson::Document;

use super::{
    config::Config,
    database::{DocumentStore, MongoStore, Pagination, with_deadline},
    error::StoreError,
};

pub struct State {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
}

impl State {
    pub async fn new(config: Config) -> Result<Arc<Self>, StoreError> {
        let store = MongoStore::connect(&config.mongodb_uri, &config.database).await?;

        Ok(Self::with_store(config, Arc::new(store)))
    }

    pub fn with_store(config: Config, store: Arc<dyn DocumentStore>) -> Arc<Self> {
        Arc::new(Self { config, store })
    }

    pub async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        with_deadline(
            self.config.request_timeout,
            self.store.aggregate(collection, pipeline),
        )
        .await
    }

    pub async fn find(
        &self,
        collection: &str,
        filter: Document,
        page: Option<Pagination>,
    ) -> Result<Vec<Document>, StoreError> {
        with_deadline(
            self.config.request_timeout,
            self.store.find(collection, filter, page),
        )
        .await
    }

    pub async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, StoreError> {
        with_deadline(
            self.config.request_timeout,
            self.store.find_one(collection, filter),
        )
        .await
    }
}
