use mongodb::bson::{Bson, Document, oid::ObjectId};
use serde::de::DeserializeOwned;

use crate::{database::Pagination, error::AppError, models::FilterFields};

pub const OFFSET: &str = "offset";

/// Keeps the declared fields only, first occurrence wins. Id fields match as
/// object ids when the value parses as one.
pub fn filter_query(params: &[(String, String)], fields: &FilterFields) -> Document {
    let mut filter = Document::new();

    for (key, value) in params {
        if filter.contains_key(key) {
            continue;
        }

        let field = key.as_str();
        let value = if fields.text.contains(&field) {
            Bson::String(value.clone())
        } else if fields.ids.contains(&field) {
            ObjectId::parse_str(value)
                .map(Bson::ObjectId)
                .unwrap_or_else(|_| Bson::String(value.clone()))
        } else {
            continue;
        };

        filter.insert(key.clone(), value);
    }

    filter
}

pub fn pagination(params: &[(String, String)], limit: i64) -> Result<Pagination, AppError> {
    let skip = match params.iter().find(|(key, _)| key == OFFSET) {
        Some((_, value)) if !value.is_empty() => value
            .parse()
            .map_err(|_| AppError::InvalidOffset(value.clone()))?,
        _ => 0,
    };

    Ok(Pagination { skip, limit })
}

pub fn parse_object_id(id: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(id).map_err(|_| AppError::InvalidId(id.to_string()))
}

pub fn decode<T: DeserializeOwned>(document: Document) -> Result<T, AppError> {
    Ok(mongodb::bson::from_document(document)?)
}

/// One bad document fails the whole batch.
pub fn decode_all<T: DeserializeOwned>(documents: Vec<Document>) -> Result<Vec<T>, AppError> {
    documents.into_iter().map(decode).collect()
}
