use std::time::Duration;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mongodb::bson;
use thiserror::Error;
use tracing::error;

use crate::responses::Envelope;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(String),

    #[error("Invalid {key} value: {reason}")]
    Invalid { key: String, reason: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Store request timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Malformed document: {0}")]
    MalformedRow(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Offset is not type integer: {0}")]
    InvalidOffset(String),

    #[error("{0} not found")]
    NotFound(&'static str),
}

impl From<bson::de::Error> for AppError {
    fn from(e: bson::de::Error) -> Self {
        AppError::MalformedRow(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Store { .. } | AppError::MalformedRow { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::InvalidId { .. } | AppError::InvalidOffset { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
        };

        if status.is_server_error() {
            error!("Request failed: {self}");
        }

        (status, Json(Envelope::error(status, self.to_string()))).into_response()
    }
}
