//! # Envelopes
//!
//! Every endpoint answers with the same shape, success or not.
//!
//! ```json
//! { "status": 200, "message": "success", "data": [...] }
//! { "status": 500, "message": "error", "data": "connection refused" }
//! ```
//!
//! `status` always mirrors the HTTP status code of the response.
use axum::http::StatusCode;
use serde::Serialize;

pub const SUCCESS: &str = "success";
pub const ERROR: &str = "error";

#[derive(Serialize, Debug)]
pub struct Envelope<T> {
    pub status: u16,
    pub message: &'static str,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            message: SUCCESS,
            data,
        }
    }
}

impl Envelope<String> {
    pub fn error(status: StatusCode, data: String) -> Self {
        Self {
            status: status.as_u16(),
            message: ERROR,
            data,
        }
    }
}
