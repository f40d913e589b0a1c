//! HTTP client wrapper for the estate API.

mod client;
mod error;
mod pipeline;

use serde::{Deserialize, Serialize};

pub use client::{ApiClient, USER_AGENT};
pub use error::{
    ApiError, ApiErrorKind, ApiResult, GENERIC_NETWORK_MESSAGE, classify_reqwest_error,
};
pub use pipeline::{BearerAuth, LogoutOnUnauthorized, Pipeline, RequestStage, ResponseStage};

/// Success body wrapper: `{ "data": ..., "message": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn into_data(self) -> T {
        self.data
    }
}
