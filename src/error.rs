use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OfflineError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Replay failed for '{key}': {source}")]
    Replay {
        key: String,
        #[source]
        source: ReplayError,
    },

    #[error("Cache entry '{0}' not found")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type OfflineResult<T> = Result<T, OfflineError>;

/// Failure reported by a single replayer during a sync pass.
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("remote rejected batch with status {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("{0}")]
    Other(String),
}

impl ReplayError {
    pub fn other(msg: impl Into<String>) -> Self {
        ReplayError::Other(msg.into())
    }
}

impl serde::Serialize for OfflineError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl From<rocksdb::Error> for OfflineError {
    fn from(err: rocksdb::Error) -> Self {
        OfflineError::Storage(err.to_string())
    }
}

impl IntoResponse for OfflineError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            OfflineError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            OfflineError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            OfflineError::Serialization(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            OfflineError::Replay { .. } => (StatusCode::BAD_GATEWAY, self.to_string()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16(),
            "type": format!("{:?}", self).split([' ', '(', '{']).next().unwrap_or("Error")
        });

        (status, Json(body)).into_response()
    }
}
