use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::json;
use shared::shared_wheel_game::WheelError;
use tracing::error;

use crate::storage::StorageError;

#[derive(Debug)]
pub enum Error {
    Wheel(WheelError),
    Storage(StorageError),
}

impl From<WheelError> for Error {
    fn from(err: WheelError) -> Self {
        Error::Wheel(err)
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Error::Storage(err)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            Error::Wheel(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            Error::Storage(e) => {
                error!("Storage failure: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
