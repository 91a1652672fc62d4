use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pack_manager_services::services::profile_store::{ProfileError, ProfileErrorKind};
use pack_manager_utils::response::ApiResponse;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Profile(e) => match e.kind() {
                ProfileErrorKind::NotFound => StatusCode::NOT_FOUND,
                ProfileErrorKind::InvalidName => StatusCode::BAD_REQUEST,
                ProfileErrorKind::AlreadyExists => StatusCode::CONFLICT,
                ProfileErrorKind::Parse | ProfileErrorKind::Schema | ProfileErrorKind::Io => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }

        (status, Json(ApiResponse::<()>::error(&self.to_string()))).into_response()
    }
}
