use crate::doc_processor::ExtractError;
use crate::vector_index::IndexError;
use crate::session::SessionError;
use axum::http::StatusCode;

/// Everything a user action can fail with. None of these end the process;
/// the page is re-rendered with the message.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Extract(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Index(IndexError::Empty) => StatusCode::BAD_REQUEST,
            AppError::Index(_) => StatusCode::BAD_GATEWAY,
            AppError::Session(SessionError::NotReady) => StatusCode::CONFLICT,
            AppError::Session(SessionError::EmptyQuestion) => StatusCode::BAD_REQUEST,
            AppError::Session(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
