use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use locus_core::LocusError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Locus(#[from] LocusError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            AppError::Locus(LocusError::InvalidCoordinate { .. }) => StatusCode::BAD_REQUEST,
            AppError::Locus(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}
