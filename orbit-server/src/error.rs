use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use orbit_api_schema::error::{ApiErrorBody, ApiErrorCode};

/// Error returned by gates and handlers. Only the class and a short message
/// reach the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    Forbidden(String),
    NotFound,
    Internal,
}

impl ApiError {
    pub fn code(&self) -> ApiErrorCode {
        match self {
            ApiError::BadRequest(_) => ApiErrorCode::BadRequest,
            ApiError::Unauthorized => ApiErrorCode::Unauthorized,
            ApiError::Forbidden(_) => ApiErrorCode::Forbidden,
            ApiError::NotFound => ApiErrorCode::NotFound,
            ApiError::Internal => ApiErrorCode::Internal,
        }
    }

    pub fn body(&self) -> ApiErrorBody {
        match self {
            ApiError::BadRequest(message) | ApiError::Forbidden(message) => {
                ApiErrorBody::with_message(self.code(), message.clone())
            }
            _ => ApiErrorBody::new(self.code()),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let body = self.body();
        write!(f, "{:?}: {}", body.code, body.message)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.code().status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.body())
    }
}
