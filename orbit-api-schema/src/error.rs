use serde::{Deserialize, Serialize};

/// Class of a failed procedure call. Only the class reaches the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    #[serde(rename = "INTERNAL_SERVER_ERROR")]
    Internal,
}

impl ApiErrorCode {
    pub fn status(&self) -> u16 {
        match self {
            ApiErrorCode::BadRequest => 400,
            ApiErrorCode::Unauthorized => 401,
            ApiErrorCode::Forbidden => 403,
            ApiErrorCode::NotFound => 404,
            ApiErrorCode::Internal => 500,
        }
    }

    /// Anything the server did not classify is treated as internal.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ApiErrorCode::BadRequest,
            401 => ApiErrorCode::Unauthorized,
            403 => ApiErrorCode::Forbidden,
            404 => ApiErrorCode::NotFound,
            _ => ApiErrorCode::Internal,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            ApiErrorCode::BadRequest => "Bad Request",
            ApiErrorCode::Unauthorized => "Unauthorized",
            ApiErrorCode::Forbidden => "Forbidden",
            ApiErrorCode::NotFound => "Not Found",
            ApiErrorCode::Internal => "Internal Server Error",
        }
    }
}

impl std::fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.default_message())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiErrorBody {
    pub fn new(code: ApiErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
        }
    }

    pub fn with_message(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
