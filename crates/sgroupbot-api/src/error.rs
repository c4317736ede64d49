use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("api error: {code} - {message}")]
    Api { code: i64, message: String },

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
