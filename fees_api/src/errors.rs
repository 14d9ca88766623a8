use std::fmt::Display;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Other(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub trait WithContext<T> {
    fn with_context<C, F>(self, context: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Self::Configuration(error.to_string())
    }
}

impl From<upstream::Error> for Error {
    fn from(error: upstream::Error) -> Self {
        match error {
            upstream::Error::Other(e) => Self::Other(e),
            e => Self::Network(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl<T> WithContext<T> for Result<T> {
    fn with_context<C, F>(self, context: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|err| match err {
            Error::Other(e) => Error::Other(format!("{}: {}", context(), e)),
            Error::Network(e) => Error::Network(format!("{}: {}", context(), e)),
            Error::Configuration(e) => Error::Configuration(format!("{}: {}", context(), e)),
        })
    }
}

/// A failed request as seen by an API client: a status code and an
/// `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError(services::Error);

impl Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<services::Error> for ApiError {
    fn from(error: services::Error) -> Self {
        Self(error)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            services::Error::UnknownChain(_) => StatusCode::NOT_FOUND,
            services::Error::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            services::Error::PriceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            services::Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.0.to_string() }))
    }
}
