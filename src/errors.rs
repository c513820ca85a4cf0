// src/errors.rs
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SquishError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Unsupported target format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to encode to {format}: {message}")]
    Encode {
        format: &'static str,
        message: String,
    },

    #[error("Failed to analyze image stats: {0}")]
    Statistics(String),
}

impl SquishError {
    pub fn encode(format: &'static str, message: impl Into<String>) -> Self {
        SquishError::Encode {
            format,
            message: message.into(),
        }
    }
}

impl ResponseError for SquishError {
    // All core failures surface the same way: a terminal 500 with a
    // plain-text message. Statistics errors never reach a response; the
    // classifier recovers them locally.
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.to_string())
    }
}
