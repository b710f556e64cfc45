/*
 * Responsibility
 * - Pipeline-wide ClientError
 * - Non-2xx responses and transport failures keep the request that caused them,
 *   so recovery can inspect and replay it
 */
use reqwest::{StatusCode, header::HeaderMap};
use thiserror::Error;

use crate::request::RequestDescriptor;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed with status {status}")]
    Status {
        status: StatusCode,
        request: Box<RequestDescriptor>,
        headers: HeaderMap,
        body: Vec<u8>,
    },

    #[error("transport error: {message}")]
    Transport {
        message: String,
        status: Option<StatusCode>,
        request: Option<Box<RequestDescriptor>>,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("client configuration error: {0}")]
    Configuration(String),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Transport { status, .. } => *status,
            _ => None,
        }
    }

    pub fn request(&self) -> Option<&RequestDescriptor> {
        match self {
            ClientError::Status { request, .. } => Some(request),
            ClientError::Transport { request, .. } => request.as_deref(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// Response body of a non-2xx status, lossily decoded.
    pub fn body_text(&self) -> Option<String> {
        match self {
            ClientError::Status { body, .. } => Some(String::from_utf8_lossy(body).into_owned()),
            _ => None,
        }
    }
}
