use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest_middleware::Error),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("{}", .0.message)]
    Remote(RemoteError),
}

impl ApiError {
    /// Field-level validation messages reported by the server for `field`.
    pub fn field_errors(&self, field: &str) -> Option<&[String]> {
        match self {
            ApiError::Remote(error) => error.field_errors(field),
            _ => None,
        }
    }
}

/// Error shape of a tRPC procedure failure.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteError {
    pub message: String,
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub data: Option<RemoteErrorData>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteErrorData {
    pub code: String,
    #[serde(default)]
    pub http_status: u16,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub zod_error: Option<ZodError>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ZodError {
    #[serde(default)]
    pub form_errors: Vec<String>,
    #[serde(default)]
    pub field_errors: HashMap<String, Vec<String>>,
}

impl RemoteError {
    pub fn field_errors(&self, field: &str) -> Option<&[String]> {
        self.data
            .as_ref()?
            .zod_error
            .as_ref()?
            .field_errors
            .get(field)
            .map(Vec::as_slice)
    }
}

#[cfg(test)]
impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: 0,
            data: None,
        }
    }

    pub fn with_field_error(mut self, field: &str, message: impl Into<String>) -> Self {
        let data = self.data.get_or_insert_with(|| RemoteErrorData {
            code: "BAD_REQUEST".to_string(),
            http_status: 400,
            path: None,
            zod_error: None,
        });
        data.zod_error
            .get_or_insert_with(ZodError::default)
            .field_errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
        self
    }
}
