use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Error, Debug)]
pub enum VidgradeError {
    #[error("{reason}")]
    Validation { reason: String },

    #[error("No analysis available; grade the video first")]
    NoAnalysis,

    #[error("Malformed response from {service}: {reason}")]
    MalformedResponse {
        service: &'static str,
        reason: String,
    },

    #[error("{service} request failed with status {status}: {body}")]
    ServiceFailed {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Response stream interrupted: {reason}")]
    StreamInterrupted { partial: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl VidgradeError {
    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(service: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            service,
            reason: reason.into(),
        }
    }

    /// Message shown to the user when an action fails.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { reason } => reason.clone(),
            Self::NoAnalysis => self.to_string(),
            Self::MalformedResponse { service, .. } => format!(
                "The {service} service returned a response that could not be read. Please try again."
            ),
            Self::ServiceFailed {
                service, status, ..
            } => format!("The {service} service failed (HTTP {status}). Please try again."),
            Self::StreamInterrupted { reason, .. } => {
                format!("The reply was cut off ({reason}). Please try again.")
            }
            Self::ApiError(e) if e.is_timeout() => {
                "The request timed out. Please try again.".to_string()
            }
            Self::ApiError(_) => "Could not reach the AI service. Please try again.".to_string(),
            Self::IoError(e) => format!("Local storage error: {e}"),
            Self::JsonError(e) => format!("Could not read data: {e}"),
            Self::Provider(e) => e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VidgradeError>;
