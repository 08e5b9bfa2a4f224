//! Request and response schemas
//!
//! Contains the DTOs for all HTTP endpoints plus the shared error envelope.

pub mod jobs;
pub mod users;

pub use jobs::{
    ApplyResponse, CreateJobRequest, JobCollectionResponse, JobListResponse, JobQuery,
    JobResponse, JobStatsResponse, UpdateJobRequest,
};
pub use users::{
    LoginRequest, PublicUser, RegisterRequest, TokenResponse, UpdateMeRequest,
    UpdatePasswordRequest, UserResponse,
};

use serde::{Deserialize, Serialize};

/// JSON envelope for every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

/// Error payload inside the envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                error_type: error_type.to_string(),
                message: message.to_string(),
            },
        }
    }
}

/// Envelope for endpoints that only report an outcome (logout, delete).
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_shape() {
        let body = serde_json::to_value(ErrorResponse::new("not_found", "/x route not found"))
            .unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["type"], "not_found");
        assert_eq!(body["error"]["message"], "/x route not found");
    }

    #[test]
    fn test_message_envelope() {
        let body = serde_json::to_value(MessageResponse::new("Logged out")).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Logged out");
    }
}
