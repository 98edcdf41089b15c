use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- Envelope --

/// Every JSON response is wrapped in this envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

// -- Registration --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterDeviceRequest {
    pub email: String,
    pub android_id: String,
    #[serde(default)]
    pub notes: Option<String>,
}

// -- Admin actions --

/// Body for approve, disable, reject and reapprove.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeviceActionRequest {
    #[serde(default)]
    pub action_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExtendApprovalRequest {
    #[serde(default)]
    pub additional_days: Option<u32>,
    #[serde(default)]
    pub action_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

// -- Status checks --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalStatusResponse {
    pub android_id: String,
    pub email: String,
    pub is_approved: bool,
    pub approved_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsApprovedResponse {
    pub success: bool,
    pub android_id: String,
    pub is_approved: bool,
    pub message: String,
}
