use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use gatehouse_types::api::{
    ApiResponse, ApprovalStatusResponse, DeviceActionRequest, ExtendApprovalRequest,
    IsApprovedResponse, RegisterDeviceRequest,
};
use gatehouse_types::models::SweepOutcome;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::validation;

const DEVICE_NOT_FOUND: &str = "Device not found";

// -- Registration --

/// POST /devices/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterDeviceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = validation::email(&req.email)?;
    let android_id = validation::android_id(&req.android_id)?;
    let notes = validation::notes(req.notes)?;

    let device = state.devices.register(email, android_id, notes).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(device, "Device registered successfully")),
    ))
}

// -- Approval --

/// PATCH /devices/{android_id}/approve
///
/// Action bodies are optional; without one the defaults apply.
pub async fn approve(
    State(state): State<AppState>,
    Path(android_id): Path<String>,
    body: Option<ApiJson<DeviceActionRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let req = body.map(|ApiJson(b)| b).unwrap_or_default();
    let android_id = validation::android_id(&android_id)?;
    let action_by = validation::action_by(req.action_by)?;
    let notes = validation::notes(req.notes)?;

    let device = state.devices.approve(android_id, action_by, notes).await?;
    Ok(Json(ApiResponse::with_message(device, "Device approved successfully")))
}

/// PATCH /devices/{android_id}/extend
pub async fn extend(
    State(state): State<AppState>,
    Path(android_id): Path<String>,
    body: Option<ApiJson<ExtendApprovalRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let req = body.map(|ApiJson(b)| b).unwrap_or_default();
    let android_id = validation::android_id(&android_id)?;
    let days = validation::additional_days(req.additional_days)?;
    let action_by = validation::action_by(req.action_by)?;
    let notes = validation::notes(req.notes)?;

    let device = state.devices.extend(android_id, days, action_by, notes).await?;
    Ok(Json(ApiResponse::with_message(
        device,
        format!("Device approval extended by {} days", days),
    )))
}

/// PATCH /devices/disabled/{android_id}/approve
pub async fn reapprove_disabled(
    State(state): State<AppState>,
    Path(android_id): Path<String>,
    body: Option<ApiJson<DeviceActionRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let req = body.map(|ApiJson(b)| b).unwrap_or_default();
    let android_id = validation::android_id(&android_id)?;
    let action_by = validation::action_by(req.action_by)?;
    let notes = validation::notes(req.notes)?;

    let device = state
        .devices
        .reapprove_from_disabled(android_id, action_by, notes)
        .await?;
    Ok(Json(ApiResponse::with_message(
        device,
        "Disabled device successfully re-approved and moved back to active devices",
    )))
}

// -- Removal --

/// PATCH /devices/{android_id}/disable
pub async fn disable(
    State(state): State<AppState>,
    Path(android_id): Path<String>,
    body: Option<ApiJson<DeviceActionRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let req = body.map(|ApiJson(b)| b).unwrap_or_default();
    let android_id = validation::android_id(&android_id)?;
    let action_by = validation::action_by(req.action_by)?;
    let notes = validation::notes(req.notes)?;

    let disabled = state.devices.disable(android_id, action_by, notes).await?;
    Ok(Json(ApiResponse::with_message(
        disabled,
        "Device disabled and moved to disabled devices",
    )))
}

/// PATCH /devices/{android_id}/reject
pub async fn reject(
    State(state): State<AppState>,
    Path(android_id): Path<String>,
    body: Option<ApiJson<DeviceActionRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let req = body.map(|ApiJson(b)| b).unwrap_or_default();
    let android_id = validation::android_id(&android_id)?;
    let action_by = validation::action_by(req.action_by)?;
    let notes = validation::notes(req.notes)?;

    let rejected = state.devices.reject(android_id, action_by, notes).await?;
    Ok(Json(ApiResponse::with_message(
        rejected,
        "Device registration rejected and moved to rejected devices",
    )))
}

/// POST /devices/process-expired runs a manual sweep, serialized with the
/// background one.
pub async fn process_expired(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let response = match state.sweeper.sweep().await? {
        Some(outcomes) => ApiResponse::with_message(outcomes, "Expired devices processed"),
        None => ApiResponse::with_message(
            Vec::<SweepOutcome>::new(),
            "Expired device sweep already running",
        ),
    };
    Ok(Json(response))
}

// -- Queries --

/// GET /devices/{android_id}/status: approval with device fields.
pub async fn approval_status(
    State(state): State<AppState>,
    Path(android_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let android_id = validation::android_id(&android_id)?;

    let check = state
        .devices
        .check_approval(android_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(DEVICE_NOT_FOUND.into()))?;

    let device = check.device;
    Ok(Json(ApiResponse::ok(ApprovalStatusResponse {
        android_id: device.android_id,
        email: device.email,
        is_approved: check.approved,
        approved_at: device.approved_at,
        expires_at: device.expires_at,
        created_at: device.created_at,
        updated_at: device.updated_at,
    })))
}

/// GET /devices/{android_id}/approved: bare boolean check.
pub async fn is_approved(
    State(state): State<AppState>,
    Path(android_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let android_id = validation::android_id(&android_id)?;

    let Some(check) = state.devices.check_approval(android_id.clone()).await? else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(IsApprovedResponse {
                success: false,
                android_id,
                is_approved: false,
                message: DEVICE_NOT_FOUND.into(),
            }),
        ));
    };

    let message = if check.approved {
        "Device is approved"
    } else {
        "Device is not approved"
    };
    Ok((
        StatusCode::OK,
        Json(IsApprovedResponse {
            success: true,
            android_id,
            is_approved: check.approved,
            message: message.into(),
        }),
    ))
}

/// GET /devices/{android_id}
pub async fn get_device(
    State(state): State<AppState>,
    Path(android_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let android_id = validation::android_id(&android_id)?;

    let device = state
        .devices
        .device(android_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(DEVICE_NOT_FOUND.into()))?;
    Ok(Json(ApiResponse::ok(device)))
}

/// GET /devices/{android_id}/history
pub async fn history(
    State(state): State<AppState>,
    Path(android_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let android_id = validation::android_id(&android_id)?;

    match state.devices.history(android_id).await {
        Ok(entries) => Ok(Json(ApiResponse::ok(entries))),
        Err(ApiError::Lifecycle(gatehouse_lifecycle::LifecycleError::DeviceNotFound)) => {
            Err(ApiError::NotFound(DEVICE_NOT_FOUND.into()))
        }
        Err(e) => Err(e),
    }
}

/// GET /devices
pub async fn list_devices(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ApiResponse::ok(state.devices.devices().await?)))
}

/// GET /devices/disabled
pub async fn list_disabled(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ApiResponse::ok(state.devices.disabled_devices().await?)))
}

/// GET /devices/rejected
pub async fn list_rejected(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ApiResponse::ok(state.devices.rejected_devices().await?)))
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "message": "Device approval service is running",
    }))
}
