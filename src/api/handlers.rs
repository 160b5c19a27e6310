//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    response::Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    assets::LogoUpload,
    error::{AppError, AppResult},
    state::{AppState, TimerAction},
    store::{LogoEntry, Theme},
};
use super::responses::{
    ControlResponse, HealthResponse, MessageResponse, StatusResponse, ThemeResponse, UploadResponse,
};

/// Parse a JSON request body, reporting malformed input as a validation error
fn parse_json<T: DeserializeOwned>(body: &[u8]) -> AppResult<T> {
    serde_json::from_slice(body).map_err(|e| AppError::validation(format!("Invalid JSON payload: {}", e)))
}

/// Run blocking file work off the async executor
async fn blocking<T, F>(task: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| AppError::internal(format!("Background task failed: {}", e)))?
}

/// Handle GET /api/timer_status - Live timer status plus viewer theme
pub async fn timer_status_handler(State(state): State<Arc<AppState>>) -> AppResult<Json<StatusResponse>> {
    let timers = state.timers.status_all()?;
    let theme = state.config.theme()?;
    Ok(Json(StatusResponse { timers, theme }))
}

/// Handle POST /api/control_timer/:timer_id - Apply a control action
pub async fn control_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(timer_id): Path<String>,
    body: Bytes,
) -> AppResult<Json<ControlResponse>> {
    if !state.timers.contains(&timer_id)? {
        return Err(AppError::validation("Invalid timer ID"));
    }

    let payload: Value = parse_json(&body)?;
    let action_name = payload
        .get("action")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AppError::validation("Missing action in payload"))?;
    let action = TimerAction::from_payload(payload)?;

    let new_state = state.control_timer(&timer_id, &action_name, action)?;
    info!("Timer {} action {} processed", timer_id, action_name);
    Ok(Json(ControlResponse::new(&timer_id, &action_name, new_state)))
}

/// Handle POST /api/upload_logo - Store an uploaded logo
pub async fn upload_logo_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let mut upload = LogoUpload::default();
    let mut saw_file_part = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid upload: {}", e)))?
    {
        match field.name() {
            Some("logo_file") => {
                saw_file_part = true;
                upload.original_filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Invalid upload: {}", e)))?;
                upload.bytes = Some(bytes.to_vec());
            }
            Some("common_name") => {
                upload.display_name = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Invalid upload: {}", e)))?;
            }
            other => debug!("Ignoring upload field {:?}", other),
        }
    }

    if !saw_file_part {
        return Err(AppError::validation("No file part"));
    }

    let worker = Arc::clone(&state);
    let logo = blocking(move || worker.assets.upload_logo(upload)).await?;
    state.record_action(format!("upload logo {}", logo.filename));

    Ok(Json(UploadResponse {
        message: "Logo uploaded successfully".to_string(),
        logo,
    }))
}

/// Handle GET /api/get_logos - Registered logos in upload order
pub async fn get_logos_handler(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<LogoEntry>>> {
    Ok(Json(state.assets.logos()?))
}

/// Handle DELETE /api/delete_logo/:filename - Unregister and delete a logo
pub async fn delete_logo_handler(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let worker = Arc::clone(&state);
    let target = filename.clone();
    let removal = blocking(move || worker.assets.delete_logo(&target)).await?;
    state.record_action(format!("delete logo {}", filename));

    Ok(Json(MessageResponse::with_warning(
        format!("Logo '{}' deleted successfully.", removal.logo.name),
        removal.warning,
    )))
}

#[derive(Debug, Deserialize)]
pub struct ChangePinRequest {
    #[serde(default)]
    pub current_pin: String,
    #[serde(default)]
    pub new_pin: String,
}

/// Handle POST /api/change_pin - Replace the admin PIN
pub async fn change_pin_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> AppResult<Json<MessageResponse>> {
    let request: ChangePinRequest = parse_json(&body)?;
    state.config.change_pin(&request.current_pin, &request.new_pin)?;
    state.record_action("change pin");
    Ok(Json(MessageResponse::new("PIN changed successfully!")))
}

/// Handle GET /api/theme - Current viewer theme
pub async fn get_theme_handler(State(state): State<Arc<AppState>>) -> AppResult<Json<Theme>> {
    Ok(Json(state.config.theme()?))
}

/// Handle POST /api/theme - Replace the viewer theme
pub async fn set_theme_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> AppResult<Json<ThemeResponse>> {
    let theme: Theme = parse_json(&body)?;
    let theme = state.config.set_theme(theme)?;
    state.record_action("update theme");
    Ok(Json(ThemeResponse {
        message: "Theme updated successfully!".to_string(),
        theme,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> AppResult<Json<HealthResponse>> {
    let timers = state.timers.ids()?.len();
    let (last_action, last_action_time) = state.get_last_action();
    Ok(Json(HealthResponse::ok(
        state.get_uptime(),
        state.host.clone(),
        state.port,
        timers,
        last_action,
        last_action_time,
    )))
}
