use crate::permissions::{check_permission_detailed, PermissionInfo};
use tauri::command;

/// Report the OS camera permission before the user toggles the camera on
#[command]
pub async fn check_camera_permission() -> Result<PermissionInfo, String> {
    let info = tokio::task::spawn_blocking(check_permission_detailed)
        .await
        .map_err(|e| format!("Task join error: {}", e))?;
    log::info!("Camera permission: {} ({})", info.status, info.message);
    Ok(info)
}
