use crate::config::WidgetConfig;
use std::sync::{Arc, RwLock};
use tauri::command;

lazy_static::lazy_static! {
    static ref GLOBAL_CONFIG: Arc<RwLock<WidgetConfig>> = Arc::new(RwLock::new(WidgetConfig::load_or_default()));
}

/// Copy of the process-wide configuration
pub fn current_config() -> WidgetConfig {
    match GLOBAL_CONFIG.read() {
        Ok(config) => config.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Get the current configuration
#[command]
pub async fn get_config() -> Result<WidgetConfig, String> {
    let config = GLOBAL_CONFIG.read().map_err(|e| e.to_string())?;
    Ok(config.clone())
}

/// Validate, apply and persist a new configuration
#[command]
pub async fn update_config(new_config: WidgetConfig) -> Result<(), String> {
    new_config.validate()?;

    {
        let mut config = GLOBAL_CONFIG.write().map_err(|e| e.to_string())?;
        *config = new_config.clone();
    }

    new_config
        .save_to_file(WidgetConfig::default_path())
        .map_err(|e| e.to_string())?;

    log::info!("Configuration updated");
    Ok(())
}

/// Reset configuration to defaults
#[command]
pub async fn reset_config() -> Result<WidgetConfig, String> {
    let default_config = WidgetConfig::default();

    {
        let mut config = GLOBAL_CONFIG
            .write()
            .map_err(|e| format!("Failed to write config: {}", e))?;
        *config = default_config.clone();
    }

    default_config
        .save_to_file(WidgetConfig::default_path())
        .map_err(|e| e.to_string())?;

    Ok(default_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_config_is_valid() {
        let config = get_config().await.unwrap();
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_config() {
        let mut bad = WidgetConfig::default();
        bad.stream.initial_resolution = "not-a-size".to_string();

        let before = current_config();
        assert!(update_config(bad).await.is_err());
        assert_eq!(current_config(), before);
    }
}
