use crate::commands::config::current_config;
use crate::multiplier::{self, ProductResult};
use tauri::command;

/// "Calculate" button on the multiplier form
#[command]
pub async fn calculate_product(first: String, second: String) -> Result<ProductResult, String> {
    if !current_config().multiplier.enabled {
        return Err("Multiplier widget is disabled".to_string());
    }
    Ok(multiplier::calculate_product(&first, &second))
}
