//! Read fitter settings from JSON.
//!
//! Missing keys fall back to [`FitConfig::default`].

use std::fs::File;
use std::path::Path;

use crate::domain::FitConfig;
use crate::error::AppError;

pub fn read_fit_config_json(path: &Path) -> Result<FitConfig, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::missing_data(format!("Failed to open config JSON '{}': {e}", path.display()))
    })?;
    let config: FitConfig = serde_json::from_reader(file)
        .map_err(|e| AppError::invalid_input(format!("Invalid config JSON: {e}")))?;
    config.validate()?;
    Ok(config)
}
