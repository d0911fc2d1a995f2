use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Reference section exists (enforced by serde)
/// - Server port is not 0
/// - An enabled scanner has a rom_path
/// - Scanner extensions are non-empty, scanner and hasher durations non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Scanner validation
    let scanner = &config.scanner;
    if scanner.enabled && scanner.rom_path.is_none() {
        return Err(ConfigError::ValidationError(
            "scanner.rom_path is required when the scanner is enabled".to_string(),
        ));
    }
    if scanner.extensions.is_empty() {
        return Err(ConfigError::ValidationError(
            "scanner.extensions cannot be empty".to_string(),
        ));
    }
    if scanner.rescan_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "scanner.rescan_interval_secs cannot be 0".to_string(),
        ));
    }
    if scanner.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "scanner.poll_interval_ms cannot be 0".to_string(),
        ));
    }

    if config.hasher.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "hasher.timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
