use super::{types::Config, ConfigError};
use crate::seeder::MAX_SEED_WORKERS;

/// Validate configuration
/// Currently validates:
/// - Rate window and request budget are non-zero
/// - Slot count is within 1..=20 and lease timeout is non-zero
/// - Ingestion batch size is non-zero
/// - Server port is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.rate_limit.window_seconds == 0 {
        return Err(ConfigError::ValidationError(
            "rate_limit.window_seconds cannot be 0".to_string(),
        ));
    }
    if config.rate_limit.max_requests == 0 {
        return Err(ConfigError::ValidationError(
            "rate_limit.max_requests cannot be 0".to_string(),
        ));
    }

    if config.slots.max_concurrent == 0 || config.slots.max_concurrent > MAX_SEED_WORKERS {
        return Err(ConfigError::ValidationError(format!(
            "slots.max_concurrent must be between 1 and {}",
            MAX_SEED_WORKERS
        )));
    }
    if config.slots.lease_timeout_seconds == 0 {
        return Err(ConfigError::ValidationError(
            "slots.lease_timeout_seconds cannot be 0".to_string(),
        ));
    }

    if config.ingestion.batch_size == 0 {
        return Err(ConfigError::ValidationError(
            "ingestion.batch_size cannot be 0".to_string(),
        ));
    }

    if let Some(max_workers) = config.seeder.max_workers {
        if max_workers == 0 {
            return Err(ConfigError::ValidationError(
                "seeder.max_workers cannot be 0".to_string(),
            ));
        }
    }

    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    Ok(())
}
