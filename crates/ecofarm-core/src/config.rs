use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every variable has a default, so the only failures are unparsable values.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let env = parse_environment(&or_default("ECOFARM_ENV", "development"))?;

    let api_base_url = or_default("ECOFARM_API_BASE_URL", "http://localhost:8000/api");
    if api_base_url.trim().is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "ECOFARM_API_BASE_URL".to_string(),
            reason: "must not be empty".to_string(),
        });
    }

    // An empty key in `.env` means "not configured", not "use the empty key".
    let api_key = lookup("ECOFARM_API_KEY")
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty());

    let credentials_path = PathBuf::from(or_default(
        "ECOFARM_CREDENTIALS_PATH",
        ".ecofarm/credentials.json",
    ));
    let request_timeout_secs = parse_u64("ECOFARM_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("ECOFARM_USER_AGENT", "ecofarm/0.1 (price-monitor)");

    let page_size = parse_u32("ECOFARM_PAGE_SIZE", "50")?;
    if page_size == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "ECOFARM_PAGE_SIZE".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }

    let log_level = or_default("ECOFARM_LOG_LEVEL", "warn");

    Ok(AppConfig {
        env,
        api_base_url,
        api_key,
        credentials_path,
        request_timeout_secs,
        user_agent,
        page_size,
        log_level,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "ECOFARM_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
