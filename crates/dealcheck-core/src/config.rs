use crate::error::ConfigError;

/// Application configuration read from environment variables.
///
/// Every provider secret is independently optional: a provider whose
/// required secrets are unset is silently skipped, never an error. The set
/// of configured providers for a given call is exactly those with non-empty
/// secrets at load time.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Kroger OAuth client id; enables the Kroger provider together with
    /// `kroger_client_secret`.
    pub kroger_client_id: Option<String>,
    pub kroger_client_secret: Option<String>,
    /// GroceryServer publisher id; enables the GroceryServer provider.
    pub groceryserver_publisher_id: Option<String>,
    /// Optional secondary key, sent as a request header when present.
    pub groceryserver_api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Bound on concurrent per-store competitor lookups. `1` keeps them
    /// strictly sequential.
    pub deal_lookup_concurrency: usize,
    pub log_level: String,
}

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a numeric value fails to parse.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the
/// process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for
/// testing or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if a numeric value fails to parse.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing logic, decoupled from the actual environment so
/// it can be tested with a pure `HashMap` lookup — no `set_var`/`remove_var`
/// needed.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    // Treat empty strings the same as unset: an empty secret cannot
    // authenticate anything.
    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|value| !value.is_empty())
    };

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

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let kroger_client_id = optional("KROGER_CLIENT_ID");
    let kroger_client_secret = optional("KROGER_CLIENT_SECRET");
    let groceryserver_publisher_id = optional("GROCERYSERVER_PUBLISHER_ID");
    let groceryserver_api_key = optional("GROCERYSERVER_API_KEY");

    let request_timeout_secs = parse_u64("DEALCHECK_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default(
        "DEALCHECK_USER_AGENT",
        "dealcheck/0.1 (price-comparison)",
    );
    let deal_lookup_concurrency = parse_usize("DEALCHECK_DEAL_LOOKUP_CONCURRENCY", "1")?;
    let log_level = or_default("DEALCHECK_LOG_LEVEL", "info");

    Ok(AppConfig {
        kroger_client_id,
        kroger_client_secret,
        groceryserver_publisher_id,
        groceryserver_api_key,
        request_timeout_secs,
        user_agent,
        deal_lookup_concurrency,
        log_level,
    })
}
