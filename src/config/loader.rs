//! Configuration Loader
//!
//! Environment-aware loading on top of the `config` crate. Sources are merged
//! in order: built-in defaults, `config/video_factory`, the per-environment
//! `config/video_factory.{env}` overlay, an optional explicit file, then
//! `VIDEO_FACTORY_*` environment variables.

use super::error::ConfigResult;
use super::FactoryConfig;
use config::{Config, Environment, File};
use std::env;
use std::path::Path;
use tracing::debug;

/// Variable naming the deployment environment
pub const ENVIRONMENT_VAR: &str = "VIDEO_FACTORY_ENV";

const ENV_PREFIX: &str = "VIDEO_FACTORY";
const DEFAULT_CONFIG_BASENAME: &str = "config/video_factory";

/// Current environment, lowercased; `development` when unset
pub fn detect_environment() -> String {
    env::var(ENVIRONMENT_VAR)
        .unwrap_or_else(|_| "development".to_string())
        .to_lowercase()
}

pub(crate) fn default_log_level(environment: &str) -> &'static str {
    match environment {
        "test" => "warn",
        _ => "info",
    }
}

pub fn load_from(path: Option<&Path>) -> ConfigResult<FactoryConfig> {
    load_with_env(path, &detect_environment(), None)
}

/// Load with an explicit environment name and, optionally, an explicit set of
/// environment variables in place of the process environment
pub fn load_with_env(
    path: Option<&Path>,
    environment: &str,
    env_overrides: Option<config::Map<String, String>>,
) -> ConfigResult<FactoryConfig> {
    debug!(environment = %environment, path = ?path, "Loading configuration");

    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(
            File::with_name(&format!("{DEFAULT_CONFIG_BASENAME}.{environment}")).required(false),
        );

    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(env_overrides),
    );

    let config: FactoryConfig = builder.build()?.try_deserialize()?;
    config.validate()?;

    debug!(
        environment = %environment,
        max_concurrent_jobs = config.scheduler.max_concurrent_jobs,
        max_in_flight_jobs = config.scheduler.max_in_flight_jobs,
        "✅ Configuration loaded"
    );
    Ok(config)
}
