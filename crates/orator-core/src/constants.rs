/// Environment variable holding per-target log directives.
pub const LOG_ENV_VAR: &str = "ORATOR_LOG";

/// Directive used when `ORATOR_LOG` is unset or invalid.
pub const DEFAULT_LOG_DIRECTIVE: &str = "orator=info";

/// Prefix for configuration overrides read from the environment.
pub const ENV_PREFIX: &str = "ORATOR_";

/// Name of the project-level configuration file.
pub const PROJECT_CONFIG_FILE: &str = "orator.toml";
