use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "athena.toml";
const MAX_DELAY_MS: u64 = 60_000;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub demo: DemoConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

/// Serializes flat, in the shape of the `[demo]` table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DemoConfig {
    #[serde(flatten)]
    pub timing: DemoTiming,
    /// Start sessions with the guided tour overlay switched on.
    #[serde(rename = "tour")]
    pub tour_enabled_by_default: bool,
}

/// Fixed pacing of the scripted walkthrough, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoTiming {
    pub approve_return_delay_ms: u64,
    pub reveal_step_ms: u64,
    pub expert_reply_delay_ms: u64,
    pub documentation_delay_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub tour_enabled_by_default: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: "127.0.0.1".to_string(), port: 8080, graceful_shutdown_secs: 15 }
    }
}

impl Default for DemoTiming {
    fn default() -> Self {
        Self {
            approve_return_delay_ms: 1_500,
            reveal_step_ms: 1_000,
            expert_reply_delay_ms: 1_000,
            documentation_delay_ms: 3_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Compact }
    }
}

impl DemoTiming {
    /// All delays set to zero; used for static renders.
    pub fn instant() -> Self {
        Self {
            approve_return_delay_ms: 0,
            reveal_step_ms: 0,
            expert_reply_delay_ms: 0,
            documentation_delay_ms: 0,
        }
    }

    /// Divides every delay by `speed`. Speeds that are not finite and positive leave
    /// the timing untouched.
    pub fn scaled(&self, speed: f64) -> Self {
        if !speed.is_finite() || speed <= 0.0 {
            return *self;
        }
        let scale = |millis: u64| (millis as f64 / speed).round() as u64;
        Self {
            approve_return_delay_ms: scale(self.approve_return_delay_ms),
            reveal_step_ms: scale(self.reveal_step_ms),
            expert_reply_delay_ms: scale(self.expert_reply_delay_ms),
            documentation_delay_ms: scale(self.documentation_delay_ms),
        }
    }

    pub fn approve_return_delay(&self) -> Duration {
        Duration::from_millis(self.approve_return_delay_ms)
    }

    pub fn reveal_step(&self) -> Duration {
        Duration::from_millis(self.reveal_step_ms)
    }

    pub fn expert_reply_delay(&self) -> Duration {
        Duration::from_millis(self.expert_reply_delay_ms)
    }

    pub fn documentation_delay(&self) -> Duration {
        Duration::from_millis(self.documentation_delay_ms)
    }
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(demo) = patch.demo {
            let timing = &mut self.demo.timing;
            if let Some(value) = demo.approve_return_delay_ms {
                timing.approve_return_delay_ms = value;
            }
            if let Some(value) = demo.reveal_step_ms {
                timing.reveal_step_ms = value;
            }
            if let Some(value) = demo.expert_reply_delay_ms {
                timing.expert_reply_delay_ms = value;
            }
            if let Some(value) = demo.documentation_delay_ms {
                timing.documentation_delay_ms = value;
            }
            if let Some(tour) = demo.tour {
                self.demo.tour_enabled_by_default = tour;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ATHENA_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("ATHENA_SERVER_PORT") {
            self.server.port = parse_u16("ATHENA_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("ATHENA_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("ATHENA_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let timing = &mut self.demo.timing;
        if let Some(value) = read_env("ATHENA_DEMO_APPROVE_RETURN_DELAY_MS") {
            timing.approve_return_delay_ms =
                parse_u64("ATHENA_DEMO_APPROVE_RETURN_DELAY_MS", &value)?;
        }
        if let Some(value) = read_env("ATHENA_DEMO_REVEAL_STEP_MS") {
            timing.reveal_step_ms = parse_u64("ATHENA_DEMO_REVEAL_STEP_MS", &value)?;
        }
        if let Some(value) = read_env("ATHENA_DEMO_EXPERT_REPLY_DELAY_MS") {
            timing.expert_reply_delay_ms = parse_u64("ATHENA_DEMO_EXPERT_REPLY_DELAY_MS", &value)?;
        }
        if let Some(value) = read_env("ATHENA_DEMO_DOCUMENTATION_DELAY_MS") {
            timing.documentation_delay_ms =
                parse_u64("ATHENA_DEMO_DOCUMENTATION_DELAY_MS", &value)?;
        }
        if let Some(value) = read_env("ATHENA_DEMO_TOUR") {
            self.demo.tour_enabled_by_default = parse_bool("ATHENA_DEMO_TOUR", &value)?;
        }

        let log_level = read_env("ATHENA_LOGGING_LEVEL").or_else(|| read_env("ATHENA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("ATHENA_LOGGING_FORMAT").or_else(|| read_env("ATHENA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(tour) = overrides.tour_enabled_by_default {
            self.demo.tour_enabled_by_default = tour;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_server(&self.server)?;
        validate_demo(&self.demo)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_demo(demo: &DemoConfig) -> Result<(), ConfigError> {
    let timing = &demo.timing;
    let delays = [
        ("demo.approve_return_delay_ms", timing.approve_return_delay_ms),
        ("demo.reveal_step_ms", timing.reveal_step_ms),
        ("demo.expert_reply_delay_ms", timing.expert_reply_delay_ms),
        ("demo.documentation_delay_ms", timing.documentation_delay_ms),
    ];

    for (key, value) in delays {
        if value > MAX_DELAY_MS {
            return Err(ConfigError::Validation(format!(
                "{key} must be in range 0..={MAX_DELAY_MS}"
            )));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    server: Option<ServerPatch>,
    demo: Option<DemoPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DemoPatch {
    approve_return_delay_ms: Option<u64>,
    reveal_step_ms: Option<u64>,
    expert_reply_delay_ms: Option<u64>,
    documentation_delay_ms: Option<u64>,
    tour: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
