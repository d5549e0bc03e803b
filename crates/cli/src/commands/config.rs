use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use athena_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILE};
use toml::Value;

use crate::commands::CommandResult;

/// Config keys in display order with the environment variables that override them.
/// Later variables in a list are fallbacks for earlier ones.
const FIELDS: [(&str, &[&str]); 10] = [
    ("server.bind_address", &["ATHENA_SERVER_BIND_ADDRESS"]),
    ("server.port", &["ATHENA_SERVER_PORT"]),
    ("server.graceful_shutdown_secs", &["ATHENA_SERVER_GRACEFUL_SHUTDOWN_SECS"]),
    ("demo.approve_return_delay_ms", &["ATHENA_DEMO_APPROVE_RETURN_DELAY_MS"]),
    ("demo.reveal_step_ms", &["ATHENA_DEMO_REVEAL_STEP_MS"]),
    ("demo.expert_reply_delay_ms", &["ATHENA_DEMO_EXPERT_REPLY_DELAY_MS"]),
    ("demo.documentation_delay_ms", &["ATHENA_DEMO_DOCUMENTATION_DELAY_MS"]),
    ("demo.tour", &["ATHENA_DEMO_TOUR"]),
    ("logging.level", &["ATHENA_LOGGING_LEVEL", "ATHENA_LOG_LEVEL"]),
    ("logging.format", &["ATHENA_LOGGING_FORMAT", "ATHENA_LOG_FORMAT"]),
];

pub fn run(as_toml: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config",
                format!("config validation failed: {error}"),
                3,
            )
        }
    };

    if as_toml {
        return match toml::to_string(&config) {
            Ok(document) => CommandResult::output(document.trim_end().to_owned()),
            Err(error) => CommandResult::failure("config", "serialization", error.to_string(), 1),
        };
    }

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, env_keys) in FIELDS {
        lines.push(render_line(
            key_path,
            &display_value(&config, key_path),
            field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
    }

    CommandResult::output(lines.join("\n"))
}

fn display_value(config: &AppConfig, key_path: &str) -> String {
    let timing = &config.demo.timing;
    match key_path {
        "server.bind_address" => config.server.bind_address.clone(),
        "server.port" => config.server.port.to_string(),
        "server.graceful_shutdown_secs" => config.server.graceful_shutdown_secs.to_string(),
        "demo.approve_return_delay_ms" => timing.approve_return_delay_ms.to_string(),
        "demo.reveal_step_ms" => timing.reveal_step_ms.to_string(),
        "demo.expert_reply_delay_ms" => timing.expert_reply_delay_ms.to_string(),
        "demo.documentation_delay_ms" => timing.documentation_delay_ms.to_string(),
        "demo.tour" => config.demo.tour_enabled_by_default.to_string(),
        "logging.level" => config.logging.level.clone(),
        "logging.format" => config.logging.format.as_str().to_string(),
        _ => "<unknown>".to_string(),
    }
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from(DEFAULT_CONFIG_FILE);
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config").join(DEFAULT_CONFIG_FILE);
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use super::{contains_path, display_value, FIELDS};
    use athena_core::config::AppConfig;

    #[test]
    fn nested_paths_resolve_through_tables() {
        let doc: toml::Value = "[demo]\ntour = true\n".parse().expect("toml");

        assert!(contains_path(&doc, "demo.tour"));
        assert!(!contains_path(&doc, "demo.reveal_step_ms"));
        assert!(!contains_path(&doc, "logging.level"));
    }

    #[test]
    fn every_listed_field_has_a_display_value() {
        let config = AppConfig::default();
        for (key_path, _) in FIELDS {
            assert_ne!(display_value(&config, key_path), "<unknown>", "{key_path}");
        }
    }
}
