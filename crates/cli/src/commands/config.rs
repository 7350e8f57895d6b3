use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use hrflow_core::config::{AppConfig, LoadOptions};
use hrflow_core::domain::actor::Role;
use hrflow_core::domain::request::RequestKind;
use toml::Value;

struct FileSource {
    path: PathBuf,
    doc: Value,
}

pub fn run() -> String {
    let options = LoadOptions::default();
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };
    let file = AppConfig::resolved_path(&options).and_then(|path| load_config_file(&path));

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];
    let mut push = |key: &str, value: &str, env_keys: &[&str]| {
        lines.push(render_line(key, value, field_source(key, env_keys, file.as_ref())));
    };

    push("database.url", &config.database.url, &["HRFLOW_DATABASE_URL"]);
    push(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        &["HRFLOW_DATABASE_MAX_CONNECTIONS"],
    );
    push(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        &["HRFLOW_DATABASE_TIMEOUT_SECS"],
    );
    push("server.bind_address", &config.server.bind_address, &["HRFLOW_SERVER_BIND_ADDRESS"]);
    push("server.port", &config.server.port.to_string(), &["HRFLOW_SERVER_PORT"]);
    push(
        "server.graceful_shutdown_secs",
        &config.server.graceful_shutdown_secs.to_string(),
        &["HRFLOW_SERVER_GRACEFUL_SHUTDOWN_SECS"],
    );
    push("logging.level", &config.logging.level, &["HRFLOW_LOGGING_LEVEL", "HRFLOW_LOG_LEVEL"]);
    push(
        "logging.format",
        config.logging.format.as_str(),
        &["HRFLOW_LOGGING_FORMAT", "HRFLOW_LOG_FORMAT"],
    );
    push(
        "workflow.max_hierarchy_depth",
        &config.workflow.max_hierarchy_depth.to_string(),
        &["HRFLOW_WORKFLOW_MAX_HIERARCHY_DEPTH"],
    );

    for kind in RequestKind::ALL {
        for role in Role::ALL {
            let key = format!("workflow.sequences.{}.{}", kind.as_str(), role.as_str());
            let steps = config
                .workflow
                .sequences
                .sequence_for(kind, role)
                .steps()
                .iter()
                .map(|status| status.as_str())
                .collect::<Vec<_>>()
                .join(" -> ");
            push(&key, &steps, &[]);
        }
    }

    lines.join("\n")
}

fn load_config_file(path: &Path) -> Option<FileSource> {
    let raw = fs::read_to_string(path).ok()?;
    let doc = raw.parse::<Value>().ok()?;
    Some(FileSource { path: path.to_path_buf(), doc })
}

fn field_source(key_path: &str, env_keys: &[&str], file: Option<&FileSource>) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(file) = file {
        if contains_path(&file.doc, key_path) {
            return format!("file ({})", file.path.display());
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
    use std::path::PathBuf;

    use toml::Value;

    use super::{contains_path, field_source, FileSource};

    fn file(raw: &str) -> FileSource {
        FileSource { path: PathBuf::from("hrflow.toml"), doc: raw.parse::<Value>().expect("toml") }
    }

    #[test]
    fn nested_sequence_keys_resolve_against_the_file() {
        let source = file("[workflow.sequences.business_trip]\nceo = [\"pending_hr\"]\n");
        assert!(contains_path(&source.doc, "workflow.sequences.business_trip.ceo"));
        assert!(!contains_path(&source.doc, "workflow.sequences.manpower.ceo"));
        assert_eq!(
            field_source("workflow.sequences.business_trip.ceo", &[], Some(&source)),
            "file (hrflow.toml)"
        );
    }

    #[test]
    fn fields_absent_everywhere_report_default() {
        let source = file("[logging]\nlevel = \"debug\"\n");
        assert_eq!(
            field_source("server.port", &["HRFLOW_TEST_UNSET_PORT_VAR"], Some(&source)),
            "default"
        );
    }
}
