//! `--config-file` YAML overlay, matching `ArgumentHandler.parse_args`:
//! hyphenated top-level keys override CLI defaults, list-valued keys
//! extend rather than replace, empty values are ignored with a warning.

use serde_yaml::Value;
use tracing::warn;

use crate::config::cli::Cli;
use crate::error::{Result, WatchdogError};

/// Applies the YAML document at `path` onto an already-parsed `Cli`,
/// mutating it in place.
pub fn apply_config_file(cli: &mut Cli, path: &str) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| WatchdogError::Config(format!("cannot read config file {path}: {e}")))?;
    let doc: Value = serde_yaml::from_str(&contents)
        .map_err(|e| WatchdogError::Config(format!("invalid config file {path}: {e}")))?;

    let Value::Mapping(map) = doc else {
        return Err(WatchdogError::Config(format!(
            "config file {path} must be a YAML mapping"
        )));
    };

    for (key, value) in map {
        let Some(key) = key.as_str() else { continue };
        apply_key(cli, key, value);
    }

    Ok(())
}

fn apply_key(cli: &mut Cli, key: &str, value: Value) {
    if is_empty(&value) {
        warn!(key, "ignoring empty config-file value");
        return;
    }

    match key {
        "prog" => cli.prog = value.as_str().map(str::to_string),
        "socket-url" => {
            if let Some(s) = value.as_str() {
                cli.socket_url = s.to_string();
            }
        }
        "print-all-events" => cli.print_all_events = value_as_bool(&value),
        "do-not-print-events" => cli.do_not_print_events = value_as_bool(&value),
        "restart-containers-on-die" => cli.restart_containers_on_die = value_as_bool(&value),
        "do-not-restart-containers-on-die" => {
            cli.do_not_restart_containers_on_die = value_as_bool(&value)
        }
        "restart-limit" => {
            if let Some(n) = value.as_u64() {
                cli.restart_limit = n as usize;
            }
        }
        "restart-threshold" => {
            if let Some(n) = value.as_u64() {
                cli.restart_threshold = n;
            }
        }
        "restart-reset-period" => {
            if let Some(n) = value.as_u64() {
                cli.restart_reset_period = n;
            }
        }
        "containers-to-restart" => {
            cli.containers_to_restart.extend(value_as_string_list(&value));
        }
        "restart-notification-email-addresses-path" => {
            cli.restart_notification_email_addresses_path = value.as_str().map(str::to_string);
        }
        "restart-notification-email-server" => {
            cli.restart_notification_email_server = value.as_str().map(str::to_string);
        }
        "debug" => cli.debug = value_as_bool(&value),
        other => warn!(key = other, "unknown config-file key, ignoring"),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Sequence(items) => items.is_empty(),
        _ => false,
    }
}

fn value_as_bool(value: &Value) -> bool {
    value.as_bool().unwrap_or(false)
}

fn value_as_string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Value::String(s) => s.split(',').map(|p| p.trim().to_string()).collect(),
        _ => Vec::new(),
    }
}
