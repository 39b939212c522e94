//! Immutable `Settings` record built once at startup and shared by every
//! other component for the process lifetime.

use std::time::Duration;

use regex::Regex;

use crate::config::cli::Cli;
use crate::engine::SocketTarget;
use crate::error::{Result, WatchdogError};

/// Resolved, validated configuration for a single run. Built once in
/// `cmd::root::run` and shared by reference for the process lifetime.
pub struct Settings {
    pub socket_target: SocketTarget,
    pub program: Option<String>,
    pub print_events: bool,
    pub enable_restart: bool,
    pub restart_limit: usize,
    pub restart_threshold: Duration,
    pub restart_reset_period: Duration,
    pub name_patterns: Vec<Regex>,
    pub mail_recipients: Vec<String>,
    pub mail_server: Option<String>,
    pub mail_from_host: String,
}

impl Settings {
    /// Validates and compiles a fully-merged `Cli` into a `Settings`.
    /// Fatal misconfiguration (missing SMTP relay, unreadable/empty
    /// recipients file, unknown socket scheme) surfaces here as
    /// `WatchdogError::Config` before the daemon starts its main loop.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let socket_target = SocketTarget::parse(&cli.socket_url)?;

        let mail_server = cli.restart_notification_email_server.clone();
        if mail_server.is_none() {
            return Err(WatchdogError::Config(
                "--restart-notification-email-server is required".into(),
            ));
        }

        let mail_recipients = match &cli.restart_notification_email_addresses_path {
            Some(path) => read_recipients(path)?,
            None => {
                return Err(WatchdogError::Config(
                    "--restart-notification-email-addresses-path is required".into(),
                ))
            }
        };

        let patterns = if cli.containers_to_restart.is_empty() {
            vec![".*".to_string()]
        } else {
            cli.containers_to_restart.clone()
        };
        let name_patterns = patterns
            .iter()
            .map(|p| crate::policy::compile_pattern(p))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| WatchdogError::Config(format!("invalid name pattern: {e}")))?;

        let mail_from_host = read_mail_from_host();

        Ok(Self {
            socket_target,
            program: cli.prog.clone(),
            print_events: cli.print_events(),
            enable_restart: cli.restart_enabled(),
            restart_limit: cli.restart_limit,
            restart_threshold: Duration::from_secs(cli.restart_threshold * 60),
            restart_reset_period: Duration::from_secs(cli.restart_reset_period * 60),
            name_patterns,
            mail_recipients,
            mail_server,
            mail_from_host,
        })
    }
}

/// Reads one recipient per line, skipping blank lines. Fails if the file is
/// missing or contains no usable address.
fn read_recipients(path: &str) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| WatchdogError::Config(format!("cannot read recipients file {path}: {e}")))?;
    let recipients: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if recipients.is_empty() {
        return Err(WatchdogError::Config(format!(
            "recipients file {path} is empty"
        )));
    }
    Ok(recipients)
}

/// Reads `/dockermon/host-hostname` if present; falls back to `"root"`.
fn read_mail_from_host() -> String {
    std::fs::read_to_string("/dockermon/host-hostname")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "root".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_recipients_file_is_an_error() {
        assert!(read_recipients("/nonexistent/path/recipients.txt").is_err());
    }

    #[test]
    fn empty_recipients_file_is_an_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "   \n").unwrap();
        let err = read_recipients(f.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, WatchdogError::Config(_)));
    }

    #[test]
    fn recipients_file_skips_blank_lines() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "ops@example.com\n\nalerts@example.com\n").unwrap();
        let recipients = read_recipients(f.path().to_str().unwrap()).unwrap();
        assert_eq!(recipients, vec!["ops@example.com", "alerts@example.com"]);
    }
}
