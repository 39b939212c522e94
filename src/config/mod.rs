//! Configuration and startup bootstrap.

mod cli;
mod merge;
mod settings;

pub use cli::Cli;
pub use merge::apply_config_file;
pub use settings::Settings;

use tracing::warn;

use crate::error::Result;

/// Applies an optional `--config-file` overlay, runs the optional
/// `/interpolate-env-vars.sh` pre-processing hook, and validates the
/// result into a [`Settings`]. `cli` has already been parsed by `main` so
/// logging can be initialized from `--debug` before anything else runs.
pub fn bootstrap(mut cli: Cli) -> Result<Settings> {
    run_interpolate_hook();

    if let Some(path) = cli.config_file.clone() {
        apply_config_file(&mut cli, &path)?;
    }

    Settings::from_cli(&cli)
}

/// Invokes `/interpolate-env-vars.sh` once if present; non-fatal if missing
/// or it fails.
fn run_interpolate_hook() {
    const HOOK: &str = "/interpolate-env-vars.sh";
    if !std::path::Path::new(HOOK).exists() {
        return;
    }
    match std::process::Command::new(HOOK).status() {
        Ok(status) if status.success() => {}
        Ok(status) => warn!(?status, "interpolate-env-vars.sh exited non-zero"),
        Err(e) => warn!(error = %e, "failed to invoke interpolate-env-vars.sh"),
    }
}
