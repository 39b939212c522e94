//! Pipes raw events into a child process' stdin, fire-and-forget.

use std::process::Stdio;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::warn;

/// Spawns `argv` once per event and writes the event's JSON to its stdin.
/// The child's lifecycle is not awaited by the pipeline: a slow or hung
/// sink program must never back-pressure it.
pub struct ProgramSink {
    argv: Option<Arc<Vec<String>>>,
}

impl ProgramSink {
    /// `program` is the raw `--prog` value, split with shell quoting rules.
    pub fn new(program: Option<&str>) -> crate::error::Result<Self> {
        let argv = match program {
            Some(s) => {
                let parts = shell_words::split(s)
                    .map_err(|e| crate::error::WatchdogError::Config(format!("invalid --prog: {e}")))?;
                if parts.is_empty() {
                    return Err(crate::error::WatchdogError::Config(
                        "--prog must not be empty".into(),
                    ));
                }
                Some(Arc::new(parts))
            }
            None => None,
        };
        Ok(Self { argv })
    }

    pub fn handle(&self, raw: &Value) {
        let Some(argv) = self.argv.clone() else {
            return;
        };
        let payload = raw.to_string();
        tokio::spawn(async move {
            let mut child = match Command::new(&argv[0])
                .args(&argv[1..])
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
            {
                Ok(child) => child,
                Err(e) => {
                    warn!(program = %argv[0], error = %e, "failed to spawn sink program");
                    return;
                }
            };
            if let Some(mut stdin) = child.stdin.take() {
                if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                    warn!(program = %argv[0], error = %e, "failed to write event to sink program stdin");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_program_configured_is_a_noop() {
        let sink = ProgramSink::new(None).unwrap();
        assert!(sink.argv.is_none());
    }

    #[test]
    fn rejects_empty_program_string() {
        assert!(ProgramSink::new(Some("   ")).is_err());
    }

    #[test]
    fn splits_quoted_argv() {
        let sink = ProgramSink::new(Some("/bin/cat -n")).unwrap();
        let argv = sink.argv.unwrap();
        assert_eq!(argv.as_slice(), ["/bin/cat", "-n"]);
    }
}
