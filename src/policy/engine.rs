//! Per-container restart decision procedure: eligibility, rate limiting,
//! and the mail-latch on exhaustion.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::broadcast::SemanticNotification;
use crate::error::Result;
use crate::policy::eligibility::EligibilityCache;
use crate::policy::restart_record::RestartRecord;

/// Issues a restart for a container id. Implemented by [`crate::engine::EngineClient`];
/// expressed as a trait here so the decision procedure can be exercised
/// against a fake in tests without a live engine socket.
pub trait Restarter {
    async fn restart(&self, container_id: &str) -> Result<()>;
}

/// Delivers an operator notification. Implemented by [`crate::notify::Notifier`].
pub trait Notify {
    async fn send(&self, subject: &str, body: &str);
}

/// Static, per-run configuration the policy engine needs. Built once from
/// [`crate::config::Settings`] and held for the process lifetime.
pub struct PolicyConfig {
    pub enable_restart: bool,
    pub restart_limit: usize,
    pub restart_threshold: Duration,
    pub restart_reset_period: Duration,
    pub name_patterns: Vec<Regex>,
}

/// Owns every container's [`RestartRecord`] and the eligibility cache.
/// Confined to the single pipeline task: no internal locking.
pub struct PolicyEngine {
    config: PolicyConfig,
    records: HashMap<String, RestartRecord>,
    eligibility: EligibilityCache,
}

impl PolicyEngine {
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config,
            records: HashMap::new(),
            eligibility: EligibilityCache::new(),
        }
    }

    /// Dispatch one semantic notification. `now` is monotonic; `wall_clock`
    /// is used only to format restart timestamps for display.
    pub async fn handle<R: Restarter, N: Notify>(
        &mut self,
        notification: SemanticNotification,
        restarter: &R,
        notifier: &N,
        now: Instant,
        wall_clock: DateTime<Utc>,
    ) {
        match notification {
            SemanticNotification::ContainerStarted { name, .. }
            | SemanticNotification::BecameHealthy { name, .. } => {
                self.maintain_counter(&name, now);
            }
            SemanticNotification::StoppedByHand { name, .. } => {
                debug!(container = %name, "stopped by hand, no restart decision");
            }
            SemanticNotification::ContainerDead { name, raw } => {
                self.handle_failure(&name, raw, true, restarter, notifier, now, wall_clock)
                    .await;
            }
            SemanticNotification::BecameUnhealthy { name, raw } => {
                self.handle_failure(&name, raw, false, restarter, notifier, now, wall_clock)
                    .await;
            }
        }
    }

    /// A container came back on its own (started, or reported healthy).
    /// Leaves the record alone if the last restart we issued is still
    /// within the reset period (it may be the very restart we caused);
    /// otherwise clears the counters and mail latch so a fresh failure
    /// streak starts counting from zero.
    fn maintain_counter(&mut self, name: &str, now: Instant) {
        let reset_period = self.config.restart_reset_period;
        if let Some(record) = self.records.get(name) {
            if let Some(last) = record.last_restart() {
                if now.saturating_duration_since(last) < reset_period {
                    return;
                }
            }
            self.records.get_mut(name).unwrap().reset();
        }
    }

    async fn handle_failure<R: Restarter, N: Notify>(
        &mut self,
        name: &str,
        raw: Value,
        is_dead: bool,
        restarter: &R,
        notifier: &N,
        now: Instant,
        wall_clock: DateTime<Utc>,
    ) {
        if !self
            .eligibility
            .is_eligible(name, &self.config.name_patterns)
        {
            debug!(container = %name, "not eligible for restart, ignoring");
            return;
        }

        let limit = self.config.restart_limit;
        let threshold = self.config.restart_threshold;
        let record = self.records.entry(name.to_string()).or_default();

        if record.restart_allowed(limit, threshold, now) {
            if self.config.enable_restart {
                let container_id = raw.get("id").and_then(Value::as_str).unwrap_or_default();
                match restarter.restart(container_id).await {
                    Ok(()) => {
                        let record = self.records.get_mut(name).unwrap();
                        record.add_occasion(now, wall_clock);
                        let count = record.occasions_len();
                        info!(container = %name, count, limit, "restarted container");
                        let subject = format!("Restarting container: {name} ({count}/{limit})");
                        notifier.send(&subject, &pretty(&raw)).await;
                    }
                    Err(e) => {
                        warn!(container = %name, error = %e, "restart request failed");
                    }
                }
            } else {
                let subject = format!("Container {name} would be restarted (restarts disabled)");
                notifier.send(&subject, &pretty(&raw)).await;
            }
        } else {
            warn!(container = %name, limit, "restart limit reached, not restarting");
            if is_dead {
                let record = self.records.get_mut(name).unwrap();
                if !record.mail_sent {
                    let subject = format!("Maximum restart count reached for container {name}");
                    notifier.send(&subject, &pretty(&raw)).await;
                    record.mail_sent = true;
                }
            }
        }
    }
}

fn pretty(raw: &Value) -> String {
    serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    struct FakeRestarter {
        should_fail: bool,
        calls: RefCell<Vec<String>>,
    }

    impl Restarter for FakeRestarter {
        async fn restart(&self, container_id: &str) -> Result<()> {
            self.calls.borrow_mut().push(container_id.to_string());
            if self.should_fail {
                Err(crate::error::WatchdogError::Protocol("boom".into()))
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default)]
    struct FakeNotifier {
        sent: RefCell<Vec<String>>,
    }

    impl Notify for FakeNotifier {
        async fn send(&self, subject: &str, _body: &str) {
            self.sent.borrow_mut().push(subject.to_string());
        }
    }

    fn config(limit: usize) -> PolicyConfig {
        PolicyConfig {
            enable_restart: true,
            restart_limit: limit,
            restart_threshold: Duration::from_secs(600),
            restart_reset_period: Duration::from_secs(120),
            name_patterns: vec![crate::policy::eligibility::compile_pattern("web-*").unwrap()],
        }
    }

    fn wall_now() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(0, 0).unwrap()
    }

    #[tokio::test]
    async fn ineligible_container_never_restarts() {
        let mut engine = PolicyEngine::new(config(3));
        let restarter = FakeRestarter {
            should_fail: false,
            calls: RefCell::new(vec![]),
        };
        let notifier = FakeNotifier::default();
        engine
            .handle(
                SemanticNotification::ContainerDead {
                    name: "db-1".into(),
                    raw: json!({ "id": "abc" }),
                },
                &restarter,
                &notifier,
                Instant::now(),
                wall_now(),
            )
            .await;
        assert!(restarter.calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn eligible_dead_container_restarts_and_notifies() {
        let mut engine = PolicyEngine::new(config(3));
        let restarter = FakeRestarter {
            should_fail: false,
            calls: RefCell::new(vec![]),
        };
        let notifier = FakeNotifier::default();
        engine
            .handle(
                SemanticNotification::ContainerDead {
                    name: "web-1".into(),
                    raw: json!({ "id": "abc" }),
                },
                &restarter,
                &notifier,
                Instant::now(),
                wall_now(),
            )
            .await;
        assert_eq!(restarter.calls.borrow().as_slice(), ["abc"]);
        assert_eq!(notifier.sent.borrow().len(), 1);
    }

    #[tokio::test]
    async fn exhausted_record_sends_one_mail_only_on_dead() {
        let mut engine = PolicyEngine::new(config(1));
        let restarter = FakeRestarter {
            should_fail: false,
            calls: RefCell::new(vec![]),
        };
        let notifier = FakeNotifier::default();
        let t0 = Instant::now();

        engine
            .handle(
                SemanticNotification::ContainerDead {
                    name: "web-1".into(),
                    raw: json!({ "id": "abc" }),
                },
                &restarter,
                &notifier,
                t0,
                wall_now(),
            )
            .await;
        // Second failure within the threshold: limit of 1 is exhausted.
        engine
            .handle(
                SemanticNotification::ContainerDead {
                    name: "web-1".into(),
                    raw: json!({ "id": "abc" }),
                },
                &restarter,
                &notifier,
                t0 + Duration::from_secs(1),
                wall_now(),
            )
            .await;
        engine
            .handle(
                SemanticNotification::ContainerDead {
                    name: "web-1".into(),
                    raw: json!({ "id": "abc" }),
                },
                &restarter,
                &notifier,
                t0 + Duration::from_secs(2),
                wall_now(),
            )
            .await;

        assert_eq!(restarter.calls.borrow().len(), 1);
        // One "restarting" mail plus exactly one "max reached" mail.
        assert_eq!(notifier.sent.borrow().len(), 2);
    }

    #[tokio::test]
    async fn became_unhealthy_does_not_latch_mail_on_exhaustion() {
        let mut engine = PolicyEngine::new(config(1));
        let restarter = FakeRestarter {
            should_fail: false,
            calls: RefCell::new(vec![]),
        };
        let notifier = FakeNotifier::default();
        let t0 = Instant::now();

        engine
            .handle(
                SemanticNotification::BecameUnhealthy {
                    name: "web-1".into(),
                    raw: json!({ "id": "abc" }),
                },
                &restarter,
                &notifier,
                t0,
                wall_now(),
            )
            .await;
        engine
            .handle(
                SemanticNotification::BecameUnhealthy {
                    name: "web-1".into(),
                    raw: json!({ "id": "abc" }),
                },
                &restarter,
                &notifier,
                t0 + Duration::from_secs(1),
                wall_now(),
            )
            .await;

        // First restarts (1 mail); second is exhausted but is_dead == false,
        // so no "max reached" mail follows.
        assert_eq!(restarter.calls.borrow().len(), 1);
        assert_eq!(notifier.sent.borrow().len(), 1);
    }

    #[tokio::test]
    async fn maintain_counter_resets_after_reset_period() {
        let mut engine = PolicyEngine::new(config(1));
        let restarter = FakeRestarter {
            should_fail: false,
            calls: RefCell::new(vec![]),
        };
        let notifier = FakeNotifier::default();
        let t0 = Instant::now();

        engine
            .handle(
                SemanticNotification::ContainerDead {
                    name: "web-1".into(),
                    raw: json!({ "id": "abc" }),
                },
                &restarter,
                &notifier,
                t0,
                wall_now(),
            )
            .await;
        // Container reports started well after the reset period: counters clear.
        engine
            .handle(
                SemanticNotification::ContainerStarted {
                    name: "web-1".into(),
                    raw: json!({}),
                },
                &restarter,
                &notifier,
                t0 + Duration::from_secs(121),
                wall_now(),
            )
            .await;
        engine
            .handle(
                SemanticNotification::ContainerDead {
                    name: "web-1".into(),
                    raw: json!({ "id": "abc" }),
                },
                &restarter,
                &notifier,
                t0 + Duration::from_secs(122),
                wall_now(),
            )
            .await;

        assert_eq!(restarter.calls.borrow().len(), 2);
    }

    #[tokio::test]
    async fn disabled_restart_notifies_without_restarting() {
        let mut cfg = config(3);
        cfg.enable_restart = false;
        let mut engine = PolicyEngine::new(cfg);
        let restarter = FakeRestarter {
            should_fail: false,
            calls: RefCell::new(vec![]),
        };
        let notifier = FakeNotifier::default();
        engine
            .handle(
                SemanticNotification::ContainerDead {
                    name: "web-1".into(),
                    raw: json!({ "id": "abc" }),
                },
                &restarter,
                &notifier,
                Instant::now(),
                wall_now(),
            )
            .await;
        assert!(restarter.calls.borrow().is_empty());
        assert_eq!(notifier.sent.borrow().len(), 1);
    }
}
