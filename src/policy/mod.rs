//! Restart decisions: eligibility matching, rate limiting, and the
//! exhausted-retries mail latch.

mod eligibility;
mod engine;
mod restart_record;

pub use eligibility::{compile_pattern, EligibilityCache};
pub use engine::{Notify, PolicyConfig, PolicyEngine, Restarter};
pub use restart_record::RestartRecord;
