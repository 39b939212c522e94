//! Name-pattern eligibility memoization.

use std::collections::HashSet;

use regex::Regex;

/// Compiles a configured name pattern into an anchored regex. Patterns are
/// regular expressions in their own right; a bare `*` is special-cased to
/// `.*` so a glob-style pattern like `web-*` still works as a wildcard
/// instead of being rejected as invalid regex syntax.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let rewritten = pattern.replace('*', ".*");
    Regex::new(&format!("^{rewritten}$"))
}

/// Caches eligibility decisions per container name so repeated events for
/// the same container don't re-run the pattern list. Decisions are stable
/// for the lifetime of the process: the pattern list never changes after
/// startup.
#[derive(Default)]
pub struct EligibilityCache {
    allowed: HashSet<String>,
    denied: HashSet<String>,
}

impl EligibilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `name` matches any of `patterns`. An empty pattern list means
    /// no container is eligible until one is configured.
    pub fn is_eligible(&mut self, name: &str, patterns: &[Regex]) -> bool {
        if self.allowed.contains(name) {
            return true;
        }
        if self.denied.contains(name) {
            return false;
        }
        let eligible = patterns.iter().any(|p| p.is_match(name));
        if eligible {
            self.allowed.insert(name.to_string());
        } else {
            self.denied.insert(name.to_string());
        }
        eligible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_star_matches_prefix() {
        let re = compile_pattern("web-*").unwrap();
        assert!(re.is_match("web-1"));
        assert!(!re.is_match("db-1"));
    }

    #[test]
    fn exact_pattern_requires_full_match() {
        let re = compile_pattern("web-1").unwrap();
        assert!(re.is_match("web-1"));
        assert!(!re.is_match("web-12"));
    }

    #[test]
    fn real_regex_patterns_compile_and_match() {
        let re = compile_pattern("^web-.*").unwrap();
        assert!(re.is_match("web-1"));
        assert!(re.is_match("web-anything"));
        assert!(!re.is_match("db-1"));
    }

    #[test]
    fn empty_pattern_list_denies_everything() {
        let mut cache = EligibilityCache::new();
        assert!(!cache.is_eligible("web-1", &[]));
    }

    #[test]
    fn decision_is_memoized() {
        let mut cache = EligibilityCache::new();
        let patterns = vec![compile_pattern("web-*").unwrap()];
        assert!(cache.is_eligible("web-1", &patterns));
        // Second call must not need the pattern list to agree.
        assert!(cache.is_eligible("web-1", &[]));
    }

    #[test]
    fn denial_is_also_memoized() {
        let mut cache = EligibilityCache::new();
        let patterns = vec![compile_pattern("web-*").unwrap()];
        assert!(!cache.is_eligible("db-1", &patterns));
        assert!(!cache.is_eligible("db-1", &patterns));
        assert!(!cache.allowed.contains("db-1"));
        assert!(cache.denied.contains("db-1"));
    }
}
