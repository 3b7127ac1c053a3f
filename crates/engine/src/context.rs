//! Execution context shared across the steps of one evaluation.

use std::collections::HashMap;
use std::time::Duration;

/// The profile of the flow being evaluated.
#[derive(Debug, Clone)]
pub struct Profile {
    /// Display label of the flow.
    pub name: String,
    /// URL of the remote calendar the flow was fetched from.
    pub source: String,
    /// Minimum interval between re-fetches of the source.
    pub cache_duration: Duration,
}

/// Mutable state carried through one evaluation run.
///
/// Steps can exchange data through [`vars`](Self::vars); debug output is
/// collected in order on [`debugs`](Self::debugs) and later surfaced as
/// response headers by the server.
#[derive(Debug)]
pub struct ExecutionContext {
    /// Profile of the flow under evaluation.
    pub profile: Profile,

    /// Shared key/value map for cross-step data.
    pub vars: HashMap<String, serde_json::Value>,

    /// Whether debug steps record their messages.
    pub enable_debug: bool,

    /// Whether the engine itself narrates its walk.
    pub verbose: bool,

    /// Ordered trace collected so far.
    pub debugs: Vec<String>,
}

impl ExecutionContext {
    pub fn new(profile: Profile, enable_debug: bool, verbose: bool) -> Self {
        Self {
            profile,
            vars: HashMap::new(),
            enable_debug,
            verbose,
            debugs: Vec::new(),
        }
    }

    /// Record a trace message. Dropped when debug output is disabled.
    pub fn trace(&mut self, message: impl Into<String>) {
        if self.enable_debug {
            self.debugs.push(message.into());
        }
    }

    /// Record an engine-narration message. Only kept in verbose runs.
    pub fn trace_verbose(&mut self, message: impl Into<String>) {
        if self.enable_debug && self.verbose {
            self.debugs.push(message.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        Profile {
            name: "test".to_string(),
            source: "https://example.com/cal.ics".to_string(),
            cache_duration: Duration::from_secs(120),
        }
    }

    #[test]
    fn test_trace_gated_by_debug_flag() {
        let mut ctx = ExecutionContext::new(profile(), false, false);
        ctx.trace("dropped");
        assert!(ctx.debugs.is_empty());

        let mut ctx = ExecutionContext::new(profile(), true, false);
        ctx.trace("kept");
        ctx.trace_verbose("dropped");
        assert_eq!(ctx.debugs, vec!["kept".to_string()]);
    }

    #[test]
    fn test_verbose_trace() {
        let mut ctx = ExecutionContext::new(profile(), true, true);
        ctx.trace_verbose("kept");
        assert_eq!(ctx.debugs.len(), 1);
    }
}
