//! Published rule-set snapshot shared between reloads and classification

use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::info;

use crate::rules::{PlacementDecision, RuleEngine};

/// The current [`RuleEngine`], replaced wholesale on every reload.
///
/// Readers take an `Arc` to the engine that was current when they started
/// and keep using it even if a newer one is published meanwhile.
#[derive(Debug)]
pub struct SharedEngine {
    current: ArcSwap<RuleEngine>,
}

impl SharedEngine {
    pub fn new(engine: RuleEngine) -> Self {
        Self {
            current: ArcSwap::from_pointee(engine),
        }
    }

    /// The engine in effect right now
    pub fn load(&self) -> Arc<RuleEngine> {
        self.current.load_full()
    }

    /// Publish a fully built engine, returning the one it replaced
    pub fn replace(&self, engine: RuleEngine) -> Arc<RuleEngine> {
        info!(
            "Publishing rule set: {} rules, {} variables",
            engine.rules().len(),
            engine.variables().len()
        );
        self.current.swap(Arc::new(engine))
    }

    /// Classify against the current snapshot
    pub fn select(&self, text: &str, filename: &str) -> PlacementDecision {
        self.current.load().select(text, filename)
    }
}

impl Default for SharedEngine {
    fn default() -> Self {
        Self::new(RuleEngine::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{MatchCondition, OutputSpec, Rule, RuleSpec, VariableSet};

    fn engine_with(directory: &str) -> RuleEngine {
        RuleEngine::new(
            vec![Rule::new(
                "only",
                RuleSpec::new(
                    MatchCondition::contains("doc"),
                    OutputSpec::new(directory, "$original"),
                ),
            )],
            VariableSet::new(),
        )
    }

    #[test]
    fn test_captured_snapshot_survives_replace() {
        let shared = SharedEngine::new(engine_with("old"));
        let captured = shared.load();

        let previous = shared.replace(engine_with("new"));

        assert_eq!(previous.rules()[0].spec.output.directory, "old");
        assert_eq!(captured.select("doc", "a.pdf").directory, "old");
        assert_eq!(shared.select("doc", "a.pdf").directory, "new");
    }

    #[test]
    fn test_default_is_empty() {
        let shared = SharedEngine::default();
        assert!(shared.select("doc", "a.pdf").matched_rule.is_none());
    }
}
