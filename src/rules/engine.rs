//! Rule engine - selects the first matching rule and renders its placement

use tracing::{debug, trace};

use super::template::{self, BuiltinContext, RenderContext};
use super::variable::{self, VariableSet};
use super::{FallbackOutput, PlacementDecision, Rule};

/// An immutable, ready-to-evaluate rule set.
///
/// Rules are kept in evaluation order: priority descending, then name
/// ascending. Safe to share across threads behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    rules: Vec<Rule>,
    variables: VariableSet,
    fallback: FallbackOutput,
}

impl RuleEngine {
    /// Create a new rule engine with the given rules and variables
    pub fn new(mut rules: Vec<Rule>, variables: VariableSet) -> Self {
        sort_rules(&mut rules);
        Self {
            rules,
            variables,
            fallback: FallbackOutput::default(),
        }
    }

    /// Replace the placement used when nothing matches
    pub fn with_fallback(mut self, fallback: FallbackOutput) -> Self {
        self.fallback = fallback;
        self
    }

    /// All rules, in evaluation order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Get enabled rules only
    pub fn enabled_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.spec.enabled)
    }

    pub fn variables(&self) -> &VariableSet {
        &self.variables
    }

    pub fn fallback(&self) -> &FallbackOutput {
        &self.fallback
    }

    /// First enabled rule whose condition holds for `text`
    pub fn find_match(&self, text: &str) -> Option<&Rule> {
        for rule in &self.rules {
            if !rule.spec.enabled {
                trace!("Skipping disabled rule: {}", rule.name);
                continue;
            }

            if rule.spec.condition.evaluate(text) {
                debug!("Rule '{}' matched", rule.name);
                return Some(rule);
            }
        }

        None
    }

    /// Classify a document, reading the clock and drawing a fresh `$uuid`.
    pub fn select(&self, text: &str, filename: &str) -> PlacementDecision {
        self.select_with(text, filename, &BuiltinContext::capture())
    }

    /// Classify a document against fixed built-in values.
    ///
    /// Pure: the same inputs always produce the same decision.
    pub fn select_with(
        &self,
        text: &str,
        filename: &str,
        builtins: &BuiltinContext,
    ) -> PlacementDecision {
        let Some(rule) = self.find_match(text) else {
            debug!("No rule matched {}, using fallback placement", filename);
            let context =
                RenderContext::with_builtins(builtins, filename, &self.fallback.category);
            return PlacementDecision {
                matched_rule: None,
                category: self.fallback.category.clone(),
                directory: template::render(&self.fallback.directory, &context),
                filename: template::render_filename(&self.fallback.filename, &context),
                symlinks: Vec::new(),
            };
        };

        let resolved = variable::extract(&self.variables, text);
        let context = RenderContext::with_builtins(builtins, filename, &rule.spec.category)
            .with_variables(resolved);

        PlacementDecision {
            matched_rule: Some(rule.name.clone()),
            category: rule.spec.category.clone(),
            directory: template::render(&rule.spec.output.directory, &context),
            filename: template::render_filename(&rule.spec.output.filename, &context),
            symlinks: rule
                .spec
                .symlinks
                .iter()
                .map(|link| template::render(link.template(), &context))
                .collect(),
        }
    }
}

/// Order rules by priority descending, then name ascending
pub(crate) fn sort_rules(rules: &mut [Rule]) {
    rules.sort_by(|a, b| {
        b.spec
            .priority
            .cmp(&a.spec.priority)
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// Classify one document against a rule list and variable set.
///
/// Convenience wrapper that builds a throwaway [`RuleEngine`]; long-lived
/// callers should build the engine once per configuration load.
pub fn select(
    rules: &[Rule],
    variables: &VariableSet,
    text: &str,
    filename: &str,
) -> PlacementDecision {
    RuleEngine::new(rules.to_vec(), variables.clone()).select(text, filename)
}
