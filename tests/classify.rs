//! End-to-end placement decisions through the public API

use chrono::{Local, TimeZone};
use paporg::rules::{
    BuiltinContext, FallbackOutput, OutputSpec, Transform, VariableSet, VariableSpec,
};
use paporg::{MatchCondition, Rule, RuleEngine, RuleSpec, select};
use uuid::Uuid;

fn builtins() -> BuiltinContext {
    let now = Local.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
    BuiltinContext::new(now, Uuid::nil())
}

fn invoices_rule() -> Rule {
    Rule::new(
        "invoices",
        RuleSpec::new(
            MatchCondition::contains_any(["Invoice", "Rechnung"]).unwrap(),
            OutputSpec::new("$y/Tax/Invoices", "$original"),
        )
        .with_priority(100),
    )
}

#[test]
fn test_invoice_lands_in_tax_folder() {
    let engine = RuleEngine::new(vec![invoices_rule()], VariableSet::new());

    let decision = engine.select_with("Invoice #INV-2024-001", "scan.pdf", &builtins());

    assert_eq!(decision.matched_rule.as_deref(), Some("invoices"));
    assert_eq!(decision.category, "");
    assert_eq!(decision.directory, "2024/Tax/Invoices");
    assert_eq!(decision.filename, "scan");
    assert!(decision.symlinks.is_empty());
}

#[test]
fn test_highest_priority_wins() {
    let receipts = Rule::new(
        "receipts",
        RuleSpec::new(
            MatchCondition::contains("total"),
            OutputSpec::new("Receipts", "$original"),
        )
        .with_priority(10),
    );
    let engine = RuleEngine::new(vec![receipts, invoices_rule()], VariableSet::new());

    let decision = engine.select_with("Invoice total: 12 EUR", "a.pdf", &builtins());
    assert_eq!(decision.matched_rule.as_deref(), Some("invoices"));

    let decision = engine.select_with("total: 12 EUR", "a.pdf", &builtins());
    assert_eq!(decision.matched_rule.as_deref(), Some("receipts"));
}

#[test]
fn test_no_match_uses_fallback() {
    let engine = RuleEngine::new(vec![invoices_rule()], VariableSet::new()).with_fallback(
        FallbackOutput {
            category: "inbox".to_string(),
            directory: "inbox/$y".to_string(),
            filename: "$original".to_string(),
        },
    );

    let decision = engine.select_with("a holiday postcard", "card.jpg", &builtins());

    assert_eq!(decision.matched_rule, None);
    assert_eq!(decision.category, "inbox");
    assert_eq!(decision.directory, "inbox/2024");
    assert_eq!(decision.filename, "card");
}

#[test]
fn test_variables_and_symlinks_render() {
    let mut variables = VariableSet::new();
    variables.insert(
        "vendor".to_string(),
        VariableSpec::new(r"From:\s*(?P<value>[^\n]+)").with_transform(Transform::Slugify),
    );
    variables.insert(
        "amount".to_string(),
        VariableSpec::new(r"Total:\s*(?P<value>\d+)").with_default("0"),
    );

    let rule = Rule::new(
        "bills",
        RuleSpec::new(
            MatchCondition::contains("bill"),
            OutputSpec::new("Bills/$vendor", "$y-$m-$d_$vendor_$amount"),
        )
        .with_category("bills")
        .with_symlink("By-Category/$category/$original"),
    );
    let engine = RuleEngine::new(vec![rule], variables);

    let decision = engine.select_with("Your bill\nFrom: ACME Power Co.\n", "x.pdf", &builtins());

    assert_eq!(decision.directory, "Bills/acme-power-co");
    assert_eq!(decision.filename, "2024-06-30_acme-power-co_0");
    assert_eq!(decision.symlinks, vec!["By-Category/bills/x".to_string()]);
}

#[test]
fn test_rendered_paths_are_sanitized() {
    let rule = Rule::new(
        "odd",
        RuleSpec::new(
            MatchCondition::contains("odd"),
            OutputSpec::new("a/../b//c:d", "we?ird*"),
        ),
    );
    let engine = RuleEngine::new(vec![rule], VariableSet::new());

    let decision = engine.select_with("odd", "f.pdf", &builtins());
    assert_eq!(decision.directory, "a/b/cd");
    assert_eq!(decision.filename, "weird");
}

#[test]
fn test_select_is_deterministic_with_fixed_builtins() {
    let engine = RuleEngine::new(vec![invoices_rule()], VariableSet::new());
    let ctx = builtins();

    let first = engine.select_with("Rechnung 42", "r.pdf", &ctx);
    for _ in 0..10 {
        assert_eq!(engine.select_with("Rechnung 42", "r.pdf", &ctx), first);
    }
}

#[test]
fn test_free_select_matches_engine() {
    let rules = vec![invoices_rule()];
    let decision = select(&rules, &VariableSet::new(), "Invoice", "scan.pdf");
    assert_eq!(decision.matched_rule.as_deref(), Some("invoices"));
    assert_eq!(decision.filename, "scan");
}

#[test]
fn test_decision_serializes_camel_case() {
    let engine = RuleEngine::new(vec![invoices_rule()], VariableSet::new());
    let decision = engine.select_with("Invoice", "scan.pdf", &builtins());

    let json = serde_json::to_value(&decision).unwrap();
    assert_eq!(json["matchedRule"], "invoices");
    assert_eq!(json["outputDirectory"], "2024/Tax/Invoices");
    assert_eq!(json["outputFilename"], "scan");
}
