//! Loading resource directories from disk into a working engine

use assert_fs::prelude::*;
use chrono::{Local, TimeZone};
use paporg::config::{self, Config, ConfigLoader, Severity};
use paporg::rules::{BuiltinContext, FallbackOutput};
use predicates::prelude::*;
use uuid::Uuid;

const VARIABLES: &str = r#"
apiVersion: paporg.io/v1
kind: Variable
metadata:
  name: invoice_no
spec:
  pattern: 'INV-(?P<value>\d+)'
  default: none
---
apiVersion: paporg.io/v1
kind: Variable
metadata:
  name: vendor
spec:
  pattern: 'From: (?P<value>[^\n]+)'
  transform: slugify
"#;

const RULES: &str = r#"
apiVersion: paporg.io/v1
kind: Rule
metadata:
  name: invoices
  labels:
    team: finance
spec:
  priority: 100
  category: invoices
  match:
    any:
      - containsAny: [Invoice, Rechnung]
      - pattern: 'INV-\d+'
        caseSensitive: true
  output:
    directory: "$y/Tax/$vendor"
    filename: "$invoice_no-$original"
  symlinks:
    - "Vendors/$vendor"
    - target: "Years/$y"
---
apiVersion: paporg.io/v1
kind: Rule
metadata:
  name: letters
spec:
  match:
    all:
      - pattern: '^Dear'
      - not: { contains: invoice }
  output:
    directory: Letters
    filename: "$timestamp"
"#;

fn builtins() -> BuiltinContext {
    let now = Local.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap();
    BuiltinContext::new(now, Uuid::nil())
}

#[test]
fn test_loads_nested_resources() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("variables.yaml").write_str(VARIABLES).unwrap();
    temp.child("rules/finance.yml").write_str(RULES).unwrap();
    temp.child("README.md").write_str("not a resource").unwrap();

    let (engine, issues) = config::build_engine_from(temp.path(), &FallbackOutput::default()).unwrap();

    assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    let names: Vec<_> = engine.rules().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["invoices", "letters"]);
    assert_eq!(engine.variables().len(), 2);

    let decision = engine.select_with(
        "Invoice INV-0042\nFrom: Stadtwerke Köln\n",
        "scan 1.pdf",
        &builtins(),
    );
    assert_eq!(decision.matched_rule.as_deref(), Some("invoices"));
    assert_eq!(decision.category, "invoices");
    assert_eq!(decision.directory, "2024/Tax/stadtwerke-köln");
    assert_eq!(decision.filename, "0042-scan 1");
    assert_eq!(decision.symlinks, ["Vendors/stadtwerke-köln", "Years/2024"]);

    let decision = engine.select_with("Dear Sir,\nthanks", "letter.pdf", &builtins());
    assert_eq!(decision.matched_rule.as_deref(), Some("letters"));
    assert_eq!(decision.filename, "20240115T083000");

    temp.close().unwrap();
}

#[test]
fn test_bad_resources_are_reported_and_skipped() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("broken.yaml")
        .write_str(
            r#"
apiVersion: paporg.io/v1
kind: Rule
metadata: { name: bad-regex }
spec:
  match: { pattern: "([unclosed" }
  output: { directory: x, filename: y }
---
apiVersion: paporg.io/v1
kind: Rule
metadata: { name: ambiguous }
spec:
  match: { contains: a, pattern: b }
  output: { directory: x, filename: y }
---
apiVersion: paporg.io/v1
kind: Variable
metadata: { name: y }
spec: { pattern: '\d+' }
---
apiVersion: paporg.io/v1
kind: Rule
metadata: { name: good }
spec:
  match: { contains: ok }
  output: { directory: "$missing/ok", filename: "$original" }
"#,
        )
        .unwrap();

    let (engine, issues) = config::build_engine_from(temp.path(), &FallbackOutput::default()).unwrap();

    let names: Vec<_> = engine.rules().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["good"]);
    assert!(engine.variables().is_empty());

    let errors: Vec<_> = issues
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .map(ToString::to_string)
        .collect();
    assert_eq!(errors.len(), 3, "{errors:?}");
    assert!(predicate::str::contains("invalid pattern").eval(&errors.join("\n")));
    assert!(predicate::str::contains("exactly one of").eval(&errors.join("\n")));
    assert!(predicate::str::contains("reserved").eval(&errors.join("\n")));

    let warnings: Vec<_> = issues
        .iter()
        .filter(|i| i.severity == Severity::Warning)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(predicate::str::contains("$missing").eval(&warnings[0].message()));

    // Unknown tokens render empty
    let decision = engine.select("ok", "doc.pdf");
    assert_eq!(decision.directory, "ok");
}

#[test]
fn test_missing_directory_is_empty() {
    let temp = assert_fs::TempDir::new().unwrap();
    let missing = temp.child("nope");
    missing.assert(predicate::path::missing());

    let loaded = ConfigLoader::new(missing.path()).load().unwrap();
    assert!(loaded.rules.is_empty());
    assert!(loaded.issues.is_empty());
}

#[test]
fn test_settings_file_points_at_resources() {
    let temp = assert_fs::TempDir::new().unwrap();
    let resources = temp.child("res");
    resources.child("r.yaml").write_str(RULES).unwrap();
    resources.child("v.yaml").write_str(VARIABLES).unwrap();

    let settings = temp.child("config.toml");
    settings
        .write_str(&format!(
            "[general]\nresources_dir = {:?}\n\n[unsorted]\ndirectory = \"inbox\"\n",
            resources.path()
        ))
        .unwrap();
    settings.assert(predicate::str::contains("resources_dir"));

    let config = Config::load(Some(settings.path())).unwrap();
    let (engine, issues) = config.build_engine().unwrap();
    assert!(issues.is_empty());
    assert_eq!(engine.rules().len(), 2);

    let decision = engine.select("nothing relevant", "x.pdf");
    assert_eq!(decision.matched_rule, None);
    assert_eq!(decision.directory, "inbox");
    assert_eq!(decision.category, "unsorted");
}
