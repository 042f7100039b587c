use super::*;
use crate::error::ErrorCode;
use crate::fixtures::builtin;

fn catalog_with(scenarios: serde_json::Value) -> String {
    serde_json::json!({ "version": 1, "scenarios": scenarios }).to_string()
}

#[test]
fn embedded_catalog_is_valid() {
    let catalog = ScenarioCatalog::embedded().unwrap();
    assert!(catalog.version > 0);
    assert!(catalog.find("eks_desired_capacity_under_limit").is_some());
    assert!(catalog.find("nfs_variables_not_provided").is_some());
    assert_eq!(catalog.select(Some("nfs")).len(), 3);
    assert_eq!(catalog.select(None).len(), catalog.scenarios.len());
}

#[test]
fn every_embedded_scenario_passes_on_the_simulated_engine() {
    let catalog = ScenarioCatalog::embedded().unwrap();
    let driver = PlanDriver::simulated();
    for scenario in &catalog.scenarios {
        assert_eq!(
            scenario.evaluate(&driver, builtin()),
            ScenarioOutcome::Passed,
            "scenario {} did not pass",
            scenario.id
        );
    }
}

#[test]
fn rejects_duplicate_ids() {
    let scenario = serde_json::json!({
        "id": "dup",
        "module": "AWS/eks",
        "expect": {"outcome": "rejected", "contains": ["x"]}
    });
    let err = ScenarioCatalog::from_json(&catalog_with(serde_json::json!([scenario, scenario])), builtin())
        .unwrap_err();
    assert!(err.to_string().contains("duplicate scenario id"));
}

#[test]
fn rejects_unknown_fixtures_and_empty_expectations() {
    let unknown = catalog_with(serde_json::json!([{
        "id": "a",
        "module": "AWS/eks",
        "fixture": "eks_typo",
        "expect": {"outcome": "rejected", "contains": ["x"]}
    }]));
    assert!(ScenarioCatalog::from_json(&unknown, builtin())
        .unwrap_err()
        .to_string()
        .contains("unknown fixture"));

    let empty = catalog_with(serde_json::json!([{
        "id": "b",
        "module": "AWS/eks",
        "expect": {"outcome": "planned"}
    }]));
    assert!(ScenarioCatalog::from_json(&empty, builtin())
        .unwrap_err()
        .to_string()
        .contains("at least one expectation"));

    let zero = serde_json::json!({"version": 0, "scenarios": []}).to_string();
    assert!(ScenarioCatalog::from_json(&zero, builtin()).is_err());
}

#[test]
fn overrides_apply_on_top_of_the_fixture() {
    let catalog = ScenarioCatalog::embedded().unwrap();
    let scenario = catalog.find("nfs_chart_name_override").unwrap();
    let options = scenario.options(builtin()).unwrap();
    assert_eq!(options.vars().get("chart_name"), Some(&Value::from("shared-home")));
    assert_eq!(options.vars().get("namespace"), Some(&Value::from("dummy-namespace")));
    assert_eq!(
        builtin().get("nfs_valid").unwrap().get("chart_name"),
        Some(&Value::from("test-nfs"))
    );
}

#[test]
fn failures_are_collected_not_short_circuited() {
    let json = catalog_with(serde_json::json!([{
        "id": "wrong",
        "module": "AWS/eks",
        "fixture": "eks_valid",
        "expect": {
            "outcome": "planned",
            "resources": [
                {"address": "helm_release.cluster-autoscaler", "attributes": {"status": "failed", "chart": "autoscaler"}},
                {"address": "helm_release.missing"}
            ],
            "absent_resources": ["aws_iam_policy.cluster_autoscaler"],
            "variables": {"desired_capacity": 1}
        }
    }]));
    let catalog = ScenarioCatalog::from_json(&json, builtin()).unwrap();
    match catalog.scenarios[0].evaluate(&PlanDriver::simulated(), builtin()) {
        ScenarioOutcome::Failed(failures) => {
            assert_eq!(failures.len(), 5);
            assert!(failures
                .iter()
                .any(|failure| matches!(failure, AssertionError::ResourceNotFound { .. })));
            assert!(failures
                .iter()
                .any(|failure| matches!(failure, AssertionError::UnexpectedResource { .. })));
        }
        other => panic!("expected failures, got {other:?}"),
    }
}

#[test]
fn unexpected_outcome_is_a_failure_not_a_fatal() {
    let json = catalog_with(serde_json::json!([{
        "id": "flip",
        "module": "products/bitbucket/nfs",
        "expect": {"outcome": "planned", "absent_resources": ["helm_release.nfs"]}
    }]));
    let catalog = ScenarioCatalog::from_json(&json, builtin()).unwrap();
    match catalog.scenarios[0].evaluate(&PlanDriver::simulated(), builtin()) {
        ScenarioOutcome::Failed(failures) => {
            assert_eq!(failures.len(), 1);
            assert!(failures[0].to_string().contains("\"namespace\" is not set"));
        }
        other => panic!("expected a failure, got {other:?}"),
    }
}

#[test]
fn unknown_module_is_fatal() {
    let json = catalog_with(serde_json::json!([{
        "id": "missing-module",
        "module": "AWS/rds",
        "expect": {"outcome": "rejected", "contains": ["anything"]}
    }]));
    let catalog = ScenarioCatalog::from_json(&json, builtin()).unwrap();
    assert!(matches!(
        catalog.scenarios[0].evaluate(&PlanDriver::simulated(), builtin()),
        ScenarioOutcome::Fatal(HarnessError::ModuleNotFound { .. })
    ));
}

#[test]
fn fixture_missing_from_the_run_store_is_fatal() {
    let json = catalog_with(serde_json::json!([{
        "id": "store-mismatch",
        "module": "AWS/eks",
        "fixture": "eks_valid",
        "expect": {"outcome": "rejected", "contains": ["anything"]}
    }]));
    let catalog = ScenarioCatalog::from_json(&json, builtin()).unwrap();
    let empty = FixtureStore::default();
    assert!(matches!(
        catalog.scenarios[0].options(&empty),
        Err(HarnessError::FixtureNotFound { ref name }) if name == "eks_valid"
    ));
    match catalog.scenarios[0].evaluate(&PlanDriver::simulated(), &empty) {
        ScenarioOutcome::Fatal(err) => {
            assert_eq!(err.code(), 3010);
            assert!(err.to_string().contains("Fixture 'eks_valid' not found"));
        }
        other => panic!("expected a fatal outcome, got {other:?}"),
    }
}

#[test]
fn runner_reports_in_catalog_order() {
    let catalog = ScenarioCatalog::embedded().unwrap();
    let selected = catalog.select(None);
    let summary = run_scenarios(&selected, &PlanDriver::simulated(), builtin(), 4);
    assert!(summary.all_passed(), "{:#}", summary.to_json());
    assert_eq!(summary.total, catalog.scenarios.len());
    let ids: Vec<_> = summary.reports.iter().map(|report| report.id.as_str()).collect();
    let expected: Vec<_> = catalog.scenarios.iter().map(|scenario| scenario.id.as_str()).collect();
    assert_eq!(ids, expected);
    assert_eq!(summary.to_json()["backend"], "simulated");
}

#[test]
fn runner_counts_failed_and_fatal_scenarios() {
    let json = catalog_with(serde_json::json!([
        {"id": "ok", "module": "products/bitbucket/nfs", "expect": {"outcome": "rejected", "contains": ["\"namespace\" is not set"]}},
        {"id": "bad", "module": "products/bitbucket/nfs", "expect": {"outcome": "rejected", "contains": ["\"capacity\" is not set"]}},
        {"id": "fatal", "module": "../escape", "expect": {"outcome": "rejected", "contains": ["x"]}}
    ]));
    let catalog = ScenarioCatalog::from_json(&json, builtin()).unwrap();
    let summary = run_scenarios(&catalog.select(None), &PlanDriver::simulated(), builtin(), 0);
    assert_eq!((summary.passed, summary.failed, summary.fatal), (1, 1, 1));
    assert_eq!(summary.reports[1].status, ScenarioStatus::Failed);
    assert_eq!(summary.reports[2].failures[0].code, 3001);
    assert!(!summary.all_passed());
}
