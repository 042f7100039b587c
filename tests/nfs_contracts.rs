//! Input contracts of the `products/bitbucket/nfs` module.

use std::collections::BTreeMap;

use module_contracts::assertions;
use module_contracts::fixtures::{self, fixture, with_overrides};
use module_contracts::options;
use module_contracts::{DriverError, PlanDriver, Value};

const MODULE: &str = "products/bitbucket/nfs";

fn expected_values(chart_name: &str, capacity: &str) -> String {
    format!(
        "\"nameOverride\": \"{chart_name}\"\n\"persistence\":\n  \"size\": \"{capacity}\"\n\"resources\":\n  \"limits\":\n    \"cpu\": \"{}\"\n    \"memory\": \"{}\"\n  \"requests\":\n    \"cpu\": \"{}\"\n    \"memory\": \"{}\"\n",
        fixtures::NFS_LIMITS_CPU,
        fixtures::NFS_LIMITS_MEMORY,
        fixtures::NFS_REQUESTS_CPU,
        fixtures::NFS_REQUESTS_MEMORY,
    )
}

#[test]
fn variables_not_provided() {
    let err = PlanDriver::simulated().expect_rejection(&options::build(None, MODULE));

    assertions::contains(err.text(), "\"namespace\" is not set").unwrap();
    for optional in [
        "chart_name",
        "capacity",
        "requests_cpu",
        "requests_memory",
        "limits_cpu",
        "limits_memory",
    ] {
        assertions::not_contains(err.text(), &format!("\"{optional}\" is not set")).unwrap();
    }
    assert_eq!(err.error_count(), 1);
    assert_eq!(err.diagnostics()[0].summary, "No value for required variable");
}

#[test]
fn chart_name_round_trips_into_the_release() {
    let plan = PlanDriver::simulated().expect_plan(&options::build(Some(fixture("nfs_valid")), MODULE));

    let release = plan.resource("helm_release.nfs").unwrap();
    assertions::equals("name", &Value::from("bitbucket-nfs"), release.attribute("name").unwrap())
        .unwrap();
    assertions::equals(
        "namespace",
        &Value::from(fixtures::NFS_NAMESPACE),
        release.attribute("namespace").unwrap(),
    )
    .unwrap();

    let values = release.attribute("values").unwrap();
    assertions::cardinality("values", values, 1).unwrap();
    assertions::equals(
        "values",
        &Value::from(expected_values(
            fixtures::NFS_CHART_NAME_OVERRIDE,
            fixtures::NFS_CAPACITY,
        )),
        &values.as_list().unwrap()[0],
    )
    .unwrap();
}

#[test]
fn overrides_replace_chart_name_and_capacity() {
    let overrides = BTreeMap::from([
        ("chart_name".to_string(), Value::from("shared-home")),
        ("capacity".to_string(), Value::from("50Gi")),
    ]);
    let vars = with_overrides(fixture("nfs_valid"), &overrides);
    let plan = PlanDriver::simulated().expect_plan(&options::build(Some(&vars), MODULE));

    assert_eq!(
        plan.resource("helm_release.nfs")
            .unwrap()
            .attribute_path("values.0")
            .unwrap(),
        &Value::from(expected_values("shared-home", "50Gi"))
    );
    // the shared fixture is untouched
    assert_eq!(
        fixture("nfs_valid").get("chart_name"),
        Some(&Value::from(fixtures::NFS_CHART_NAME_OVERRIDE))
    );
}

#[test]
fn defaults_apply_with_only_the_namespace() {
    let vars = BTreeMap::from([("namespace".to_string(), Value::from("shared"))]);
    let plan = PlanDriver::simulated().expect_plan(&options::build(Some(&vars), MODULE));

    assert_eq!(plan.variable("chart_name").unwrap(), &Value::from("nfs-server"));
    assert_eq!(plan.variable("capacity").unwrap(), &Value::from("10Gi"));
    let values = plan
        .resource("helm_release.nfs")
        .unwrap()
        .attribute_path("values.0")
        .unwrap()
        .as_str()
        .unwrap()
        .to_string();
    assertions::contains_all(&values, ["\"nameOverride\": \"nfs-server\"", "\"cpu\": \"0.25\""])
        .unwrap();
}

#[test]
fn null_namespace_is_rejected() {
    let mut vars = fixture("nfs_valid").clone();
    vars.insert("namespace".to_string(), Value::Null);
    let err = PlanDriver::simulated().expect_rejection(&options::build(Some(&vars), MODULE));

    assertions::contains_all(err.text(), ["\"namespace\"", "the given value is null"]).unwrap();
    assert_eq!(err.error_count(), 1);
    assert_eq!(err.diagnostics()[0].summary, "Required variable not set");
}

#[test]
fn null_optional_variable_takes_its_default() {
    let mut vars = fixture("nfs_valid").clone();
    vars.insert("chart_name".to_string(), Value::Null);
    let plan = PlanDriver::simulated().expect_plan(&options::build(Some(&vars), MODULE));

    assert_eq!(plan.variable("chart_name").unwrap(), &Value::from("nfs-server"));
    assertions::contains(
        plan.resource("helm_release.nfs")
            .unwrap()
            .attribute_path("values.0")
            .unwrap()
            .as_str()
            .unwrap(),
        "\"nameOverride\": \"nfs-server\"",
    )
    .unwrap();
}

#[test]
fn execute_separates_rejection_from_fatal_errors() {
    let driver = PlanDriver::simulated();
    match driver.execute(&options::build(None, MODULE)) {
        Err(DriverError::Rejected(err)) => assert_eq!(err.module(), MODULE),
        other => panic!("expected a rejection, got {other:?}"),
    }
    assert!(matches!(
        driver.execute(&options::build(None, "products/bitbucket/missing")),
        Err(DriverError::Fatal(_))
    ));
}

#[test]
#[should_panic(expected = "harness failure")]
fn expect_plan_aborts_on_fatal_errors() {
    PlanDriver::simulated().expect_plan(&options::build(None, "/absolute/nfs"));
}
