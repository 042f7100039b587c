//! Declarative contract scenarios.
//!
//! A scenario names a module, a fixture (plus optional overrides) and the
//! expected outcome: a plan with given resources, attributes and variables,
//! or a rejection whose text contains given substrings. The catalog ships
//! embedded in the crate and can be replaced by a file on disk.

mod runner;

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::assertions;
use crate::engine::{DriverError, PlanDriver};
use crate::error::{AssertionError, HarnessError};
use crate::fixtures::{self, Fixture, FixtureStore};
use crate::options::{self, PlanOptions};
use crate::plan::Plan;
use crate::value::Value;

pub use runner::{run_scenarios, RunSummary, ScenarioReport, ScenarioStatus};

/// Catalog path inside the crate sources.
pub const CATALOG_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/scenarios/catalog.json");

const EMBEDDED_CATALOG: &str = include_str!("../../scenarios/catalog.json");

/// Machine-readable list of scenarios.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioCatalog {
    pub version: u32,
    pub scenarios: Vec<Scenario>,
}

impl ScenarioCatalog {
    /// The catalog compiled into the crate, checked against the built-in fixtures.
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_CATALOG, fixtures::builtin())
    }

    /// Load a catalog file, checking fixture references against `store`.
    pub fn load_from_file(path: &Path, store: &FixtureStore) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario catalog {}", path.display()))?;
        Self::from_json(&contents, store)
            .with_context(|| format!("loading scenario catalog {}", path.display()))
    }

    /// Parse catalog contents from JSON and validate invariants.
    pub fn from_json(data: &str, store: &FixtureStore) -> Result<Self> {
        let catalog: ScenarioCatalog = serde_json::from_str(data)
            .map_err(|err| anyhow!("failed to parse scenario catalog JSON: {err}"))?;
        catalog.validate(store)?;
        Ok(catalog)
    }

    pub fn find(&self, id: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|scenario| scenario.id == id)
    }

    /// Scenarios whose id or module contains `filter`; all of them without one.
    pub fn select(&self, filter: Option<&str>) -> Vec<&Scenario> {
        self.scenarios
            .iter()
            .filter(|scenario| match filter {
                Some(needle) => scenario.id.contains(needle) || scenario.module.contains(needle),
                None => true,
            })
            .collect()
    }

    fn validate(&self, store: &FixtureStore) -> Result<()> {
        if self.version == 0 {
            return Err(anyhow!("catalog version must be > 0"));
        }
        if self.scenarios.is_empty() {
            return Err(anyhow!("catalog must contain at least one scenario"));
        }

        let mut seen = HashSet::new();
        for scenario in &self.scenarios {
            if !seen.insert(scenario.id.as_str()) {
                return Err(anyhow!("duplicate scenario id detected: {}", scenario.id));
            }
            scenario.validate(store)?;
        }
        Ok(())
    }
}

/// One module/fixture/expectation triple.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub module: String,
    /// Named fixture; absent means no overrides at all.
    #[serde(default)]
    pub fixture: Option<String>,
    /// Applied on top of the fixture; `null` removes a variable.
    #[serde(default)]
    pub overrides: Fixture,
    pub expect: Expectation,
}

/// Expected outcome of planning a scenario.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Expectation {
    Planned {
        #[serde(default)]
        resources: Vec<ResourceExpectation>,
        #[serde(default)]
        absent_resources: Vec<String>,
        #[serde(default)]
        variables: BTreeMap<String, Value>,
    },
    Rejected {
        contains: Vec<String>,
        #[serde(default)]
        absent: Vec<String>,
    },
}

/// Facts about one planned resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceExpectation {
    pub address: String,
    /// Attribute path (`values.0`, `scaling_config.0.desired_size`) → expected value.
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    /// Attribute path → expected element count.
    #[serde(default)]
    pub cardinality: BTreeMap<String, usize>,
}

/// Result of evaluating one scenario.
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioOutcome {
    Passed,
    /// Every check that failed, not just the first.
    Failed(Vec<AssertionError>),
    Fatal(HarnessError),
}

impl Scenario {
    fn validate(&self, store: &FixtureStore) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(anyhow!("scenario id cannot be empty"));
        }
        if self.module.trim().is_empty() {
            return Err(anyhow!("scenario {} must name a module", self.id));
        }
        if let Some(name) = &self.fixture {
            if !store.contains(name) {
                return Err(anyhow!(
                    "scenario {} references unknown fixture '{}'",
                    self.id,
                    name
                ));
            }
        }
        let empty = match &self.expect {
            Expectation::Planned {
                resources,
                absent_resources,
                variables,
            } => resources.is_empty() && absent_resources.is_empty() && variables.is_empty(),
            Expectation::Rejected { contains, .. } => contains.is_empty(),
        };
        if empty {
            return Err(anyhow!("scenario {} must declare at least one expectation", self.id));
        }
        Ok(())
    }

    /// Options for this scenario: fixture copy plus overrides.
    pub fn options(&self, store: &FixtureStore) -> Result<PlanOptions, HarnessError> {
        let base = match &self.fixture {
            Some(name) => Some(
                store
                    .get(name)
                    .ok_or_else(|| HarnessError::FixtureNotFound { name: name.clone() })?,
            ),
            None => None,
        };
        if self.overrides.is_empty() {
            return Ok(options::build(base, &self.module));
        }
        let merged = fixtures::with_overrides(base.unwrap_or(&Fixture::new()), &self.overrides);
        Ok(options::build(Some(&merged), &self.module))
    }

    /// Plan the scenario and check every expectation.
    pub fn evaluate(&self, driver: &PlanDriver, store: &FixtureStore) -> ScenarioOutcome {
        let options = match self.options(store) {
            Ok(options) => options,
            Err(err) => return ScenarioOutcome::Fatal(err),
        };

        let failures = match (driver.execute(&options), &self.expect) {
            (Err(DriverError::Fatal(err)), _) => return ScenarioOutcome::Fatal(err),
            (
                Ok(plan),
                Expectation::Planned {
                    resources,
                    absent_resources,
                    variables,
                },
            ) => check_plan(&plan, resources, absent_resources, variables),
            (Err(DriverError::Rejected(err)), Expectation::Rejected { contains, absent }) => {
                check_rejection(err.text(), contains, absent)
            }
            (Ok(plan), Expectation::Rejected { .. }) => vec![AssertionError::Mismatch {
                context: "outcome".to_string(),
                expected: "rejected".to_string(),
                actual: format!("planned {} resource(s)", plan.resources().len()),
            }],
            (Err(DriverError::Rejected(err)), Expectation::Planned { .. }) => {
                vec![AssertionError::Mismatch {
                    context: "outcome".to_string(),
                    expected: "planned".to_string(),
                    actual: format!("rejected:\n{}", err.text()),
                }]
            }
        };

        if failures.is_empty() {
            ScenarioOutcome::Passed
        } else {
            ScenarioOutcome::Failed(failures)
        }
    }
}

fn check_plan(
    plan: &Plan,
    resources: &[ResourceExpectation],
    absent_resources: &[String],
    variables: &BTreeMap<String, Value>,
) -> Vec<AssertionError> {
    let mut failures = Vec::new();

    for expected in resources {
        let resource = match plan.resource(&expected.address) {
            Ok(resource) => resource,
            Err(err) => {
                failures.push(err);
                continue;
            }
        };
        for (path, value) in &expected.attributes {
            let context = format!("{}.{}", expected.address, path);
            if let Err(err) = resource
                .attribute_path(path)
                .and_then(|actual| assertions::equals(&context, value, actual))
            {
                failures.push(err);
            }
        }
        for (path, count) in &expected.cardinality {
            let context = format!("{}.{}", expected.address, path);
            if let Err(err) = resource
                .attribute_path(path)
                .and_then(|actual| assertions::cardinality(&context, actual, *count))
            {
                failures.push(err);
            }
        }
    }

    for address in absent_resources {
        if let Err(err) = assertions::resource_absent(plan, address) {
            failures.push(err);
        }
    }

    for (name, value) in variables {
        let context = format!("var.{name}");
        if let Err(err) = plan
            .variable(name)
            .and_then(|actual| assertions::equals(&context, value, actual))
        {
            failures.push(err);
        }
    }
    failures
}

fn check_rejection(text: &str, contains: &[String], absent: &[String]) -> Vec<AssertionError> {
    let mut failures = Vec::new();
    if let Err(err) = assertions::contains_all(text, contains.iter().map(String::as_str)) {
        failures.push(err);
    }
    for needle in absent {
        if let Err(err) = assertions::not_contains(text, needle) {
            failures.push(err);
        }
    }
    failures
}

#[cfg(test)]
mod tests;
