//! Concurrent scenario execution and reporting.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use super::{Scenario, ScenarioOutcome};
use crate::engine::PlanDriver;
use crate::error::{log_assertion_error, log_harness_error, ErrorCode};
use crate::fixtures::FixtureStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Passed,
    Failed,
    Fatal,
}

/// Per-scenario line of the run summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub id: String,
    pub module: String,
    pub status: ScenarioStatus,
    pub failures: Vec<FailureDetail>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureDetail {
    pub code: i32,
    pub message: String,
}

impl FailureDetail {
    fn from_error(err: &impl ErrorCode) -> Self {
        Self {
            code: err.code(),
            message: err.message(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub backend: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub fatal: usize,
    pub reports: Vec<ScenarioReport>,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Evaluate `scenarios` on up to `jobs` worker threads.
///
/// Workers share only the driver and the read-only fixture store; each
/// scenario plans in its own workspace. Reports come back in catalog order.
pub fn run_scenarios(
    scenarios: &[&Scenario],
    driver: &PlanDriver,
    store: &FixtureStore,
    jobs: usize,
) -> RunSummary {
    let workers = jobs.clamp(1, scenarios.len().max(1));
    let next = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel();

    info!(scenarios = scenarios.len(), workers, backend = driver.backend_name(), "running scenarios");
    std::thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let next = &next;
            scope.spawn(move || loop {
                let index = next.fetch_add(1, Ordering::SeqCst);
                let Some(scenario) = scenarios.get(index) else {
                    break;
                };
                let report = run_one(scenario, driver, store);
                if tx.send((index, report)).is_err() {
                    break;
                }
            });
        }
    });
    drop(tx);

    let mut indexed: Vec<(usize, ScenarioReport)> = rx.into_iter().collect();
    indexed.sort_by_key(|(index, _)| *index);
    let reports: Vec<ScenarioReport> = indexed.into_iter().map(|(_, report)| report).collect();

    let count = |status: ScenarioStatus| reports.iter().filter(|r| r.status == status).count();
    let (passed, failed, fatal) = (
        count(ScenarioStatus::Passed),
        count(ScenarioStatus::Failed),
        count(ScenarioStatus::Fatal),
    );
    let summary = RunSummary {
        backend: driver.backend_name().to_string(),
        total: reports.len(),
        passed,
        failed,
        fatal,
        reports,
    };
    info!(
        passed = summary.passed,
        failed = summary.failed,
        fatal = summary.fatal,
        "scenario run finished"
    );
    summary
}

fn run_one(scenario: &Scenario, driver: &PlanDriver, store: &FixtureStore) -> ScenarioReport {
    let started = Instant::now();
    let outcome = scenario.evaluate(driver, store);
    let duration_ms = started.elapsed().as_millis() as u64;

    let (status, failures) = match outcome {
        ScenarioOutcome::Passed => (ScenarioStatus::Passed, Vec::new()),
        ScenarioOutcome::Failed(errors) => {
            for err in &errors {
                log_assertion_error(err, &scenario.id);
            }
            warn!(scenario = %scenario.id, failures = errors.len(), "scenario failed");
            (
                ScenarioStatus::Failed,
                errors.iter().map(FailureDetail::from_error).collect(),
            )
        }
        ScenarioOutcome::Fatal(err) => {
            log_harness_error(&err, &scenario.id);
            (ScenarioStatus::Fatal, vec![FailureDetail::from_error(&err)])
        }
    };

    ScenarioReport {
        id: scenario.id.clone(),
        module: scenario.module.clone(),
        status,
        failures,
        duration_ms,
    }
}
