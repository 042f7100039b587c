//! Plan driver: options in, parsed plan or planning rejection out.
//!
//! [`PlanDriver::execute`] is the single execution primitive. It validates
//! the module path, allocates an isolated [`Workspace`], runs the backend's
//! initialize and plan steps, and parses the result. The panicking call
//! shapes used by test scenarios are thin wrappers over it.

pub mod backend;
mod process;
mod workspace;

use std::fmt;
use std::path::{Component, Path};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::{EngineKind, HarnessConfig};
use crate::error::{log_harness_error, HarnessError, PlanningError};
use crate::options::PlanOptions;
use crate::plan::Plan;

pub use backend::{PlanningBackend, RawPlanOutcome, SimulatedBackend, TerraformBackend};
pub use process::{run_with_timeout, ProcessOutput};
pub use workspace::Workspace;

/// Why [`PlanDriver::execute`] produced no plan.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverError {
    /// The engine refused the configuration; an assertion target.
    Rejected(PlanningError),
    /// The harness itself failed; never an assertion target.
    Fatal(HarnessError),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Rejected(err) => write!(f, "{err}"),
            DriverError::Fatal(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for DriverError {}

impl From<HarnessError> for DriverError {
    fn from(err: HarnessError) -> Self {
        DriverError::Fatal(err)
    }
}

/// Drives one backend through initialize → plan → parse.
///
/// Cloning is cheap; clones share the backend, never a workspace.
#[derive(Clone)]
pub struct PlanDriver {
    backend: Arc<dyn PlanningBackend>,
}

impl PlanDriver {
    pub fn new(backend: Arc<dyn PlanningBackend>) -> Self {
        Self { backend }
    }

    pub fn simulated() -> Self {
        Self::new(Arc::new(SimulatedBackend::new()))
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        match config.engine.kind {
            EngineKind::Simulated => Self::simulated(),
            EngineKind::Terraform => Self::new(Arc::new(TerraformBackend::from_config(
                &config.engine,
                &config.modules_root,
            ))),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Run one plan in a fresh workspace.
    pub fn execute(&self, options: &PlanOptions) -> Result<Plan, DriverError> {
        let started = Instant::now();
        validate_module_path(options.module())?;
        let workspace = Workspace::create()?;
        debug!(
            module = options.module(),
            backend = self.backend.name(),
            workspace = %workspace.root().display(),
            "executing plan"
        );

        self.backend.initialize(&workspace, options)?;
        let outcome = self.backend.plan(&workspace, options)?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            RawPlanOutcome::Planned(json) => {
                let plan = Plan::from_json(&json)?;
                info!(
                    module = options.module(),
                    resources = plan.resources().len(),
                    elapsed_ms,
                    "plan computed"
                );
                Ok(plan)
            }
            RawPlanOutcome::Rejected { text, exit_code } => {
                info!(module = options.module(), elapsed_ms, "plan rejected");
                Err(DriverError::Rejected(PlanningError::new(
                    options.module(),
                    text,
                    exit_code,
                )))
            }
        }
    }

    /// Plan that must succeed; panics with the full diagnostic otherwise.
    #[track_caller]
    pub fn expect_plan(&self, options: &PlanOptions) -> Plan {
        match self.execute(options) {
            Ok(plan) => plan,
            Err(DriverError::Rejected(err)) => {
                panic!("expected '{}' to plan, but it was rejected:\n{}", options.module(), err.text())
            }
            Err(DriverError::Fatal(err)) => self.abort(options, err),
        }
    }

    /// Plan that must be rejected; panics if it succeeds or the harness fails.
    #[track_caller]
    pub fn expect_rejection(&self, options: &PlanOptions) -> PlanningError {
        match self.execute(options) {
            Ok(plan) => panic!(
                "expected '{}' to be rejected, but it planned {} resource(s): {}",
                options.module(),
                plan.resources().len(),
                plan.addresses().collect::<Vec<_>>().join(", ")
            ),
            Err(DriverError::Rejected(err)) => err,
            Err(DriverError::Fatal(err)) => self.abort(options, err),
        }
    }

    /// Rejections come back for inspection; harness failures still panic.
    #[track_caller]
    pub fn try_plan(&self, options: &PlanOptions) -> Result<Plan, PlanningError> {
        match self.execute(options) {
            Ok(plan) => Ok(plan),
            Err(DriverError::Rejected(err)) => Err(err),
            Err(DriverError::Fatal(err)) => self.abort(options, err),
        }
    }

    #[track_caller]
    fn abort(&self, options: &PlanOptions, err: HarnessError) -> ! {
        log_harness_error(&err, options.module());
        panic!("harness failure while planning '{}': {err}", options.module())
    }
}

impl Default for PlanDriver {
    fn default() -> Self {
        Self::simulated()
    }
}

/// Module paths are relative, non-empty and stay inside the modules root.
pub fn validate_module_path(path: &str) -> Result<(), HarnessError> {
    let invalid = |reason: &str| {
        warn!(path, reason, "rejecting module path");
        Err(HarnessError::InvalidModulePath {
            path: path.to_string(),
            reason: reason.to_string(),
        })
    };

    if path.trim().is_empty() {
        return invalid("path is empty");
    }
    if path != path.trim() {
        return invalid("path has surrounding whitespace");
    }
    let as_path = Path::new(path);
    if as_path.is_absolute() || path.starts_with('/') || path.starts_with('\\') {
        return invalid("path must be relative to the modules root");
    }
    for component in as_path.components() {
        match component {
            Component::Normal(_) => {}
            Component::CurDir => return invalid("path must not contain '.' segments"),
            Component::ParentDir => return invalid("path must not escape the modules root"),
            Component::RootDir | Component::Prefix(_) => {
                return invalid("path must be relative to the modules root")
            }
        }
    }
    Ok(())
}
