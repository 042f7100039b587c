//! Backend abstractions for the plan driver.
//!
//! A backend performs the two blocking engine steps against a prepared
//! [`Workspace`]. The driver owns the workspace lifecycle and output parsing,
//! so backends only report raw outcomes.

use crate::error::HarnessError;
use crate::options::PlanOptions;

use super::workspace::Workspace;

/// Raw result of the plan step, before parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPlanOutcome {
    /// JSON rendering of the saved plan.
    Planned(String),
    /// The engine refused the configuration.
    Rejected { text: String, exit_code: Option<i32> },
}

/// Trait implemented by planning engines.
///
/// `initialize` must succeed before `plan` is called on the same workspace;
/// any error from either step is fatal to the scenario.
pub trait PlanningBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn initialize(&self, workspace: &Workspace, options: &PlanOptions) -> Result<(), HarnessError>;

    fn plan(&self, workspace: &Workspace, options: &PlanOptions) -> Result<RawPlanOutcome, HarnessError>;
}

mod simulated;
pub use simulated::SimulatedBackend;

mod terraform;
pub use terraform::TerraformBackend;
