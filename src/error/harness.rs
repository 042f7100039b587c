// Fatal harness error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Harness error code constants
///
/// Error code range: 3001-3010
pub struct HarnessErrorCodes {}

impl HarnessErrorCodes {
    /// Module path is empty, absolute, or escapes the modules root
    pub const INVALID_MODULE_PATH: i32 = 3001;

    /// Module is not known to the planning backend
    pub const MODULE_NOT_FOUND: i32 = 3002;

    /// Isolated working directory could not be prepared
    pub const WORKSPACE_SETUP: i32 = 3003;

    /// Engine executable could not be started
    pub const ENGINE_SPAWN: i32 = 3004;

    /// Engine initialization step failed
    pub const INIT_FAILED: i32 = 3005;

    /// Plan requested before initialization completed
    pub const NOT_INITIALIZED: i32 = 3006;

    /// Engine output could not be parsed as a plan
    pub const OUTPUT_UNPARSEABLE: i32 = 3007;

    /// Engine invocation exceeded the configured deadline
    pub const TIMEOUT: i32 = 3008;

    /// Rendering the saved plan as JSON failed
    pub const SHOW_FAILED: i32 = 3009;

    /// Scenario names a fixture the store does not hold
    pub const FIXTURE_NOT_FOUND: i32 = 3010;
}

/// Log a harness error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_harness_error(err: &HarnessError, context: &str) {
    error!(
        "Harness error in {}: code={}, component=PlanDriver, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Fatal harness errors
///
/// These are never assertion targets: any of them aborts the scenario with
/// the full diagnostic attached.
///
/// Error code range: 3001-3010
#[derive(Debug, Clone, PartialEq)]
pub enum HarnessError {
    /// Module path is malformed
    InvalidModulePath { path: String, reason: String },

    /// Module is unknown to the backend
    ModuleNotFound { module: String },

    /// Workspace could not be created or populated
    WorkspaceSetup { reason: String },

    /// Engine binary could not be spawned
    EngineSpawn { program: String, reason: String },

    /// `init` exited unsuccessfully
    InitFailed { module: String, output: String },

    /// `plan` called on a workspace that was never initialized
    NotInitialized { module: String },

    /// Plan JSON was missing or malformed
    OutputUnparseable { reason: String },

    /// An engine step ran past its deadline and was killed
    Timeout { step: String, timeout_ms: u64 },

    /// `show -json` exited unsuccessfully
    ShowFailed { output: String },

    /// Fixture named by a scenario is not in the store
    FixtureNotFound { name: String },
}

impl ErrorCode for HarnessError {
    fn code(&self) -> i32 {
        match self {
            HarnessError::InvalidModulePath { .. } => HarnessErrorCodes::INVALID_MODULE_PATH,
            HarnessError::ModuleNotFound { .. } => HarnessErrorCodes::MODULE_NOT_FOUND,
            HarnessError::WorkspaceSetup { .. } => HarnessErrorCodes::WORKSPACE_SETUP,
            HarnessError::EngineSpawn { .. } => HarnessErrorCodes::ENGINE_SPAWN,
            HarnessError::InitFailed { .. } => HarnessErrorCodes::INIT_FAILED,
            HarnessError::NotInitialized { .. } => HarnessErrorCodes::NOT_INITIALIZED,
            HarnessError::OutputUnparseable { .. } => HarnessErrorCodes::OUTPUT_UNPARSEABLE,
            HarnessError::Timeout { .. } => HarnessErrorCodes::TIMEOUT,
            HarnessError::ShowFailed { .. } => HarnessErrorCodes::SHOW_FAILED,
            HarnessError::FixtureNotFound { .. } => HarnessErrorCodes::FIXTURE_NOT_FOUND,
        }
    }

    fn message(&self) -> String {
        match self {
            HarnessError::InvalidModulePath { path, reason } => {
                format!("Invalid module path '{}': {}", path, reason)
            }
            HarnessError::ModuleNotFound { module } => {
                format!("Module '{}' not found", module)
            }
            HarnessError::WorkspaceSetup { reason } => {
                format!("Failed to prepare isolated workspace: {}", reason)
            }
            HarnessError::EngineSpawn { program, reason } => {
                format!("Failed to start `{}`: {}", program, reason)
            }
            HarnessError::InitFailed { module, output } => {
                format!("Initialization of '{}' failed:\n{}", module, output)
            }
            HarnessError::NotInitialized { module } => {
                format!("Module '{}' was planned before initialization", module)
            }
            HarnessError::OutputUnparseable { reason } => {
                format!("Engine output is not a readable plan: {}", reason)
            }
            HarnessError::Timeout { step, timeout_ms } => {
                format!("Engine step `{}` timed out after {}ms", step, timeout_ms)
            }
            HarnessError::ShowFailed { output } => {
                format!("Rendering the saved plan failed:\n{}", output)
            }
            HarnessError::FixtureNotFound { name } => {
                format!("Fixture '{}' not found", name)
            }
        }
    }
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HarnessError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for HarnessError {}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        HarnessError::WorkspaceSetup {
            reason: err.to_string(),
        }
    }
}
