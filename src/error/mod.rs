// Error types for the module contract harness
//
// This module defines the three failure families a scenario can end in:
// fatal harness errors, assertion failures, and the planning rejections that
// invalid fixtures are expected to produce.

mod assertion;
mod harness;
mod planning;

pub use assertion::{log_assertion_error, AssertionError, AssertionErrorCodes};
pub use harness::{log_harness_error, HarnessError, HarnessErrorCodes};
pub use planning::{Diagnostic, DiagnosticSeverity, PlanningError};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent reporting in scenario
/// summaries and CLI output.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
