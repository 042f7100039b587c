// Module Contracts - input-variable contract harness for provisioning modules
// Plans modules through init/plan/show and asserts on the plan or the rejection

// Module declarations
pub mod assertions;
pub mod config;
pub mod engine;
pub mod error;
pub mod fixtures;
pub mod modules;
pub mod options;
pub mod plan;
pub mod scenario;
pub mod value;

// Re-exports for convenience
pub use config::{EngineKind, HarnessConfig};
pub use engine::{DriverError, PlanDriver};
pub use error::{AssertionError, HarnessError, PlanningError};
pub use fixtures::{fixture, Fixture};
pub use plan::{Plan, PlannedResource};
pub use value::Value;
