use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::engine::process::run_with_timeout;
use crate::error::HarnessError;
use crate::options::PlanOptions;

use super::{PlanningBackend, RawPlanOutcome, Workspace};

/// Backend driving the real `terraform` executable.
///
/// Each execution stages a copy of the module tree in its workspace and points
/// `TF_DATA_DIR` there, so concurrent runs never share provider caches or
/// lock files.
#[derive(Debug, Clone)]
pub struct TerraformBackend {
    binary: PathBuf,
    modules_root: PathBuf,
    timeout: Duration,
    plugin_cache_dir: Option<PathBuf>,
    extra_env: BTreeMap<String, String>,
}

impl TerraformBackend {
    pub fn new(binary: impl Into<PathBuf>, modules_root: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            modules_root: modules_root.into(),
            timeout: Duration::from_secs(EngineConfig::default().timeout_secs),
            plugin_cache_dir: None,
            extra_env: BTreeMap::new(),
        }
    }

    pub fn from_config(engine: &EngineConfig, modules_root: &Path) -> Self {
        Self {
            binary: engine.binary.clone(),
            modules_root: modules_root.to_path_buf(),
            timeout: Duration::from_secs(engine.timeout_secs.max(1)),
            plugin_cache_dir: engine.plugin_cache_dir.clone(),
            extra_env: engine.extra_env.clone(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn modules_root(&self) -> &Path {
        &self.modules_root
    }

    fn command(&self, workspace: &Workspace, options: &PlanOptions) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .current_dir(workspace.module_dir(options.module()))
            .envs(options.env())
            .env("TF_DATA_DIR", workspace.data_dir())
            .envs(&self.extra_env);
        if let Some(cache) = &self.plugin_cache_dir {
            command.env("TF_PLUGIN_CACHE_DIR", cache);
        }
        command
    }
}

impl PlanningBackend for TerraformBackend {
    fn name(&self) -> &'static str {
        "terraform"
    }

    fn initialize(&self, workspace: &Workspace, options: &PlanOptions) -> Result<(), HarnessError> {
        let source = self.modules_root.join(options.module());
        if !source.is_dir() {
            return Err(HarnessError::ModuleNotFound {
                module: options.module().to_string(),
            });
        }
        let copied = workspace.stage_modules(&self.modules_root)?;
        workspace.write_var_file(options)?;
        debug!(module = options.module(), files = copied, "staged modules root");

        let mut command = self.command(workspace, options);
        command
            .arg("init")
            .args(options.common_flags())
            .arg("-backend=false");
        let output = run_with_timeout(command, "init", workspace, self.timeout)?;
        if !output.success() {
            return Err(HarnessError::InitFailed {
                module: options.module().to_string(),
                output: output.combined(),
            });
        }
        workspace.mark_initialized(options.module())
    }

    fn plan(&self, workspace: &Workspace, options: &PlanOptions) -> Result<RawPlanOutcome, HarnessError> {
        if !workspace.is_initialized(options.module()) {
            return Err(HarnessError::NotInitialized {
                module: options.module().to_string(),
            });
        }

        let mut command = self.command(workspace, options);
        command
            .arg("plan")
            .args(options.plan_flags())
            .arg(format!("-out={}", workspace.plan_file().display()))
            .arg(format!("-var-file={}", workspace.var_file().display()));
        let output = run_with_timeout(command, "plan", workspace, self.timeout)?;
        if !output.success() {
            info!(module = options.module(), exit_code = ?output.exit_code, "plan rejected");
            return Ok(RawPlanOutcome::Rejected {
                text: output.combined(),
                exit_code: output.exit_code,
            });
        }

        let mut command = self.command(workspace, options);
        command
            .arg("show")
            .arg("-json")
            .arg(workspace.plan_file());
        let output = run_with_timeout(command, "show", workspace, self.timeout)?;
        if !output.success() {
            return Err(HarnessError::ShowFailed {
                output: output.combined(),
            });
        }
        Ok(RawPlanOutcome::Planned(output.stdout))
    }
}
