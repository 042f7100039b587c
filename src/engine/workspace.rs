//! Per-execution working directory.
//!
//! Every plan gets its own temporary directory holding the staged modules
//! root, the engine data directory, the variable file and the saved plan.
//! Nothing in it is shared between executions; it is removed on drop.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use walkdir::WalkDir;

use crate::error::HarnessError;
use crate::options::PlanOptions;

const INIT_MARKER: &str = ".contracts-initialized";
const SKIPPED_DIRS: [&str; 2] = [".terraform", ".git"];

pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn create() -> Result<Self, HarnessError> {
        let dir = tempfile::Builder::new()
            .prefix("module-contracts-")
            .tempdir()
            .map_err(|err| HarnessError::WorkspaceSetup {
                reason: format!("creating temporary directory failed: {err}"),
            })?;
        fs::create_dir_all(dir.path().join("logs"))?;
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Where the modules root is staged.
    pub fn modules_dir(&self) -> PathBuf {
        self.root().join("modules")
    }

    /// Staged copy of `module`, relative to the modules root.
    pub fn module_dir(&self, module: &str) -> PathBuf {
        self.modules_dir().join(module)
    }

    /// Engine data directory (`TF_DATA_DIR`); providers and modules land here.
    pub fn data_dir(&self) -> PathBuf {
        self.root().join(".terraform")
    }

    pub fn plan_file(&self) -> PathBuf {
        self.root().join("tfplan")
    }

    pub fn var_file(&self) -> PathBuf {
        self.root().join("overrides.tfvars.json")
    }

    /// Capture file for one stream of one engine step, e.g. `plan.stderr`.
    pub fn capture_file(&self, step: &str, stream: &str) -> PathBuf {
        self.root().join("logs").join(format!("{step}.{stream}"))
    }

    pub fn write_var_file(&self, options: &PlanOptions) -> Result<PathBuf, HarnessError> {
        let path = self.var_file();
        fs::write(&path, options.var_file_json()).map_err(|err| HarnessError::WorkspaceSetup {
            reason: format!("writing {} failed: {err}", path.display()),
        })?;
        Ok(path)
    }

    /// Copy the whole modules root into [`Workspace::modules_dir`].
    ///
    /// Modules refer to their siblings through relative `source` paths, so
    /// the tree is staged as a unit. Local engine state (`.terraform`,
    /// `*.tfstate*`) and VCS metadata are skipped so the copy starts clean.
    /// Returns the number of files copied.
    pub fn stage_modules(&self, source: &Path) -> Result<usize, HarnessError> {
        if !source.is_dir() {
            return Err(HarnessError::WorkspaceSetup {
                reason: format!("modules root {} does not exist", source.display()),
            });
        }

        let target_root = self.modules_dir();
        let mut copied = 0;
        let walker = WalkDir::new(source)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !is_skipped(entry.file_name().to_str().unwrap_or_default()));

        for entry in walker {
            let entry = entry.map_err(|err| HarnessError::WorkspaceSetup {
                reason: format!("walking {} failed: {err}", source.display()),
            })?;
            let relative = entry
                .path()
                .strip_prefix(source)
                .map_err(|err| HarnessError::WorkspaceSetup {
                    reason: err.to_string(),
                })?;
            let target = target_root.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else if entry.file_type().is_file() {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(entry.path(), &target)?;
                copied += 1;
            }
        }
        Ok(copied)
    }

    pub fn mark_initialized(&self, module: &str) -> Result<(), HarnessError> {
        fs::write(self.root().join(INIT_MARKER), module)?;
        Ok(())
    }

    /// True once [`Workspace::mark_initialized`] ran for this module.
    pub fn is_initialized(&self, module: &str) -> bool {
        fs::read_to_string(self.root().join(INIT_MARKER))
            .map(|recorded| recorded == module)
            .unwrap_or(false)
    }
}

fn is_skipped(name: &str) -> bool {
    SKIPPED_DIRS.contains(&name) || name.contains(".tfstate")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::fixture;
    use crate::options;

    #[test]
    fn workspaces_are_distinct_and_removed_on_drop() {
        let first = Workspace::create().unwrap();
        let second = Workspace::create().unwrap();
        assert_ne!(first.root(), second.root());
        let path = first.root().to_path_buf();
        drop(first);
        assert!(!path.exists());
    }

    #[test]
    fn stage_modules_skips_local_state() {
        let source = tempfile::tempdir().unwrap();
        let nfs = source.path().join("products/bitbucket/nfs");
        fs::create_dir_all(nfs.join(".terraform/providers")).unwrap();
        fs::write(nfs.join("main.tf"), "variable \"namespace\" {}\n").unwrap();
        fs::write(nfs.join("terraform.tfstate"), "{}").unwrap();
        fs::write(nfs.join(".terraform/providers/lock"), "x").unwrap();
        fs::create_dir_all(nfs.join("nested")).unwrap();
        fs::write(nfs.join("nested/outputs.tf"), "").unwrap();

        let workspace = Workspace::create().unwrap();
        assert_eq!(workspace.stage_modules(source.path()).unwrap(), 2);
        let staged = workspace.module_dir("products/bitbucket/nfs");
        assert!(staged.join("main.tf").is_file());
        assert!(staged.join("nested/outputs.tf").is_file());
        assert!(!staged.join("terraform.tfstate").exists());
        assert!(!staged.join(".terraform").exists());
    }

    #[test]
    fn sibling_module_sources_resolve_after_staging() {
        let source = tempfile::tempdir().unwrap();
        let bitbucket = source.path().join("products/bitbucket");
        let rds = source.path().join("AWS/rds");
        fs::create_dir_all(&bitbucket).unwrap();
        fs::create_dir_all(&rds).unwrap();
        fs::write(
            bitbucket.join("main.tf"),
            "module \"database\" {\n  source = \"../../AWS/rds\"\n}\n",
        )
        .unwrap();
        fs::write(rds.join("main.tf"), "variable \"db_iops\" {}\n").unwrap();

        let workspace = Workspace::create().unwrap();
        workspace.stage_modules(source.path()).unwrap();
        let staged = workspace.module_dir("products/bitbucket");
        assert!(staged.join("main.tf").is_file());
        assert!(staged.join("../../AWS/rds/main.tf").is_file());
    }

    #[test]
    fn stage_modules_rejects_missing_source() {
        let workspace = Workspace::create().unwrap();
        let missing = workspace.root().join("does-not-exist");
        assert!(matches!(
            workspace.stage_modules(&missing),
            Err(HarnessError::WorkspaceSetup { .. })
        ));
    }

    #[test]
    fn init_marker_is_per_module() {
        let workspace = Workspace::create().unwrap();
        assert!(!workspace.is_initialized("AWS/eks"));
        workspace.mark_initialized("AWS/eks").unwrap();
        assert!(workspace.is_initialized("AWS/eks"));
        assert!(!workspace.is_initialized("products/bitbucket"));
    }

    #[test]
    fn var_file_holds_the_overrides() {
        let workspace = Workspace::create().unwrap();
        let opts = options::build(Some(fixture("nfs_valid")), "products/bitbucket/nfs");
        let path = workspace.write_var_file(&opts).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written["namespace"], "dummy-namespace");
    }
}
