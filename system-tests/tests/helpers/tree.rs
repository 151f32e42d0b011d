// system-tests/tests/helpers/tree.rs
// ============================================================================
// Module: Policy Tree Harness
// Description: Temporary policy directories wired to the loader and engine.
// Purpose: Turn fixture documents into a Rego-backed review engine.
// Dependencies: fleet-gate-config, fleet-gate-core, fleet-gate-rego, tempfile
// ============================================================================

use std::error::Error;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use fleet_gate_config::ObjectStoreConfig;
use fleet_gate_config::PolicyLocation;
use fleet_gate_config::load_library;
use fleet_gate_core::PolicyErrors;
use fleet_gate_core::PolicyLibrary;
use fleet_gate_core::ReviewEngine;
use fleet_gate_rego::RegoRuntime;
use system_tests::config::SystemTestConfig;
use tempfile::TempDir;

/// Directory holding template documents.
pub const TEMPLATES_DIR: &str = "templates";
/// Directory holding constraint documents.
pub const CONSTRAINTS_DIR: &str = "constraints";
/// Directory holding shared Rego modules.
pub const LIB_DIR: &str = "lib";
/// Config file name written by [`PolicyTree::write_config`].
pub const CONFIG_FILE: &str = "fleet-gate.toml";

/// Policy tree rooted in a temporary directory.
pub struct PolicyTree {
    /// Owned temporary directory.
    dir: TempDir,
}

impl PolicyTree {
    /// Creates a tree with empty `templates/` and `constraints/` directories,
    /// under the configured run root when set.
    pub fn new() -> Result<Self, Box<dyn Error>> {
        let config = SystemTestConfig::load()?;
        let mut builder = tempfile::Builder::new();
        builder.prefix("fleet-gate-");
        let dir = match config.run_root {
            Some(root) => {
                fs::create_dir_all(&root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        fs::create_dir_all(dir.path().join(TEMPLATES_DIR))?;
        fs::create_dir_all(dir.path().join(CONSTRAINTS_DIR))?;
        Ok(Self {
            dir,
        })
    }

    /// Returns the tree root.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a file relative to the root, creating parent directories.
    pub fn write(&self, relative: &str, contents: &str) -> Result<PathBuf, Box<dyn Error>> {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Writes a template document under `templates/`.
    pub fn template(&self, file: &str, yaml: &str) -> Result<PathBuf, Box<dyn Error>> {
        self.write(&format!("{TEMPLATES_DIR}/{file}"), yaml)
    }

    /// Writes a constraint document under `constraints/`.
    pub fn constraint(&self, file: &str, yaml: &str) -> Result<PathBuf, Box<dyn Error>> {
        self.write(&format!("{CONSTRAINTS_DIR}/{file}"), yaml)
    }

    /// Writes a Rego module under `lib/`.
    pub fn module(&self, file: &str, rego: &str) -> Result<PathBuf, Box<dyn Error>> {
        self.write(&format!("{LIB_DIR}/{file}"), rego)
    }

    /// Returns the document locations of this tree.
    pub fn locations(&self) -> Vec<PolicyLocation> {
        vec![
            PolicyLocation::Local(self.root().join(TEMPLATES_DIR)),
            PolicyLocation::Local(self.root().join(CONSTRAINTS_DIR)),
        ]
    }

    /// Returns the library location when `lib/` exists.
    pub fn library_location(&self) -> Option<PolicyLocation> {
        let lib = self.root().join(LIB_DIR);
        lib.is_dir().then_some(PolicyLocation::Local(lib))
    }

    /// Loads the policy library from disk.
    pub fn load(&self) -> Result<PolicyLibrary, PolicyErrors> {
        load_library(&self.locations(), self.library_location().as_ref(), &ObjectStoreConfig::default())
    }

    /// Loads the library and builds a Rego-backed engine.
    pub fn engine(&self) -> Result<ReviewEngine<RegoRuntime>, PolicyErrors> {
        ReviewEngine::new(RegoRuntime::new(), &self.load()?)
    }

    /// Writes `fleet-gate.toml` pointing at this tree.
    pub fn write_config(&self, worker_count: Option<usize>) -> Result<PathBuf, Box<dyn Error>> {
        let mut toml = String::new();
        if let Some(count) = worker_count {
            toml.push_str(&format!("[engine]\nworker_count = {count}\n\n"));
        }
        toml.push_str("[policy]\n");
        toml.push_str(&format!(
            "paths = ['{}', '{}']\n",
            self.root().join(TEMPLATES_DIR).display(),
            self.root().join(CONSTRAINTS_DIR).display()
        ));
        if self.root().join(LIB_DIR).is_dir() {
            toml.push_str(&format!("library_path = '{}'\n", self.root().join(LIB_DIR).display()));
        }
        self.write(CONFIG_FILE, &toml)
    }
}
