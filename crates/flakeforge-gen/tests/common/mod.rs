//! Common test utilities for flakeforge-gen
//!
//! - `TestProject`: a temporary project directory implementing `ProjectConfig`
//! - `PlanBuilder`: build plans without hand-writing every field

#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use flakeforge_core::{Feature, ProjectConfig};
use flakeforge_gen::{BuildPlan, FlakeInput, NixpkgsInfo, PlanPackage};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

pub const COMMIT: &str = "f80ac848e3d6f0c12c52758c0f25c10c97ca3b62";
pub const SYSTEM: &str = "x86_64-linux";

/// Temporary project directory with in-memory configuration
pub struct TestProject {
    _temp: TempDir,
    root: Utf8PathBuf,
    pub remove_nixpkgs: bool,
    pub debug: bool,
}

impl TestProject {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
        Self {
            _temp: temp,
            root,
            remove_nixpkgs: false,
            debug: false,
        }
    }

    /// Same project, inside a git work tree
    pub fn in_git_repo() -> Self {
        let project = Self::new();
        std::fs::create_dir(project.root.join(".git")).unwrap();
        project
    }

    /// Whether a repository above the temp dir would make results depend on
    /// the machine running the tests
    pub fn has_foreign_repository(&self) -> bool {
        flakeforge_gen::find_git_marker(&self.root).unwrap().is_some()
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.root.join(relative)).unwrap()
    }
}

impl ProjectConfig for TestProject {
    fn project_dir(&self) -> &Utf8Path {
        &self.root
    }

    fn nixpkgs_commit_hash(&self) -> &str {
        COMMIT
    }

    fn debug_enabled(&self) -> bool {
        self.debug
    }

    fn feature_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::RemoveNixpkgs => self.remove_nixpkgs,
        }
    }
}

/// Builder for test build plans
pub struct PlanBuilder {
    plan: BuildPlan,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self {
            plan: BuildPlan {
                nixpkgs: NixpkgsInfo {
                    url: format!("github:NixOS/nixpkgs/{}", COMMIT),
                    commit_hash: COMMIT.to_string(),
                },
                system: SYSTEM.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn with_input(mut self, name: &str, url: &str, packages: &[&str]) -> Self {
        self.plan.flake_inputs.push(FlakeInput {
            name: name.to_string(),
            url: url.to_string(),
            packages: packages.iter().map(|p| p.to_string()).collect(),
        });
        self
    }

    pub fn with_package(mut self, name: &str, installable: &str, patch_glibc: bool) -> Self {
        self.plan.packages.push(PlanPackage {
            name: name.to_string(),
            installable: installable.to_string(),
            patch_glibc,
        });
        self
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.plan.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> BuildPlan {
        self.plan
    }
}

/// Push the mtime of `path` into the past and return it.
pub fn age(path: &Utf8Path) -> SystemTime {
    let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000_000);
    std::fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(old)
        .unwrap();
    mtime(path)
}

pub fn mtime(path: &Utf8Path) -> SystemTime {
    std::fs::metadata(path).unwrap().modified().unwrap()
}
