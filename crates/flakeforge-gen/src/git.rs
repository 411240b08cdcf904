//! Git visibility for generated flakes
//!
//! Nix copies only git-tracked files into the store when it evaluates a flake
//! that lives inside a git work tree. The generated files are ignored by the
//! user's repository, so the flake directory gets a nested repository of its
//! own with the generated files staged in it.

use crate::error::{Error, Result};
use crate::glibc::{GLIBC_PATCH_DIR, GLIBC_PATCH_SCRIPT};
use camino::{Utf8Path, Utf8PathBuf};
use flakeforge_core::{CommandRunner, CommandSpec};
use std::io;
use tracing::{debug, info};

/// Marker whose presence in an ancestor means the project is in a repository
const GIT_MARKER: &str = ".git";

/// Result of [`ensure_tracked`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tracking {
    /// No ancestor is a git work tree; nothing was done
    NotInRepository,
    /// A nested repository exists at the flake directory with `files` staged
    Staged { files: Vec<String> },
}

/// Find the nearest `.git` entry at or above `path`, including the root.
///
/// A missing marker moves on to the parent; any other filesystem error aborts
/// the walk.
pub fn find_git_marker(path: &Utf8Path) -> Result<Option<Utf8PathBuf>> {
    let start = absolute(path)?;
    for dir in start.ancestors() {
        let marker = dir.join(GIT_MARKER);
        match std::fs::metadata(&marker) {
            Ok(_) => return Ok(Some(marker)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(source) => {
                return Err(Error::GitLookup {
                    path: dir.to_path_buf(),
                    source,
                })
            }
        }
    }
    Ok(None)
}

fn absolute(path: &Utf8Path) -> Result<Utf8PathBuf> {
    let lookup_error = |source| Error::GitLookup {
        path: path.to_path_buf(),
        source,
    };
    let absolute = std::path::absolute(path).map_err(lookup_error)?;
    Utf8PathBuf::try_from(absolute).map_err(|e| lookup_error(e.into_io_error()))
}

/// Make the generated flake visible to nix when `out_path` is inside a git
/// work tree.
///
/// Runs `git init` in `flake_dir` (idempotent) and stages `flake.nix`, plus
/// `glibc-patch/flake.nix` and the patch script it references when
/// `include_glibc_patch` is set. In debug mode git
/// inherits the terminal; otherwise its output is captured and reported on
/// failure.
pub async fn ensure_tracked(
    runner: &dyn CommandRunner,
    flake_dir: &Utf8Path,
    out_path: &Utf8Path,
    include_glibc_patch: bool,
    debug: bool,
) -> Result<Tracking> {
    let Some(marker) = find_git_marker(out_path)? else {
        debug!("{} is not inside a git repository", out_path);
        return Ok(Tracking::NotInRepository);
    };
    debug!("found {}, staging generated flake", marker);

    let mut files = vec!["flake.nix".to_string()];
    if include_glibc_patch {
        files.push(format!("{}/flake.nix", GLIBC_PATCH_DIR));
        files.push(format!("{}/{}", GLIBC_PATCH_DIR, GLIBC_PATCH_SCRIPT));
    }

    let init = git(flake_dir).arg("init");
    run_git(runner, &init, debug).await?;

    let add = git(flake_dir).arg("add").args(&files);
    run_git(runner, &add, debug).await?;

    info!("Staged {} in {}", files.join(", "), flake_dir);
    Ok(Tracking::Staged { files })
}

fn git(dir: &Utf8Path) -> CommandSpec {
    CommandSpec::new("git").arg("-C").arg(dir.as_str())
}

async fn run_git(runner: &dyn CommandRunner, spec: &CommandSpec, debug: bool) -> Result<()> {
    if debug {
        let status = runner.run(spec).await?;
        if !status.success() {
            return Err(flakeforge_core::Error::command_failed(
                spec.to_string(),
                status.to_string(),
                "",
            )
            .into());
        }
    } else {
        runner.output(spec).await?.check(spec)?;
    }
    Ok(())
}
