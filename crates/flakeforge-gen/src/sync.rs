//! Diff-aware file writes
//!
//! Nix uses the modification time of some inputs when caching evaluations,
//! so generated files must only be touched when their bytes actually change.
//! [`write_if_changed`] compares the existing file against the new content and
//! rewrites only the differing tail, or nothing at all.

use camino::Utf8Path;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use tracing::trace;

/// Mode for directories created on the way to a new file
pub const DIR_MODE: u32 = 0o700;

/// What happened to a file's content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentChange {
    /// The file did not exist and was written from scratch
    Created,
    /// Existing bytes already matched; nothing was written
    Unchanged,
    /// Bytes from `offset` to the end were rewritten
    Rewritten { offset: u64 },
}

/// Result of synchronizing one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    pub content: ContentChange,
    /// Permission bits were changed on an existing file
    pub mode_changed: bool,
}

impl SyncOutcome {
    /// No write and no chmod happened
    pub fn is_noop(&self) -> bool {
        self.content == ContentChange::Unchanged && !self.mode_changed
    }
}

/// Make the file at `path` contain exactly `data` with permission bits `mode`,
/// touching as little as possible.
///
/// - Missing file: parent directories are created, then the file is written.
/// - Permission bits that differ from `mode` are corrected regardless of content.
/// - A size mismatch rewrites the whole file.
/// - Equal sizes are compared byte by byte; the first mismatch (or read error)
///   at offset `k` rewrites `data[k..]` at `k` after truncating to `data.len()`.
/// - Identical content is never written, so the mtime is preserved.
pub fn write_if_changed(path: &Utf8Path, data: &[u8], mode: u32) -> io::Result<SyncOutcome> {
    let file = match OpenOptions::new().read(true).write(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            create(path, data, mode)?;
            trace!("created {}", path);
            return Ok(SyncOutcome {
                content: ContentChange::Created,
                mode_changed: false,
            });
        }
        Err(e) => return Err(e),
    };

    let metadata = file.metadata();
    let mode_changed = match &metadata {
        Ok(meta) if permission_bits(meta) == Some(mode) => false,
        _ => {
            set_mode(&file, mode)?;
            true
        }
    };

    if let Ok(meta) = &metadata {
        if meta.len() != data.len() as u64 {
            overwrite_from(&file, data, 0)?;
            trace!("rewrote {} (size changed)", path);
            return Ok(SyncOutcome {
                content: ContentChange::Rewritten { offset: 0 },
                mode_changed,
            });
        }
    }

    let mut existing = BufReader::new(&file).bytes();
    for (offset, expected) in data.iter().enumerate() {
        match existing.next() {
            Some(Ok(actual)) if actual == *expected => continue,
            _ => {
                overwrite_from(&file, data, offset)?;
                trace!("rewrote {} from offset {}", path, offset);
                return Ok(SyncOutcome {
                    content: ContentChange::Rewritten {
                        offset: offset as u64,
                    },
                    mode_changed,
                });
            }
        }
    }

    trace!("{} is up to date", path);
    Ok(SyncOutcome {
        content: ContentChange::Unchanged,
        mode_changed,
    })
}

fn create(path: &Utf8Path, data: &[u8], mode: u32) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        create_dirs(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data)?;
    // The creation mode is subject to the umask; set it explicitly.
    set_mode(&file, mode)
}

/// Truncate `file` to `data.len()` and write `data[offset..]` at `offset`.
fn overwrite_from(file: &File, data: &[u8], offset: usize) -> io::Result<()> {
    file.set_len(data.len() as u64)?;
    let mut writer = file;
    writer.seek(SeekFrom::Start(offset as u64))?;
    writer.write_all(&data[offset..])?;
    writer.flush()
}

#[cfg(unix)]
fn create_dirs(dir: &Utf8Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(DIR_MODE).create(dir)
}

#[cfg(not(unix))]
fn create_dirs(dir: &Utf8Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn permission_bits(meta: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(meta.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn permission_bits(_meta: &fs::Metadata) -> Option<u32> {
    None
}

#[cfg(unix)]
fn set_mode(file: &File, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &File, _mode: u32) -> io::Result<()> {
    Ok(())
}
