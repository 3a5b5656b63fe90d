use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::gemfile::Gemfile;
use crate::lockfile::Lockfile;
use crate::model::{ResolutionResult, WriteReport};
use crate::workspace::Workspace;

/// Persists a resolution: serializes the new lock (untouched lines
/// byte-for-byte) and, when the Latest policy rewrote constraints, the
/// affected Gemfile lines. Each file is written atomically, so a crash
/// mid-write cannot leave either file corrupt.
pub fn write_update(
    ws: &Workspace,
    gemfile: &Gemfile,
    lock: &Lockfile,
    resolution: &ResolutionResult,
) -> Result<WriteReport> {
    let mut version_changes = BTreeMap::new();
    for u in &resolution.updated {
        version_changes.insert(u.name.clone(), u.new_version.clone());
    }

    let lock_text = lock.render(&version_changes, &resolution.manifest_changes);
    write_atomic(&ws.lockfile_path, lock_text.as_bytes()).context("write Gemfile.lock")?;

    let gemfile_changed = !resolution.manifest_changes.is_empty();
    if gemfile_changed {
        let gemfile_text = gemfile.apply_changes(&resolution.manifest_changes)?;
        write_atomic(&ws.gemfile_path, gemfile_text.as_bytes()).context("write Gemfile")?;
    }

    Ok(WriteReport { gemfile_changed })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = temp_path(path)?;
    fs::write(&tmp, bytes).with_context(|| format!("write temp file {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

/// Temp name alongside the target, derived from the full file name so that
/// `Gemfile` and `Gemfile.lock` never collide.
fn temp_path(path: &Path) -> Result<std::path::PathBuf> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("no file name in {}", path.display()))?;
    Ok(path.with_file_name(format!("{}.tmp.{}", file_name, std::process::id())))
}

#[cfg(test)]
#[path = "tests/writer_tests.rs"]
mod tests;
