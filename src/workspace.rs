use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::gemfile::Gemfile;
use crate::lockfile::Lockfile;

/// A Gemfile/Gemfile.lock pair. Both files are read during scan and
/// selection; writes happen exactly once, after confirm.
#[derive(Clone, Debug)]
pub struct Workspace {
    pub root: PathBuf,
    pub gemfile_path: PathBuf,
    pub lockfile_path: PathBuf,
}

impl Workspace {
    /// Walks up from `start` until a Gemfile is found.
    pub fn discover(start: &Path) -> Result<Self> {
        let mut dir = start.to_path_buf();
        loop {
            let gemfile = dir.join("Gemfile");
            if gemfile.is_file() {
                return Self::at_gemfile(&gemfile);
            }
            if !dir.pop() {
                return Err(anyhow!(
                    "no Gemfile found in {} or any parent directory",
                    start.display()
                ));
            }
        }
    }

    pub fn at_gemfile(gemfile_path: &Path) -> Result<Self> {
        if !gemfile_path.is_file() {
            return Err(anyhow!("no Gemfile at {}", gemfile_path.display()));
        }
        let root = gemfile_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        let file_name = gemfile_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("Gemfile");
        let lockfile_path = root.join(format!("{}.lock", file_name));
        if !lockfile_path.is_file() {
            return Err(anyhow!(
                "no lockfile at {} (run `bundle lock` first)",
                lockfile_path.display()
            ));
        }
        Ok(Self {
            root,
            gemfile_path: gemfile_path.to_path_buf(),
            lockfile_path,
        })
    }

    pub fn load(&self) -> Result<(Gemfile, Lockfile)> {
        let gemfile_text = fs::read_to_string(&self.gemfile_path)
            .with_context(|| format!("read {}", self.gemfile_path.display()))?;
        let gemfile = Gemfile::parse(&gemfile_text)
            .with_context(|| format!("parse {}", self.gemfile_path.display()))?;

        let lock_text = fs::read_to_string(&self.lockfile_path)
            .with_context(|| format!("read {}", self.lockfile_path.display()))?;
        let lock = Lockfile::parse(&lock_text)
            .with_context(|| format!("parse {}", self.lockfile_path.display()))?;

        Ok((gemfile, lock))
    }
}
