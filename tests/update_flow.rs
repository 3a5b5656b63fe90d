use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;

use gemup::engine::{Key, ScriptedKeys};
use gemup::model::Policy;
use gemup::registry::{Registry, RegistryError};
use gemup::resolver::PinnedResolver;
use gemup::update::{self, UpdateOptions};
use gemup::version::Version;
use gemup::workspace::Workspace;

const GEMFILE: &str = r#"source "https://rubygems.org"

gem "bigdecimal"
gem "minitest", "~> 5.0.0"

group :test do
  gem "rake"
end
"#;

const LOCK: &str = "GEM
  remote: https://rubygems.org/
  specs:
    bigdecimal (3.1.7)
    minitest (5.0.0)
    rake (12.3.3)

PLATFORMS
  ruby

DEPENDENCIES
  bigdecimal
  minitest (~> 5.0.0)
  rake

BUNDLED WITH
   2.4.10
";

struct FakeRegistry {
    versions: BTreeMap<&'static str, Vec<&'static str>>,
}

impl FakeRegistry {
    fn standard() -> Self {
        let mut versions = BTreeMap::new();
        versions.insert("bigdecimal", vec!["3.1.7", "3.2.0"]);
        versions.insert("minitest", vec!["5.0.0", "5.0.8", "5.26.1"]);
        versions.insert("rake", vec!["12.3.3", "13.0.6"]);
        Self { versions }
    }

    fn without(mut self, name: &str) -> Self {
        self.versions.remove(name);
        self
    }
}

impl Registry for FakeRegistry {
    fn versions(&self, name: &str) -> Result<Vec<Version>, RegistryError> {
        match self.versions.get(name) {
            Some(list) => Ok(list
                .iter()
                .map(|s| Version::parse(s).expect("fixture version"))
                .collect()),
            None => Err(RegistryError {
                package: name.to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}

fn write_fixture(dir: &Path) -> Result<Workspace> {
    std::fs::write(dir.join("Gemfile"), GEMFILE)?;
    std::fs::write(dir.join("Gemfile.lock"), LOCK)?;
    Workspace::at_gemfile(&dir.join("Gemfile"))
}

fn run(
    ws: &Workspace,
    policy: Policy,
    registry: &FakeRegistry,
    keys: Vec<Key>,
) -> Result<String> {
    let opts = UpdateOptions {
        policy,
        color: false,
        in_place: false,
    };
    let mut keys = ScriptedKeys::new(keys);
    let mut out = Vec::new();
    update::run_update(ws, opts, registry, &PinnedResolver, &mut keys, &mut out)?;
    Ok(String::from_utf8(out)?)
}

#[test]
fn constrained_update_rewrites_only_the_lock() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let ws = write_fixture(dir.path())?;
    let registry = FakeRegistry::standard();

    // Move to minitest, select it, confirm.
    let out = run(
        &ws,
        Policy::Constrained,
        &registry,
        vec![Key::Down, Key::Char(' '), Key::Enter],
    )?;

    assert!(out.contains("3 gems can be updated.\n"));
    assert!(out.contains("‣ ⬡ bigdecimal  3.1.7   →  3.2.0\n"));
    assert!(out.contains("‣ ⬢ minitest"));
    assert!(out.contains("Updating the following gems.\n"));
    assert!(out.contains("minitest  5.0.0  →  5.0.8  :default\n"));
    assert!(out.contains("Bundle updated!\n"));
    assert!(!out.contains("Your Gemfile was changed"));

    let lock = std::fs::read_to_string(&ws.lockfile_path)?;
    assert!(lock.contains("    minitest (5.0.8)\n"));
    assert!(lock.contains("    bigdecimal (3.1.7)\n"));
    assert!(lock.contains("    rake (12.3.3)\n"));
    assert!(lock.contains("  minitest (~> 5.0.0)\n"));
    assert!(lock.contains("BUNDLED WITH\n   2.4.10\n"));

    let gemfile = std::fs::read_to_string(&ws.gemfile_path)?;
    assert_eq!(gemfile, GEMFILE);
    Ok(())
}

#[test]
fn latest_update_rewrites_the_gemfile_and_the_lock_dependency() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let ws = write_fixture(dir.path())?;
    let registry = FakeRegistry::standard();

    let out = run(
        &ws,
        Policy::Latest,
        &registry,
        vec![Key::Down, Key::Char(' '), Key::Enter],
    )?;

    assert!(out.contains("minitest  5.0.0  →  5.26.1  :default\n"));
    assert!(out.contains("Bundle updated!\n"));
    assert!(out.contains("Your Gemfile was changed\n"));

    let gemfile = std::fs::read_to_string(&ws.gemfile_path)?;
    assert!(gemfile.contains("gem \"minitest\", \"~> 5.26.1\"\n"));
    assert!(gemfile.contains("gem \"bigdecimal\"\n"));

    let lock = std::fs::read_to_string(&ws.lockfile_path)?;
    assert!(lock.contains("    minitest (5.26.1)\n"));
    assert!(lock.contains("  minitest (~> 5.26.1)\n"));
    Ok(())
}

#[test]
fn selecting_multiple_gems_updates_each_of_them() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let ws = write_fixture(dir.path())?;
    let registry = FakeRegistry::standard();

    let out = run(
        &ws,
        Policy::Constrained,
        &registry,
        vec![
            Key::Char(' '),
            Key::Char('j'),
            Key::Char(' '),
            Key::Char('j'),
            Key::Char(' '),
            Key::Enter,
        ],
    )?;

    assert!(out.contains("bigdecimal  3.1.7   →  3.2.0   :default\n"));
    assert!(out.contains("minitest    5.0.0   →  5.0.8   :default\n"));
    assert!(out.contains("rake        12.3.3  →  13.0.6  :test\n"));

    let lock = std::fs::read_to_string(&ws.lockfile_path)?;
    assert!(lock.contains("    bigdecimal (3.2.0)\n"));
    assert!(lock.contains("    minitest (5.0.8)\n"));
    assert!(lock.contains("    rake (13.0.6)\n"));
    Ok(())
}

#[test]
fn interrupt_cancels_without_touching_either_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let ws = write_fixture(dir.path())?;
    let registry = FakeRegistry::standard();

    let out = run(
        &ws,
        Policy::Constrained,
        &registry,
        vec![Key::Down, Key::Char(' '), Key::Interrupt],
    )?;

    assert!(out.contains("Update canceled.\n"));
    assert!(!out.contains("Bundle updated!"));
    assert_eq!(std::fs::read_to_string(&ws.gemfile_path)?, GEMFILE);
    assert_eq!(std::fs::read_to_string(&ws.lockfile_path)?, LOCK);
    Ok(())
}

#[test]
fn empty_confirm_shows_a_hint_instead_of_finishing() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let ws = write_fixture(dir.path())?;
    let registry = FakeRegistry::standard();

    let out = run(
        &ws,
        Policy::Constrained,
        &registry,
        vec![Key::Enter, Key::Interrupt],
    )?;

    assert!(out.contains("Nothing selected."));
    assert!(out.contains("Update canceled.\n"));
    assert_eq!(std::fs::read_to_string(&ws.lockfile_path)?, LOCK);
    Ok(())
}

#[test]
fn nothing_to_update_reports_and_exits() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let ws = write_fixture(dir.path())?;
    let mut registry = FakeRegistry::standard();
    registry.versions.insert("bigdecimal", vec!["3.1.7"]);
    registry.versions.insert("minitest", vec!["5.0.0"]);
    registry.versions.insert("rake", vec!["12.3.3"]);

    let out = run(&ws, Policy::Constrained, &registry, vec![])?;
    assert!(out.contains("No gems to update.\n"));
    assert_eq!(std::fs::read_to_string(&ws.lockfile_path)?, LOCK);
    Ok(())
}

#[test]
fn registry_failures_surface_as_warnings_after_the_update() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let ws = write_fixture(dir.path())?;
    let registry = FakeRegistry::standard().without("rake");

    let out = run(
        &ws,
        Policy::Constrained,
        &registry,
        vec![Key::Char(' '), Key::Enter],
    )?;

    assert!(out.contains("2 gems can be updated.\n"));
    assert!(out.contains("Bundle updated!\n"));
    assert!(out.contains("Warning: skipped rake: connection refused\n"));
    Ok(())
}

#[test]
fn missing_lockfile_is_a_setup_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("Gemfile"), GEMFILE)?;

    let err = Workspace::at_gemfile(&dir.path().join("Gemfile"))
        .err()
        .map(|e| e.to_string())
        .unwrap_or_default();
    assert!(err.contains("bundle lock"));
    Ok(())
}
