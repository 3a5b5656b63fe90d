use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use anyhow::{Context, Result};

use crate::candidates::{self, Scan};
use crate::engine::{self, KeySource};
use crate::gemfile::Gemfile;
use crate::lockfile::Lockfile;
use crate::model::{
    ConstraintEdge, PackageEntry, Policy, ResolutionRequest, ResolutionResult, UpdatedPackage,
    VersionSpec,
};
use crate::registry::Registry;
use crate::render::{self, RenderOptions};
use crate::resolver::{ResolveError, Resolver};
use crate::version::Constraint;
use crate::workspace::Workspace;
use crate::writer;

const MANIFEST_OWNER: &str = "Gemfile";

/// Builds the pinned resolution request for a confirmed selection and runs
/// it through the resolver. Every gem outside the selection is pinned to
/// its current version, so the resolver cannot move anything the user did
/// not choose. Under the Latest policy, selected direct gems whose
/// candidate escapes the declared constraint get a replacement `~>`
/// constraint recorded for the Gemfile rewrite.
pub fn resolve_selection(
    selection: &BTreeSet<String>,
    policy: Policy,
    entries: &[PackageEntry],
    gemfile: &Gemfile,
    lock: &Lockfile,
    resolver: &dyn Resolver,
) -> Result<ResolutionResult, ResolveError> {
    let entry_by_name: BTreeMap<&str, &PackageEntry> =
        entries.iter().map(|e| (e.name.as_str(), e)).collect();

    let mut packages = BTreeMap::new();
    for (name, spec) in lock.specs() {
        let selected_entry = selection
            .contains(name)
            .then(|| entry_by_name.get(name.as_str()))
            .flatten();
        let version_spec = match selected_entry {
            Some(entry) => VersionSpec::Free {
                candidate: entry.candidate_version.clone(),
            },
            None => VersionSpec::Pinned(spec.version.clone()),
        };
        packages.insert(name.clone(), version_spec);
    }

    let mut manifest_changes = BTreeMap::new();
    let mut constraints = Vec::new();

    for decl in gemfile.deps() {
        let replaced = policy == Policy::Latest
            && selection.contains(&decl.name)
            && entry_by_name
                .get(decl.name.as_str())
                .is_some_and(|e| e.requires_manifest_change);
        let constraint = if replaced {
            let entry = entry_by_name[decl.name.as_str()];
            let replacement = Constraint::pessimistic(&entry.candidate_version);
            manifest_changes.insert(decl.name.clone(), replacement.as_str().to_string());
            replacement
        } else {
            decl.constraint.clone()
        };
        if constraint.is_empty() {
            continue;
        }
        constraints.push(ConstraintEdge {
            owner: MANIFEST_OWNER.to_string(),
            target: decl.name.clone(),
            constraint,
        });
    }

    for spec in lock.specs().values() {
        for (dep, constraint) in &spec.dependencies {
            if constraint.is_empty() {
                continue;
            }
            constraints.push(ConstraintEdge {
                owner: spec.name.clone(),
                target: dep.clone(),
                constraint: constraint.clone(),
            });
        }
    }

    let request = ResolutionRequest {
        packages,
        constraints,
    };
    let versions = resolver.resolve(&request)?;

    // Candidate-list order, which the confirmation block reuses.
    let mut updated = Vec::new();
    for entry in entries {
        if !selection.contains(&entry.name) {
            continue;
        }
        let Some(new_version) = versions.get(&entry.name) else {
            continue;
        };
        if *new_version == entry.current_version {
            continue;
        }
        updated.push(UpdatedPackage {
            name: entry.name.clone(),
            old_version: entry.current_version.clone(),
            new_version: new_version.clone(),
            groups: entry.groups.clone(),
        });
    }

    Ok(ResolutionResult {
        versions,
        updated,
        manifest_changes,
    })
}

#[derive(Clone, Copy, Debug)]
pub struct UpdateOptions {
    pub policy: Policy,
    pub color: bool,
    /// Redraw frames in place (real terminal) instead of appending.
    pub in_place: bool,
}

/// The whole pipeline: scan → interact → resolve → persist. Collaborators
/// are injected; the binary wires the rubygems registry, the pinned
/// resolver and raw terminal keys, while tests substitute fakes.
pub fn run_update(
    ws: &Workspace,
    opts: UpdateOptions,
    registry: &dyn Registry,
    resolver: &dyn Resolver,
    keys: &mut dyn KeySource,
    out: &mut dyn Write,
) -> Result<()> {
    let (gemfile, lock) = ws.load()?;

    let Scan {
        candidates,
        warnings,
    } = candidates::scan(&gemfile, &lock, opts.policy, registry);

    if candidates.is_empty() {
        writeln!(out, "No gems to update.").context("write output")?;
        write_warnings(out, &warnings)?;
        return Ok(());
    }

    let render_opts = RenderOptions { color: opts.color };
    let selection = engine::select_interactively(
        &candidates,
        &lock,
        keys,
        out,
        render_opts,
        opts.in_place,
    )?;
    let Some(selection) = selection else {
        writeln!(out, "\nUpdate canceled.").context("write output")?;
        return Ok(());
    };

    let resolution = resolve_selection(
        &selection,
        opts.policy,
        &candidates,
        &gemfile,
        &lock,
        resolver,
    )
    .context("resolve selected updates")?;

    let report = writer::write_update(ws, &gemfile, &lock, &resolution)?;

    write!(out, "\n{}", render::render_confirmation(&resolution.updated, render_opts))
        .context("write output")?;
    write!(out, "{}", render::render_summary(&report)).context("write output")?;
    write_warnings(out, &warnings)?;

    Ok(())
}

fn write_warnings(out: &mut dyn Write, warnings: &[crate::model::ScanWarning]) -> Result<()> {
    if warnings.is_empty() {
        return Ok(());
    }
    writeln!(out).context("write output")?;
    for w in warnings {
        writeln!(out, "Warning: skipped {}: {}", w.package, w.reason).context("write output")?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/update_tests.rs"]
mod tests;
