use std::collections::{BTreeMap, BTreeSet};

use crate::gemfile::Gemfile;
use crate::lockfile::Lockfile;
use crate::model::{PackageEntry, PackageKind, Policy, ScanWarning};
use crate::registry::Registry;
use crate::version::{Constraint, Version};

/// The ordered candidate list plus the registry lookups that failed along
/// the way.
#[derive(Clone, Debug, Default)]
pub struct Scan {
    pub candidates: Vec<PackageEntry>,
    pub warnings: Vec<ScanWarning>,
}

/// Picks the target version for one gem under the active policy.
///
/// Constrained: highest available version satisfying the declared
/// constraint and every compatibility window imposed by dependents.
/// Latest: highest available version outright.
///
/// Returns `None` when no strictly higher version qualifies.
pub fn candidate_for(
    current: &Version,
    declared: Option<&Constraint>,
    dependent_constraints: &[Constraint],
    policy: Policy,
    available: &[Version],
) -> Option<Version> {
    let admissible = |v: &Version| match policy {
        Policy::Latest => true,
        Policy::Constrained => {
            declared.is_none_or(|c| c.satisfied_by(v))
                && dependent_constraints.iter().all(|c| c.satisfied_by(v))
        }
    };

    available
        .iter()
        .filter(|v| *v > current && admissible(v))
        .max()
        .cloned()
}

/// Builds the full upgradeable list from the current lock: direct gems
/// first in Gemfile declaration order, then transitive-only gems sorted by
/// name. Stable for identical inputs.
pub fn scan(
    gemfile: &Gemfile,
    lock: &Lockfile,
    policy: Policy,
    registry: &dyn Registry,
) -> Scan {
    let dependent_constraints = collect_dependent_constraints(lock);
    let transitive_groups = collect_transitive_groups(gemfile, lock);

    let mut by_name: BTreeMap<String, PackageEntry> = BTreeMap::new();
    let mut warnings = Vec::new();

    for (name, spec) in lock.specs() {
        let decl = gemfile.dep(name);
        let declared = decl.map(|d| d.constraint.clone());
        let declared_ref = declared.as_ref().filter(|c| !c.is_empty());

        let available = match registry.versions(name) {
            Ok(v) => v,
            Err(err) => {
                warnings.push(ScanWarning {
                    package: name.clone(),
                    reason: err.reason,
                });
                continue;
            }
        };

        let empty = Vec::new();
        let dependents = dependent_constraints.get(name).unwrap_or(&empty);
        let Some(candidate) =
            candidate_for(&spec.version, declared_ref, dependents, policy, &available)
        else {
            continue;
        };

        let requires_manifest_change = policy == Policy::Latest
            && declared_ref.is_some_and(|c| !c.satisfied_by(&candidate));

        let (kind, groups) = match decl {
            Some(d) => (PackageKind::Direct, d.groups.clone()),
            None => {
                let groups = transitive_groups
                    .get(name)
                    .map(|set| set.iter().cloned().collect())
                    .unwrap_or_else(|| vec!["default".to_string()]);
                (PackageKind::Transitive, groups)
            }
        };

        by_name.insert(
            name.clone(),
            PackageEntry {
                name: name.clone(),
                current_version: spec.version.clone(),
                candidate_version: candidate,
                declared_constraint: declared_ref.cloned(),
                groups,
                kind,
                requires_manifest_change,
            },
        );
    }

    let mut candidates = Vec::new();
    for decl in gemfile.deps() {
        if let Some(entry) = by_name.remove(&decl.name) {
            candidates.push(entry);
        }
    }
    // Remaining entries are transitive-only; BTreeMap order is the required
    // lexicographic order.
    candidates.extend(by_name.into_values());

    Scan {
        candidates,
        warnings,
    }
}

/// Every constraint edge in the lock, grouped by target gem.
fn collect_dependent_constraints(lock: &Lockfile) -> BTreeMap<String, Vec<Constraint>> {
    let mut out: BTreeMap<String, Vec<Constraint>> = BTreeMap::new();
    for spec in lock.specs().values() {
        for (dep, constraint) in &spec.dependencies {
            if constraint.is_empty() {
                continue;
            }
            out.entry(dep.clone()).or_default().push(constraint.clone());
        }
    }
    out
}

/// For each transitive gem, the union of group labels of the direct gems
/// that (transitively) pull it in.
fn collect_transitive_groups(
    gemfile: &Gemfile,
    lock: &Lockfile,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut out: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for decl in gemfile.deps() {
        for reached in reachable_from(lock, &decl.name) {
            out.entry(reached)
                .or_default()
                .extend(decl.groups.iter().cloned());
        }
    }
    out
}

/// Names reachable from `start` through lock dependency edges, excluding
/// `start` itself.
pub fn reachable_from(lock: &Lockfile, start: &str) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut stack = vec![start.to_string()];
    while let Some(name) = stack.pop() {
        let Some(spec) = lock.spec(&name) else {
            continue;
        };
        for (dep, _) in &spec.dependencies {
            if seen.insert(dep.clone()) {
                stack.push(dep.clone());
            }
        }
    }
    seen.remove(start);
    seen
}

#[cfg(test)]
#[path = "tests/candidates_tests.rs"]
mod tests;
