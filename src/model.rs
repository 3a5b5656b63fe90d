use std::collections::BTreeMap;

use crate::version::{Constraint, Version};

/// Governs how far a candidate version may move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Policy {
    /// Highest version that still satisfies the declared constraint (or the
    /// compatibility window imposed by dependents, for transitive gems).
    Constrained,
    /// Highest available version; may require rewriting the Gemfile line.
    Latest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackageKind {
    /// Declared in the Gemfile.
    Direct,
    /// Present only because some direct dependency pulls it in.
    Transitive,
}

/// One row in the candidate list: a locked gem with a strictly higher
/// version available under the active policy.
#[derive(Clone, Debug)]
pub struct PackageEntry {
    pub name: String,
    pub current_version: Version,
    pub candidate_version: Version,
    pub declared_constraint: Option<Constraint>,
    /// Gemfile group labels this gem belongs to (dependents' groups for
    /// transitive gems). Sorted, deduplicated.
    pub groups: Vec<String>,
    pub kind: PackageKind,
    /// Latest policy only: the candidate falls outside the declared
    /// constraint, so the Gemfile line must be rewritten.
    pub requires_manifest_change: bool,
}

/// A registry lookup that failed during the scan; the gem is skipped and
/// the failure reported in the end-of-run summary.
#[derive(Clone, Debug)]
pub struct ScanWarning {
    pub package: String,
    pub reason: String,
}

/// What the resolver may do with one package.
#[derive(Clone, Debug)]
pub enum VersionSpec {
    /// Not selected: must stay at exactly this version.
    Pinned(Version),
    /// Selected: move to this candidate version.
    Free { candidate: Version },
}

/// Everything the resolver needs: per-package pin/free decisions plus the
/// full constraint set (Gemfile declarations and locked dependency edges).
#[derive(Clone, Debug)]
pub struct ResolutionRequest {
    pub packages: BTreeMap<String, VersionSpec>,
    pub constraints: Vec<ConstraintEdge>,
}

/// One constraint on `target`, owned by a Gemfile declaration or by a
/// dependent gem in the lock.
#[derive(Clone, Debug)]
pub struct ConstraintEdge {
    pub owner: String,
    pub target: String,
    pub constraint: Constraint,
}

#[derive(Clone, Debug)]
pub struct UpdatedPackage {
    pub name: String,
    pub old_version: Version,
    pub new_version: Version,
    pub groups: Vec<String>,
}

/// Outcome of a successful resolution: the complete new graph, the subset
/// that actually moved, and the Gemfile lines that must be rewritten.
#[derive(Clone, Debug)]
pub struct ResolutionResult {
    pub versions: BTreeMap<String, Version>,
    pub updated: Vec<UpdatedPackage>,
    /// Gem name -> replacement constraint string (e.g. `~> 5.26.1`).
    pub manifest_changes: BTreeMap<String, String>,
}

/// What the write pass touched; drives the closing summary line.
#[derive(Clone, Debug)]
pub struct WriteReport {
    pub gemfile_changed: bool,
}
