use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::model::{ResolutionRequest, VersionSpec};
use crate::registry::RegistryError;
use crate::version::Version;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unable to satisfy version constraints on: {}", conflicts.join(", "))]
    Unsatisfiable { conflicts: Vec<String> },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Produces a consistent version assignment for a constraint set, or fails
/// with the conflicting packages. Injected so the orchestrator is testable
/// with a fake that asserts on the request it receives.
pub trait Resolver {
    fn resolve(&self, request: &ResolutionRequest)
    -> Result<BTreeMap<String, Version>, ResolveError>;
}

/// The shipped resolver. The request already pins every non-selected gem
/// and names the target version of every selected one, so resolution is an
/// assignment plus a full constraint check: any violated edge fails the
/// whole request with the packages involved.
pub struct PinnedResolver;

impl Resolver for PinnedResolver {
    fn resolve(
        &self,
        request: &ResolutionRequest,
    ) -> Result<BTreeMap<String, Version>, ResolveError> {
        let mut assignment = BTreeMap::new();
        for (name, spec) in &request.packages {
            let version = match spec {
                VersionSpec::Pinned(v) => v.clone(),
                VersionSpec::Free { candidate } => candidate.clone(),
            };
            assignment.insert(name.clone(), version);
        }

        let mut conflicts = BTreeSet::new();
        for edge in &request.constraints {
            let Some(version) = assignment.get(&edge.target) else {
                continue;
            };
            if !edge.constraint.satisfied_by(version) {
                conflicts.insert(edge.target.clone());
                conflicts.insert(edge.owner.clone());
            }
        }
        if !conflicts.is_empty() {
            return Err(ResolveError::Unsatisfiable {
                conflicts: conflicts.into_iter().collect(),
            });
        }

        Ok(assignment)
    }
}

#[cfg(test)]
#[path = "tests/resolver_tests.rs"]
mod tests;
