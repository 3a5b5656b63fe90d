use super::*;

use crate::model::ConstraintEdge;
use crate::version::Constraint;

fn v(s: &str) -> Version {
    Version::parse(s).expect("parse version")
}

fn c(s: &str) -> Constraint {
    Constraint::parse(s).expect("parse constraint")
}

fn edge(owner: &str, target: &str, constraint: &str) -> ConstraintEdge {
    ConstraintEdge {
        owner: owner.to_string(),
        target: target.to_string(),
        constraint: c(constraint),
    }
}

#[test]
fn pinned_gems_keep_their_versions_and_free_gems_take_the_candidate() {
    let mut packages = BTreeMap::new();
    packages.insert("bigdecimal".to_string(), VersionSpec::Pinned(v("3.1.7")));
    packages.insert(
        "minitest".to_string(),
        VersionSpec::Free {
            candidate: v("5.0.8"),
        },
    );

    let request = ResolutionRequest {
        packages,
        constraints: vec![edge("Gemfile", "minitest", "~> 5.0.0")],
    };

    let versions = PinnedResolver.resolve(&request).expect("resolve");
    assert_eq!(versions["bigdecimal"], v("3.1.7"));
    assert_eq!(versions["minitest"], v("5.0.8"));
}

#[test]
fn violated_edge_fails_with_both_packages_named() {
    let mut packages = BTreeMap::new();
    packages.insert("activesupport".to_string(), VersionSpec::Pinned(v("7.0.0")));
    packages.insert(
        "rails".to_string(),
        VersionSpec::Free {
            candidate: v("7.1.0"),
        },
    );

    let request = ResolutionRequest {
        packages,
        constraints: vec![edge("activesupport", "rails", "= 7.0.0")],
    };

    let err = PinnedResolver.resolve(&request).expect_err("conflict");
    match err {
        ResolveError::Unsatisfiable { conflicts } => {
            assert_eq!(conflicts, vec!["activesupport", "rails"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unsatisfiable_error_lists_the_conflicts() {
    let err = ResolveError::Unsatisfiable {
        conflicts: vec!["activesupport".to_string(), "rails".to_string()],
    };
    assert_eq!(
        err.to_string(),
        "unable to satisfy version constraints on: activesupport, rails"
    );
}

#[test]
fn edges_to_packages_outside_the_request_are_ignored() {
    let mut packages = BTreeMap::new();
    packages.insert("rails".to_string(), VersionSpec::Pinned(v("7.0.0")));

    let request = ResolutionRequest {
        packages,
        constraints: vec![edge("rails", "nokogiri", ">= 99.0")],
    };

    assert!(PinnedResolver.resolve(&request).is_ok());
}
