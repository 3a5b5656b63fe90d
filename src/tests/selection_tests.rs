use super::*;

use crate::version::Version;

fn entry(name: &str, kind: PackageKind) -> PackageEntry {
    PackageEntry {
        name: name.to_string(),
        current_version: Version::parse("1.0.0").expect("version"),
        candidate_version: Version::parse("1.1.0").expect("version"),
        declared_constraint: None,
        groups: vec!["default".to_string()],
        kind,
        requires_manifest_change: false,
    }
}

fn entries() -> Vec<PackageEntry> {
    vec![
        entry("rails", PackageKind::Direct),
        entry("rake", PackageKind::Direct),
        entry("activesupport", PackageKind::Transitive),
    ]
}

#[test]
fn cursor_clamps_at_both_ends() {
    let mut state = SelectionState::new();
    assert_eq!(state.cursor(), 0);

    state.move_cursor(-1, 3);
    assert_eq!(state.cursor(), 0);

    state.move_cursor(1, 3);
    state.move_cursor(1, 3);
    assert_eq!(state.cursor(), 2);

    state.move_cursor(1, 3);
    assert_eq!(state.cursor(), 2);
}

#[test]
fn cursor_on_an_empty_list_stays_at_zero() {
    let mut state = SelectionState::new();
    state.move_cursor(1, 0);
    assert_eq!(state.cursor(), 0);
}

#[test]
fn toggle_flips_membership_of_the_row_under_the_cursor() {
    let entries = entries();
    let mut state = SelectionState::new();

    state.move_cursor(1, entries.len());
    state.toggle_current(&entries);
    assert!(state.is_selected("rake"));
    assert!(!state.is_selected("rails"));

    state.toggle_current(&entries);
    assert!(!state.is_selected("rake"));
}

#[test]
fn confirm_rejects_an_empty_selection() {
    let entries = entries();
    let mut state = SelectionState::new();
    assert!(state.confirm().is_none());

    state.toggle_current(&entries);
    let selected = state.confirm().expect("non-empty selection");
    assert_eq!(selected.len(), 1);
    assert!(selected.contains("rails"));
}

#[test]
fn implied_closure_follows_lock_edges_from_selected_direct_gems() {
    let lock = Lockfile::parse(
        "GEM
  specs:
    activesupport (7.0.0)
    rails (7.0.0)
      activesupport (>= 7.0)
    rake (12.3.3)

DEPENDENCIES
  rails
  rake
",
    )
    .expect("parse lock");

    let entries = entries();
    let mut state = SelectionState::new();

    // Selecting rake implies nothing.
    state.move_cursor(1, entries.len());
    state.toggle_current(&entries);
    assert!(state.implied_closure(&entries, &lock).is_empty());

    // Selecting rails pulls in activesupport.
    state.move_cursor(-1, entries.len());
    state.toggle_current(&entries);
    let implied = state.implied_closure(&entries, &lock);
    assert!(implied.contains("activesupport"));
    assert_eq!(implied.len(), 1);
}
