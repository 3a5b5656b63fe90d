use std::collections::BTreeSet;

use crossterm::style::{Color, Stylize};

use crate::model::{PackageEntry, PackageKind, UpdatedPackage, WriteReport};
use crate::selection::SelectionState;
use crate::version::Version;

/// Marker for a row that is not selected.
pub const MARKER_HOLLOW: &str = "⬡";
/// Marker for a selected row (or a transitive row pulled in by a selected
/// direct gem).
pub const MARKER_FILLED: &str = "⬢";
/// Cursor row prefix.
pub const POINTER: &str = "‣";

#[derive(Clone, Copy, Debug, Default)]
pub struct RenderOptions {
    pub color: bool,
}

/// Renders the interactive list: legend, count line, one row per
/// candidate. Pure function of its arguments; deterministic so the engine
/// is testable without a terminal.
pub fn render_list(
    entries: &[PackageEntry],
    state: &SelectionState,
    implied: &BTreeSet<String>,
    opts: RenderOptions,
) -> String {
    let mut out = String::new();
    out.push_str("Color legend:\n");
    out.push_str(&format!(
        "  {} unselected  {} selected\n\n",
        MARKER_HOLLOW, MARKER_FILLED
    ));
    out.push_str(&format!("{} gems can be updated.\n", entries.len()));

    let name_width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
    let current_width = entries
        .iter()
        .map(|e| e.current_version.as_str().len())
        .max()
        .unwrap_or(0);

    for (idx, entry) in entries.iter().enumerate() {
        let pointer = if idx == state.cursor() { POINTER } else { " " };
        let marker = marker_for(entry, state, implied);
        out.push_str(&format!(
            "{} {} {:<name_width$}  {:<current_width$}  →  {}\n",
            pointer,
            marker,
            entry.name,
            entry.current_version.as_str(),
            paint_candidate(entry, opts),
        ));
    }
    out
}

/// Marker glyph as a pure function of (kind, selected, implied-by-selection).
fn marker_for(entry: &PackageEntry, state: &SelectionState, implied: &BTreeSet<String>) -> &'static str {
    if state.is_selected(&entry.name) {
        return MARKER_FILLED;
    }
    if entry.kind == PackageKind::Transitive && implied.contains(&entry.name) {
        return MARKER_FILLED;
    }
    MARKER_HOLLOW
}

/// Hint shown when Enter is pressed with nothing selected.
pub fn render_empty_selection_hint() -> &'static str {
    "\nNothing selected. Press <space> to select a gem, then <enter> to update.\n"
}

/// The post-confirm block listing exactly what will move.
pub fn render_confirmation(updated: &[UpdatedPackage], opts: RenderOptions) -> String {
    let mut out = String::new();
    out.push_str("Updating the following gems.\n\n");

    let name_width = updated.iter().map(|u| u.name.len()).max().unwrap_or(0);
    let old_width = updated
        .iter()
        .map(|u| u.old_version.as_str().len())
        .max()
        .unwrap_or(0);
    let new_width = updated
        .iter()
        .map(|u| u.new_version.as_str().len())
        .max()
        .unwrap_or(0);

    for u in updated {
        let groups = u
            .groups
            .iter()
            .map(|g| format!(":{}", g))
            .collect::<Vec<_>>()
            .join(", ");
        let new_version = pad(
            &paint_version(&u.old_version, &u.new_version, opts),
            u.new_version.as_str().len(),
            new_width,
        );
        out.push_str(&format!(
            "{:<name_width$}  {:<old_width$}  →  {}  {}\n",
            u.name,
            u.old_version.as_str(),
            new_version,
            groups,
        ));
    }
    out
}

/// Terminal status block.
pub fn render_summary(report: &WriteReport) -> String {
    let mut out = String::from("\nBundle updated!\n");
    if report.gemfile_changed {
        out.push_str("Your Gemfile was changed\n");
    }
    out
}

fn paint_candidate(entry: &PackageEntry, opts: RenderOptions) -> String {
    paint_version(&entry.current_version, &entry.candidate_version, opts)
}

/// Colors the target version by bump severity: major red, minor yellow,
/// patch green.
fn paint_version(old: &Version, new: &Version, opts: RenderOptions) -> String {
    if !opts.color {
        return new.as_str().to_string();
    }
    let color = match bump_index(old, new) {
        0 => Color::Red,
        1 => Color::Yellow,
        _ => Color::Green,
    };
    format!("{}", new.as_str().with(color))
}

fn bump_index(old: &Version, new: &Version) -> usize {
    let a = old.release_segments();
    let b = new.release_segments();
    let len = a.len().max(b.len());
    for i in 0..len {
        if a.get(i).copied().unwrap_or(0) != b.get(i).copied().unwrap_or(0) {
            return i;
        }
    }
    len
}

/// Left-pads styled text by its visible width (ANSI codes add bytes that
/// `{:<width$}` would count).
fn pad(text: &str, visible: usize, width: usize) -> String {
    let mut out = text.to_string();
    for _ in visible..width {
        out.push(' ');
    }
    out
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
