use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};

use crate::version::{Constraint, Version};

/// A parsed Gemfile.lock. Every raw line is kept: serialization maps over
/// the original lines and substitutes only the version token of changed
/// specs and the constraint token of changed DEPENDENCIES entries, so
/// untouched sections round-trip byte-for-byte.
#[derive(Clone, Debug)]
pub struct Lockfile {
    lines: Vec<String>,
    trailing_newline: bool,
    specs: BTreeMap<String, LockedSpec>,
    dependencies: BTreeMap<String, LockDependency>,
}

/// One resolved gem from the `specs:` block, with the dependency edges it
/// imposes on other gems.
#[derive(Clone, Debug)]
pub struct LockedSpec {
    pub name: String,
    pub version: Version,
    pub dependencies: Vec<(String, Constraint)>,
    line: usize,
    indent: String,
}

/// One entry of the `DEPENDENCIES` section.
#[derive(Clone, Debug)]
pub struct LockDependency {
    pub name: String,
    pub constraint: Option<Constraint>,
    line: usize,
    /// Trailing `!`: the gem comes from a non-registry source. Not part of
    /// the name, but re-emitted when the entry is rewritten.
    source_marker: bool,
}

#[derive(PartialEq)]
enum Section {
    None,
    GemSpecs,
    Gem,
    Dependencies,
    Other,
}

impl Lockfile {
    pub fn parse(text: &str) -> Result<Self> {
        let trailing_newline = text.ends_with('\n');
        let lines: Vec<String> = text.lines().map(|l| l.to_string()).collect();

        let mut specs: BTreeMap<String, LockedSpec> = BTreeMap::new();
        let mut dependencies = BTreeMap::new();
        let mut section = Section::None;
        let mut current_spec: Option<String> = None;

        for (idx, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }

            if !line.starts_with(' ') {
                section = match line.trim_end() {
                    "GEM" | "PATH" | "GIT" => Section::Gem,
                    "DEPENDENCIES" => Section::Dependencies,
                    _ => Section::Other,
                };
                current_spec = None;
                continue;
            }

            match section {
                Section::Gem => {
                    if line.trim_end() == "  specs:" {
                        section = Section::GemSpecs;
                    }
                }
                Section::GemSpecs => {
                    if let Some(body) = line.strip_prefix("      ") {
                        // Dependency edge of the spec above.
                        let Some(owner) = current_spec.clone() else {
                            bail!("dangling dependency at Gemfile.lock line {}", idx + 1);
                        };
                        let (name, constraint) = parse_name_and_parens(body)
                            .with_context(|| format!("parse Gemfile.lock line {}", idx + 1))?;
                        let constraint = match constraint {
                            Some(c) => Constraint::parse(&c).with_context(|| {
                                format!("parse constraint at Gemfile.lock line {}", idx + 1)
                            })?,
                            None => Constraint::any(),
                        };
                        if let Some(spec) = specs.get_mut(&owner) {
                            spec.dependencies.push((name, constraint));
                        }
                    } else if let Some(body) = line.strip_prefix("    ") {
                        let (name, version) = parse_name_and_parens(body)
                            .with_context(|| format!("parse Gemfile.lock line {}", idx + 1))?;
                        let Some(version) = version else {
                            bail!("spec without version at Gemfile.lock line {}", idx + 1);
                        };
                        let version = Version::parse(&version).with_context(|| {
                            format!("parse version at Gemfile.lock line {}", idx + 1)
                        })?;
                        current_spec = Some(name.clone());
                        specs.insert(
                            name.clone(),
                            LockedSpec {
                                name,
                                version,
                                dependencies: Vec::new(),
                                line: idx,
                                indent: "    ".to_string(),
                            },
                        );
                    }
                }
                Section::Dependencies => {
                    let body = line.trim_start().trim_end();
                    // A trailing `!` marks a non-registry source. It follows
                    // the constraint parens, so peel it before splitting.
                    let (body, source_marker) = match body.strip_suffix('!') {
                        Some(rest) => (rest, true),
                        None => (body, false),
                    };
                    let (name, constraint) = parse_name_and_parens(body)
                        .with_context(|| format!("parse Gemfile.lock line {}", idx + 1))?;
                    let constraint = match constraint {
                        Some(c) => Some(Constraint::parse(&c).with_context(|| {
                            format!("parse constraint at Gemfile.lock line {}", idx + 1)
                        })?),
                        None => None,
                    };
                    dependencies.insert(
                        name.clone(),
                        LockDependency {
                            name,
                            constraint,
                            line: idx,
                            source_marker,
                        },
                    );
                }
                Section::None | Section::Other => {}
            }
        }

        Ok(Self {
            lines,
            trailing_newline,
            specs,
            dependencies,
        })
    }

    pub fn specs(&self) -> &BTreeMap<String, LockedSpec> {
        &self.specs
    }

    pub fn spec(&self, name: &str) -> Option<&LockedSpec> {
        self.specs.get(name)
    }

    pub fn dependencies(&self) -> &BTreeMap<String, LockDependency> {
        &self.dependencies
    }

    /// Renders the lock with `version_changes` applied to spec lines and
    /// `constraint_changes` (gem name -> new constraint string) applied to
    /// DEPENDENCIES lines. Every other line is emitted verbatim.
    pub fn render(
        &self,
        version_changes: &BTreeMap<String, Version>,
        constraint_changes: &BTreeMap<String, String>,
    ) -> String {
        let mut lines = self.lines.clone();

        for (name, version) in version_changes {
            if let Some(spec) = self.specs.get(name) {
                lines[spec.line] = format!("{}{} ({})", spec.indent, spec.name, version);
            }
        }

        for (name, constraint) in constraint_changes {
            if let Some(dep) = self.dependencies.get(name) {
                let marker = if dep.source_marker { "!" } else { "" };
                lines[dep.line] = format!("  {} ({}){}", dep.name, constraint, marker);
            }
        }

        let mut out = lines.join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }
}

/// Splits `name (text)` into the name and the parenthesized text, if any.
fn parse_name_and_parens(body: &str) -> Result<(String, Option<String>)> {
    let body = body.trim_end();
    match body.split_once(" (") {
        Some((name, rest)) => {
            let Some(inner) = rest.strip_suffix(')') else {
                bail!("unterminated parenthesis in {:?}", body);
            };
            Ok((name.to_string(), Some(inner.to_string())))
        }
        None => {
            if body.is_empty() {
                bail!("empty entry");
            }
            Ok((body.to_string(), None))
        }
    }
}

#[cfg(test)]
#[path = "tests/lockfile_tests.rs"]
mod tests;
