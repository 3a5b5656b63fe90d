use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};

use crate::version::Constraint;

/// A parsed Gemfile, limited to the declaration subset this tool rewrites:
/// `source`, `gem "name" [, "req"]* [, options]`, and `group ... do` blocks.
/// Raw lines are kept so that untouched declarations round-trip
/// byte-for-byte.
#[derive(Clone, Debug)]
pub struct Gemfile {
    lines: Vec<String>,
    trailing_newline: bool,
    deps: Vec<GemDecl>,
}

/// One `gem` declaration, in Gemfile order.
#[derive(Clone, Debug)]
pub struct GemDecl {
    pub name: String,
    pub requirements: Vec<String>,
    pub constraint: Constraint,
    pub groups: Vec<String>,
    line: usize,
    indent: String,
    /// Non-requirement arguments after the version strings, reattached on
    /// rewrite (e.g. `require: false`).
    options: Vec<String>,
}

impl Gemfile {
    pub fn parse(text: &str) -> Result<Self> {
        let trailing_newline = text.ends_with('\n');
        let lines: Vec<String> = text.lines().map(|l| l.to_string()).collect();
        let mut deps = Vec::new();

        // Stack of open `do` blocks; `Some` frames carry group labels.
        let mut blocks: Vec<Option<Vec<String>>> = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            let code = strip_comment(line);
            let trimmed = code.trim();

            if trimmed == "end" {
                if blocks.pop().is_none() {
                    bail!("unbalanced `end` at Gemfile line {}", idx + 1);
                }
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("group") {
                if trimmed.ends_with(" do") {
                    let labels = rest
                        .trim_end_matches("do")
                        .split(',')
                        .filter_map(|t| t.trim().strip_prefix(':'))
                        .map(|s| s.to_string())
                        .collect::<Vec<_>>();
                    if labels.is_empty() {
                        bail!("group block without labels at Gemfile line {}", idx + 1);
                    }
                    blocks.push(Some(labels));
                    continue;
                }
            }

            if trimmed.ends_with(" do") || trimmed == "do" {
                // Some other block (platforms, install_if, ...); tracked only
                // so its `end` balances.
                blocks.push(None);
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("gem ") {
                let indent = line[..line.len() - line.trim_start().len()].to_string();
                let decl = parse_gem_args(rest, idx, indent, current_groups(&blocks))
                    .with_context(|| format!("parse Gemfile line {}", idx + 1))?;
                deps.push(decl);
            }
        }

        Ok(Self {
            lines,
            trailing_newline,
            deps,
        })
    }

    /// Direct dependencies in declaration order.
    pub fn deps(&self) -> &[GemDecl] {
        &self.deps
    }

    pub fn dep(&self, name: &str) -> Option<&GemDecl> {
        self.deps.iter().find(|d| d.name == name)
    }

    /// Rewrites the declaration lines of the named gems with a single
    /// replacement requirement each, leaving every other line byte-identical.
    pub fn apply_changes(&self, changes: &BTreeMap<String, String>) -> Result<String> {
        let mut lines = self.lines.clone();
        for (name, requirement) in changes {
            let decl = self
                .dep(name)
                .with_context(|| format!("gem {:?} not declared in Gemfile", name))?;
            let mut rebuilt = format!("{}gem \"{}\", \"{}\"", decl.indent, decl.name, requirement);
            for opt in &decl.options {
                rebuilt.push_str(", ");
                rebuilt.push_str(opt);
            }
            lines[decl.line] = rebuilt;
        }
        let mut out = lines.join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        Ok(out)
    }
}

fn current_groups(blocks: &[Option<Vec<String>>]) -> Vec<String> {
    let mut groups: Vec<String> = blocks
        .iter()
        .flatten()
        .flat_map(|labels| labels.iter().cloned())
        .collect();
    if groups.is_empty() {
        groups.push("default".to_string());
    }
    groups.sort();
    groups.dedup();
    groups
}

fn parse_gem_args(rest: &str, line: usize, indent: String, groups: Vec<String>) -> Result<GemDecl> {
    let args = split_args(rest);
    let Some(first) = args.first() else {
        bail!("gem declaration without arguments");
    };
    let Some(name) = unquote(first) else {
        bail!("gem name is not a string literal");
    };

    let mut requirements = Vec::new();
    let mut options = Vec::new();
    for arg in &args[1..] {
        match unquote(arg) {
            Some(req) if options.is_empty() => requirements.push(req.to_string()),
            _ => options.push(arg.trim().to_string()),
        }
    }

    let constraint = Constraint::parse(&requirements.join(", "))
        .with_context(|| format!("parse requirement for gem {:?}", name))?;

    Ok(GemDecl {
        name: name.to_string(),
        requirements,
        constraint,
        groups,
        line,
        indent,
        options,
    })
}

/// Splits on commas that are not inside string literals.
fn split_args(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth_quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in s.char_indices() {
        match depth_quote {
            Some(q) if ch == q => depth_quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => depth_quote = Some(ch),
            None if ch == ',' => {
                out.push(s[start..i].trim());
                start = i + 1;
            }
            None => {}
        }
    }
    let tail = s[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

fn unquote(s: &str) -> Option<&str> {
    let s = s.trim();
    for q in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return Some(&s[1..s.len() - 1]);
        }
    }
    None
}

fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    for (i, ch) in line.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == '#' => return &line[..i],
            None => {}
        }
    }
    line
}

#[cfg(test)]
#[path = "tests/gemfile_tests.rs"]
mod tests;
