use std::cmp::Ordering;
use std::fmt;

use anyhow::{Result, bail};

/// A RubyGems-style version: dotted segments, where letter runs mark a
/// prerelease and sort before any number (`1.0.0.rc1 < 1.0.0`). Trailing
/// zero segments are insignificant when comparing (`1.0 == 1.0.0`).
#[derive(Clone, Debug)]
pub struct Version {
    raw: String,
    segments: Vec<Segment>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Num(u64),
    Alpha(String),
}

const ZERO: Segment = Segment::Num(0);

impl Version {
    pub fn parse(s: &str) -> Result<Self> {
        let raw = s.trim().to_string();
        if raw.is_empty() {
            bail!("empty version string");
        }

        let mut segments = Vec::new();
        for piece in raw.split('.') {
            if piece.is_empty() {
                bail!("malformed version {:?}", raw);
            }
            // Split runs of digits and runs of letters into separate segments,
            // the way RubyGems canonicalizes ("rc1" -> "rc", 1).
            let mut run = String::new();
            let mut run_is_digit = false;
            for ch in piece.chars() {
                if !ch.is_ascii_alphanumeric() {
                    bail!("unexpected character {:?} in version {:?}", ch, raw);
                }
                let is_digit = ch.is_ascii_digit();
                if !run.is_empty() && is_digit != run_is_digit {
                    segments.push(Segment::from_run(&run, run_is_digit, &raw)?);
                    run.clear();
                }
                run_is_digit = is_digit;
                run.push(ch);
            }
            segments.push(Segment::from_run(&run, run_is_digit, &raw)?);
        }

        Ok(Self { raw, segments })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_prerelease(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Alpha(_)))
    }

    /// Leading numeric segments, up to the first letter segment.
    pub fn release_segments(&self) -> Vec<u64> {
        let mut out = Vec::new();
        for seg in &self.segments {
            match seg {
                Segment::Num(n) => out.push(*n),
                Segment::Alpha(_) => break,
            }
        }
        out
    }

    /// The exclusive upper bound implied by a pessimistic requirement on this
    /// version: drop the last release segment and increment the new last one
    /// (`5.0.0 -> 5.1`, `5.0 -> 6`, `5 -> 6`).
    fn pessimistic_bound(&self) -> Version {
        let mut nums = self.release_segments();
        if nums.is_empty() {
            nums.push(0);
        }
        if nums.len() > 1 {
            nums.pop();
        }
        if let Some(last) = nums.last_mut() {
            *last += 1;
        }
        let raw = nums
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(".");
        let segments = nums.into_iter().map(Segment::Num).collect();
        Version { raw, segments }
    }
}

impl Segment {
    fn from_run(run: &str, is_digit: bool, raw: &str) -> Result<Self> {
        if is_digit {
            let n = run
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("numeric overflow in version {:?}", raw))?;
            Ok(Segment::Num(n))
        } else {
            Ok(Segment::Alpha(run.to_string()))
        }
    }
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Segment::Num(a), Segment::Num(b)) => a.cmp(b),
            (Segment::Alpha(a), Segment::Alpha(b)) => a.cmp(b),
            // Letter segments sort before numbers (prerelease ordering).
            (Segment::Alpha(_), Segment::Num(_)) => Ordering::Less,
            (Segment::Num(_), Segment::Alpha(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let a = self.segments.get(i).unwrap_or(&ZERO);
            let b = other.segments.get(i).unwrap_or(&ZERO);
            match a.cmp(b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Pessimistic,
}

/// A single version requirement, e.g. `~> 5.0.0` or `>= 1.2`.
#[derive(Clone, Debug)]
pub struct Requirement {
    op: Op,
    version: Version,
}

impl Requirement {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (op, rest) = if let Some(r) = s.strip_prefix("~>") {
            (Op::Pessimistic, r)
        } else if let Some(r) = s.strip_prefix(">=") {
            (Op::Ge, r)
        } else if let Some(r) = s.strip_prefix("<=") {
            (Op::Le, r)
        } else if let Some(r) = s.strip_prefix("!=") {
            (Op::Ne, r)
        } else if let Some(r) = s.strip_prefix('>') {
            (Op::Gt, r)
        } else if let Some(r) = s.strip_prefix('<') {
            (Op::Lt, r)
        } else if let Some(r) = s.strip_prefix('=') {
            (Op::Eq, r)
        } else {
            (Op::Eq, s)
        };
        Ok(Self {
            op,
            version: Version::parse(rest)?,
        })
    }

    pub fn satisfied_by(&self, v: &Version) -> bool {
        match self.op {
            Op::Eq => v == &self.version,
            Op::Ne => v != &self.version,
            Op::Gt => v > &self.version,
            Op::Lt => v < &self.version,
            Op::Ge => v >= &self.version,
            Op::Le => v <= &self.version,
            Op::Pessimistic => v >= &self.version && *v < self.version.pessimistic_bound(),
        }
    }
}

/// A comma-separated list of requirements, all of which must hold.
/// An empty constraint admits every version.
#[derive(Clone, Debug, Default)]
pub struct Constraint {
    raw: String,
    requirements: Vec<Requirement>,
}

impl Constraint {
    pub fn parse(s: &str) -> Result<Self> {
        let mut requirements = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            requirements.push(Requirement::parse(part)?);
        }
        Ok(Self {
            raw: s.trim().to_string(),
            requirements,
        })
    }

    pub fn any() -> Self {
        Self::default()
    }

    /// `~> v` on the full version, the replacement form written into the
    /// Gemfile under the Latest policy.
    pub fn pessimistic(v: &Version) -> Self {
        Self {
            raw: format!("~> {}", v),
            requirements: vec![Requirement {
                op: Op::Pessimistic,
                version: v.clone(),
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn satisfied_by(&self, v: &Version) -> bool {
        self.requirements.iter().all(|r| r.satisfied_by(v))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
#[path = "tests/version_tests.rs"]
mod tests;
