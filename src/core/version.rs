//! Version constraint evaluation.
//!
//! Constraints follow the dialect subsystems publish in their catalogs:
//! `*`, exact versions (`1.2.3`), partial versions (`1.2` is `1.2.*`), wildcards (`1.*`, `1.2.x`), caret (`^1.5`),
//! tilde (`~1.1.0`), comparisons (`>=1.0`, `<2`, `!=1.3.0`), AND via whitespace or
//! commas and OR via `||`.

use crate::domain::model::ModuleVersion;
use crate::utils::error::{HubError, Result};
use semver::Version;
use std::cmp::Reverse;
use std::str::FromStr;

/// Returns whether `version` satisfies `constraint`.
pub fn satisfies(version: &str, constraint: &str) -> Result<bool> {
    let constraint: Constraint = constraint.parse()?;
    let version = parse_version(version)?;
    Ok(constraint.matches(&version))
}

/// Parses a concrete version. Missing minor/patch components count as zero, a leading
/// `v` is ignored and build metadata is dropped.
pub fn parse_version(input: &str) -> Result<Version> {
    let invalid = |reason: &str| HubError::InvalidVersion {
        version: input.to_string(),
        reason: reason.to_string(),
    };

    let partial = PartialVersion::parse(input).map_err(|reason| invalid(&reason))?;
    if partial.wildcard {
        return Err(invalid("wildcards are only allowed in constraints"));
    }
    Ok(partial.floor())
}

/// Sorts versions newest first. Unparseable versions go last in their original order.
pub fn sort_descending(versions: &mut [ModuleVersion]) {
    versions.sort_by_cached_key(|v| Reverse(parse_version(&v.version).ok()));
}

/// A parsed constraint: OR of AND-groups of comparators.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    groups: Vec<Vec<Comparator>>,
}

#[derive(Debug, Clone, PartialEq)]
enum Comparator {
    Any,
    Exact(Version),
    NotEqual(Version),
    Greater(Version),
    GreaterOrEqual(Version),
    Less(Version),
    LessOrEqual(Version),
    /// `min <= v < max`
    Range { min: Version, max: Version },
}

impl Comparator {
    fn matches(&self, v: &Version) -> bool {
        match self {
            Comparator::Any => true,
            Comparator::Exact(x) => v == x,
            Comparator::NotEqual(x) => v != x,
            Comparator::Greater(x) => v > x,
            Comparator::GreaterOrEqual(x) => v >= x,
            Comparator::Less(x) => v < x,
            Comparator::LessOrEqual(x) => v <= x,
            Comparator::Range { min, max } => v >= min && v < max,
        }
    }
}

impl Constraint {
    pub fn parse(input: &str) -> Result<Self> {
        let malformed = |reason: String| HubError::MalformedConstraint {
            constraint: input.to_string(),
            reason,
        };

        let mut groups = Vec::new();
        for group in input.split("||") {
            let mut comparators = Vec::new();
            for term in tokenize(group) {
                comparators.push(parse_term(&term).map_err(malformed)?);
            }
            if comparators.is_empty() {
                if input.trim().is_empty() {
                    comparators.push(Comparator::Any);
                } else {
                    return Err(malformed("empty alternative".to_string()));
                }
            }
            groups.push(comparators);
        }

        Ok(Self { groups })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.groups
            .iter()
            .any(|group| group.iter().all(|c| c.matches(version)))
    }
}

impl FromStr for Constraint {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self> {
        Constraint::parse(s)
    }
}

const OPERATORS: [&str; 6] = [">=", "<=", "!=", ">", "<", "="];

// Splits an AND group into terms, gluing a bare operator to the version after it.
fn tokenize(group: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    let mut pending_operator: Option<String> = None;

    for token in group
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        if OPERATORS.contains(&token) || token == "^" || token == "~" {
            pending_operator = Some(token.to_string());
            continue;
        }
        match pending_operator.take() {
            Some(op) => terms.push(format!("{}{}", op, token)),
            None => terms.push(token.to_string()),
        }
    }
    if let Some(op) = pending_operator {
        // dangling operator, let parse_term report it
        terms.push(op);
    }
    terms
}

fn parse_term(term: &str) -> std::result::Result<Comparator, String> {
    if term == "*" || term.eq_ignore_ascii_case("x") {
        return Ok(Comparator::Any);
    }
    if let Some(rest) = term.strip_prefix('^') {
        return caret(&PartialVersion::parse(rest)?);
    }
    if let Some(rest) = term.strip_prefix('~') {
        return tilde(&PartialVersion::parse(rest)?);
    }
    for op in OPERATORS {
        if let Some(rest) = term.strip_prefix(op) {
            let partial = PartialVersion::parse(rest)?;
            if partial.wildcard {
                return Err(format!("wildcard not allowed after '{}'", op));
            }
            let v = partial.floor();
            return Ok(match op {
                ">=" => Comparator::GreaterOrEqual(v),
                "<=" => Comparator::LessOrEqual(v),
                "!=" => Comparator::NotEqual(v),
                ">" => Comparator::Greater(v),
                "<" => Comparator::Less(v),
                _ => Comparator::Exact(v),
            });
        }
    }

    // a bare partial version leaves its missing components open: `1.9` is `1.9.*`
    let partial = PartialVersion::parse(term)?;
    if partial.wildcard || partial.patch.is_none() {
        wildcard(&partial)
    } else {
        Ok(Comparator::Exact(partial.floor()))
    }
}

fn bump(component: u64) -> std::result::Result<u64, String> {
    component
        .checked_add(1)
        .ok_or_else(|| format!("version component {} is too large", component))
}

// ^1.5 -> >=1.5.0 <2.0.0; ^0.3 -> >=0.3.0 <0.4.0; ^0.0.3 -> >=0.0.3 <0.0.4
fn caret(p: &PartialVersion) -> std::result::Result<Comparator, String> {
    if p.wildcard {
        return wildcard(p);
    }
    let min = p.floor();
    let max = match (p.major, p.minor, p.patch) {
        (major, _, _) if major > 0 => Version::new(bump(major)?, 0, 0),
        (0, Some(minor), _) if minor > 0 => Version::new(0, bump(minor)?, 0),
        (0, Some(0), Some(patch)) => Version::new(0, 0, bump(patch)?),
        (0, Some(0), None) => Version::new(0, 1, 0),
        _ => Version::new(1, 0, 0),
    };
    Ok(Comparator::Range { min, max })
}

// ~1.1.0 -> >=1.1.0 <1.2.0; with fewer components it behaves like caret
fn tilde(p: &PartialVersion) -> std::result::Result<Comparator, String> {
    if p.wildcard {
        return wildcard(p);
    }
    match (p.minor, p.patch) {
        (Some(minor), Some(_)) => Ok(Comparator::Range {
            min: p.floor(),
            max: Version::new(p.major, bump(minor)?, 0),
        }),
        _ => caret(p),
    }
}

// 1.* -> >=1.0.0 <2.0.0; 1.2.* -> >=1.2.0 <1.3.0
fn wildcard(p: &PartialVersion) -> std::result::Result<Comparator, String> {
    let min = p.floor();
    let max = match p.minor {
        Some(minor) => Version::new(p.major, bump(minor)?, 0),
        None => Version::new(bump(p.major)?, 0, 0),
    };
    Ok(Comparator::Range { min, max })
}

/// Version with optional trailing components, as written in constraints.
#[derive(Debug)]
struct PartialVersion {
    major: u64,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: Option<String>,
    wildcard: bool,
}

impl PartialVersion {
    fn parse(input: &str) -> std::result::Result<Self, String> {
        let trimmed = input.trim();
        let trimmed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err("missing version".to_string());
        }

        // build metadata carries no precedence
        let without_build = trimmed.split('+').next().unwrap_or(trimmed);
        let (core, pre) = match without_build.split_once('-') {
            Some((core, pre)) if !pre.is_empty() => (core, Some(pre.to_string())),
            Some(_) => return Err("empty pre-release label".to_string()),
            None => (without_build, None),
        };

        let mut numbers: Vec<u64> = Vec::new();
        let mut wildcard = false;
        for (index, component) in core.split('.').enumerate() {
            if index > 2 {
                return Err("more than three version components".to_string());
            }
            if component == "*" || component.eq_ignore_ascii_case("x") {
                wildcard = true;
                continue;
            }
            if wildcard {
                return Err("numeric component after a wildcard".to_string());
            }
            if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
                return Err(format!("'{}' is not a numeric version component", component));
            }
            let value = component
                .parse::<u64>()
                .map_err(|e| format!("component '{}': {}", component, e))?;
            numbers.push(value);
        }

        if numbers.is_empty() {
            return Err("a major version is required".to_string());
        }
        if wildcard && pre.is_some() {
            return Err("pre-release label on a wildcard version".to_string());
        }

        Ok(Self {
            major: numbers[0],
            minor: numbers.get(1).copied(),
            patch: numbers.get(2).copied(),
            pre,
            wildcard,
        })
    }

    /// Lowest concrete version this partial version denotes.
    fn floor(&self) -> Version {
        let mut v = Version::new(self.major, self.minor.unwrap_or(0), self.patch.unwrap_or(0));
        if let Some(pre) = &self.pre {
            // label syntax was checked when parsing; anything semver still refuses is dropped
            v.pre = semver::Prerelease::new(pre).unwrap_or(semver::Prerelease::EMPTY);
        }
        v
    }
}
