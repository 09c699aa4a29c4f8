//! Field path parsing.
//!
//! A field path addresses a location inside a request document. Three forms
//! are accepted:
//!
//! - `A.B.C` plain dotted field access
//! - `A.B[key]` a single map entry, always the last step
//! - `A[0]B.C` the first element of a list of structs, followed by a
//!   field path inside that element
//!
//! Paths are parsed once, when a mapping is registered, and carried around as
//! a [`FieldPath`] afterwards.

use super::error::{MappingError, MappingResult};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref IDENT: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// One step of a parsed field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Field(String),
    MapKey(String),
    SliceIndex(usize),
}

/// A parsed field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    steps: Vec<PathStep>,
}

impl FieldPath {
    pub fn parse(raw: &str) -> MappingResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MappingError::invalid_path(raw, "path is empty"));
        }

        let open_count = trimmed.matches('[').count();
        let close_count = trimmed.matches(']').count();
        if open_count != close_count {
            return Err(MappingError::invalid_path(raw, "unbalanced brackets"));
        }
        if open_count > 1 {
            return Err(MappingError::invalid_path(
                raw,
                "only a single index step is supported",
            ));
        }

        let mut steps = Vec::new();

        let Some(open) = trimmed.find('[') else {
            push_fields(raw, trimmed, &mut steps)?;
            return Ok(Self {
                raw: trimmed.to_string(),
                steps,
            });
        };

        let close = trimmed
            .find(']')
            .filter(|close| *close > open)
            .ok_or_else(|| MappingError::invalid_path(raw, "unbalanced brackets"))?;

        let prefix = &trimmed[..open];
        let inside = &trimmed[open + 1..close];
        let suffix = &trimmed[close + 1..];

        if prefix.is_empty() {
            return Err(MappingError::invalid_path(raw, "index step needs a field name"));
        }
        if inside.is_empty() {
            return Err(MappingError::invalid_path(raw, "empty index"));
        }
        push_fields(raw, prefix, &mut steps)?;

        if suffix.is_empty() {
            steps.push(PathStep::MapKey(inside.to_string()));
        } else {
            if inside != "0" {
                return Err(MappingError::invalid_path(
                    raw,
                    format!("list index must be 0, got '{}'", inside),
                ));
            }
            steps.push(PathStep::SliceIndex(0));
            push_fields(raw, suffix.strip_prefix('.').unwrap_or(suffix), &mut steps)?;
        }

        Ok(Self {
            raw: trimmed.to_string(),
            steps,
        })
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parse a comma-separated list of paths
    pub fn parse_list(raw: &str) -> MappingResult<Vec<FieldPath>> {
        let paths = raw
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(FieldPath::parse)
            .collect::<MappingResult<Vec<_>>>()?;

        if paths.is_empty() {
            return Err(MappingError::invalid_path(raw, "no destination path given"));
        }

        Ok(paths)
    }
}

fn push_fields(raw: &str, dotted: &str, steps: &mut Vec<PathStep>) -> MappingResult<()> {
    for segment in dotted.split('.') {
        if !IDENT.is_match(segment) {
            return Err(MappingError::invalid_path(
                raw,
                format!("'{}' is not a valid field name", segment),
            ));
        }
        steps.push(PathStep::Field(segment.to_string()));
    }
    Ok(())
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for FieldPath {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldPath::parse(s)
    }
}
