//! Route patterns with `{name}` placeholder segments.

use std::collections::HashSet;
use std::fmt;

use crate::error::{ResourceError, ResourceResult};
use crate::name::resource_name::compare_element;
use crate::name::ResourceName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Variable(String),
}

impl Segment {
    pub fn is_literal(&self) -> bool {
        matches!(self, Segment::Literal(_))
    }

    /// Whether this segment accepts `element`. Literals compare case-insensitively.
    pub fn accepts(&self, element: &str) -> bool {
        match self {
            Segment::Literal(literal) => compare_element(literal, element).is_eq(),
            Segment::Variable(_) => true,
        }
    }
}

/// A parsed route pattern such as `users/{userId}/devices`.
#[derive(Debug, Clone)]
pub struct RouteTemplate {
    name: ResourceName,
    segments: Vec<Segment>,
}

impl RouteTemplate {
    /// Parse a pattern. Each `{name}` segment must fill a whole element and
    /// variable names must be unique within the pattern.
    pub fn parse(pattern: &str) -> ResourceResult<Self> {
        let name = ResourceName::parse(pattern)?;
        let mut seen = HashSet::new();
        let mut segments = Vec::with_capacity(name.size());

        for element in &name {
            let segment = match element.strip_prefix('{').and_then(|e| e.strip_suffix('}')) {
                Some(variable) => {
                    if variable.is_empty() || variable.contains(['{', '}']) {
                        return Err(malformed(pattern, "empty or nested variable name"));
                    }
                    if !seen.insert(variable.to_string()) {
                        return Err(malformed(
                            pattern,
                            &format!("variable '{}' bound twice", variable),
                        ));
                    }
                    Segment::Variable(variable.to_string())
                }
                None if element.contains(['{', '}']) => {
                    return Err(malformed(
                        pattern,
                        "a variable must occupy a whole segment",
                    ));
                }
                None => Segment::Literal(element.clone()),
            };
            segments.push(segment);
        }

        Ok(Self { name, segments })
    }

    /// The template with no segments. Under `StartsWith` it matches every name.
    pub fn empty() -> Self {
        Self {
            name: ResourceName::empty(),
            segments: Vec::new(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The pattern as a resource name, used for canonical comparison.
    pub fn as_name(&self) -> &ResourceName {
        &self.name
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Variable(v) => Some(v.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

impl PartialEq for RouteTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for RouteTemplate {}

impl fmt::Display for RouteTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            match segment {
                Segment::Literal(literal) => write!(f, "{}", crate::name::url_encode(literal, false))?,
                Segment::Variable(variable) => write!(f, "{{{}}}", variable)?,
            }
        }
        Ok(())
    }
}

fn malformed(pattern: &str, reason: &str) -> ResourceError {
    ResourceError::MalformedName(format!("route pattern '{}': {}", pattern, reason))
}
