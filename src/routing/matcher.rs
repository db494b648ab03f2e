//! Route matching logic.
//!
//! # Responsibilities
//! - Decide whether a resource name matches a template under a mode
//! - Report how many leading elements matched and which variables bound
//! - Rank competing matches for the router
//!
//! # Design Decisions
//! - Literal segments compare ASCII case-insensitively, like names do
//! - A `{name}` segment matches exactly one element, never zero
//! - Ranking is a total preorder: consumption, then literals, then mode

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ResourceResult;
use crate::name::ResourceName;
use crate::routing::template::{RouteTemplate, Segment};

/// How a template is compared with a resource name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteMode {
    /// The whole name must match the template.
    Equals,
    /// The template must match a prefix; the rest is forwarded.
    StartsWith,
}

impl RouteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMode::Equals => "equals",
            RouteMode::StartsWith => "starts_with",
        }
    }
}

impl std::fmt::Display for RouteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// Leading elements of the name covered by the template.
    pub consumed: usize,
    pub variables: BTreeMap<String, String>,
}

/// A template together with its matching mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatcher {
    mode: RouteMode,
    template: RouteTemplate,
}

impl RouteMatcher {
    pub fn new(mode: RouteMode, template: RouteTemplate) -> Self {
        Self { mode, template }
    }

    pub fn parse(mode: RouteMode, pattern: &str) -> ResourceResult<Self> {
        Ok(Self::new(mode, RouteTemplate::parse(pattern)?))
    }

    pub fn mode(&self) -> RouteMode {
        self.mode
    }

    pub fn template(&self) -> &RouteTemplate {
        &self.template
    }

    /// Match `name` and collect template variables, or `None`.
    pub fn matches(&self, name: &ResourceName) -> Option<RouteMatch> {
        let wanted = self.template.len();
        let fits = match self.mode {
            RouteMode::Equals => name.size() == wanted,
            RouteMode::StartsWith => name.size() >= wanted,
        };
        if !fits {
            return None;
        }

        let mut variables = BTreeMap::new();
        for (segment, element) in self.template.segments().iter().zip(name.iter()) {
            if !segment.accepts(element) {
                return None;
            }
            if let Segment::Variable(variable) = segment {
                variables.insert(variable.clone(), element.clone());
            }
        }
        Some(RouteMatch {
            consumed: wanted,
            variables,
        })
    }

    /// Rank two matches of the same name. `Greater` means `self` is the
    /// better route; `Equal` means nothing separates them.
    pub fn rank(&self, mine: &RouteMatch, other: &RouteMatcher, theirs: &RouteMatch) -> Ordering {
        mine.consumed
            .cmp(&theirs.consumed)
            .then_with(|| {
                self.template
                    .segments()
                    .iter()
                    .zip(other.template.segments())
                    .map(|(a, b)| a.is_literal().cmp(&b.is_literal()))
                    .find(|o| o.is_ne())
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| mode_rank(self.mode).cmp(&mode_rank(other.mode)))
    }
}

fn mode_rank(mode: RouteMode) -> u8 {
    match mode {
        RouteMode::Equals => 1,
        RouteMode::StartsWith => 0,
    }
}
