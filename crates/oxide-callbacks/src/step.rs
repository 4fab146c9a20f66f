//! Step definitions: named actions with ordering constraints.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use thiserror::Error;

use crate::config::Config;
use crate::statement::Statement;

/// The unit of work a step runs. Actions return nothing; they read and write
/// the statement, recording failures with [`Statement::add_error`].
pub type Action = Arc<dyn Fn(&mut Statement<'_>) + Send + Sync>;

/// Compile-time predicate deciding whether a step joins the pipeline.
pub type Condition = Arc<dyn Fn(&Config) -> bool + Send + Sync>;

/// The target of a `before`/`after` constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// `*`: before every step, or after every step.
    All,
    /// A step name.
    Step(String),
}

impl Anchor {
    /// Parses an anchor; `*` is the wildcard.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s == "*" {
            Self::All
        } else {
            Self::Step(s.to_string())
        }
    }

    /// Returns the step name, unless this is the wildcard.
    #[must_use]
    pub fn step_name(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Step(name) => Some(name),
        }
    }
}

impl From<&str> for Anchor {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for Anchor {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "*"),
            Self::Step(name) => write!(f, "{name}"),
        }
    }
}

/// An ordering constraint as declared on a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Run before the anchor.
    Before(Anchor),
    /// Run after the anchor.
    After(Anchor),
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before(anchor) => write!(f, "before `{anchor}`"),
            Self::After(anchor) => write!(f, "after `{anchor}`"),
        }
    }
}

/// A constraint that cannot be satisfied together with the others.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("conflicting step `{step}`: cannot run {constraint}")]
pub struct Conflict {
    /// The step declaring the unsatisfiable constraint.
    pub step: String,
    /// The constraint itself.
    pub constraint: Constraint,
}

/// Warning for a step registered under a name that is already live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateStep {
    /// The shared name.
    pub name: String,
    /// Where the later registration was made.
    pub location: &'static Location<'static>,
}

impl fmt::Display for DuplicateStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "duplicated step `{}` from {}", self.name, self.location)
    }
}

/// One registry entry.
///
/// Entries are never edited after registration. Removal appends a tombstone
/// entry, replacement appends a `replacing` entry.
#[derive(Clone)]
pub struct Step {
    pub(crate) name: String,
    pub(crate) before: Option<Anchor>,
    pub(crate) after: Option<Anchor>,
    pub(crate) condition: Option<Condition>,
    pub(crate) action: Option<Action>,
    pub(crate) tombstoned: bool,
    pub(crate) replacing: bool,
    pub(crate) location: &'static Location<'static>,
}

impl Step {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn before(&self) -> Option<&Anchor> {
        self.before.as_ref()
    }

    pub fn after(&self) -> Option<&Anchor> {
        self.after.as_ref()
    }

    pub fn is_conditional(&self) -> bool {
        self.condition.is_some()
    }

    pub fn is_tombstoned(&self) -> bool {
        self.tombstoned
    }

    pub fn is_replacing(&self) -> bool {
        self.replacing
    }

    /// Source location of the registering call.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    pub(crate) const fn has_constraints(&self) -> bool {
        self.before.is_some() || self.after.is_some()
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("before", &self.before)
            .field("after", &self.after)
            .field("conditional", &self.condition.is_some())
            .field("tombstoned", &self.tombstoned)
            .field("replacing", &self.replacing)
            .field("location", &format_args!("{}", self.location))
            .finish()
    }
}
