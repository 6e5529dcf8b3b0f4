//! Condition results and failure traces.
//!
//! A [`ConditionResult`] is a boolean with an optional explanation. The
//! explanation is only built when evaluation runs with [`TraceMode::On`];
//! untraced failures are the allocation-free `Failure(None)`.

use std::fmt::{self, Write as _};

use autarch_foundation::StationId;

// =============================================================================
// Trace Mode
// =============================================================================

/// Whether evaluation should build failure explanations.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TraceMode {
    /// Return bare results; results may come from the cache.
    #[default]
    Off,
    /// Build explanations and bypass the cache.
    On,
}

impl TraceMode {
    /// Returns true when tracing.
    #[must_use]
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

// =============================================================================
// Failure Reasons
// =============================================================================

/// How a compound condition combined its children.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CompoundMode {
    /// Every child had to hold.
    All,
    /// At least one child had to hold.
    Any,
}

/// Structured explanation of why a condition did not hold.
#[derive(Clone, Debug, PartialEq)]
pub enum FailureReason {
    /// Free-form explanation.
    Message(String),
    /// A compound condition failed; `failures` lists the failing children.
    Compound {
        /// All or any.
        mode: CompoundMode,
        /// Failures of the evaluated children, in evaluation order.
        failures: Vec<FailureReason>,
    },
    /// A reason with an extra line of context.
    Addended {
        /// The underlying reason.
        reason: Box<FailureReason>,
        /// Context added by the enclosing condition.
        addendum: String,
    },
    /// No entity satisfied a selector.
    EntityChoice {
        /// Description of the selector.
        selector: String,
        /// What was missing.
        detail: String,
    },
    /// A station was not in the required state.
    StationState {
        /// The station.
        station: StationId,
        /// What did not match.
        detail: String,
    },
    /// A memory counter failed its comparison.
    Memory {
        /// Memory name.
        memory: String,
        /// What did not match.
        detail: String,
    },
}

impl FailureReason {
    /// Creates a free-form reason.
    #[must_use]
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message(text.into())
    }

    /// Wraps this reason with an extra line of context.
    #[must_use]
    pub fn addend(self, addendum: impl Into<String>) -> Self {
        Self::Addended {
            reason: Box::new(self),
            addendum: addendum.into(),
        }
    }

    /// Number of nodes in this tree, including itself.
    #[must_use]
    pub fn node_count(&self) -> usize {
        match self {
            Self::Compound { failures, .. } => {
                1 + failures.iter().map(Self::node_count).sum::<usize>()
            }
            Self::Addended { reason, .. } => 1 + reason.node_count(),
            _ => 1,
        }
    }

    /// Renders the tree as indented text, one node per line.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        // Writing to a String cannot fail.
        let _ = match self {
            Self::Message(text) => writeln!(out, "{indent}{text}"),
            Self::Compound { mode, failures } => {
                let label = match mode {
                    CompoundMode::All => "not all conditions held",
                    CompoundMode::Any => "no alternative held",
                };
                let result = writeln!(out, "{indent}{label}:");
                for failure in failures {
                    failure.render_into(out, depth + 1);
                }
                result
            }
            Self::Addended { reason, addendum } => {
                let result = writeln!(out, "{indent}{addendum}:");
                reason.render_into(out, depth + 1);
                result
            }
            Self::EntityChoice { selector, detail } => {
                writeln!(out, "{indent}no entity for {selector}: {detail}")
            }
            Self::StationState { station, detail } => {
                writeln!(out, "{indent}station {station}: {detail}")
            }
            Self::Memory { memory, detail } => {
                writeln!(out, "{indent}memory {memory}: {detail}")
            }
        };
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.render().trim_end())
    }
}

// =============================================================================
// Condition Result
// =============================================================================

/// Outcome of evaluating a condition.
#[derive(Clone, Debug, PartialEq)]
pub enum ConditionResult {
    /// The condition holds.
    Success,
    /// The condition does not hold; the reason is present only when traced.
    Failure(Option<Box<FailureReason>>),
}

impl ConditionResult {
    /// Shared untraced failure.
    pub const FAILURE: Self = Self::Failure(None);

    /// Creates a result from a bare boolean.
    #[must_use]
    pub fn from_bool(met: bool) -> Self {
        if met { Self::Success } else { Self::FAILURE }
    }

    /// Creates a failure, building the reason only when tracing.
    #[must_use]
    pub fn failure(trace: TraceMode, reason: impl FnOnce() -> FailureReason) -> Self {
        if trace.is_on() {
            Self::Failure(Some(Box::new(reason())))
        } else {
            Self::FAILURE
        }
    }

    /// Returns true if the condition holds.
    #[must_use]
    pub fn is_met(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// The failure reason, if traced.
    #[must_use]
    pub fn reason(&self) -> Option<&FailureReason> {
        match self {
            Self::Failure(Some(reason)) => Some(reason),
            _ => None,
        }
    }

    /// Consumes the result and returns the failure reason, if traced.
    #[must_use]
    pub fn into_reason(self) -> Option<FailureReason> {
        match self {
            Self::Failure(Some(reason)) => Some(*reason),
            _ => None,
        }
    }

    /// Adds a line of context to a traced failure. Success and untraced
    /// failures are returned unchanged.
    #[must_use]
    pub fn addend(self, addendum: impl FnOnce() -> String) -> Self {
        match self {
            Self::Failure(Some(reason)) => Self::Failure(Some(Box::new(reason.addend(addendum())))),
            other => other,
        }
    }
}

impl From<bool> for ConditionResult {
    fn from(met: bool) -> Self {
        Self::from_bool(met)
    }
}
