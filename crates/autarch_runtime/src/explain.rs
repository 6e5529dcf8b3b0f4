//! Offline explanation of rule decisions.
//!
//! Evaluates every rule of a rule set against one snapshot with tracing on
//! and nothing reserved, reporting why each rule could or could not start.

use std::fmt;

use autarch_engine::{
    ConditionEngine, EvalContext, FailureReason, Goal, GoalStatus, HeldResources, TraceMode,
};
use autarch_foundation::GameStateSnapshot;

/// Why one rule would or would not start.
#[derive(Clone, Debug, PartialEq)]
pub struct RuleExplanation {
    /// Owning goal.
    pub goal: String,
    /// Status of the owning goal.
    pub goal_status: GoalStatus,
    /// Rule name.
    pub rule: String,
    /// Whether the rule is admissible on its own.
    pub admissible: bool,
    /// Rendered failure explanation, if not admissible.
    pub trace: Option<String>,
}

impl fmt::Display for RuleExplanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.admissible { "would start" } else { "blocked" };
        writeln!(
            f,
            "{}/{} [goal {:?}]: {verdict}",
            self.goal, self.rule, self.goal_status
        )?;
        if let Some(trace) = &self.trace {
            for line in trace.lines() {
                writeln!(f, "    {line}")?;
            }
        }
        Ok(())
    }
}

/// Explains every rule, goals in declaration order and rules by priority.
#[must_use]
pub fn explain(goals: &[Goal], snapshot: &GameStateSnapshot) -> Vec<RuleExplanation> {
    let mut engine = ConditionEngine::new();
    engine.observe(snapshot.version());
    let held = HeldResources::none();
    let ctx = EvalContext::new(snapshot, &held).with_trace(TraceMode::On);

    let mut explanations = Vec::new();
    for goal in goals {
        let goal_status = goal.status(&mut engine, &ctx);
        for rule in &goal.rules {
            let admission = rule.admission(&mut engine, &ctx);
            explanations.push(RuleExplanation {
                goal: goal.name.clone(),
                goal_status,
                rule: rule.name.clone(),
                admissible: admission.is_met(),
                trace: admission.reason().map(FailureReason::render),
            });
        }
    }
    explanations
}
