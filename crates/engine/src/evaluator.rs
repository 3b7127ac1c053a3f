//! Step tree walker.
//!
//! [`StepEngine`] implements the control flow of a rule tree: sequencing,
//! condition branching, early return and debug tracing. What an action
//! *does* and how a condition expression is decided are supplied by the
//! embedding application through [`ActionSet`] and [`ConditionEvaluator`].

use icalendar::Calendar;

use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::model::{FlowStep, LogicalOperator};

/// Outcome of evaluating a step sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalSignal {
    /// All steps ran to completion.
    Completed,
    /// A return step terminated evaluation early with this value.
    Returned(bool),
}

/// Evaluates a step sequence against a calendar, mutating it in place.
pub trait Engine: Send + Sync {
    fn evaluate(
        &self,
        ctx: &mut ExecutionContext,
        steps: &[FlowStep],
        calendar: &mut Calendar,
    ) -> Result<EvalSignal, EngineError>;
}

/// Dispatches named actions against the calendar.
pub trait ActionSet: Send + Sync {
    fn run(
        &self,
        identifier: &str,
        ctx: &mut ExecutionContext,
        calendar: &mut Calendar,
    ) -> Result<(), EngineError>;
}

/// Decides a single condition expression.
pub trait ConditionEvaluator: Send + Sync {
    fn matches(
        &self,
        expression: &serde_json::Value,
        ctx: &ExecutionContext,
        calendar: &Calendar,
    ) -> Result<bool, EngineError>;
}

/// Action set with nothing registered; every dispatch fails.
pub struct NoActions;

impl ActionSet for NoActions {
    fn run(
        &self,
        identifier: &str,
        _ctx: &mut ExecutionContext,
        _calendar: &mut Calendar,
    ) -> Result<(), EngineError> {
        Err(EngineError::UnknownAction(identifier.to_string()))
    }
}

/// Condition evaluator that rejects every expression.
pub struct NoConditions;

impl ConditionEvaluator for NoConditions {
    fn matches(
        &self,
        _expression: &serde_json::Value,
        _ctx: &ExecutionContext,
        _calendar: &Calendar,
    ) -> Result<bool, EngineError> {
        Err(EngineError::ConditionsUnsupported)
    }
}

/// The default step engine.
pub struct StepEngine {
    actions: Box<dyn ActionSet>,
    conditions: Box<dyn ConditionEvaluator>,
}

impl StepEngine {
    pub fn new(actions: Box<dyn ActionSet>, conditions: Box<dyn ConditionEvaluator>) -> Self {
        Self {
            actions,
            conditions,
        }
    }

    fn condition_matches(
        &self,
        ctx: &ExecutionContext,
        expressions: &[serde_json::Value],
        operator: LogicalOperator,
        calendar: &Calendar,
    ) -> Result<bool, EngineError> {
        match operator {
            LogicalOperator::And => {
                for expr in expressions {
                    if !self.conditions.matches(expr, ctx, calendar)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            LogicalOperator::Or => {
                for expr in expressions {
                    if self.conditions.matches(expr, ctx, calendar)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

impl Default for StepEngine {
    fn default() -> Self {
        Self::new(Box::new(NoActions), Box::new(NoConditions))
    }
}

impl Engine for StepEngine {
    fn evaluate(
        &self,
        ctx: &mut ExecutionContext,
        steps: &[FlowStep],
        calendar: &mut Calendar,
    ) -> Result<EvalSignal, EngineError> {
        for step in steps {
            match step {
                FlowStep::Debug { message } => {
                    ctx.trace(message.clone());
                }
                FlowStep::Return { value } => {
                    ctx.trace_verbose(format!("return {value}"));
                    return Ok(EvalSignal::Returned(*value));
                }
                FlowStep::Action { identifier } => {
                    ctx.trace_verbose(format!("action {identifier}"));
                    self.actions.run(identifier, ctx, calendar)?;
                }
                FlowStep::Condition {
                    expressions,
                    operator,
                    then_branch,
                    else_branch,
                } => {
                    let matched =
                        self.condition_matches(ctx, expressions, *operator, calendar)?;
                    ctx.trace_verbose(format!(
                        "condition {} -> {} branch",
                        if matched { "matched" } else { "did not match" },
                        if matched { "then" } else { "else" },
                    ));
                    let branch = if matched { then_branch } else { else_branch };
                    // A return inside a branch terminates the whole run.
                    if let EvalSignal::Returned(value) = self.evaluate(ctx, branch, calendar)? {
                        return Ok(EvalSignal::Returned(value));
                    }
                }
            }
        }
        Ok(EvalSignal::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Profile;
    use icalendar::{Calendar, Component, Event, EventLike};
    use std::time::Duration;

    fn ctx(debug: bool, verbose: bool) -> ExecutionContext {
        ExecutionContext::new(
            Profile {
                name: "test".to_string(),
                source: "https://example.com/cal.ics".to_string(),
                cache_duration: Duration::from_secs(120),
            },
            debug,
            verbose,
        )
    }

    fn debug_step(message: &str) -> FlowStep {
        FlowStep::Debug {
            message: message.to_string(),
        }
    }

    /// Actions that append an event to the calendar, keyed by identifier.
    struct AppendAction;

    impl ActionSet for AppendAction {
        fn run(
            &self,
            identifier: &str,
            _ctx: &mut ExecutionContext,
            calendar: &mut Calendar,
        ) -> Result<(), EngineError> {
            match identifier {
                "append-event" => {
                    calendar.push(Event::new().summary("appended").done());
                    Ok(())
                }
                other => Err(EngineError::UnknownAction(other.to_string())),
            }
        }
    }

    /// Treats the expression as a literal boolean.
    struct LiteralConditions;

    impl ConditionEvaluator for LiteralConditions {
        fn matches(
            &self,
            expression: &serde_json::Value,
            _ctx: &ExecutionContext,
            _calendar: &Calendar,
        ) -> Result<bool, EngineError> {
            expression
                .as_bool()
                .ok_or_else(|| EngineError::Condition("expected boolean literal".to_string()))
        }
    }

    fn engine() -> StepEngine {
        StepEngine::new(Box::new(AppendAction), Box::new(LiteralConditions))
    }

    #[test]
    fn test_debug_steps_collect_in_order() {
        let mut ctx = ctx(true, false);
        let mut cal = Calendar::new();
        let steps = vec![debug_step("one"), debug_step("two"), debug_step("three")];

        let signal = engine().evaluate(&mut ctx, &steps, &mut cal).unwrap();
        assert_eq!(signal, EvalSignal::Completed);
        assert_eq!(ctx.debugs, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_return_stops_evaluation() {
        let mut ctx = ctx(true, false);
        let mut cal = Calendar::new();
        let steps = vec![
            debug_step("before"),
            FlowStep::Return { value: false },
            debug_step("after"),
        ];

        let signal = engine().evaluate(&mut ctx, &steps, &mut cal).unwrap();
        assert_eq!(signal, EvalSignal::Returned(false));
        assert_eq!(ctx.debugs, vec!["before"]);
    }

    #[test]
    fn test_action_mutates_calendar() {
        let mut ctx = ctx(true, false);
        let mut cal = Calendar::new();
        let steps = vec![FlowStep::Action {
            identifier: "append-event".to_string(),
        }];

        engine().evaluate(&mut ctx, &steps, &mut cal).unwrap();
        assert_eq!(cal.components.len(), 1);
    }

    #[test]
    fn test_unknown_action_fails() {
        let mut ctx = ctx(true, false);
        let mut cal = Calendar::new();
        let steps = vec![FlowStep::Action {
            identifier: "no-such-action".to_string(),
        }];

        let err = engine().evaluate(&mut ctx, &steps, &mut cal).unwrap_err();
        assert!(matches!(err, EngineError::UnknownAction(id) if id == "no-such-action"));
    }

    #[test]
    fn test_condition_branches() {
        let mut ctx = ctx(true, false);
        let mut cal = Calendar::new();
        let steps = vec![FlowStep::Condition {
            expressions: vec![serde_json::json!(false), serde_json::json!(true)],
            operator: LogicalOperator::Or,
            then_branch: vec![debug_step("then")],
            else_branch: vec![debug_step("else")],
        }];

        engine().evaluate(&mut ctx, &steps, &mut cal).unwrap();
        assert_eq!(ctx.debugs, vec!["then"]);
    }

    #[test]
    fn test_and_requires_all_expressions() {
        let mut ctx = ctx(true, false);
        let mut cal = Calendar::new();
        let steps = vec![FlowStep::Condition {
            expressions: vec![serde_json::json!(true), serde_json::json!(false)],
            operator: LogicalOperator::And,
            then_branch: vec![debug_step("then")],
            else_branch: vec![debug_step("else")],
        }];

        engine().evaluate(&mut ctx, &steps, &mut cal).unwrap();
        assert_eq!(ctx.debugs, vec!["else"]);
    }

    #[test]
    fn test_return_inside_branch_terminates_run() {
        let mut ctx = ctx(true, false);
        let mut cal = Calendar::new();
        let steps = vec![
            FlowStep::Condition {
                expressions: vec![serde_json::json!(true)],
                operator: LogicalOperator::And,
                then_branch: vec![FlowStep::Return { value: true }],
                else_branch: vec![],
            },
            debug_step("unreachable"),
        ];

        let signal = engine().evaluate(&mut ctx, &steps, &mut cal).unwrap();
        assert_eq!(signal, EvalSignal::Returned(true));
        assert!(ctx.debugs.is_empty());
    }

    #[test]
    fn test_default_engine_rejects_actions_and_conditions() {
        let mut ctx = ctx(true, false);
        let mut cal = Calendar::new();

        let err = StepEngine::default()
            .evaluate(
                &mut ctx,
                &[FlowStep::Condition {
                    expressions: vec![serde_json::json!(true)],
                    operator: LogicalOperator::And,
                    then_branch: vec![],
                    else_branch: vec![],
                }],
                &mut cal,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::ConditionsUnsupported));
    }
}
