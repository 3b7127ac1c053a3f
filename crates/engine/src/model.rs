//! Flow step model.
//!
//! The step set is closed: action, condition, debug and return. Condition
//! branches are themselves step sequences, so trees nest to arbitrary
//! depth, and serialization must round-trip that nesting losslessly. The
//! serialized form carries an explicit `type` discriminant per node.

use serde::{Deserialize, Serialize};

/// An ordered sequence of flow steps.
pub type Flows = Vec<FlowStep>;

/// How a condition combines the results of its expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    /// Every expression must match.
    #[default]
    And,
    /// At least one expression must match.
    Or,
}

/// One node of a flow's rule tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FlowStep {
    /// Invoke a named side-effecting operation against the calendar.
    Action { identifier: String },

    /// Branch on a set of expressions combined with a logical operator.
    Condition {
        #[serde(default)]
        expressions: Vec<serde_json::Value>,

        #[serde(default)]
        operator: LogicalOperator,

        #[serde(default, rename = "then")]
        then_branch: Flows,

        #[serde(default, rename = "else")]
        else_branch: Flows,
    },

    /// Emit a trace message without mutating state.
    Debug { message: String },

    /// Terminate evaluation early with a boolean signal.
    Return { value: bool },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_discriminants() {
        let json = serde_json::to_value(FlowStep::Debug {
            message: "hello".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "debug");
        assert_eq!(json["message"], "hello");
    }

    #[test]
    fn test_nested_condition_round_trip() {
        let steps: Flows = vec![
            FlowStep::Debug {
                message: "start".to_string(),
            },
            FlowStep::Condition {
                expressions: vec![serde_json::json!({"field": "summary", "contains": "standup"})],
                operator: LogicalOperator::Or,
                then_branch: vec![FlowStep::Condition {
                    expressions: vec![],
                    operator: LogicalOperator::And,
                    then_branch: vec![FlowStep::Return { value: true }],
                    else_branch: vec![],
                }],
                else_branch: vec![FlowStep::Action {
                    identifier: "noop".to_string(),
                }],
            },
        ];

        let encoded = serde_json::to_string(&steps).unwrap();
        let decoded: Flows = serde_json::from_str(&encoded).unwrap();
        assert_eq!(steps, decoded);
    }

    #[test]
    fn test_condition_defaults() {
        // A bare condition node decodes with empty branches and the
        // default operator.
        let decoded: FlowStep = serde_json::from_str(r#"{"type": "condition"}"#).unwrap();
        match decoded {
            FlowStep::Condition {
                expressions,
                operator,
                then_branch,
                else_branch,
            } => {
                assert!(expressions.is_empty());
                assert_eq!(operator, LogicalOperator::And);
                assert!(then_branch.is_empty());
                assert!(else_branch.is_empty());
            }
            other => panic!("expected condition, got {other:?}"),
        }
    }
}
