//! Rule-tree evaluation engine for calflow.
//!
//! A flow is an ordered tree of [`FlowStep`] nodes that is evaluated
//! against a parsed calendar. The engine walks the tree, mutates the
//! calendar through registered actions, and collects a debug trace on
//! the [`ExecutionContext`]. Action semantics and condition-expression
//! evaluation are injected behind the [`ActionSet`] and
//! [`ConditionEvaluator`] traits so the step walker stays independent
//! of any particular rule vocabulary.

pub mod context;
pub mod error;
pub mod evaluator;
pub mod model;

pub use context::{ExecutionContext, Profile};
pub use error::EngineError;
pub use evaluator::{ActionSet, ConditionEvaluator, Engine, EvalSignal, StepEngine};
pub use model::{FlowStep, Flows, LogicalOperator};
