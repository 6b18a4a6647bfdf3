//! Control flow mechanism for break/continue/return

use crate::error::EvalError;
use crate::value::Value;

/// Control flow signal for non-local jumps.
///
/// `break`, `continue` and `return` don't produce a value. They return
/// `Err(EvalError::ControlFlow(...))`, which propagates up until caught by
/// the enclosing loop or function call.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlFlow {
    /// Leave the innermost loop.
    Break,

    /// Skip to the next iteration of the innermost loop.
    Continue,

    /// Return from a function (or end the unit at top level).
    Return {
        /// Value to return from the function
        value: Value,
    },
}

impl ControlFlow {
    /// Create a return.
    pub fn return_value(value: Value) -> Self {
        ControlFlow::Return { value }
    }

    /// Keyword that raised the signal.
    pub fn keyword(&self) -> &'static str {
        match self {
            ControlFlow::Break => "break",
            ControlFlow::Continue => "continue",
            ControlFlow::Return { .. } => "return",
        }
    }

    /// Error for a loop signal that reached a function or unit boundary.
    pub fn outside_loop(&self) -> EvalError {
        EvalError::LoopControlOutsideLoop {
            keyword: self.keyword().to_string(),
        }
    }
}

impl From<ControlFlow> for EvalError {
    fn from(flow: ControlFlow) -> Self {
        EvalError::ControlFlow(flow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_value() {
        let cf = ControlFlow::return_value(Value::from(42.0));
        assert_eq!(
            cf,
            ControlFlow::Return {
                value: Value::from(42.0)
            }
        );
        assert_eq!(cf.keyword(), "return");
    }

    #[test]
    fn test_outside_loop_error() {
        let err = ControlFlow::Continue.outside_loop();
        assert_eq!(err.to_string(), "'continue' used outside of a loop");
    }

    #[test]
    fn test_into_eval_error() {
        let err: EvalError = ControlFlow::Break.into();
        assert!(matches!(err, EvalError::ControlFlow(ControlFlow::Break)));
    }
}
