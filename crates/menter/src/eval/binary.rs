//! Operator expression evaluation

use super::{invalid_node, Evaluate, Scope};
use crate::environment::Environment;
use crate::error::EvalError;
use crate::parser::Node;
use crate::value::Value;

/// Evaluate an `EXPRESSION` node: operands left to right, then the
/// operator's evaluation function.
///
/// # Errors
///
/// Returns `OperatorArity` when the operand count does not match the
/// operator and `Operator` when the operator is undefined for the operands.
pub fn eval_expression(node: &Node, env: &mut Environment, scope: &Scope) -> Result<Value, EvalError> {
    let Some(op) = node.value.as_deref() else {
        return Err(invalid_node(node));
    };
    if node.children.len() != op.arity() {
        return Err(EvalError::OperatorArity {
            symbol: op.symbol().to_string(),
            expected: op.arity(),
            got: node.children.len(),
        });
    }

    let operands = node
        .children
        .iter()
        .map(|child| child.eval(env, scope))
        .collect::<Result<Vec<_>, _>>()?;

    op.evaluate(&operands).ok_or_else(|| EvalError::Operator {
        symbol: op.symbol().to_string(),
        message: format!("cannot be applied to {}", describe(&operands)),
    })
}

fn describe(operands: &[Value]) -> String {
    operands
        .iter()
        .map(Value::type_name)
        .collect::<Vec<_>>()
        .join(" and ")
}
