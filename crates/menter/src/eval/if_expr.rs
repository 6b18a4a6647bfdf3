//! Conditional evaluation

use super::{invalid_node, Evaluate, Scope};
use crate::environment::Environment;
use crate::error::EvalError;
use crate::parser::{Element, Node, NodeKind};
use crate::value::Value;

/// Evaluate `if (c) a elif (d) b else e`.
///
/// Branches are tried in order; the first whose condition is truthy runs.
/// An `else` branch has no condition. Yields empty when no branch runs.
pub fn eval_conditional(node: &Node, env: &mut Environment, scope: &Scope) -> Result<Value, EvalError> {
    for branch in &node.children {
        let Element::Node(branch) = branch else {
            return Err(invalid_node(node));
        };
        if branch.kind != NodeKind::ConditionalBranch {
            return Err(invalid_node(branch));
        }
        match branch.children.as_slice() {
            [condition, body] => {
                if condition.eval(env, scope)?.is_truthy() {
                    return body.eval(env, scope);
                }
            }
            [body] => return body.eval(env, scope),
            _ => return Err(invalid_node(branch)),
        }
    }
    Ok(Value::Empty)
}
