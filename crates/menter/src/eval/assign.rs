//! Assignment evaluation

use super::{invalid_node, path, Evaluate, Scope, SymbolMode};
use crate::environment::Environment;
use crate::error::EvalError;
use crate::parser::{Element, Node, NodeKind};
use crate::value::{Value, ValueCell};

/// Evaluate `target = value` or a combined form such as `target += value`.
///
/// The right side is evaluated against a snapshot of the locals, so names
/// it introduces do not leak into the enclosing scope. The target is then
/// resolved in create mode, and the assignment writes through its cell.
/// Yields the assigned value.
///
/// # Errors
///
/// Returns `UnresolvedSymbol` for a combined assignment to a missing symbol
/// and `Operator` when the combining operator rejects its operands.
pub fn eval_assignment(node: &Node, env: &mut Environment, scope: &Scope) -> Result<Value, EvalError> {
    let [target, value] = node.children.as_slice() else {
        return Err(invalid_node(node));
    };
    let rhs_scope = Scope {
        locals: scope.locals.snapshot(),
        mode: SymbolMode::ThrowIfMissing,
        ..scope.clone()
    };
    let value = value.eval(env, &rhs_scope)?;

    if let Element::Node(listed) = target {
        if listed.kind == NodeKind::ListedElements {
            destructure(listed, &value, env, scope)?;
            return Ok(value);
        }
    }

    let value = match node.value.as_deref() {
        Some(op) if op.symbol() != "=" => {
            let cell = path::resolve_target(target, env, scope, SymbolMode::ThrowIfMissing)?;
            let current = cell.get();
            let combined = op
                .evaluate(&[current.clone(), value.clone()])
                .ok_or_else(|| EvalError::Operator {
                    symbol: format!("{}=", op.symbol()),
                    message: format!(
                        "cannot be applied to {} and {}",
                        current.type_name(),
                        value.type_name()
                    ),
                })?;
            cell.assign(combined.clone());
            combined
        }
        _ => {
            let cell = path::resolve_target(target, env, scope, SymbolMode::CreateIfMissing)?;
            cell.assign(value.clone());
            value
        }
    };
    Ok(value)
}

/// `a, b = [1, 2]`: assign array items by position; missing items are empty.
fn destructure(targets: &Node, value: &Value, env: &mut Environment, scope: &Scope) -> Result<(), EvalError> {
    let Value::Array(items) = value else {
        return Err(EvalError::type_error(format!(
            "cannot destructure {} into {}",
            value.type_name(),
            targets.reconstruct_code()
        )));
    };
    let items: Vec<Value> = items.borrow().iter().map(ValueCell::get).collect();
    for (i, target) in targets.children.iter().enumerate() {
        let cell = path::resolve_target(target, env, scope, SymbolMode::CreateIfMissing)?;
        cell.assign(items.get(i).cloned().unwrap_or_default());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::TokenKind;
    use crate::module::GlobalContext;
    use crate::operator::Operators;
    use pretty_assertions::assert_eq;

    fn ident(name: &str) -> Element {
        Element::token(TokenKind::Identifier, name)
    }

    fn number(n: &str) -> Element {
        Element::token(TokenKind::NumberLiteral, n)
    }

    fn assignment(symbol: &str, target: Element, value: Element) -> Node {
        let operators = Operators::default();
        let op = operators
            .find_operator(symbol, true, true)
            .expect("operator in default table");
        Node::with_operator(NodeKind::Assignment, op, vec![target, value])
    }

    #[test]
    fn test_plain_assignment_defines() {
        let mut env = Environment::new();
        let scope = Scope::top_level(GlobalContext::new("test.mtr"));
        let node = assignment("=", ident("x"), number("3"));
        assert_eq!(eval_assignment(&node, &mut env, &scope).unwrap(), Value::from(3.0));
        assert_eq!(scope.global.variables().get("x").unwrap().get(), Value::from(3.0));
    }

    #[test]
    fn test_combined_assignment_needs_existing_symbol() {
        let mut env = Environment::new();
        let scope = Scope::top_level(GlobalContext::new("test.mtr"));
        let node = assignment("+", ident("x"), number("1"));
        assert!(matches!(
            eval_assignment(&node, &mut env, &scope),
            Err(EvalError::UnresolvedSymbol { .. })
        ));

        scope.locals.define("x", Value::from(4.0));
        assert_eq!(eval_assignment(&node, &mut env, &scope).unwrap(), Value::from(5.0));
    }

    #[test]
    fn test_destructure_pads_with_empty() {
        let mut env = Environment::new();
        let scope = Scope::top_level(GlobalContext::new("test.mtr"));
        let targets = Node::with_children(NodeKind::ListedElements, vec![ident("a"), ident("b")]);
        let value = Node::with_children(NodeKind::Array, vec![number("1")]);
        let node = assignment("=", Element::Node(targets), Element::Node(value));
        eval_assignment(&node, &mut env, &scope).unwrap();
        assert_eq!(scope.locals.get("a").unwrap().get(), Value::from(1.0));
        assert_eq!(scope.locals.get("b").unwrap().get(), Value::Empty);
    }
}
