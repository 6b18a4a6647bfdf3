//! Loop evaluation

use super::control::ControlFlow;
use super::{invalid_element, invalid_node, Evaluate, Scope};
use crate::environment::Environment;
use crate::error::EvalError;
use crate::lexer::TokenKind;
use crate::parser::{Element, Node, NodeKind};
use crate::value::Value;

/// What the body asked for at the end of an iteration.
enum Step {
    Next(Value),
    Stop,
}

/// Run a body once, absorbing `break` and `continue`.
fn run_body(body: &Element, env: &mut Environment, scope: &Scope) -> Result<Step, EvalError> {
    match body.eval(env, scope) {
        Ok(value) => Ok(Step::Next(value)),
        Err(EvalError::ControlFlow(ControlFlow::Continue)) => Ok(Step::Next(Value::Empty)),
        Err(EvalError::ControlFlow(ControlFlow::Break)) => Ok(Step::Stop),
        Err(err) => Err(err),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// while
// ═══════════════════════════════════════════════════════════════════════

/// Evaluate `while (condition) body`. Yields the last body value.
pub fn eval_while(node: &Node, env: &mut Environment, scope: &Scope) -> Result<Value, EvalError> {
    let [condition, body] = node.children.as_slice() else {
        return Err(invalid_node(node));
    };
    let mut last = Value::Empty;
    loop {
        env.check_interrupt()?;
        if !condition.eval(env, scope)?.is_truthy() {
            break;
        }
        match run_body(body, env, scope)? {
            Step::Next(value) => last = value,
            Step::Stop => break,
        }
    }
    Ok(last)
}

// ═══════════════════════════════════════════════════════════════════════
// for
// ═══════════════════════════════════════════════════════════════════════

/// Names the loop binds each iteration.
#[derive(Debug)]
enum LoopVars {
    /// `for (x : xs)`: the value, or the key when iterating a map
    Single(String),
    /// `for ((k, v) : xs)`: key or index, then value
    Pair(String, String),
}

impl LoopVars {
    fn parse(var: &Element) -> Result<Self, EvalError> {
        let name = |el: &Element| match el {
            Element::Token(token) if token.kind == TokenKind::Identifier => Ok(token.value.clone()),
            other => Err(invalid_element(other)),
        };
        match var {
            Element::Token(_) => Ok(LoopVars::Single(name(var)?)),
            Element::Node(node)
                if matches!(
                    node.kind,
                    NodeKind::ParenthesisPair | NodeKind::Array | NodeKind::SquareBracketPair
                ) =>
            {
                match node.children.as_slice() {
                    [single] => Ok(LoopVars::Single(name(single)?)),
                    [key, value] => Ok(LoopVars::Pair(name(key)?, name(value)?)),
                    _ => Err(invalid_node(node)),
                }
            }
            other => Err(invalid_element(other)),
        }
    }

    fn bind(&self, scope: &Scope, key: Value, value: Value, keyed: bool) {
        let set = |name: &str, v: Value| match scope.locals.get(name) {
            Some(cell) => cell.assign(v),
            None => {
                scope.locals.define(name, v);
            }
        };
        match self {
            LoopVars::Single(name) => set(name, if keyed { key } else { value }),
            LoopVars::Pair(k, v) => {
                set(k, key);
                set(v, value);
            }
        }
    }
}

/// Evaluate `for (var : iterable) body`. Yields the last body value.
///
/// Arrays give (index, item), maps (key, value), strings (index, char) and
/// custom types whatever their iterator yields. The entries are read
/// before the first iteration.
pub fn eval_for(node: &Node, env: &mut Environment, scope: &Scope) -> Result<Value, EvalError> {
    let [var, iterable, body] = node.children.as_slice() else {
        return Err(invalid_node(node));
    };
    let vars = LoopVars::parse(var)?;
    let iterable = iterable.eval(env, scope)?;
    let keyed = matches!(iterable, Value::Map(_));
    let entries = iteration_entries(&iterable)?;

    let mut last = Value::Empty;
    for (key, value) in entries {
        env.check_interrupt()?;
        vars.bind(scope, key, value, keyed);
        match run_body(body, env, scope)? {
            Step::Next(value) => last = value,
            Step::Stop => break,
        }
    }
    Ok(last)
}

fn iteration_entries(iterable: &Value) -> Result<Vec<(Value, Value)>, EvalError> {
    match iterable {
        Value::Array(items) => Ok(items
            .borrow()
            .iter()
            .enumerate()
            .map(|(i, cell)| (Value::from(i), cell.get()))
            .collect()),
        Value::Map(map) => Ok(map
            .borrow()
            .iter()
            .map(|(k, cell)| (Value::string(k.as_str()), cell.get()))
            .collect()),
        Value::String(s) => Ok(s
            .chars()
            .enumerate()
            .map(|(i, c)| (Value::from(i), Value::string(c.to_string())))
            .collect()),
        Value::Custom(instance) => Ok(instance.borrow().iterator()),
        other => Err(EvalError::type_error(format!(
            "cannot iterate over {}",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_entries_by_kind() {
        let xs = Value::from(vec!["a", "b"]);
        assert_eq!(
            iteration_entries(&xs).unwrap(),
            vec![
                (Value::from(0.0), Value::string("a")),
                (Value::from(1.0), Value::string("b")),
            ]
        );
        let chars = iteration_entries(&Value::string("hi")).unwrap();
        assert_eq!(chars[1], (Value::from(1.0), Value::string("i")));
        assert!(iteration_entries(&Value::from(3.0)).is_err());
    }

    #[test]
    fn test_loop_vars() {
        let pair = Element::Node(Node::with_children(
            NodeKind::ParenthesisPair,
            vec![
                Element::token(TokenKind::Identifier, "k"),
                Element::token(TokenKind::Identifier, "v"),
            ],
        ));
        assert!(matches!(LoopVars::parse(&pair).unwrap(), LoopVars::Pair(k, v) if k == "k" && v == "v"));
        let bad = Element::token(TokenKind::NumberLiteral, "1");
        assert!(LoopVars::parse(&bad).is_err());
    }
}
