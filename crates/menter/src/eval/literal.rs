//! Literal, array and map evaluation

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use regex::Regex;

use super::control::ControlFlow;
use super::{invalid_node, path, Evaluate, Scope};
use crate::environment::Environment;
use crate::error::EvalError;
use crate::lexer::{string_contents, Token, TokenKind};
use crate::parser::{Element, Node, NodeKind};
use crate::value::{Number, Value, ValueCell};

// ═══════════════════════════════════════════════════════════════════════
// Tokens
// ═══════════════════════════════════════════════════════════════════════

/// Evaluate a single token: a literal, a symbol or a loop keyword.
pub fn eval_token(token: &Token, env: &mut Environment, scope: &Scope) -> Result<Value, EvalError> {
    match token.kind {
        TokenKind::Identifier => path::resolve_name(&token.value, env, scope).map(|c| c.get()),
        TokenKind::Keyword if token.value == "null" => Ok(Value::Empty),
        TokenKind::Pass => Ok(Value::Empty),
        TokenKind::Continue => Err(ControlFlow::Continue.into()),
        TokenKind::Break => Err(ControlFlow::Break.into()),
        kind if kind.is_literal() => literal_value(token),
        _ => Err(EvalError::InvalidNode {
            kind: token.kind.to_string(),
            code: token.reconstruct_code(),
        }),
    }
}

/// Value of a literal token.
pub fn literal_value(token: &Token) -> Result<Value, EvalError> {
    match token.kind {
        TokenKind::NumberLiteral => token
            .value
            .parse::<Number>()
            .map(Value::Number)
            .map_err(|_| EvalError::type_error(format!("Invalid number literal: {}", token.value))),
        TokenKind::BooleanLiteral => Ok(Value::Boolean(token.value == "true")),
        TokenKind::StringLiteral => Ok(Value::string(string_contents(&token.value))),
        TokenKind::RegexLiteral => regex_value(&token.value),
        _ => Err(EvalError::InvalidNode {
            kind: token.kind.to_string(),
            code: token.reconstruct_code(),
        }),
    }
}

/// Compile `r/body/flags`; flags become an inline group.
fn regex_value(literal: &str) -> Result<Value, EvalError> {
    let invalid = || EvalError::type_error(format!("Invalid regex literal: {literal}"));
    let rest = literal.strip_prefix("r/").ok_or_else(invalid)?;
    let (body, flags) = rest.rsplit_once('/').ok_or_else(invalid)?;
    let body = body.replace("\\/", "/");
    let pattern = if flags.is_empty() {
        body
    } else {
        format!("(?{flags}){body}")
    };
    Regex::new(&pattern)
        .map(Value::regex)
        .map_err(|e| EvalError::type_error(format!("Invalid regex {literal}: {e}")))
}

// ═══════════════════════════════════════════════════════════════════════
// Arrays and Maps
// ═══════════════════════════════════════════════════════════════════════

/// Evaluate elements eagerly, in order, into an array.
pub fn eval_array(
    children: &[Element],
    env: &mut Environment,
    scope: &Scope,
) -> Result<Value, EvalError> {
    let items = children
        .iter()
        .map(|child| child.eval(env, scope))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::array(items))
}

/// Evaluate map elements eagerly, in order. A later duplicate key
/// overwrites the earlier value but keeps its position.
pub fn eval_map(node: &Node, env: &mut Environment, scope: &Scope) -> Result<Value, EvalError> {
    let mut entries: IndexMap<String, ValueCell> = IndexMap::new();
    for element in &node.children {
        let Element::Node(pair) = element else {
            return Err(invalid_node(node));
        };
        let [key, value] = pair.children.as_slice() else {
            return Err(invalid_node(pair));
        };
        if pair.kind != NodeKind::MapElement {
            return Err(invalid_node(pair));
        }
        let key = map_key(key, env, scope)?;
        let value = value.eval(env, scope)?;
        entries.insert(key, ValueCell::new(value));
    }
    Ok(Value::Map(Rc::new(RefCell::new(entries))))
}

/// Key of a map element: a literal's value, an identifier's name, or the
/// display form of anything else.
pub fn map_key(key: &Element, env: &mut Environment, scope: &Scope) -> Result<String, EvalError> {
    match key {
        Element::Token(token) if token.kind == TokenKind::Identifier => Ok(token.value.clone()),
        Element::Token(token) if token.kind.is_literal() => Ok(literal_value(token)?.key_string()),
        other => Ok(other.eval(env, scope)?.key_string()),
    }
}
