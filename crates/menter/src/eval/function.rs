//! Function declarations, inline functions and operator functions

use std::rc::Rc;

use tracing::debug;

use super::{invalid_element, invalid_node, path, Scope, SymbolMode};
use crate::environment::Environment;
use crate::error::EvalError;
use crate::lexer::TokenKind;
use crate::parser::{Element, Node, NodeKind};
use crate::value::{FunctionValue, SymbolTable, Value};

// ═══════════════════════════════════════════════════════════════════════
// Declarations
// ═══════════════════════════════════════════════════════════════════════

/// Evaluate a `FUNCTION_DECLARATION`: bind the closure to the declared
/// name, creating the name if needed. Yields the function.
///
/// The name's cell exists before the closure captures the locals, so a
/// function declared inside another one can call itself.
pub fn eval_declaration(node: &Node, env: &mut Environment, scope: &Scope) -> Result<Value, EvalError> {
    match node.children.as_slice() {
        [keyword, name, params] if keyword.is_keyword("native") => {
            eval_native(name, params, env, scope)
        }
        [name, Element::Node(inline)] if inline.kind == NodeKind::FunctionInline => {
            let cell = path::resolve_target(name, env, scope, SymbolMode::CreateIfMissing)?;
            let function = build(Some(name.reconstruct_code()), inline, scope)?;
            cell.assign(function.clone());
            Ok(function)
        }
        [name, params, body] => {
            let cell = path::resolve_target(name, env, scope, SymbolMode::CreateIfMissing)?;
            let function = closure(Some(name.reconstruct_code()), params, body, scope)?;
            cell.assign(function.clone());
            Ok(function)
        }
        _ => Err(invalid_node(node)),
    }
}

/// Evaluate `(params) -> body` to an anonymous function.
pub fn eval_inline(node: &Node, scope: &Scope) -> Result<Value, EvalError> {
    build(None, node, scope)
}

fn build(name: Option<String>, inline: &Node, scope: &Scope) -> Result<Value, EvalError> {
    let [params, body] = inline.children.as_slice() else {
        return Err(invalid_node(inline));
    };
    closure(name, params, body, scope)
}

fn closure(name: Option<String>, params: &Element, body: &Element, scope: &Scope) -> Result<Value, EvalError> {
    // Top-level functions see their unit's globals through the scope chain.
    let captured = if scope.is_top_level() {
        SymbolTable::new()
    } else {
        scope.locals.snapshot()
    };
    Ok(Value::Function(Rc::new(FunctionValue {
        name,
        params: parameter_names(params)?,
        body: Rc::new(body.clone()),
        context: scope.defining_context().clone(),
        captured,
    })))
}

/// Parameter names from `(a, b)` or a bare `a`.
fn parameter_names(params: &Element) -> Result<Vec<String>, EvalError> {
    match params {
        Element::Token(token) if token.kind == TokenKind::Identifier => Ok(vec![token.value.clone()]),
        Element::Node(node) if node.kind == NodeKind::ParenthesisPair => node
            .children
            .iter()
            .map(|param| match param {
                Element::Token(token) if token.kind == TokenKind::Identifier => Ok(token.value.clone()),
                other => Err(invalid_element(other)),
            })
            .collect(),
        other => Err(invalid_element(other)),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Natives
// ═══════════════════════════════════════════════════════════════════════

/// `native name(params)`: bind the host function registered for one of the
/// unit's module names, its imports, or its source.
fn eval_native(
    name: &Element,
    params: &Element,
    env: &mut Environment,
    scope: &Scope,
) -> Result<Value, EvalError> {
    let Some(function_name) = name.text().filter(|_| name.is_token(TokenKind::Identifier)) else {
        return Err(invalid_element(name));
    };
    if !scope.is_top_level() {
        return Err(EvalError::NativeOutsideModule {
            name: function_name.to_string(),
        });
    }
    parameter_names(params)?;

    let context = &scope.global;
    let mut candidates: Vec<String> = context
        .modules()
        .iter()
        .map(|m| m.name().to_string())
        .collect();
    candidates.extend(context.imports().iter().map(|i| i.name().to_string()));
    candidates.push(context.source().to_string());
    candidates.push(context.source_name().to_string());
    candidates.dedup();

    let found = candidates
        .iter()
        .find_map(|module| env.natives().find(module, function_name).map(|f| (module.clone(), f)));
    let Some((module, native)) = found else {
        return Err(EvalError::NativeNotFound {
            name: function_name.to_string(),
            candidates,
        });
    };
    debug!(function = function_name, module = %module, source = context.source(), "bound native");

    let value = Value::Native(native);
    match context.variables().get(function_name) {
        Some(cell) => cell.assign(value.clone()),
        None => {
            context.variables().define(function_name, value.clone());
        }
    }
    Ok(value)
}

// ═══════════════════════════════════════════════════════════════════════
// Operator Functions
// ═══════════════════════════════════════════════════════════════════════

/// `(+)`, `[-)` and friends: the operator as a native function.
pub fn eval_operator_function(node: &Node) -> Result<Value, EvalError> {
    let Some(op) = node.value.clone() else {
        return Err(invalid_node(node));
    };
    let name = op.bracket_form();
    let arity = i32::try_from(op.arity()).unwrap_or(-1);
    let symbol = op.symbol().to_string();
    Ok(Value::native(name, arity, move |args| {
        op.evaluate(args).ok_or_else(|| {
            let types = args.iter().map(Value::type_name).collect::<Vec<_>>();
            format!("operator {symbol} cannot be applied to {}", types.join(" and "))
        })
    }))
}
