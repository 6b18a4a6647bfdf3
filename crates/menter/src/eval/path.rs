//! Symbol resolution: identifiers and accessor chains
//!
//! Resolution yields the cell a symbol lives in, so the same walk serves
//! reads, assignments and declarations. The first segment is looked up in
//! the locals, then the globals of each unit in the scope, then through the
//! unit's imports. Every later segment is either a member access or a call
//! on the value produced so far.

use std::rc::Rc;

use super::{call, eval_sequence, invalid_element, literal, Evaluate, Scope, SymbolMode};
use crate::environment::Environment;
use crate::error::EvalError;
use crate::lexer::TokenKind;
use crate::parser::{Element, Node, NodeKind};
use crate::value::{BoundMethod, BuiltinMethod, MethodKind, Number, Value, ValueCell};

/// Resolve a bare identifier.
pub fn resolve_name(name: &str, _env: &mut Environment, scope: &Scope) -> Result<ValueCell, EvalError> {
    if let Some((cell, _)) = lookup_symbol(name, None, scope) {
        return Ok(cell);
    }
    missing_root(name, false, name, scope)
}

/// Resolve an `IDENTIFIER_ACCESSED` chain such as `a.b[0](1).c`.
pub fn resolve_accessed(node: &Node, env: &mut Environment, scope: &Scope) -> Result<ValueCell, EvalError> {
    resolve_segments(&node.children, &node.reconstruct_code(), env, scope)
}

/// Resolve an assignment or declaration target in the given mode.
pub fn resolve_target(
    target: &Element,
    env: &mut Environment,
    scope: &Scope,
    mode: SymbolMode,
) -> Result<ValueCell, EvalError> {
    let scope = scope.with_mode(mode);
    match target {
        Element::Token(token) if token.kind == TokenKind::Identifier => {
            resolve_name(&token.value, env, &scope)
        }
        Element::Node(node) if node.kind == NodeKind::IdentifierAccessed => {
            resolve_accessed(node, env, &scope)
        }
        other => Err(invalid_element(other)),
    }
}

fn resolve_segments(
    segments: &[Element],
    code: &str,
    env: &mut Environment,
    scope: &Scope,
) -> Result<ValueCell, EvalError> {
    let read = scope.with_mode(SymbolMode::ThrowIfMissing);
    let (mut current, mut index) = resolve_first(segments, code, env, scope, &read)?;

    while let Some(segment) = segments.get(index) {
        let is_last = index + 1 == segments.len();
        current = match segment {
            Element::Node(node) if node.kind == NodeKind::FunctionCall => {
                let args = match node.children.first() {
                    Some(parens) => call::eval_args(parens, env, &read)?,
                    None => Vec::new(),
                };
                let callee = current.get();
                ValueCell::new(call::call_value(&callee, args, env, &read, code)?)
            }
            _ => {
                let key = segment_key(segment, env, &read)?;
                let next_is_call = segments
                    .get(index + 1)
                    .is_some_and(|s| s.is_node(NodeKind::FunctionCall));
                access(&current, &key, is_last, next_is_call, env, scope, code)?
            }
        };
        index += 1;
    }
    Ok(current)
}

/// Resolve the first segment. Returns the cell and how many segments were
/// consumed: a module alias consumes the symbol after it too.
fn resolve_first(
    segments: &[Element],
    code: &str,
    env: &mut Environment,
    scope: &Scope,
    read: &Scope,
) -> Result<(ValueCell, usize), EvalError> {
    let Some(first) = segments.first() else {
        return Err(EvalError::InvalidNode {
            kind: NodeKind::IdentifierAccessed.to_string(),
            code: code.to_string(),
        });
    };
    let name = match first {
        Element::Token(token) if token.kind == TokenKind::Identifier => &token.value,
        Element::Token(token) if token.kind.is_literal() => {
            return Ok((ValueCell::new(literal::literal_value(token)?), 1));
        }
        other => return Ok((ValueCell::new(other.eval(env, read)?), 1)),
    };

    let next = segments
        .get(1)
        .and_then(|s| s.as_token())
        .filter(|t| t.kind == TokenKind::Identifier)
        .map(|t| t.value.as_str());
    if let Some(found) = lookup_symbol(name, next, scope) {
        return Ok(found);
    }
    missing_root(name, segments.len() > 1, code, scope).map(|cell| (cell, 1))
}

/// Find an existing symbol: locals, unit globals, `import X [as Y]`
/// qualified access, then `import X inline`.
fn lookup_symbol(name: &str, next: Option<&str>, scope: &Scope) -> Option<(ValueCell, usize)> {
    if let Some(cell) = scope.locals.get(name) {
        return Some((cell, 1));
    }
    for context in scope.contexts() {
        if let Some(cell) = context.variables().get(name) {
            return Some((cell, 1));
        }
    }

    if let Some(symbol) = next {
        for context in scope.contexts() {
            for import in context.imports() {
                if import.is_inline() || import.alias_or_name() != name {
                    continue;
                }
                let Some(module) = import.module().filter(|m| m.exports(symbol)) else {
                    continue;
                };
                let Some(owner) = module.context() else {
                    continue;
                };
                if let Some(cell) = owner.variables().get(symbol) {
                    return Some((cell, 2));
                }
                if scope.mode == SymbolMode::CreateIfMissing {
                    return Some((owner.variables().define(symbol, Value::Empty), 2));
                }
            }
        }
    }

    for context in scope.contexts() {
        for import in context.imports().iter().filter(|i| i.is_inline()) {
            let Some(module) = import.module().filter(|m| m.exports(name)) else {
                continue;
            };
            if let Some(cell) = module.context().and_then(|owner| owner.variables().get(name)) {
                return Some((cell, 1));
            }
        }
    }
    None
}

fn missing_root(name: &str, has_more: bool, code: &str, scope: &Scope) -> Result<ValueCell, EvalError> {
    match scope.mode {
        SymbolMode::CreateIfMissing => {
            let initial = if has_more { Value::map(Vec::new()) } else { Value::Empty };
            Ok(scope.locals.define(name, initial))
        }
        SymbolMode::ThrowIfMissing => Err(unresolved(name, code)),
    }
}

fn unresolved(name: &str, code: &str) -> EvalError {
    EvalError::UnresolvedSymbol {
        name: name.to_string(),
        code: code.to_string(),
    }
}

/// The key a segment addresses: an identifier's name, a literal's value,
/// or the value of a bracketed expression.
fn segment_key(segment: &Element, env: &mut Environment, read: &Scope) -> Result<Value, EvalError> {
    match segment {
        Element::Token(token) if token.kind == TokenKind::Identifier => Ok(Value::string(token.value.as_str())),
        Element::Token(token) if token.kind.is_literal() => literal::literal_value(token),
        Element::Node(node) if node.kind == NodeKind::CodeBlock => eval_sequence(&node.children, env, read),
        other => other.eval(env, read),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Member Access
// ═══════════════════════════════════════════════════════════════════════

fn access(
    current: &ValueCell,
    key: &Value,
    is_last: bool,
    next_is_call: bool,
    env: &mut Environment,
    scope: &Scope,
    code: &str,
) -> Result<ValueCell, EvalError> {
    let value = current.get();
    if let Some(cell) = lookup_member(&value, key, env) {
        return Ok(cell);
    }

    let name = key.key_string();
    if next_is_call || scope.mode == SymbolMode::ThrowIfMissing {
        if let Some(method) = BuiltinMethod::from_name(&name) {
            return Ok(bind_method(name, value, MethodKind::Builtin(method)));
        }
    }
    if scope.mode == SymbolMode::CreateIfMissing {
        if let Some(cell) = create_member(current, &value, key, is_last) {
            return Ok(cell);
        }
    }
    Err(unresolved(&name, code))
}

/// An existing member: map entry, array element, string character, custom
/// type method or custom type member.
fn lookup_member(value: &Value, key: &Value, env: &Environment) -> Option<ValueCell> {
    match value {
        Value::Map(map) => map.borrow().get(&key.key_string()).cloned(),
        Value::Array(items) => {
            let items = items.borrow();
            let index = position(key, items.len())?;
            items.get(index).cloned()
        }
        Value::String(s) => {
            let index = position(key, s.chars().count())?;
            s.chars()
                .nth(index)
                .map(|c| ValueCell::new(Value::string(c.to_string())))
        }
        Value::Custom(instance) => {
            if let Value::String(name) = key {
                let method = env
                    .types()
                    .methods_for(&*instance.borrow())
                    .and_then(|methods| methods.get(name));
                if let Some(method) = method {
                    return Some(bind_method(
                        name.to_string(),
                        value.clone(),
                        MethodKind::Custom(method),
                    ));
                }
            }
            instance.borrow().access(key)
        }
        _ => None,
    }
}

/// Index into a sequence of `len` items; negative indices count from the end.
fn position(key: &Value, len: usize) -> Option<usize> {
    let n = key.as_number().filter(Number::is_integer)?;
    if n.is_negative() {
        len.checked_sub((-&n).to_index()?)
    } else {
        n.to_index()
    }
}

/// Create a missing member. An empty value becomes a map first; arrays only
/// grow by appending at their end.
fn create_member(current: &ValueCell, value: &Value, key: &Value, is_last: bool) -> Option<ValueCell> {
    let initial = || if is_last { Value::Empty } else { Value::map(Vec::new()) };
    match value {
        Value::Empty => {
            let map = Value::map(Vec::new());
            current.assign(map.clone());
            create_member(current, &map, key, is_last)
        }
        Value::Map(map) => {
            let cell = ValueCell::new(initial());
            map.borrow_mut().insert(key.key_string(), cell.clone());
            Some(cell)
        }
        Value::Array(items) => {
            let mut items = items.borrow_mut();
            if key.as_index() != Some(items.len()) {
                return None;
            }
            let cell = ValueCell::new(initial());
            items.push(cell.clone());
            Some(cell)
        }
        Value::Custom(instance) => {
            let cell = ValueCell::new(initial());
            instance
                .borrow_mut()
                .create(key, &cell, is_last)
                .then_some(cell)
        }
        _ => None,
    }
}

fn bind_method(name: String, receiver: Value, kind: MethodKind) -> ValueCell {
    ValueCell::new(Value::Method(Rc::new(BoundMethod {
        name,
        receiver,
        kind,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::GlobalContext;

    fn scope() -> Scope {
        Scope::top_level(GlobalContext::new("test.mtr"))
    }

    fn ident(name: &str) -> Element {
        Element::token(TokenKind::Identifier, name)
    }

    fn accessed(children: Vec<Element>) -> Node {
        Node::with_children(NodeKind::IdentifierAccessed, children)
    }

    #[test]
    fn test_unresolved_in_throw_mode() {
        let mut env = Environment::new();
        let err = resolve_name("nope", &mut env, &scope()).unwrap_err();
        assert!(matches!(err, EvalError::UnresolvedSymbol { ref name, .. } if name == "nope"));
    }

    #[test]
    fn test_create_mode_builds_intermediate_maps() {
        let mut env = Environment::new();
        let scope = scope();
        let node = accessed(vec![ident("a"), ident("b"), ident("c")]);
        let target = Element::Node(node.clone());
        let cell = resolve_target(&target, &mut env, &scope, SymbolMode::CreateIfMissing).unwrap();
        cell.assign(Value::from(1.0));

        let read = resolve_accessed(&node, &mut env, &scope).unwrap();
        assert_eq!(read.get(), Value::from(1.0));
        assert_eq!(scope.global.variables().get("a").unwrap().get().type_name(), "object");
    }

    #[test]
    fn test_array_index_and_negative_index() {
        let mut env = Environment::new();
        let scope = scope();
        scope.locals.define("xs", Value::from(vec![1.0, 2.0, 3.0]));
        let first = accessed(vec![ident("xs"), Element::token(TokenKind::NumberLiteral, "0")]);
        assert_eq!(resolve_accessed(&first, &mut env, &scope).unwrap().get(), Value::from(1.0));
        let last = position(&Value::from(-1.0), 3);
        assert_eq!(last, Some(2));
        assert_eq!(position(&Value::from(-4.0), 3), None);
    }

    #[test]
    fn test_builtin_method_bound_on_read() {
        let mut env = Environment::new();
        let scope = scope();
        scope.locals.define("xs", Value::from(vec![1.0]));
        let node = accessed(vec![ident("xs"), ident("size")]);
        let value = resolve_accessed(&node, &mut env, &scope).unwrap().get();
        assert!(matches!(value, Value::Method(ref m) if m.name == "size"));
    }

    #[test]
    fn test_array_grows_only_at_end() {
        let mut env = Environment::new();
        let scope = scope();
        scope.locals.define("xs", Value::from(vec![1.0]));
        let append = Element::Node(accessed(vec![ident("xs"), Element::token(TokenKind::NumberLiteral, "1")]));
        resolve_target(&append, &mut env, &scope, SymbolMode::CreateIfMissing)
            .unwrap()
            .assign(Value::from(2.0));
        assert_eq!(scope.locals.get("xs").unwrap().get(), Value::from(vec![1.0, 2.0]));

        let gap = Element::Node(accessed(vec![ident("xs"), Element::token(TokenKind::NumberLiteral, "5")]));
        assert!(resolve_target(&gap, &mut env, &scope, SymbolMode::CreateIfMissing).is_err());
    }
}
