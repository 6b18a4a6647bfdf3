//! Built-in methods available on every value

use super::call::call_value;
use super::Scope;
use crate::environment::Environment;
use crate::error::EvalError;
use crate::value::{BuiltinMethod, Value, ValueCell};

/// Run a built-in method on its receiver.
///
/// `map` and `filter` call back into interpreted code, which is why they
/// need the environment and the caller's scope.
pub fn call_builtin(
    method: BuiltinMethod,
    receiver: &Value,
    args: Vec<Value>,
    env: &mut Environment,
    scope: &Scope,
) -> Result<Value, EvalError> {
    let name = method.name();
    match (method, args.as_slice()) {
        (BuiltinMethod::Type, []) => Ok(Value::string(receiver.type_name())),
        (BuiltinMethod::Size, []) => receiver
            .size()
            .map(Value::from)
            .ok_or_else(|| unsupported(name, receiver)),
        (BuiltinMethod::Keys, []) => keys(receiver).ok_or_else(|| unsupported(name, receiver)),
        (BuiltinMethod::Values, []) => values(receiver).ok_or_else(|| unsupported(name, receiver)),
        (BuiltinMethod::Map, [f]) => map(receiver, f, env, scope),
        (BuiltinMethod::Filter, [f]) => filter(receiver, f, env, scope),
        (BuiltinMethod::Contains, [needle]) => {
            contains(receiver, needle).ok_or_else(|| unsupported(name, receiver))
        }
        (BuiltinMethod::Join, []) => join(receiver, "").ok_or_else(|| unsupported(name, receiver)),
        (BuiltinMethod::Join, [separator]) => {
            join(receiver, &separator.to_string()).ok_or_else(|| unsupported(name, receiver))
        }
        (BuiltinMethod::Push, [item]) => match receiver {
            Value::Array(items) => {
                items.borrow_mut().push(ValueCell::new(item.clone()));
                Ok(receiver.clone())
            }
            _ => Err(unsupported(name, receiver)),
        },
        (_, args) => Err(EvalError::ArityMismatch {
            expected: expected_args(method),
            got: args.len(),
            name: name.to_string(),
        }),
    }
}

fn expected_args(method: BuiltinMethod) -> usize {
    match method {
        BuiltinMethod::Type | BuiltinMethod::Size | BuiltinMethod::Keys | BuiltinMethod::Values => 0,
        BuiltinMethod::Map
        | BuiltinMethod::Filter
        | BuiltinMethod::Contains
        | BuiltinMethod::Join
        | BuiltinMethod::Push => 1,
    }
}

fn unsupported(name: &str, receiver: &Value) -> EvalError {
    EvalError::type_error(format!("{name} is not defined for {}", receiver.type_name()))
}

/// Map keys, or the indices of an array.
fn keys(receiver: &Value) -> Option<Value> {
    match receiver {
        Value::Map(map) => Some(Value::array(
            map.borrow().keys().map(|k| Value::string(k.as_str())).collect(),
        )),
        Value::Array(items) => Some(Value::array(
            (0..items.borrow().len()).map(Value::from).collect(),
        )),
        _ => None,
    }
}

/// Map values, or a copy of an array.
fn values(receiver: &Value) -> Option<Value> {
    match receiver {
        Value::Map(map) => Some(Value::array(map.borrow().values().map(ValueCell::get).collect())),
        Value::Array(items) => Some(Value::array(items.borrow().iter().map(ValueCell::get).collect())),
        _ => None,
    }
}

/// Entries as (key, value) pairs, snapshotted so callbacks may mutate the
/// receiver.
fn entries(receiver: &Value, name: &str) -> Result<Vec<(Value, Value)>, EvalError> {
    match receiver {
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
        other => Err(unsupported(name, other)),
    }
}

fn map(receiver: &Value, f: &Value, env: &mut Environment, scope: &Scope) -> Result<Value, EvalError> {
    let mut mapped = Vec::new();
    for (key, value) in entries(receiver, "map")? {
        mapped.push((key, call_value(f, vec![value], env, scope, "map")?));
    }
    Ok(rebuild(receiver, mapped))
}

fn filter(receiver: &Value, f: &Value, env: &mut Environment, scope: &Scope) -> Result<Value, EvalError> {
    let mut kept = Vec::new();
    for (key, value) in entries(receiver, "filter")? {
        if call_value(f, vec![value.clone()], env, scope, "filter")?.is_truthy() {
            kept.push((key, value));
        }
    }
    Ok(rebuild(receiver, kept))
}

/// Same kind of collection as the receiver, with fresh cells.
fn rebuild(receiver: &Value, entries: Vec<(Value, Value)>) -> Value {
    match receiver {
        Value::Map(_) => Value::map(entries.into_iter().map(|(k, v)| (k.key_string(), v))),
        _ => Value::array(entries.into_iter().map(|(_, v)| v).collect()),
    }
}

fn contains(receiver: &Value, needle: &Value) -> Option<Value> {
    let found = match receiver {
        Value::Array(items) => items.borrow().iter().any(|cell| cell.get() == *needle),
        Value::Map(map) => map.borrow().contains_key(&needle.key_string()),
        Value::String(s) => s.contains(&needle.to_string()),
        _ => return None,
    };
    Some(Value::Boolean(found))
}

fn join(receiver: &Value, separator: &str) -> Option<Value> {
    let Value::Array(items) = receiver else {
        return None;
    };
    let joined = items
        .borrow()
        .iter()
        .map(|cell| cell.get().to_string())
        .collect::<Vec<_>>()
        .join(separator);
    Some(Value::string(joined))
}
