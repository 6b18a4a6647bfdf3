//! Function and constructor calls

use tracing::{debug, trace};

use super::control::ControlFlow;
use super::{invalid_element, invalid_node, methods, Evaluate, Scope, SymbolMode};
use crate::environment::Environment;
use crate::error::EvalError;
use crate::lexer::TokenKind;
use crate::parser::{Element, Node, NodeKind};
use crate::value::{FunctionValue, MethodKind, NativeFn, SymbolTable, Value};

impl Evaluate for FunctionValue {
    /// Run the body with the parameters already bound in `scope.locals`.
    fn eval(&self, env: &mut Environment, scope: &Scope) -> Result<Value, EvalError> {
        match self.body.eval(env, scope) {
            Err(EvalError::ControlFlow(ControlFlow::Return { value })) => Ok(value),
            Err(EvalError::ControlFlow(flow)) => Err(flow.outside_loop()),
            other => other,
        }
    }
}

/// Evaluate `callee(args)`.
pub fn eval_call(node: &Node, env: &mut Environment, scope: &Scope) -> Result<Value, EvalError> {
    let [callee, parens] = node.children.as_slice() else {
        return Err(invalid_node(node));
    };
    let read = scope.with_mode(SymbolMode::ThrowIfMissing);
    let function = callee.eval(env, &read)?;
    let args = eval_args(parens, env, &read)?;
    call_value(&function, args, env, &read, &node.reconstruct_code())
}

/// Evaluate the arguments in a `PARENS` node, left to right.
pub fn eval_args(parens: &Element, env: &mut Environment, scope: &Scope) -> Result<Vec<Value>, EvalError> {
    match parens {
        Element::Node(node) if node.kind == NodeKind::ParenthesisPair => node
            .children
            .iter()
            .map(|arg| arg.eval(env, scope))
            .collect(),
        other => Err(invalid_element(other)),
    }
}

/// Call a value with evaluated arguments.
///
/// `scope` is the caller's; `code` is the call expression, for messages.
///
/// # Errors
///
/// Returns `NotCallable` if the value is not a function and
/// `ArityMismatch` if the argument count is wrong.
pub fn call_value(
    function: &Value,
    args: Vec<Value>,
    env: &mut Environment,
    scope: &Scope,
    code: &str,
) -> Result<Value, EvalError> {
    match function {
        Value::Function(f) => call_function(f, args, env, scope),
        Value::Native(native) => call_native(native, &args),
        Value::Method(method) => match &method.kind {
            MethodKind::Builtin(builtin) => {
                methods::call_builtin(*builtin, &method.receiver, args, env, scope)
            }
            MethodKind::Custom(f) => {
                let Value::Custom(instance) = &method.receiver else {
                    return Err(EvalError::type_error(format!(
                        "method {} bound to a {}",
                        method.name,
                        method.receiver.type_name()
                    )));
                };
                f(&mut *instance.borrow_mut(), &args).map_err(|message| EvalError::Native {
                    name: method.name.clone(),
                    message,
                })
            }
        },
        other => Err(EvalError::NotCallable {
            type_name: other.type_name(),
            code: code.to_string(),
        }),
    }
}

fn call_function(
    f: &FunctionValue,
    args: Vec<Value>,
    env: &mut Environment,
    caller: &Scope,
) -> Result<Value, EvalError> {
    let name = f.display_name();
    if args.len() != f.params.len() {
        return Err(EvalError::ArityMismatch {
            expected: f.params.len(),
            got: args.len(),
            name: name.to_string(),
        });
    }

    env.enter_call(name)?;
    let locals = SymbolTable::new();
    locals.extend_from(&f.captured);
    for (param, arg) in f.params.iter().zip(args) {
        locals.define(param.as_str(), arg);
    }
    let body_scope = Scope::function_body(caller.global.clone(), f.context.clone(), locals);

    let tracing_calls = env.config().trace;
    if tracing_calls {
        debug!(function = %name, depth = env.call_depth(), params = ?f.params, "call");
    }
    let result = f.eval(env, &body_scope);
    if tracing_calls {
        match &result {
            Ok(value) => debug!(function = %name, result = %value, "return"),
            Err(err) => debug!(function = %name, error = %err, "unwind"),
        }
    }
    if matches!(&result, Err(err) if !matches!(err, EvalError::ControlFlow(_))) {
        env.record_failure();
    }
    env.exit_call();
    result
}

fn call_native(native: &NativeFn, args: &[Value]) -> Result<Value, EvalError> {
    if let Ok(expected) = usize::try_from(native.arity) {
        if args.len() != expected {
            return Err(EvalError::ArityMismatch {
                expected,
                got: args.len(),
                name: native.name.clone(),
            });
        }
    }
    trace!(native = %native.name, args = args.len(), "native call");
    (native.func)(args).map_err(|message| EvalError::Native {
        name: native.name.clone(),
        message,
    })
}

/// Evaluate `new Type(args)` or `new module.Type(args)`.
pub fn eval_constructor(node: &Node, env: &mut Environment, scope: &Scope) -> Result<Value, EvalError> {
    let [name, parens] = node.children.as_slice() else {
        return Err(invalid_node(node));
    };
    let (module, type_name) = match name {
        Element::Token(token) if token.kind == TokenKind::Identifier => (None, token.value.clone()),
        Element::Node(path) if path.kind == NodeKind::IdentifierAccessed => {
            let parts = path
                .children
                .iter()
                .map(|segment| segment.text().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| invalid_node(path))?;
            let (Some(first), Some(last)) = (parts.first(), parts.last()) else {
                return Err(invalid_node(path));
            };
            (Some(module_for_alias(first, scope)), last.clone())
        }
        other => return Err(invalid_element(other)),
    };

    let read = scope.with_mode(SymbolMode::ThrowIfMissing);
    let args = eval_args(parens, env, &read)?;
    let entry = env
        .types()
        .find(module.as_deref(), &type_name)
        .ok_or_else(|| EvalError::UnknownType {
            name: type_name.clone(),
        })?;
    (entry.constructor)(&args).map_err(|message| EvalError::Native {
        name: type_name,
        message,
    })
}

/// The module an import alias stands for; other names pass through.
fn module_for_alias(name: &str, scope: &Scope) -> String {
    scope
        .contexts()
        .flat_map(|context| context.imports())
        .find(|import| import.alias() == Some(name))
        .map_or_else(|| name.to_string(), |import| import.name().to_string())
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::context::EvalConfig;
    use crate::module::GlobalContext;
    use crate::runtime::Runtime;

    fn scope() -> Scope {
        Scope::top_level(GlobalContext::new("test.mtr"))
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Debug-level log lines written while evaluating `inc(41)`.
    fn call_log(trace: bool) -> String {
        let out = Captured::default();
        let writer = out.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let mut runtime = Runtime::with_config(EvalConfig::new().traced(trace)).unwrap();
            assert_eq!(runtime.evaluate("inc(x) = x + 1\ninc(41)").unwrap(), Value::from(42));
        });
        let bytes = out.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_trace_config_logs_calls_and_results() {
        let traced = call_log(true);
        assert!(traced.contains("function=inc"), "{traced}");
        assert!(traced.contains("result=42"), "{traced}");

        let quiet = call_log(false);
        assert!(!quiet.contains("result=42"), "{quiet}");
    }

    #[test]
    fn test_native_arity_checked() {
        let mut env = Environment::new();
        let twice = Value::native("twice", 1, |args| {
            Ok(Value::from(args[0].as_f64().unwrap_or(0.0) * 2.0))
        });
        let result = call_value(&twice, vec![Value::from(2.0)], &mut env, &scope(), "twice(2)");
        assert_eq!(result.unwrap(), Value::from(4.0));

        let err = call_value(&twice, vec![], &mut env, &scope(), "twice()").unwrap_err();
        assert!(matches!(err, EvalError::ArityMismatch { expected: 1, got: 0, .. }));
    }

    #[test]
    fn test_variadic_native() {
        let mut env = Environment::new();
        let count = Value::native("count", -1, |args| Ok(Value::from(args.len())));
        let args = vec![Value::Empty, Value::Empty, Value::Empty];
        let result = call_value(&count, args, &mut env, &scope(), "count(…)");
        assert_eq!(result.unwrap(), Value::from(3.0));
    }

    #[test]
    fn test_not_callable() {
        let mut env = Environment::new();
        let err = call_value(&Value::from(1.0), vec![], &mut env, &scope(), "1()").unwrap_err();
        assert_eq!(err.to_string(), "Value of type number is not callable: 1()");
    }

    #[test]
    fn test_native_error_wrapped() {
        let mut env = Environment::new();
        let fail = Value::native("fail", 0, |_| Err("boom".to_string()));
        let err = call_value(&fail, vec![], &mut env, &scope(), "fail()").unwrap_err();
        assert_eq!(err.to_string(), "Error in fail: boom");
    }
}
