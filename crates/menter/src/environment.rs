//! Interpreter state shared by every evaluation
//!
//! The environment owns what outlives a single evaluation unit: the
//! configuration, the native function and custom type registries, and the
//! call stack used for recursion limits and diagnostics.

mod prelude;

pub use prelude::{CORE_MODULE, CORE_SOURCE, CORE_SOURCE_NAME};

use indexmap::IndexMap;
use tracing::trace;

use crate::context::EvalConfig;
use crate::error::EvalError;
use crate::value::{NativeFn, TypeRegistry, Value};

/// Host functions addressable by `native` declarations, keyed by
/// (module, function name).
#[derive(Debug, Clone, Default)]
pub struct NativeRegistry {
    functions: IndexMap<(String, String), NativeFn>,
}

impl NativeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host closure. A later registration replaces an earlier one.
    pub fn register(
        &mut self,
        module: impl Into<String>,
        name: impl Into<String>,
        arity: i32,
        func: impl Fn(&[Value]) -> Result<Value, String> + 'static,
    ) {
        let name = name.into();
        let native = NativeFn::new(name.clone(), arity, func);
        self.functions.insert((module.into(), name), native);
    }

    /// Find a native.
    pub fn find(&self, module: &str, name: &str) -> Option<NativeFn> {
        self.functions
            .get(&(module.to_string(), name.to_string()))
            .cloned()
    }

    /// Whether a native is registered.
    pub fn contains(&self, module: &str, name: &str) -> bool {
        self.find(module, name).is_some()
    }

    /// Number of registered natives.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// The runtime environment.
///
/// # Example
///
/// ```
/// use menter::{Environment, Value};
///
/// let mut env = Environment::new();
/// env.natives_mut().register("math", "twice", 1, |args| {
///     Ok(Value::from(args[0].as_f64().unwrap_or(0.0) * 2.0))
/// });
///
/// env.enter_call("twice").unwrap();
/// assert_eq!(env.call_stack(), ["twice".to_string()]);
/// env.exit_call();
/// assert_eq!(env.call_depth(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct Environment {
    config: EvalConfig,
    natives: NativeRegistry,
    types: TypeRegistry,

    /// Names of the functions currently executing, innermost last
    call_stack: Vec<String>,

    /// Call stack captured where the current error was raised
    failure_stack: Option<Vec<String>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// An environment with the core natives registered.
    pub fn new() -> Self {
        Self::with_config(EvalConfig::default())
    }

    /// An environment with a custom configuration.
    pub fn with_config(config: EvalConfig) -> Self {
        let mut env = Self {
            config,
            natives: NativeRegistry::new(),
            types: TypeRegistry::new(),
            call_stack: Vec::new(),
            failure_stack: None,
        };
        env.load_prelude();
        env
    }

    /// The configuration.
    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut EvalConfig {
        &mut self.config
    }

    /// Registered natives.
    pub fn natives(&self) -> &NativeRegistry {
        &self.natives
    }

    /// Mutable access to the natives.
    pub fn natives_mut(&mut self) -> &mut NativeRegistry {
        &mut self.natives
    }

    /// Registered custom types.
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Mutable access to the custom types.
    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    // ═══════════════════════════════════════════════════════════════════
    // Call Depth Tracking (Stack Overflow Protection)
    // ═══════════════════════════════════════════════════════════════════

    /// Enter a function call. Returns error if max depth exceeded.
    pub fn enter_call(&mut self, name: impl Into<String>) -> Result<(), EvalError> {
        if self.call_stack.len() >= self.config.max_call_depth {
            return Err(EvalError::StackOverflow {
                depth: self.call_stack.len(),
                max: self.config.max_call_depth,
            });
        }
        let name = name.into();
        trace!(function = %name, depth = self.call_stack.len() + 1, "enter call");
        self.call_stack.push(name);
        Ok(())
    }

    /// Exit a function call.
    pub fn exit_call(&mut self) {
        self.call_stack.pop();
    }

    /// Get current call depth.
    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    /// Functions currently executing, outermost first.
    pub fn call_stack(&self) -> &[String] {
        &self.call_stack
    }

    /// Remember the call stack at the point an error was raised. Only the
    /// innermost failure is kept.
    pub fn record_failure(&mut self) {
        if self.failure_stack.is_none() {
            self.failure_stack = Some(self.call_stack.clone());
        }
    }

    /// Take the recorded stack, falling back to the current one.
    pub fn take_failure_stack(&mut self) -> Vec<String> {
        self.failure_stack
            .take()
            .unwrap_or_else(|| self.call_stack.clone())
    }

    /// Fail if evaluation was interrupted.
    pub fn check_interrupt(&self) -> Result<(), EvalError> {
        if self.config.is_interrupted() {
            return Err(EvalError::Interrupted);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_overflow() {
        let mut env = Environment::with_config(EvalConfig::with_max_call_depth(2));
        env.enter_call("a").unwrap();
        env.enter_call("b").unwrap();
        let err = env.enter_call("c").unwrap_err();
        assert!(matches!(err, EvalError::StackOverflow { depth: 2, max: 2 }));
    }

    #[test]
    fn test_failure_stack_keeps_innermost() {
        let mut env = Environment::new();
        env.enter_call("outer").unwrap();
        env.enter_call("inner").unwrap();
        env.record_failure();
        env.exit_call();
        env.record_failure();
        env.exit_call();
        assert_eq!(env.take_failure_stack(), vec!["outer", "inner"]);
        assert!(env.take_failure_stack().is_empty());
    }

    #[test]
    fn test_registry_replaces() {
        let mut natives = NativeRegistry::new();
        natives.register("m", "f", 0, |_| Ok(Value::from(1.0)));
        natives.register("m", "f", 0, |_| Ok(Value::from(2.0)));
        assert_eq!(natives.len(), 1);
        let f = natives.find("m", "f").unwrap();
        assert_eq!((f.func)(&[]), Ok(Value::from(2.0)));
        assert!(!natives.contains("other", "f"));
    }

    #[test]
    fn test_prelude_registers_core_natives() {
        let env = Environment::new();
        for name in ["print", "range", "str", "sqrt", "abs", "floor", "round"] {
            assert!(env.natives().contains(CORE_MODULE, name), "{name}");
        }
    }

    #[test]
    fn test_interrupt() {
        let env = Environment::new();
        assert!(env.check_interrupt().is_ok());
        env.config().interrupt();
        assert!(matches!(env.check_interrupt(), Err(EvalError::Interrupted)));
    }
}
