//! Callable value types: interpreted functions, natives and bound methods

use std::fmt;
use std::rc::Rc;

use crate::module::GlobalContext;
use crate::parser::Element;

use super::custom::CustomType;
use super::{SymbolTable, Value};

/// Host function signature for natives.
pub type NativeFnPtr = Rc<dyn Fn(&[Value]) -> Result<Value, String>>;

/// Host function signature for custom-type methods.
pub type CustomMethodPtr = Rc<dyn Fn(&mut dyn CustomType, &[Value]) -> Result<Value, String>>;

/// An interpreted function.
///
/// Holds the defining context so the body resolves globals there, and the
/// locals visible where it was created.
pub struct FunctionValue {
    /// Declared name, if any
    pub name: Option<String>,
    /// Parameter names
    pub params: Vec<String>,
    /// The body
    pub body: Rc<Element>,
    /// Defining evaluation unit
    pub context: Rc<GlobalContext>,
    /// Locals captured at creation
    pub captured: SymbolTable,
}

impl FunctionValue {
    /// Name for messages and call stacks.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("anonymous")
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({}({}))", self.display_name(), self.params.join(", "))
    }
}

/// A host function.
#[derive(Clone)]
pub struct NativeFn {
    /// Function name
    pub name: String,
    /// Arity (-1 for variadic)
    pub arity: i32,
    /// The host function
    pub func: NativeFnPtr,
}

impl NativeFn {
    /// Wrap a host closure.
    pub fn new(
        name: impl Into<String>,
        arity: i32,
        func: impl Fn(&[Value]) -> Result<Value, String> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            func: Rc::new(func),
        }
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFn({})", self.name)
    }
}

/// Methods every value kind understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BuiltinMethod {
    Type,
    Size,
    Keys,
    Values,
    Map,
    Filter,
    Contains,
    Join,
    Push,
}

impl BuiltinMethod {
    /// Look a method up by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "type" => BuiltinMethod::Type,
            "size" => BuiltinMethod::Size,
            "keys" => BuiltinMethod::Keys,
            "values" => BuiltinMethod::Values,
            "map" => BuiltinMethod::Map,
            "filter" => BuiltinMethod::Filter,
            "contains" => BuiltinMethod::Contains,
            "join" => BuiltinMethod::Join,
            "push" => BuiltinMethod::Push,
            _ => return None,
        })
    }

    /// The method name.
    pub fn name(self) -> &'static str {
        match self {
            BuiltinMethod::Type => "type",
            BuiltinMethod::Size => "size",
            BuiltinMethod::Keys => "keys",
            BuiltinMethod::Values => "values",
            BuiltinMethod::Map => "map",
            BuiltinMethod::Filter => "filter",
            BuiltinMethod::Contains => "contains",
            BuiltinMethod::Join => "join",
            BuiltinMethod::Push => "push",
        }
    }
}

/// How a bound method is implemented.
#[derive(Clone)]
pub enum MethodKind {
    /// A built-in value method, run by the evaluator
    Builtin(BuiltinMethod),
    /// A method from a custom type's registry
    Custom(CustomMethodPtr),
}

/// A method bound to its receiver by an accessor.
#[derive(Clone)]
pub struct BoundMethod {
    /// Method name
    pub name: String,
    /// The value the method was read from
    pub receiver: Value,
    /// Implementation
    pub kind: MethodKind,
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoundMethod({}.{})", self.receiver.type_name(), self.name)
    }
}
