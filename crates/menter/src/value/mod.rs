//! Value representation for runtime values

mod callable;
pub mod custom;
mod display;
mod impls;
mod number;
mod refs;

pub use callable::{
    BoundMethod, BuiltinMethod, CustomMethodPtr, FunctionValue, MethodKind, NativeFn, NativeFnPtr,
};
pub use custom::{CustomType, MethodRegistry, TypeEntry, TypeRegistry};
pub use number::{Number, DIVISION_PRECISION};
pub use refs::{SymbolTable, ValueCell};

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use regex::Regex;

/// Runtime value representation for the Menter interpreter.
///
/// Scalars are stored inline. Arrays and maps hold cells behind a shared
/// pointer, so copying a compound value aliases it and element assignment
/// is visible through every copy.
#[derive(Clone, Default)]
pub enum Value {
    // ═══════════════════════════════════════════════════════════════════
    // Scalars
    // ═══════════════════════════════════════════════════════════════════
    /// Absence of a value (`null`)
    #[default]
    Empty,

    /// Arbitrary-precision decimal number
    Number(Number),

    /// Boolean: `true` or `false`
    Boolean(bool),

    /// Immutable string
    String(Rc<str>),

    /// Compiled regular expression
    Regex(Rc<Regex>),

    // ═══════════════════════════════════════════════════════════════════
    // Compound Types (shared by reference)
    // ═══════════════════════════════════════════════════════════════════
    /// Dense array
    Array(Rc<RefCell<Vec<ValueCell>>>),

    /// Insertion-ordered map
    Map(Rc<RefCell<IndexMap<String, ValueCell>>>),

    // ═══════════════════════════════════════════════════════════════════
    // Callable Types
    // ═══════════════════════════════════════════════════════════════════
    /// Interpreted function
    Function(Rc<FunctionValue>),

    /// Host function
    Native(NativeFn),

    /// Method bound to a receiver
    Method(Rc<BoundMethod>),

    // ═══════════════════════════════════════════════════════════════════
    // Host Types
    // ═══════════════════════════════════════════════════════════════════
    /// Instance of a registered custom type
    Custom(Rc<RefCell<dyn CustomType>>),
}
