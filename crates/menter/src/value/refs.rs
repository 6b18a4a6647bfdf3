//! Shared value cells and symbol tables

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::Value;

/// A shared, mutable slot holding one value.
///
/// Symbol tables, arrays and maps store cells, so resolving a name yields
/// the slot itself and assignment writes through it.
#[derive(Clone, Default)]
pub struct ValueCell(Rc<RefCell<Value>>);

impl ValueCell {
    /// A new cell.
    pub fn new(value: Value) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// A copy of the current value. Compound values stay shared.
    pub fn get(&self) -> Value {
        self.0.borrow().clone()
    }

    /// Overwrite the value in place.
    pub fn assign(&self, value: Value) {
        *self.0.borrow_mut() = value;
    }

    /// Whether both cells are the same slot.
    pub fn ptr_eq(&self, other: &ValueCell) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Value> for ValueCell {
    fn from(value: Value) -> Self {
        ValueCell::new(value)
    }
}

impl fmt::Debug for ValueCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0.borrow())
    }
}

/// Name to cell bindings, shared by reference.
#[derive(Clone, Default)]
pub struct SymbolTable(Rc<RefCell<IndexMap<String, ValueCell>>>);

impl SymbolTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cell bound to `name`.
    pub fn get(&self, name: &str) -> Option<ValueCell> {
        self.0.borrow().get(name).cloned()
    }

    /// Bind `name` to `cell`, replacing any previous slot.
    pub fn bind(&self, name: impl Into<String>, cell: ValueCell) {
        self.0.borrow_mut().insert(name.into(), cell);
    }

    /// Bind `name` to a fresh cell holding `value`.
    pub fn define(&self, name: impl Into<String>, value: Value) -> ValueCell {
        let cell = ValueCell::new(value);
        self.bind(name, cell.clone());
        cell
    }

    /// Whether `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.0.borrow().contains_key(name)
    }

    /// A new table with the same bindings. Cells stay shared.
    pub fn snapshot(&self) -> SymbolTable {
        SymbolTable(Rc::new(RefCell::new(self.0.borrow().clone())))
    }

    /// Copy every binding of `other` into this table.
    pub fn extend_from(&self, other: &SymbolTable) {
        if self.ptr_eq(other) {
            return;
        }
        let entries: Vec<(String, ValueCell)> = other
            .0
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.0.borrow_mut().extend(entries);
    }

    /// Whether both handles refer to the same table.
    pub fn ptr_eq(&self, other: &SymbolTable) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Bound names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.0.borrow().keys().cloned().collect()
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.borrow().keys()).finish()
    }
}
