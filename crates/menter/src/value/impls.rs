//! Value trait implementations: constructors, predicates, extractors, From traits, PartialEq

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use indexmap::IndexMap;
use regex::Regex;

use super::*;

// ═══════════════════════════════════════════════════════════════════
// Convenience Constructors
// ═══════════════════════════════════════════════════════════════════

impl Value {
    /// Create a string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(Rc::from(s.into()))
    }

    /// Create an array value, one fresh cell per item
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(
            items.into_iter().map(ValueCell::new).collect(),
        )))
    }

    /// Create a map value, one fresh cell per entry
    pub fn map(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        let map: IndexMap<String, ValueCell> = entries
            .into_iter()
            .map(|(k, v)| (k, ValueCell::new(v)))
            .collect();
        Value::Map(Rc::new(RefCell::new(map)))
    }

    /// Create a number value
    pub fn number(n: impl Into<Number>) -> Self {
        Value::Number(n.into())
    }

    /// Create a regex value
    pub fn regex(regex: Regex) -> Self {
        Value::Regex(Rc::new(regex))
    }

    /// Wrap a custom type instance
    pub fn custom<T: CustomType + 'static>(instance: T) -> Self {
        Value::Custom(Rc::new(RefCell::new(instance)))
    }

    /// Wrap a host function
    pub fn native(
        name: impl Into<String>,
        arity: i32,
        func: impl Fn(&[Value]) -> Result<Value, String> + 'static,
    ) -> Self {
        Value::Native(NativeFn::new(name, arity, func))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Type Predicates
    // ═══════════════════════════════════════════════════════════════════

    /// Name reported by `type()`
    pub fn type_name(&self) -> String {
        match self {
            Value::Empty => "empty".into(),
            Value::Number(_) => "number".into(),
            Value::Boolean(_) => "boolean".into(),
            Value::String(_) => "string".into(),
            Value::Regex(_) => "regex".into(),
            Value::Array(_) => "array".into(),
            Value::Map(_) => "object".into(),
            Value::Function(_) | Value::Native(_) | Value::Method(_) => "function".into(),
            Value::Custom(c) => c.borrow().type_name().to_string(),
        }
    }

    /// Check if value is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Check if value can be called
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Function(_) | Value::Native(_) | Value::Method(_)
        )
    }

    /// Truthiness in conditions and logical operators
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Empty => false,
            Value::Number(n) => !n.is_zero(),
            Value::Boolean(b) => *b,
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.borrow().is_empty(),
            Value::Map(map) => !map.borrow().is_empty(),
            Value::Custom(c) => c.borrow().is_truthy(),
            Value::Regex(_) | Value::Function(_) | Value::Native(_) | Value::Method(_) => true,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Value Extractors
    // ═══════════════════════════════════════════════════════════════════

    /// Extract a number, including a custom type's numeric value
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(n.clone()),
            Value::Custom(c) => c.borrow().numeric_value(),
            _ => None,
        }
    }

    /// Extract a number as the nearest float
    pub fn as_f64(&self) -> Option<f64> {
        self.as_number()?.to_f64()
    }

    /// Extract a non-negative integral index
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Value::Number(n) => n.to_index(),
            _ => None,
        }
    }

    /// Extract a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Element or entry count, for values that have one
    pub fn size(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(s.chars().count()),
            Value::Array(items) => Some(items.borrow().len()),
            Value::Map(map) => Some(map.borrow().len()),
            Value::Custom(c) => Some(c.borrow().size()),
            _ => None,
        }
    }

    /// Key form of a value when used as a map key
    pub fn key_string(&self) -> String {
        self.to_string()
    }

    /// Ordering for comparison operators
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Custom(a), Value::Custom(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Some(Ordering::Equal);
                }
                let ordering = a.borrow().compare(&*b.borrow());
                ordering.or_else(|| numeric_order(self, other))
            }
            _ => numeric_order(self, other),
        }
    }
}

fn numeric_order(a: &Value, b: &Value) -> Option<Ordering> {
    Some(a.as_number()?.compare(&b.as_number()?))
}

// ═══════════════════════════════════════════════════════════════════
// PartialEq
// ═══════════════════════════════════════════════════════════════════

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Empty, Value::Empty) => true,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Regex(a), Value::Regex(b)) => a.as_str() == b.as_str(),
            (Value::Array(a), Value::Array(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.get() == y.get())
            }
            (Value::Map(a), Value::Map(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|w| v.get() == w.get()))
            }
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(&a.func, &b.func),
            (Value::Method(a), Value::Method(b)) => Rc::ptr_eq(a, b),
            (Value::Custom(_), Value::Custom(_)) => self.compare(other) == Some(Ordering::Equal),
            _ => false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// From Implementations
// ═══════════════════════════════════════════════════════════════════

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

/// NaN and infinities have no decimal form and become `Empty`.
impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Value::Empty, Value::Number)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Empty, Into::into)
    }
}
