//! Display and Debug implementations for Value

use std::fmt;

use super::*;

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => write!(f, "null"),
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{:?}", s.as_ref()),
            Value::Regex(r) => write!(f, "r/{}/", r.as_str()),

            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}", item)?;
                }
                write!(f, "]")
            }

            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {:?}", k, v)?;
                }
                write!(f, "}}")
            }

            Value::Function(func) => {
                write!(f, "<function {}({})>", func.display_name(), func.params.join(", "))
            }
            Value::Native(native) => write!(f, "<native {}>", native.name),
            Value::Method(method) => {
                write!(f, "<method {}.{}>", method.receiver.type_name(), method.name)
            }
            Value::Custom(custom) => write!(f, "{}", custom.borrow().display()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s.as_ref()), // No quotes for Display
            _ => fmt::Debug::fmt(self, f),
        }
    }
}
