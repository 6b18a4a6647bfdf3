//! Core unit with built-in native functions

use super::Environment;
use crate::value::{Number, Value};

/// Module the core natives are registered under and exported as.
pub const CORE_MODULE: &str = "common";

/// Source identifier of the core unit.
pub const CORE_SOURCE_NAME: &str = "core.mtr";

/// Source of the core unit, loaded by every runtime unless disabled.
pub const CORE_SOURCE: &str = "\
native print(value)
native range(from, to)
native str(value)
native sqrt(x)
native abs(x)
native floor(x)
native round(x)
export [print, range, str, sqrt, abs, floor, round] as common
";

impl Environment {
    /// Register the natives declared by the core unit.
    pub(crate) fn load_prelude(&mut self) {
        let natives = self.natives_mut();

        // Output
        natives.register(CORE_MODULE, "print", -1, builtin_print);

        // Conversion and sequences
        natives.register(CORE_MODULE, "range", 2, builtin_range);
        natives.register(CORE_MODULE, "str", 1, builtin_str);

        // Math
        natives.register(CORE_MODULE, "sqrt", 1, builtin_sqrt);
        natives.register(CORE_MODULE, "abs", 1, |args| math("abs", args, Number::abs));
        natives.register(CORE_MODULE, "floor", 1, |args| math("floor", args, Number::floor));
        natives.register(CORE_MODULE, "round", 1, |args| math("round", args, Number::round));
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in Function Implementations
// ═══════════════════════════════════════════════════════════════════════

fn number_arg(name: &str, args: &[Value], index: usize) -> Result<Number, String> {
    let arg = args
        .get(index)
        .ok_or_else(|| format!("{name} expects at least {} arguments", index + 1))?;
    arg.as_number()
        .ok_or_else(|| format!("{name} expects a number, got {}", arg.type_name()))
}

fn builtin_print(args: &[Value]) -> Result<Value, String> {
    let line = args
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    println!("{line}");
    Ok(Value::Empty)
}

/// Inclusive on both ends, counting down when `from > to`.
fn builtin_range(args: &[Value]) -> Result<Value, String> {
    let bound = |index: usize| {
        number_arg("range", args, index)?
            .round()
            .to_i64()
            .ok_or_else(|| "range bounds must fit a 64-bit integer".to_string())
    };
    let (from, to) = (bound(0)?, bound(1)?);
    let items: Vec<Value> = if from <= to {
        (from..=to).map(Value::from).collect()
    } else {
        (to..=from).rev().map(Value::from).collect()
    };
    Ok(Value::array(items))
}

fn builtin_str(args: &[Value]) -> Result<Value, String> {
    match args {
        [value] => Ok(Value::string(value.to_string())),
        _ => Err(format!("str expects 1 argument, got {}", args.len())),
    }
}

fn builtin_sqrt(args: &[Value]) -> Result<Value, String> {
    let n = number_arg("sqrt", args, 0)?;
    n.sqrt()
        .map(Value::Number)
        .ok_or_else(|| format!("sqrt expects a non-negative number, got {n}"))
}

fn math(name: &str, args: &[Value], op: fn(&Number) -> Number) -> Result<Value, String> {
    Ok(Value::Number(op(&number_arg(name, args, 0)?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_inclusive_both_directions() {
        let up = builtin_range(&[Value::from(1.0), Value::from(3.0)]).unwrap();
        assert_eq!(up, Value::from(vec![1.0, 2.0, 3.0]));
        let down = builtin_range(&[Value::from(2.0), Value::from(0.0)]).unwrap();
        assert_eq!(down, Value::from(vec![2.0, 1.0, 0.0]));
    }

    #[test]
    fn test_str_and_math() {
        assert_eq!(builtin_str(&[Value::from(4.0)]), Ok(Value::string("4")));
        assert_eq!(builtin_sqrt(&[Value::from(9)]), Ok(Value::from(3)));
        assert!(builtin_sqrt(&[Value::from(-1)]).is_err());
        assert_eq!(math("round", &[Value::from(2.5)], Number::round), Ok(Value::from(3)));
        let err = math("abs", &[Value::string("x")], Number::abs).unwrap_err();
        assert_eq!(err, "abs expects a number, got string");
    }
}
