use std::cmp::Ordering;

use menter::*;
use pretty_assertions::assert_eq;

fn eval(src: &str) -> Value {
    Runtime::new().expect("runtime").evaluate(src).expect("eval failed")
}

// ═══════════════════════════════════════════════════════════════════════
// Construction and Display
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_display_forms() {
    assert_eq!(Value::from(7.0).to_string(), "7");
    assert_eq!(Value::from(0.5).to_string(), "0.5");
    assert_eq!(Value::Empty.to_string(), "null");
    assert_eq!(Value::from(vec!["a", "b"]).to_string(), "[\"a\", \"b\"]");
    assert_eq!(eval("m = {a: [1, 2]}").to_string(), "{a: [1, 2]}");
}

#[test]
fn test_function_display() {
    assert_eq!(eval("f(a, b) = a").to_string(), "<function f(a, b)>");
    assert_eq!(eval("(x) -> x").to_string(), "<function anonymous(x)>");
    assert_eq!(eval("abs").to_string(), "<native abs>");
}

#[test]
fn test_from_option() {
    assert_eq!(Value::from(Some(2.0)), Value::from(2.0));
    assert_eq!(Value::from(None::<f64>), Value::Empty);
}

// ═══════════════════════════════════════════════════════════════════════
// Type Names and Truthiness
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_type_names() {
    let cases = [
        ("1", "number"),
        ("\"s\"", "string"),
        ("true", "boolean"),
        ("[1]", "array"),
        ("m = {a: 1}", "object"),
        ("abs", "function"),
        ("null", "empty"),
    ];
    for (src, expected) in cases {
        assert_eq!(eval(src).type_name(), expected, "{src}");
    }
}

#[test]
fn test_truthiness_in_conditions() {
    assert_eq!(eval("if (0) 1 else 2"), Value::from(2.0));
    assert_eq!(eval("if (\"\") 1 else 2"), Value::from(2.0));
    assert_eq!(eval("if ([0]) 1 else 2"), Value::from(1.0));
    assert_eq!(eval("if (null) 1 else 2"), Value::from(2.0));
}

// ═══════════════════════════════════════════════════════════════════════
// Equality and Ordering
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_structural_equality_in_scripts() {
    assert_eq!(eval("[1, [2]] == [1, [2]]"), Value::Boolean(true));
    assert_eq!(eval("a = {a: 1}; b = {a: 2}; a == b"), Value::Boolean(false));
    assert_eq!(eval("1 == \"1\""), Value::Boolean(false));
}

#[test]
fn test_compare() {
    assert_eq!(Value::from(1.0).compare(&Value::from(2.0)), Some(Ordering::Less));
    assert_eq!(Value::string("b").compare(&Value::string("a")), Some(Ordering::Greater));
    assert_eq!(Value::string("a").compare(&Value::from(1.0)), None);
    assert_eq!(eval("\"apple\" < \"banana\""), Value::Boolean(true));
}

// ═══════════════════════════════════════════════════════════════════════
// Cells and Symbol Tables
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_cell_assignment_is_shared() {
    let cell = ValueCell::new(Value::from(1.0));
    let alias = cell.clone();
    alias.assign(Value::from(2.0));
    assert_eq!(cell.get(), Value::from(2.0));
    assert!(cell.ptr_eq(&alias));
}

#[test]
fn test_symbol_table_snapshot_shares_cells() {
    let table = SymbolTable::new();
    let cell = table.define("x", Value::from(1.0));
    let snapshot = table.snapshot();
    snapshot.define("y", Value::from(2.0));

    cell.assign(Value::from(5.0));
    assert_eq!(snapshot.get("x").map(|c| c.get()), Some(Value::from(5.0)));
    assert!(!table.contains("y"));
    assert_eq!(table.names(), vec!["x"]);
}

#[test]
fn test_map_keys_keep_insertion_order() {
    assert_eq!(
        eval("m = {z: 1}\nm.a = 2\nm.m = 3\nm.keys()"),
        Value::from(vec!["z", "a", "m"])
    );
}
