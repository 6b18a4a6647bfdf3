use menter::*;
use pretty_assertions::assert_eq;

// Helper to evaluate a snippet in a fresh runtime
fn eval(src: &str) -> Result<Value> {
    Runtime::new().expect("runtime").evaluate(src)
}

// Helper returning the innermost evaluation error
fn eval_err(src: &str) -> EvalError {
    match eval(src) {
        Err(MenterError::Eval(err)) => err.root_cause().clone(),
        Err(other) => panic!("expected an evaluation error, got {other}"),
        Ok(value) => panic!("expected an error, got {value}"),
    }
}

fn num(n: f64) -> Value {
    Value::from(n)
}

fn decimal(text: &str) -> Value {
    Value::Number(text.parse().expect("decimal literal"))
}

// ═══════════════════════════════════════════════════════════════════════
// Literals and Operators
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_literals() {
    assert_eq!(eval("42").unwrap(), num(42.0));
    assert_eq!(eval("2.5").unwrap(), num(2.5));
    assert_eq!(eval("true").unwrap(), Value::Boolean(true));
    assert_eq!(eval("\"hi\"").unwrap(), Value::string("hi"));
    assert_eq!(eval("'hi'").unwrap(), Value::string("hi"));
    assert_eq!(eval("null").unwrap(), Value::Empty);
}

#[test]
fn test_decimal_arithmetic_is_exact() {
    assert_eq!(eval("0.1 + 0.2 == 0.3").unwrap(), Value::Boolean(true));
    assert_eq!(eval("0.1 + 0.2").unwrap().to_string(), "0.3");
    assert_eq!(eval("1.10 * 3").unwrap().to_string(), "3.3");
}

#[test]
fn test_integers_beyond_float_precision() {
    assert_eq!(
        eval("9007199254740992 + 1").unwrap(),
        decimal("9007199254740993")
    );
    assert_eq!(
        eval("2 ^ 64").unwrap().to_string(),
        "18446744073709551616"
    );
    assert_eq!(
        eval("123456789012345678901234567890 * 10").unwrap(),
        decimal("1234567890123456789012345678900")
    );
}

#[test]
fn test_division_and_remainder() {
    assert_eq!(eval("1 / 4").unwrap(), num(0.25));
    assert_eq!(eval("-7 % 3").unwrap(), num(-1.0));
    assert!(matches!(eval_err("1 / 0"), EvalError::Operator { .. }));
}

#[test]
fn test_precedence() {
    assert_eq!(eval("1 + 2 * 4 + 6").unwrap(), num(15.0));
    assert_eq!(eval("(1 + 2) * 3").unwrap(), num(9.0));
    assert_eq!(eval("2 ^ 3 * 2").unwrap(), num(16.0));
    assert_eq!(eval("10 - 4 - 3").unwrap(), num(3.0));
}

#[test]
fn test_comparison_and_logic() {
    assert_eq!(eval("1 < 2 && 3 >= 3").unwrap(), Value::Boolean(true));
    assert_eq!(eval("!(1 == 1) || 2 != 2").unwrap(), Value::Boolean(false));
    assert_eq!(eval("-3 + 1").unwrap(), num(-2.0));
}

#[test]
fn test_string_and_array_concatenation() {
    assert_eq!(eval("\"a\" + \"b\"").unwrap(), Value::string("ab"));
    assert_eq!(eval("[1] + [2, 3]").unwrap(), Value::from(vec![1.0, 2.0, 3.0]));
}

#[test]
fn test_operator_type_error() {
    let err = eval_err("1 + true");
    assert!(matches!(err, EvalError::Operator { .. }), "{err}");
}

// ═══════════════════════════════════════════════════════════════════════
// Variables and Sharing
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_scalars_copied_on_assignment() {
    assert_eq!(eval("x = 5; y = x; x = 6; y").unwrap(), num(5.0));
}

#[test]
fn test_arrays_shared_by_reference() {
    assert_eq!(eval("a = [1]; b = a; b.push(2); a.size()").unwrap(), num(2.0));
}

#[test]
fn test_map_member_assignment() {
    let src = "m = {a: 1}\nm.b = 2\nm.c.d = 3\nm.a + m.b + m.c.d";
    assert_eq!(eval(src).unwrap(), num(6.0));
}

#[test]
fn test_index_access() {
    assert_eq!(eval("xs = [10, 20, 30]; xs[1]").unwrap(), num(20.0));
    assert_eq!(eval("xs = [10, 20, 30]; xs[-1]").unwrap(), num(30.0));
    assert_eq!(eval("m = {k: \"v\"}; key = \"k\"; m[key]").unwrap(), Value::string("v"));
}

#[test]
fn test_combined_assignment() {
    assert_eq!(eval("x = 2; x += 3; x *= 4; x").unwrap(), num(20.0));
}

#[test]
fn test_combined_assignment_on_missing_symbol() {
    let err = eval_err("missing += 1");
    assert!(matches!(err, EvalError::UnresolvedSymbol { .. }), "{err}");
}

#[test]
fn test_destructuring() {
    assert_eq!(eval("a, b = [1, 2]; a + b").unwrap(), num(3.0));
    assert_eq!(eval("a, b = [1]; b").unwrap(), Value::Empty);
}

#[test]
fn test_unresolved_symbol() {
    let err = eval_err("undefinedThing + 1");
    assert!(err.to_string().starts_with("Cannot resolve symbol 'undefinedThing'"));
}

// ═══════════════════════════════════════════════════════════════════════
// Functions
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_function_declaration_and_call() {
    assert_eq!(eval("foo(x) = x + 1; foo(4);").unwrap(), num(5.0));
}

#[test]
fn test_block_body_and_return() {
    let src = "sign(x) {\n  if (x < 0) return -1\n  1\n}\nsign(-5) + sign(5)";
    assert_eq!(eval(src).unwrap(), num(0.0));
}

#[test]
fn test_inline_functions() {
    assert_eq!(eval("twice = (x) -> x * 2; twice(21)").unwrap(), num(42.0));
    assert_eq!(eval("apply(f, v) = f(v); apply(x -> x + 1, 1)").unwrap(), num(2.0));
}

#[test]
fn test_recursion() {
    let src = "fact(n) = if (n <= 1) 1 else n * fact(n - 1)\nfact(5)";
    assert_eq!(eval(src).unwrap(), num(120.0));
}

#[test]
fn test_nested_function_recursion() {
    let block = "\
outer() {
  fact(n) { if (n <= 1) 1 else n * fact(n - 1) }
  fact(5)
}
outer()";
    assert_eq!(eval(block).unwrap(), num(120.0));

    let expression = "outer(k) {\n  down(n) = if (n <= 0) k else down(n - 1)\n  down(3)\n}\nouter(7)";
    assert_eq!(eval(expression).unwrap(), num(7.0));
}

#[test]
fn test_closure_keeps_state() {
    let src = "\
makeCounter() {
  count = 0
  () -> {
    count += 1
    count
  }
}
counter = makeCounter()
counter()
counter()";
    assert_eq!(eval(src).unwrap(), num(2.0));
}

#[test]
fn test_function_locals_do_not_leak() {
    let src = "f() {\n  inner = 1\n  inner\n}\nf()\ninner";
    let err = eval_err(src);
    assert!(matches!(err, EvalError::UnresolvedSymbol { .. }), "{err}");
}

#[test]
fn test_function_writes_global() {
    assert_eq!(eval("total = 1\nbump() {\n  total = total + 1\n}\nbump()\ntotal").unwrap(), num(2.0));
}

#[test]
fn test_pipeline() {
    let src = "add(a, b) = a + b\ndouble(x) = x * 2\n1 |> add(2) |> double";
    assert_eq!(eval(src).unwrap(), num(6.0));
}

#[test]
fn test_prepend_pipeline() {
    assert_eq!(eval("sub(a, b) = a - b\n10 >| sub(4)").unwrap(), num(6.0));
}

#[test]
fn test_operator_function() {
    assert_eq!(eval("plus = (+); plus(2, 3)").unwrap(), num(5.0));
}

#[test]
fn test_arity_mismatch() {
    let err = eval_err("f(a, b) = a; f(1)");
    assert_eq!(err.to_string(), "Function f requires 2 arguments, but 1 were given");
}

#[test]
fn test_not_callable() {
    let err = eval_err("x = 1; x()");
    assert!(matches!(err, EvalError::NotCallable { .. }), "{err}");
}

#[test]
fn test_stack_overflow() {
    let mut runtime = Runtime::with_config(EvalConfig::with_max_call_depth(50)).unwrap();
    let err = runtime.evaluate("down(n) = down(n + 1)\ndown(0)").unwrap_err();
    let MenterError::Eval(err) = err else {
        panic!("expected an evaluation error");
    };
    assert!(matches!(err.root_cause(), EvalError::StackOverflow { max: 50, .. }));
    assert!(err.to_string().contains("at down"));
}

// ═══════════════════════════════════════════════════════════════════════
// Control Flow
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_conditional_branches() {
    let src = "pick(x) = if (x > 10) \"big\" elif (x > 5) \"mid\" else \"small\"";
    assert_eq!(eval(&format!("{src}\npick(11)")).unwrap(), Value::string("big"));
    assert_eq!(eval(&format!("{src}\npick(6)")).unwrap(), Value::string("mid"));
    assert_eq!(eval(&format!("{src}\npick(1)")).unwrap(), Value::string("small"));
}

#[test]
fn test_else_if_merges_into_elif() {
    assert_eq!(eval("if (false) 1 else if (true) 2 else 3").unwrap(), num(2.0));
}

#[test]
fn test_instanceof() {
    assert_eq!(eval("x = 1; x instanceof \"number\"").unwrap(), Value::Boolean(true));
    assert_eq!(eval("xs = []; xs instanceof \"object\"").unwrap(), Value::Boolean(false));
}

#[test]
fn test_conditional_without_match_is_empty() {
    assert_eq!(eval("if (false) 1").unwrap(), Value::Empty);
}

#[test]
fn test_for_loop_sum() {
    assert_eq!(eval("sum = 0\nfor (x : [1, 2, 3]) sum += x\nsum").unwrap(), num(6.0));
}

#[test]
fn test_for_loop_over_map_pairs() {
    let src = "keys = \"\"\nfor ((k, v) : {a: 1, b: 2}) keys += k\nkeys";
    assert_eq!(eval(src).unwrap(), Value::string("ab"));
}

#[test]
fn test_for_loop_over_range() {
    assert_eq!(eval("sum = 0\nfor (i : range(1, 4)) sum += i\nsum").unwrap(), num(10.0));
}

#[test]
fn test_while_with_break_and_continue() {
    let src = "\
i = 0
odd = 0
while (true) {
  i += 1
  if (i > 9) break
  if (i % 2 == 0) continue
  odd += 1
}
odd";
    assert_eq!(eval(src).unwrap(), num(5.0));
}

#[test]
fn test_break_outside_loop() {
    let err = eval_err("f() { break }\nf()");
    assert!(matches!(err, EvalError::LoopControlOutsideLoop { .. }), "{err}");
}

#[test]
fn test_top_level_return() {
    assert_eq!(eval("return 7\n8").unwrap(), num(7.0));
}

// ═══════════════════════════════════════════════════════════════════════
// Builtin Methods and Core Functions
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_collection_methods() {
    assert_eq!(
        eval("xs = [1, 2, 3]; xs.map(x -> x * 10)").unwrap(),
        Value::from(vec![10.0, 20.0, 30.0])
    );
    assert_eq!(
        eval("xs = [1, 2, 3, 4]; xs.filter(x -> x % 2 == 0)").unwrap(),
        Value::from(vec![2.0, 4.0])
    );
    assert_eq!(eval("xs = [\"a\", \"b\"]; xs.join(\"-\")").unwrap(), Value::string("a-b"));
    assert_eq!(eval("m = {a: 1, b: 2}; m.keys()").unwrap(), Value::from(vec!["a", "b"]));
    assert_eq!(eval("xs = [1, 2]; xs.contains(2)").unwrap(), Value::Boolean(true));
}

#[test]
fn test_type_method() {
    assert_eq!(eval("x = 1; x.type()").unwrap(), Value::string("number"));
    assert_eq!(eval("s = \"abc\"; s.size()").unwrap(), num(3.0));
}

#[test]
fn test_method_chain() {
    let src = "xs = [1, 2, 3]\nxs.map(x -> x + 1).filter(x -> x > 2).size()";
    assert_eq!(eval(src).unwrap(), num(2.0));
}

#[test]
fn test_core_natives() {
    assert_eq!(eval("sqrt(16) + abs(-1)").unwrap(), num(5.0));
    assert_eq!(eval("str(12)").unwrap(), Value::string("12"));
    assert_eq!(eval("range(3, 1)").unwrap(), Value::from(vec![3.0, 2.0, 1.0]));
}

#[test]
fn test_native_error_is_wrapped() {
    let err = eval_err("sqrt(\"x\")");
    assert_eq!(err.to_string(), "Error in sqrt: sqrt expects a number, got string");
}

#[test]
fn test_regex_literal() {
    assert_eq!(eval("r/ab+/i").unwrap().type_name(), "regex");
}

// ═══════════════════════════════════════════════════════════════════════
// Error Reporting
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_error_names_statement() {
    let err = eval("a = 1\nb = a + nope").unwrap_err();
    let text = err.to_string();
    assert!(text.contains("in statement: b = a + nope"), "{text}");
}

#[test]
fn test_parse_error_surfaces() {
    assert!(matches!(eval("1 +"), Err(MenterError::Parse(_))));
}

#[test]
fn test_interrupt() {
    let mut runtime = Runtime::new().unwrap();
    runtime.env().config().interrupt();
    let err = runtime.evaluate("x = 1").unwrap_err();
    let MenterError::Eval(err) = err else {
        panic!("expected an evaluation error");
    };
    assert!(matches!(err.root_cause(), EvalError::Interrupted));
}
