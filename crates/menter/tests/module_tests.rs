use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use menter::*;
use pretty_assertions::assert_eq;

fn bare() -> Runtime {
    Runtime::with_options(ModuleOptions::bare()).expect("runtime")
}

fn eval_error(result: Result<Value>) -> EvalError {
    match result {
        Err(MenterError::Eval(err)) => err.root_cause().clone(),
        Err(other) => panic!("expected an evaluation error, got {other}"),
        Ok(value) => panic!("expected an error, got {value}"),
    }
}

const MATH: &str = "\
factor = 3
add(a, b) = a + b
times(x) = x * factor
export [add, times] as Math";

// ═══════════════════════════════════════════════════════════════════════
// Evaluation Order
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_units_evaluated_after_their_imports() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let mut runtime = bare();
    for unit in ["a", "b", "c"] {
        let order = Rc::clone(&order);
        runtime.register_native(unit, "record", 1, move |args| {
            order.borrow_mut().push(args[0].to_string());
            Ok(Value::Empty)
        });
    }

    let a = "import B\nnative record(name)\nrecord(\"a\")\nvalue = B.base + 1\nexport [value] as A";
    let b = "native record(name)\nrecord(\"b\")\nbase = 10\nexport [base] as B";
    let c = "import A\nnative record(name)\nrecord(\"c\")\nresult = A.value * 2";
    runtime.load_source("a.mtr", a).unwrap();
    runtime.load_source("b.mtr", b).unwrap();
    runtime.load_source("c.mtr", c).unwrap();
    runtime.finish_loading().unwrap();

    assert_eq!(*order.borrow(), vec!["b", "a", "c"]);
    assert_eq!(runtime.get_variable("c", "result"), Some(Value::from(22.0)));
}

#[test]
fn test_circular_imports_rejected() {
    let mut runtime = bare();
    runtime.load_source("a.mtr", "import B\nx = 1\nexport [x] as A").unwrap();
    runtime.load_source("b.mtr", "import A\ny = 2\nexport [y] as B").unwrap();
    let err = eval_error(runtime.finish_loading().map(|_| Value::Empty));
    let EvalError::CircularDependency { sources } = err else {
        panic!("expected a circular dependency, got {err}");
    };
    assert_eq!(sources, vec!["a.mtr", "b.mtr"]);
}

#[test]
fn test_import_by_source_name_orders_units() {
    let mut runtime = bare();
    runtime.load_source("main.mtr", "import setup\ndone = true").unwrap();
    runtime.load_source("setup.mtr", "ready = 1").unwrap();
    runtime.finish_loading().unwrap();
    assert_eq!(runtime.get_variable("main", "done"), Some(Value::Boolean(true)));
}

#[test]
fn test_unknown_module() {
    let mut runtime = bare();
    let err = eval_error(runtime.evaluate("import Nope\n1"));
    assert!(matches!(err, EvalError::ModuleNotFound { ref name, .. } if name == "Nope"), "{err}");
}

// ═══════════════════════════════════════════════════════════════════════
// Import Forms
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_named_import() {
    let mut runtime = bare();
    runtime.load_source("math.mtr", MATH).unwrap();
    runtime.finish_loading().unwrap();
    assert_eq!(runtime.evaluate("import Math\nMath.add(1, 2)").unwrap(), Value::from(3.0));
}

#[test]
fn test_aliased_import() {
    let mut runtime = bare();
    runtime.load_source("math.mtr", MATH).unwrap();
    runtime.finish_loading().unwrap();
    assert_eq!(runtime.evaluate("import Math as M\nM.add(1, 2)").unwrap(), Value::from(3.0));
}

#[test]
fn test_inline_import() {
    let mut runtime = bare();
    runtime.load_source("math.mtr", MATH).unwrap();
    runtime.finish_loading().unwrap();
    assert_eq!(runtime.evaluate("import Math inline\nadd(2, 2)").unwrap(), Value::from(4.0));
}

#[test]
fn test_module_function_sees_its_own_globals() {
    let mut runtime = bare();
    runtime.load_source("math.mtr", MATH).unwrap();
    runtime.finish_loading().unwrap();
    assert_eq!(runtime.evaluate("import Math\nMath.times(2)").unwrap(), Value::from(6.0));
}

#[test]
fn test_unexported_symbol_not_visible() {
    let mut runtime = bare();
    runtime.load_source("math.mtr", MATH).unwrap();
    runtime.finish_loading().unwrap();
    let err = eval_error(runtime.evaluate("import Math\nMath.factor"));
    assert!(matches!(err, EvalError::UnresolvedSymbol { .. }), "{err}");
}

#[test]
fn test_auto_import() {
    let options = ModuleOptions::bare().with_auto_import(Import::inline("Math"));
    let mut runtime = Runtime::with_options(options).unwrap();
    runtime.load_source("math.mtr", MATH).unwrap();
    runtime.finish_loading().unwrap();
    assert_eq!(runtime.evaluate("add(5, 5)").unwrap(), Value::from(10.0));
}

#[test]
fn test_core_is_auto_imported() {
    let mut runtime = Runtime::new().unwrap();
    assert_eq!(runtime.evaluate("floor(2.7)").unwrap(), Value::from(2.0));
}

// ═══════════════════════════════════════════════════════════════════════
// Natives
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_native_bound_by_module_name() {
    let mut runtime = bare();
    runtime.register_native("Greeter", "greet", 1, |args| {
        Ok(Value::string(format!("hello {}", args[0])))
    });
    runtime
        .load_source("greeter.mtr", "native greet(name)\nexport [greet] as Greeter")
        .unwrap();
    runtime.finish_loading().unwrap();
    assert_eq!(
        runtime.evaluate("import Greeter\nGreeter.greet(\"you\")").unwrap(),
        Value::string("hello you")
    );
}

#[test]
fn test_missing_native() {
    let mut runtime = bare();
    runtime.load_source("lib.mtr", "native nothing()").unwrap();
    let err = eval_error(runtime.finish_loading().map(|_| Value::Empty));
    assert!(matches!(err, EvalError::NativeNotFound { .. }), "{err}");
}

// ═══════════════════════════════════════════════════════════════════════
// Persistent Contexts
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_evaluate_in_context_of_keeps_globals() {
    let mut runtime = Runtime::new().unwrap();
    runtime.evaluate_in_context_of("x = 41", "repl").unwrap();
    assert_eq!(runtime.evaluate_in_context_of("x + 1", "repl").unwrap(), Value::from(42.0));
    assert_eq!(runtime.get_variable("repl", "x"), Some(Value::from(41.0)));
}

#[test]
fn test_evaluate_is_ephemeral() {
    let mut runtime = Runtime::new().unwrap();
    runtime.evaluate("y = 1").unwrap();
    let err = eval_error(runtime.evaluate("y"));
    assert!(matches!(err, EvalError::UnresolvedSymbol { .. }), "{err}");
}

// ═══════════════════════════════════════════════════════════════════════
// Custom Types
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug)]
struct Counter {
    count: Number,
}

impl CustomType for Counter {
    fn type_name(&self) -> &str {
        "Counter"
    }

    fn access(&self, key: &Value) -> Option<ValueCell> {
        (key.as_str() == Some("count")).then(|| ValueCell::new(Value::Number(self.count.clone())))
    }

    fn numeric_value(&self) -> Option<Number> {
        Some(self.count.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn counter_type() -> TypeEntry {
    let methods = MethodRegistry::new().with("inc", |this, args| {
        let counter = this
            .as_any_mut()
            .downcast_mut::<Counter>()
            .ok_or("not a counter")?;
        let step = args.first().and_then(Value::as_number).unwrap_or(Number::from(1));
        counter.count = &counter.count + &step;
        Ok(Value::Number(counter.count.clone()))
    });
    TypeEntry::new("Counters", "Counter", |args| {
        let start = args.first().and_then(Value::as_number).unwrap_or_else(Number::zero);
        Ok(Value::custom(Counter { count: start }))
    })
    .with_methods(methods)
}

#[test]
fn test_custom_type_constructor_and_methods() {
    let mut runtime = Runtime::new().unwrap();
    runtime.register_type(counter_type());
    let src = "c = new Counter(5)\nc.inc()\nc.inc(2)\nc.count";
    assert_eq!(runtime.evaluate(src).unwrap(), Value::from(8.0));
}

#[test]
fn test_custom_type_reports_type() {
    let mut runtime = Runtime::new().unwrap();
    runtime.register_type(counter_type());
    assert_eq!(
        runtime.evaluate("c = new Counter()\nc.type()").unwrap(),
        Value::string("Counter")
    );
}

#[test]
fn test_unknown_type() {
    let mut runtime = Runtime::new().unwrap();
    let err = eval_error(runtime.evaluate("new Missing()"));
    assert!(matches!(err, EvalError::UnknownType { .. }), "{err}");
}
