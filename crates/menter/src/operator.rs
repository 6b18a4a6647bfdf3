//! Operator table
//!
//! Each operator carries its symbol, precedence (higher binds tighter), its
//! operand shape and an optional evaluation function. The parser generates
//! one rewrite rule per precedence tier from this table, so extending the
//! table extends the grammar.

use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::value::{Number, Value};

/// Evaluation function of an operator. `None` means the operator is not
/// defined for the given operands.
pub type OperatorFn = fn(&[Value]) -> Option<Value>;

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

fn next_table_id() -> u64 {
    NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed)
}

/// A single operator definition.
#[derive(Clone)]
pub struct Operator {
    symbol: String,
    precedence: u32,
    takes_left: bool,
    takes_right: bool,
    creates_rule: bool,
    eval: Option<OperatorFn>,
}

impl Operator {
    /// A binary operator `L op R`.
    pub fn binary(symbol: impl Into<String>, precedence: u32, eval: Option<OperatorFn>) -> Self {
        Self::new(symbol, precedence, true, true, eval)
    }

    /// A prefix operator `op R`.
    pub fn prefix(symbol: impl Into<String>, precedence: u32, eval: Option<OperatorFn>) -> Self {
        Self::new(symbol, precedence, false, true, eval)
    }

    /// A postfix operator `L op`.
    pub fn postfix(symbol: impl Into<String>, precedence: u32, eval: Option<OperatorFn>) -> Self {
        Self::new(symbol, precedence, true, false, eval)
    }

    fn new(
        symbol: impl Into<String>,
        precedence: u32,
        takes_left: bool,
        takes_right: bool,
        eval: Option<OperatorFn>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            precedence,
            takes_left,
            takes_right,
            creates_rule: true,
            eval,
        }
    }

    /// Mark the operator as handled by a dedicated parser rule.
    pub fn without_rule(mut self) -> Self {
        self.creates_rule = false;
        self
    }

    /// The operator symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(&self) -> u32 {
        self.precedence
    }

    /// Whether the operator takes an operand on its left.
    pub fn takes_left(&self) -> bool {
        self.takes_left
    }

    /// Whether the operator takes an operand on its right.
    pub fn takes_right(&self) -> bool {
        self.takes_right
    }

    /// Whether the parser generates a tier rule for this operator.
    pub fn creates_rule(&self) -> bool {
        self.creates_rule
    }

    /// Whether this is a binary operator.
    pub fn is_binary(&self) -> bool {
        self.takes_left && self.takes_right
    }

    /// Number of operands.
    pub fn arity(&self) -> usize {
        usize::from(self.takes_left) + usize::from(self.takes_right)
    }

    /// Whether the operator has an evaluation function.
    pub fn is_evaluable(&self) -> bool {
        self.eval.is_some()
    }

    /// Apply the operator. Returns `None` when there is no evaluation
    /// function or the operands are unsupported.
    pub fn evaluate(&self, operands: &[Value]) -> Option<Value> {
        self.eval.and_then(|f| f(operands))
    }

    /// The bracket form used for operator functions: `(+)`, `[!)`, `(x]`.
    pub fn bracket_form(&self) -> String {
        format!(
            "{}{}{}",
            if self.takes_left { "(" } else { "[" },
            self.symbol,
            if self.takes_right { ")" } else { "]" }
        )
    }
}

impl PartialEq for Operator {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
            && self.precedence == other.precedence
            && self.takes_left == other.takes_left
            && self.takes_right == other.takes_right
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.bracket_form(), self.precedence)
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Operator({self})")
    }
}

/// An operator table.
///
/// Tables are identified by an id that changes on every mutation, which
/// lets compiled rule sets be cached per table.
#[derive(Debug, Clone)]
pub struct Operators {
    id: u64,
    operators: Vec<Rc<Operator>>,
}

impl Default for Operators {
    fn default() -> Self {
        let mut table = Self::empty();
        for op in standard_operators() {
            table.operators.push(Rc::new(op));
        }
        table
    }
}

impl Operators {
    /// A table without any operators.
    pub fn empty() -> Self {
        Self {
            id: next_table_id(),
            operators: Vec::new(),
        }
    }

    /// Identity of this table revision.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Add an operator. The table receives a new identity.
    pub fn add(&mut self, operator: Operator) {
        self.operators.push(Rc::new(operator));
        self.id = next_table_id();
    }

    /// All operators in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Operator>> {
        self.operators.iter()
    }

    /// Find the operator with the given symbol and operand shape.
    pub fn find_operator(&self, symbol: &str, left: bool, right: bool) -> Option<Rc<Operator>> {
        self.operators
            .iter()
            .find(|op| op.symbol == symbol && op.takes_left == left && op.takes_right == right)
            .cloned()
    }

    /// All shapes registered for a symbol.
    pub fn find_operators(&self, symbol: &str) -> Vec<Rc<Operator>> {
        self.operators
            .iter()
            .filter(|op| op.symbol == symbol)
            .cloned()
            .collect()
    }

    /// All rule-creating operators of one precedence.
    pub fn with_precedence(&self, precedence: u32) -> Vec<Rc<Operator>> {
        self.operators
            .iter()
            .filter(|op| op.precedence == precedence && op.creates_rule)
            .cloned()
            .collect()
    }

    /// Distinct precedences of rule-creating operators, tightest first.
    pub fn rule_tiers(&self) -> Vec<u32> {
        let mut tiers: Vec<u32> = self
            .operators
            .iter()
            .filter(|op| op.creates_rule)
            .map(|op| op.precedence)
            .collect();
        tiers.sort_unstable_by(|a, b| b.cmp(a));
        tiers.dedup();
        tiers
    }

    /// Longest registered symbol that prefixes `text`.
    pub fn longest_prefix(&self, text: &str) -> Option<&str> {
        self.operators
            .iter()
            .map(|op| op.symbol.as_str())
            .filter(|symbol| text.starts_with(symbol))
            .max_by_key(|symbol| symbol.len())
    }
}

fn standard_operators() -> Vec<Operator> {
    vec![
        Operator::binary("->", 5, None).without_rule(),
        Operator::binary("=", 10, None).without_rule(),
        Operator::binary(":", 15, None).without_rule(),
        Operator::binary("|>", 20, None),
        Operator::binary(">|", 20, None),
        Operator::binary("||", 30, Some(op_or)),
        Operator::binary("&&", 40, Some(op_and)),
        Operator::binary("==", 80, Some(op_eq)),
        Operator::binary("!=", 80, Some(op_ne)),
        Operator::binary("<", 90, Some(op_lt)),
        Operator::binary(">", 90, Some(op_gt)),
        Operator::binary("<=", 90, Some(op_le)),
        Operator::binary(">=", 90, Some(op_ge)),
        Operator::binary("+", 110, Some(op_add)),
        Operator::binary("-", 110, Some(op_sub)),
        Operator::binary("*", 120, Some(op_mul)),
        Operator::binary("/", 120, Some(op_div)),
        Operator::binary("%", 120, Some(op_rem)),
        Operator::binary("^", 130, Some(op_pow)),
        Operator::prefix("!", 140, Some(op_not)),
        Operator::prefix("-", 140, Some(op_neg)),
    ]
}

// ═══════════════════════════════════════════════════════════════════════
// Operator Implementations
// ═══════════════════════════════════════════════════════════════════════

fn numbers(operands: &[Value]) -> Option<(Number, Number)> {
    match operands {
        [a, b] => Some((a.as_number()?, b.as_number()?)),
        _ => None,
    }
}

fn op_add(operands: &[Value]) -> Option<Value> {
    match operands {
        [Value::Number(a), Value::Number(b)] => Some(Value::Number(a + b)),
        [Value::String(a), b] => Some(Value::string(format!("{a}{b}"))),
        [a, Value::String(b)] => Some(Value::string(format!("{a}{b}"))),
        [Value::Array(a), Value::Array(b)] => {
            let items = a.borrow().iter().chain(b.borrow().iter()).map(|c| c.get()).collect();
            Some(Value::array(items))
        }
        [Value::Map(a), Value::Map(b)] => {
            let entries: Vec<_> = a
                .borrow()
                .iter()
                .chain(b.borrow().iter())
                .map(|(k, v)| (k.clone(), v.get()))
                .collect();
            Some(Value::map(entries))
        }
        _ => numbers(operands).map(|(a, b)| Value::Number(&a + &b)),
    }
}

fn op_sub(operands: &[Value]) -> Option<Value> {
    numbers(operands).map(|(a, b)| Value::Number(&a - &b))
}

fn op_mul(operands: &[Value]) -> Option<Value> {
    numbers(operands).map(|(a, b)| Value::Number(&a * &b))
}

fn op_div(operands: &[Value]) -> Option<Value> {
    let (a, b) = numbers(operands)?;
    a.checked_div(&b).map(Value::Number)
}

fn op_rem(operands: &[Value]) -> Option<Value> {
    let (a, b) = numbers(operands)?;
    a.checked_rem(&b).map(Value::Number)
}

fn op_pow(operands: &[Value]) -> Option<Value> {
    let (a, b) = numbers(operands)?;
    a.pow(&b).map(Value::Number)
}

fn op_neg(operands: &[Value]) -> Option<Value> {
    match operands {
        [v] => v.as_number().map(|n| Value::Number(-&n)),
        _ => None,
    }
}

fn op_not(operands: &[Value]) -> Option<Value> {
    match operands {
        [v] => Some(Value::Boolean(!v.is_truthy())),
        _ => None,
    }
}

fn op_and(operands: &[Value]) -> Option<Value> {
    match operands {
        [a, b] => Some(Value::Boolean(a.is_truthy() && b.is_truthy())),
        _ => None,
    }
}

fn op_or(operands: &[Value]) -> Option<Value> {
    match operands {
        [a, b] => Some(Value::Boolean(a.is_truthy() || b.is_truthy())),
        _ => None,
    }
}

fn op_eq(operands: &[Value]) -> Option<Value> {
    match operands {
        [a, b] => Some(Value::Boolean(a == b)),
        _ => None,
    }
}

fn op_ne(operands: &[Value]) -> Option<Value> {
    match operands {
        [a, b] => Some(Value::Boolean(a != b)),
        _ => None,
    }
}

fn compare(operands: &[Value], accept: fn(CmpOrdering) -> bool) -> Option<Value> {
    match operands {
        [a, b] => a.compare(b).map(|ord| Value::Boolean(accept(ord))),
        _ => None,
    }
}

fn op_lt(operands: &[Value]) -> Option<Value> {
    compare(operands, CmpOrdering::is_lt)
}

fn op_gt(operands: &[Value]) -> Option<Value> {
    compare(operands, CmpOrdering::is_gt)
}

fn op_le(operands: &[Value]) -> Option<Value> {
    compare(operands, CmpOrdering::is_le)
}

fn op_ge(operands: &[Value]) -> Option<Value> {
    compare(operands, CmpOrdering::is_ge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let ops = Operators::default();
        let plus = ops.find_operator("+", true, true).unwrap();
        assert_eq!(plus.to_string(), "(+) (110)");
        let not = ops.find_operator("!", false, true).unwrap();
        assert_eq!(not.to_string(), "[!) (140)");
    }

    #[test]
    fn test_find_by_shape() {
        let ops = Operators::default();
        assert_eq!(ops.find_operators("-").len(), 2);
        assert_eq!(ops.find_operator("-", false, true).unwrap().precedence(), 140);
        assert!(ops.find_operator("*", false, true).is_none());
    }

    #[test]
    fn test_rule_tiers_skip_dedicated_operators() {
        let tiers = Operators::default().rule_tiers();
        assert_eq!(tiers.first(), Some(&140));
        assert_eq!(tiers.last(), Some(&20));
        assert!(!tiers.contains(&10));
        assert!(!tiers.contains(&5));
    }

    #[test]
    fn test_add_changes_identity() {
        let mut ops = Operators::default();
        let before = ops.id();
        ops.add(Operator::binary("<>", 80, Some(op_ne)));
        assert_ne!(before, ops.id());
        assert_eq!(ops.longest_prefix("<>x"), Some("<>"));
    }

    #[test]
    fn test_longest_prefix() {
        let ops = Operators::default();
        assert_eq!(ops.longest_prefix("|>"), Some("|>"));
        assert_eq!(ops.longest_prefix("=-"), Some("="));
        assert_eq!(ops.longest_prefix("<="), Some("<="));
        assert_eq!(ops.longest_prefix("?"), None);
    }

    #[test]
    fn test_arithmetic() {
        let ops = Operators::default();
        let plus = ops.find_operator("+", true, true).unwrap();
        assert_eq!(
            plus.evaluate(&[Value::from(1.0), Value::from(2.0)]),
            Some(Value::from(3.0))
        );
        assert_eq!(
            plus.evaluate(&[Value::string("a"), Value::from(2.0)]),
            Some(Value::string("a2"))
        );
        let pow = ops.find_operator("^", true, true).unwrap();
        assert_eq!(
            pow.evaluate(&[Value::from(2.0), Value::from(10.0)]),
            Some(Value::from(1024.0))
        );
        assert_eq!(plus.evaluate(&[Value::Boolean(true), Value::Empty]), None);
    }

    #[test]
    fn test_division_by_zero_yields_nothing() {
        let ops = Operators::default();
        let div = ops.find_operator("/", true, true).unwrap();
        let rem = ops.find_operator("%", true, true).unwrap();
        assert_eq!(div.evaluate(&[Value::from(1), Value::from(0)]), None);
        assert_eq!(rem.evaluate(&[Value::from(1), Value::from(0)]), None);
        assert_eq!(
            div.evaluate(&[Value::from(1), Value::from(8)]),
            Some(Value::from(0.125))
        );
    }

    #[test]
    fn test_map_concatenation() {
        let ops = Operators::default();
        let plus = ops.find_operator("+", true, true).unwrap();
        let a = Value::map(vec![("a".to_string(), Value::from(1))]);
        let b = Value::map(vec![("b".to_string(), Value::from(2))]);
        let merged = plus.evaluate(&[a, b]).unwrap();
        assert_eq!(merged.to_string(), "{a: 1, b: 2}");
    }

    #[test]
    fn test_pipeline_has_no_evaluation() {
        let ops = Operators::default();
        let pipe = ops.find_operator("|>", true, true).unwrap();
        assert!(!pipe.is_evaluable());
        assert_eq!(pipe.evaluate(&[Value::Empty, Value::Empty]), None);
    }
}
