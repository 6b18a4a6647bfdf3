//! Rewrite rules
//!
//! A rule inspects the working sequence and either reports nothing, reports
//! a [`Rewrite`] (replace an inclusive span with new elements), or rejects
//! the input with a [`ParseError`]. Rules never mutate the sequence; the
//! driver applies rewrites.

mod normalize;
mod operators;
mod statements;
mod structure;

use std::ops::RangeInclusive;
use std::rc::Rc;

use crate::error::ParseError;
use crate::lexer::TokenKind;
use crate::operator::Operators;

use super::node::{Element, Node, NodeKind};

/// Replacement of an inclusive span of the working sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Rewrite {
    /// Inclusive span to replace
    pub span: RangeInclusive<usize>,
    /// Elements inserted in its place
    pub replacement: Vec<Element>,
}

impl Rewrite {
    /// Replace `span` with one node.
    pub fn node(span: RangeInclusive<usize>, node: Node) -> Self {
        Self {
            span,
            replacement: vec![Element::Node(node)],
        }
    }

    /// Replace `span` with arbitrary elements.
    pub fn elements(span: RangeInclusive<usize>, replacement: Vec<Element>) -> Self {
        Self { span, replacement }
    }

    /// Remove the element at `index`.
    pub fn remove(index: usize) -> Self {
        Self {
            span: index..=index,
            replacement: Vec::new(),
        }
    }

    /// Splice the rewrite into `elements`.
    pub fn apply(self, elements: &mut Vec<Element>) -> Result<(), ParseError> {
        let (start, end) = (*self.span.start(), *self.span.end());
        if start > end || end >= elements.len() {
            return Err(ParseError::syntax(format!(
                "Rewrite span {start}..={end} out of bounds for {} elements",
                elements.len()
            )));
        }
        elements.splice(start..=end, self.replacement);
        Ok(())
    }
}

/// Outcome of one rule application.
pub type RuleResult = Result<Option<Rewrite>, ParseError>;

type RuleFn = Box<dyn Fn(&[Element]) -> RuleResult>;

/// A named rewrite rule.
pub struct Rule {
    name: String,
    apply: RuleFn,
}

impl Rule {
    /// Create a rule from a function.
    pub fn new(name: impl Into<String>, apply: impl Fn(&[Element]) -> RuleResult + 'static) -> Self {
        Self {
            name: name.into(),
            apply: Box::new(apply),
        }
    }

    /// The rule name, for tracing.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the rule against the working sequence.
    pub fn apply(&self, elements: &[Element]) -> RuleResult {
        (self.apply)(elements)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rule({})", self.name)
    }
}

/// The compiled rules for one operator table.
#[derive(Debug)]
pub struct RuleSet {
    /// Normalization and validation rules, each run to its own fixed point
    pub apply_once: Vec<Rule>,
    /// Structural rules, rescanned from the first after every match
    pub repeat: Vec<Rule>,
}

impl RuleSet {
    /// Build the rule set for an operator table.
    pub fn build(operators: &Operators) -> Self {
        let table = Rc::new(operators.clone());

        let apply_once = vec![
            Rule::new("remove-comments", normalize::remove_comments),
            Rule::new("collapse-separators", normalize::collapse_separators),
            Rule::new("line-continuation", normalize::line_continuation),
            Rule::new("instanceof", normalize::instanceof),
            Rule::new("else-if", normalize::else_if),
            Rule::new("newline-before-else", normalize::newline_before_else),
            Rule::new("reserved-new", normalize::reserved_new),
            {
                let table = Rc::clone(&table);
                Rule::new("operator-function", move |els| {
                    normalize::operator_function(els, &table)
                })
            },
            Rule::new("bracket-balance", normalize::bracket_balance),
            Rule::new("after-closing-bracket", normalize::after_closing_bracket),
            Rule::new("literal-after-literal", normalize::literal_after_literal),
            Rule::new("identifier-after-identifier", normalize::identifier_after_identifier),
        ];

        let mut repeat = vec![
            Rule::new("pipeline", structure::pipeline),
            Rule::new("curly-to-map", structure::curly_to_map),
            Rule::new("curly-to-code-block", structure::curly_to_code_block),
            Rule::new("flatten-declaration", structure::flatten_declaration),
            Rule::new("import", structure::import),
            Rule::new("export", structure::export),
            Rule::new("function-call", structure::function_call),
            Rule::new("accessor", structure::accessor),
            Rule::new("array", structure::array),
            Rule::new("parenthesis-pair", structure::parenthesis_pair),
        ];

        for tier in operators.rule_tiers() {
            let table = Rc::clone(&table);
            let tier_ops = operators.with_precedence(tier);
            repeat.push(Rule::new(format!("operator-tier-{tier}"), move |els| {
                operators::operator_tier(els, tier, &tier_ops, &table)
            }));
        }

        {
            let table = Rc::clone(&table);
            repeat.push(Rule::new("combined-assignment", move |els| {
                operators::combined_assignment(els, &table)
            }));
        }
        {
            let table = Rc::clone(&table);
            repeat.push(Rule::new("function-inline", move |els| {
                operators::function_inline(els, &table)
            }));
        }

        repeat.extend([
            Rule::new("map-element", statements::map_element),
            Rule::new("curly-pair", structure::curly_pair),
            Rule::new("square-pair", structure::square_pair),
            Rule::new("listed-elements", structure::listed_elements),
            Rule::new("constructor", statements::constructor),
        ]);
        {
            let table = Rc::clone(&table);
            repeat.push(Rule::new("assignment", move |els| {
                statements::assignment(els, &table)
            }));
        }
        repeat.extend([
            Rule::new("conditional-bracket", statements::conditional_bracket),
            Rule::new("conditional", statements::conditional),
            Rule::new("for-bracket", statements::for_bracket),
            Rule::new("for-loop", statements::for_loop),
            Rule::new("while-bracket", statements::while_bracket),
            Rule::new("while-loop", statements::while_loop),
            Rule::new("declaration-by-assignment", statements::declaration_by_assignment),
            Rule::new("declaration-shorthand", statements::declaration_shorthand),
            Rule::new("reject-accessed-declaration", statements::reject_accessed_declaration),
            Rule::new("declaration-by-inline", statements::declaration_by_inline),
            Rule::new("native-declaration", statements::native_declaration),
            Rule::new("return", statements::return_statement),
            Rule::new("statement", statements::statement),
        ]);

        Self { apply_once, repeat }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Shared Rule Helpers
// ═══════════════════════════════════════════════════════════════════════

type Predicate = fn(&Element) -> bool;

/// Match a fixed window of predicates, first position wins.
///
/// The trailing `lookahead` predicates must hold but are not consumed.
/// `keep` filters the consumed elements and `map` turns each kept element
/// (with its window index) into the node's children.
fn in_order(
    elements: &[Element],
    kind: NodeKind,
    conditions: &[Predicate],
    lookahead: usize,
    keep: Predicate,
    map: fn(Element, usize) -> Result<Vec<Element>, ParseError>,
) -> RuleResult {
    let n = conditions.len();
    if elements.len() < n || n <= lookahead {
        return Ok(None);
    }
    for start in 0..=elements.len() - n {
        let window = &elements[start..start + n];
        if !window.iter().zip(conditions).all(|(el, cond)| cond(el)) {
            continue;
        }
        let consumed = n - lookahead;
        let mut children = Vec::new();
        for (i, el) in window[..consumed].iter().enumerate() {
            if keep(el) {
                children.extend(map(el.clone(), i)?);
            }
        }
        return Ok(Some(Rewrite::node(
            start..=start + consumed - 1,
            Node::with_children(kind, children),
        )));
    }
    Ok(None)
}

fn keep_all(_: &Element) -> bool {
    true
}

fn identity(el: Element, _: usize) -> Result<Vec<Element>, ParseError> {
    Ok(vec![el])
}

/// Match an open bracket up to its close bracket, collecting the contents.
///
/// Contents must be evaluable or allowed by `whitelist`; a nested open
/// bracket or anything else abandons the candidate. Comma lists are
/// flattened into the pair.
fn parenthesis_rule(
    elements: &[Element],
    open: TokenKind,
    close: TokenKind,
    kind: NodeKind,
    whitelist: Predicate,
    exclude: Predicate,
) -> RuleResult {
    let mut children: Vec<Element> = Vec::new();
    let mut start: Option<usize> = None;

    for (i, el) in elements.iter().enumerate() {
        if el.is_token(open) {
            start = Some(i);
            children.clear();
        } else if super::predicates::is_open_bracket(el) {
            start = None;
            children.clear();
        } else if let Some(begin) = start {
            if el.is_node(NodeKind::ListedElements) {
                children.extend(el.children().iter().cloned());
            } else if super::predicates::is_evaluable(el) || whitelist(el) {
                children.push(el.clone());
            } else if el.is_token(close) {
                children.retain(|c| !exclude(c));
                return Ok(Some(Rewrite::node(
                    begin..=i,
                    Node::with_children(kind, children),
                )));
            } else {
                start = None;
                children.clear();
            }
        }
    }
    Ok(None)
}

/// Normalize a body into a code block.
pub(crate) fn make_proper_code_block(el: Element) -> Node {
    let node = match el {
        Element::Token(_) => return Node::with_children(NodeKind::CodeBlock, vec![el]),
        Element::Node(node) => node,
    };
    match node.kind {
        NodeKind::CodeBlock => node,
        NodeKind::Map if node.is_leaf() => Node::new(NodeKind::CodeBlock),
        NodeKind::CurlyBracketPair => {
            let mut children = Vec::new();
            for child in node.children {
                match child {
                    Element::Node(n) if n.kind == NodeKind::Statement => {
                        children.extend(n.children)
                    }
                    other => children.push(other),
                }
            }
            Node::with_children(NodeKind::CodeBlock, children)
        }
        NodeKind::Statement => Node::with_children(NodeKind::CodeBlock, node.children),
        _ => Node::with_children(NodeKind::CodeBlock, vec![Element::Node(node)]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Element {
        Element::token(TokenKind::Identifier, name)
    }

    #[test]
    fn test_rewrite_apply_bounds_checked() {
        let mut els = vec![ident("a"), ident("b")];
        assert!(Rewrite::remove(2).apply(&mut els).is_err());
        Rewrite::remove(0).apply(&mut els).unwrap();
        assert_eq!(els, vec![ident("b")]);
    }

    #[test]
    fn test_make_proper_code_block() {
        let statement = Node::with_children(NodeKind::Statement, vec![ident("a")]);
        let curly = Node::with_children(NodeKind::CurlyBracketPair, vec![statement.into()]);
        let block = make_proper_code_block(curly.into());
        assert_eq!(block, Node::with_children(NodeKind::CodeBlock, vec![ident("a")]));

        let block = make_proper_code_block(Node::new(NodeKind::Map).into());
        assert_eq!(block, Node::new(NodeKind::CodeBlock));

        let block = make_proper_code_block(ident("x"));
        assert_eq!(block.children, vec![ident("x")]);
    }

    #[test]
    fn test_rule_set_has_one_rule_per_tier() {
        let rules = RuleSet::build(&Operators::default());
        let tiers = rules
            .repeat
            .iter()
            .filter(|r| r.name().starts_with("operator-tier-"))
            .count();
        assert_eq!(tiers, Operators::default().rule_tiers().len());
        assert_eq!(rules.apply_once.len(), 12);
    }
}
