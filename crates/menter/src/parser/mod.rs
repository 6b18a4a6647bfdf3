//! Token-tree rewriting parser
//!
//! Parsing starts from the flat token list and repeatedly rewrites spans of
//! it into nodes until no rule applies:
//!
//! ```text
//! tokens → [apply-once rules, each to its fixed point]
//!        → [repeat rules, first match wins, rescan from the top]
//!        → strip separators → validate top level → ROOT
//! ```
//!
//! Rule sets are built per operator table and shared through a
//! [`RuleCache`].

pub mod cache;
pub mod node;
pub mod predicates;
pub mod rules;

use std::rc::Rc;

use tracing::{debug, trace};

use crate::error::ParseError;
use crate::lexer::{tokenize, Token, TokenKind};
use crate::operator::Operators;

pub use cache::{RuleCache, DEFAULT_RULE_CACHE_CAPACITY};
pub use node::{Element, Node, NodeKind};
pub use rules::{Rewrite, Rule, RuleSet};

/// A parser bound to one operator table.
#[derive(Debug, Clone)]
pub struct Parser {
    operators: Operators,
    rules: Rc<RuleSet>,
    verbose: bool,
}

impl Parser {
    /// Create a parser, taking the compiled rules from `cache`.
    pub fn new(operators: &Operators, cache: &mut RuleCache) -> Self {
        Self {
            operators: operators.clone(),
            rules: cache.rules_for(operators),
            verbose: false,
        }
    }

    /// Attach the working tree to syntax errors.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// The operator table this parser was built for.
    pub fn operators(&self) -> &Operators {
        &self.operators
    }

    /// Tokenize and parse source text.
    pub fn parse_source(&self, source: &str) -> Result<Node, ParseError> {
        let tokens = tokenize(source, &self.operators)?;
        self.parse(tokens)
    }

    /// Parse a token list into a `ROOT` node.
    pub fn parse(&self, tokens: Vec<Token>) -> Result<Node, ParseError> {
        debug!(tokens = tokens.len(), "parsing");
        let mut elements: Vec<Element> = tokens.into_iter().map(Element::Token).collect();
        if let Err(err) = self.run(&mut elements) {
            return Err(self.decorate(err, &elements));
        }

        elements.retain(|el| {
            !(el.is_token(TokenKind::Newline)
                || el.is_token(TokenKind::Semicolon)
                || el.is_token(TokenKind::Eof))
        });

        if let Some(offending) = elements.iter().find(|el| !is_top_level(el)) {
            let err = ParseError::syntax_at("Syntax error starting from", offending.to_string());
            return Err(self.decorate(err, &elements));
        }

        debug!(statements = elements.len(), "parsed");
        Ok(Node::with_children(NodeKind::Root, elements))
    }

    fn run(&self, elements: &mut Vec<Element>) -> Result<(), ParseError> {
        for rule in &self.rules.apply_once {
            while let Some(rewrite) = rule.apply(elements)? {
                trace!(rule = rule.name(), span = ?rewrite.span, "rule matched");
                rewrite.apply(elements)?;
            }
        }

        loop {
            match self.find_rewrite(elements)? {
                Some((name, rewrite)) => {
                    trace!(rule = name, span = ?rewrite.span, "rule matched");
                    rewrite.apply(elements)?;
                    if !ends_with_eof(elements) {
                        elements.push(Element::Token(Token::eof()));
                    }
                }
                None if !ends_with_eof(elements) => elements.push(Element::Token(Token::eof())),
                None => break,
            }
        }
        Ok(())
    }

    /// First repeat rule with a rewrite for `elements`, with its name.
    pub fn find_rewrite<'r>(
        &'r self,
        elements: &[Element],
    ) -> Result<Option<(&'r str, Rewrite)>, ParseError> {
        for rule in &self.rules.repeat {
            if let Some(rewrite) = rule.apply(elements)? {
                return Ok(Some((rule.name(), rewrite)));
            }
        }
        Ok(None)
    }

    fn decorate(&self, err: ParseError, elements: &[Element]) -> ParseError {
        if self.verbose {
            err.with_tree(render(elements))
        } else {
            err
        }
    }
}

fn ends_with_eof(elements: &[Element]) -> bool {
    elements.last().is_some_and(|el| el.is_token(TokenKind::Eof))
}

fn is_top_level(el: &Element) -> bool {
    match el {
        Element::Node(n) => {
            n.kind.is_import()
                || matches!(
                    n.kind,
                    NodeKind::Statement | NodeKind::ExportStatement | NodeKind::ReturnStatement
                )
        }
        Element::Token(_) => false,
    }
}

/// Render a sequence of elements as trees, one after another.
pub fn render(elements: &[Element]) -> String {
    elements
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(src: &str) -> Result<Node, ParseError> {
        let mut cache = RuleCache::default();
        Parser::new(&Operators::default(), &mut cache).parse_source(src)
    }

    #[test]
    fn test_empty_source() {
        let root = parse("").unwrap();
        assert!(root.is_leaf());
        assert_eq!(root.kind, NodeKind::Root);
    }

    #[test]
    fn test_separators_removed() {
        let root = parse("a;\n\nb;").unwrap();
        assert_eq!(root.children.len(), 2);
        assert!(root.children.iter().all(|c| c.is_node(NodeKind::Statement)));
    }

    #[test]
    fn test_invalid_top_level() {
        let err = parse("a +").unwrap_err();
        assert!(err.to_string().starts_with("Syntax error starting from"));
    }

    #[test]
    fn test_verbose_attaches_tree() {
        let mut cache = RuleCache::default();
        let parser = Parser::new(&Operators::default(), &mut cache).verbose(true);
        let err = parser.parse_source("a +").unwrap_err();
        assert!(err.to_string().contains("Parsed tree:"));
    }

    #[test]
    fn test_parsers_share_cached_rules() {
        let mut cache = RuleCache::default();
        let ops = Operators::default();
        let first = Parser::new(&ops, &mut cache);
        let second = Parser::new(&ops, &mut cache);
        assert!(Rc::ptr_eq(&first.rules, &second.rules));
    }

    #[test]
    fn test_parsed_tree_is_fixed_point() {
        let mut cache = RuleCache::default();
        let parser = Parser::new(&Operators::default(), &mut cache);
        let root = parser
            .parse_source("x = 1 + 2 * 3\nfoo(a) = a - 1\nif (x > 2) foo(x) else 0")
            .unwrap();
        assert!(parser.find_rewrite(&root.children).unwrap().is_none());
    }
}
