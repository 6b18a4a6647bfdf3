//! Syntax tree elements
//!
//! The parser works on a flat sequence of [`Element`]s, each either a raw
//! [`Token`] or a [`Node`] built by a rule. The finished tree uses the same
//! types, so every stage can be printed and reconstructed.

use std::fmt;
use std::rc::Rc;

use crate::lexer::{Token, TokenKind};
use crate::operator::Operator;

/// Kind of a composite syntax node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum NodeKind {
    Statement,
    Root,
    CodeBlock,
    Array,
    Map,
    MapElement,
    Expression,
    IdentifierAccessed,
    Assignment,
    AssignmentCombinedOperator,
    ParenthesisPair,
    CurlyBracketPair,
    SquareBracketPair,
    FunctionCall,
    FunctionDeclaration,
    FunctionInline,
    ConstructorCall,
    Conditional,
    ConditionalBranch,
    ConditionalBracket,
    LoopFor,
    LoopForBracket,
    LoopWhile,
    LoopWhileBracket,
    ImportStatement,
    ImportAsStatement,
    ImportInlineStatement,
    ExportStatement,
    ReturnStatement,
    ListedElements,
    OperatorFunction,
}

impl NodeKind {
    fn name(self) -> &'static str {
        match self {
            NodeKind::Statement => "STATEMENT",
            NodeKind::Root => "ROOT",
            NodeKind::CodeBlock => "CODE_BLOCK",
            NodeKind::Array => "ARRAY",
            NodeKind::Map => "MAP",
            NodeKind::MapElement => "MAP_ELEMENT",
            NodeKind::Expression => "EXPRESSION",
            NodeKind::IdentifierAccessed => "IDENTIFIER_ACCESSED",
            NodeKind::Assignment => "ASSIGNMENT",
            NodeKind::AssignmentCombinedOperator => "ASSIGNMENT_COMBINED_OPERATOR",
            NodeKind::ParenthesisPair => "PARENTHESIS_PAIR",
            NodeKind::CurlyBracketPair => "CURLY_BRACKET_PAIR",
            NodeKind::SquareBracketPair => "SQUARE_BRACKET_PAIR",
            NodeKind::FunctionCall => "FUNCTION_CALL",
            NodeKind::FunctionDeclaration => "FUNCTION_DECLARATION",
            NodeKind::FunctionInline => "FUNCTION_INLINE",
            NodeKind::ConstructorCall => "CONSTRUCTOR_CALL",
            NodeKind::Conditional => "CONDITIONAL",
            NodeKind::ConditionalBranch => "CONDITIONAL_BRANCH",
            NodeKind::ConditionalBracket => "CONDITIONAL_BRACKET",
            NodeKind::LoopFor => "LOOP_FOR",
            NodeKind::LoopForBracket => "LOOP_FOR_BRACKET",
            NodeKind::LoopWhile => "LOOP_WHILE",
            NodeKind::LoopWhileBracket => "LOOP_WHILE_BRACKET",
            NodeKind::ImportStatement => "IMPORT_STATEMENT",
            NodeKind::ImportAsStatement => "IMPORT_AS_STATEMENT",
            NodeKind::ImportInlineStatement => "IMPORT_INLINE_STATEMENT",
            NodeKind::ExportStatement => "EXPORT_STATEMENT",
            NodeKind::ReturnStatement => "RETURN_STATEMENT",
            NodeKind::ListedElements => "LISTED_ELEMENTS",
            NodeKind::OperatorFunction => "OPERATOR_FUNCTION",
        }
    }

    /// Whether the kind is one of the three import forms.
    pub fn is_import(self) -> bool {
        matches!(
            self,
            NodeKind::ImportStatement | NodeKind::ImportAsStatement | NodeKind::ImportInlineStatement
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A composite syntax node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node kind
    pub kind: NodeKind,
    /// Operator attached to expressions, assignments and operator functions
    pub value: Option<Rc<Operator>>,
    /// Ordered children
    pub children: Vec<Element>,
}

/// An entry in the working sequence or the finished tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// A lexical token
    Token(Token),
    /// A composite node
    Node(Node),
}

impl Node {
    /// An empty node.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            value: None,
            children: Vec::new(),
        }
    }

    /// A node with children.
    pub fn with_children(kind: NodeKind, children: Vec<Element>) -> Self {
        Self {
            kind,
            value: None,
            children,
        }
    }

    /// A node carrying an operator.
    pub fn with_operator(kind: NodeKind, operator: Rc<Operator>, children: Vec<Element>) -> Self {
        Self {
            kind,
            value: Some(operator),
            children,
        }
    }

    /// Whether the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// The operator symbol attached to the node, if any.
    pub fn operator_symbol(&self) -> Option<&str> {
        self.value.as_deref().map(Operator::symbol)
    }

    fn label(&self) -> String {
        match &self.value {
            Some(op) => format!("{}: {}", self.kind, op),
            None => self.kind.to_string(),
        }
    }

    fn write_children(&self, lines: &mut Vec<String>, prefix: &str) {
        let count = self.children.len();
        for (i, child) in self.children.iter().enumerate() {
            let last = i + 1 == count;
            lines.push(format!(
                "{prefix}{}{}",
                if last { "└─ " } else { "├─ " },
                child.label()
            ));
            if let Element::Node(node) = child {
                let nested = format!("{prefix}{}", if last { "   " } else { "│  " });
                node.write_children(lines, &nested);
            }
        }
    }

    /// Print each child as its own tree, separated by newlines.
    ///
    /// This is how a parsed unit is shown: the root itself is implied.
    pub fn render_children(&self) -> String {
        self.children
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Source text that parses back to an equal node.
    pub fn reconstruct_code(&self) -> String {
        let c = &self.children;
        match self.kind {
            NodeKind::Root => join(c, "\n"),
            NodeKind::Statement | NodeKind::ConditionalBracket | NodeKind::LoopWhileBracket => {
                join(c, " ")
            }
            NodeKind::CodeBlock | NodeKind::CurlyBracketPair => {
                if c.is_empty() {
                    "{}".to_string()
                } else {
                    format!("{{ {} }}", join(c, "; "))
                }
            }
            NodeKind::Array | NodeKind::SquareBracketPair => format!("[{}]", join(c, ", ")),
            NodeKind::Map => format!("{{{}}}", join(c, ", ")),
            NodeKind::MapElement => join(c, ": "),
            NodeKind::ParenthesisPair => format!("({})", join(c, ", ")),
            NodeKind::ListedElements => join(c, ", "),
            NodeKind::Expression => self.reconstruct_expression(),
            NodeKind::IdentifierAccessed => reconstruct_accessed(c),
            NodeKind::Assignment => {
                let symbol = match self.operator_symbol() {
                    Some("=") | None => "=".to_string(),
                    Some(op) => format!("{op}="),
                };
                format!("{} {} {}", part(c, 0), symbol, part(c, 1))
            }
            NodeKind::AssignmentCombinedOperator => {
                format!("{}=", self.operator_symbol().unwrap_or_default())
            }
            NodeKind::FunctionCall => match c.first() {
                Some(callee) if callee.is_node(NodeKind::FunctionInline) => {
                    format!("({}){}", callee.reconstruct_code(), part(c, 1))
                }
                _ => join(c, ""),
            },
            NodeKind::FunctionDeclaration => {
                if c.first().is_some_and(|e| e.is_keyword("native")) {
                    format!("native {}{}", part(c, 1), part(c, 2))
                } else {
                    format!("{}{} = {}", part(c, 0), part(c, 1), body_code(c.get(2)))
                }
            }
            NodeKind::FunctionInline => format!("{} -> {}", part(c, 0), body_code(c.get(1))),
            NodeKind::ConstructorCall => format!("new {}", join(c, "")),
            NodeKind::Conditional => c
                .iter()
                .enumerate()
                .map(|(i, branch)| {
                    let keyword = match (i, branch) {
                        (0, _) => "if",
                        (_, Element::Node(b)) if b.children.len() == 1 => "else",
                        _ => "elif",
                    };
                    format!("{keyword} {}", branch.reconstruct_code())
                })
                .collect::<Vec<_>>()
                .join(" "),
            NodeKind::ConditionalBranch => c
                .iter()
                .map(|e| body_code(Some(e)))
                .collect::<Vec<_>>()
                .join(" "),
            NodeKind::LoopFor => {
                let (head, body) = c.split_at(c.len().saturating_sub(1));
                let head = head
                    .iter()
                    .map(Element::reconstruct_code)
                    .collect::<Vec<_>>()
                    .join(" : ");
                format!("for ({head}) {}", body_code(body.first()))
            }
            NodeKind::LoopForBracket => format!("({})", join(c, " : ")),
            NodeKind::LoopWhile => format!("while {} {}", part(c, 0), body_code(c.get(1))),
            NodeKind::ImportStatement => format!("import {}", part(c, 0)),
            NodeKind::ImportAsStatement => format!("import {} as {}", part(c, 0), part(c, 1)),
            NodeKind::ImportInlineStatement => format!("import {} inline", part(c, 0)),
            NodeKind::ExportStatement => format!("export {} as {}", part(c, 0), part(c, 1)),
            NodeKind::ReturnStatement => match c.first() {
                Some(value) => format!("return {}", value.reconstruct_code()),
                None => "return".to_string(),
            },
            NodeKind::OperatorFunction => self
                .value
                .as_ref()
                .map(|op| op.bracket_form())
                .unwrap_or_default(),
        }
    }

    fn reconstruct_expression(&self) -> String {
        let symbol = self.operator_symbol().unwrap_or_default();
        let op = self.value.as_deref();
        match (op.map(Operator::takes_left), op.map(Operator::takes_right)) {
            (Some(false), _) => format!("{symbol}{}", part(&self.children, 0)),
            (_, Some(false)) => format!("{}{symbol}", part(&self.children, 0)),
            _ => format!(
                "{} {symbol} {}",
                part(&self.children, 0),
                part(&self.children, 1)
            ),
        }
    }
}

fn part(children: &[Element], index: usize) -> String {
    children
        .get(index)
        .map(Element::reconstruct_code)
        .unwrap_or_default()
}

fn join(children: &[Element], separator: &str) -> String {
    children
        .iter()
        .map(Element::reconstruct_code)
        .collect::<Vec<_>>()
        .join(separator)
}

fn body_code(body: Option<&Element>) -> String {
    body.map(Element::reconstruct_code).unwrap_or_default()
}

fn reconstruct_accessed(children: &[Element]) -> String {
    let mut out = String::new();
    for (i, child) in children.iter().enumerate() {
        if i == 0 {
            out.push_str(&child.reconstruct_code());
            continue;
        }
        match child {
            Element::Token(t) if t.kind == TokenKind::Identifier => {
                out.push('.');
                out.push_str(&t.value);
            }
            Element::Node(n) if n.kind == NodeKind::FunctionCall => {
                out.push_str(&join(&n.children, ""));
            }
            Element::Node(n) if n.kind == NodeKind::CodeBlock => {
                out.push('[');
                out.push_str(&join(&n.children, "; "));
                out.push(']');
            }
            other => {
                out.push('[');
                out.push_str(&other.reconstruct_code());
                out.push(']');
            }
        }
    }
    out
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = vec![self.label()];
        self.write_children(&mut lines, "");
        f.write_str(&lines.join("\n"))
    }
}

impl Element {
    /// Create a token element.
    pub fn token(kind: TokenKind, value: impl Into<String>) -> Self {
        Element::Token(Token::new(kind, value))
    }

    /// The token, if this is one.
    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Element::Token(t) => Some(t),
            Element::Node(_) => None,
        }
    }

    /// The node, if this is one.
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Element::Node(n) => Some(n),
            Element::Token(_) => None,
        }
    }

    /// Whether this is a token of the given kind.
    pub fn is_token(&self, kind: TokenKind) -> bool {
        matches!(self, Element::Token(t) if t.kind == kind)
    }

    /// Whether this is a node of the given kind.
    pub fn is_node(&self, kind: NodeKind) -> bool {
        matches!(self, Element::Node(n) if n.kind == kind)
    }

    /// Whether this is the given operator token.
    pub fn is_operator(&self, symbol: &str) -> bool {
        matches!(self, Element::Token(t) if t.kind == TokenKind::Operator && t.value == symbol)
    }

    /// Whether this is the given keyword token.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Element::Token(t) if t.kind == TokenKind::Keyword && t.value == keyword)
    }

    /// Text of a token element.
    pub fn text(&self) -> Option<&str> {
        self.as_token().map(|t| t.value.as_str())
    }

    /// Children of a node element; empty for tokens.
    pub fn children(&self) -> &[Element] {
        match self {
            Element::Node(n) => &n.children,
            Element::Token(_) => &[],
        }
    }

    fn label(&self) -> String {
        match self {
            Element::Token(t) => t.to_string(),
            Element::Node(n) => n.label(),
        }
    }

    /// Source text that parses back to an equal element.
    pub fn reconstruct_code(&self) -> String {
        match self {
            Element::Token(t) => t.reconstruct_code(),
            Element::Node(n) => n.reconstruct_code(),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Token(t) => write!(f, "{t}"),
            Element::Node(n) => write!(f, "{n}"),
        }
    }
}

impl From<Token> for Element {
    fn from(token: Token) -> Self {
        Element::Token(token)
    }
}

impl From<Node> for Element {
    fn from(node: Node) -> Self {
        Element::Node(node)
    }
}
