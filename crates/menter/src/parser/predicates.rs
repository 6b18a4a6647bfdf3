//! Element classification shared by the parser rules

use crate::lexer::TokenKind;

use super::node::{Element, NodeKind};

/// Identifier token or accessor chain.
pub fn is_identifier(el: &Element) -> bool {
    el.is_token(TokenKind::Identifier) || el.is_node(NodeKind::IdentifierAccessed)
}

/// Any literal token.
pub fn is_literal(el: &Element) -> bool {
    matches!(el, Element::Token(t) if t.kind.is_literal())
}

/// Element that evaluates to a value.
pub fn is_evaluable(el: &Element) -> bool {
    match el {
        Element::Token(t) => {
            t.kind.is_literal()
                || matches!(
                    t.kind,
                    TokenKind::Identifier | TokenKind::Pass | TokenKind::Continue | TokenKind::Break
                )
                || el.is_keyword("null")
        }
        Element::Node(n) => matches!(
            n.kind,
            NodeKind::IdentifierAccessed
                | NodeKind::Expression
                | NodeKind::FunctionCall
                | NodeKind::ParenthesisPair
                | NodeKind::Array
                | NodeKind::Map
                | NodeKind::Conditional
                | NodeKind::FunctionInline
                | NodeKind::LoopFor
                | NodeKind::LoopWhile
                | NodeKind::ConstructorCall
                | NodeKind::OperatorFunction
                | NodeKind::CodeBlock
        ),
    }
}

/// Element that can stand on its own as a statement.
pub fn is_finished_statement(el: &Element) -> bool {
    is_evaluable(el)
        || matches!(
            el,
            Element::Node(n) if matches!(
                n.kind,
                NodeKind::Assignment
                    | NodeKind::CurlyBracketPair
                    | NodeKind::FunctionDeclaration
                    | NodeKind::Conditional
                    | NodeKind::CodeBlock
            )
        )
}

/// Element that ends a statement.
pub fn is_statement_finisher(el: &Element) -> bool {
    el.is_token(TokenKind::Semicolon)
        || el.is_token(TokenKind::Newline)
        || el.is_token(TokenKind::Eof)
        || el.is_token(TokenKind::CloseCurlyBracket)
        || el.is_node(NodeKind::Statement)
}

/// Element that can appear in a comma list.
pub fn is_listable(el: &Element) -> bool {
    is_evaluable(el) || el.is_node(NodeKind::ListedElements) || el.is_node(NodeKind::MapElement)
}

/// Element that can be the target of an assignment.
pub fn is_assignable(el: &Element) -> bool {
    is_identifier(el) || el.is_node(NodeKind::ListedElements)
}

/// Element that ends a comma list.
pub fn is_list_finisher(el: &Element) -> bool {
    el.is_operator("=")
        || el.is_token(TokenKind::CloseParenthesis)
        || el.is_token(TokenKind::CloseSquareBracket)
        || el.is_token(TokenKind::CloseCurlyBracket)
}

/// Any opening bracket token.
pub fn is_open_bracket(el: &Element) -> bool {
    el.is_token(TokenKind::OpenParenthesis)
        || el.is_token(TokenKind::OpenSquareBracket)
        || el.is_token(TokenKind::OpenCurlyBracket)
}

/// Any closing bracket token.
pub fn is_close_bracket(el: &Element) -> bool {
    el.is_token(TokenKind::CloseParenthesis)
        || el.is_token(TokenKind::CloseSquareBracket)
        || el.is_token(TokenKind::CloseCurlyBracket)
}

/// A map without entries; `{}` reads as an empty block in body position.
pub fn is_leaf_map(el: &Element) -> bool {
    matches!(el, Element::Node(n) if n.kind == NodeKind::Map && n.is_leaf())
}

/// Square pair holding exactly one element, i.e. an index access.
pub fn is_array_access(el: &Element) -> bool {
    matches!(el, Element::Node(n) if n.kind == NodeKind::SquareBracketPair && n.children.len() == 1)
}

/// Element after which an operator reads as binary rather than prefix.
pub fn is_value_like(el: &Element) -> bool {
    is_evaluable(el)
        || el.is_token(TokenKind::CloseParenthesis)
        || el.is_token(TokenKind::CloseSquareBracket)
        || el.is_token(TokenKind::CloseCurlyBracket)
        || el.is_node(NodeKind::SquareBracketPair)
        || el.is_node(NodeKind::CurlyBracketPair)
}

/// Shorthand for testing an optional neighbour.
pub fn opt(el: Option<&Element>, pred: fn(&Element) -> bool) -> bool {
    el.is_some_and(pred)
}
