//! Repeat rules generated from the operator table

use std::rc::Rc;

use crate::error::ParseError;
use crate::lexer::TokenKind;
use crate::operator::{Operator, Operators};
use crate::parser::node::{Element, Node, NodeKind};
use crate::parser::predicates::{is_evaluable, is_finished_statement, is_value_like};

use super::{make_proper_code_block, Rewrite, RuleResult};

fn operator_text(el: &Element) -> Option<&str> {
    match el {
        Element::Token(t) if t.kind == TokenKind::Operator => Some(&t.value),
        _ => None,
    }
}

fn find_in(tier: &[Rc<Operator>], symbol: &str, left: bool, right: bool) -> Option<Rc<Operator>> {
    tier.iter()
        .find(|op| op.symbol() == symbol && op.takes_left() == left && op.takes_right() == right)
        .cloned()
}

/// Precedence of the operator token at `index`, read in the role its
/// neighbours give it.
fn role_precedence(elements: &[Element], index: usize, table: &Operators) -> Option<u32> {
    let symbol = operator_text(&elements[index])?;
    let after_value = index > 0 && is_value_like(&elements[index - 1]);
    let op = if after_value {
        table
            .find_operator(symbol, true, true)
            .or_else(|| table.find_operator(symbol, true, false))
    } else {
        table.find_operator(symbol, false, true)
    };
    op.map(|op| op.precedence())
}

/// The left operand at `index` is not claimed by anything binding at least
/// as tight on its other side.
fn left_is_free(elements: &[Element], index: usize, precedence: u32, table: &Operators) -> bool {
    let Some(before) = index.checked_sub(1).map(|j| &elements[j]) else {
        return true;
    };
    if before.is_token(TokenKind::Dot) || before.is_keyword("new") {
        return false;
    }
    if operator_text(before).is_some() {
        return role_precedence(elements, index - 1, table).map_or(true, |p| p < precedence);
    }
    true
}

/// The right operand at `index` does not continue into a call, index,
/// accessor, arrow or tighter operator.
fn right_is_free(elements: &[Element], index: usize, precedence: u32, table: &Operators) -> bool {
    let Some(after) = elements.get(index + 1) else {
        return true;
    };
    if after.is_token(TokenKind::OpenParenthesis)
        || after.is_token(TokenKind::OpenSquareBracket)
        || after.is_token(TokenKind::OpenCurlyBracket)
        || after.is_token(TokenKind::Dot)
        || after.is_node(NodeKind::ParenthesisPair)
        || after.is_node(NodeKind::SquareBracketPair)
        || after.is_operator("->")
    {
        return false;
    }
    if operator_text(after).is_some() {
        return role_precedence(elements, index + 1, table).map_or(true, |p| p <= precedence);
    }
    true
}

/// Reduce the leftmost operator of one precedence tier whose operands are
/// complete.
pub(super) fn operator_tier(
    elements: &[Element],
    precedence: u32,
    tier: &[Rc<Operator>],
    table: &Operators,
) -> RuleResult {
    for (i, el) in elements.iter().enumerate() {
        let Some(symbol) = operator_text(el) else {
            continue;
        };
        let prev = i.checked_sub(1).map(|j| &elements[j]);
        let next = elements.get(i + 1);

        if prev.is_some_and(is_value_like) {
            let (Some(left), true) = (prev, prev.is_some_and(is_evaluable)) else {
                continue;
            };
            if !left_is_free(elements, i - 1, precedence, table) {
                continue;
            }
            if let Some(op) = find_in(tier, symbol, true, true) {
                if next.is_some_and(is_evaluable) && right_is_free(elements, i + 1, precedence, table)
                {
                    let right = elements[i + 1].clone();
                    return Ok(Some(Rewrite::node(
                        i - 1..=i + 1,
                        Node::with_operator(NodeKind::Expression, op, vec![left.clone(), right]),
                    )));
                }
            } else if let Some(op) = find_in(tier, symbol, true, false) {
                if !next.is_some_and(is_evaluable) {
                    return Ok(Some(Rewrite::node(
                        i - 1..=i,
                        Node::with_operator(NodeKind::Expression, op, vec![left.clone()]),
                    )));
                }
            }
        } else if let Some(op) = find_in(tier, symbol, false, true) {
            if prev.is_some_and(|p| p.is_token(TokenKind::Dot)) {
                continue;
            }
            if next.is_some_and(is_evaluable) && right_is_free(elements, i + 1, precedence, table) {
                return Ok(Some(Rewrite::node(
                    i..=i + 1,
                    Node::with_operator(NodeKind::Expression, op, vec![elements[i + 1].clone()]),
                )));
            }
        }
    }
    Ok(None)
}

/// `x += 1` style operators.
pub(super) fn combined_assignment(elements: &[Element], table: &Operators) -> RuleResult {
    for i in 0..elements.len().saturating_sub(1) {
        let Some(symbol) = operator_text(&elements[i]) else {
            continue;
        };
        if symbol == "=" || !elements[i + 1].is_operator("=") {
            continue;
        }
        let Some(op) = table.find_operator(symbol, true, true) else {
            return Err(ParseError::syntax(format!(
                "Assignment operator must take two arguments, but only takes one: {symbol}"
            )));
        };
        let wrapped_left = i > 0
            && (elements[i - 1].is_token(TokenKind::OpenParenthesis)
                || elements[i - 1].is_token(TokenKind::OpenSquareBracket));
        let wrapped_right = elements.get(i + 2).is_some_and(|e| {
            e.is_token(TokenKind::CloseParenthesis) || e.is_token(TokenKind::CloseSquareBracket)
        });
        if wrapped_left && wrapped_right {
            return Err(ParseError::syntax(format!(
                "Cannot transform assigment operator into operator function: {symbol}"
            )));
        }
        return Ok(Some(Rewrite::node(
            i..=i + 1,
            Node::with_operator(NodeKind::AssignmentCombinedOperator, op, Vec::new()),
        )));
    }
    Ok(None)
}

/// `params -> body` inline functions.
pub(super) fn function_inline(elements: &[Element], table: &Operators) -> RuleResult {
    let mut state = 0;
    let mut start = 0;
    for (i, el) in elements.iter().enumerate() {
        if state == 0 && is_evaluable(el) {
            state = 1;
            start = i;
        } else if state == 1 && el.is_operator("->") {
            state = 2;
        } else if state == 2
            && (el.is_node(NodeKind::CodeBlock)
                || is_evaluable(el)
                || el.is_node(NodeKind::ReturnStatement)
                || is_finished_statement(el))
            && body_is_complete(elements.get(i + 1))
        {
            let params = match &elements[start] {
                token @ Element::Token(t) if t.kind == TokenKind::Identifier => {
                    Node::with_children(NodeKind::ParenthesisPair, vec![token.clone()]).into()
                }
                other => other.clone(),
            };
            let body = make_proper_code_block(el.clone());
            let children = vec![params, body.into()];
            let node = match table.find_operator("->", true, true) {
                Some(arrow) => Node::with_operator(NodeKind::FunctionInline, arrow, children),
                None => Node::with_children(NodeKind::FunctionInline, children),
            };
            return Ok(Some(Rewrite::node(start..=i, node)));
        } else {
            state = 0;
        }
    }
    Ok(None)
}

fn body_is_complete(next: Option<&Element>) -> bool {
    let Some(next) = next else { return true };
    if next.is_token(TokenKind::OpenParenthesis)
        || next.is_token(TokenKind::Dot)
        || next.is_token(TokenKind::OpenSquareBracket)
        || next.is_token(TokenKind::OpenCurlyBracket)
    {
        return false;
    }
    match operator_text(next) {
        Some(symbol) => symbol == "|>" || symbol == ">|",
        None => true,
    }
}
