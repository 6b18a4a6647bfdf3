//! Repeat rules for assignments, control flow, declarations and statements

use crate::error::ParseError;
use crate::lexer::TokenKind;
use crate::operator::Operators;
use crate::parser::node::{Element, Node, NodeKind};
use crate::parser::predicates::{
    is_assignable, is_evaluable, is_finished_statement, is_identifier, is_leaf_map, is_literal,
    is_statement_finisher,
};

use super::{in_order, make_proper_code_block, Predicate, Rewrite, RuleResult};

/// Nodes become code blocks, tokens stay as they are.
fn body(el: &Element) -> Element {
    match el {
        Element::Node(_) => make_proper_code_block(el.clone()).into(),
        Element::Token(_) => el.clone(),
    }
}

fn is_loop_body(el: &Element) -> bool {
    is_evaluable(el)
        || el.is_node(NodeKind::CodeBlock)
        || el.is_node(NodeKind::Statement)
        || el.is_node(NodeKind::ReturnStatement)
        || el.is_node(NodeKind::Assignment)
}

fn is_loop_part(el: &Element) -> bool {
    is_loop_body(el)
        || is_identifier(el)
        || el.is_node(NodeKind::ParenthesisPair)
        || el.is_node(NodeKind::Array)
        || el.is_node(NodeKind::SquareBracketPair)
}

fn is_declaration_body(el: &Element) -> bool {
    el.is_node(NodeKind::CodeBlock) || is_leaf_map(el) || el.is_node(NodeKind::ReturnStatement)
}

fn is_call(el: &Element) -> bool {
    el.is_node(NodeKind::FunctionCall)
}

// ═══════════════════════════════════════════════════════════════════════
// Maps and Constructors
// ═══════════════════════════════════════════════════════════════════════

/// `key: value` inside curly brackets, ended by a comma, newline or `}`.
pub(super) fn map_element(elements: &[Element]) -> RuleResult {
    let mut state = 0;
    let mut key = 0;
    let mut value = 0;
    for (i, el) in elements.iter().enumerate() {
        let next = elements.get(i + 1);
        let next_ends = next.is_some_and(|n| {
            n.is_token(TokenKind::Comma) || n.is_token(TokenKind::CloseCurlyBracket)
        });
        let next_newline = next.is_some_and(|n| n.is_token(TokenKind::Newline));

        if state == 2 && is_evaluable(el) && next_newline {
            state = 3;
            value = i;
        } else if state == 2 && is_evaluable(el) && next_ends {
            value = i;
            state = 4;
        } else if state == 3 && next_ends {
            state = 4;
        } else if state == 1 && el.is_operator(":") {
            state = 2;
        } else if is_identifier(el) || is_literal(el) {
            state = 1;
            key = i;
        } else {
            state = 0;
        }

        if state == 4 {
            return Ok(Some(Rewrite::node(
                key..=value,
                Node::with_children(
                    NodeKind::MapElement,
                    vec![elements[key].clone(), elements[value].clone()],
                ),
            )));
        }
    }
    Ok(None)
}

fn constructor_parts(el: Element, _: usize) -> Result<Vec<Element>, ParseError> {
    match el {
        Element::Node(call) if call.kind == NodeKind::FunctionCall => Ok(call.children),
        Element::Node(mut chain) if chain.kind == NodeKind::IdentifierAccessed => {
            let code = chain.reconstruct_code();
            match chain.children.pop() {
                Some(Element::Node(call)) if call.kind == NodeKind::FunctionCall => {
                    match call.children.into_iter().next() {
                        Some(parens) if parens.is_node(NodeKind::ParenthesisPair) => {
                            Ok(vec![chain.into(), parens])
                        }
                        _ => Err(ParseError::syntax_at(
                            "Expected constructor call to be terminated by a parenthesis pair",
                            code,
                        )),
                    }
                }
                _ => Err(ParseError::syntax_at(
                    "Expected constructor call to be terminated by a parenthesis pair",
                    code,
                )),
            }
        }
        other => Ok(vec![other]),
    }
}

/// `new Type(args)` and `new module.Type(args)`.
pub(super) fn constructor(elements: &[Element]) -> RuleResult {
    let conditions: [Predicate; 2] = [|e| e.is_keyword("new"), |e| is_identifier(e) || is_call(e)];
    in_order(
        elements,
        NodeKind::ConstructorCall,
        &conditions,
        0,
        |e| !e.is_token(TokenKind::Keyword),
        constructor_parts,
    )
}

// ═══════════════════════════════════════════════════════════════════════
// Assignment
// ═══════════════════════════════════════════════════════════════════════

/// `target = value` and `target op= value`, binding to the right.
pub(super) fn assignment(elements: &[Element], table: &Operators) -> RuleResult {
    let mut start: Option<usize> = None;
    for (i, el) in elements.iter().enumerate() {
        if is_assignable(el) {
            start = Some(i);
            continue;
        }
        let combined = el.is_node(NodeKind::AssignmentCombinedOperator);
        if !(el.is_operator("=") || combined) {
            start = None;
            continue;
        }
        let Some(target) = start else { continue };
        let next = elements.get(i + 1);
        if !next.is_some_and(is_evaluable) {
            start = None;
            continue;
        }
        let continues = elements.get(i + 2).is_some_and(|after| {
            after.is_token(TokenKind::Operator)
                || after.is_token(TokenKind::OpenParenthesis)
                || after.is_token(TokenKind::Dot)
        });
        if continues {
            start = None;
            continue;
        }

        let operator = match el {
            Element::Node(node) if combined => node.value.clone(),
            _ => table.find_operator("=", true, true),
        };
        let children = vec![elements[target].clone(), elements[i + 1].clone()];
        let node = match operator {
            Some(op) => Node::with_operator(NodeKind::Assignment, op, children),
            None => Node::with_children(NodeKind::Assignment, children),
        };
        return Ok(Some(Rewrite::node(target..=i + 1, node)));
    }
    Ok(None)
}

// ═══════════════════════════════════════════════════════════════════════
// Conditionals
// ═══════════════════════════════════════════════════════════════════════

pub(super) fn conditional_bracket(elements: &[Element]) -> RuleResult {
    for (i, pair) in elements.windows(2).enumerate() {
        if (pair[0].is_keyword("if") || pair[0].is_keyword("elif"))
            && pair[1].is_node(NodeKind::ParenthesisPair)
        {
            return Ok(Some(Rewrite::node(
                i + 1..=i + 1,
                Node::with_children(NodeKind::ConditionalBracket, vec![pair[1].clone()]),
            )));
        }
    }
    Ok(None)
}

fn is_branch_body(el: &Element) -> bool {
    is_evaluable(el)
        || el.is_node(NodeKind::CodeBlock)
        || el.is_node(NodeKind::ReturnStatement)
        || el.is_node(NodeKind::Statement)
        || el.is_node(NodeKind::Assignment)
}

/// Merge `if`, any number of `elif` and an optional `else` into one node.
pub(super) fn conditional(elements: &[Element]) -> RuleResult {
    let mut branches: Vec<Element> = Vec::new();
    let mut start: Option<usize> = None;
    let mut end = 0;
    let mut i = 0;

    while i < elements.len() {
        let el = &elements[i];
        let mut is_else = false;
        let mut starter = false;

        if el.is_keyword("if") {
            start = Some(i);
            branches.clear();
            starter = true;
        } else if el.is_keyword("elif") {
            if start.is_none() {
                i += 1;
                continue;
            }
        } else if el.is_keyword("else") {
            if start.is_none() {
                i += 1;
                continue;
            }
            is_else = true;
        } else if let (Some(begin), false) = (start, branches.is_empty()) {
            return Ok(Some(Rewrite::node(
                begin..=end,
                Node::with_children(NodeKind::Conditional, branches),
            )));
        }

        if branches.is_empty() && !starter {
            i += 1;
            continue;
        }

        let mut branch = Vec::new();
        if !is_else {
            match elements.get(i + 1) {
                Some(Element::Node(bracket)) if bracket.kind == NodeKind::ConditionalBracket => {
                    branch.extend(bracket.children.first().cloned());
                }
                _ => {
                    start = None;
                    branches.clear();
                    i += 1;
                    continue;
                }
            }
        }

        let body_index = if is_else { i + 1 } else { i + 2 };
        match elements.get(body_index) {
            Some(candidate) if is_branch_body(candidate) => {
                branch.push(body(candidate));
                end = body_index;
            }
            _ => {
                start = None;
                branches.clear();
                i += 1;
                continue;
            }
        }
        branches.push(Node::with_children(NodeKind::ConditionalBranch, branch).into());

        if is_else {
            if let Some(begin) = start {
                return Ok(Some(Rewrite::node(
                    begin..=end,
                    Node::with_children(NodeKind::Conditional, branches),
                )));
            }
        }
        i = end + 1;
    }
    Ok(None)
}

// ═══════════════════════════════════════════════════════════════════════
// Loops
// ═══════════════════════════════════════════════════════════════════════

/// `for (x : iterable)` head, built from the raw bracket tokens.
pub(super) fn for_bracket(elements: &[Element]) -> RuleResult {
    let mut state = 0;
    let mut start = 0;
    for (i, el) in elements.iter().enumerate() {
        if state == 0 && el.is_keyword("for") {
            state = 1;
        } else if state == 1 && el.is_token(TokenKind::OpenParenthesis) {
            state = 2;
            start = i;
        } else if state == 2
            && (is_identifier(el)
                || el.is_node(NodeKind::ParenthesisPair)
                || el.is_node(NodeKind::Array)
                || el.is_node(NodeKind::SquareBracketPair))
        {
            state = 3;
        } else if state == 3 && (el.is_operator(":") || el.is_keyword("in")) {
        } else if state == 3 && is_evaluable(el) {
            state = 4;
        } else if state == 4 && el.is_token(TokenKind::CloseParenthesis) {
            let children = elements[start..=i]
                .iter()
                .filter(|e| is_loop_part(e) && !e.is_node(NodeKind::ReturnStatement))
                .cloned()
                .collect();
            return Ok(Some(Rewrite::node(
                start..=i,
                Node::with_children(NodeKind::LoopForBracket, children),
            )));
        } else {
            state = if el.is_keyword("for") { 1 } else { 0 };
        }
    }
    Ok(None)
}

pub(super) fn while_bracket(elements: &[Element]) -> RuleResult {
    for (i, pair) in elements.windows(2).enumerate() {
        if pair[0].is_keyword("while") && pair[1].is_node(NodeKind::ParenthesisPair) {
            return Ok(Some(Rewrite::node(
                i + 1..=i + 1,
                Node::with_children(NodeKind::LoopWhileBracket, vec![pair[1].clone()]),
            )));
        }
    }
    Ok(None)
}

/// Keyword, extracted head and a body not continued by an operator.
fn loop_rule(
    elements: &[Element],
    keyword: &str,
    bracket: NodeKind,
    kind: NodeKind,
) -> RuleResult {
    let mut state = 0;
    let mut start = 0;
    let mut i = 0;
    while i < elements.len() {
        let el = &elements[i];
        if state == 0 && el.is_keyword(keyword) {
            state = 1;
            start = i;
        } else if state == 1 && el.is_node(bracket) {
            state = 2;
        } else if state == 2 && is_loop_body(el) {
            if elements.get(i + 1).is_some_and(|n| n.is_token(TokenKind::Operator)) {
                state = 0;
            } else {
                let mut children = Vec::new();
                for part in &elements[start..=i] {
                    if part.is_node(bracket) {
                        children.extend(part.children().iter().cloned());
                    } else if is_loop_part(part) {
                        children.push(part.clone());
                    }
                }
                return Ok(Some(Rewrite::node(
                    start..=i,
                    Node::with_children(kind, children),
                )));
            }
        } else if state != 0 {
            state = 0;
            continue;
        }
        i += 1;
    }
    Ok(None)
}

pub(super) fn for_loop(elements: &[Element]) -> RuleResult {
    loop_rule(elements, "for", NodeKind::LoopForBracket, NodeKind::LoopFor)
}

pub(super) fn while_loop(elements: &[Element]) -> RuleResult {
    loop_rule(elements, "while", NodeKind::LoopWhileBracket, NodeKind::LoopWhile)
}

// ═══════════════════════════════════════════════════════════════════════
// Function Declarations
// ═══════════════════════════════════════════════════════════════════════

fn declaration_parts(el: Element, index: usize) -> Result<Vec<Element>, ParseError> {
    match el {
        Element::Node(call) if index == 0 && call.kind == NodeKind::FunctionCall => {
            Ok(call.children)
        }
        Element::Node(_) if index > 0 => Ok(vec![body(&el)]),
        other => Ok(vec![other]),
    }
}

fn not_assign(el: &Element) -> bool {
    !el.is_operator("=")
}

/// `name(params) = body`.
pub(super) fn declaration_by_assignment(elements: &[Element]) -> RuleResult {
    let conditions: [Predicate; 3] = [
        is_call,
        |e| e.is_operator("="),
        |e| is_evaluable(e) || is_declaration_body(e),
    ];
    in_order(
        elements,
        NodeKind::FunctionDeclaration,
        &conditions,
        0,
        not_assign,
        declaration_parts,
    )
}

/// `name(params) { body }`.
pub(super) fn declaration_shorthand(elements: &[Element]) -> RuleResult {
    let conditions: [Predicate; 2] = [is_call, is_declaration_body];
    in_order(
        elements,
        NodeKind::FunctionDeclaration,
        &conditions,
        0,
        not_assign,
        declaration_parts,
    )
}

fn reject_accessed(el: Element, index: usize) -> Result<Vec<Element>, ParseError> {
    let Element::Node(mut chain) = el else {
        return Ok(vec![el]);
    };
    if index != 0 {
        return Ok(vec![chain.into()]);
    }
    let params = match chain.children.pop() {
        Some(Element::Node(call)) if call.kind == NodeKind::FunctionCall => call
            .children
            .first()
            .map(Element::reconstruct_code)
            .unwrap_or_else(|| "()".to_string()),
        Some(other) => other.reconstruct_code(),
        None => "()".to_string(),
    };
    Err(ParseError::syntax(format!(
        "Function declaration via object.child() {{ ... }} is not supported.\nTo define a function on an object, use the '->' arrow syntax: {} = {params} -> {{ ... }}",
        chain.reconstruct_code()
    )))
}

/// `obj.method() { ... }` has no meaning; point at the arrow form instead.
pub(super) fn reject_accessed_declaration(elements: &[Element]) -> RuleResult {
    let conditions: [Predicate; 2] = [|e| e.is_node(NodeKind::IdentifierAccessed), is_declaration_body];
    in_order(
        elements,
        NodeKind::FunctionDeclaration,
        &conditions,
        0,
        not_assign,
        reject_accessed,
    )
}

/// `name = inline function`; flattened later into params and body.
pub(super) fn declaration_by_inline(elements: &[Element]) -> RuleResult {
    let conditions: [Predicate; 3] = [
        is_identifier,
        |e| e.is_operator("="),
        |e| e.is_node(NodeKind::FunctionInline),
    ];
    in_order(
        elements,
        NodeKind::FunctionDeclaration,
        &conditions,
        0,
        not_assign,
        super::identity,
    )
}

fn native_parts(el: Element, index: usize) -> Result<Vec<Element>, ParseError> {
    match el {
        Element::Node(call) if index == 1 && call.kind == NodeKind::FunctionCall => {
            Ok(call.children)
        }
        other => Ok(vec![other]),
    }
}

/// `native name(params)`.
pub(super) fn native_declaration(elements: &[Element]) -> RuleResult {
    let conditions: [Predicate; 2] = [|e| e.is_keyword("native"), is_call];
    in_order(
        elements,
        NodeKind::FunctionDeclaration,
        &conditions,
        0,
        super::keep_all,
        native_parts,
    )
}

// ═══════════════════════════════════════════════════════════════════════
// Statements
// ═══════════════════════════════════════════════════════════════════════

/// `return` with an optional value, ended by a finisher or keyword.
pub(super) fn return_statement(elements: &[Element]) -> RuleResult {
    let mut state = 0;
    let mut start = 0;
    for (i, el) in elements.iter().enumerate() {
        if el.is_keyword("return") {
            state = 1;
            start = i;
            continue;
        }
        if state == 1 && is_evaluable(el) {
            state = 2;
            continue;
        }
        if state == 0 || !(is_statement_finisher(el) || el.is_token(TokenKind::Keyword)) {
            state = 0;
            continue;
        }

        let keep_finisher = el.is_token(TokenKind::Keyword)
            || el.is_token(TokenKind::CloseCurlyBracket)
            || el.is_node(NodeKind::Statement);
        let end = if keep_finisher { i - 1 } else { i };
        let children = match elements.get(start + 1) {
            Some(value) if state == 2 && is_evaluable(value) => vec![value.clone()],
            _ => Vec::new(),
        };
        return Ok(Some(Rewrite::node(
            start..=end,
            Node::with_children(NodeKind::ReturnStatement, children),
        )));
    }
    Ok(None)
}

/// A finished statement and its finisher.
pub(super) fn statement(elements: &[Element]) -> RuleResult {
    let mut start: Option<usize> = None;
    for (i, el) in elements.iter().enumerate() {
        match start {
            Some(begin) if is_statement_finisher(el) => {
                let keep_finisher =
                    el.is_token(TokenKind::CloseCurlyBracket) || el.is_node(NodeKind::Statement);
                let end = if keep_finisher { i - 1 } else { i };
                return Ok(Some(Rewrite::node(
                    begin..=end,
                    Node::with_children(NodeKind::Statement, vec![elements[begin].clone()]),
                )));
            }
            _ if is_finished_statement(el) => start = Some(i),
            _ => start = None,
        }
    }
    Ok(None)
}
