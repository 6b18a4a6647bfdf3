//! Repeat rules for brackets, calls, accessors, lists and module statements

use crate::error::ParseError;
use crate::lexer::TokenKind;
use crate::parser::node::{Element, Node, NodeKind};
use crate::parser::predicates::{
    is_array_access, is_evaluable, is_finished_statement, is_identifier, is_list_finisher,
    is_listable, is_open_bracket, is_statement_finisher,
};

use super::{
    identity, in_order, make_proper_code_block, parenthesis_rule, Predicate, Rewrite, RuleResult,
};

// ═══════════════════════════════════════════════════════════════════════
// Pipelines
// ═══════════════════════════════════════════════════════════════════════

/// Inject the left operand of `|>` (append) or `>|` (prepend) into the
/// argument list of the right-hand callable.
pub(super) fn pipeline(elements: &[Element]) -> RuleResult {
    for (i, el) in elements.iter().enumerate() {
        let Element::Node(node) = el else { continue };
        if node.kind != NodeKind::Expression || node.children.len() != 2 {
            continue;
        }
        let append = match node.operator_symbol() {
            Some("|>") => true,
            Some(">|") => false,
            _ => continue,
        };

        let left = node.children[0].clone();
        let mut right = node.children[1].clone();
        if let Element::Node(parens) = &right {
            if parens.kind == NodeKind::ParenthesisPair && parens.children.len() == 1 {
                right = parens.children[0].clone();
            }
        }

        let inject = |parens: &mut Node| {
            if append {
                parens.children.push(left.clone());
            } else {
                parens.children.insert(0, left.clone());
            }
        };

        let replacement = match right {
            Element::Node(mut call) if call.kind == NodeKind::FunctionCall => {
                let code = call.reconstruct_code();
                match call.children.get_mut(1) {
                    Some(Element::Node(parens)) if parens.kind == NodeKind::ParenthesisPair => {
                        inject(parens)
                    }
                    _ => {
                        return Err(ParseError::syntax_at(
                            "Expected function call with parenthesis pair on right side of pipeline operator, but got",
                            code,
                        ))
                    }
                }
                call
            }
            Element::Node(mut chain) if chain.kind == NodeKind::IdentifierAccessed => {
                if chain.children.is_empty() {
                    return Err(ParseError::syntax(
                        "Expected accessed identifier with at least one element on right side of pipeline operator",
                    ));
                }
                let ends_in_call = chain
                    .children
                    .last()
                    .is_some_and(|c| c.is_node(NodeKind::FunctionCall));
                if ends_in_call {
                    if let Some(Element::Node(call)) = chain.children.last_mut() {
                        let code = call.reconstruct_code();
                        match call.children.first_mut() {
                            Some(Element::Node(parens))
                                if parens.kind == NodeKind::ParenthesisPair =>
                            {
                                inject(parens)
                            }
                            _ => {
                                return Err(ParseError::syntax_at(
                                    "Expected function call with parenthesis pair on accessed identifier on right side  of pipeline operator, but got",
                                    code,
                                ))
                            }
                        }
                    }
                } else {
                    let mut parens = Node::new(NodeKind::ParenthesisPair);
                    inject(&mut parens);
                    chain.children.push(
                        Node::with_children(NodeKind::FunctionCall, vec![parens.into()]).into(),
                    );
                }
                chain
            }
            target
                if target.is_token(TokenKind::Identifier)
                    || target.is_node(NodeKind::FunctionInline) =>
            {
                let mut parens = Node::new(NodeKind::ParenthesisPair);
                inject(&mut parens);
                Node::with_children(NodeKind::FunctionCall, vec![target, parens.into()])
            }
            other => {
                return Err(ParseError::syntax(format!(
                    "Invalid symbol for pipeline operator: {} (expected function call, identifier or function inline)\non {}",
                    other.reconstruct_code(),
                    node.reconstruct_code()
                )))
            }
        };
        return Ok(Some(Rewrite::node(i..=i, replacement)));
    }
    Ok(None)
}

// ═══════════════════════════════════════════════════════════════════════
// Curly Pair Resolution
// ═══════════════════════════════════════════════════════════════════════

pub(super) fn curly_to_map(elements: &[Element]) -> RuleResult {
    for (i, el) in elements.iter().enumerate() {
        let Element::Node(node) = el else { continue };
        if node.kind == NodeKind::CurlyBracketPair
            && node.children.iter().all(|c| c.is_node(NodeKind::MapElement))
        {
            return Ok(Some(Rewrite::node(
                i..=i,
                Node::with_children(NodeKind::Map, node.children.clone()),
            )));
        }
    }
    Ok(None)
}

pub(super) fn curly_to_code_block(elements: &[Element]) -> RuleResult {
    for (i, el) in elements.iter().enumerate() {
        let Element::Node(node) = el else { continue };
        if node.kind == NodeKind::CurlyBracketPair
            && node.children.iter().all(|c| {
                c.is_node(NodeKind::Statement)
                    || c.is_node(NodeKind::ReturnStatement)
                    || is_finished_statement(c)
            })
        {
            return Ok(Some(Rewrite::node(i..=i, make_proper_code_block(el.clone()))));
        }
    }
    Ok(None)
}

/// `name = (params) -> body` declarations keep params and body directly.
pub(super) fn flatten_declaration(elements: &[Element]) -> RuleResult {
    for (i, el) in elements.iter().enumerate() {
        let Element::Node(node) = el else { continue };
        if node.kind != NodeKind::FunctionDeclaration || node.children.len() != 2 {
            continue;
        }
        let Element::Node(inline) = &node.children[1] else {
            continue;
        };
        if inline.kind != NodeKind::FunctionInline || inline.children.len() != 2 {
            continue;
        }
        let body = &inline.children[1];
        if !inline.children[0].is_node(NodeKind::ParenthesisPair)
            || !(body.is_node(NodeKind::CodeBlock) || body.is_node(NodeKind::ReturnStatement))
        {
            continue;
        }
        let mut flattened = node.clone();
        flattened.children[1] = inline.children[0].clone();
        flattened.children.push(body.clone());
        return Ok(Some(Rewrite::node(i..=i, flattened)));
    }
    Ok(None)
}

// ═══════════════════════════════════════════════════════════════════════
// Imports and Exports
// ═══════════════════════════════════════════════════════════════════════

/// `import X`, `import X as Y` and `import X inline`.
pub(super) fn import(elements: &[Element]) -> RuleResult {
    let mut state = 0;
    let mut start = 0;
    for (i, el) in elements.iter().enumerate() {
        let is_name = el.is_token(TokenKind::Identifier);
        state = match state {
            0 if el.is_keyword("import") => {
                start = i;
                1
            }
            1 if is_name => 2,
            2 if el.is_keyword("inline") => 6,
            2 if el.is_keyword("as") => 4,
            4 if is_name => 5,
            2 | 5 | 6 if is_statement_finisher(el) => {
                let kind = match state {
                    2 => NodeKind::ImportStatement,
                    5 => NodeKind::ImportAsStatement,
                    _ => NodeKind::ImportInlineStatement,
                };
                let children = elements[start..i]
                    .iter()
                    .filter(|e| e.is_token(TokenKind::Identifier))
                    .cloned()
                    .collect();
                return Ok(Some(Rewrite::node(
                    start..=i - 1,
                    Node::with_children(kind, children),
                )));
            }
            _ if el.is_keyword("import") => {
                start = i;
                1
            }
            _ => 0,
        };
    }
    Ok(None)
}

/// `export [a, b] as Name`.
pub(super) fn export(elements: &[Element]) -> RuleResult {
    let conditions: [Predicate; 5] = [
        |e| e.is_keyword("export"),
        |e| e.is_node(NodeKind::Array),
        |e| e.is_keyword("as"),
        |e| e.is_token(TokenKind::Identifier),
        is_statement_finisher,
    ];
    in_order(
        elements,
        NodeKind::ExportStatement,
        &conditions,
        1,
        |e| !e.is_token(TokenKind::Keyword),
        identity,
    )
}

// ═══════════════════════════════════════════════════════════════════════
// Calls and Accessors
// ═══════════════════════════════════════════════════════════════════════

/// A value immediately followed by a parenthesis pair is a call.
pub(super) fn function_call(elements: &[Element]) -> RuleResult {
    let mut pending: Option<usize> = None;
    let mut i = 0;
    while i < elements.len() {
        let el = &elements[i];
        match pending {
            Some(start) if el.is_node(NodeKind::ParenthesisPair) => {
                return Ok(Some(Rewrite::node(
                    start..=i,
                    Node::with_children(
                        NodeKind::FunctionCall,
                        vec![elements[start].clone(), el.clone()],
                    ),
                )));
            }
            Some(_) => {
                pending = None;
                continue;
            }
            None if is_identifier(el) || is_evaluable(el) || is_array_access(el) => {
                pending = Some(i);
            }
            None => {}
        }
        i += 1;
    }
    Ok(None)
}

/// Collapse `a.b`, `a[b]` and `a.b(c)` chains into one accessed node.
pub(super) fn accessor(elements: &[Element]) -> RuleResult {
    let mut state = 0;
    let mut start: Option<usize> = None;
    let mut end: Option<usize> = None;
    let mut chain_invalid = false;

    for (i, el) in elements.iter().enumerate() {
        let is_square = el.is_node(NodeKind::SquareBracketPair);
        let array_access = is_array_access(el);
        let valid_accessor =
            el.is_node(NodeKind::FunctionCall) || is_identifier(el) || array_access;
        let valid_initial = is_evaluable(el);
        let invalid_follow_up = el.is_node(NodeKind::ParenthesisPair)
            || el.is_node(NodeKind::Array)
            || el.is_token(TokenKind::Dot)
            || el.is_token(TokenKind::OpenParenthesis)
            || el.is_token(TokenKind::OpenSquareBracket);
        let invalid_prev = i > 0 && elements[i - 1].is_keyword("if");
        let separator = el.is_token(TokenKind::Dot);
        let call_on_square = matches!(
            el,
            Element::Node(n) if n.kind == NodeKind::FunctionCall
                && n.children.first().is_some_and(|c| c.is_node(NodeKind::SquareBracketPair))
        );

        if state == 0 && (separator || is_square) {
            chain_invalid = true;
        }

        if invalid_prev {
            state = 0;
            start = None;
        } else if state == 0 && (valid_accessor || valid_initial) {
            state = 1;
            start = Some(i);
        } else if state == 1 && separator {
            state = 2;
        } else if state == 1 && array_access {
            state = 3;
        } else if state == 1 && valid_accessor && call_on_square {
            state = 3;
        } else if state == 2 && valid_accessor {
            state = 3;
        } else if state == 2 && invalid_follow_up {
            state = 0;
            start = None;
        } else if state == 3 && separator {
            state = 2;
        } else if state == 3 && invalid_follow_up {
            state = 0;
        } else if state == 3 {
            if chain_invalid {
                state = 0;
                start = None;
                chain_invalid = false;
            } else {
                end = Some(i);
                break;
            }
        } else {
            state = 0;
            start = None;
            chain_invalid = false;
        }
    }

    let (Some(start), Some(end)) = (start, end) else {
        return Ok(None);
    };

    let mut children = Vec::new();
    for el in &elements[start..end] {
        match el {
            Element::Node(call) if call.kind == NodeKind::FunctionCall => {
                let mut call = call.clone();
                let mut extracted = Vec::new();
                for j in (0..call.children.len()).rev() {
                    let child = &call.children[j];
                    if child.is_node(NodeKind::ParenthesisPair) || child.is_token(TokenKind::Keyword)
                    {
                        continue;
                    }
                    let child = call.children.remove(j);
                    if is_array_access(&child) {
                        extracted.extend(child.children().first().cloned());
                    } else {
                        extracted.push(child);
                    }
                }
                extracted.reverse();
                children.extend(extracted);
                children.push(call.into());
            }
            Element::Node(square) if square.kind == NodeKind::SquareBracketPair => {
                if let Some(inner) = square.children.first() {
                    children.push(make_proper_code_block(inner.clone()).into());
                }
            }
            other if is_identifier(other) || is_evaluable(other) => children.push(other.clone()),
            _ => {}
        }
    }

    Ok(Some(Rewrite::node(
        start..=end - 1,
        Node::with_children(NodeKind::IdentifierAccessed, children),
    )))
}

// ═══════════════════════════════════════════════════════════════════════
// Literals and Bracket Pairs
// ═══════════════════════════════════════════════════════════════════════

/// A square pair that does not follow a value is an array literal.
pub(super) fn array(elements: &[Element]) -> RuleResult {
    let mut after_value = false;
    for (i, el) in elements.iter().enumerate() {
        if !after_value && el.is_node(NodeKind::SquareBracketPair) {
            return Ok(Some(Rewrite::node(
                i..=i,
                Node::with_children(NodeKind::Array, el.children().to_vec()),
            )));
        }
        after_value = is_identifier(el)
            || is_evaluable(el)
            || el.is_node(NodeKind::FunctionCall)
            || el.is_token(TokenKind::CloseParenthesis);
    }
    Ok(None)
}

pub(super) fn parenthesis_pair(elements: &[Element]) -> RuleResult {
    parenthesis_rule(
        elements,
        TokenKind::OpenParenthesis,
        TokenKind::CloseParenthesis,
        NodeKind::ParenthesisPair,
        |_| false,
        |_| false,
    )
}

pub(super) fn curly_pair(elements: &[Element]) -> RuleResult {
    parenthesis_rule(
        elements,
        TokenKind::OpenCurlyBracket,
        TokenKind::CloseCurlyBracket,
        NodeKind::CurlyBracketPair,
        |e| {
            e.is_node(NodeKind::MapElement)
                || e.is_node(NodeKind::Statement)
                || e.is_node(NodeKind::ReturnStatement)
                || e.is_token(TokenKind::Newline)
        },
        |e| e.is_token(TokenKind::Newline),
    )
}

pub(super) fn square_pair(elements: &[Element]) -> RuleResult {
    parenthesis_rule(
        elements,
        TokenKind::OpenSquareBracket,
        TokenKind::CloseSquareBracket,
        NodeKind::SquareBracketPair,
        |_| false,
        |_| false,
    )
}

/// Comma separated values up to a list finisher.
pub(super) fn listed_elements(elements: &[Element]) -> RuleResult {
    let mut children: Vec<Element> = Vec::new();
    let mut start: Option<usize> = None;
    let mut includes_non_list = false;
    let mut requires_comma = false;

    for (i, el) in elements.iter().enumerate() {
        if el.is_token(TokenKind::Newline) {
            continue;
        }
        let next = elements.get(i + 1);
        let after_dot = i > 0 && elements[i - 1].is_token(TokenKind::Dot);

        if after_dot {
            start = None;
            includes_non_list = false;
            children.clear();
        } else if !requires_comma && is_listable(el) {
            start.get_or_insert(i);
            if el.is_node(NodeKind::ListedElements) {
                children.extend(el.children().iter().cloned());
            } else {
                includes_non_list = true;
                children.push(el.clone());
            }
            requires_comma = true;
        } else if el.is_token(TokenKind::Comma) {
            let continues = next.is_some_and(|n| {
                is_evaluable(n)
                    || n.is_node(NodeKind::ListedElements)
                    || n.is_node(NodeKind::ParenthesisPair)
                    || n.is_node(NodeKind::MapElement)
                    || n.is_token(TokenKind::Newline)
            });
            if !children.is_empty() && !continues {
                start = None;
                includes_non_list = false;
                children.clear();
            }
            requires_comma = false;
        } else if is_open_bracket(el) {
            start = None;
            includes_non_list = false;
            requires_comma = false;
            children.clear();
        } else if let Some(begin) = start {
            if includes_non_list && children.len() > 1 && is_list_finisher(el) {
                return Ok(Some(Rewrite::node(
                    begin..=i - 1,
                    Node::with_children(NodeKind::ListedElements, children),
                )));
            }
            start = None;
            includes_non_list = false;
            requires_comma = false;
            children.clear();
        }
    }
    Ok(None)
}
