//! Apply-once rules: token normalization and validation

use crate::error::ParseError;
use crate::lexer::TokenKind;
use crate::operator::Operators;
use crate::parser::node::{Element, Node, NodeKind};
use crate::parser::predicates::is_literal;

use super::{Rewrite, RuleResult};

fn is_separator(el: &Element) -> bool {
    el.is_token(TokenKind::Newline) || el.is_token(TokenKind::Semicolon)
}

pub(super) fn remove_comments(elements: &[Element]) -> RuleResult {
    Ok(elements
        .iter()
        .position(|el| el.is_token(TokenKind::Comment))
        .map(Rewrite::remove))
}

pub(super) fn collapse_separators(elements: &[Element]) -> RuleResult {
    Ok(elements
        .windows(2)
        .position(|pair| is_separator(&pair[0]) && is_separator(&pair[1]))
        .map(Rewrite::remove))
}

pub(super) fn line_continuation(elements: &[Element]) -> RuleResult {
    Ok(elements
        .windows(2)
        .position(|pair| {
            pair[0].is_token(TokenKind::Newline)
                && (pair[1].is_token(TokenKind::Operator) || pair[1].is_token(TokenKind::Dot))
        })
        .map(Rewrite::remove))
}

/// `x instanceof T` reads as `x.type() == T`.
pub(super) fn instanceof(elements: &[Element]) -> RuleResult {
    let Some(i) = elements.iter().position(|el| el.is_keyword("instanceof")) else {
        return Ok(None);
    };
    if i == 0 || i + 1 >= elements.len() {
        return Err(ParseError::syntax(
            "instanceof must be preceded and followed by something that can be evaluated to a value",
        ));
    }
    Ok(Some(Rewrite::elements(
        i..=i,
        vec![
            Element::token(TokenKind::Dot, "."),
            Element::token(TokenKind::Identifier, "type"),
            Element::token(TokenKind::OpenParenthesis, "("),
            Element::token(TokenKind::CloseParenthesis, ")"),
            Element::token(TokenKind::Operator, "=="),
        ],
    )))
}

pub(super) fn else_if(elements: &[Element]) -> RuleResult {
    Ok(elements
        .windows(2)
        .position(|pair| pair[0].is_keyword("else") && pair[1].is_keyword("if"))
        .map(|i| Rewrite::elements(i..=i + 1, vec![Element::token(TokenKind::Keyword, "elif")])))
}

pub(super) fn newline_before_else(elements: &[Element]) -> RuleResult {
    Ok(elements
        .windows(2)
        .position(|pair| {
            pair[0].is_token(TokenKind::Newline)
                && (pair[1].is_keyword("elif") || pair[1].is_keyword("else"))
        })
        .map(Rewrite::remove))
}

pub(super) fn reserved_new(elements: &[Element]) -> RuleResult {
    for (i, el) in elements.iter().enumerate() {
        if !el.is_keyword("new") {
            continue;
        }
        let next = elements.get(i + 1);
        let ok = next.is_some_and(|n| {
            n.is_token(TokenKind::Identifier) || n.is_token(TokenKind::OpenCurlyBracket)
        });
        if !ok {
            return Err(ParseError::syntax_at(
                "'new' is a reserved keyword and cannot be used as an identifier",
                el.to_string(),
            ));
        }
    }
    Ok(None)
}

fn shape_options(operators: &Operators, symbol: &str) -> String {
    operators
        .find_operators(symbol)
        .iter()
        .map(|op| {
            format!(
                "{}{}{}",
                if op.takes_left() { "l (" } else { "[" },
                op.symbol(),
                if op.takes_right() { ") r" } else { "]" }
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `(op)`, `[op)` and `(op]` become operator functions.
pub(super) fn operator_function(elements: &[Element], operators: &Operators) -> RuleResult {
    for i in 1..elements.len().saturating_sub(1) {
        let Element::Token(token) = &elements[i] else {
            continue;
        };
        if token.kind != TokenKind::Operator {
            continue;
        }
        let (prev, next) = (&elements[i - 1], &elements[i + 1]);
        let left_open = prev.is_token(TokenKind::OpenParenthesis);
        let right_open = next.is_token(TokenKind::CloseParenthesis);
        let left_closed = prev.is_token(TokenKind::OpenSquareBracket);
        let right_closed = next.is_token(TokenKind::CloseSquareBracket);

        if (left_open || right_open) && (left_open || left_closed) && (right_open || right_closed) {
            return match operators.find_operator(&token.value, left_open, right_open) {
                Some(op) => Ok(Some(Rewrite::node(
                    i - 1..=i + 1,
                    Node::with_operator(NodeKind::OperatorFunction, op, Vec::new()),
                ))),
                None => Err(ParseError::syntax(format!(
                    "Operator with associativity does not exist, use one of: {}",
                    shape_options(operators, &token.value)
                ))),
            };
        }
        if left_closed && right_closed {
            return Err(ParseError::syntax(format!(
                "Operator must take at least one parameter, use one of: {}",
                shape_options(operators, &token.value)
            )));
        }
    }
    Ok(None)
}

pub(super) fn bracket_balance(elements: &[Element]) -> RuleResult {
    let mut stack: Vec<TokenKind> = Vec::new();
    for el in elements {
        let Some(token) = el.as_token() else {
            continue;
        };
        let (expected, message) = match token.kind {
            TokenKind::OpenParenthesis
            | TokenKind::OpenSquareBracket
            | TokenKind::OpenCurlyBracket => {
                stack.push(token.kind);
                continue;
            }
            TokenKind::CloseParenthesis => {
                (TokenKind::OpenParenthesis, "Unexpected closing parenthesis")
            }
            TokenKind::CloseSquareBracket => {
                (TokenKind::OpenSquareBracket, "Unexpected closing square bracket")
            }
            TokenKind::CloseCurlyBracket => {
                (TokenKind::OpenCurlyBracket, "Unexpected closing curly bracket")
            }
            _ => continue,
        };
        if stack.pop() != Some(expected) {
            return Err(ParseError::syntax_at(message, token.to_string()));
        }
    }
    match stack.last() {
        Some(kind) => Err(ParseError::syntax(format!(
            "Unexpected opening {}",
            match kind {
                TokenKind::OpenSquareBracket => "square bracket",
                TokenKind::OpenCurlyBracket => "curly bracket",
                _ => "parenthesis",
            }
        ))),
        None => Ok(None),
    }
}

pub(super) fn after_closing_bracket(elements: &[Element]) -> RuleResult {
    for pair in elements.windows(2) {
        let (close, next) = (&pair[0], &pair[1]);
        let square = close.is_token(TokenKind::CloseSquareBracket);
        let curly = close.is_token(TokenKind::CloseCurlyBracket);
        if !square && !curly {
            continue;
        }
        let what = if next.is_token(TokenKind::Identifier) {
            "identifier"
        } else if next.is_token(TokenKind::Keyword) {
            "keyword"
        } else if is_literal(next) {
            "literal"
        } else {
            continue;
        };
        if (square && next.is_keyword("as"))
            || (curly && (next.is_keyword("else") || next.is_keyword("elif")))
        {
            continue;
        }
        return Err(ParseError::syntax_at(
            format!(
                "Unexpected {what} after closing parenthesis (are you missing a semicolon or newline?)"
            ),
            next.to_string(),
        ));
    }
    Ok(None)
}

pub(super) fn literal_after_literal(elements: &[Element]) -> RuleResult {
    match elements
        .windows(2)
        .find(|pair| is_literal(&pair[0]) && is_literal(&pair[1]))
    {
        Some(pair) => Err(ParseError::syntax_at(
            "Unexpected literal after literal",
            pair[1].to_string(),
        )),
        None => Ok(None),
    }
}

pub(super) fn identifier_after_identifier(elements: &[Element]) -> RuleResult {
    match elements.windows(2).find(|pair| {
        pair[0].is_token(TokenKind::Identifier) && pair[1].is_token(TokenKind::Identifier)
    }) {
        Some(pair) => Err(ParseError::syntax_at(
            "Unexpected identifier after identifier",
            pair[1].to_string(),
        )),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn elements(src: &str) -> Vec<Element> {
        tokenize(src, &Operators::default())
            .unwrap()
            .into_iter()
            .map(Element::Token)
            .collect()
    }

    #[test]
    fn test_collapse_separators_removes_first() {
        let els = elements("a;\nb");
        let rewrite = collapse_separators(&els).unwrap().unwrap();
        assert_eq!(rewrite.span, 1..=1);
    }

    #[test]
    fn test_instanceof_desugars() {
        let els = elements("x instanceof y");
        let rewrite = instanceof(&els).unwrap().unwrap();
        let texts: Vec<String> = rewrite
            .replacement
            .iter()
            .map(|e| e.text().unwrap_or_default().to_string())
            .collect();
        assert_eq!(texts, vec![".", "type", "(", ")", "=="]);
    }

    #[test]
    fn test_instanceof_requires_operands() {
        assert!(instanceof(&elements("instanceof y")).is_err());
    }

    #[test]
    fn test_operator_function_shapes() {
        let ops = Operators::default();
        let rewrite = operator_function(&elements("(+)"), &ops).unwrap().unwrap();
        assert_eq!(rewrite.span, 0..=2);
        let err = operator_function(&elements("(*]"), &ops).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Operator with associativity does not exist, use one of: l (*) r"
        );
        let err = operator_function(&elements("[+]"), &ops).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Operator must take at least one parameter"));
    }

    #[test]
    fn test_bracket_balance_messages() {
        let err = bracket_balance(&elements("(a]")).unwrap_err();
        assert!(err.to_string().starts_with("Unexpected closing square bracket"));
        let err = bracket_balance(&elements("(a")).unwrap_err();
        assert_eq!(err.to_string(), "Unexpected opening parenthesis");
        let err = bracket_balance(&elements("a)")).unwrap_err();
        assert!(err.to_string().starts_with("Unexpected closing parenthesis"));
    }

    #[test]
    fn test_after_closing_bracket_exceptions() {
        assert!(after_closing_bracket(&elements("export [a] as B")).unwrap().is_none());
        assert!(after_closing_bracket(&elements("if (a) {b} else {c}")).unwrap().is_none());
        assert!(after_closing_bracket(&elements("{a} b")).is_err());
    }

    #[test]
    fn test_adjacent_literals_and_identifiers() {
        assert!(literal_after_literal(&elements("1 2")).is_err());
        assert!(identifier_after_identifier(&elements("a b")).is_err());
        assert!(identifier_after_identifier(&elements("a.b")).unwrap().is_none());
    }

    #[test]
    fn test_reserved_new() {
        assert!(reserved_new(&elements("new Foo()")).unwrap().is_none());
        assert!(reserved_new(&elements("f(new)")).is_err());
    }
}
