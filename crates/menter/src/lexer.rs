//! Lexer for Menter source text
//!
//! Built on `logos`. Raw operator-character runs are split afterwards into
//! the longest symbols known to the operator table, so user-defined
//! operators lex without changes here.

use std::fmt;

use logos::Logos;
use tracing::trace;

use crate::error::ParseError;
use crate::operator::Operators;

/// Kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Identifier
    Identifier,
    /// Number literal
    NumberLiteral,
    /// `true` or `false`
    BooleanLiteral,
    /// String literal, quotes included
    StringLiteral,
    /// Regex literal `r/body/flags`
    RegexLiteral,
    /// Operator symbol
    Operator,
    /// Reserved word
    Keyword,
    /// `(`
    OpenParenthesis,
    /// `)`
    CloseParenthesis,
    /// `[`
    OpenSquareBracket,
    /// `]`
    CloseSquareBracket,
    /// `{`
    OpenCurlyBracket,
    /// `}`
    CloseCurlyBracket,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// Line break
    Newline,
    /// `;`
    Semicolon,
    /// End of input marker, appended by the parser
    Eof,
    /// Line or block comment
    Comment,
    /// `pass`
    Pass,
    /// `continue`
    Continue,
    /// `break`
    Break,
}

impl TokenKind {
    /// Whether this kind is one of the literal kinds.
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::NumberLiteral
                | TokenKind::BooleanLiteral
                | TokenKind::StringLiteral
                | TokenKind::RegexLiteral
        )
    }

    fn name(self) -> &'static str {
        match self {
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::NumberLiteral => "NUMBER_LITERAL",
            TokenKind::BooleanLiteral => "BOOLEAN_LITERAL",
            TokenKind::StringLiteral => "STRING_LITERAL",
            TokenKind::RegexLiteral => "REGEX_LITERAL",
            TokenKind::Operator => "OPERATOR",
            TokenKind::Keyword => "KEYWORD",
            TokenKind::OpenParenthesis => "OPEN_PARENTHESIS",
            TokenKind::CloseParenthesis => "CLOSE_PARENTHESIS",
            TokenKind::OpenSquareBracket => "OPEN_SQUARE_BRACKET",
            TokenKind::CloseSquareBracket => "CLOSE_SQUARE_BRACKET",
            TokenKind::OpenCurlyBracket => "OPEN_CURLY_BRACKET",
            TokenKind::CloseCurlyBracket => "CLOSE_CURLY_BRACKET",
            TokenKind::Comma => "COMMA",
            TokenKind::Dot => "DOT",
            TokenKind::Newline => "NEWLINE",
            TokenKind::Semicolon => "SEMICOLON",
            TokenKind::Eof => "EOF",
            TokenKind::Comment => "COMMENT",
            TokenKind::Pass => "PASS",
            TokenKind::Continue => "CONTINUE",
            TokenKind::Break => "BREAK",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A lexical token: its kind and text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token kind
    pub kind: TokenKind,
    /// Token text. String literals keep their quotes with escapes resolved.
    pub value: String,
}

impl Token {
    /// Create a token.
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// The end-of-input marker.
    pub fn eof() -> Self {
        Self::new(TokenKind::Eof, "")
    }

    /// Source text that lexes back to this token.
    pub fn reconstruct_code(&self) -> String {
        match self.kind {
            TokenKind::StringLiteral => {
                let quote = self.value.chars().next().unwrap_or('"');
                let inner = string_contents(&self.value);
                let mut out = String::with_capacity(inner.len() + 2);
                out.push(quote);
                for c in inner.chars() {
                    match c {
                        '\n' => out.push_str("\\n"),
                        '\t' => out.push_str("\\t"),
                        '\r' => out.push_str("\\r"),
                        '\\' => out.push_str("\\\\"),
                        c if c == quote => {
                            out.push('\\');
                            out.push(c);
                        }
                        c => out.push(c),
                    }
                }
                out.push(quote);
                out
            }
            TokenKind::Newline => "\n".to_string(),
            _ => self.value.clone(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.value)
    }
}

/// Text of a string literal without its surrounding quotes.
pub fn string_contents(literal: &str) -> &str {
    let mut chars = literal.chars();
    match (chars.next(), chars.next_back()) {
        (Some(open), Some(close)) if open == close && (open == '"' || open == '\'') => {
            &literal[1..literal.len() - 1]
        }
        _ => literal,
    }
}

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\f]+")]
enum RawToken {
    #[regex(r"##([^#]|#[^#])*##")]
    BlockComment,

    #[regex(r"#[^\n]*")]
    LineComment,

    #[token("\n")]
    Newline,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token("(")]
    OpenParen,

    #[token(")")]
    CloseParen,

    #[token("[")]
    OpenSquare,

    #[token("]")]
    CloseSquare,

    #[token("{")]
    OpenCurly,

    #[token("}")]
    CloseCurly,

    #[token("if")]
    #[token("elif")]
    #[token("else")]
    #[token("for")]
    #[token("in")]
    #[token("while")]
    #[token("return")]
    #[token("import")]
    #[token("export")]
    #[token("as")]
    #[token("inline")]
    #[token("new")]
    #[token("native")]
    #[token("instanceof")]
    #[token("null")]
    Keyword,

    #[token("pass")]
    Pass,

    #[token("continue")]
    Continue,

    #[token("break")]
    Break,

    #[token("true")]
    #[token("false")]
    Boolean,

    #[regex(r"r/([^/\\\n]|\\.)*/[a-z]*", priority = 10)]
    Regex,

    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*")]
    Identifier,

    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?")]
    Number,

    #[regex(r#""([^"\\]|\\.)*""#)]
    #[regex(r"'([^'\\]|\\.)*'")]
    String,

    #[regex(r"[+\-*/%^!=<>&|:?~@]+")]
    OperatorRun,
}

/// Split source text into tokens.
///
/// The end-of-input marker is not emitted; the parser appends it.
pub fn tokenize(source: &str, operators: &Operators) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut lexer = RawToken::lexer(source);

    while let Some(result) = lexer.next() {
        let slice = lexer.slice();
        let raw = match result {
            Ok(raw) => raw,
            Err(_) => {
                let line = source[..lexer.span().start].matches('\n').count() + 1;
                return Err(ParseError::Lex {
                    line,
                    text: slice.to_string(),
                });
            }
        };

        let kind = match raw {
            RawToken::BlockComment | RawToken::LineComment => TokenKind::Comment,
            RawToken::Newline => TokenKind::Newline,
            RawToken::Semicolon => TokenKind::Semicolon,
            RawToken::Comma => TokenKind::Comma,
            RawToken::Dot => TokenKind::Dot,
            RawToken::OpenParen => TokenKind::OpenParenthesis,
            RawToken::CloseParen => TokenKind::CloseParenthesis,
            RawToken::OpenSquare => TokenKind::OpenSquareBracket,
            RawToken::CloseSquare => TokenKind::CloseSquareBracket,
            RawToken::OpenCurly => TokenKind::OpenCurlyBracket,
            RawToken::CloseCurly => TokenKind::CloseCurlyBracket,
            RawToken::Keyword => TokenKind::Keyword,
            RawToken::Pass => TokenKind::Pass,
            RawToken::Continue => TokenKind::Continue,
            RawToken::Break => TokenKind::Break,
            RawToken::Boolean => TokenKind::BooleanLiteral,
            RawToken::Regex => TokenKind::RegexLiteral,
            RawToken::Identifier => TokenKind::Identifier,
            RawToken::Number => TokenKind::NumberLiteral,
            RawToken::String => {
                tokens.push(Token::new(TokenKind::StringLiteral, unescape(slice)));
                continue;
            }
            RawToken::OperatorRun => {
                let line = source[..lexer.span().start].matches('\n').count() + 1;
                split_operators(slice, operators, line, &mut tokens)?;
                continue;
            }
        };
        tokens.push(Token::new(kind, slice));
    }

    trace!(count = tokens.len(), "tokenized source");
    Ok(tokens)
}

fn split_operators(
    mut run: &str,
    operators: &Operators,
    line: usize,
    tokens: &mut Vec<Token>,
) -> Result<(), ParseError> {
    while !run.is_empty() {
        let symbol = operators
            .longest_prefix(run)
            .ok_or_else(|| ParseError::Lex {
                line,
                text: run.to_string(),
            })?;
        tokens.push(Token::new(TokenKind::Operator, symbol));
        run = &run[symbol.len()..];
    }
    Ok(())
}

/// Resolve escape sequences inside a quoted literal, keeping the quotes.
fn unescape(literal: &str) -> String {
    let inner = string_contents(literal);
    let quote = literal.chars().next().unwrap_or('"');
    let mut out = String::with_capacity(literal.len());
    out.push(quote);
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<(TokenKind, String)> {
        tokenize(src, &Operators::default())
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.value))
            .collect()
    }

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).into_iter().map(|(k, _)| k).collect()
    }

    #[test]
    fn test_simple_expression() {
        assert_eq!(
            kinds("a = 1 + 2.5"),
            vec![
                TokenKind::Identifier,
                TokenKind::Operator,
                TokenKind::NumberLiteral,
                TokenKind::Operator,
                TokenKind::NumberLiteral,
            ]
        );
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let tokens = lex("if iffy import imports null");
        assert_eq!(tokens[0], (TokenKind::Keyword, "if".into()));
        assert_eq!(tokens[1], (TokenKind::Identifier, "iffy".into()));
        assert_eq!(tokens[2], (TokenKind::Keyword, "import".into()));
        assert_eq!(tokens[3], (TokenKind::Identifier, "imports".into()));
        assert_eq!(tokens[4], (TokenKind::Keyword, "null".into()));
    }

    #[test]
    fn test_operator_runs_split_greedily() {
        let tokens = lex("a+=1; b=-2; c |> d");
        let ops: Vec<String> = tokens
            .into_iter()
            .filter(|(k, _)| *k == TokenKind::Operator)
            .map(|(_, v)| v)
            .collect();
        assert_eq!(ops, vec!["+", "=", "=", "-", "|>"]);
    }

    #[test]
    fn test_unknown_operator_is_error() {
        let err = tokenize("a\n?? b", &Operators::default()).unwrap_err();
        assert_eq!(
            err,
            ParseError::Lex {
                line: 2,
                text: "??".into()
            }
        );
    }

    #[test]
    fn test_string_escapes_keep_quotes() {
        let tokens = lex(r#"test = "\"hey\"""#);
        assert_eq!(tokens[2], (TokenKind::StringLiteral, "\"\"hey\"\"".into()));
        let tokens = lex("'it\\'s'");
        assert_eq!(tokens[0], (TokenKind::StringLiteral, "'it's'".into()));
    }

    #[test]
    fn test_string_reconstruct_escapes() {
        let token = Token::new(TokenKind::StringLiteral, "\"a\"b\n\"");
        assert_eq!(token.reconstruct_code(), "\"a\\\"b\\n\"");
    }

    #[test]
    fn test_regex_literal() {
        assert_eq!(
            lex("regex = r/regex/ig")[2],
            (TokenKind::RegexLiteral, "r/regex/ig".into())
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            kinds("# line\n## block\ncomment ##\nx"),
            vec![
                TokenKind::Comment,
                TokenKind::Newline,
                TokenKind::Comment,
                TokenKind::Newline,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_loop_control_kinds() {
        assert_eq!(
            kinds("pass continue break"),
            vec![TokenKind::Pass, TokenKind::Continue, TokenKind::Break]
        );
    }

    #[test]
    fn test_member_access_on_number() {
        assert_eq!(
            kinds("1.5 a.b"),
            vec![
                TokenKind::NumberLiteral,
                TokenKind::Identifier,
                TokenKind::Dot,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_token_display() {
        assert_eq!(
            Token::new(TokenKind::NumberLiteral, "2").to_string(),
            "NUMBER_LITERAL: 2"
        );
    }
}
