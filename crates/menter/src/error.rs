//! Error types for Menter parsing and evaluation

use thiserror::Error;

use crate::eval::control::ControlFlow;

/// Errors raised while turning source text into a syntax tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The lexer met a character that starts no token
    #[error("Unexpected character '{text}' on line {line}")]
    Lex {
        /// 1-based line number
        line: usize,
        /// The offending text
        text: String,
    },

    /// A structural rule rejected the working token tree
    #[error("{}", render_syntax(.message, .offending, .tree))]
    Syntax {
        /// Human readable description
        message: String,
        /// Display form of the offending element, if one was identified
        offending: Option<String>,
        /// The whole working tree, attached in verbose mode
        tree: Option<String>,
    },
}

impl ParseError {
    /// Create a syntax error without an offending element.
    pub fn syntax(message: impl Into<String>) -> Self {
        ParseError::Syntax {
            message: message.into(),
            offending: None,
            tree: None,
        }
    }

    /// Create a syntax error naming the offending element.
    pub fn syntax_at(message: impl Into<String>, offending: impl Into<String>) -> Self {
        ParseError::Syntax {
            message: message.into(),
            offending: Some(offending.into()),
            tree: None,
        }
    }

    /// Attach a snapshot of the working tree.
    pub fn with_tree(self, snapshot: String) -> Self {
        match self {
            ParseError::Syntax {
                message, offending, ..
            } => ParseError::Syntax {
                message,
                offending,
                tree: Some(snapshot),
            },
            other => other,
        }
    }
}

fn render_syntax(message: &str, offending: &Option<String>, tree: &Option<String>) -> String {
    let mut out = message.to_string();
    if let Some(offending) = offending {
        out.push_str(": ");
        out.push_str(offending);
    }
    if let Some(tree) = tree {
        out.push_str("\n\nParsed tree:\n");
        out.push_str(tree);
    }
    out
}

/// Errors raised while evaluating a syntax tree.
#[derive(Error, Debug, Clone)]
pub enum EvalError {
    /// A symbol could not be found in any visible table
    #[error("Cannot resolve symbol '{name}' on\n{code}")]
    UnresolvedSymbol {
        /// The segment that failed
        name: String,
        /// The full expression text
        code: String,
    },

    /// Function called with the wrong number of arguments
    #[error("Function {name} requires {expected} arguments, but {got} were given")]
    ArityMismatch {
        /// Expected parameter count
        expected: usize,
        /// Supplied argument count
        got: usize,
        /// Function name
        name: String,
    },

    /// Operator node with the wrong number of operands
    #[error("Operator {symbol} requires {expected} arguments, but {got} were given")]
    OperatorArity {
        /// Operator symbol
        symbol: String,
        /// Operand count of the operator
        expected: usize,
        /// Operand count of the node
        got: usize,
    },

    /// An operator yielded no value for its operands
    #[error("Operator {symbol} {message}")]
    Operator {
        /// Operator symbol
        symbol: String,
        /// What went wrong
        message: String,
    },

    /// A non-function value was called
    #[error("Value of type {type_name} is not callable: {code}")]
    NotCallable {
        /// Type of the value that was called
        type_name: String,
        /// Expression text
        code: String,
    },

    /// No native function matched any candidate module
    #[error("No native function '{name}' registered for any of: {}", .candidates.join(", "))]
    NativeNotFound {
        /// Declared function name
        name: String,
        /// Module names that were tried
        candidates: Vec<String>,
    },

    /// Native declaration below module top level
    #[error("Native function '{name}' may only be declared at module top level")]
    NativeOutsideModule {
        /// Declared function name
        name: String,
    },

    /// Import graph contains a cycle
    #[error("Circular dependency between: {}", .sources.join(", "))]
    CircularDependency {
        /// Sources that could not be ordered
        sources: Vec<String>,
    },

    /// Import of an unknown module or source
    #[error("Module '{name}' not found, available: {}", .available.join(", "))]
    ModuleNotFound {
        /// Requested module name
        name: String,
        /// Known module and source names
        available: Vec<String>,
    },

    /// Constructor call on an unregistered type
    #[error("Unknown type '{name}'")]
    UnknownType {
        /// Requested type name
        name: String,
    },

    /// Type error
    #[error("Type error: {message}")]
    TypeError {
        /// Error message
        message: String,
    },

    /// A node that cannot be evaluated on its own
    #[error("Cannot evaluate {kind}: {code}")]
    InvalidNode {
        /// Node kind
        kind: String,
        /// Reconstructed source
        code: String,
    },

    /// Error raised inside a native function or method
    #[error("Error in {name}: {message}")]
    Native {
        /// Function name
        name: String,
        /// Error message
        message: String,
    },

    /// `break` or `continue` escaped every loop
    #[error("'{keyword}' used outside of a loop")]
    LoopControlOutsideLoop {
        /// The keyword
        keyword: String,
    },

    /// Stack overflow
    #[error("Stack overflow: call depth {depth} exceeds maximum {max}")]
    StackOverflow {
        /// Current depth
        depth: usize,
        /// Maximum allowed depth
        max: usize,
    },

    /// Evaluation was interrupted
    #[error("Evaluation interrupted")]
    Interrupted,

    /// Control flow signal (not a real error)
    #[error("Control flow")]
    ControlFlow(ControlFlow),

    /// A top-level statement failed
    #[error("{source}\n  in statement: {code}{}", render_stack(.stack))]
    Traced {
        /// Reconstructed statement source
        code: String,
        /// Call stack at the point of failure
        stack: Vec<String>,
        /// The underlying error
        source: Box<EvalError>,
    },
}

impl EvalError {
    /// Create a type error.
    pub fn type_error(message: impl Into<String>) -> Self {
        EvalError::TypeError {
            message: message.into(),
        }
    }

    /// The innermost error, looking through trace wrappers.
    pub fn root_cause(&self) -> &EvalError {
        match self {
            EvalError::Traced { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

fn render_stack(stack: &[String]) -> String {
    stack
        .iter()
        .rev()
        .map(|frame| format!("\n  at {frame}"))
        .collect()
}

/// Main error type for Menter operations
#[derive(Error, Debug, Clone)]
pub enum MenterError {
    /// Parsing failed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Evaluation failed
    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),
}

/// Result type alias for Menter operations
pub type Result<T> = std::result::Result<T, MenterError>;
