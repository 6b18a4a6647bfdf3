//! # Menter
//!
//! A small dynamically typed scripting language: a token-tree rewriting
//! parser and a tree-walking interpreter with modules, closures, accessor
//! chains, pipelines and host function interop.
//!
//! ## Architecture
//!
//! - **Lexer**: source text to typed tokens ([`lexer`])
//! - **Parser**: ordered rewrite rules applied to a fixed point, one rule
//!   tier per operator precedence ([`parser`], [`operator`])
//! - **Modules**: units, imports and exports, evaluation order ([`module`])
//! - **Evaluator**: scoped symbol resolution and call dispatch ([`eval`])
//! - **Runtime**: the embedding API tying it together ([`runtime`])
//!
//! ```
//! use menter::{Runtime, Value};
//!
//! let mut runtime = Runtime::new().unwrap();
//! let value = runtime
//!     .evaluate("add(a, b) = a + b\ndouble(x) = x * 2\n1 |> add(2) |> double")
//!     .unwrap();
//! assert_eq!(value, Value::from(6.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod environment;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod module;
pub mod operator;
pub mod parser;
pub mod runtime;
pub mod value;

use std::sync::Once;

// Re-export main types
pub use context::EvalConfig;
pub use environment::{Environment, NativeRegistry};
pub use error::{EvalError, MenterError, ParseError, Result};
pub use eval::{ControlFlow, Evaluate, Scope, SymbolMode};
pub use lexer::{tokenize, Token, TokenKind};
pub use module::{GlobalContext, Import, Module, ModuleOptions};
pub use operator::{Operator, Operators};
pub use parser::{Element, Node, NodeKind, Parser, RuleCache};
pub use runtime::Runtime;
pub use value::{
    CustomType, FunctionValue, MethodRegistry, NativeFn, Number, SymbolTable, TypeEntry,
    TypeRegistry, Value, ValueCell,
};

/// Menter version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

static TRACING: Once = Once::new();

/// Install a `tracing` formatter filtered by `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset or a subscriber is already
/// installed. Safe to call more than once.
pub fn init_tracing() {
    TRACING.call_once(|| {
        if std::env::var_os("RUST_LOG").is_none() {
            return;
        }
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_target(false)
            .try_init();
    });
}
