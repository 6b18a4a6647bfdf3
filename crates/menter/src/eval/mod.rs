//! Tree evaluation

pub mod assign;
pub mod binary;
pub mod call;
pub mod control;
pub mod function;
pub mod if_expr;
pub mod literal;
pub mod loops;
pub mod methods;
pub mod path;

use std::rc::Rc;

use tracing::debug;

use crate::environment::Environment;
use crate::error::EvalError;
use crate::lexer::Token;
use crate::module::GlobalContext;
use crate::parser::{Element, Node, NodeKind};
use crate::value::{SymbolTable, Value};

pub use control::ControlFlow;

/// What resolution does with a symbol that does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolMode {
    /// Create an empty value (or an empty map for intermediate segments)
    CreateIfMissing,
    /// Raise [`EvalError::UnresolvedSymbol`]
    ThrowIfMissing,
}

/// Where a node is evaluated: its unit, its locals and the resolution mode.
///
/// At the top level of a unit the locals are the unit's global table.
/// Inside a function body `global` is the calling unit and `origin` the
/// unit the function was defined in; globals are looked up in that order.
#[derive(Debug, Clone)]
pub struct Scope {
    /// The unit globals are resolved in first
    pub global: Rc<GlobalContext>,
    /// Defining unit of the executing function
    pub origin: Option<Rc<GlobalContext>>,
    /// Local symbols
    pub locals: SymbolTable,
    /// Resolution mode
    pub mode: SymbolMode,
}

impl Scope {
    /// Top level of a unit.
    pub fn top_level(global: Rc<GlobalContext>) -> Self {
        let locals = global.variables().clone();
        Self {
            global,
            origin: None,
            locals,
            mode: SymbolMode::ThrowIfMissing,
        }
    }

    /// A function body: fresh locals, called from `global`, defined in
    /// `origin`.
    pub fn function_body(
        global: Rc<GlobalContext>,
        origin: Rc<GlobalContext>,
        locals: SymbolTable,
    ) -> Self {
        let origin = (!Rc::ptr_eq(&global, &origin)).then_some(origin);
        Self {
            global,
            origin,
            locals,
            mode: SymbolMode::ThrowIfMissing,
        }
    }

    /// The units consulted for globals, innermost first.
    pub fn contexts(&self) -> impl Iterator<Item = &Rc<GlobalContext>> {
        std::iter::once(&self.global).chain(self.origin.iter())
    }

    /// The unit code running in this scope was written in.
    pub fn defining_context(&self) -> &Rc<GlobalContext> {
        self.origin.as_ref().unwrap_or(&self.global)
    }

    /// The same scope in another resolution mode.
    pub fn with_mode(&self, mode: SymbolMode) -> Self {
        Self {
            mode,
            ..self.clone()
        }
    }

    /// Whether the locals are the unit's global table.
    pub fn is_top_level(&self) -> bool {
        self.locals.ptr_eq(self.global.variables())
    }
}

/// Trait for evaluating syntax tree elements to values.
///
/// This is the core abstraction for the tree-walking interpreter.
pub trait Evaluate {
    /// Evaluate this element in the given environment and scope.
    fn eval(&self, env: &mut Environment, scope: &Scope) -> Result<Value, EvalError>;
}

// ═══════════════════════════════════════════════════════════════════════
// Main Dispatcher
// ═══════════════════════════════════════════════════════════════════════

impl Evaluate for Element {
    fn eval(&self, env: &mut Environment, scope: &Scope) -> Result<Value, EvalError> {
        match self {
            Element::Token(token) => token.eval(env, scope),
            Element::Node(node) => node.eval(env, scope),
        }
    }
}

impl Evaluate for Token {
    fn eval(&self, env: &mut Environment, scope: &Scope) -> Result<Value, EvalError> {
        literal::eval_token(self, env, scope)
    }
}

impl Evaluate for Node {
    fn eval(&self, env: &mut Environment, scope: &Scope) -> Result<Value, EvalError> {
        // Check for interruption before each node
        env.check_interrupt()?;

        match self.kind {
            NodeKind::Root | NodeKind::Statement | NodeKind::CodeBlock => {
                eval_sequence(&self.children, env, scope)
            }

            // Literals
            NodeKind::Array | NodeKind::SquareBracketPair | NodeKind::ListedElements => {
                literal::eval_array(&self.children, env, scope)
            }
            NodeKind::Map => literal::eval_map(self, env, scope),
            NodeKind::CurlyBracketPair if self.is_leaf() => Ok(Value::map(Vec::new())),
            NodeKind::ParenthesisPair => match self.children.as_slice() {
                [] => Ok(Value::Empty),
                [single] => single.eval(env, scope),
                many => literal::eval_array(many, env, scope),
            },

            // Operators and symbols
            NodeKind::Expression => binary::eval_expression(self, env, scope),
            NodeKind::IdentifierAccessed => path::resolve_accessed(self, env, scope).map(|c| c.get()),
            NodeKind::Assignment => assign::eval_assignment(self, env, scope),
            NodeKind::OperatorFunction => function::eval_operator_function(self),

            // Functions
            NodeKind::FunctionCall => call::eval_call(self, env, scope),
            NodeKind::ConstructorCall => call::eval_constructor(self, env, scope),
            NodeKind::FunctionDeclaration => function::eval_declaration(self, env, scope),
            NodeKind::FunctionInline => function::eval_inline(self, scope),
            NodeKind::ReturnStatement => {
                let value = match self.children.first() {
                    Some(value) => value.eval(env, scope)?,
                    None => Value::Empty,
                };
                Err(ControlFlow::return_value(value).into())
            }

            // Control flow
            NodeKind::Conditional => if_expr::eval_conditional(self, env, scope),
            NodeKind::LoopFor => loops::eval_for(self, env, scope),
            NodeKind::LoopWhile => loops::eval_while(self, env, scope),

            // Extracted when the unit is loaded
            NodeKind::ImportStatement
            | NodeKind::ImportAsStatement
            | NodeKind::ImportInlineStatement
            | NodeKind::ExportStatement => Ok(Value::Empty),

            _ => Err(invalid_node(self)),
        }
    }
}

/// Evaluate elements in order, yielding the last value.
pub fn eval_sequence(
    children: &[Element],
    env: &mut Environment,
    scope: &Scope,
) -> Result<Value, EvalError> {
    let mut last = Value::Empty;
    for child in children {
        last = child.eval(env, scope)?;
    }
    Ok(last)
}

/// Evaluate the top level of a unit.
///
/// A `return` ends the unit with its value. Any other failure is wrapped
/// once with the statement's source and the call stack.
pub fn eval_root(
    root: &Node,
    env: &mut Environment,
    context: &Rc<GlobalContext>,
) -> Result<Value, EvalError> {
    debug!(source = context.source(), statements = root.children.len(), "evaluating unit");
    let scope = Scope::top_level(Rc::clone(context));
    let mut last = Value::Empty;
    for statement in &root.children {
        match statement.eval(env, &scope) {
            Ok(value) => last = value,
            Err(EvalError::ControlFlow(ControlFlow::Return { value })) => return Ok(value),
            Err(EvalError::ControlFlow(flow)) => {
                return Err(traced(flow.outside_loop(), statement, env))
            }
            Err(err) => return Err(traced(err, statement, env)),
        }
    }
    Ok(last)
}

fn traced(err: EvalError, statement: &Element, env: &mut Environment) -> EvalError {
    let stack = env.take_failure_stack();
    match err {
        EvalError::Traced { .. } => err,
        source => EvalError::Traced {
            code: statement.reconstruct_code(),
            stack,
            source: Box::new(source),
        },
    }
}

/// Error for a node that has no meaning on its own.
pub(crate) fn invalid_node(node: &Node) -> EvalError {
    EvalError::InvalidNode {
        kind: node.kind.to_string(),
        code: node.reconstruct_code(),
    }
}

/// Error for an element that is not a valid parameter or target.
pub(crate) fn invalid_element(el: &Element) -> EvalError {
    match el {
        Element::Node(node) => invalid_node(node),
        Element::Token(token) => EvalError::InvalidNode {
            kind: token.kind.to_string(),
            code: token.reconstruct_code(),
        },
    }
}
