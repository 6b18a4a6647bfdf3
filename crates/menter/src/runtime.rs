//! Embedding API: load units, order them by their imports, evaluate
//!
//! A [`Runtime`] owns every loaded unit. Loading only parses; units are
//! evaluated by [`Runtime::finish_loading`] once all their dependencies are
//! known:
//!
//! ```text
//! load_source → parse → extract imports/exports
//! finish_loading → link imports → order units → evaluate pending roots
//! ```

use std::rc::Rc;

use tracing::{debug, trace};

use crate::context::EvalConfig;
use crate::environment::{Environment, CORE_SOURCE, CORE_SOURCE_NAME};
use crate::error::{EvalError, Result};
use crate::eval::eval_root;
use crate::module::{GlobalContext, ModuleOptions, SOURCE_EXTENSION};
use crate::operator::Operators;
use crate::parser::{Node, Parser, RuleCache};
use crate::value::{TypeEntry, Value};

/// Source name of throwaway contexts created by [`Runtime::evaluate`].
const EPHEMERAL_SOURCE: &str = "eval";

/// A Menter interpreter instance.
///
/// # Example
///
/// ```
/// use menter::{Runtime, Value};
///
/// let mut runtime = Runtime::new().unwrap();
/// runtime
///     .load_source("math.mtr", "add(a, b) = a + b\nexport [add] as Math")
///     .unwrap();
/// runtime.finish_loading().unwrap();
///
/// let value = runtime.evaluate("import Math\nMath.add(1, 2)").unwrap();
/// assert_eq!(value, Value::from(3.0));
/// ```
#[derive(Debug)]
pub struct Runtime {
    operators: Operators,
    rule_cache: RuleCache,
    env: Environment,
    options: ModuleOptions,
    contexts: Vec<Rc<GlobalContext>>,
}

impl Runtime {
    /// A runtime with the standard operators and the core unit loaded.
    pub fn new() -> Result<Self> {
        Self::with_options(ModuleOptions::default())
    }

    /// A runtime with custom module options.
    pub fn with_options(options: ModuleOptions) -> Result<Self> {
        Self::build(Operators::default(), options, EvalConfig::default())
    }

    /// A runtime with a custom operator table.
    pub fn with_operators(operators: Operators) -> Result<Self> {
        Self::build(operators, ModuleOptions::default(), EvalConfig::default())
    }

    /// A runtime with a custom evaluation configuration.
    pub fn with_config(config: EvalConfig) -> Result<Self> {
        Self::build(Operators::default(), ModuleOptions::default(), config)
    }

    fn build(operators: Operators, options: ModuleOptions, config: EvalConfig) -> Result<Self> {
        let mut runtime = Self {
            operators,
            rule_cache: RuleCache::default(),
            env: Environment::with_config(config),
            options,
            contexts: Vec::new(),
        };
        if runtime.options.load_core {
            runtime.load_source(CORE_SOURCE_NAME, CORE_SOURCE)?;
            runtime.finish_loading()?;
        }
        Ok(runtime)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════

    /// The interpreter environment.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Mutable access to the environment.
    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// The operator table.
    pub fn operators(&self) -> &Operators {
        &self.operators
    }

    /// Module options.
    pub fn options(&self) -> &ModuleOptions {
        &self.options
    }

    /// Every loaded unit, in load order.
    pub fn contexts(&self) -> &[Rc<GlobalContext>] {
        &self.contexts
    }

    /// The unit loaded from `source`, by full or extensionless name.
    pub fn context(&self, source: &str) -> Option<&Rc<GlobalContext>> {
        self.contexts.iter().find(|c| c.matches_source(source))
    }

    /// Current value of a global in a loaded unit.
    pub fn get_variable(&self, source: &str, name: &str) -> Option<Value> {
        self.context(source)?.variables().get(name).map(|cell| cell.get())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Registration
    // ═══════════════════════════════════════════════════════════════════

    /// Register a host function for `native` declarations in `module`.
    pub fn register_native(
        &mut self,
        module: impl Into<String>,
        name: impl Into<String>,
        arity: i32,
        func: impl Fn(&[Value]) -> std::result::Result<Value, String> + 'static,
    ) {
        self.env.natives_mut().register(module, name, arity, func);
    }

    /// Register a custom type for `new` expressions.
    pub fn register_type(&mut self, entry: TypeEntry) {
        debug!(module = %entry.module, name = %entry.name, "registered type");
        self.env.types_mut().register(entry);
    }

    // ═══════════════════════════════════════════════════════════════════
    // Loading
    // ═══════════════════════════════════════════════════════════════════

    /// Parse a unit and queue it for evaluation. A `.mtr` source that is
    /// already loaded is skipped.
    pub fn load_source(&mut self, source: &str, code: &str) -> Result<()> {
        if source.ends_with(SOURCE_EXTENSION) && self.contexts.iter().any(|c| c.source() == source) {
            debug!(source, "source already loaded, skipping");
            return Ok(());
        }
        let mut root = self.parse(code)?;
        let context = GlobalContext::new(source);
        context.extract_statements(&mut root, &self.options);
        context.set_root(root);
        debug!(source, "loaded source");
        self.contexts.push(context);
        Ok(())
    }

    /// Parse source text with this runtime's operators.
    pub fn parse(&mut self, code: &str) -> Result<Node> {
        let verbose = self.env.config().verbose_parse_errors;
        let parser = Parser::new(&self.operators, &mut self.rule_cache).verbose(verbose);
        Ok(parser.parse_source(code)?)
    }

    /// Link imports, order the units so every unit follows the units it
    /// imports, and evaluate the ones not evaluated yet.
    ///
    /// # Errors
    ///
    /// Returns `ModuleNotFound` for an unknown import and
    /// `CircularDependency` when the imports form a cycle.
    pub fn finish_loading(&mut self) -> Result<()> {
        for context in &self.contexts {
            context.link_imports(&self.contexts)?;
        }

        for context in self.evaluation_order()? {
            let Some(root) = context.take_root() else {
                continue;
            };
            context.relink_imports(&self.contexts)?;
            eval_root(&root, &mut self.env, &context)?;
        }
        Ok(())
    }

    /// Repeatedly move every unit whose imports are all satisfied into the
    /// order. A full pass that moves nothing means the rest form a cycle.
    fn evaluation_order(&self) -> std::result::Result<Vec<Rc<GlobalContext>>, EvalError> {
        let mut remaining: Vec<Rc<GlobalContext>> = self.contexts.clone();
        let mut ordered: Vec<Rc<GlobalContext>> = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let before = remaining.len();
            let mut i = 0;
            while i < remaining.len() {
                let context = &remaining[i];
                if context.has_no_imports() || context.imports_satisfied_by(&ordered) {
                    trace!(source = context.source(), "unit ordered");
                    ordered.push(remaining.remove(i));
                } else {
                    i += 1;
                }
            }
            if remaining.len() == before {
                return Err(EvalError::CircularDependency {
                    sources: remaining.iter().map(|c| c.source().to_string()).collect(),
                });
            }
        }

        debug!(
            order = ?ordered.iter().map(|c| c.source()).collect::<Vec<_>>(),
            "evaluation order"
        );
        Ok(ordered)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Evaluation
    // ═══════════════════════════════════════════════════════════════════

    /// Evaluate an expression in a throwaway unit that sees the auto-imports
    /// and anything it imports itself.
    pub fn evaluate(&mut self, code: &str) -> Result<Value> {
        let context = GlobalContext::new(EPHEMERAL_SOURCE);
        self.evaluate_in(code, &context, true)
    }

    /// Evaluate an expression in the persistent unit named `source`,
    /// creating it on first use. Globals defined by one call are visible
    /// to the next.
    pub fn evaluate_in_context_of(&mut self, code: &str, source: &str) -> Result<Value> {
        let context = match self.context(source) {
            Some(context) => Rc::clone(context),
            None => {
                debug!(source, "creating persistent context");
                let context = GlobalContext::new(source);
                self.contexts.push(Rc::clone(&context));
                context
            }
        };
        self.evaluate_in(code, &context, false)
    }

    fn evaluate_in(&mut self, code: &str, context: &Rc<GlobalContext>, ephemeral: bool) -> Result<Value> {
        let mut root = self.parse(code)?;
        context.extract_statements(&mut root, &self.options);

        if ephemeral {
            let mut visible = self.contexts.clone();
            visible.push(Rc::clone(context));
            context.link_imports(&visible)?;
        } else {
            context.link_imports(&self.contexts)?;
        }
        Ok(eval_root(&root, &mut self.env, context)?)
    }
}
