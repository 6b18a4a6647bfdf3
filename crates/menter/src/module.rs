//! Modules, imports and evaluation units
//!
//! Every loaded source becomes a [`GlobalContext`]. Its top-level `import`
//! and `export` statements are pulled out of the tree when it is loaded:
//! exports declare [`Module`]s, imports become unresolved [`Import`]s that
//! are linked to modules before the context is evaluated.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

use crate::error::EvalError;
use crate::lexer::TokenKind;
use crate::parser::{Element, Node, NodeKind};
use crate::value::SymbolTable;

static NEXT_MODULE_STAMP: AtomicU64 = AtomicU64::new(1);

/// Extension of Menter source files.
pub const SOURCE_EXTENSION: &str = ".mtr";

// ═══════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════

/// A named set of symbols exported by a context.
pub struct Module {
    name: String,
    created: u64,
    context: Weak<GlobalContext>,
    symbols: Vec<String>,
}

impl Module {
    fn new(name: impl Into<String>, context: Weak<GlobalContext>, symbols: Vec<String>) -> Self {
        Self {
            name: name.into(),
            created: NEXT_MODULE_STAMP.fetch_add(1, Ordering::Relaxed),
            context,
            symbols,
        }
    }

    /// Module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creation stamp. Later declarations have larger stamps.
    pub fn created(&self) -> u64 {
        self.created
    }

    /// The context that declared the module.
    pub fn context(&self) -> Option<Rc<GlobalContext>> {
        self.context.upgrade()
    }

    /// Exported symbol names.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Whether `symbol` is exported.
    pub fn exports(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Module({} {:?})", self.name, self.symbols)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Imports
// ═══════════════════════════════════════════════════════════════════════

/// What an import refers to.
#[derive(Debug, Clone)]
pub enum ImportTarget {
    /// Not linked yet: a module or source name
    Name(String),
    /// Linked module
    Module(Rc<Module>),
}

/// `import X`, `import X as Y` or `import X inline`.
#[derive(Debug, Clone)]
pub struct Import {
    target: ImportTarget,
    alias: Option<String>,
    inline: bool,
}

impl Import {
    /// `import name`
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            target: ImportTarget::Name(name.into()),
            alias: None,
            inline: false,
        }
    }

    /// `import name as alias`
    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            ..Self::named(name)
        }
    }

    /// `import name inline`
    pub fn inline(name: impl Into<String>) -> Self {
        Self {
            inline: true,
            ..Self::named(name)
        }
    }

    /// Build an import from one of the three import statement nodes.
    pub fn from_node(node: &Node) -> Option<Self> {
        let name = node.children.first()?.text()?;
        match node.kind {
            NodeKind::ImportStatement => Some(Self::named(name)),
            NodeKind::ImportAsStatement => Some(Self::aliased(name, node.children.get(1)?.text()?)),
            NodeKind::ImportInlineStatement => Some(Self::inline(name)),
            _ => None,
        }
    }

    /// The imported module or source name.
    pub fn name(&self) -> &str {
        match &self.target {
            ImportTarget::Name(name) => name,
            ImportTarget::Module(module) => module.name(),
        }
    }

    /// The linked module, if any.
    pub fn module(&self) -> Option<&Rc<Module>> {
        match &self.target {
            ImportTarget::Module(module) => Some(module),
            ImportTarget::Name(_) => None,
        }
    }

    /// The alias, if one was given.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// The name the module is addressed by in code.
    pub fn alias_or_name(&self) -> &str {
        self.alias.as_deref().unwrap_or_else(|| self.name())
    }

    /// Whether exported symbols are visible without a prefix.
    pub fn is_inline(&self) -> bool {
        self.inline
    }

    fn link(&mut self, module: Rc<Module>) {
        self.target = ImportTarget::Module(module);
    }
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "import {}", self.name())?;
        if let Some(alias) = &self.alias {
            write!(f, " as {alias}")?;
        }
        if self.inline {
            write!(f, " inline")?;
        }
        Ok(())
    }
}

/// Module handling applied to every loaded source.
#[derive(Debug, Clone)]
pub struct ModuleOptions {
    /// Imports added to every unit and every ephemeral evaluation
    pub auto_imports: Vec<Import>,
    /// Load the built-in core unit on startup
    pub load_core: bool,
}

impl Default for ModuleOptions {
    fn default() -> Self {
        Self {
            auto_imports: vec![Import::inline("common")],
            load_core: true,
        }
    }
}

impl ModuleOptions {
    /// No auto-imports and no core unit.
    pub fn bare() -> Self {
        Self {
            auto_imports: Vec::new(),
            load_core: false,
        }
    }

    /// Add an auto-import.
    pub fn with_auto_import(mut self, import: Import) -> Self {
        self.auto_imports.push(import);
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Global Context
// ═══════════════════════════════════════════════════════════════════════

/// One evaluation unit: a loaded source with its symbols, modules and
/// imports.
pub struct GlobalContext {
    this: Weak<GlobalContext>,
    source: String,
    variables: SymbolTable,
    modules: RefCell<Vec<Rc<Module>>>,
    imports: RefCell<Vec<Import>>,
    root: RefCell<Option<Node>>,
}

impl GlobalContext {
    /// A new, empty context.
    pub fn new(source: impl Into<String>) -> Rc<Self> {
        let source = source.into();
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            source,
            variables: SymbolTable::new(),
            modules: RefCell::new(Vec::new()),
            imports: RefCell::new(Vec::new()),
            root: RefCell::new(None),
        })
    }

    /// Source identifier.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Source identifier without the `.mtr` extension.
    pub fn source_name(&self) -> &str {
        self.source
            .strip_suffix(SOURCE_EXTENSION)
            .unwrap_or(&self.source)
    }

    /// Whether `name` addresses this context's source.
    pub fn matches_source(&self, name: &str) -> bool {
        name == self.source || name == self.source_name()
    }

    /// Global symbols of the unit.
    pub fn variables(&self) -> &SymbolTable {
        &self.variables
    }

    /// Declared modules.
    pub fn modules(&self) -> Vec<Rc<Module>> {
        self.modules.borrow().clone()
    }

    /// Imports, linked or not.
    pub fn imports(&self) -> Vec<Import> {
        self.imports.borrow().clone()
    }

    /// Whether the unit declares a module named `name`.
    pub fn declares_module(&self, name: &str) -> bool {
        self.modules.borrow().iter().any(|m| m.name() == name)
    }

    /// Store the tree to evaluate later.
    pub fn set_root(&self, root: Node) {
        *self.root.borrow_mut() = Some(root);
    }

    /// Take the pending tree; it is dropped once evaluated.
    pub fn take_root(&self) -> Option<Node> {
        self.root.borrow_mut().take()
    }

    /// Whether a tree is waiting to be evaluated.
    pub fn has_pending_root(&self) -> bool {
        self.root.borrow().is_some()
    }

    /// Remove top-level `import` and `export` statements from `root`,
    /// recording imports and declaring modules. Auto-imports are added
    /// unless this unit declares the module they refer to.
    pub fn extract_statements(&self, root: &mut Node, options: &ModuleOptions) {
        let mut kept = Vec::with_capacity(root.children.len());
        for child in root.children.drain(..) {
            match &child {
                Element::Node(node) if node.kind.is_import() => {
                    if let Some(import) = Import::from_node(node) {
                        self.add_import(import);
                    }
                }
                Element::Node(node) if node.kind == NodeKind::ExportStatement => {
                    self.declare_module(node);
                }
                _ => kept.push(child),
            }
        }
        root.children = kept;

        for import in &options.auto_imports {
            if !self.declares_module(import.name()) {
                self.add_import(import.clone());
            }
        }
    }

    fn add_import(&self, import: Import) {
        let mut imports = self.imports.borrow_mut();
        let duplicate = imports.iter().any(|i| {
            i.name() == import.name() && i.alias == import.alias && i.inline == import.inline
        });
        if !duplicate {
            trace!(source = %self.source, import = %import, "import recorded");
            imports.push(import);
        }
    }

    fn declare_module(&self, node: &Node) {
        let symbols: Vec<String> = node
            .children
            .first()
            .map(Element::children)
            .unwrap_or_default()
            .iter()
            .filter_map(|e| match e {
                Element::Token(t) if t.kind == TokenKind::Identifier => Some(t.value.clone()),
                _ => None,
            })
            .collect();
        let Some(name) = node.children.get(1).and_then(Element::text) else {
            return;
        };
        debug!(source = %self.source, module = name, ?symbols, "module declared");
        let module = Module::new(name, self.this.clone(), symbols);
        self.modules.borrow_mut().push(Rc::new(module));
    }

    /// Link every import to the most recently declared module of its name.
    ///
    /// An import that names a loaded source instead of a module stays
    /// unlinked and only orders evaluation. Anything else is an error.
    pub fn link_imports(&self, contexts: &[Rc<GlobalContext>]) -> Result<(), EvalError> {
        let mut imports = self.imports.borrow_mut();
        for import in imports.iter_mut() {
            match newest_module(contexts, import.name()) {
                Some(module) => import.link(module),
                None if import.module().is_some() => {}
                None if contexts.iter().any(|c| c.matches_source(import.name())) => {}
                None => {
                    let mut available: Vec<String> = contexts
                        .iter()
                        .flat_map(|c| c.modules())
                        .map(|m| m.name().to_string())
                        .collect();
                    available.dedup();
                    return Err(EvalError::ModuleNotFound {
                        name: import.name().to_string(),
                        available,
                    });
                }
            }
        }
        Ok(())
    }

    /// Re-link linked imports just before evaluation, so a module
    /// redeclared after the first link wins.
    pub fn relink_imports(&self, contexts: &[Rc<GlobalContext>]) -> Result<(), EvalError> {
        trace!(source = %self.source, "relinking imports");
        self.link_imports(contexts)
    }

    /// Whether every import is satisfied by a context in `ordered`.
    pub fn imports_satisfied_by(&self, ordered: &[Rc<GlobalContext>]) -> bool {
        self.imports.borrow().iter().all(|import| match import.module() {
            Some(module) => module
                .context()
                .is_some_and(|owner| ordered.iter().any(|c| Rc::ptr_eq(c, &owner))),
            None => ordered.iter().any(|c| c.matches_source(import.name())),
        })
    }

    /// Whether the unit imports nothing.
    pub fn has_no_imports(&self) -> bool {
        self.imports.borrow().is_empty()
    }
}

impl fmt::Debug for GlobalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalContext")
            .field("source", &self.source)
            .field("variables", &self.variables)
            .field("modules", &self.modules.borrow())
            .field("imports", &self.imports.borrow())
            .finish()
    }
}

fn newest_module(contexts: &[Rc<GlobalContext>], name: &str) -> Option<Rc<Module>> {
    contexts
        .iter()
        .flat_map(|c| c.modules())
        .filter(|m| m.name() == name)
        .max_by_key(|m| m.created())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::Operators;
    use crate::parser::{Parser, RuleCache};

    fn load(source: &str, code: &str, options: &ModuleOptions) -> Rc<GlobalContext> {
        let operators = Operators::default();
        let mut cache = RuleCache::default();
        let parser = Parser::new(&operators, &mut cache);
        let mut root = parser.parse_source(code).unwrap();
        let context = GlobalContext::new(source);
        context.extract_statements(&mut root, options);
        context.set_root(root);
        context
    }

    #[test]
    fn test_extract_imports_and_exports() {
        let ctx = load(
            "math.mtr",
            "import Other as O\nadd(a, b) = a + b\nexport [add] as Math",
            &ModuleOptions::bare(),
        );
        assert_eq!(ctx.source_name(), "math");
        assert_eq!(ctx.modules().len(), 1);
        assert!(ctx.modules()[0].exports("add"));
        let imports = ctx.imports();
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].alias_or_name(), "O");
        assert_eq!(ctx.take_root().map(|r| r.children.len()), Some(1));
        assert!(!ctx.has_pending_root());
    }

    #[test]
    fn test_auto_import_skipped_for_declaring_unit() {
        let options = ModuleOptions::default();
        let core = load("core.mtr", "x = 1\nexport [x] as common", &options);
        assert!(core.has_no_imports());
        let user = load("user.mtr", "y = 2", &options);
        assert_eq!(user.imports()[0].to_string(), "import common inline");
    }

    #[test]
    fn test_link_prefers_newest_module() {
        let options = ModuleOptions::bare();
        let first = load("a.mtr", "x = 1\nexport [x] as M", &options);
        let second = load("b.mtr", "x = 2\nexport [x] as M", &options);
        let user = load("c.mtr", "import M", &options);
        let contexts = vec![first, second.clone(), user.clone()];
        user.link_imports(&contexts).unwrap();
        let linked = user.imports()[0].module().cloned().unwrap();
        assert!(Rc::ptr_eq(&linked.context().unwrap(), &second));
    }

    #[test]
    fn test_link_unknown_module() {
        let user = load("c.mtr", "import Nope", &ModuleOptions::bare());
        let err = user.link_imports(&[user.clone()]).unwrap_err();
        assert!(matches!(err, EvalError::ModuleNotFound { name, .. } if name == "Nope"));
    }
}
