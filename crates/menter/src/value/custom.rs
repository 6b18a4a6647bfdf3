//! Host-defined value types
//!
//! A custom type is any Rust type implementing [`CustomType`]. It is made
//! constructible from scripts (`new Name(args)`) by registering a
//! [`TypeEntry`] with its constructor and a [`MethodRegistry`]. Methods are
//! looked up by name on member access and come back as bound methods.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::callable::CustomMethodPtr;
use super::{Number, Value, ValueCell};

/// Capabilities of a host-defined value.
///
/// Only `type_name` and the `Any` accessors are required; everything else
/// falls back to plain-object behaviour.
pub trait CustomType {
    /// Name used by `type()` and constructor lookup.
    fn type_name(&self) -> &str;

    /// Read a member that is not a registered method.
    fn access(&self, _key: &Value) -> Option<ValueCell> {
        None
    }

    /// Offered a fresh cell when an assignment targets a missing member.
    /// Returns whether the type stored it.
    fn create(&mut self, _key: &Value, _cell: &ValueCell, _is_last: bool) -> bool {
        false
    }

    /// Value used by arithmetic operators.
    fn numeric_value(&self) -> Option<Number> {
        None
    }

    /// Truthiness in conditions.
    fn is_truthy(&self) -> bool {
        true
    }

    /// Value of `size()`.
    fn size(&self) -> usize {
        0
    }

    /// Key/value pairs for `for` loops.
    fn iterator(&self) -> Vec<(Value, Value)> {
        Vec::new()
    }

    /// Ordering against another instance.
    fn compare(&self, _other: &dyn CustomType) -> Option<Ordering> {
        None
    }

    /// Display form.
    fn display(&self) -> String {
        self.type_name().to_string()
    }

    /// For downcasting in methods.
    fn as_any(&self) -> &dyn Any;

    /// For downcasting in methods.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Constructor signature for registered types.
pub type ConstructorPtr = Rc<dyn Fn(&[Value]) -> Result<Value, String>>;

/// Method name to implementation.
#[derive(Clone, Default)]
pub struct MethodRegistry {
    methods: IndexMap<String, CustomMethodPtr>,
}

impl MethodRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a method.
    pub fn with(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&mut dyn CustomType, &[Value]) -> Result<Value, String> + 'static,
    ) -> Self {
        self.methods.insert(name.into(), Rc::new(method));
        self
    }

    /// Find a method.
    pub fn get(&self, name: &str) -> Option<CustomMethodPtr> {
        self.methods.get(name).cloned()
    }

    /// Registered method names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }
}

/// A registered custom type.
#[derive(Clone)]
pub struct TypeEntry {
    /// Type name
    pub name: String,
    /// Module the type belongs to
    pub module: String,
    /// Builds an instance from constructor arguments
    pub constructor: ConstructorPtr,
    /// Methods callable on instances
    pub methods: MethodRegistry,
}

impl TypeEntry {
    /// Describe a type.
    pub fn new(
        module: impl Into<String>,
        name: impl Into<String>,
        constructor: impl Fn(&[Value]) -> Result<Value, String> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            constructor: Rc::new(constructor),
            methods: MethodRegistry::new(),
        }
    }

    /// Attach the method registry.
    pub fn with_methods(mut self, methods: MethodRegistry) -> Self {
        self.methods = methods;
        self
    }
}

impl fmt::Debug for TypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeEntry")
            .field("name", &self.name)
            .field("module", &self.module)
            .field("methods", &self.methods.names().collect::<Vec<_>>())
            .finish()
    }
}

/// All registered custom types.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: Vec<TypeEntry>,
}

impl TypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type. A later entry with the same module and name wins.
    pub fn register(&mut self, entry: TypeEntry) {
        self.types
            .retain(|t| !(t.name == entry.name && t.module == entry.module));
        self.types.push(entry);
    }

    /// Find a type by name, optionally qualified by module.
    pub fn find(&self, module: Option<&str>, name: &str) -> Option<&TypeEntry> {
        self.types
            .iter()
            .rev()
            .find(|t| t.name == name && module.map_or(true, |m| t.module == m))
    }

    /// Methods of the type an instance belongs to.
    pub fn methods_for(&self, instance: &dyn CustomType) -> Option<&MethodRegistry> {
        self.find(None, instance.type_name()).map(|t| &t.methods)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Counter {
        count: i64,
    }

    impl CustomType for Counter {
        fn type_name(&self) -> &str {
            "Counter"
        }

        fn numeric_value(&self) -> Option<Number> {
            Some(self.count.into())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn counter_entry() -> TypeEntry {
        TypeEntry::new("counters", "Counter", |_| Ok(Value::custom(Counter { count: 0 })))
            .with_methods(MethodRegistry::new().with("increment", |this, _| {
                let counter = this
                    .as_any_mut()
                    .downcast_mut::<Counter>()
                    .ok_or("not a counter")?;
                counter.count += 1;
                Ok(Value::from(counter.count))
            }))
    }

    #[test]
    fn test_registry_lookup_with_and_without_module() {
        let mut types = TypeRegistry::new();
        types.register(counter_entry());
        assert!(types.find(None, "Counter").is_some());
        assert!(types.find(Some("counters"), "Counter").is_some());
        assert!(types.find(Some("other"), "Counter").is_none());
    }

    #[test]
    fn test_method_mutates_instance() {
        let entry = counter_entry();
        let value = (entry.constructor)(&[]).unwrap();
        let Value::Custom(instance) = &value else {
            panic!("expected custom value");
        };
        let increment = entry.methods.get("increment").unwrap();
        increment(&mut *instance.borrow_mut(), &[]).unwrap();
        let result = increment(&mut *instance.borrow_mut(), &[]).unwrap();
        assert_eq!(result, Value::from(2.0));
        assert_eq!(value.as_number(), Some(Number::from(2)));
    }
}
