//! Compiled rule sets, reused across parses with the same operator table

use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use crate::operator::Operators;

use super::rules::RuleSet;

/// Number of operator tables whose rules are kept.
pub const DEFAULT_RULE_CACHE_CAPACITY: usize = 5;

/// Least-recently-used cache of rule sets keyed by operator table identity.
#[derive(Debug)]
pub struct RuleCache {
    capacity: usize,
    entries: IndexMap<u64, Rc<RuleSet>>,
}

impl Default for RuleCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_RULE_CACHE_CAPACITY)
    }
}

impl RuleCache {
    /// A cache holding at most `capacity` rule sets (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: IndexMap::new(),
        }
    }

    /// Rules for `operators`, building them on a miss.
    pub fn rules_for(&mut self, operators: &Operators) -> Rc<RuleSet> {
        let id = operators.id();
        if let Some(rules) = self.entries.shift_remove(&id) {
            self.entries.insert(id, Rc::clone(&rules));
            return rules;
        }

        debug!(operators = id, "building parser rules");
        let rules = Rc::new(RuleSet::build(operators));
        if self.entries.len() >= self.capacity {
            self.entries.shift_remove_index(0);
        }
        self.entries.insert(id, Rc::clone(&rules));
        rules
    }

    /// Number of cached rule sets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether rules for this table are cached.
    pub fn contains(&self, operators: &Operators) -> bool {
        self.entries.contains_key(&operators.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_table_reuses_rules() {
        let mut cache = RuleCache::default();
        let ops = Operators::default();
        let first = cache.rules_for(&ops);
        let second = cache.rules_for(&ops);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache = RuleCache::with_capacity(2);
        let a = Operators::default();
        let b = Operators::default();
        let c = Operators::default();
        cache.rules_for(&a);
        cache.rules_for(&b);
        cache.rules_for(&a);
        cache.rules_for(&c);
        assert!(cache.contains(&a));
        assert!(!cache.contains(&b));
        assert!(cache.contains(&c));
    }
}
