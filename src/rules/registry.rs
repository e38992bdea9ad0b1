//! Ruleset registry.
//!
//! Rulesets are stored by content hash, with a second index by display name.
//! Peers exchange hashes first and fetch full definitions only for the hashes
//! they report as unknown.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::ruleset::{RuleError, Ruleset, RulesetHash};
use crate::rulesets::classical;

/// How a table refers to its ruleset.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RulesetRef {
    Hash(RulesetHash),
    Name(String),
}

impl std::fmt::Display for RulesetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RulesetRef::Hash(hash) => write!(f, "{hash}"),
            RulesetRef::Name(name) => write!(f, "'{name}'"),
        }
    }
}

/// Anything that can resolve a [`RulesetRef`].
pub trait RulesetSource: Send + Sync {
    fn load_ruleset(&self, reference: &RulesetRef) -> Result<Arc<Ruleset>, RuleError>;

    /// The subset of `hashes` this source cannot resolve.
    fn unknown_hashes(&self, hashes: &[RulesetHash]) -> Vec<RulesetHash>;
}

/// Registry of rulesets.
///
/// ## Example
///
/// ```
/// use mahjong_table::rules::{RulesetRef, RulesetRegistry, RulesetSource};
///
/// let registry = RulesetRegistry::with_predefined().unwrap();
/// let classical = registry.load_ruleset(&RulesetRef::Name("Classical Chinese".into())).unwrap();
/// assert!(registry.unknown_hashes(&[classical.hash()]).is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RulesetRegistry {
    by_hash: FxHashMap<RulesetHash, Arc<Ruleset>>,
    by_name: FxHashMap<String, RulesetHash>,
}

impl RulesetRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the predefined rulesets.
    pub fn with_predefined() -> Result<Self, RuleError> {
        let mut registry = Self::new();
        registry.register(classical::ruleset()?);
        Ok(registry)
    }

    /// Register a ruleset and return its hash.
    ///
    /// Registering the same content again is a no-op apart from adding
    /// the new name; a name always points at the latest ruleset using it.
    pub fn register(&mut self, ruleset: Ruleset) -> RulesetHash {
        let hash = ruleset.hash();
        self.by_name.insert(ruleset.name().to_string(), hash);
        self.by_hash.entry(hash).or_insert_with(|| Arc::new(ruleset));
        hash
    }

    #[must_use]
    pub fn get_by_hash(&self, hash: &RulesetHash) -> Option<Arc<Ruleset>> {
        self.by_hash.get(hash).cloned()
    }

    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<Arc<Ruleset>> {
        self.by_name.get(name).and_then(|hash| self.get_by_hash(hash))
    }

    #[must_use]
    pub fn contains(&self, hash: &RulesetHash) -> bool {
        self.by_hash.contains_key(hash)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Ruleset>> {
        self.by_hash.values()
    }
}

impl RulesetSource for RulesetRegistry {
    fn load_ruleset(&self, reference: &RulesetRef) -> Result<Arc<Ruleset>, RuleError> {
        let found = match reference {
            RulesetRef::Hash(hash) => self.get_by_hash(hash),
            RulesetRef::Name(name) => self.get_by_name(name),
        };
        found.ok_or_else(|| RuleError::UnknownRuleset(reference.to_string()))
    }

    fn unknown_hashes(&self, hashes: &[RulesetHash]) -> Vec<RulesetHash> {
        hashes.iter().filter(|h| !self.contains(h)).copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{HandPattern, Rule, RuleRole, RulesetDefinition, Score};

    fn tiny(name: &str, points: i64) -> Ruleset {
        Ruleset::new(
            RulesetDefinition::new(name)
                .with_rule(RuleRole::MahJongg, Rule::hand("Mah Jongg", HandPattern::Regular, Score::Points(points))),
        )
        .unwrap()
    }

    #[test]
    fn test_register_and_load() {
        let mut registry = RulesetRegistry::new();
        let hash = registry.register(tiny("House", 20));

        let by_hash = registry.load_ruleset(&RulesetRef::Hash(hash)).unwrap();
        let by_name = registry.load_ruleset(&RulesetRef::Name("House".into())).unwrap();
        assert!(Arc::ptr_eq(&by_hash, &by_name));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_same_content_shares_entry() {
        let mut registry = RulesetRegistry::new();
        let a = registry.register(tiny("A", 20));
        let b = registry.register(tiny("B", 20));
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
        assert!(registry.get_by_name("B").is_some());
    }

    #[test]
    fn test_unknown() {
        let mut registry = RulesetRegistry::new();
        let known = registry.register(tiny("A", 20));
        let other = tiny("B", 30).hash();

        assert_eq!(registry.unknown_hashes(&[known, other]), vec![other]);
        let err = registry.load_ruleset(&RulesetRef::Name("nope".into())).unwrap_err();
        assert!(matches!(err, RuleError::UnknownRuleset(_)));
    }

    #[test]
    fn test_predefined() {
        let registry = RulesetRegistry::with_predefined().unwrap();
        assert!(registry.get_by_name(classical::NAME).is_some());
        assert!(!registry.is_empty());
    }
}
