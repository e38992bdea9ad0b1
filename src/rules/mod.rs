//! Rule engine: patterns, rules, rulesets and hand evaluation.
//!
//! - `pattern`: tagged predicate trees over melds and hands
//! - `ruleset`: rules by role, parameters, content hash
//! - `encoder`: canonical hand encoding, the engine's only input
//! - `decompose`: partition search over concealed tiles
//! - `engine`: `evaluate` and `maybe_mahjongg`
//! - `registry`: rulesets known by hash and name

pub mod pattern;
pub mod ruleset;
pub mod encoder;
pub mod decompose;
pub mod engine;
pub mod registry;

pub use pattern::{HandPattern, MeldPattern, PatternContext, PatternEvaluator, TilePattern, Unit};
pub use ruleset::{Rule, RuleError, RulePattern, RuleRole, Ruleset, RulesetDefinition, RulesetHash, Score};
pub use encoder::{ClaimContext, EncodedHand, Token};
pub use engine::{EvaluationContext, EvaluationResult, MatchedRule, RuleEngine};
pub use registry::{RulesetRef, RulesetRegistry, RulesetSource};
