//! Rules, rulesets and their content hash.
//!
//! A [`Ruleset`] holds ordered rule lists by role plus the integer
//! parameters `limit` and `min_mj_points`. It is identified by the SHA-256
//! of its bincode-serialised rules and parameters; the display name is not
//! part of the identity, so two rulesets with the same rules compare equal.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::pattern::{HandPattern, MeldPattern};

/// Rule evaluation and ruleset construction errors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("invalid hand encoding: {0}")]
    InvalidEncoding(String),

    #[error("invalid ruleset: {0}")]
    Configuration(String),

    #[error("unknown ruleset {0}")]
    UnknownRuleset(String),
}

/// What a matched rule contributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Score {
    /// Base points; negative for penalties.
    Points(i64),
    /// Each double multiplies the total by two.
    Doubles(u32),
    /// Fixes the total to this value.
    Limit(i64),
}

/// Pattern of a rule; meld rules take a meld pattern, every other role a
/// hand pattern.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RulePattern {
    Meld(MeldPattern),
    Hand(HandPattern),
}

/// A named, scored pattern.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub pattern: RulePattern,
    pub score: Score,
    /// A meld rule that scores at most once per hand.
    pub exclusive: bool,
}

impl Rule {
    pub fn meld(name: impl Into<String>, pattern: MeldPattern, score: Score) -> Self {
        Self {
            name: name.into(),
            pattern: RulePattern::Meld(pattern),
            score,
            exclusive: false,
        }
    }

    pub fn hand(name: impl Into<String>, pattern: HandPattern, score: Score) -> Self {
        Self {
            name: name.into(),
            pattern: RulePattern::Hand(pattern),
            score,
            exclusive: false,
        }
    }

    #[must_use]
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }
}

/// The role a rule plays in evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleRole {
    Meld,
    Hand,
    MahJongg,
    Manual,
    Penalty,
}

impl std::fmt::Display for RuleRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RuleRole::Meld => "meld",
            RuleRole::Hand => "hand",
            RuleRole::MahJongg => "mah jongg",
            RuleRole::Manual => "manual",
            RuleRole::Penalty => "penalty",
        };
        write!(f, "{name}")
    }
}

/// Content hash identifying a ruleset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RulesetHash(pub [u8; 32]);

impl std::fmt::Display for RulesetHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.iter().try_for_each(|b| write!(f, "{b:02x}"))
    }
}

/// Unvalidated ruleset content, the serialised form of a [`Ruleset`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesetDefinition {
    pub name: String,
    pub meld_rules: Vec<Rule>,
    pub hand_rules: Vec<Rule>,
    pub mahjongg_rules: Vec<Rule>,
    pub manual_rules: Vec<Rule>,
    pub penalty_rules: Vec<Rule>,
    /// Upper bound on a hand's total; 0 for none.
    pub limit: i64,
    pub min_mj_points: i64,
}

impl RulesetDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn with_min_mj_points(mut self, points: i64) -> Self {
        self.min_mj_points = points;
        self
    }

    #[must_use]
    pub fn with_rule(mut self, role: RuleRole, rule: Rule) -> Self {
        self.rules_mut(role).push(rule);
        self
    }

    fn rules_mut(&mut self, role: RuleRole) -> &mut Vec<Rule> {
        match role {
            RuleRole::Meld => &mut self.meld_rules,
            RuleRole::Hand => &mut self.hand_rules,
            RuleRole::MahJongg => &mut self.mahjongg_rules,
            RuleRole::Manual => &mut self.manual_rules,
            RuleRole::Penalty => &mut self.penalty_rules,
        }
    }

    /// Rules of one role, in order.
    #[must_use]
    pub fn rules(&self, role: RuleRole) -> &[Rule] {
        match role {
            RuleRole::Meld => &self.meld_rules,
            RuleRole::Hand => &self.hand_rules,
            RuleRole::MahJongg => &self.mahjongg_rules,
            RuleRole::Manual => &self.manual_rules,
            RuleRole::Penalty => &self.penalty_rules,
        }
    }

    fn validate(&self) -> Result<(), RuleError> {
        const ROLES: [RuleRole; 5] = [
            RuleRole::Meld,
            RuleRole::Hand,
            RuleRole::MahJongg,
            RuleRole::Manual,
            RuleRole::Penalty,
        ];
        if ROLES.iter().all(|role| self.rules(*role).is_empty()) {
            return Err(RuleError::Configuration(format!("ruleset '{}' has no rules", self.name)));
        }
        if self.mahjongg_rules.is_empty() {
            return Err(RuleError::Configuration(format!(
                "ruleset '{}' has no mah jongg rule",
                self.name
            )));
        }
        for role in ROLES {
            for rule in self.rules(role) {
                let fits = matches!(
                    (role, &rule.pattern),
                    (RuleRole::Meld, RulePattern::Meld(_)) | (RuleRole::Hand | RuleRole::MahJongg | RuleRole::Manual | RuleRole::Penalty, RulePattern::Hand(_))
                );
                if !fits {
                    return Err(RuleError::Configuration(format!(
                        "rule '{}' does not fit the {role} role",
                        rule.name
                    )));
                }
            }
        }
        if self.limit < 0 {
            return Err(RuleError::Configuration(format!("negative limit {}", self.limit)));
        }
        Ok(())
    }

    fn content_hash(&self) -> Result<RulesetHash, RuleError> {
        let content = (
            &self.meld_rules,
            &self.hand_rules,
            &self.mahjongg_rules,
            &self.manual_rules,
            &self.penalty_rules,
            self.limit,
            self.min_mj_points,
        );
        let bytes = bincode::serialize(&content).map_err(|e| RuleError::Configuration(e.to_string()))?;
        Ok(RulesetHash(Sha256::digest(&bytes).into()))
    }
}

/// A validated, immutable ruleset.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "RulesetDefinition", into = "RulesetDefinition")]
pub struct Ruleset {
    definition: RulesetDefinition,
    hash: RulesetHash,
}

impl Ruleset {
    /// Validate a definition and compute its hash.
    pub fn new(definition: RulesetDefinition) -> Result<Self, RuleError> {
        definition.validate()?;
        let hash = definition.content_hash()?;
        Ok(Self { definition, hash })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    #[must_use]
    pub fn hash(&self) -> RulesetHash {
        self.hash
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        self.definition.limit
    }

    #[must_use]
    pub fn min_mj_points(&self) -> i64 {
        self.definition.min_mj_points
    }

    #[must_use]
    pub fn rules(&self, role: RuleRole) -> &[Rule] {
        self.definition.rules(role)
    }

    /// Find a rule of `role` by name.
    #[must_use]
    pub fn find(&self, role: RuleRole, name: &str) -> Option<&Rule> {
        self.rules(role).iter().find(|r| r.name == name)
    }

    #[must_use]
    pub fn definition(&self) -> &RulesetDefinition {
        &self.definition
    }
}

impl PartialEq for Ruleset {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Ruleset {}

impl TryFrom<RulesetDefinition> for Ruleset {
    type Error = RuleError;

    fn try_from(definition: RulesetDefinition) -> Result<Self, Self::Error> {
        Self::new(definition)
    }
}

impl From<Ruleset> for RulesetDefinition {
    fn from(ruleset: Ruleset) -> Self {
        ruleset.definition
    }
}
