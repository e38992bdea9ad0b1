//! Hand evaluation.
//!
//! The engine scores an [`EncodedHand`] against a [`Ruleset`]:
//! - Meld rules apply per scoring unit (each meld and each bonus tile)
//! - Hand rules apply to every hand
//! - Mah jongg rules apply only to a complete decomposition
//! - Manual and penalty rules apply only when named in the
//!   [`EvaluationContext`] and their pattern holds
//!
//! `total = base × 2^doubles`, capped by the ruleset limit. A matched limit
//! rule fixes the total; the highest matched limit wins.
//!
//! ## Decompositions
//!
//! A complete hand may split in several ways, and the last tile may have
//! completed any meld containing it. `evaluate` scores every combination
//! and keeps the best. Incomplete hands are scored on a greedy split so
//! losers still collect their concealed melds.

use serde::{Deserialize, Serialize};

use crate::tiles::{Meld, MeldKind, Tile};

use super::decompose;
use super::encoder::EncodedHand;
use super::pattern::{PatternContext, PatternEvaluator, Unit};
use super::ruleset::{Rule, RuleError, RulePattern, RuleRole, Ruleset, Score};

/// Referee and claim-time judgments for one evaluation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationContext {
    named: Vec<String>,
}

impl EvaluationContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Name a manual or penalty rule that applies.
    #[must_use]
    pub fn with_rule(mut self, name: impl Into<String>) -> Self {
        self.named.push(name.into());
        self
    }

    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.named.iter().any(|n| n == name)
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.named
    }
}

/// One rule that contributed to a score.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedRule {
    pub name: String,
    pub role: RuleRole,
    pub score: Score,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub matched_rules: Vec<MatchedRule>,
    /// Melds of the scored decomposition, fixed melds included.
    pub melds: Vec<Meld>,
    pub is_winning: bool,
    pub base_points: i64,
    pub doubles: u32,
    pub total_points: i64,
}

impl EvaluationResult {
    #[must_use]
    pub fn matched(&self, name: &str) -> bool {
        self.matched_rules.iter().any(|r| r.name == name)
    }
}

/// One way of reading a hand.
struct Candidate {
    melds: Vec<Meld>,
    last_meld: Option<usize>,
    regular: bool,
}

/// Stateless evaluator.
pub struct RuleEngine;

impl RuleEngine {
    /// Score a hand.
    pub fn evaluate(
        encoded: &EncodedHand,
        ruleset: &Ruleset,
        context: &EvaluationContext,
    ) -> Result<EvaluationResult, RuleError> {
        Self::check_shape(encoded)?;
        let tiles = encoded.live_tiles();

        let mut best: Option<EvaluationResult> = None;
        for candidate in Self::complete_candidates(encoded) {
            let result = Self::score(encoded, ruleset, context, &candidate, &tiles, true);
            if result.is_winning && best.as_ref().map_or(true, |b| result.total_points > b.total_points) {
                best = Some(result);
            }
        }
        if let Some(best) = best {
            return Ok(best);
        }

        let mut melds = encoded.fixed_melds().to_vec();
        melds.extend(decompose::greedy_split(encoded.concealed()));
        let greedy = Candidate {
            melds,
            last_meld: None,
            regular: false,
        };
        Ok(Self::score(encoded, ruleset, context, &greedy, &tiles, false))
    }

    /// Whether some decomposition is a winning hand. Stops at the first.
    #[must_use]
    pub fn maybe_mahjongg(encoded: &EncodedHand, ruleset: &Ruleset) -> bool {
        Self::winning_melds(encoded, ruleset).is_some()
    }

    /// Melds of the first winning decomposition, fixed melds included.
    #[must_use]
    pub fn winning_melds(encoded: &EncodedHand, ruleset: &Ruleset) -> Option<Vec<Meld>> {
        if Self::check_shape(encoded).is_err() {
            return None;
        }
        let tiles = encoded.live_tiles();
        let context = EvaluationContext::new();
        Self::complete_candidates(encoded).into_iter().find_map(|candidate| {
            Self::score(encoded, ruleset, &context, &candidate, &tiles, true)
                .is_winning
                .then_some(candidate.melds)
        })
    }

    fn check_shape(encoded: &EncodedHand) -> Result<(), RuleError> {
        let live = encoded.live_count();
        if !(13..=14).contains(&live) {
            return Err(RuleError::InvalidEncoding(format!("{live} live tiles in {encoded}")));
        }
        if encoded.concealed().iter().any(|t| t.is_bonus()) {
            return Err(RuleError::InvalidEncoding(format!("bonus tile among concealed tiles in {encoded}")));
        }
        Ok(())
    }

    fn complete_candidates(encoded: &EncodedHand) -> Vec<Candidate> {
        let fixed = encoded.fixed_melds();
        let concealed = encoded.concealed();
        let mut candidates = Vec::new();
        if fixed.len() > 4 || concealed.len() != 3 * (4 - fixed.len()) + 2 {
            return candidates;
        }

        let taken_from_other = encoded
            .last_source()
            .is_some_and(|source| !source.is_self_drawn());

        for split in decompose::regular_splits(concealed) {
            let mut choices: Vec<Option<usize>> = Vec::new();
            if let Some(last) = encoded.last_tile() {
                for (i, meld) in split.iter().enumerate() {
                    let seen = split[..i].iter().any(|m| m == meld);
                    if meld.contains(last) && !seen {
                        choices.push(Some(fixed.len() + i));
                    }
                }
            }
            if choices.is_empty() {
                choices.push(None);
            }
            for choice in choices {
                let mut melds: Vec<Meld> = fixed.to_vec();
                melds.extend(split.iter().cloned());
                if let Some(i) = choice {
                    if taken_from_other && melds[i].kind() != MeldKind::Pair {
                        melds[i] = melds[i].clone().with_concealed(false);
                    }
                }
                candidates.push(Candidate {
                    melds,
                    last_meld: choice,
                    regular: true,
                });
            }
        }

        if fixed.is_empty() && decompose::is_thirteen_orphans(concealed) {
            candidates.push(Candidate {
                melds: Vec::new(),
                last_meld: None,
                regular: false,
            });
        }
        candidates
    }

    fn score(
        encoded: &EncodedHand,
        ruleset: &Ruleset,
        context: &EvaluationContext,
        candidate: &Candidate,
        tiles: &[Tile],
        complete: bool,
    ) -> EvaluationResult {
        let ctx = PatternContext {
            encoded,
            melds: &candidate.melds,
            tiles,
            last_meld: candidate.last_meld.map(|i| &candidate.melds[i]),
            regular: candidate.regular,
        };

        let mut matched = Vec::new();
        let mut push = |rule: &Rule, role: RuleRole| {
            matched.push(MatchedRule {
                name: rule.name.clone(),
                role,
                score: rule.score,
            });
        };

        for rule in ruleset.rules(RuleRole::Meld) {
            let RulePattern::Meld(pattern) = &rule.pattern else {
                continue;
            };
            let units = candidate
                .melds
                .iter()
                .map(Unit::Meld)
                .chain(encoded.bonus().iter().copied().map(Unit::Bonus));
            let mut hits = units
                .filter(|unit| PatternEvaluator::evaluate_unit(pattern, *unit, &ctx))
                .count();
            if rule.exclusive {
                hits = hits.min(1);
            }
            for _ in 0..hits {
                push(rule, RuleRole::Meld);
            }
        }

        let hand_holds = |rule: &Rule| match &rule.pattern {
            RulePattern::Hand(pattern) => PatternEvaluator::evaluate_hand(pattern, &ctx),
            RulePattern::Meld(_) => false,
        };

        for rule in ruleset.rules(RuleRole::Hand) {
            if hand_holds(rule) {
                push(rule, RuleRole::Hand);
            }
        }

        let mut mahjongg = false;
        if complete {
            for rule in ruleset.rules(RuleRole::MahJongg) {
                if hand_holds(rule) {
                    mahjongg = true;
                    push(rule, RuleRole::MahJongg);
                }
            }
        }

        for role in [RuleRole::Manual, RuleRole::Penalty] {
            for rule in ruleset.rules(role) {
                if context.is_named(&rule.name) && hand_holds(rule) {
                    push(rule, role);
                }
            }
        }

        let (base_points, doubles, total_points) = tally(&matched, ruleset.limit());
        EvaluationResult {
            matched_rules: matched,
            melds: candidate.melds.clone(),
            is_winning: mahjongg && total_points >= ruleset.min_mj_points(),
            base_points,
            doubles,
            total_points,
        }
    }
}

/// Base points, doubles and capped total of matched rules.
fn tally(matched: &[MatchedRule], limit: i64) -> (i64, u32, i64) {
    let mut base = 0i64;
    let mut doubles = 0u32;
    let mut fixed: Option<i64> = None;
    for rule in matched {
        match rule.score {
            Score::Points(p) => base += p,
            Score::Doubles(d) => doubles += d,
            Score::Limit(l) => fixed = Some(fixed.map_or(l, |f| f.max(l))),
        }
    }
    let total = match fixed {
        Some(limit_value) => limit_value,
        None => {
            let raw = base.saturating_mul(1i64 << doubles.min(62));
            if limit > 0 {
                raw.min(limit)
            } else {
                raw
            }
        }
    };
    (base, doubles, total)
}
