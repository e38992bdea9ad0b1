//! Predefined rulesets.

pub mod classical;
