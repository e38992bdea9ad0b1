//! Rule engine tests against the classical ruleset.
//!
//! These tests verify evaluation of complete and incomplete hands:
//! - Limit hands and which decomposition is chosen
//! - Idempotent evaluation
//! - Canonical encoding text

use mahjong_table::rules::{ClaimContext, EncodedHand, EvaluationContext, RuleEngine, RuleError};
use mahjong_table::rulesets::classical;
use mahjong_table::tiles::{parse_tiles, Hand, Meld, Tile, TileSource, Wind};

fn encoded(concealed: &str, melds: &[&str]) -> EncodedHand {
    EncodedHand::new(
        parse_tiles(concealed).unwrap(),
        melds.iter().map(|m| m.parse::<Meld>().unwrap()).collect(),
        Vec::new(),
        Wind::South,
        Wind::East,
    )
}

/// Nine gates completed by a claimed discard is a limit hand.
#[test]
fn test_nine_gates_on_discard() {
    let ruleset = classical::ruleset().unwrap();
    let hand = encoded("b1b1b1b2b3b4b5b6b7b8b9b9b9", &[]).with_tile(Tile::bamboo(9), TileSource::Discard);

    assert!(RuleEngine::maybe_mahjongg(&hand, &ruleset));
    let result = RuleEngine::evaluate(&hand, &ruleset, &EvaluationContext::new()).unwrap();
    assert!(result.is_winning);
    assert!(result.matched("Nine Gates"));
    assert_eq!(result.total_points, classical::LIMIT);
}

/// Every tile of the suit completes nine gates.
#[test]
fn test_nine_gates_waits_on_every_tile() {
    let ruleset = classical::ruleset().unwrap();
    for rank in 1..=9 {
        let hand = encoded("b1b1b1b2b3b4b5b6b7b8b9b9b9", &[]).with_tile(Tile::bamboo(rank), TileSource::Wall);
        let result = RuleEngine::evaluate(&hand, &ruleset, &EvaluationContext::new()).unwrap();
        assert!(result.matched("Nine Gates"), "b{rank} should complete nine gates");
    }
}

/// Evaluating the same encoding twice gives the same result.
#[test]
fn test_evaluation_is_idempotent() {
    let ruleset = classical::ruleset().unwrap();
    let hand =
        encoded("c1c2c3s4s5s6dgdgdgwe", &["b5b5b5"]).with_tile(Tile::wind(Wind::East), TileSource::Discard);
    let context = EvaluationContext::new().with_rule(classical::LAST_TILE_OF_WALL_DISCARDED);

    let first = RuleEngine::evaluate(&hand, &ruleset, &context).unwrap();
    let second = RuleEngine::evaluate(&hand, &ruleset, &context).unwrap();
    assert_eq!(first, second);
    assert!(first.is_winning);
    assert!(first.total_points > 0);
}

/// A losing hand still scores its concealed pungs.
#[test]
fn test_losing_hand_scores_concealed_pungs() {
    let ruleset = classical::ruleset().unwrap();
    let hand = encoded("drdrdrc1c5c9s2s4s8b3b7wnws", &[]);
    let result = RuleEngine::evaluate(&hand, &ruleset, &EvaluationContext::new()).unwrap();
    assert!(!result.is_winning);
    assert!(!RuleEngine::maybe_mahjongg(&hand, &ruleset));
    assert!(result.base_points > 0);
}

/// Hands with the wrong number of live tiles are rejected.
#[test]
fn test_short_hand_is_invalid() {
    let ruleset = classical::ruleset().unwrap();
    let hand = encoded("c1c2c3", &[]);
    assert!(matches!(
        RuleEngine::evaluate(&hand, &ruleset, &EvaluationContext::new()),
        Err(RuleError::InvalidEncoding(_))
    ));
    assert!(!RuleEngine::maybe_mahjongg(&hand, &ruleset));
}

/// The text form parses back to the same encoding.
#[test]
fn test_encoding_text_round_trip() {
    let hand = Hand::from_parts(
        parse_tiles("c1c2c3s4s5s6dgdgwewe").unwrap(),
        vec!["b5b5b5".parse().unwrap()],
        vec![Tile::flower(Wind::East)],
    );
    let claim = ClaimContext {
        call_at_beginning: false,
        original_call: true,
    };
    let encoded =
        EncodedHand::encode(&hand, Wind::West, Wind::South, claim).with_tile(Tile::wind(Wind::East), TileSource::Wall);
    let text = encoded.to_string();
    let back: EncodedHand = text.parse().unwrap();
    assert_eq!(back, encoded);
    assert_eq!(back.fixed_melds(), encoded.fixed_melds());
}

/// Garbage text is an invalid encoding, never a panic.
#[test]
fn test_malformed_encoding() {
    for text in ["M:zz", "R:c0", "W:E", "L:c1", "Q:c1", "B:c1"] {
        assert!(
            matches!(text.parse::<EncodedHand>(), Err(RuleError::InvalidEncoding(_))),
            "{text} should not parse"
        );
    }
}

/// The winning melds of a hand with exposed melds start with those melds
/// unchanged; the rest use exactly the concealed tiles.
#[test]
fn test_winning_melds_keep_exposed_melds_first() {
    let ruleset = classical::ruleset().unwrap();
    let exposed: Vec<Meld> = vec!["b5b5b5".parse().unwrap(), "s7s8s9".parse().unwrap()];
    let hand = EncodedHand::new(
        parse_tiles("c1c2c3dgdgdgwe").unwrap(),
        exposed.clone(),
        Vec::new(),
        Wind::South,
        Wind::East,
    )
    .with_tile(Tile::wind(Wind::East), TileSource::Discard);

    let melds = RuleEngine::winning_melds(&hand, &ruleset).unwrap();
    assert_eq!(melds.len(), 5);
    let mut leading = melds[..exposed.len()].to_vec();
    leading.sort();
    let mut expected = exposed.clone();
    expected.sort();
    assert_eq!(leading, expected);

    let mut declared: Vec<Tile> = melds[exposed.len()..]
        .iter()
        .flat_map(|m| m.tiles().iter().copied())
        .collect();
    declared.sort_unstable();
    let mut concealed = hand.concealed().to_vec();
    concealed.sort_unstable();
    assert_eq!(declared, concealed);
}
