//! Classical Chinese ruleset.
//!
//! Limit 500, no minimum for going out. Rule names are public constants
//! where the table names them at claim time.

use crate::rules::{
    HandPattern, MeldPattern, Rule, RuleError, RuleRole, Ruleset, RulesetDefinition, Score, TilePattern,
};
use crate::tiles::{MeldKind, Suit, TileSource};

pub const NAME: &str = "Classical Chinese";

/// Upper bound on any hand.
pub const LIMIT: i64 = 500;

pub const DEAD_WALL: &str = "Last Tile Taken from Dead Wall";
pub const LAST_TILE_OF_WALL: &str = "Last Tile is Last Tile of Wall";
pub const LAST_TILE_OF_WALL_DISCARDED: &str = "Last Tile is Last Tile of Wall Discarded";
pub const ROBBING_THE_KONG: &str = "Robbing the Kong";
pub const CALL_AT_BEGINNING: &str = "Mah Jongg with Call at Beginning";
pub const BLESSING_OF_HEAVEN: &str = "Blessing of Heaven";
pub const BLESSING_OF_EARTH: &str = "Blessing of Earth";

pub const FALSE_NAMING_CHOW: &str = "False Naming of Discard, Claimed for Chow";
pub const FALSE_NAMING_PUNG: &str = "False Naming of Discard, Claimed for Pung/Kong";
pub const FALSE_NAMING_MAH_JONGG: &str = "False Naming of Discard, Claimed for Mah Jongg";
pub const FALSE_DECLARATION: &str = "False Declaration of Mah Jongg by One Player";

fn pung_or_kong_of(tiles: TilePattern) -> MeldPattern {
    MeldPattern::PungOrKong.and(MeldPattern::tiles(tiles))
}

/// Points for pungs and kongs: simples, then terminals and honours.
fn meld_points() -> Vec<Rule> {
    let shapes = [
        ("Exposed Pung", MeldKind::Pung, false, 2),
        ("Concealed Pung", MeldKind::Pung, true, 4),
        ("Exposed Kong", MeldKind::Kong, false, 8),
        ("Concealed Kong", MeldKind::Kong, true, 16),
    ];
    let mut rules = Vec::new();
    for (name, kind, concealed, points) in shapes {
        let exposure = if concealed { MeldPattern::Concealed } else { MeldPattern::Exposed };
        let shape = MeldPattern::Kind(kind).and(exposure);
        rules.push(Rule::meld(
            name,
            shape.clone().and(MeldPattern::tiles(TilePattern::Simple)),
            Score::Points(points),
        ));
        rules.push(Rule::meld(
            format!("{name} of Terminals/Honours"),
            shape.and(MeldPattern::tiles(TilePattern::TerminalOrHonour)),
            Score::Points(points * 2),
        ));
    }
    rules
}

fn definition() -> RulesetDefinition {
    let pair = || MeldPattern::Kind(MeldKind::Pair);
    let dragon_pungs = || pung_or_kong_of(TilePattern::Dragon);
    let wind_pungs = || pung_or_kong_of(TilePattern::Wind);
    let limit = Score::Limit(LIMIT);

    let mut def = RulesetDefinition::new(NAME).with_limit(LIMIT).with_min_mj_points(0);
    def.meld_rules = meld_points();
    def.meld_rules.extend([
        Rule::meld("Pair of Dragons", pair().and(MeldPattern::tiles(TilePattern::Dragon)), Score::Points(2)),
        Rule::meld("Pair of Own Wind", pair().and(MeldPattern::OwnWind), Score::Points(2)),
        Rule::meld("Pair of Round Wind", pair().and(MeldPattern::RoundWind), Score::Points(2)),
        Rule::meld("Pung/Kong of Dragons", dragon_pungs(), Score::Doubles(1)),
        Rule::meld("Pung/Kong of Own Wind", MeldPattern::PungOrKong.and(MeldPattern::OwnWind), Score::Doubles(1)),
        Rule::meld("Pung/Kong of Round Wind", MeldPattern::PungOrKong.and(MeldPattern::RoundWind), Score::Doubles(1)),
        Rule::meld("Flower", MeldPattern::Bonus(Suit::Flower), Score::Points(4)),
        Rule::meld("Season", MeldPattern::Bonus(Suit::Season), Score::Points(4)),
    ]);

    def.hand_rules = vec![
        Rule::hand(
            "Own Flower and Own Season",
            HandPattern::all([HandPattern::OwnBonus(Suit::Flower), HandPattern::OwnBonus(Suit::Season)]),
            Score::Doubles(1),
        ),
        Rule::hand("All Flowers", HandPattern::BonusCount { suit: Suit::Flower, min: 4 }, Score::Doubles(1)),
        Rule::hand("All Seasons", HandPattern::BonusCount { suit: Suit::Season, min: 4 }, Score::Doubles(1)),
        Rule::hand(
            "Three Concealed Pongs",
            HandPattern::count(MeldPattern::PungOrKong.and(MeldPattern::Concealed), 3),
            Score::Doubles(1),
        ),
        Rule::hand(
            "Little Three Dragons",
            HandPattern::count_exactly(dragon_pungs(), 2)
                .and(HandPattern::count(pair().and(MeldPattern::tiles(TilePattern::Dragon)), 1)),
            Score::Doubles(1),
        ),
        Rule::hand("Big Three Dragons", HandPattern::count(dragon_pungs(), 3), Score::Doubles(2)),
        Rule::hand(
            "Little Four Joys",
            HandPattern::count_exactly(wind_pungs(), 3)
                .and(HandPattern::count(pair().and(MeldPattern::tiles(TilePattern::Wind)), 1)),
            Score::Doubles(1),
        ),
        Rule::hand("Big Four Joys", HandPattern::count(wind_pungs(), 4), Score::Doubles(2)),
    ];

    let scoring_pair = pair().and(MeldPattern::any([
        MeldPattern::tiles(TilePattern::Dragon),
        MeldPattern::OwnWind,
        MeldPattern::RoundWind,
    ]));
    let true_color = HandPattern::SingleSuit.and(HandPattern::EveryTile(TilePattern::Suited));

    def.mahjongg_rules = vec![
        Rule::hand("Mah Jongg", HandPattern::Regular, Score::Points(20)),
        Rule::hand(
            "Last Tile Completes Pair of 2..8",
            HandPattern::LastMeld(pair().and(MeldPattern::tiles(TilePattern::Simple))),
            Score::Points(2),
        ),
        Rule::hand(
            "Last Tile Completes Pair of Terminals or Honours",
            HandPattern::LastMeld(pair().and(MeldPattern::tiles(TilePattern::TerminalOrHonour))),
            Score::Points(4),
        ),
        Rule::hand("Last Tile is Only Possible Tile", HandPattern::LastTileOnlyPossible, Score::Points(4)),
        Rule::hand("Won with Last Tile Taken from Wall", HandPattern::SelfDrawn, Score::Points(2)),
        Rule::hand(
            "Zero Point Hand",
            HandPattern::all([
                HandPattern::Regular,
                HandPattern::EveryMeld(MeldPattern::Kind(MeldKind::Chow).or(pair())),
                HandPattern::none(scoring_pair),
                HandPattern::NoBonus,
            ]),
            Score::Doubles(1),
        ),
        Rule::hand(
            "No Chow",
            HandPattern::Regular.and(HandPattern::none(MeldPattern::Kind(MeldKind::Chow))),
            Score::Doubles(1),
        ),
        Rule::hand(
            "Only Concealed Melds",
            HandPattern::Regular.and(HandPattern::EveryMeld(MeldPattern::Concealed)),
            Score::Doubles(1),
        ),
        Rule::hand(
            "False Color Game",
            HandPattern::SingleSuit.and(HandPattern::AnyTile(TilePattern::Honour)),
            Score::Doubles(1),
        ),
        Rule::hand("True Color Game", true_color.clone(), Score::Doubles(3)),
        Rule::hand(
            "Only Terminals and Honours",
            HandPattern::EveryTile(TilePattern::TerminalOrHonour),
            Score::Doubles(1),
        ),
        Rule::hand("Only Honours", HandPattern::EveryTile(TilePattern::Honour), Score::Doubles(2)),
        Rule::hand("Original Call", HandPattern::OriginalCall, Score::Doubles(1)),
        // limit hands
        Rule::hand(
            "Concealed True Color Game",
            true_color.and(HandPattern::EveryMeld(MeldPattern::Concealed)),
            limit,
        ),
        Rule::hand(
            "Hidden Treasure",
            HandPattern::all([
                HandPattern::Regular,
                HandPattern::SelfDrawn,
                HandPattern::EveryMeld(pair().or(MeldPattern::PungOrKong.and(MeldPattern::Concealed))),
            ]),
            limit,
        ),
        Rule::hand("All Honours", HandPattern::EveryTile(TilePattern::Honour), limit),
        Rule::hand("All Terminals", HandPattern::EveryTile(TilePattern::Terminal), limit),
        Rule::hand("Winding Snake", HandPattern::WindingSnake, limit),
        Rule::hand("Fourfold Plenty", HandPattern::count(MeldPattern::Kind(MeldKind::Kong), 4), limit),
        Rule::hand("Three Great Scholars", HandPattern::count(dragon_pungs(), 3), limit),
        Rule::hand("Four Blessings Hovering over the Door", HandPattern::count(wind_pungs(), 4), limit),
        Rule::hand("All Greens", HandPattern::EveryTile(TilePattern::Green), limit),
        Rule::hand("Nine Gates", HandPattern::NineGates, limit),
        Rule::hand("Thirteen Orphans", HandPattern::ThirteenOrphans, limit),
    ];

    def.manual_rules = vec![
        Rule::hand(DEAD_WALL, HandPattern::LastSource(TileSource::DeadWall), Score::Doubles(1)),
        Rule::hand(LAST_TILE_OF_WALL, HandPattern::SelfDrawn, Score::Doubles(1)),
        Rule::hand(LAST_TILE_OF_WALL_DISCARDED, HandPattern::LastSource(TileSource::Discard), Score::Doubles(1)),
        Rule::hand(ROBBING_THE_KONG, HandPattern::LastSource(TileSource::RobbedKong), Score::Doubles(1)),
        Rule::hand(CALL_AT_BEGINNING, HandPattern::CallAtBeginning, Score::Doubles(1)),
        Rule::hand(BLESSING_OF_HEAVEN, HandPattern::Dealer, limit),
        Rule::hand(BLESSING_OF_EARTH, HandPattern::Dealer.negate(), limit),
    ];

    def.penalty_rules = vec![
        Rule::hand(FALSE_NAMING_CHOW, HandPattern::Always, Score::Points(-50)),
        Rule::hand(FALSE_NAMING_PUNG, HandPattern::Always, Score::Points(-100)),
        Rule::hand(FALSE_NAMING_MAH_JONGG, HandPattern::Always, Score::Points(-300)),
        Rule::hand(FALSE_DECLARATION, HandPattern::Always, Score::Points(-300)),
    ];
    def
}

/// Build the Classical Chinese ruleset.
pub fn ruleset() -> Result<Ruleset, RuleError> {
    Ruleset::new(definition())
}

/// Role of a named rule, if the ruleset has it.
#[must_use]
pub fn role_of(ruleset: &Ruleset, name: &str) -> Option<RuleRole> {
    [RuleRole::Meld, RuleRole::Hand, RuleRole::MahJongg, RuleRole::Manual, RuleRole::Penalty]
        .into_iter()
        .find(|role| ruleset.find(*role, name).is_some())
}
