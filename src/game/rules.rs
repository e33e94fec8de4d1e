use crate::models::card::{Card, Element, MonsterKind};
use crate::models::outcome::RoundResult;
use serde::{Deserialize, Serialize};

/// Which rule family touches the round's damage first. The effects are pure
/// multipliers, so both orders settle on the same numbers; the order is still
/// fixed per engine so round notes read the same way every match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleOrder {
    #[default]
    ElementalFirst,
    SpecialFirst,
}

/// Damage multiplier for `attacker` hitting `defender`.
///
/// Water beats Fire, Fire beats Normal, Normal beats Water (x2); the reverse
/// pairings are halved and everything else is left untouched.
pub fn effectiveness(attacker: Element, defender: Element) -> f64 {
    match (attacker, defender) {
        (Element::Water, Element::Fire)
        | (Element::Fire, Element::Normal)
        | (Element::Normal, Element::Water) => 2.0,
        (Element::Fire, Element::Water)
        | (Element::Normal, Element::Fire)
        | (Element::Water, Element::Normal) => 0.5,
        _ => 1.0,
    }
}

/// Elements only matter when at least one spell takes part in the round.
pub fn elemental_applies(first: &Card, second: &Card) -> bool {
    first.is_spell() || second.is_spell()
}

/// Working copy of a card's damage for a single round.
struct Fighter<'a> {
    card: &'a Card,
    damage: f64,
}

impl<'a> Fighter<'a> {
    fn new(card: &'a Card) -> Self {
        Self { card, damage: card.damage }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundResolution {
    pub result: RoundResult,
    pub first_damage: f64,
    pub second_damage: f64,
    pub notes: Vec<String>,
}

pub fn resolve_round(first: &Card, second: &Card, order: RuleOrder) -> RoundResolution {
    let mut one = Fighter::new(first);
    let mut two = Fighter::new(second);
    let mut notes = Vec::new();

    match order {
        RuleOrder::ElementalFirst => {
            apply_elemental(&mut one, &mut two, &mut notes);
            apply_special_both_ways(&mut one, &mut two, &mut notes);
        }
        RuleOrder::SpecialFirst => {
            apply_special_both_ways(&mut one, &mut two, &mut notes);
            apply_elemental(&mut one, &mut two, &mut notes);
        }
    }

    let result = if one.damage > two.damage {
        RoundResult::FirstWins
    } else if two.damage > one.damage {
        RoundResult::SecondWins
    } else {
        RoundResult::Draw
    };

    RoundResolution {
        result,
        first_damage: one.damage,
        second_damage: two.damage,
        notes,
    }
}

fn apply_elemental(one: &mut Fighter, two: &mut Fighter, notes: &mut Vec<String>) {
    if !elemental_applies(one.card, two.card) {
        return;
    }

    let first_multiplier = effectiveness(one.card.element, two.card.element);
    let second_multiplier = effectiveness(two.card.element, one.card.element);
    one.damage *= first_multiplier;
    two.damage *= second_multiplier;

    // The table is antisymmetric, so one note covers both directions.
    if first_multiplier > 1.0 {
        notes.push(format!("{} is effective against {}", one.card.element, two.card.element));
    } else if second_multiplier > 1.0 {
        notes.push(format!("{} is effective against {}", two.card.element, one.card.element));
    }
}

fn apply_special_both_ways(one: &mut Fighter, two: &mut Fighter, notes: &mut Vec<String>) {
    apply_special(one, two, notes);
    apply_special(two, one, notes);
}

/// Checks every special ability with `attacker` in the first seat.
fn apply_special(attacker: &mut Fighter, defender: &mut Fighter, notes: &mut Vec<String>) {
    if attacker.card.is(MonsterKind::Goblin) && defender.card.is(MonsterKind::Dragon) {
        attacker.damage *= 0.0;
        notes.push(format!("{} is too afraid of {} to attack", attacker.card.name, defender.card.name));
    }

    if attacker.card.is(MonsterKind::Wizard) && defender.card.is(MonsterKind::Ork) {
        defender.damage *= 0.0;
        notes.push(format!("{} controls {}", attacker.card.name, defender.card.name));
    }

    if attacker.card.is_spell()
        && attacker.card.element == Element::Water
        && defender.card.is(MonsterKind::Knight)
    {
        attacker.damage *= 1000.0;
        notes.push(format!("{} drowns in {}", defender.card.name, attacker.card.name));
    }

    if attacker.card.is_spell() && defender.card.is(MonsterKind::Kraken) {
        attacker.damage *= 0.0;
        notes.push(format!("{} is immune to {}", defender.card.name, attacker.card.name));
    }

    if attacker.card.is(MonsterKind::FireElf) && defender.card.is(MonsterKind::Dragon) {
        defender.damage *= 0.0;
        notes.push(format!("{} evades {}", attacker.card.name, defender.card.name));
    }
}
