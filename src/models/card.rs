use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type CardId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Element {
    Fire,
    Water,
    Normal,
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let str = match self {
            Element::Fire => "Fire",
            Element::Water => "Water",
            Element::Normal => "Normal",
        };
        write!(f, "{str}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonsterKind {
    Goblin,
    Dragon,
    Wizard,
    Ork,
    Knight,
    Kraken,
    FireElf,
}

impl fmt::Display for MonsterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let str = match self {
            MonsterKind::Goblin => "Goblin",
            MonsterKind::Dragon => "Dragon",
            MonsterKind::Wizard => "Wizard",
            MonsterKind::Ork => "Ork",
            MonsterKind::Knight => "Knight",
            MonsterKind::Kraken => "Kraken",
            MonsterKind::FireElf => "FireElf",
        };
        write!(f, "{str}")
    }
}

/// A card as the battle core sees it. Element and monster kind are fixed at
/// creation; `damage` is the stored base value and is never modified by a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    pub damage: f64,
    pub element: Element,
    pub monster: Option<MonsterKind>,
}

impl Card {
    pub fn monster(name: &str, damage: f64, element: Element, kind: MonsterKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            damage: damage.max(0.0),
            element,
            monster: Some(kind),
        }
    }

    pub fn spell(name: &str, damage: f64, element: Element) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            damage: damage.max(0.0),
            element,
            monster: None,
        }
    }

    pub fn is_spell(&self) -> bool {
        self.monster.is_none()
    }

    pub fn is(&self, kind: MonsterKind) -> bool {
        self.monster == Some(kind)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.damage)
    }
}

/// Card row as delivered by the card service. Names are only interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRecord {
    pub id: CardId,
    pub name: String,
    pub damage: f64,
}

/// Result of looking a card name up in the compatibility table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub element: Element,
    pub monster: Option<MonsterKind>,
    pub recognized: bool,
}

const MONSTER_NAMES: [(&str, MonsterKind, Element); 9] = [
    ("Goblin", MonsterKind::Goblin, Element::Normal),
    ("Dragon", MonsterKind::Dragon, Element::Fire),
    ("Wizard", MonsterKind::Wizard, Element::Normal),
    ("Wizzard", MonsterKind::Wizard, Element::Normal),
    ("Ork", MonsterKind::Ork, Element::Normal),
    ("Knight", MonsterKind::Knight, Element::Normal),
    ("Kraken", MonsterKind::Kraken, Element::Water),
    ("FireElf", MonsterKind::FireElf, Element::Fire),
    ("FireElves", MonsterKind::FireElf, Element::Fire),
];

const ELEMENT_PREFIXES: [(&str, Element); 3] = [
    ("Water", Element::Water),
    ("Fire", Element::Fire),
    ("Regular", Element::Normal),
];

/// Maps a card name onto its element and monster kind.
///
/// Names are either a bare monster (`Dragon`), an element prefix followed by a
/// monster (`WaterGoblin`) or an element prefix followed by `Spell`
/// (`FireSpell`). Anything else is reported as unrecognized and treated as a
/// Normal spell.
pub fn classify(name: &str) -> Classification {
    if let Some(found) = lookup_monster(name) {
        return found;
    }

    for (prefix, element) in ELEMENT_PREFIXES {
        if let Some(rest) = name.strip_prefix(prefix) {
            if rest == "Spell" {
                return Classification { element, monster: None, recognized: true };
            }
            if let Some(found) = lookup_monster(rest) {
                return Classification { element, ..found };
            }
        }
    }

    Classification {
        element: Element::Normal,
        monster: None,
        recognized: false,
    }
}

fn lookup_monster(name: &str) -> Option<Classification> {
    MONSTER_NAMES
        .iter()
        .find(|(monster_name, _, _)| *monster_name == name)
        .map(|(_, kind, element)| Classification {
            element: *element,
            monster: Some(*kind),
            recognized: true,
        })
}

impl CardRecord {
    /// Classifies the record, handing unknown names to `on_unknown` before
    /// falling back to a Normal spell.
    pub fn into_card_with<F>(self, on_unknown: F) -> Card
    where
        F: FnOnce(&CardRecord),
    {
        let classification = classify(&self.name);
        if !classification.recognized {
            on_unknown(&self);
        }

        Card {
            id: self.id,
            name: self.name,
            damage: self.damage.max(0.0),
            element: classification.element,
            monster: classification.monster,
        }
    }

    pub fn into_card(self) -> Card {
        self.into_card_with(|record| {
            crate::logger!(
                WARN,
                "[STORE] Unknown card name `{}` ({}), treating it as a Normal spell",
                record.name,
                record.id
            );
        })
    }
}
