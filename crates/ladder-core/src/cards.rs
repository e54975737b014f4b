//! Card definitions and the card catalog.
//!
//! Cards are drawn from blessing tiles and start-of-turn drafts, held in a
//! player's hand for a limited number of cycles, and played during the
//! pre-move and post-move windows of a turn.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of cycles a card stays in hand before it expires
pub const CARD_LIFETIME_CYCLES: u32 = 3;

/// Broad grouping used by the UI and by bots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardCategory {
    /// Improves the actor's own movement
    Movement,
    /// Protects the actor
    Protection,
    /// Hurts an opponent
    Offense,
    /// Everything else
    Utility,
}

/// What a card does when played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardEffect {
    /// Adds to the roll in progress (pre-move) or banks into the next roll
    RollModifier,
    /// Lowers a chosen opponent's next roll
    CurseRoll,
    /// Opponents cannot reverse the actor for some cycles
    ReverseImmunity,
    /// The actor ignores the next snakes
    SnakeImmunity,
    /// The actor ignores every negative effect for some cycles
    FullImmunity,
    /// Throws additional dice
    ExtraDice,
    /// Pushes a chosen opponent backward
    PushBack,
    /// Pushes the nearest opponent ahead backward
    PushBackNearestAhead,
    /// Pushes every opponent in the actor's row backward
    PushBackRow,
    /// Swaps positions with a chosen opponent
    Swap,
    /// A chosen opponent loses turns
    SkipTurn,
    /// Draft a card next turn and gain a roll bonus
    DrawAndBoost,
    /// Doubles the next strike against the boss
    DoubleStrike,
    /// The next ladder also grants an extra turn
    Radiance,
    /// Restores hit points
    Heal,
    /// Permanently reduces incoming damage
    Defense,
}

impl CardEffect {
    /// Whether the player picks a target for this effect
    pub fn needs_chosen_target(&self) -> bool {
        matches!(
            self,
            CardEffect::CurseRoll | CardEffect::PushBack | CardEffect::Swap | CardEffect::SkipTurn
        )
    }

    /// Whether the effect works against another player
    pub fn is_hostile(&self) -> bool {
        matches!(
            self,
            CardEffect::CurseRoll
                | CardEffect::PushBack
                | CardEffect::PushBackNearestAhead
                | CardEffect::PushBackRow
                | CardEffect::Swap
                | CardEffect::SkipTurn
        )
    }

    /// Whether the effect moves its target backward
    pub fn is_reverse(&self) -> bool {
        matches!(
            self,
            CardEffect::PushBack | CardEffect::PushBackNearestAhead | CardEffect::PushBackRow
        )
    }
}

/// Identity of a card in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardKind {
    HermesBoots,
    HadesChains,
    HeraVeil,
    NagaScales,
    RaSunshield,
    FortunaDice,
    ZeusWrath,
    ThorHammer,
    PoseidonQuake,
    LokiTricks,
    AnubisJudgment,
    ThothWisdom,
    AresProvocation,
    AmaterasuRadiance,
    AsclepiusRemedy,
    AthenaAegis,
}

impl CardKind {
    /// Every card in the catalog
    pub const ALL: [CardKind; 16] = [
        CardKind::HermesBoots,
        CardKind::HadesChains,
        CardKind::HeraVeil,
        CardKind::NagaScales,
        CardKind::RaSunshield,
        CardKind::FortunaDice,
        CardKind::ZeusWrath,
        CardKind::ThorHammer,
        CardKind::PoseidonQuake,
        CardKind::LokiTricks,
        CardKind::AnubisJudgment,
        CardKind::ThothWisdom,
        CardKind::AresProvocation,
        CardKind::AmaterasuRadiance,
        CardKind::AsclepiusRemedy,
        CardKind::AthenaAegis,
    ];

    /// Full definition of this card
    pub fn definition(&self) -> CardDefinition {
        use CardCategory::*;
        use CardEffect::*;

        let (name, effect, magnitude, category) = match self {
            CardKind::HermesBoots => ("Hermes Boots", RollModifier, 2, Movement),
            CardKind::HadesChains => ("Hades Chains", CurseRoll, 2, Offense),
            CardKind::HeraVeil => ("Hera Veil", ReverseImmunity, 2, Protection),
            CardKind::NagaScales => ("Naga Scales", SnakeImmunity, 1, Protection),
            CardKind::RaSunshield => ("Ra Sunshield", FullImmunity, 1, Protection),
            CardKind::FortunaDice => ("Fortuna Dice", ExtraDice, 1, Movement),
            CardKind::ZeusWrath => ("Zeus Wrath", PushBack, 3, Offense),
            CardKind::ThorHammer => ("Thor Hammer", PushBackNearestAhead, 4, Offense),
            CardKind::PoseidonQuake => ("Poseidon Quake", PushBackRow, 2, Offense),
            CardKind::LokiTricks => ("Loki Tricks", Swap, 0, Offense),
            CardKind::AnubisJudgment => ("Anubis Judgment", SkipTurn, 1, Offense),
            CardKind::ThothWisdom => ("Thoth Wisdom", DrawAndBoost, 1, Utility),
            CardKind::AresProvocation => ("Ares Provocation", DoubleStrike, 2, Utility),
            CardKind::AmaterasuRadiance => ("Amaterasu Radiance", Radiance, 1, Movement),
            CardKind::AsclepiusRemedy => ("Asclepius Remedy", Heal, 5, Protection),
            CardKind::AthenaAegis => ("Athena Aegis", Defense, 1, Protection),
        };

        CardDefinition {
            kind: *self,
            name,
            effect,
            magnitude,
            category,
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        self.definition().name
    }

    /// Effect kind
    pub fn effect(&self) -> CardEffect {
        self.definition().effect
    }

    /// Pick `count` distinct cards at random for a draft
    pub fn draft<R: Rng>(rng: &mut R, count: usize) -> Vec<CardKind> {
        CardKind::ALL
            .choose_multiple(rng, count.min(CardKind::ALL.len()))
            .copied()
            .collect()
    }
}

/// Static card data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CardDefinition {
    pub kind: CardKind,
    pub name: &'static str,
    pub effect: CardEffect,
    pub magnitude: i32,
    pub category: CardCategory,
}

impl CardDefinition {
    /// Definitions of every card
    pub fn catalog() -> Vec<CardDefinition> {
        CardKind::ALL.iter().map(CardKind::definition).collect()
    }
}

/// A card held in a hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardInstance {
    pub kind: CardKind,
    /// Cycle during which the card was drawn
    pub cycle_acquired: u32,
}

impl CardInstance {
    pub fn new(kind: CardKind, cycle_acquired: u32) -> Self {
        Self {
            kind,
            cycle_acquired,
        }
    }

    pub fn definition(&self) -> CardDefinition {
        self.kind.definition()
    }

    /// Whether the card has expired by `current_cycle`
    pub fn is_expired(&self, current_cycle: u32) -> bool {
        current_cycle.saturating_sub(self.cycle_acquired) >= CARD_LIFETIME_CYCLES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_covers_every_kind() {
        let catalog = CardDefinition::catalog();
        assert_eq!(catalog.len(), CardKind::ALL.len());
        for (def, kind) in catalog.iter().zip(CardKind::ALL) {
            assert_eq!(def.kind, kind);
        }
    }

    #[test]
    fn test_draft_is_distinct() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let draft = CardKind::draft(&mut rng, 3);
        assert_eq!(draft.len(), 3);
        let unique: HashSet<_> = draft.iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_expiry_boundary() {
        let card = CardInstance::new(CardKind::HermesBoots, 4);
        assert!(!card.is_expired(4));
        assert!(!card.is_expired(6));
        assert!(card.is_expired(7));
        assert!(card.is_expired(9));
    }

    #[test]
    fn test_targeting_flags() {
        assert!(CardKind::ZeusWrath.effect().needs_chosen_target());
        assert!(CardKind::LokiTricks.effect().needs_chosen_target());
        assert!(CardKind::AnubisJudgment.effect().needs_chosen_target());
        assert!(!CardKind::ThorHammer.effect().needs_chosen_target());
        assert!(CardKind::ThorHammer.effect().is_reverse());
        assert!(!CardKind::HermesBoots.effect().is_hostile());
    }
}
