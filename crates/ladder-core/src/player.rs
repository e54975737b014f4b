//! Player state.
//!
//! This module contains:
//! - Player struct with position, hit points and status counters
//! - Hand for managing held cards
//! - Cycle bookkeeping (flag resets, counter decay, card expiry)

use crate::board::TileId;
use crate::cards::CardInstance;
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Player identifier (seat index, 0-based)
pub type PlayerId = u8;

/// Player color for UI rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerColor {
    Red,
    Blue,
    Green,
    Yellow,
}

impl PlayerColor {
    /// Get color for a player index
    pub fn for_player(id: PlayerId) -> Self {
        match id % 4 {
            0 => PlayerColor::Red,
            1 => PlayerColor::Blue,
            2 => PlayerColor::Green,
            _ => PlayerColor::Yellow,
        }
    }
}

/// Cards held by a player, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    cards: Vec<CardInstance>,
}

impl Hand {
    /// Create an empty hand
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CardInstance> {
        self.cards.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CardInstance> {
        self.cards.iter()
    }

    /// Add a card, evicting the oldest one first if the hand is at `limit`.
    /// Returns the evicted card.
    pub fn add(&mut self, card: CardInstance, limit: usize) -> Option<CardInstance> {
        let evicted = if limit > 0 && self.cards.len() >= limit {
            Some(self.cards.remove(0))
        } else {
            None
        };
        self.cards.push(card);
        evicted
    }

    /// Take a card out of the hand
    pub fn remove(&mut self, index: usize) -> Option<CardInstance> {
        if index < self.cards.len() {
            Some(self.cards.remove(index))
        } else {
            None
        }
    }

    /// Discard up to `count` random cards
    pub fn discard_random<R: Rng>(&mut self, rng: &mut R, count: usize) -> Vec<CardInstance> {
        let amount = count.min(self.cards.len());
        let mut picked: Vec<usize> = index::sample(rng, self.cards.len(), amount).into_vec();
        // Remove from the back so earlier indices stay valid
        picked.sort_unstable_by(|a, b| b.cmp(a));
        picked.into_iter().map(|i| self.cards.remove(i)).collect()
    }

    /// Remove and return every card expired at `current_cycle`
    pub fn expire(&mut self, current_cycle: u32) -> Vec<CardInstance> {
        let (expired, kept): (Vec<_>, Vec<_>) = self
            .cards
            .drain(..)
            .partition(|c| c.is_expired(current_cycle));
        self.cards = kept;
        expired
    }
}

/// A single player's state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Seat index
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Player color
    pub color: PlayerColor,
    /// Current tile
    pub tile: TileId,
    /// Hit points
    pub hp: u32,
    /// Maximum hit points
    pub max_hp: u32,
    /// Flat damage reduction
    pub defense: u32,
    /// Banked modifier applied to the next roll
    pub next_roll_modifier: i32,
    /// Cycles of immunity to every negative effect
    pub immune_all_negative_turns: u32,
    /// Snakes that will be ignored
    pub immune_snake_uses: u32,
    /// Cycles of immunity to being reversed
    pub immune_reverse_cycles: u32,
    /// Turns this player will lose
    pub skip_turns: u32,
    /// Extra dice thrown on the next roll
    pub extra_dice_rolls: u32,
    /// Take another turn after this one
    pub gets_extra_turn: bool,
    /// Offer a card draft at the start of the next turn
    pub draw_card_next_turn: bool,
    /// Already pushed back by an opponent this cycle
    pub was_reversed_this_cycle: bool,
    /// Next strike against the boss deals double damage
    pub has_ares_provocation: bool,
    /// Next ladder also grants an extra turn
    pub has_amaterasu_radiance: bool,
    /// Cards in hand
    pub hand: Hand,
    /// Knocked out (hp reached 0)
    pub is_eliminated: bool,
    /// Reached the finish tile
    pub has_won: bool,
}

impl Player {
    /// Create a new player on the start tile
    pub fn new(id: PlayerId, name: String, max_hp: u32) -> Self {
        Self {
            id,
            name,
            color: PlayerColor::for_player(id),
            tile: 1,
            hp: max_hp,
            max_hp,
            defense: 0,
            next_roll_modifier: 0,
            immune_all_negative_turns: 0,
            immune_snake_uses: 0,
            immune_reverse_cycles: 0,
            skip_turns: 0,
            extra_dice_rolls: 0,
            gets_extra_turn: false,
            draw_card_next_turn: false,
            was_reversed_this_cycle: false,
            has_ares_provocation: false,
            has_amaterasu_radiance: false,
            hand: Hand::new(),
            is_eliminated: false,
            has_won: false,
        }
    }

    /// Still taking turns
    pub fn is_active(&self) -> bool {
        !self.is_eliminated && !self.has_won
    }

    /// Ignores negative tiles and hostile cards
    pub fn is_immune_to_negative(&self) -> bool {
        self.immune_all_negative_turns > 0
    }

    /// Can be pushed backward by an opponent right now
    pub fn can_be_reversed(&self) -> bool {
        self.is_active()
            && self.tile > 1
            && !self.was_reversed_this_cycle
            && self.immune_reverse_cycles == 0
            && !self.is_immune_to_negative()
    }

    /// Cycle wrap: clear cycle flags, decay cycle counters and expire old
    /// cards. Returns the expired cards.
    pub fn begin_cycle(&mut self, current_cycle: u32) -> Vec<CardInstance> {
        self.was_reversed_this_cycle = false;
        self.has_ares_provocation = false;
        self.has_amaterasu_radiance = false;
        self.immune_reverse_cycles = self.immune_reverse_cycles.saturating_sub(1);
        self.immune_all_negative_turns = self.immune_all_negative_turns.saturating_sub(1);
        self.hand.expire(current_cycle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn card(kind: CardKind, cycle: u32) -> CardInstance {
        CardInstance::new(kind, cycle)
    }

    #[test]
    fn test_hand_evicts_oldest() {
        let mut hand = Hand::new();
        hand.add(card(CardKind::HermesBoots, 0), 2);
        hand.add(card(CardKind::ZeusWrath, 0), 2);
        let evicted = hand.add(card(CardKind::LokiTricks, 1), 2);

        assert_eq!(evicted.map(|c| c.kind), Some(CardKind::HermesBoots));
        assert_eq!(hand.len(), 2);
        assert_eq!(hand.get(0).unwrap().kind, CardKind::ZeusWrath);
        assert_eq!(hand.get(1).unwrap().kind, CardKind::LokiTricks);
    }

    #[test]
    fn test_discard_random_bounded_by_hand() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut hand = Hand::new();
        hand.add(card(CardKind::HermesBoots, 0), 5);
        hand.add(card(CardKind::HeraVeil, 0), 5);
        hand.add(card(CardKind::ZeusWrath, 0), 5);

        assert_eq!(hand.discard_random(&mut rng, 2).len(), 2);
        assert_eq!(hand.len(), 1);
        assert_eq!(hand.discard_random(&mut rng, 2).len(), 1);
        assert!(hand.is_empty());
    }

    #[test]
    fn test_begin_cycle_resets_and_decays() {
        let mut player = Player::new(0, "Test".to_string(), 20);
        player.was_reversed_this_cycle = true;
        player.has_ares_provocation = true;
        player.has_amaterasu_radiance = true;
        player.immune_reverse_cycles = 2;
        player.immune_all_negative_turns = 0;
        player.hand.add(card(CardKind::HermesBoots, 0), 5);
        player.hand.add(card(CardKind::ZeusWrath, 1), 5);

        let expired = player.begin_cycle(3);

        assert!(!player.was_reversed_this_cycle);
        assert!(!player.has_ares_provocation);
        assert!(!player.has_amaterasu_radiance);
        assert_eq!(player.immune_reverse_cycles, 1);
        assert_eq!(player.immune_all_negative_turns, 0);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].kind, CardKind::HermesBoots);
        assert_eq!(player.hand.len(), 1);
    }

    #[test]
    fn test_reverse_eligibility() {
        let mut player = Player::new(1, "Test".to_string(), 20);
        assert!(!player.can_be_reversed(), "start tile cannot be reversed");

        player.tile = 12;
        assert!(player.can_be_reversed());

        player.immune_reverse_cycles = 1;
        assert!(!player.can_be_reversed());
        player.immune_reverse_cycles = 0;

        player.was_reversed_this_cycle = true;
        assert!(!player.can_be_reversed());
    }
}
