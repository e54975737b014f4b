//! AI Bot players.
//!
//! This module provides different difficulty levels of AI players:
//! - Easy: Random valid moves
//! - Medium: Basic heuristics (use movement cards, reverse the leader)
//! - Hard: Looks at where the roll will land before committing

use crate::actions::GameAction;
use crate::board::{TileId, TileKind};
use crate::cards::{CardCategory, CardEffect, CardKind};
use crate::game::{GameState, PendingChoice, TurnPhase};
use crate::movement::MovementEngine;
use crate::player::PlayerId;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Bot difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotDifficulty {
    Easy,
    Medium,
    Hard,
}

/// A bot player that can decide on actions
pub struct Bot {
    pub player_id: PlayerId,
    pub difficulty: BotDifficulty,
    rng: StdRng,
}

impl Bot {
    pub fn new(player_id: PlayerId, difficulty: BotDifficulty) -> Self {
        Self {
            player_id,
            difficulty,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(player_id: PlayerId, difficulty: BotDifficulty, seed: u64) -> Self {
        Self {
            player_id,
            difficulty,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Choose an action from the valid actions
    pub fn choose_action(&mut self, game: &GameState) -> Option<GameAction> {
        let valid_actions = game.valid_actions(self.player_id);
        if valid_actions.is_empty() {
            return None;
        }

        match self.difficulty {
            BotDifficulty::Easy => self.choose_easy(&valid_actions),
            BotDifficulty::Medium => self.choose_medium(game, &valid_actions),
            BotDifficulty::Hard => self.choose_hard(game, &valid_actions),
        }
    }

    /// Easy: Just pick a random valid action. Never cancels, so a random
    /// bot cannot bounce between a prompt and its cancel forever.
    fn choose_easy(&mut self, actions: &[GameAction]) -> Option<GameAction> {
        let candidates: Vec<&GameAction> = actions
            .iter()
            .filter(|a| **a != GameAction::CancelTarget)
            .collect();
        candidates.choose(&mut self.rng).map(|a| **a)
    }

    /// Medium: Use basic heuristics
    fn choose_medium(&mut self, game: &GameState, actions: &[GameAction]) -> Option<GameAction> {
        // Priority order for medium bot:
        // 1. Answer any pending prompt
        // 2. Roll dice if we can
        // 3. Boost the roll before moving
        // 4. Hit the leader after moving
        // 5. Move / end turn

        if let Some(action) = self.answer_prompt(game, actions) {
            return Some(action);
        }

        if actions.contains(&GameAction::RollDice) {
            return Some(GameAction::RollDice);
        }

        match game.session.phase {
            TurnPhase::PreMovePlay => {
                if let Some(play) = self.find_card(game, actions, |kind| {
                    matches!(
                        kind.effect(),
                        CardEffect::RollModifier | CardEffect::ExtraDice | CardEffect::DrawAndBoost
                    )
                }) {
                    return Some(play);
                }
                Some(GameAction::ConfirmMove)
            }
            TurnPhase::PostMovePlay => {
                let me = game.get_player(self.player_id)?;
                let low_hp = me.hp * 2 < me.max_hp;
                if let Some(play) = self.find_card(game, actions, |kind| {
                    kind.definition().category == CardCategory::Offense
                        || (low_hp && kind.effect() == CardEffect::Heal)
                }) {
                    if self.rng.gen_bool(0.7) {
                        return Some(play);
                    }
                }
                Some(GameAction::EndTurn)
            }
            _ => actions.choose(&mut self.rng).copied(),
        }
    }

    /// Hard: Strategic planning
    fn choose_hard(&mut self, game: &GameState, actions: &[GameAction]) -> Option<GameAction> {
        let me = game.get_player(self.player_id)?;
        let roll = game.session.pending_roll.unwrap_or(0);
        let landing = self.predicted_landing(game, me.tile, roll);
        let bad_landing = landing.map_or(false, |t| self.is_bad_tile(game, t));

        // Use the roll on an opponent when our own move lands badly
        if let Some(PendingChoice::ReverseOrMove { .. }) = &game.session.pending_choice {
            if bad_landing && actions.contains(&GameAction::ChooseReverse) {
                return Some(GameAction::ChooseReverse);
            }
        }

        if game.session.phase == TurnPhase::PreMovePlay
            && game.session.pending_choice.is_none()
            && bad_landing
        {
            // Shield or reroute before walking into trouble
            if let Some(play) = self.find_card(game, actions, |kind| {
                matches!(
                    kind.effect(),
                    CardEffect::SnakeImmunity
                        | CardEffect::FullImmunity
                        | CardEffect::RollModifier
                        | CardEffect::DrawAndBoost
                )
            }) {
                return Some(play);
            }
        }

        if let Some(PendingChoice::Draft { options, .. }) = &game.session.pending_choice {
            let best = options
                .iter()
                .enumerate()
                .max_by_key(|(_, kind)| self.card_value(game, **kind))
                .map(|(i, _)| GameAction::ChooseCard(i));
            if best.is_some() {
                return best;
            }
        }

        self.choose_medium(game, actions)
    }

    fn answer_prompt(&mut self, game: &GameState, actions: &[GameAction]) -> Option<GameAction> {
        match game.session.pending_choice.as_ref()? {
            PendingChoice::Draft { options, .. } => {
                // Prefer movement, then offense
                let pick = options
                    .iter()
                    .position(|k| k.definition().category == CardCategory::Movement)
                    .or_else(|| {
                        options
                            .iter()
                            .position(|k| k.definition().category == CardCategory::Offense)
                    })
                    .unwrap_or_else(|| self.rng.gen_range(0..options.len()));
                Some(GameAction::ChooseCard(pick))
            }
            PendingChoice::ReverseOrMove { eligible } => {
                let me = game.get_player(self.player_id)?;
                let leader_ahead = eligible
                    .iter()
                    .filter_map(|id| game.get_player(*id))
                    .any(|p| p.tile > me.tile + game.session.pending_roll.unwrap_or(0));
                if leader_ahead && self.rng.gen_bool(0.5) {
                    Some(GameAction::ChooseReverse)
                } else {
                    Some(GameAction::MoveSelf)
                }
            }
            PendingChoice::Target { candidates, .. } => {
                // Hit whoever is furthest along
                let target = candidates
                    .iter()
                    .filter_map(|id| game.get_player(*id))
                    .max_by_key(|p| (p.tile, std::cmp::Reverse(p.id)))?;
                actions
                    .iter()
                    .find(|a| **a == GameAction::ChooseTarget(target.id))
                    .copied()
            }
        }
    }

    fn find_card(
        &self,
        game: &GameState,
        actions: &[GameAction],
        wanted: impl Fn(CardKind) -> bool,
    ) -> Option<GameAction> {
        let hand = &game.get_player(self.player_id)?.hand;
        actions.iter().copied().find(|action| match action {
            GameAction::PlayCard(i) => hand.get(*i).map_or(false, |c| wanted(c.kind)),
            _ => false,
        })
    }

    /// Where a forward move of `roll` ends, ignoring tile effects
    fn predicted_landing(&self, game: &GameState, from: TileId, roll: u32) -> Option<TileId> {
        if roll == 0 {
            return None;
        }
        let (first, bounce) = MovementEngine::forward_target(from, roll, game.board.finish());
        Some(bounce.unwrap_or(first))
    }

    fn is_bad_tile(&self, game: &GameState, tile: TileId) -> bool {
        let Some(me) = game.get_player(self.player_id) else {
            return false;
        };
        match game.board.kind_of(tile) {
            TileKind::SnakeStart => me.immune_snake_uses == 0 && !me.is_immune_to_negative(),
            TileKind::AttackTile | TileKind::NegaTile | TileKind::BossTile => {
                !me.is_immune_to_negative() && me.hp * 3 < me.max_hp
            }
            _ => false,
        }
    }

    /// Rough worth of a card given the current standings
    fn card_value(&self, game: &GameState, kind: CardKind) -> i32 {
        let Some(me) = game.get_player(self.player_id) else {
            return 0;
        };
        let behind = game
            .players
            .iter()
            .filter(|p| p.id != self.player_id && p.is_active())
            .any(|p| p.tile > me.tile);
        match kind.definition().category {
            CardCategory::Movement => 3,
            CardCategory::Offense if behind => 4,
            CardCategory::Offense => 2,
            CardCategory::Protection if me.hp * 2 < me.max_hp => 4,
            CardCategory::Protection => 1,
            CardCategory::Utility => 2,
        }
    }
}
