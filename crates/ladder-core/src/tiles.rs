//! Tile effect resolution.
//!
//! Every time a pawn settles on a tile at the end of its own move, a new
//! landing is opened with a fresh [`LandingId`]. The landing stays open while
//! the effect waits on a teleport, a forced advance or a card pick, and is
//! closed exactly once. Signals carrying any other landing id are stale and
//! ignored.

use crate::actions::{DiscardReason, DraftOrigin, GameEvent, SkipReason};
use crate::board::{Tile, TileId, TileKind};
use crate::combat::{self, DamageSource};
use crate::game::GameState;
use crate::movement::{MoveMode, MovePurpose, MovementEngine};
use crate::player::PlayerId;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Identifier of one landing being resolved
pub type LandingId = u64;

/// What an open landing is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Awaiting {
    /// Nothing; the landing can be closed
    Nothing,
    /// A snake or ladder teleport
    Teleport,
    /// A forced advance; the new tile is evaluated as part of the chain
    Advance,
    /// A card pick from a blessing draft
    CardChoice,
}

/// An open landing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub landing: LandingId,
    pub player: PlayerId,
    /// Tiles evaluated so far in this landing
    pub chain: u32,
    pub awaiting: Awaiting,
}

/// Tracks the landing being resolved
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TileEffectResolver {
    next_landing: LandingId,
    active: Option<Resolution>,
}

impl TileEffectResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The open landing
    pub fn active(&self) -> Option<&Resolution> {
        self.active.as_ref()
    }

    pub fn is_resolving(&self) -> bool {
        self.active.is_some()
    }

    fn open(&mut self, player: PlayerId) -> LandingId {
        self.next_landing += 1;
        self.active = Some(Resolution {
            landing: self.next_landing,
            player,
            chain: 0,
            awaiting: Awaiting::Nothing,
        });
        self.next_landing
    }

    fn get_mut(&mut self, landing: LandingId) -> Option<&mut Resolution> {
        self.active.as_mut().filter(|r| r.landing == landing)
    }

    fn wait_for(&mut self, landing: LandingId, awaiting: Awaiting) {
        if let Some(res) = self.get_mut(landing) {
            res.awaiting = awaiting;
        }
    }

    /// Whatever the landing was waiting on has arrived
    pub(crate) fn mark_settled(&mut self, landing: LandingId) {
        self.wait_for(landing, Awaiting::Nothing);
    }

    fn close(&mut self, landing: LandingId) -> Option<Resolution> {
        match self.active {
            Some(res) if res.landing == landing => self.active.take(),
            _ => None,
        }
    }
}

impl GameState {
    /// Open a landing for `player` on their current tile and evaluate it
    pub(crate) fn begin_resolution(&mut self, player: PlayerId, events: &mut Vec<GameEvent>) {
        if let Some(stale) = self.resolver.active.take() {
            warn!(landing = stale.landing, "landing still open, discarding it");
        }
        let landing = self.resolver.open(player);
        self.evaluate_landing(landing, events);
    }

    /// Whether landing on `tile` would be harmful right now
    pub fn is_negative_landing(&self, tile: &Tile) -> bool {
        match tile.kind {
            TileKind::BossTile => {
                let boss_alive = self.boss.as_ref().map_or(true, |b| !b.is_defeated());
                boss_alive && self.boss_tile_damage(tile) > 0
            }
            _ => tile.is_negative(),
        }
    }

    fn boss_tile_damage(&self, tile: &Tile) -> u32 {
        tile.damage.unwrap_or(self.config.boss_tile_damage)
    }

    fn evaluate_landing(&mut self, landing: LandingId, events: &mut Vec<GameEvent>) {
        let Some(res) = self.resolver.get_mut(landing) else {
            return;
        };
        res.chain += 1;
        res.awaiting = Awaiting::Nothing;
        let chain = res.chain;
        let player = res.player;

        let tile_id = self.players[player as usize].tile;
        let Some(tile) = self.board.get_tile(tile_id).cloned() else {
            warn!(player, tile = tile_id, "pawn is off the board");
            self.complete_resolution(landing, events);
            return;
        };

        debug!(player, tile = tile_id, kind = ?tile.kind, landing, chain, "landed");
        events.push(GameEvent::TileLanded {
            player,
            tile: tile_id,
            kind: tile.kind,
            landing,
        });

        if tile_id == self.board.finish() {
            self.declare_winner(player, events);
            self.complete_resolution(landing, events);
            return;
        }

        if chain > self.config.max_chain_length {
            warn!(player, landing, chain, "effect chain cut");
            self.skip_effect(player, tile_id, SkipReason::ChainLimit, events);
            self.complete_resolution(landing, events);
            return;
        }

        if self.is_negative_landing(&tile) && self.players[player as usize].is_immune_to_negative() {
            self.skip_effect(player, tile_id, SkipReason::FullImmunity, events);
            self.complete_resolution(landing, events);
            return;
        }

        match tile.kind {
            TileKind::SnakeStart => {
                let p = self.player_mut(player);
                if p.immune_snake_uses > 0 {
                    p.immune_snake_uses -= 1;
                    self.skip_effect(player, tile_id, SkipReason::SnakeImmunity, events);
                    self.complete_resolution(landing, events);
                } else {
                    self.teleport(landing, player, tile.target, events);
                }
            }

            TileKind::LadderStart => {
                let p = self.player_mut(player);
                if p.has_amaterasu_radiance {
                    p.has_amaterasu_radiance = false;
                    p.gets_extra_turn = true;
                    events.push(GameEvent::ExtraTurnGranted { player });
                }
                self.teleport(landing, player, tile.target, events);
            }

            TileKind::BlessingCard => {
                if self.offer_draft(player, DraftOrigin::Blessing { landing }, events) {
                    self.resolver.wait_for(landing, Awaiting::CardChoice);
                } else {
                    self.complete_resolution(landing, events);
                }
            }

            TileKind::AttackTile => {
                let damage = tile
                    .damage
                    .unwrap_or_else(|| self.config.row_damage_for(tile.row));
                combat::apply_damage(
                    self.player_mut(player),
                    damage,
                    DamageSource::AttackTile(tile_id),
                    events,
                );
                self.complete_resolution(landing, events);
            }

            TileKind::NegaTile => {
                self.resolve_nega(player, tile_id, events);
                self.complete_resolution(landing, events);
            }

            TileKind::BossTile => {
                if self.resolve_boss(landing, player, &tile, events) {
                    return;
                }
                self.complete_resolution(landing, events);
            }

            TileKind::Normal | TileKind::SnakeEnd | TileKind::LadderEnd => {
                self.complete_resolution(landing, events);
            }
        }
    }

    fn teleport(
        &mut self,
        landing: LandingId,
        player: PlayerId,
        target: Option<TileId>,
        events: &mut Vec<GameEvent>,
    ) {
        let Some(target) = target else {
            self.complete_resolution(landing, events);
            return;
        };
        self.movement.enqueue(
            player,
            target,
            MoveMode::Teleport,
            MovePurpose::Resolution {
                landing,
                bounce_to: None,
            },
        );
        self.resolver.wait_for(landing, Awaiting::Teleport);
    }

    /// Nega tile: small random damage, then exactly one drawback
    fn resolve_nega(&mut self, player: PlayerId, tile: TileId, events: &mut Vec<GameEvent>) {
        let (low, high) = self.config.nega_damage;
        let damage = self.rng.gen_range(low..=high);
        combat::apply_damage(
            self.player_mut(player),
            damage,
            DamageSource::NegaTile(tile),
            events,
        );
        if !self.players[player as usize].is_active() {
            return;
        }

        let shift = self.config.nega_roll_shift;
        match self.rng.gen_range(0..3) {
            0 => {
                let count = self.config.nega_discard;
                let p = &mut self.players[player as usize];
                for card in p.hand.discard_random(&mut self.rng, count) {
                    events.push(GameEvent::CardDiscarded {
                        player,
                        card: card.kind,
                        reason: DiscardReason::NegaTile,
                    });
                }
            }
            roll => {
                let delta = if roll == 1 { shift } else { -shift };
                let p = self.player_mut(player);
                p.next_roll_modifier += delta;
                events.push(GameEvent::NextRollModified {
                    player,
                    delta,
                    modifier: p.next_roll_modifier,
                });
            }
        }
    }

    /// Boss tile. Returns true when the landing now waits on a forced advance.
    fn resolve_boss(
        &mut self,
        landing: LandingId,
        player: PlayerId,
        tile: &Tile,
        events: &mut Vec<GameEvent>,
    ) -> bool {
        if self.boss.as_ref().is_some_and(|b| b.is_defeated()) {
            self.skip_effect(player, tile.id, SkipReason::BossDefeated, events);
            return false;
        }

        let damage = self.boss_tile_damage(tile);
        if damage > 0 {
            combat::apply_damage(
                self.player_mut(player),
                damage,
                DamageSource::Boss(tile.id),
                events,
            );
        }
        if !self.players[player as usize].is_active() {
            return false;
        }

        if let Some(boss) = self.boss.as_mut() {
            let base = self.config.boss.as_ref().map_or(0, |b| b.player_strike);
            let p = &mut self.players[player as usize];
            let strike = if p.has_ares_provocation {
                p.has_ares_provocation = false;
                base * 2
            } else {
                base
            };
            if strike > 0 {
                combat::strike_boss(boss, player, strike, events);
            }
        }

        if tile.boss.shuffle_board {
            self.board.shuffle(&mut self.rng);
            events.push(GameEvent::BoardShuffled);
        }

        let Some(steps) = tile.boss.advance.filter(|&n| n > 0) else {
            return false;
        };
        let from = self.players[player as usize].tile;
        let (first, bounce_to) = MovementEngine::forward_target(from, steps, self.board.finish());
        self.movement.enqueue(
            player,
            first,
            MoveMode::Step,
            MovePurpose::Resolution { landing, bounce_to },
        );
        self.resolver.wait_for(landing, Awaiting::Advance);
        true
    }

    fn skip_effect(&mut self, player: PlayerId, tile: TileId, reason: SkipReason, events: &mut Vec<GameEvent>) {
        debug!(player, tile, ?reason, "effect skipped");
        events.push(GameEvent::EffectSkipped {
            player,
            tile,
            reason,
        });
    }

    /// A teleport or advance requested by `landing` has finished
    pub(crate) fn on_resolution_move_finished(
        &mut self,
        landing: LandingId,
        final_tile: TileId,
        events: &mut Vec<GameEvent>,
    ) {
        let Some(res) = self.resolver.get_mut(landing) else {
            warn!(landing, "movement finished for a closed landing");
            return;
        };
        let awaiting = res.awaiting;
        let player = res.player;
        res.awaiting = Awaiting::Nothing;

        match awaiting {
            Awaiting::Advance => self.evaluate_landing(landing, events),
            Awaiting::Teleport => {
                events.push(GameEvent::TileLanded {
                    player,
                    tile: final_tile,
                    kind: self.board.kind_of(final_tile),
                    landing,
                });
                if final_tile == self.board.finish() {
                    self.declare_winner(player, events);
                }
                self.complete_resolution(landing, events);
            }
            Awaiting::Nothing | Awaiting::CardChoice => {
                warn!(landing, ?awaiting, "unexpected movement for landing");
            }
        }
    }

    /// Close `landing` and hand control back to the turn. Duplicate or stale
    /// calls are ignored. Returns whether the landing was closed.
    pub(crate) fn complete_resolution(&mut self, landing: LandingId, events: &mut Vec<GameEvent>) -> bool {
        let Some(res) = self.resolver.close(landing) else {
            warn!(landing, "ignoring resolve-complete for a closed landing");
            return false;
        };
        debug!(player = res.player, landing, "resolve complete");
        events.push(GameEvent::ResolveComplete {
            player: res.player,
            landing,
        });
        self.after_resolution(events);
        true
    }

    /// Signal that `landing` is done. Only closes a landing that is not
    /// waiting on anything; anything else is a no-op.
    pub fn resolve_complete(&mut self, landing: LandingId) -> Vec<GameEvent> {
        let mut events = Vec::new();
        match self.resolver.active() {
            Some(res) if res.landing == landing && res.awaiting == Awaiting::Nothing => {
                self.complete_resolution(landing, &mut events);
            }
            _ => debug!(landing, "resolve-complete ignored"),
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::GameAction;
    use crate::board::{BoardConfig, BossTileEffect, TileSpec};
    use crate::cards::{CardInstance, CardKind};
    use crate::config::{BossConfig, GameConfig};
    use crate::game::{PendingChoice, TurnPhase};
    use pretty_assertions::assert_eq;

    fn game_on(specials: Vec<TileSpec>, boss: Option<BossConfig>) -> GameState {
        let config = GameConfig {
            board: BoardConfig::sparse(30, 5, specials),
            boss,
            reverse_enabled: false,
            seed: Some(3),
            ..GameConfig::default()
        };
        let mut game = GameState::new(config, vec!["A".into(), "B".into()]).unwrap();
        game.session.turn_order = vec![0, 1];
        game.start();
        game
    }

    /// Roll `value` for player 0 and run the move to completion
    fn move_by(game: &mut GameState, value: u32) -> Vec<GameEvent> {
        let mut events = game.apply_action(0, GameAction::RollDice).unwrap();
        events.extend(game.apply_action(0, GameAction::DeliverRoll(value)).unwrap());
        events.extend(game.apply_action(0, GameAction::ConfirmMove).unwrap());
        while game.is_movement_pending() {
            events.extend(game.advance_movement().unwrap());
        }
        events
    }

    fn count<F: Fn(&GameEvent) -> bool>(events: &[GameEvent], f: F) -> usize {
        events.iter().filter(|e| f(e)).count()
    }

    #[test]
    fn test_snake_slides_down() {
        let mut game = game_on(
            vec![TileSpec::snake(6, 2), TileSpec::of(2, TileKind::SnakeEnd)],
            None,
        );
        let events = move_by(&mut game, 5);

        assert_eq!(game.players[0].tile, 2);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::ResolveComplete { .. })), 1);
        assert_eq!(game.session.phase, TurnPhase::PostMovePlay);
    }

    #[test]
    fn test_snake_immunity_consumed() {
        let mut game = game_on(
            vec![TileSpec::snake(6, 2), TileSpec::of(2, TileKind::SnakeEnd)],
            None,
        );
        game.players[0].immune_snake_uses = 1;
        let events = move_by(&mut game, 5);

        assert_eq!(game.players[0].tile, 6);
        assert_eq!(game.players[0].immune_snake_uses, 0);
        assert!(events.contains(&GameEvent::EffectSkipped {
            player: 0,
            tile: 6,
            reason: SkipReason::SnakeImmunity
        }));
    }

    #[test]
    fn test_ladder_with_radiance_grants_extra_turn() {
        let mut game = game_on(
            vec![TileSpec::ladder(4, 14), TileSpec::of(14, TileKind::LadderEnd)],
            None,
        );
        game.players[0].has_amaterasu_radiance = true;
        let events = move_by(&mut game, 3);

        assert_eq!(game.players[0].tile, 14);
        assert!(events.contains(&GameEvent::ExtraTurnGranted { player: 0 }));
        assert!(game.players[0].gets_extra_turn);
    }

    #[test]
    fn test_full_immunity_skips_negative_tiles() {
        let mut game = game_on(vec![TileSpec::of(4, TileKind::AttackTile)], None);
        game.players[0].immune_all_negative_turns = 1;
        let events = move_by(&mut game, 3);

        assert_eq!(game.players[0].hp, game.players[0].max_hp);
        assert!(events.contains(&GameEvent::EffectSkipped {
            player: 0,
            tile: 4,
            reason: SkipReason::FullImmunity
        }));
    }

    #[test]
    fn test_attack_damage_scales_with_row() {
        let mut game = game_on(vec![TileSpec::of(12, TileKind::AttackTile)], None);
        game.players[0].tile = 9;
        move_by(&mut game, 3);

        // Tile 12 is in row 2 with five tiles per row
        assert_eq!(game.players[0].hp, game.players[0].max_hp - 3);
    }

    #[test]
    fn test_nega_applies_exactly_one_drawback() {
        for seed in 0..20 {
            let mut game = game_on(vec![TileSpec::of(4, TileKind::NegaTile)], None);
            game.rng = rand::SeedableRng::seed_from_u64(seed);
            for kind in [CardKind::HermesBoots, CardKind::HeraVeil, CardKind::ZeusWrath] {
                game.players[0].hand.add(CardInstance::new(kind, 0), 5);
            }
            let events = move_by(&mut game, 3);

            let lost = game.players[0].max_hp - game.players[0].hp;
            assert!((1..=3).contains(&lost));

            let discarded = count(&events, |e| {
                matches!(
                    e,
                    GameEvent::CardDiscarded {
                        reason: DiscardReason::NegaTile,
                        ..
                    }
                )
            });
            let shifted = count(&events, |e| matches!(e, GameEvent::NextRollModified { .. }));
            assert!(
                (discarded == 2 && shifted == 0) || (discarded == 0 && shifted == 1),
                "seed {}: discarded {} shifted {}",
                seed,
                discarded,
                shifted
            );
        }
    }

    #[test]
    fn test_blessing_waits_for_pick() {
        let mut game = game_on(vec![TileSpec::of(4, TileKind::BlessingCard)], None);
        let events = move_by(&mut game, 3);

        assert_eq!(count(&events, |e| matches!(e, GameEvent::ResolveComplete { .. })), 0);
        assert!(matches!(
            game.session.pending_choice,
            Some(PendingChoice::Draft { .. })
        ));
        assert_eq!(game.session.phase, TurnPhase::ResolveTile);

        let events = game.apply_action(0, GameAction::ChooseCard(0)).unwrap();
        assert_eq!(count(&events, |e| matches!(e, GameEvent::ResolveComplete { .. })), 1);
        assert_eq!(game.players[0].hand.len(), 1);
        assert_eq!(game.session.phase, TurnPhase::PostMovePlay);
    }

    #[test]
    fn test_duplicate_resolve_complete_is_noop() {
        let mut game = game_on(vec![], None);
        let events = move_by(&mut game, 3);
        let landing = events
            .iter()
            .find_map(|e| match e {
                GameEvent::ResolveComplete { landing, .. } => Some(*landing),
                _ => None,
            })
            .unwrap();

        assert!(game.resolve_complete(landing).is_empty());
        assert!(game.resolve_complete(landing + 7).is_empty());
        assert_eq!(game.session.phase, TurnPhase::PostMovePlay);
    }

    #[test]
    fn test_boss_hits_and_is_struck_back() {
        let boss = BossConfig {
            name: "Boss".into(),
            max_hp: 8,
            player_strike: 5,
        };
        let mut game = game_on(
            vec![TileSpec::boss(4, Some(3), BossTileEffect::default())],
            Some(boss),
        );
        game.players[0].has_ares_provocation = true;
        let events = move_by(&mut game, 3);

        assert_eq!(game.players[0].hp, game.players[0].max_hp - 3);
        assert!(events.contains(&GameEvent::BossDefeated { by: 0 }));
        assert!(!game.players[0].has_ares_provocation);
    }

    #[test]
    fn test_defeated_boss_tile_is_inert() {
        let mut game = game_on(
            vec![TileSpec::boss(4, Some(3), BossTileEffect::default())],
            Some(BossConfig::default()),
        );
        if let Some(boss) = game.boss.as_mut() {
            boss.hp = 0;
        }
        let events = move_by(&mut game, 3);

        assert_eq!(game.players[0].hp, game.players[0].max_hp);
        assert!(events.contains(&GameEvent::EffectSkipped {
            player: 0,
            tile: 4,
            reason: SkipReason::BossDefeated
        }));
    }

    #[test]
    fn test_boss_advance_chains_into_next_tile() {
        let mut game = game_on(
            vec![
                TileSpec::boss(
                    4,
                    Some(0),
                    BossTileEffect {
                        shuffle_board: true,
                        advance: Some(3),
                    },
                ),
                TileSpec::of(7, TileKind::AttackTile),
            ],
            None,
        );
        let events = move_by(&mut game, 3);

        assert_eq!(game.players[0].tile, 7);
        assert!(events.contains(&GameEvent::BoardShuffled));
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::DamageTaken { source: DamageSource::AttackTile(7), .. })));
        assert_eq!(count(&events, |e| matches!(e, GameEvent::ResolveComplete { .. })), 1);
    }

    #[test]
    fn test_chain_is_bounded() {
        let looping = BossTileEffect {
            shuffle_board: false,
            advance: Some(1),
        };
        let specials = (4..=20)
            .map(|id| TileSpec::boss(id, Some(0), looping))
            .collect();
        let mut game = game_on(specials, None);
        let events = move_by(&mut game, 3);

        let landed = count(&events, |e| matches!(e, GameEvent::TileLanded { .. }));
        assert_eq!(landed as u32, game.config.max_chain_length + 1);
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::EffectSkipped {
                reason: SkipReason::ChainLimit,
                ..
            }
        )));
        assert_eq!(game.session.phase, TurnPhase::PostMovePlay);
    }

    #[test]
    fn test_lethal_tile_ends_turn() {
        let mut game = game_on(vec![TileSpec::of(4, TileKind::AttackTile)], None);
        game.players[0].hp = 1;
        let events = move_by(&mut game, 3);

        assert!(events.contains(&GameEvent::PlayerDied { player: 0 }));
        assert!(game.is_finished());
        assert_eq!(game.loser(), Some(0));
        assert_eq!(game.eliminated(), &[0]);
        assert!(events.contains(&GameEvent::GameOver {
            winners: vec![],
            eliminated: vec![0],
            loser: Some(0),
        }));
    }
}
