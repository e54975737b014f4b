//! Card effects.
//!
//! Cards are applied through [`GameState::apply_card`]. Hostile cards check
//! their target again at the moment of application; a target that has become
//! immune blocks the card, which is still spent.

use crate::actions::{GameEvent, StatusKind};
use crate::cards::{CardEffect, CardKind};
use crate::combat;
use crate::game::{clamp_roll, GameState};
use crate::movement::{MoveMode, MovePurpose};
use crate::player::PlayerId;
use tracing::debug;

/// What a card may touch besides the players
#[derive(Debug)]
pub struct CardContext<'a> {
    /// The roll in progress, when played before moving
    pub roll: Option<&'a mut u32>,
    /// Chosen or automatically selected target
    pub target: Option<PlayerId>,
}

/// Result of applying a card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardOutcome {
    Applied,
    /// The target was immune by the time the card resolved
    Blocked,
    /// Extra dice must be thrown and added to the roll in progress
    BonusRoll { dice: u32 },
}

impl GameState {
    /// Apply a card's effect for `actor`
    pub fn apply_card(
        &mut self,
        actor: PlayerId,
        card: CardKind,
        ctx: CardContext<'_>,
        events: &mut Vec<GameEvent>,
    ) -> CardOutcome {
        let def = card.definition();
        let magnitude = def.magnitude;
        let amount = magnitude.unsigned_abs();
        debug!(actor, card = def.name, target = ?ctx.target, "applying card");

        match def.effect {
            CardEffect::RollModifier => {
                self.modify_roll(actor, magnitude, ctx.roll, events);
            }

            CardEffect::DrawAndBoost => {
                self.player_mut(actor).draw_card_next_turn = true;
                events.push(GameEvent::StatusGained {
                    player: actor,
                    status: StatusKind::DrawNextTurn,
                    amount: 1,
                });
                self.modify_roll(actor, magnitude, ctx.roll, events);
            }

            CardEffect::CurseRoll => {
                let Some(target) = self.checked_target(actor, card, ctx.target, events) else {
                    return CardOutcome::Blocked;
                };
                let t = self.player_mut(target);
                t.next_roll_modifier -= magnitude;
                events.push(GameEvent::NextRollModified {
                    player: target,
                    delta: -magnitude,
                    modifier: t.next_roll_modifier,
                });
            }

            CardEffect::ReverseImmunity => {
                self.player_mut(actor).immune_reverse_cycles += amount;
                self.push_status(actor, StatusKind::ReverseImmunity, amount, events);
            }

            CardEffect::SnakeImmunity => {
                self.player_mut(actor).immune_snake_uses += amount;
                self.push_status(actor, StatusKind::SnakeImmunity, amount, events);
            }

            CardEffect::FullImmunity => {
                self.player_mut(actor).immune_all_negative_turns += amount;
                self.push_status(actor, StatusKind::FullImmunity, amount, events);
            }

            CardEffect::ExtraDice => {
                if ctx.roll.is_some() {
                    return CardOutcome::BonusRoll { dice: amount.max(1) };
                }
                self.player_mut(actor).extra_dice_rolls += amount;
                self.push_status(actor, StatusKind::ExtraDice, amount, events);
            }

            CardEffect::PushBack | CardEffect::PushBackNearestAhead => {
                let Some(target) = self.checked_target(actor, card, ctx.target, events) else {
                    return CardOutcome::Blocked;
                };
                self.push_back(actor, target, amount, events);
            }

            CardEffect::PushBackRow => {
                let mut hit = false;
                for target in self.row_opponents(actor) {
                    if self.target_allowed(actor, target, CardEffect::PushBackRow) {
                        self.push_back(actor, target, amount, events);
                        hit = true;
                    } else {
                        events.push(GameEvent::CardBlocked {
                            player: actor,
                            card,
                            target,
                        });
                    }
                }
                if !hit {
                    return CardOutcome::Blocked;
                }
            }

            CardEffect::Swap => {
                let Some(target) = self.checked_target(actor, card, ctx.target, events) else {
                    return CardOutcome::Blocked;
                };
                let mine = self.players[actor as usize].tile;
                let theirs = self.players[target as usize].tile;
                self.movement
                    .enqueue(actor, theirs, MoveMode::Teleport, MovePurpose::Forced);
                self.movement
                    .enqueue(target, mine, MoveMode::Teleport, MovePurpose::Forced);
                events.push(GameEvent::PositionsSwapped {
                    first: actor,
                    second: target,
                });
            }

            CardEffect::SkipTurn => {
                let Some(target) = self.checked_target(actor, card, ctx.target, events) else {
                    return CardOutcome::Blocked;
                };
                self.player_mut(target).skip_turns += amount;
                self.push_status(target, StatusKind::SkipTurns, amount, events);
            }

            CardEffect::DoubleStrike => {
                self.player_mut(actor).has_ares_provocation = true;
                self.push_status(actor, StatusKind::AresProvocation, 1, events);
            }

            CardEffect::Radiance => {
                self.player_mut(actor).has_amaterasu_radiance = true;
                self.push_status(actor, StatusKind::AmaterasuRadiance, 1, events);
            }

            CardEffect::Heal => {
                combat::heal(self.player_mut(actor), amount, events);
            }

            CardEffect::Defense => {
                self.player_mut(actor).defense += amount;
                self.push_status(actor, StatusKind::Defense, amount, events);
            }
        }

        CardOutcome::Applied
    }

    /// Change the roll in progress, or bank the change for the next roll
    fn modify_roll(
        &mut self,
        actor: PlayerId,
        delta: i32,
        roll: Option<&mut u32>,
        events: &mut Vec<GameEvent>,
    ) {
        match roll {
            Some(total) => {
                *total = clamp_roll(*total as i64 + delta as i64);
                events.push(GameEvent::RollModified {
                    player: actor,
                    delta,
                    total: *total,
                });
            }
            None => {
                let p = self.player_mut(actor);
                p.next_roll_modifier += delta;
                events.push(GameEvent::NextRollModified {
                    player: actor,
                    delta,
                    modifier: p.next_roll_modifier,
                });
            }
        }
    }

    /// Re-check a hostile card's target; emits `CardBlocked` when it no longer qualifies
    fn checked_target(
        &self,
        actor: PlayerId,
        card: CardKind,
        target: Option<PlayerId>,
        events: &mut Vec<GameEvent>,
    ) -> Option<PlayerId> {
        let target = target?;
        if self.target_allowed(actor, target, card.effect()) {
            Some(target)
        } else {
            events.push(GameEvent::CardBlocked {
                player: actor,
                card,
                target,
            });
            None
        }
    }

    fn push_back(&mut self, actor: PlayerId, target: PlayerId, steps: u32, events: &mut Vec<GameEvent>) {
        let from = self.players[target as usize].tile;
        let to = from.saturating_sub(steps).max(1);
        self.movement
            .enqueue(target, to, MoveMode::Step, MovePurpose::Forced);
        events.push(GameEvent::PlayerReversed {
            by: actor,
            target,
            steps: from - to,
        });
    }

    fn push_status(&self, player: PlayerId, status: StatusKind, amount: u32, events: &mut Vec<GameEvent>) {
        events.push(GameEvent::StatusGained {
            player,
            status,
            amount,
        });
    }
}
