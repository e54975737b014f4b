//! Pawn movement.
//!
//! A move is planned as a [`MoveRequest`] with a full path and then advanced
//! one tick at a time by whoever animates it. Each tick in step mode enters
//! one tile; a teleport enters its destination in a single tick. The engine
//! reports exactly one finish per request, carrying the purpose the caller
//! attached so the coordinator knows what to do next.

use crate::board::TileId;
use crate::player::PlayerId;
use crate::tiles::LandingId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Identifier of a move request
pub type MoveId = u64;

/// How a pawn travels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveMode {
    /// Visit every tile between start and target
    Step,
    /// Jump directly to the target
    Teleport,
}

/// Why a pawn is moving; decides what happens when it stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovePurpose {
    /// The current player's own roll
    Turn { bounce_to: Option<TileId> },
    /// A teleport or forced advance inside tile resolution
    Resolution {
        landing: LandingId,
        bounce_to: Option<TileId>,
    },
    /// Pushed, pulled or swapped by a card or a reverse; no landing effects
    Forced,
}

/// A planned pawn movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub id: MoveId,
    pub player: PlayerId,
    pub from: TileId,
    pub to: TileId,
    pub mode: MoveMode,
    /// Tiles entered in order; the last entry is `to`
    pub path: Vec<TileId>,
}

impl MoveRequest {
    /// Tiles visited going from `from` to `to` one at a time
    pub fn step_path(from: TileId, to: TileId) -> Vec<TileId> {
        if to > from {
            (from + 1..=to).collect()
        } else if to < from {
            (to..from).rev().collect()
        } else {
            Vec::new()
        }
    }
}

/// Result of one movement tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveTick {
    pub request: MoveId,
    pub player: PlayerId,
    /// Tile entered by this tick, if any
    pub entered: Option<TileId>,
    /// Set when this tick finished the request
    pub finished: Option<FinishedMove>,
}

/// A completed movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishedMove {
    pub request: MoveId,
    pub player: PlayerId,
    pub final_tile: TileId,
    pub purpose: MovePurpose,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PlannedMove {
    player: PlayerId,
    to: TileId,
    mode: MoveMode,
    purpose: MovePurpose,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ActiveMove {
    request: MoveRequest,
    cursor: usize,
    purpose: MovePurpose,
}

/// Plans and advances pawn movements, strictly one at a time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovementEngine {
    next_id: MoveId,
    active: Option<ActiveMove>,
    queued: VecDeque<PlannedMove>,
}

impl MovementEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a forward move of `steps` from `from` into the tile reached
    /// first and the bounce-back destination, if the move overshoots `finish`.
    pub fn forward_target(from: TileId, steps: u32, finish: TileId) -> (TileId, Option<TileId>) {
        let target = from.saturating_add(steps);
        if target > finish {
            let overshoot = target - finish;
            (finish, Some(finish.saturating_sub(overshoot).max(1)))
        } else {
            (target, None)
        }
    }

    /// Queue a movement; it starts once every earlier one has finished
    pub fn enqueue(&mut self, player: PlayerId, to: TileId, mode: MoveMode, purpose: MovePurpose) {
        self.queued.push_back(PlannedMove {
            player,
            to,
            mode,
            purpose,
        });
    }

    /// Start the next queued movement if nothing is in flight. `position`
    /// gives the current tile of a player.
    pub fn start_next(&mut self, position: impl Fn(PlayerId) -> TileId) -> Option<MoveRequest> {
        if self.active.is_some() {
            return None;
        }
        let planned = self.queued.pop_front()?;
        let from = position(planned.player);

        let path = match planned.mode {
            MoveMode::Step => MoveRequest::step_path(from, planned.to),
            MoveMode::Teleport if from == planned.to => Vec::new(),
            MoveMode::Teleport => vec![planned.to],
        };

        self.next_id += 1;
        let request = MoveRequest {
            id: self.next_id,
            player: planned.player,
            from,
            to: planned.to,
            mode: planned.mode,
            path,
        };

        self.active = Some(ActiveMove {
            request: request.clone(),
            cursor: 0,
            purpose: planned.purpose,
        });
        Some(request)
    }

    /// Advance the movement in flight by one tile
    pub fn tick(&mut self) -> Option<MoveTick> {
        let active = self.active.as_mut()?;

        let entered = active.request.path.get(active.cursor).copied();
        if entered.is_some() {
            active.cursor += 1;
        }

        let request = active.request.id;
        let player = active.request.player;

        let finished = if active.cursor >= active.request.path.len() {
            let done = self.active.take()?;
            Some(FinishedMove {
                request,
                player,
                final_tile: done.request.to,
                purpose: done.purpose,
            })
        } else {
            None
        };

        Some(MoveTick {
            request,
            player,
            entered,
            finished,
        })
    }

    /// The movement in flight
    pub fn current(&self) -> Option<&MoveRequest> {
        self.active.as_ref().map(|a| &a.request)
    }

    /// A movement is in flight
    pub fn is_moving(&self) -> bool {
        self.active.is_some()
    }

    /// Nothing in flight and nothing queued
    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.queued.is_empty()
    }

    /// Drop everything, used on restart
    pub fn clear(&mut self) {
        self.active = None;
        self.queued.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_path_forward_and_backward() {
        assert_eq!(MoveRequest::step_path(3, 6), vec![4, 5, 6]);
        assert_eq!(MoveRequest::step_path(6, 3), vec![5, 4, 3]);
        assert!(MoveRequest::step_path(4, 4).is_empty());
    }

    #[test]
    fn test_forward_target_bounces() {
        assert_eq!(MovementEngine::forward_target(95, 5, 100), (100, None));
        assert_eq!(MovementEngine::forward_target(98, 5, 100), (100, Some(97)));
        assert_eq!(MovementEngine::forward_target(10, 4, 100), (14, None));
        assert_eq!(MovementEngine::forward_target(3, 30, 10), (10, Some(1)));
    }

    #[test]
    fn test_step_move_ticks_once_per_tile() {
        let mut engine = MovementEngine::new();
        engine.enqueue(0, 4, MoveMode::Step, MovePurpose::Forced);
        let request = engine.start_next(|_| 1).unwrap();
        assert_eq!(request.path, vec![2, 3, 4]);

        let first = engine.tick().unwrap();
        assert_eq!(first.entered, Some(2));
        assert!(first.finished.is_none());
        assert_eq!(engine.tick().unwrap().entered, Some(3));

        let last = engine.tick().unwrap();
        assert_eq!(last.entered, Some(4));
        let finished = last.finished.unwrap();
        assert_eq!(finished.final_tile, 4);
        assert_eq!(finished.request, request.id);

        assert!(engine.tick().is_none());
        assert!(engine.is_idle());
    }

    #[test]
    fn test_teleport_is_one_tick() {
        let mut engine = MovementEngine::new();
        engine.enqueue(1, 6, MoveMode::Teleport, MovePurpose::Forced);
        engine.start_next(|_| 16).unwrap();

        let tick = engine.tick().unwrap();
        assert_eq!(tick.entered, Some(6));
        assert_eq!(tick.finished.unwrap().final_tile, 6);
    }

    #[test]
    fn test_zero_length_move_still_finishes_once() {
        let mut engine = MovementEngine::new();
        engine.enqueue(0, 5, MoveMode::Step, MovePurpose::Forced);
        engine.start_next(|_| 5).unwrap();

        let tick = engine.tick().unwrap();
        assert_eq!(tick.entered, None);
        assert!(tick.finished.is_some());
        assert!(engine.tick().is_none());
    }

    #[test]
    fn test_queue_runs_in_order_with_unique_ids() {
        let mut engine = MovementEngine::new();
        engine.enqueue(0, 2, MoveMode::Teleport, MovePurpose::Forced);
        engine.enqueue(1, 3, MoveMode::Teleport, MovePurpose::Forced);

        let first = engine.start_next(|_| 1).unwrap();
        assert!(engine.start_next(|_| 1).is_none(), "one move at a time");
        engine.tick();
        let second = engine.start_next(|_| 1).unwrap();

        assert_eq!(first.player, 0);
        assert_eq!(second.player, 1);
        assert!(second.id > first.id);
    }
}
