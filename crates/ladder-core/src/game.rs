//! Core game state machine.
//!
//! This module contains the main `GameState` struct and the turn
//! coordinator: rolling, the card windows, movement hand-off, tile
//! resolution hand-off, turn advance and win/lose bookkeeping.

use crate::actions::{DiscardReason, DraftOrigin, GameAction, GameEvent};
use crate::board::{Board, ConfigError, TileId};
use crate::cards::{CardEffect, CardInstance, CardKind};
use crate::combat::BossState;
use crate::config::{GameConfig, MAX_PLAYERS, MIN_PLAYERS};
use crate::effects::{CardContext, CardOutcome};
use crate::movement::{FinishedMove, MoveMode, MovePurpose, MovementEngine};
use crate::player::{Player, PlayerId};
use crate::tiles::TileEffectResolver;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Turn phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    /// A turn is being set up (may wait on a start-of-turn draft)
    StartTurn,

    /// Waiting for the player to ask for the dice
    PreRoll,

    /// Dice requested, waiting for the result
    WaitingForRoll {
        /// Dice thrown
        dice: u32,
        /// Bonus roll added to the roll in progress
        bonus: bool,
    },

    /// Roll known; cards may modify it before moving
    PreMovePlay,

    /// Deciding how the roll is used (may wait on the reverse choice)
    CalculatingMove,

    /// The player's own pawn is moving
    Moving,

    /// Landing effects are being resolved
    ResolveTile,

    /// Pawn has settled; second card window
    PostMovePlay,

    /// Turn is being handed to the next player
    EndTurn,

    /// Game is over
    GameOver {
        /// Last player left without finishing, if any
        loser: Option<PlayerId>,
    },
}

/// What the targeting prompt is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetPurpose {
    /// Reverse an opponent with the roll
    Reverse,
    /// A targeted card still in hand
    Card { hand_index: usize, card: CardKind },
}

/// An interactive choice blocking the state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingChoice {
    /// Pick one card from a draft
    Draft {
        options: Vec<CardKind>,
        origin: DraftOrigin,
    },
    /// Move yourself or reverse an opponent
    ReverseOrMove { eligible: Vec<PlayerId> },
    /// Pick a target
    Target {
        purpose: TargetPurpose,
        candidates: Vec<PlayerId>,
    },
}

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Not your turn")]
    NotYourTurn,

    #[error("Invalid action for current phase")]
    InvalidTransition,

    #[error("Roll total {0} is impossible for the requested dice")]
    InvalidRoll(u32),

    #[error("Invalid target")]
    InvalidTarget,

    #[error("No valid targets")]
    NoValidTargets,

    #[error("Don't have that card")]
    NoSuchCard,

    #[error("No such option")]
    InvalidChoice,

    #[error("Card play limit reached for this turn")]
    CardLimitReached,

    #[error("A pawn is still moving")]
    MovementInProgress,

    #[error("No pawn is moving")]
    NoMovement,

    #[error("Game is over")]
    GameOver,
}

/// Turn bookkeeping shared by the whole game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnSession {
    /// Seat order, fixed after the initial draw
    pub turn_order: Vec<PlayerId>,
    /// Index into `turn_order` of the current player
    pub current_index: usize,
    /// Completed rotations through the turn order
    pub current_cycle: u32,
    /// Current phase
    pub phase: TurnPhase,
    /// Finishers in arrival order
    pub winners: Vec<PlayerId>,
    /// Knocked-out players in elimination order
    pub eliminated: Vec<PlayerId>,
    /// Interactive choice blocking the turn
    pub pending_choice: Option<PendingChoice>,
    /// Roll in progress for the current turn
    pub pending_roll: Option<u32>,
    /// Cards played this turn, across both windows
    pub cards_played: u32,
    /// Initial draw results
    pub initial_rolls: Vec<(PlayerId, u32)>,
    /// `start` has run
    pub started: bool,
}

impl TurnSession {
    fn new() -> Self {
        Self {
            turn_order: Vec::new(),
            current_index: 0,
            current_cycle: 0,
            phase: TurnPhase::StartTurn,
            winners: Vec::new(),
            eliminated: Vec::new(),
            pending_choice: None,
            pending_roll: None,
            cards_played: 0,
            initial_rolls: Vec::new(),
            started: false,
        }
    }
}

/// The complete game state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Settings the game was created with
    pub config: GameConfig,
    /// The game board
    pub board: Board,
    /// All players, indexed by id
    pub players: Vec<Player>,
    /// Turn bookkeeping
    pub session: TurnSession,
    /// Boss of the boss sub-mode
    pub boss: Option<BossState>,
    pub(crate) movement: MovementEngine,
    pub(crate) resolver: TileEffectResolver,
    pub(crate) rng: ChaCha8Rng,
}

impl GameState {
    /// Create a new game. The board is validated and the turn order drawn;
    /// call [`GameState::start`] to begin the first turn.
    pub fn new(config: GameConfig, player_names: Vec<String>) -> Result<Self, ConfigError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&player_names.len()) {
            return Err(ConfigError::PlayerCount {
                min: MIN_PLAYERS,
                max: MAX_PLAYERS,
            });
        }
        config.validate()?;
        let board = Board::from_config(&config.board)?;

        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        let players = player_names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Player::new(i as PlayerId, name, config.max_hp))
            .collect();

        let mut state = Self {
            boss: config.boss.as_ref().map(BossState::from_config),
            config,
            board,
            players,
            session: TurnSession::new(),
            movement: MovementEngine::new(),
            resolver: TileEffectResolver::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        };
        state.draw_turn_order();
        Ok(state)
    }

    /// Create a game on the standard board with default settings
    pub fn with_players(player_names: Vec<String>) -> Result<Self, ConfigError> {
        Self::new(GameConfig::default(), player_names)
    }

    /// Begin the first turn
    pub fn start(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.session.started {
            warn!("game already started");
            return events;
        }
        self.session.started = true;

        info!(order = ?self.session.turn_order, "game started");
        events.push(GameEvent::GameStarted {
            turn_order: self.session.turn_order.clone(),
            initial_rolls: self.session.initial_rolls.clone(),
        });
        self.start_turn(&mut events);
        events
    }

    /// Reinitialize players, board and turn bookkeeping and start again
    pub fn restart(&mut self) -> Result<Vec<GameEvent>, ConfigError> {
        self.board = Board::from_config(&self.config.board)?;
        let max_hp = self.config.max_hp;
        for player in &mut self.players {
            *player = Player::new(player.id, player.name.clone(), max_hp);
        }
        self.boss = self.config.boss.as_ref().map(BossState::from_config);
        self.session = TurnSession::new();
        self.movement.clear();
        self.resolver = TileEffectResolver::new();
        self.draw_turn_order();
        Ok(self.start())
    }

    /// Every player rolls one die; highest goes first, ties by seat
    fn draw_turn_order(&mut self) {
        let faces = self.config.die_faces;
        let mut rolls: Vec<(PlayerId, u32)> = self
            .players
            .iter()
            .map(|p| (p.id, self.rng.gen_range(1..=faces)))
            .collect();
        self.session.initial_rolls = rolls.clone();
        rolls.sort_by_key(|&(id, roll)| (Reverse(roll), id));
        self.session.turn_order = rolls.into_iter().map(|(id, _)| id).collect();
        self.session.current_index = 0;
    }

    /// Get the number of players
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Get a player by ID
    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id as usize)
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> &mut Player {
        &mut self.players[id as usize]
    }

    /// The player whose turn it is
    pub fn current_player(&self) -> PlayerId {
        self.session
            .turn_order
            .get(self.session.current_index)
            .copied()
            .unwrap_or(0)
    }

    /// Current phase
    pub fn phase(&self) -> &TurnPhase {
        &self.session.phase
    }

    /// Check if the game is finished
    pub fn is_finished(&self) -> bool {
        matches!(self.session.phase, TurnPhase::GameOver { .. })
    }

    /// Finishers in arrival order
    pub fn winners(&self) -> &[PlayerId] {
        &self.session.winners
    }

    /// The loser, once the game is over
    pub fn loser(&self) -> Option<PlayerId> {
        match self.session.phase {
            TurnPhase::GameOver { loser } => loser,
            _ => None,
        }
    }

    /// The movement in flight, if any
    pub fn current_move(&self) -> Option<&crate::movement::MoveRequest> {
        self.movement.current()
    }

    /// Whether a pawn is moving or about to
    pub fn is_movement_pending(&self) -> bool {
        !self.movement.is_idle()
    }

    /// Players that can be reversed by `actor`
    pub fn reverse_candidates(&self, actor: PlayerId) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|p| p.id != actor && p.can_be_reversed())
            .map(|p| p.id)
            .collect()
    }

    /// Whether `target` may be hit by `effect` from `actor` right now
    pub fn target_allowed(&self, actor: PlayerId, target: PlayerId, effect: CardEffect) -> bool {
        let (Some(a), Some(t)) = (self.get_player(actor), self.get_player(target)) else {
            return false;
        };
        if actor == target || !t.is_active() || t.is_immune_to_negative() {
            return false;
        }
        match effect {
            CardEffect::PushBack | CardEffect::PushBackNearestAhead | CardEffect::PushBackRow => {
                t.tile > 1 && t.immune_reverse_cycles == 0
            }
            CardEffect::Swap => t.tile != a.tile,
            _ => true,
        }
    }

    /// Players a chosen-target card can be aimed at
    pub fn card_candidates(&self, actor: PlayerId, effect: CardEffect) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|p| self.target_allowed(actor, p.id, effect))
            .map(|p| p.id)
            .collect()
    }

    /// Closest active opponent strictly ahead of `actor`; ties go to the lower seat
    pub fn nearest_ahead(&self, actor: PlayerId) -> Option<PlayerId> {
        let from = self.get_player(actor)?.tile;
        self.players
            .iter()
            .filter(|p| p.id != actor && p.is_active() && p.tile > from)
            .min_by_key(|p| (p.tile - from, p.id))
            .map(|p| p.id)
    }

    /// Active opponents on the same row as `actor`
    pub fn row_opponents(&self, actor: PlayerId) -> Vec<PlayerId> {
        let Some(a) = self.get_player(actor) else {
            return Vec::new();
        };
        let row = self.board.row_of(a.tile);
        self.players
            .iter()
            .filter(|p| p.id != actor && p.is_active() && self.board.row_of(p.tile) == row)
            .map(|p| p.id)
            .collect()
    }

    /// Get all currently valid actions for a player
    pub fn valid_actions(&self, player: PlayerId) -> Vec<GameAction> {
        let mut actions = Vec::new();

        if self.is_finished()
            || !self.session.started
            || player != self.current_player()
            || !self.movement.is_idle()
        {
            return actions;
        }

        match &self.session.pending_choice {
            Some(PendingChoice::Draft { options, .. }) => {
                actions.extend((0..options.len()).map(GameAction::ChooseCard));
                return actions;
            }
            Some(PendingChoice::ReverseOrMove { .. }) => {
                actions.push(GameAction::MoveSelf);
                actions.push(GameAction::ChooseReverse);
                return actions;
            }
            Some(PendingChoice::Target { candidates, .. }) => {
                actions.extend(candidates.iter().copied().map(GameAction::ChooseTarget));
                actions.push(GameAction::CancelTarget);
                return actions;
            }
            None => {}
        }

        match self.session.phase {
            TurnPhase::PreRoll => actions.push(GameAction::RollDice),
            TurnPhase::PreMovePlay => {
                actions.push(GameAction::ConfirmMove);
                actions.extend(self.playable_cards(player));
            }
            TurnPhase::PostMovePlay => {
                actions.push(GameAction::EndTurn);
                actions.extend(self.playable_cards(player));
            }
            _ => {}
        }

        actions
    }

    fn playable_cards(&self, player: PlayerId) -> Vec<GameAction> {
        if self.session.cards_played >= self.config.max_cards_per_turn {
            return Vec::new();
        }
        let Some(p) = self.get_player(player) else {
            return Vec::new();
        };
        p.hand
            .iter()
            .enumerate()
            .filter(|(_, card)| self.card_has_targets(player, card.kind.effect()))
            .map(|(i, _)| GameAction::PlayCard(i))
            .collect()
    }

    fn card_has_targets(&self, actor: PlayerId, effect: CardEffect) -> bool {
        match effect {
            e if e.needs_chosen_target() => !self.card_candidates(actor, e).is_empty(),
            CardEffect::PushBackNearestAhead => self.auto_target(actor).is_some(),
            CardEffect::PushBackRow => self
                .row_opponents(actor)
                .into_iter()
                .any(|t| self.target_allowed(actor, t, effect)),
            _ => true,
        }
    }

    /// Nearest opponent ahead, if the push could land on them
    fn auto_target(&self, actor: PlayerId) -> Option<PlayerId> {
        self.nearest_ahead(actor)
            .filter(|&t| self.target_allowed(actor, t, CardEffect::PushBackNearestAhead))
    }

    /// Apply an action to the game state.
    ///
    /// Rejected actions leave the state untouched and are logged.
    pub fn apply_action(
        &mut self,
        player: PlayerId,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        let result = self.dispatch(player, action);
        if let Err(err) = &result {
            warn!(player, ?action, phase = ?self.session.phase, %err, "action rejected");
        }
        result
    }

    fn dispatch(
        &mut self,
        player: PlayerId,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        if self.is_finished() {
            return Err(GameError::GameOver);
        }
        if !self.session.started {
            return Err(GameError::InvalidTransition);
        }
        if player != self.current_player() {
            return Err(GameError::NotYourTurn);
        }
        if !self.movement.is_idle() {
            return Err(GameError::MovementInProgress);
        }

        let mut events = Vec::new();

        match action {
            // ==================== Rolling ====================
            GameAction::RollDice => {
                self.require_phase(|p| matches!(p, TurnPhase::PreRoll))?;

                let p = self.player_mut(player);
                let dice = 1 + p.extra_dice_rolls;
                p.extra_dice_rolls = 0;

                self.session.phase = TurnPhase::WaitingForRoll { dice, bonus: false };
                events.push(GameEvent::RollRequested { player, dice });
            }

            GameAction::DeliverRoll(value) => {
                let TurnPhase::WaitingForRoll { dice, bonus } = self.session.phase else {
                    return Err(GameError::InvalidTransition);
                };
                if self.session.pending_choice.is_some() {
                    return Err(GameError::InvalidTransition);
                }
                if value < dice || value > dice * self.config.die_faces {
                    return Err(GameError::InvalidRoll(value));
                }

                if bonus {
                    let total = self.session.pending_roll.unwrap_or(1).saturating_add(value).max(1);
                    self.session.pending_roll = Some(total);
                    events.push(GameEvent::BonusRolled {
                        player,
                        value,
                        total,
                    });
                } else {
                    let p = self.player_mut(player);
                    let modifier = p.next_roll_modifier;
                    p.next_roll_modifier = 0;
                    let total = clamp_roll(value as i64 + modifier as i64);
                    self.session.pending_roll = Some(total);
                    debug!(player, base = value, modifier, total, "roll adjusted");
                    events.push(GameEvent::DiceRolled {
                        player,
                        base: value,
                        modifier,
                        total,
                    });
                }
                self.session.phase = TurnPhase::PreMovePlay;
            }

            // ==================== Cards ====================
            GameAction::PlayCard(index) => {
                self.play_card(player, index, &mut events)?;
            }

            GameAction::ChooseCard(index) => {
                let Some(PendingChoice::Draft { options, origin }) = &self.session.pending_choice
                else {
                    return Err(GameError::InvalidTransition);
                };
                let card = *options.get(index).ok_or(GameError::InvalidChoice)?;
                let origin = *origin;
                self.session.pending_choice = None;

                self.give_card(player, card, &mut events);

                match origin {
                    DraftOrigin::TurnStart => self.enter_pre_roll(),
                    DraftOrigin::Blessing { landing } => {
                        self.resolver.mark_settled(landing);
                        self.complete_resolution(landing, &mut events);
                    }
                }
            }

            // ==================== Moving ====================
            GameAction::ConfirmMove => {
                self.require_phase(|p| matches!(p, TurnPhase::PreMovePlay))?;

                let roll = self.session.pending_roll.unwrap_or(1).max(1);
                self.session.pending_roll = Some(roll);
                self.session.phase = TurnPhase::CalculatingMove;

                let eligible = if self.config.reverse_enabled {
                    self.reverse_candidates(player)
                } else {
                    Vec::new()
                };

                if eligible.is_empty() {
                    self.move_self(player, &mut events);
                } else {
                    events.push(GameEvent::ReverseOffered {
                        player,
                        eligible: eligible.clone(),
                    });
                    self.session.pending_choice = Some(PendingChoice::ReverseOrMove { eligible });
                }
            }

            GameAction::MoveSelf => {
                if !matches!(
                    self.session.pending_choice,
                    Some(PendingChoice::ReverseOrMove { .. })
                ) {
                    return Err(GameError::InvalidTransition);
                }
                self.session.pending_choice = None;
                self.move_self(player, &mut events);
            }

            GameAction::ChooseReverse => {
                let Some(PendingChoice::ReverseOrMove { eligible }) = &self.session.pending_choice
                else {
                    return Err(GameError::InvalidTransition);
                };
                let candidates = eligible.clone();
                events.push(GameEvent::TargetRequested {
                    player,
                    card: None,
                    candidates: candidates.clone(),
                });
                self.session.pending_choice = Some(PendingChoice::Target {
                    purpose: TargetPurpose::Reverse,
                    candidates,
                });
            }

            // ==================== Targeting ====================
            GameAction::ChooseTarget(target) => {
                let Some(PendingChoice::Target {
                    purpose,
                    candidates,
                }) = &self.session.pending_choice
                else {
                    return Err(GameError::InvalidTransition);
                };
                if !candidates.contains(&target) {
                    return Err(GameError::InvalidTarget);
                }
                let purpose = *purpose;

                match purpose {
                    TargetPurpose::Reverse => {
                        if !self.players[target as usize].can_be_reversed() {
                            return Err(GameError::InvalidTarget);
                        }
                        self.session.pending_choice = None;
                        self.reverse_opponent(player, target, &mut events);
                    }
                    TargetPurpose::Card { hand_index, card } => {
                        let held = self.players[player as usize].hand.get(hand_index);
                        if held.map(|c| c.kind) != Some(card) {
                            return Err(GameError::NoSuchCard);
                        }
                        self.session.pending_choice = None;
                        self.consume_and_apply(player, hand_index, Some(target), &mut events);
                    }
                }
            }

            GameAction::CancelTarget => {
                let Some(PendingChoice::Target { purpose, .. }) = &self.session.pending_choice
                else {
                    return Err(GameError::InvalidTransition);
                };

                // Cancelling is free: no card or play slot is spent and the
                // turn returns to where the prompt was opened.
                self.session.pending_choice = match purpose {
                    TargetPurpose::Reverse => Some(PendingChoice::ReverseOrMove {
                        eligible: self.reverse_candidates(player),
                    }),
                    TargetPurpose::Card { .. } => None,
                };
                events.push(GameEvent::TargetCancelled { player });
            }

            // ==================== Turn Management ====================
            GameAction::EndTurn => {
                self.require_phase(|p| matches!(p, TurnPhase::PostMovePlay))?;
                self.finish_turn(&mut events);
            }
        }

        self.pump_movement(&mut events);
        Ok(events)
    }

    fn require_phase(&self, allowed: impl Fn(&TurnPhase) -> bool) -> Result<(), GameError> {
        if self.session.pending_choice.is_some() || !allowed(&self.session.phase) {
            return Err(GameError::InvalidTransition);
        }
        Ok(())
    }

    /// Advance the movement in flight by one tile. Called by whoever animates
    /// the pawns; a headless session calls it until movement settles.
    pub fn advance_movement(&mut self) -> Result<Vec<GameEvent>, GameError> {
        let mut events = Vec::new();
        let tick = self.movement.tick().ok_or(GameError::NoMovement)?;

        if let Some(tile) = tick.entered {
            self.player_mut(tick.player).tile = tile;
            events.push(GameEvent::PawnMoved {
                request: tick.request,
                player: tick.player,
                tile,
            });
        }

        if let Some(finished) = tick.finished {
            events.push(GameEvent::MovementFinished {
                request: finished.request,
                player: finished.player,
                final_tile: finished.final_tile,
            });
            self.on_move_finished(finished, &mut events);
        }

        self.pump_movement(&mut events);
        Ok(events)
    }

    /// Start the next queued movement, or react to movement having settled
    pub(crate) fn pump_movement(&mut self, events: &mut Vec<GameEvent>) {
        if self.movement.is_moving() {
            return;
        }

        let players = &self.players;
        if let Some(request) = self
            .movement
            .start_next(|id| players.get(id as usize).map_or(1, |p| p.tile))
        {
            debug!(id = request.id, player = request.player, from = request.from, to = request.to, mode = ?request.mode, "movement started");
            events.push(GameEvent::MovementStarted { request });
            return;
        }

        // Forced moves from a reverse settle the turn's move
        if self.session.phase == TurnPhase::CalculatingMove
            && self.session.pending_choice.is_none()
            && self.session.pending_roll.is_none()
        {
            self.enter_post_move();
        }
    }

    fn on_move_finished(&mut self, finished: FinishedMove, events: &mut Vec<GameEvent>) {
        let finish = self.board.finish();

        match finished.purpose {
            MovePurpose::Turn {
                bounce_to: Some(back),
            } => {
                self.movement.enqueue(
                    finished.player,
                    back,
                    MoveMode::Step,
                    MovePurpose::Turn { bounce_to: None },
                );
            }
            MovePurpose::Turn { bounce_to: None } => {
                if finished.final_tile == finish {
                    self.declare_winner(finished.player, events);
                    self.finish_turn(events);
                } else {
                    self.session.phase = TurnPhase::ResolveTile;
                    self.begin_resolution(finished.player, events);
                }
            }
            MovePurpose::Resolution {
                landing,
                bounce_to: Some(back),
            } => {
                self.movement.enqueue(
                    finished.player,
                    back,
                    MoveMode::Step,
                    MovePurpose::Resolution {
                        landing,
                        bounce_to: None,
                    },
                );
            }
            MovePurpose::Resolution {
                landing,
                bounce_to: None,
            } => {
                self.on_resolution_move_finished(landing, finished.final_tile, events);
            }
            MovePurpose::Forced => {}
        }
    }

    fn move_self(&mut self, player: PlayerId, events: &mut Vec<GameEvent>) {
        let roll = self.session.pending_roll.take().unwrap_or(1).max(1);
        let from = self.players[player as usize].tile;
        let (first, bounce_to) = MovementEngine::forward_target(from, roll, self.board.finish());

        debug!(player, from, roll, first, ?bounce_to, "moving");
        self.session.phase = TurnPhase::Moving;
        self.movement
            .enqueue(player, first, MoveMode::Step, MovePurpose::Turn { bounce_to });
        self.pump_movement(events);
    }

    fn reverse_opponent(&mut self, player: PlayerId, target: PlayerId, events: &mut Vec<GameEvent>) {
        let steps = self.session.pending_roll.take().unwrap_or(1).max(1);
        let t = self.player_mut(target);
        t.was_reversed_this_cycle = true;
        let back_to = t.tile.saturating_sub(steps).max(1);

        info!(player, target, steps, "reverse");
        events.push(GameEvent::PlayerReversed {
            by: player,
            target,
            steps,
        });
        self.movement
            .enqueue(target, back_to, MoveMode::Step, MovePurpose::Forced);
    }

    fn play_card(
        &mut self,
        player: PlayerId,
        index: usize,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        self.require_phase(|p| matches!(p, TurnPhase::PreMovePlay | TurnPhase::PostMovePlay))?;
        if self.session.cards_played >= self.config.max_cards_per_turn {
            return Err(GameError::CardLimitReached);
        }
        let card = self.players[player as usize]
            .hand
            .get(index)
            .copied()
            .ok_or(GameError::NoSuchCard)?;
        let effect = card.kind.effect();

        if effect.needs_chosen_target() {
            let candidates = self.card_candidates(player, effect);
            if candidates.is_empty() {
                return Err(GameError::NoValidTargets);
            }
            events.push(GameEvent::TargetRequested {
                player,
                card: Some(card.kind),
                candidates: candidates.clone(),
            });
            self.session.pending_choice = Some(PendingChoice::Target {
                purpose: TargetPurpose::Card {
                    hand_index: index,
                    card: card.kind,
                },
                candidates,
            });
            return Ok(());
        }

        let target = match effect {
            CardEffect::PushBackNearestAhead => {
                Some(self.auto_target(player).ok_or(GameError::NoValidTargets)?)
            }
            CardEffect::PushBackRow if !self.card_has_targets(player, effect) => {
                return Err(GameError::NoValidTargets);
            }
            _ => None,
        };

        self.consume_and_apply(player, index, target, events);
        Ok(())
    }

    /// Take the card out of the hand, spend a play slot and apply it
    fn consume_and_apply(
        &mut self,
        player: PlayerId,
        index: usize,
        target: Option<PlayerId>,
        events: &mut Vec<GameEvent>,
    ) {
        let Some(card) = self.player_mut(player).hand.remove(index) else {
            return;
        };
        self.session.cards_played += 1;
        events.push(GameEvent::CardPlayed {
            player,
            card: card.kind,
            target,
        });

        let pre_move = self.session.phase == TurnPhase::PreMovePlay;
        let mut roll = if pre_move {
            self.session.pending_roll.take()
        } else {
            None
        };

        let outcome = self.apply_card(
            player,
            card.kind,
            CardContext {
                roll: roll.as_mut(),
                target,
            },
            events,
        );

        if pre_move {
            self.session.pending_roll = roll;
        }

        if let CardOutcome::BonusRoll { dice } = outcome {
            self.session.phase = TurnPhase::WaitingForRoll { dice, bonus: true };
            events.push(GameEvent::RollRequested { player, dice });
        }
    }

    /// Put a card in a hand, evicting the oldest one if the hand is full
    pub(crate) fn give_card(&mut self, player: PlayerId, card: CardKind, events: &mut Vec<GameEvent>) {
        let cycle = self.session.current_cycle;
        let limit = self.config.hand_limit;
        let evicted = self
            .player_mut(player)
            .hand
            .add(CardInstance::new(card, cycle), limit);

        if let Some(old) = evicted {
            events.push(GameEvent::CardDiscarded {
                player,
                card: old.kind,
                reason: DiscardReason::Evicted,
            });
        }
        events.push(GameEvent::CardDrawn { player, card });
    }

    /// Offer a draft. Returns false when there was nothing to offer.
    pub(crate) fn offer_draft(
        &mut self,
        player: PlayerId,
        origin: DraftOrigin,
        events: &mut Vec<GameEvent>,
    ) -> bool {
        let options = CardKind::draft(&mut self.rng, self.config.draft_size);
        if options.is_empty() {
            return false;
        }
        events.push(GameEvent::CardChoiceOffered {
            player,
            options: options.clone(),
            origin,
        });
        self.session.pending_choice = Some(PendingChoice::Draft { options, origin });
        true
    }

    fn start_turn(&mut self, events: &mut Vec<GameEvent>) {
        let player = self.current_player();
        self.session.phase = TurnPhase::StartTurn;
        self.session.cards_played = 0;
        self.session.pending_roll = None;
        self.session.pending_choice = None;

        info!(player, cycle = self.session.current_cycle, "turn started");
        events.push(GameEvent::TurnStarted {
            player,
            cycle: self.session.current_cycle,
        });

        let p = self.player_mut(player);
        let wants_draft = p.draw_card_next_turn;
        p.draw_card_next_turn = false;

        if (wants_draft || self.config.draft_every_turn)
            && self.offer_draft(player, DraftOrigin::TurnStart, events)
        {
            return;
        }
        self.enter_pre_roll();
    }

    fn enter_pre_roll(&mut self) {
        self.session.phase = TurnPhase::PreRoll;
    }

    fn enter_post_move(&mut self) {
        self.session.phase = TurnPhase::PostMovePlay;
    }

    /// Tile resolution has finished for the current player
    pub(crate) fn after_resolution(&mut self, events: &mut Vec<GameEvent>) {
        if self.is_finished() {
            return;
        }
        if self.players[self.current_player() as usize].is_active() {
            self.enter_post_move();
        } else {
            self.finish_turn(events);
        }
    }

    pub(crate) fn declare_winner(&mut self, player: PlayerId, events: &mut Vec<GameEvent>) {
        let p = self.player_mut(player);
        if p.has_won {
            return;
        }
        p.has_won = true;
        p.gets_extra_turn = false;
        self.session.winners.push(player);
        let rank = self.session.winners.len() as u32;

        info!(player, rank, "player finished");
        events.push(GameEvent::PlayerWon { player, rank });
    }

    /// Knocked-out players, first out first
    pub fn eliminated(&self) -> &[PlayerId] {
        &self.session.eliminated
    }

    fn record_eliminations(&mut self) {
        for p in &self.players {
            if p.is_eliminated && !self.session.eliminated.contains(&p.id) {
                self.session.eliminated.push(p.id);
            }
        }
    }

    /// End the game when at most one player is still racing. Knocked-out
    /// players rank below anyone still on the board, so the first one out
    /// is the loser; otherwise the last racer is.
    fn check_game_over(&mut self, events: &mut Vec<GameEvent>) -> bool {
        if self.is_finished() {
            return true;
        }
        self.record_eliminations();
        let remaining: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|p| p.is_active())
            .map(|p| p.id)
            .collect();
        if remaining.len() > 1 {
            return false;
        }

        let loser = self
            .session
            .eliminated
            .first()
            .or(remaining.first())
            .copied();
        self.session.phase = TurnPhase::GameOver { loser };
        self.session.pending_choice = None;
        self.session.pending_roll = None;

        info!(winners = ?self.session.winners, eliminated = ?self.session.eliminated, ?loser, "game over");
        events.push(GameEvent::GameOver {
            winners: self.session.winners.clone(),
            eliminated: self.session.eliminated.clone(),
            loser,
        });
        true
    }

    fn finish_turn(&mut self, events: &mut Vec<GameEvent>) {
        let player = self.current_player();
        self.session.phase = TurnPhase::EndTurn;
        self.session.pending_choice = None;
        self.session.pending_roll = None;

        if self.check_game_over(events) {
            return;
        }

        let p = self.player_mut(player);
        if p.is_active() && p.gets_extra_turn {
            p.gets_extra_turn = false;
            events.push(GameEvent::TurnEnded {
                player,
                next_player: player,
            });
            self.start_turn(events);
            return;
        }

        let mut advance_events = Vec::new();
        let next_player = self.advance_to_next(&mut advance_events);
        events.push(GameEvent::TurnEnded {
            player,
            next_player,
        });
        events.extend(advance_events);
        self.start_turn(events);
    }

    /// Move `current_index` to the next player who gets a turn
    fn advance_to_next(&mut self, events: &mut Vec<GameEvent>) -> PlayerId {
        let len = self.session.turn_order.len();
        loop {
            self.session.current_index += 1;
            if self.session.current_index >= len {
                self.session.current_index = 0;
                self.begin_cycle(events);
            }

            let id = self.session.turn_order[self.session.current_index];
            let p = self.player_mut(id);
            if !p.is_active() {
                continue;
            }
            if p.skip_turns > 0 {
                if p.is_immune_to_negative() {
                    p.skip_turns = 0;
                    events.push(GameEvent::SkipCleared { player: id });
                } else {
                    p.skip_turns -= 1;
                    let remaining = p.skip_turns;
                    debug!(player = id, remaining, "turn skipped");
                    events.push(GameEvent::TurnSkipped {
                        player: id,
                        remaining,
                    });
                    continue;
                }
            }
            return id;
        }
    }

    fn begin_cycle(&mut self, events: &mut Vec<GameEvent>) {
        self.session.current_cycle += 1;
        let cycle = self.session.current_cycle;
        debug!(cycle, "cycle advanced");
        events.push(GameEvent::CycleAdvanced { cycle });

        for player in self.players.iter_mut().filter(|p| p.is_active()) {
            for card in player.begin_cycle(cycle) {
                events.push(GameEvent::CardDiscarded {
                    player: player.id,
                    card: card.kind,
                    reason: DiscardReason::Expired,
                });
            }
        }
    }

    /// Tile a player currently stands on
    pub fn tile_of(&self, player: PlayerId) -> Option<TileId> {
        self.get_player(player).map(|p| p.tile)
    }
}

/// Rolls never go below 1
pub(crate) fn clamp_roll(value: i64) -> u32 {
    value.clamp(1, u32::MAX as i64) as u32
}
