//! Game actions that players can take.
//!
//! This module defines all possible inputs to the turn state machine and
//! the events that result from them.

use crate::board::{TileId, TileKind};
use crate::cards::CardKind;
use crate::combat::DamageSource;
use crate::movement::{MoveId, MoveRequest};
use crate::player::PlayerId;
use crate::tiles::LandingId;
use serde::{Deserialize, Serialize};

/// All possible player inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    // ==================== Rolling ====================
    /// Ask for the dice (start of the turn)
    RollDice,
    /// The dice total for the requested roll
    DeliverRoll(u32),

    // ==================== Cards ====================
    /// Play the card at this hand index
    PlayCard(usize),
    /// Pick an option from the offered draft
    ChooseCard(usize),

    // ==================== Moving ====================
    /// Done with pre-move cards, move on
    ConfirmMove,
    /// Use the roll to move yourself
    MoveSelf,
    /// Use the roll to push an opponent back instead
    ChooseReverse,

    // ==================== Targeting ====================
    /// Pick the target of the pending effect
    ChooseTarget(PlayerId),
    /// Abandon the pending effect
    CancelTarget,

    // ==================== Turn Management ====================
    /// End your turn
    EndTurn,
}

/// Why a draft was offered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DraftOrigin {
    TurnStart,
    Blessing { landing: LandingId },
}

/// Why a card left a hand without being played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscardReason {
    /// Pushed out by a new card on a full hand
    Evicted,
    /// Lost to a nega tile
    NegaTile,
    /// Held for too many cycles
    Expired,
}

/// Why a landing effect did not happen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Immune to every negative effect
    FullImmunity,
    /// Used up a snake immunity charge
    SnakeImmunity,
    /// The effect chain hit its length bound
    ChainLimit,
    /// The boss has already been defeated
    BossDefeated,
}

/// Statuses granted by cards and tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusKind {
    ReverseImmunity,
    SnakeImmunity,
    FullImmunity,
    ExtraDice,
    SkipTurns,
    Defense,
    DrawNextTurn,
    AresProvocation,
    AmaterasuRadiance,
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Turn order was decided by the initial draw
    GameStarted {
        turn_order: Vec<PlayerId>,
        initial_rolls: Vec<(PlayerId, u32)>,
    },

    /// A player's turn began
    TurnStarted { player: PlayerId, cycle: u32 },

    /// A draft is waiting for a pick
    CardChoiceOffered {
        player: PlayerId,
        options: Vec<CardKind>,
        origin: DraftOrigin,
    },

    /// A card entered a hand
    CardDrawn { player: PlayerId, card: CardKind },

    /// A card left a hand without being played
    CardDiscarded {
        player: PlayerId,
        card: CardKind,
        reason: DiscardReason,
    },

    /// A card was played
    CardPlayed {
        player: PlayerId,
        card: CardKind,
        target: Option<PlayerId>,
    },

    /// A card's effect was stopped by immunity
    CardBlocked {
        player: PlayerId,
        card: CardKind,
        target: PlayerId,
    },

    /// Dice were requested
    RollRequested { player: PlayerId, dice: u32 },

    /// Dice were rolled and the banked modifier applied
    DiceRolled {
        player: PlayerId,
        base: u32,
        modifier: i32,
        total: u32,
    },

    /// A bonus die was added to the roll in progress
    BonusRolled {
        player: PlayerId,
        value: u32,
        total: u32,
    },

    /// The roll in progress was changed by a card
    RollModified {
        player: PlayerId,
        delta: i32,
        total: u32,
    },

    /// The banked modifier for the next roll changed
    NextRollModified {
        player: PlayerId,
        delta: i32,
        modifier: i32,
    },

    /// A status counter or flag was granted
    StatusGained {
        player: PlayerId,
        status: StatusKind,
        amount: u32,
    },

    /// The player may reverse an opponent instead of moving
    ReverseOffered {
        player: PlayerId,
        eligible: Vec<PlayerId>,
    },

    /// The player must pick a target
    TargetRequested {
        player: PlayerId,
        card: Option<CardKind>,
        candidates: Vec<PlayerId>,
    },

    /// The pending targeted effect was abandoned
    TargetCancelled { player: PlayerId },

    /// An opponent was pushed back by the roll
    PlayerReversed {
        by: PlayerId,
        target: PlayerId,
        steps: u32,
    },

    /// Two pawns traded places
    PositionsSwapped { first: PlayerId, second: PlayerId },

    /// A pawn started moving
    MovementStarted { request: MoveRequest },

    /// A pawn entered a tile
    PawnMoved {
        request: MoveId,
        player: PlayerId,
        tile: TileId,
    },

    /// A pawn stopped
    MovementFinished {
        request: MoveId,
        player: PlayerId,
        final_tile: TileId,
    },

    /// A pawn settled on a tile and its effect is being resolved
    TileLanded {
        player: PlayerId,
        tile: TileId,
        kind: TileKind,
        landing: LandingId,
    },

    /// A landing effect did not apply
    EffectSkipped {
        player: PlayerId,
        tile: TileId,
        reason: SkipReason,
    },

    /// Damage was dealt (possibly fully blocked)
    DamageTaken {
        player: PlayerId,
        amount: u32,
        dealt: u32,
        hp: u32,
        source: DamageSource,
    },

    /// Hit points were restored
    Healed { player: PlayerId, amount: u32, hp: u32 },

    /// A player ran out of hit points
    PlayerDied { player: PlayerId },

    /// The boss was hit
    BossDamaged { by: PlayerId, amount: u32, hp: u32 },

    /// The boss ran out of hit points
    BossDefeated { by: PlayerId },

    /// Visual tile positions were shuffled
    BoardShuffled,

    /// The player will take another turn
    ExtraTurnGranted { player: PlayerId },

    /// Tile resolution finished
    ResolveComplete { player: PlayerId, landing: LandingId },

    /// A player reached the finish
    PlayerWon { player: PlayerId, rank: u32 },

    /// A player lost a turn
    TurnSkipped { player: PlayerId, remaining: u32 },

    /// Pending skipped turns were cleared by immunity
    SkipCleared { player: PlayerId },

    /// Turn ended
    TurnEnded {
        player: PlayerId,
        next_player: PlayerId,
    },

    /// Turn order wrapped around
    CycleAdvanced { cycle: u32 },

    /// The game is over
    GameOver {
        winners: Vec<PlayerId>,
        /// Knocked-out players, first out first
        eliminated: Vec<PlayerId>,
        loser: Option<PlayerId>,
    },
}
