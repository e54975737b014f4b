//! Ladder - a Snakes & Ladders style board game engine
//!
//! This crate provides the core game logic, including:
//! - Board layout with snakes, ladders and special tiles
//! - Player state, hands and status counters
//! - A turn state machine with card play windows and a reverse option
//! - Tick-driven pawn movement and guarded tile effect resolution
//!
//! # Architecture
//!
//! The engine is an explicit state machine. It never waits on anything:
//! when it needs dice or movement it emits an event and stops, and the
//! answer comes back in as an action or a movement tick. A [`GameSession`]
//! wires those requests to collaborators for headless play. It can be
//! compiled to:
//! - Native Rust for simulations and hosting
//! - WebAssembly for a browser front end
//!
//! # Modules
//!
//! - [`board`]: Tiles, board configuration and validation
//! - [`cards`]: Card catalog and hand instances
//! - [`player`]: Player state
//! - [`game`]: Turn coordinator
//! - [`movement`]: Pawn movement engine
//! - [`tiles`]: Tile effect resolution
//! - [`effects`]: Card effects
//! - [`session`]: Collaborator wiring

pub mod actions;
pub mod board;
pub mod bot;
pub mod cards;
pub mod combat;
pub mod config;
pub mod dice;
pub mod effects;
pub mod game;
pub mod movement;
pub mod player;
pub mod session;
pub mod tiles;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{DiscardReason, DraftOrigin, GameAction, GameEvent, SkipReason, StatusKind};
pub use board::{Board, BoardConfig, BossTileEffect, ConfigError, Tile, TileId, TileKind, TileSpec};
pub use bot::{Bot, BotDifficulty};
pub use cards::{CardCategory, CardDefinition, CardEffect, CardInstance, CardKind};
pub use combat::{BossState, DamageSource};
pub use config::{BossConfig, GameConfig};
pub use dice::{DiceSource, RandomDice, ScriptedDice};
pub use effects::{CardContext, CardOutcome};
pub use game::{GameError, GameState, PendingChoice, TargetPurpose, TurnPhase, TurnSession};
pub use movement::{MoveId, MoveMode, MoveRequest, MovementEngine};
pub use player::{Hand, Player, PlayerColor, PlayerId};
pub use session::{EventLog, EventSink, GameSession, MovementBackend, Presentation};
pub use tiles::{LandingId, TileEffectResolver};
