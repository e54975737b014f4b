//! Game settings.
//!
//! Everything tunable about a game lives in [`GameConfig`]. It deserializes
//! from JSON with every field optional, so a config file only needs the
//! values it changes.

use crate::board::{BoardConfig, ConfigError};
use serde::{Deserialize, Serialize};

/// Fewest players in a game
pub const MIN_PLAYERS: usize = 2;

/// Most players in a game
pub const MAX_PLAYERS: usize = 4;

/// The optional boss encounter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossConfig {
    pub name: String,
    pub max_hp: u32,
    /// Damage a player deals when striking back from a boss tile
    pub player_strike: u32,
}

impl Default for BossConfig {
    fn default() -> Self {
        Self {
            name: "Jormungandr".to_string(),
            max_hp: 30,
            player_strike: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Board layout
    pub board: BoardConfig,
    /// Starting and maximum hit points
    pub max_hp: u32,
    /// Maximum cards in hand
    pub hand_limit: usize,
    /// Cards played per turn, across both play windows
    pub max_cards_per_turn: u32,
    /// Cards offered by a draft
    pub draft_size: usize,
    /// Offer a draft at the start of every turn
    pub draft_every_turn: bool,
    /// Offer the reverse choice when eligible opponents exist
    pub reverse_enabled: bool,
    /// Attack tile damage by row
    pub row_damage: Vec<u32>,
    /// Inclusive damage range of nega tiles
    pub nega_damage: (u32, u32),
    /// Roll modifier applied by nega tiles
    pub nega_roll_shift: i32,
    /// Cards discarded by nega tiles
    pub nega_discard: usize,
    /// Damage of boss tiles without an override
    pub boss_tile_damage: u32,
    /// Boss encounter, if any
    pub boss: Option<BossConfig>,
    /// Landings evaluated per resolution before the chain is cut
    pub max_chain_length: u32,
    /// Faces on a die
    pub die_faces: u32,
    /// Seed for every random decision of the game; random when absent
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board: BoardConfig::standard(),
            max_hp: 40,
            hand_limit: 5,
            max_cards_per_turn: 3,
            draft_size: 3,
            draft_every_turn: false,
            reverse_enabled: true,
            row_damage: vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10],
            nega_damage: (1, 3),
            nega_roll_shift: 2,
            nega_discard: 2,
            boss_tile_damage: 4,
            boss: Some(BossConfig::default()),
            max_chain_length: 8,
            die_faces: 6,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Parse a config from JSON
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::InvalidSetting(e.to_string()))
    }

    /// Check settings that the board validation does not cover
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.die_faces == 0 {
            return Err(ConfigError::InvalidSetting("die_faces must be positive".into()));
        }
        if self.nega_damage.0 > self.nega_damage.1 {
            return Err(ConfigError::InvalidSetting(
                "nega_damage range is inverted".into(),
            ));
        }
        if self.row_damage.is_empty() {
            return Err(ConfigError::InvalidSetting("row_damage is empty".into()));
        }
        if self.max_hp == 0 {
            return Err(ConfigError::InvalidSetting("max_hp must be positive".into()));
        }
        Ok(())
    }

    /// Attack damage for a row; rows past the table use its last entry
    pub fn row_damage_for(&self, row: u32) -> u32 {
        self.row_damage
            .get(row as usize)
            .or_else(|| self.row_damage.last())
            .copied()
            .unwrap_or(0)
    }
}
