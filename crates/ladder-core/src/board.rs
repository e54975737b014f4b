//! Board layout: tiles, their kinds, and the id → tile lookup.
//!
//! This module contains:
//! - Tile kinds (snakes, ladders, blessing/attack/nega/boss tiles)
//! - The board configuration format and its validation
//! - The standard 10×10 board
//! - Visual slot shuffling for the boss effect

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Tile identifier (1..=N)
pub type TileId = u32;

/// Default number of tiles on a board
pub const DEFAULT_BOARD_SIZE: u32 = 100;

/// Default number of tiles per row
pub const DEFAULT_ROW_WIDTH: u32 = 10;

/// What a tile does when a pawn lands on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// Nothing happens
    Normal,
    /// Head of a snake - slides the pawn down to its target
    SnakeStart,
    /// Tail of a snake
    SnakeEnd,
    /// Foot of a ladder - climbs the pawn up to its target
    LadderStart,
    /// Top of a ladder
    LadderEnd,
    /// Offers a card draft
    BlessingCard,
    /// Deals row-scaled damage
    AttackTile,
    /// Small random damage plus one random drawback
    NegaTile,
    /// Boss encounter
    BossTile,
}

impl TileKind {
    /// Kinds that must carry a target tile
    pub fn needs_target(&self) -> bool {
        matches!(self, TileKind::SnakeStart | TileKind::LadderStart)
    }

    /// The end kind a start kind must point at
    pub fn expected_end(&self) -> Option<TileKind> {
        match self {
            TileKind::SnakeStart => Some(TileKind::SnakeEnd),
            TileKind::LadderStart => Some(TileKind::LadderEnd),
            _ => None,
        }
    }
}

/// Extra behavior of a boss tile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossTileEffect {
    /// Shuffle the visual tile positions after the hit
    #[serde(default)]
    pub shuffle_board: bool,
    /// Force the pawn forward this many tiles after the hit
    #[serde(default)]
    pub advance: Option<u32>,
}

/// A single tile on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Logical id (1..=N)
    pub id: TileId,
    /// What the tile does
    pub kind: TileKind,
    /// Destination for snakes and ladders
    pub target: Option<TileId>,
    /// Row index, `(id - 1) / row_width`
    pub row: u32,
    /// Visual position; only changes when the board is shuffled
    pub slot: u32,
    /// Damage override for attack and boss tiles
    pub damage: Option<u32>,
    /// Boss behavior, only meaningful on boss tiles
    pub boss: BossTileEffect,
}

impl Tile {
    /// Whether landing here is harmful (blocked by full immunity)
    pub fn is_negative(&self) -> bool {
        match self.kind {
            TileKind::SnakeStart | TileKind::NegaTile | TileKind::AttackTile => true,
            TileKind::BossTile => self.damage.map_or(true, |d| d > 0),
            _ => false,
        }
    }
}

/// One entry of a board configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSpec {
    pub id: TileId,
    pub kind: TileKind,
    #[serde(default)]
    pub target: Option<TileId>,
    #[serde(default)]
    pub damage: Option<u32>,
    #[serde(default)]
    pub boss: Option<BossTileEffect>,
}

impl TileSpec {
    /// A plain tile
    pub fn normal(id: TileId) -> Self {
        Self::of(id, TileKind::Normal)
    }

    /// A tile of the given kind without a target
    pub fn of(id: TileId, kind: TileKind) -> Self {
        Self {
            id,
            kind,
            target: None,
            damage: None,
            boss: None,
        }
    }

    /// A snake from `id` down to `target`
    pub fn snake(id: TileId, target: TileId) -> Self {
        Self {
            target: Some(target),
            ..Self::of(id, TileKind::SnakeStart)
        }
    }

    /// A ladder from `id` up to `target`
    pub fn ladder(id: TileId, target: TileId) -> Self {
        Self {
            target: Some(target),
            ..Self::of(id, TileKind::LadderStart)
        }
    }

    /// A boss tile with its behavior
    pub fn boss(id: TileId, damage: Option<u32>, effect: BossTileEffect) -> Self {
        Self {
            damage,
            boss: Some(effect),
            ..Self::of(id, TileKind::BossTile)
        }
    }
}

/// Static board configuration, usually loaded from JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Number of tiles (N)
    pub size: u32,
    /// Tiles per row
    pub row_width: u32,
    /// Tile entries
    pub tiles: Vec<TileSpec>,
    /// Fill ids missing from `tiles` with normal tiles before validating
    #[serde(default)]
    pub fill_normal: bool,
}

impl BoardConfig {
    /// Build a configuration listing only the special tiles
    pub fn sparse(size: u32, row_width: u32, specials: Vec<TileSpec>) -> Self {
        Self {
            size,
            row_width,
            tiles: specials,
            fill_normal: true,
        }
    }

    /// The built-in 10×10 board
    pub fn standard() -> Self {
        let mut tiles = Vec::new();

        let snakes = [
            (16, 6),
            (47, 26),
            (49, 11),
            (56, 53),
            (62, 19),
            (64, 60),
            (87, 24),
            (93, 73),
            (95, 75),
            (98, 78),
        ];
        let ladders = [
            (4, 14),
            (9, 31),
            (21, 42),
            (28, 84),
            (36, 44),
            (51, 67),
            (71, 91),
            (80, 99),
        ];

        for (from, to) in snakes {
            tiles.push(TileSpec::snake(from, to));
            tiles.push(TileSpec::of(to, TileKind::SnakeEnd));
        }
        for (from, to) in ladders {
            tiles.push(TileSpec::ladder(from, to));
            tiles.push(TileSpec::of(to, TileKind::LadderEnd));
        }
        for id in [7, 33, 58, 77] {
            tiles.push(TileSpec::of(id, TileKind::BlessingCard));
        }
        for id in [12, 39, 68, 85] {
            tiles.push(TileSpec::of(id, TileKind::AttackTile));
        }
        for id in [22, 46, 69, 89] {
            tiles.push(TileSpec::of(id, TileKind::NegaTile));
        }
        tiles.push(TileSpec::boss(
            50,
            None,
            BossTileEffect {
                shuffle_board: true,
                advance: None,
            },
        ));
        tiles.push(TileSpec::boss(
            90,
            None,
            BossTileEffect {
                shuffle_board: false,
                advance: Some(3),
            },
        ));

        Self::sparse(DEFAULT_BOARD_SIZE, DEFAULT_ROW_WIDTH, tiles)
    }
}

/// Malformed board configuration. Fatal: a game cannot start on such a board.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ConfigError {
    #[error("Board needs at least 2 tiles and a non-zero row width")]
    InvalidDimensions,

    #[error("Expected {expected} tiles, found {found}")]
    WrongTileCount { expected: u32, found: u32 },

    #[error("Tile id {0} appears more than once")]
    DuplicateTile(TileId),

    #[error("Tile id {0} is outside the board")]
    TileOutOfRange(TileId),

    #[error("Start tile (id 1) is missing")]
    MissingStart,

    #[error("Finish tile (id {0}) is missing")]
    MissingFinish(TileId),

    #[error("Tile {0} must be a normal tile")]
    EndpointNotNormal(TileId),

    #[error("Tile {0} needs a target")]
    MissingTarget(TileId),

    #[error("Tile {0} must not have a target")]
    UnexpectedTarget(TileId),

    #[error("Tile {tile} points at {target}, which is not a matching end tile")]
    BadTarget { tile: TileId, target: TileId },

    #[error("Tile {0} has a target going the wrong direction")]
    WrongDirection(TileId),

    #[error("Game needs between {min} and {max} players")]
    PlayerCount { min: usize, max: usize },

    #[error("Invalid game setting: {0}")]
    InvalidSetting(String),
}

/// The game board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    /// Number of tiles (N)
    size: u32,
    /// Tiles per row
    row_width: u32,
    /// Tiles in id order
    tiles: Vec<Tile>,
    /// Tile id → index into `tiles`
    index: HashMap<TileId, usize>,
}

impl Board {
    /// Build and validate a board from its configuration
    pub fn from_config(config: &BoardConfig) -> Result<Self, ConfigError> {
        if config.size < 2 || config.row_width == 0 {
            return Err(ConfigError::InvalidDimensions);
        }

        let mut specs = config.tiles.clone();
        if config.fill_normal {
            let present: HashSet<TileId> = specs.iter().map(|t| t.id).collect();
            for id in 1..=config.size {
                if !present.contains(&id) {
                    specs.push(TileSpec::normal(id));
                }
            }
        }

        let mut seen = HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.id) {
                return Err(ConfigError::DuplicateTile(spec.id));
            }
        }

        if specs.len() as u32 != config.size {
            return Err(ConfigError::WrongTileCount {
                expected: config.size,
                found: specs.len() as u32,
            });
        }

        specs.sort_by_key(|t| t.id);

        let tiles: Vec<Tile> = specs
            .into_iter()
            .map(|spec| Tile {
                id: spec.id,
                kind: spec.kind,
                target: spec.target,
                row: Self::row_for(spec.id, config.row_width),
                slot: spec.id.saturating_sub(1),
                damage: spec.damage,
                boss: spec.boss.unwrap_or_default(),
            })
            .collect();

        let mut board = Self {
            size: config.size,
            row_width: config.row_width,
            tiles,
            index: HashMap::new(),
        };
        board.rebuild_index();
        board.validate()?;
        Ok(board)
    }

    /// The built-in 10×10 board
    pub fn standard() -> Self {
        Self::from_config(&BoardConfig::standard()).expect("standard board is valid")
    }

    /// Check every layout invariant
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tiles.len() as u32 != self.size {
            return Err(ConfigError::WrongTileCount {
                expected: self.size,
                found: self.tiles.len() as u32,
            });
        }

        for tile in &self.tiles {
            if tile.id == 0 || tile.id > self.size {
                return Err(ConfigError::TileOutOfRange(tile.id));
            }
        }

        let start = self.get_tile(1).ok_or(ConfigError::MissingStart)?;
        let finish = self
            .get_tile(self.size)
            .ok_or(ConfigError::MissingFinish(self.size))?;
        for endpoint in [start, finish] {
            if endpoint.kind != TileKind::Normal {
                return Err(ConfigError::EndpointNotNormal(endpoint.id));
            }
        }

        for tile in &self.tiles {
            match (tile.kind.expected_end(), tile.target) {
                (Some(_), None) => return Err(ConfigError::MissingTarget(tile.id)),
                (None, Some(_)) => return Err(ConfigError::UnexpectedTarget(tile.id)),
                (None, None) => {}
                (Some(end_kind), Some(target)) => {
                    let target_tile = self.get_tile(target).ok_or(ConfigError::BadTarget {
                        tile: tile.id,
                        target,
                    })?;
                    if target_tile.kind != end_kind {
                        return Err(ConfigError::BadTarget {
                            tile: tile.id,
                            target,
                        });
                    }
                    let goes_down = target < tile.id;
                    if goes_down != (tile.kind == TileKind::SnakeStart) {
                        return Err(ConfigError::WrongDirection(tile.id));
                    }
                }
            }
        }

        Ok(())
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .tiles
            .iter()
            .enumerate()
            .map(|(i, tile)| (tile.id, i))
            .collect();
    }

    /// Number of tiles (N), which is also the finish tile id
    pub fn size(&self) -> u32 {
        self.size
    }

    /// The finish tile id
    pub fn finish(&self) -> TileId {
        self.size
    }

    /// Tiles per row
    pub fn row_width(&self) -> u32 {
        self.row_width
    }

    /// Number of rows
    pub fn row_count(&self) -> u32 {
        self.size.div_ceil(self.row_width)
    }

    /// Look up a tile by id
    pub fn get_tile(&self, id: TileId) -> Option<&Tile> {
        self.index.get(&id).and_then(|&i| self.tiles.get(i))
    }

    /// Kind of the tile, `Normal` for unknown ids
    pub fn kind_of(&self, id: TileId) -> TileKind {
        self.get_tile(id).map_or(TileKind::Normal, |t| t.kind)
    }

    /// Row of a tile id for a given row width
    pub fn row_for(id: TileId, row_width: u32) -> u32 {
        id.saturating_sub(1) / row_width.max(1)
    }

    /// Row of a tile id on this board
    pub fn row_of(&self, id: TileId) -> u32 {
        Self::row_for(id, self.row_width)
    }

    /// All tiles of a row, ordered by id
    pub fn tiles_in_row(&self, row: u32) -> Vec<&Tile> {
        self.tiles.iter().filter(|t| t.row == row).collect()
    }

    /// All tiles in id order
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Tile currently drawn at a visual slot
    pub fn tile_at_slot(&self, slot: u32) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.slot == slot)
    }

    /// Permute the visual slots of all tiles. Ids, kinds and targets stay put,
    /// so game logic is unaffected.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        let mut slots: Vec<u32> = self.tiles.iter().map(|t| t.slot).collect();
        slots.shuffle(rng);
        for (tile, slot) in self.tiles.iter_mut().zip(slots) {
            tile.slot = slot;
        }
    }

    /// Permute the ids of the interior tiles (2..N-1) and remap snake and
    /// ladder targets to follow their tiles.
    ///
    /// This changes which effect sits at which id, so the result is
    /// re-validated. On failure the board is left untouched.
    pub fn shuffle_ids<R: Rng>(&mut self, rng: &mut R) -> Result<(), ConfigError> {
        if self.size < 4 {
            return Ok(());
        }

        let interior: Vec<TileId> = (2..self.size).collect();
        let mut shuffled = interior.clone();
        shuffled.shuffle(rng);
        let remap: HashMap<TileId, TileId> = interior.into_iter().zip(shuffled).collect();
        let map_id = |id: TileId| remap.get(&id).copied().unwrap_or(id);

        let mut candidate = self.clone();
        for tile in &mut candidate.tiles {
            tile.id = map_id(tile.id);
            tile.row = Self::row_for(tile.id, self.row_width);
            tile.target = tile.target.map(map_id);
        }
        candidate.tiles.sort_by_key(|t| t.id);
        candidate.rebuild_index();
        candidate.validate()?;

        *self = candidate;
        Ok(())
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}
