//! WebAssembly bindings for the ladder game engine.
//!
//! This module exposes the game engine to JavaScript through wasm-bindgen.
//! The JavaScript side plays the part of the dice source and the movement
//! backend: it answers `RollRequested` with a `DeliverRoll` action and calls
//! `advanceMovement` as its pawn animation reaches each tile.

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

#[cfg(feature = "wasm")]
use crate::actions::GameAction;
#[cfg(feature = "wasm")]
use crate::bot::{Bot, BotDifficulty};
#[cfg(feature = "wasm")]
use crate::cards::CardDefinition;
#[cfg(feature = "wasm")]
use crate::config::GameConfig;
#[cfg(feature = "wasm")]
use crate::game::GameState;

/// Initialize panic hook for better error messages in browser console
#[cfg(feature = "wasm")]
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WASM-exposed game wrapper
#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub struct WasmGame {
    state: GameState,
}

#[cfg(feature = "wasm")]
#[wasm_bindgen]
impl WasmGame {
    /// Create a new game. `config_json` may be empty for the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(player_names_json: &str, config_json: &str) -> Result<WasmGame, JsValue> {
        let player_names: Vec<String> = serde_json::from_str(player_names_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid player names: {}", e)))?;

        let config = if config_json.trim().is_empty() {
            GameConfig::default()
        } else {
            GameConfig::from_json(config_json).map_err(|e| JsValue::from_str(&e.to_string()))?
        };

        let state = GameState::new(config, player_names)
            .map_err(|e| JsValue::from_str(&format!("Invalid game: {}", e)))?;
        Ok(WasmGame { state })
    }

    /// Start the game, returns events JSON
    pub fn start(&mut self) -> String {
        let events = self.state.start();
        serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string())
    }

    /// Restart with the same players, returns events JSON or error
    pub fn restart(&mut self) -> Result<String, JsValue> {
        let events = self
            .state
            .restart()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string()))
    }

    /// Get the current game state as JSON
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        serde_json::to_string(&self.state).unwrap_or_else(|_| "{}".to_string())
    }

    /// Get the current player ID
    #[wasm_bindgen(js_name = getCurrentPlayer)]
    pub fn get_current_player(&self) -> u8 {
        self.state.current_player()
    }

    /// Get valid actions for the current player as JSON array
    #[wasm_bindgen(js_name = getValidActions)]
    pub fn get_valid_actions(&self) -> String {
        let actions = self.state.valid_actions(self.state.current_player());
        serde_json::to_string(&actions).unwrap_or_else(|_| "[]".to_string())
    }

    /// Apply an action from JSON, returns events JSON or error
    #[wasm_bindgen(js_name = applyAction)]
    pub fn apply_action(&mut self, player: u8, action_json: &str) -> Result<String, JsValue> {
        let action: GameAction = serde_json::from_str(action_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid action JSON: {}", e)))?;

        match self.state.apply_action(player, action) {
            Ok(events) => Ok(serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string())),
            Err(e) => Err(JsValue::from_str(&format!("Action failed: {}", e))),
        }
    }

    /// Tick the pawn in flight by one tile, returns events JSON or error
    #[wasm_bindgen(js_name = advanceMovement)]
    pub fn advance_movement(&mut self) -> Result<String, JsValue> {
        match self.state.advance_movement() {
            Ok(events) => Ok(serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string())),
            Err(e) => Err(JsValue::from_str(&format!("Movement failed: {}", e))),
        }
    }

    /// Whether a pawn is moving or queued to move
    #[wasm_bindgen(js_name = isMoving)]
    pub fn is_moving(&self) -> bool {
        self.state.is_movement_pending()
    }

    /// Check if the game is finished
    #[wasm_bindgen(js_name = isFinished)]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Finishers in arrival order
    #[wasm_bindgen(js_name = getWinners)]
    pub fn get_winners(&self) -> Vec<u8> {
        self.state.winners().to_vec()
    }

    /// Get the loser (if game is finished)
    #[wasm_bindgen(js_name = getLoser)]
    pub fn get_loser(&self) -> Option<u8> {
        self.state.loser()
    }

    /// Get the current phase as a string
    #[wasm_bindgen(js_name = getPhase)]
    pub fn get_phase(&self) -> String {
        serde_json::to_string(self.state.phase()).unwrap_or_else(|_| "\"Unknown\"".to_string())
    }

    /// Get the tiles as JSON (for rendering)
    #[wasm_bindgen(js_name = getBoard)]
    pub fn get_board(&self) -> String {
        serde_json::to_string(self.state.board.tiles()).unwrap_or_else(|_| "[]".to_string())
    }

    /// Get a specific player's state as JSON
    #[wasm_bindgen(js_name = getPlayer)]
    pub fn get_player(&self, player: u8) -> String {
        if let Some(p) = self.state.get_player(player) {
            serde_json::to_string(p).unwrap_or_else(|_| "{}".to_string())
        } else {
            "null".to_string()
        }
    }

    /// Every card definition as JSON
    #[wasm_bindgen(js_name = getCatalog)]
    pub fn get_catalog(&self) -> String {
        serde_json::to_string(&CardDefinition::catalog()).unwrap_or_else(|_| "[]".to_string())
    }

    /// Get a bot's suggested action for a player
    /// difficulty: "Easy", "Medium", or "Hard"
    #[wasm_bindgen(js_name = getBotAction)]
    pub fn get_bot_action(&self, player: u8, difficulty: &str) -> String {
        let diff = match difficulty {
            "Easy" => BotDifficulty::Easy,
            "Hard" => BotDifficulty::Hard,
            _ => BotDifficulty::Medium,
        };

        let mut bot = Bot::new(player, diff);
        match bot.choose_action(&self.state) {
            Some(action) => serde_json::to_string(&action).unwrap_or_else(|_| "null".to_string()),
            None => "null".to_string(),
        }
    }
}
