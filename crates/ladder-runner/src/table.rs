//! Game table management.

use ladder_core::{
    Bot, GameAction, GameConfig, GameError, GameEvent, GameSession, GameState, PlayerId,
    RandomDice,
};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::protocol::{GameSummary, SeatKind, SeatSpec, TableInfo, TableStatus};

/// Bot moves allowed per call before giving up on a stuck table
const MAX_BOT_STEPS: usize = 50_000;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Table needs between 2 and 4 seats")]
    BadSeatCount,

    #[error("Game already started")]
    GameAlreadyStarted,

    #[error("Game not started")]
    GameNotStarted,

    #[error("Not your turn")]
    NotYourTurn,

    #[error("Seat {0} is played by a bot")]
    BotSeat(PlayerId),

    #[error("Bots stopped making progress")]
    Stalled,

    #[error("Invalid setup: {0}")]
    InvalidSetup(String),

    #[error(transparent)]
    Game(#[from] GameError),
}

/// A table of human and bot seats playing one game at a time.
pub struct GameTable {
    pub id: Uuid,
    pub name: String,
    pub status: TableStatus,
    pub seats: Vec<SeatSpec>,
    config: GameConfig,
    session: Option<GameSession>,
    bots: Vec<Option<Bot>>,
    turns: u32,
}

impl GameTable {
    pub fn new(id: Uuid, seats: Vec<SeatSpec>, config: GameConfig) -> Result<Self, TableError> {
        if !(2..=4).contains(&seats.len()) {
            return Err(TableError::BadSeatCount);
        }
        let name = match seats.first() {
            Some(host) => format!("{}'s Table", host.name),
            None => "Table".to_string(),
        };

        Ok(Self {
            id,
            name,
            status: TableStatus::Waiting,
            seats,
            config,
            session: None,
            bots: Vec::new(),
            turns: 0,
        })
    }

    pub fn is_all_bots(&self) -> bool {
        self.seats.iter().all(SeatSpec::is_bot)
    }

    /// Create the game and play bot turns up to the first human decision
    pub fn start_game(&mut self) -> Result<Vec<GameEvent>, TableError> {
        if self.status != TableStatus::Waiting {
            return Err(TableError::GameAlreadyStarted);
        }

        let names = self.seats.iter().map(|s| s.name.clone()).collect();
        let state = GameState::new(self.config.clone(), names)
            .map_err(|e| TableError::InvalidSetup(e.to_string()))?;

        let seed = self.config.seed;
        let dice = match seed {
            Some(seed) => RandomDice::with_seed(seed),
            None => RandomDice::new(),
        };
        self.bots = self
            .seats
            .iter()
            .enumerate()
            .map(|(i, seat)| match (seat.kind, seed) {
                (SeatKind::Human, _) => None,
                (SeatKind::Bot(d), Some(s)) => Some(Bot::with_seed(i as PlayerId, d, s + i as u64)),
                (SeatKind::Bot(d), None) => Some(Bot::new(i as PlayerId, d)),
            })
            .collect();

        let mut session = GameSession::new(state).with_dice(dice);
        let mut events = session.start();
        self.session = Some(session);
        self.status = TableStatus::InGame;
        info!(table = %self.id, seats = self.seats.len(), "game started");

        events.extend(self.run_bots()?);
        Ok(events)
    }

    /// Start over with the same seats
    pub fn restart(&mut self) -> Result<Vec<GameEvent>, TableError> {
        self.status = TableStatus::Waiting;
        self.session = None;
        self.turns = 0;
        self.start_game()
    }

    /// Apply a human action, then let bots play until a human must act
    pub fn apply_action(
        &mut self,
        seat: PlayerId,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, TableError> {
        if self.bots.get(seat as usize).map_or(false, Option::is_some) {
            return Err(TableError::BotSeat(seat));
        }
        let session = self.session.as_mut().ok_or(TableError::GameNotStarted)?;
        if session.state().current_player() != seat {
            return Err(TableError::NotYourTurn);
        }

        let mut events = session.submit(seat, action)?;
        self.track(&events);
        events.extend(self.run_bots()?);
        Ok(events)
    }

    /// Let bots act while it is a bot's turn
    pub fn run_bots(&mut self) -> Result<Vec<GameEvent>, TableError> {
        let mut events = Vec::new();
        for _ in 0..MAX_BOT_STEPS {
            let session = self.session.as_mut().ok_or(TableError::GameNotStarted)?;
            if session.state().is_finished() {
                self.status = TableStatus::Finished;
                return Ok(events);
            }

            let current = session.state().current_player();
            let Some(bot) = self.bots.get_mut(current as usize).and_then(Option::as_mut) else {
                return Ok(events);
            };
            let Some(action) = bot.choose_action(session.state()) else {
                return Err(TableError::Stalled);
            };

            debug!(table = %self.id, seat = current, ?action, "bot acts");
            let produced = match session.submit(current, action) {
                Ok(produced) => produced,
                Err(_) => {
                    // A bot should never pick an illegal action; take the first legal one
                    let fallback = session
                        .state()
                        .valid_actions(current)
                        .first()
                        .copied()
                        .ok_or(TableError::Stalled)?;
                    session.submit(current, fallback)?
                }
            };
            self.track(&produced);
            events.extend(produced);
        }
        Err(TableError::Stalled)
    }

    fn track(&mut self, events: &[GameEvent]) {
        self.turns += events
            .iter()
            .filter(|e| matches!(e, GameEvent::TurnStarted { .. }))
            .count() as u32;
        if events.iter().any(|e| matches!(e, GameEvent::GameOver { .. })) {
            self.status = TableStatus::Finished;
        }
    }

    pub fn state(&self) -> Option<&GameState> {
        self.session.as_ref().map(GameSession::state)
    }

    pub fn get_game_state(&self) -> Option<serde_json::Value> {
        self.state().and_then(|g| serde_json::to_value(g).ok())
    }

    pub fn get_valid_actions(&self) -> Option<(PlayerId, Vec<GameAction>)> {
        self.state().map(|g| {
            let current = g.current_player();
            (current, g.valid_actions(current))
        })
    }

    pub fn seat_name(&self, seat: PlayerId) -> String {
        self.seats
            .get(seat as usize)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| format!("Seat {}", seat))
    }

    pub fn summary(&self) -> GameSummary {
        let state = self.state();
        GameSummary {
            table: self.id,
            finished: state.map_or(false, GameState::is_finished),
            winners: state
                .map(|g| g.winners().iter().map(|&w| self.seat_name(w)).collect())
                .unwrap_or_default(),
            loser: state.and_then(GameState::loser).map(|l| self.seat_name(l)),
            turns: self.turns,
            cycles: state.map_or(0, |g| g.session.current_cycle),
        }
    }

    pub fn to_info(&self) -> TableInfo {
        TableInfo {
            id: self.id,
            name: self.name.clone(),
            seats: self.seats.clone(),
            status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ladder_core::BotDifficulty;

    fn seats(spec: &str) -> Vec<SeatSpec> {
        SeatSpec::parse_list(spec).unwrap()
    }

    fn seeded() -> GameConfig {
        GameConfig {
            seed: Some(7),
            ..GameConfig::default()
        }
    }

    #[test]
    fn test_create_table() {
        let table = GameTable::new(Uuid::new_v4(), seats("Host,bot:B"), seeded()).unwrap();
        assert_eq!(table.name, "Host's Table");
        assert_eq!(table.status, TableStatus::Waiting);
        assert!(!table.is_all_bots());
        assert!(GameTable::new(Uuid::new_v4(), seats("Solo"), seeded()).is_err());
    }

    #[test]
    fn test_bot_table_plays_to_the_end() {
        let mut table =
            GameTable::new(Uuid::new_v4(), seats("bot:A,bot-easy:B,bot-hard:C"), seeded()).unwrap();
        table.start_game().unwrap();

        assert_eq!(table.status, TableStatus::Finished);
        let summary = table.summary();
        assert!(summary.finished);
        assert!(summary.turns > 0);
    }

    #[test]
    fn test_human_seat_waits_for_input() {
        let mut table = GameTable::new(Uuid::new_v4(), seats("Ann,Bo"), seeded()).unwrap();
        table.start_game().unwrap();
        assert_eq!(table.status, TableStatus::InGame);

        let (current, actions) = table.get_valid_actions().unwrap();
        assert!(!actions.is_empty());

        let other = 1 - current;
        assert!(matches!(
            table.apply_action(other, actions[0]),
            Err(TableError::NotYourTurn)
        ));
        table.apply_action(current, actions[0]).unwrap();
    }

    #[test]
    fn test_bot_seat_rejects_human_input() {
        let mut table = GameTable::new(Uuid::new_v4(), seats("bot:A,bot:B"), seeded()).unwrap();
        assert!(matches!(
            table.apply_action(0, GameAction::RollDice),
            Err(TableError::GameNotStarted)
        ));
        table.bots = vec![Some(Bot::new(0, BotDifficulty::Easy)), None];
        assert!(matches!(
            table.apply_action(0, GameAction::RollDice),
            Err(TableError::BotSeat(0))
        ));
    }
}
