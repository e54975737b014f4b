//! Console protocol for the ladder runner.
//!
//! Humans type short text commands; every answer can also be emitted as a
//! JSON line for tools driving the runner.

use ladder_core::{BotDifficulty, GameAction, PlayerId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("`{0}` needs a number")]
    MissingNumber(&'static str),

    #[error("Invalid seat spec: {0}")]
    InvalidSeat(String),
}

/// A line typed by a human player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Submit a game action
    Action(GameAction),
    /// Print the full state as JSON
    State,
    /// Print the valid actions
    Actions,
    /// Start over with the same seats
    Restart,
    /// Leave
    Quit,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(ProtocolError::Empty)?.to_ascii_lowercase();
        let mut number = |name: &'static str| {
            words
                .next()
                .and_then(|w| w.parse::<usize>().ok())
                .ok_or(ProtocolError::MissingNumber(name))
        };

        let action = match verb.as_str() {
            "roll" | "r" => GameAction::RollDice,
            "play" | "p" => GameAction::PlayCard(number("play")?),
            "pick" | "choose" => GameAction::ChooseCard(number("pick")?),
            "move" | "go" => GameAction::ConfirmMove,
            "self" => GameAction::MoveSelf,
            "reverse" => GameAction::ChooseReverse,
            "target" | "t" => GameAction::ChooseTarget(number("target")? as PlayerId),
            "cancel" => GameAction::CancelTarget,
            "end" | "e" => GameAction::EndTurn,
            "state" => return Ok(ConsoleCommand::State),
            "actions" | "?" => return Ok(ConsoleCommand::Actions),
            "restart" => return Ok(ConsoleCommand::Restart),
            "quit" | "q" | "exit" => return Ok(ConsoleCommand::Quit),
            other => return Err(ProtocolError::UnknownCommand(other.to_string())),
        };
        Ok(ConsoleCommand::Action(action))
    }
}

/// The command a human would type for an action
pub fn command_for(action: &GameAction) -> String {
    match action {
        GameAction::RollDice => "roll".to_string(),
        GameAction::DeliverRoll(n) => format!("(dice {})", n),
        GameAction::PlayCard(i) => format!("play {}", i),
        GameAction::ChooseCard(i) => format!("pick {}", i),
        GameAction::ConfirmMove => "move".to_string(),
        GameAction::MoveSelf => "self".to_string(),
        GameAction::ChooseReverse => "reverse".to_string(),
        GameAction::ChooseTarget(p) => format!("target {}", p),
        GameAction::CancelTarget => "cancel".to_string(),
        GameAction::EndTurn => "end".to_string(),
    }
}

/// Who sits in a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeatKind {
    Human,
    Bot(BotDifficulty),
}

/// A seat at a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatSpec {
    pub name: String,
    pub kind: SeatKind,
}

impl SeatSpec {
    /// Parse `name`, `bot:name`, `bot-easy:name` or `bot-hard:name`
    pub fn parse(spec: &str) -> Result<Self, ProtocolError> {
        let spec = spec.trim();
        let (kind, name) = match spec.split_once(':') {
            None => (SeatKind::Human, spec),
            Some((prefix, name)) => {
                let kind = match prefix.to_ascii_lowercase().as_str() {
                    "human" => SeatKind::Human,
                    "bot" | "bot-medium" => SeatKind::Bot(BotDifficulty::Medium),
                    "bot-easy" => SeatKind::Bot(BotDifficulty::Easy),
                    "bot-hard" => SeatKind::Bot(BotDifficulty::Hard),
                    _ => return Err(ProtocolError::InvalidSeat(spec.to_string())),
                };
                (kind, name.trim())
            }
        };
        if name.is_empty() {
            return Err(ProtocolError::InvalidSeat(spec.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            kind,
        })
    }

    /// Parse a comma-separated seat list
    pub fn parse_list(list: &str) -> Result<Vec<Self>, ProtocolError> {
        list.split(',')
            .filter(|s| !s.trim().is_empty())
            .map(Self::parse)
            .collect()
    }

    pub fn is_bot(&self) -> bool {
        matches!(self.kind, SeatKind::Bot(_))
    }
}

/// Messages written by the runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum TableMessage {
    /// Table created
    TableCreated { table: TableInfo },

    /// Events produced by an action
    Events { events: Vec<serde_json::Value> },

    /// Action rejected
    Error { message: String },

    /// Valid actions for the current player
    ValidActions { player: PlayerId, actions: Vec<String> },

    /// Game state snapshot
    GameState { state: serde_json::Value },

    /// Game finished
    GameOver {
        winners: Vec<String>,
        loser: Option<String>,
    },
}

/// Table information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub id: Uuid,
    pub name: String,
    pub seats: Vec<SeatSpec>,
    pub status: TableStatus,
}

/// Table status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableStatus {
    Waiting,
    InGame,
    Finished,
}

/// Outcome of one finished (or abandoned) game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSummary {
    pub table: Uuid,
    pub finished: bool,
    pub winners: Vec<String>,
    pub loser: Option<String>,
    pub turns: u32,
    pub cycles: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            ConsoleCommand::parse("roll"),
            Ok(ConsoleCommand::Action(GameAction::RollDice))
        );
        assert_eq!(
            ConsoleCommand::parse("  PLAY 2 "),
            Ok(ConsoleCommand::Action(GameAction::PlayCard(2)))
        );
        assert_eq!(
            ConsoleCommand::parse("target 3"),
            Ok(ConsoleCommand::Action(GameAction::ChooseTarget(3)))
        );
        assert_eq!(ConsoleCommand::parse("q"), Ok(ConsoleCommand::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(ConsoleCommand::parse("   "), Err(ProtocolError::Empty));
        assert_eq!(
            ConsoleCommand::parse("pick"),
            Err(ProtocolError::MissingNumber("pick"))
        );
        assert!(matches!(
            ConsoleCommand::parse("fly"),
            Err(ProtocolError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_command_round_trip_for_human_actions() {
        for action in [
            GameAction::RollDice,
            GameAction::PlayCard(1),
            GameAction::ChooseTarget(2),
            GameAction::EndTurn,
        ] {
            assert_eq!(
                ConsoleCommand::parse(&command_for(&action)),
                Ok(ConsoleCommand::Action(action))
            );
        }
    }

    #[test]
    fn test_parse_seats() {
        let seats = SeatSpec::parse_list("Alice, bot:Bob,bot-hard:Cy").unwrap();
        assert_eq!(seats.len(), 3);
        assert_eq!(seats[0].kind, SeatKind::Human);
        assert_eq!(seats[1].kind, SeatKind::Bot(BotDifficulty::Medium));
        assert_eq!(seats[2].name, "Cy");
        assert!(SeatSpec::parse("robot:X").is_err());
        assert!(SeatSpec::parse("bot:").is_err());
    }

    #[test]
    fn test_message_format() {
        let msg = TableMessage::Error {
            message: "nope".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Error");
        assert_eq!(json["payload"]["message"], "nope");
    }
}
