//! A game wired to its collaborators.
//!
//! [`GameState`] only ever asks for dice and movement; a [`GameSession`]
//! answers those requests. Dice come from a [`DiceSource`]. Movement is
//! ticked by a [`MovementBackend`] when one is attached (it calls
//! [`GameSession::advance_movement`] as its animation progresses), and
//! instantly otherwise. Every event is forwarded to the attached
//! [`EventSink`]s and mirrored onto an optional [`Presentation`].

use crate::actions::{GameAction, GameEvent};
use crate::board::Tile;
use crate::cards::CardKind;
use crate::dice::{DiceSource, RandomDice};
use crate::game::{GameError, GameState, TurnPhase};
use crate::player::PlayerId;
use tracing::{error, warn};

/// Receives every event a session produces
pub trait EventSink: Send {
    fn publish(&mut self, event: &GameEvent);
}

/// Text and card surfaces of a user interface
pub trait Presentation: Send {
    fn set_turn_text(&mut self, text: &str);
    fn set_action_text(&mut self, text: &str);
    fn display_hand(&mut self, player: PlayerId, cards: &[CardKind]);
    fn show_card_choice(&mut self, player: PlayerId, options: &[CardKind]);
    fn show_game_over(&mut self, winners: &[PlayerId], loser: Option<PlayerId>);
}

/// Something that animates pawns between tile anchors
pub trait MovementBackend: Send {
    /// World position of a tile's visual slot
    fn anchor(&self, tile: &Tile) -> [f32; 3];
}

/// Collects events in memory
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    pub events: Vec<GameEvent>,
}

impl EventSink for EventLog {
    fn publish(&mut self, event: &GameEvent) {
        self.events.push(event.clone());
    }
}

/// A game plus the collaborators that drive it
pub struct GameSession {
    state: GameState,
    dice: Option<Box<dyn DiceSource>>,
    backend: Option<Box<dyn MovementBackend>>,
    presentation: Option<Box<dyn Presentation>>,
    sinks: Vec<Box<dyn EventSink>>,
    fallback_dice: RandomDice,
}

impl GameSession {
    pub fn new(state: GameState) -> Self {
        let fallback_dice = match state.config.seed {
            Some(seed) => RandomDice::with_seed(seed.wrapping_add(1)),
            None => RandomDice::new(),
        };
        Self {
            state,
            dice: None,
            backend: None,
            presentation: None,
            sinks: Vec::new(),
            fallback_dice,
        }
    }

    pub fn with_dice(mut self, dice: impl DiceSource + 'static) -> Self {
        self.dice = Some(Box::new(dice));
        self
    }

    pub fn with_backend(mut self, backend: impl MovementBackend + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    pub fn with_presentation(mut self, presentation: impl Presentation + 'static) -> Self {
        self.presentation = Some(Box::new(presentation));
        self
    }

    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Mutable access for setup and tests
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    /// Begin the game and run until it waits for a player
    pub fn start(&mut self) -> Vec<GameEvent> {
        let mut events = self.state.start();
        self.settle(&mut events);
        self.publish(&events);
        events
    }

    /// Restart with the same players and settings
    pub fn restart(&mut self) -> Result<Vec<GameEvent>, crate::board::ConfigError> {
        let mut events = self.state.restart()?;
        self.settle(&mut events);
        self.publish(&events);
        Ok(events)
    }

    /// Apply a player action and run until the game waits for a player again
    pub fn submit(
        &mut self,
        player: PlayerId,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        let mut events = self.state.apply_action(player, action)?;
        self.settle(&mut events);
        self.publish(&events);
        Ok(events)
    }

    /// Tick the movement in flight. Called by the movement backend.
    pub fn advance_movement(&mut self) -> Result<Vec<GameEvent>, GameError> {
        let mut events = self.state.advance_movement()?;
        self.settle(&mut events);
        self.publish(&events);
        Ok(events)
    }

    /// World position of a player's pawn, if a backend is attached
    pub fn pawn_anchor(&self, player: PlayerId) -> Option<[f32; 3]> {
        let backend = self.backend.as_ref()?;
        let tile = self.state.board.get_tile(self.state.tile_of(player)?)?;
        Some(backend.anchor(tile))
    }

    /// Answer dice and movement requests until a player must act
    fn settle(&mut self, events: &mut Vec<GameEvent>) {
        loop {
            if let TurnPhase::WaitingForRoll { dice, .. } = self.state.session.phase {
                let player = self.state.current_player();
                let faces = self.state.config.die_faces;
                let total = match self.dice.as_mut() {
                    Some(source) => source.roll(player, dice, faces),
                    None => {
                        warn!(player, "no dice source attached, simulating roll");
                        self.fallback_dice.roll(player, dice, faces)
                    }
                };
                let delivered = match self.state.apply_action(player, GameAction::DeliverRoll(total)) {
                    Err(GameError::InvalidRoll(_)) => {
                        warn!(player, total, dice, "dice source produced an impossible roll, simulating");
                        let total = self.fallback_dice.roll(player, dice, faces);
                        self.state.apply_action(player, GameAction::DeliverRoll(total))
                    }
                    other => other,
                };
                match delivered {
                    Ok(more) => events.extend(more),
                    Err(err) => {
                        error!(player, %err, "roll could not be delivered");
                        break;
                    }
                }
                continue;
            }

            if self.backend.is_none() && self.state.is_movement_pending() {
                match self.state.advance_movement() {
                    Ok(more) => events.extend(more),
                    Err(err) => {
                        error!(%err, "movement stalled");
                        break;
                    }
                }
                continue;
            }

            break;
        }
    }

    fn publish(&mut self, events: &[GameEvent]) {
        for event in events {
            for sink in &mut self.sinks {
                sink.publish(event);
            }
            if let Some(presentation) = self.presentation.as_deref_mut() {
                present(presentation, &self.state, event);
            }
        }
    }
}

/// Mirror one event onto a presentation
pub fn present(presentation: &mut dyn Presentation, state: &GameState, event: &GameEvent) {
    match event {
        GameEvent::TurnStarted { player, .. } => {
            presentation.set_turn_text(&format!("{}'s turn", name_of(state, *player)));
        }
        GameEvent::CardChoiceOffered {
            player, options, ..
        } => presentation.show_card_choice(*player, options),
        GameEvent::CardDrawn { player, .. }
        | GameEvent::CardPlayed { player, .. }
        | GameEvent::CardDiscarded { player, .. } => {
            if let Some(p) = state.get_player(*player) {
                let cards: Vec<CardKind> = p.hand.iter().map(|c| c.kind).collect();
                presentation.display_hand(*player, &cards);
            }
        }
        GameEvent::GameOver { winners, loser, .. } => presentation.show_game_over(winners, *loser),
        other => {
            if let Some(text) = describe(state, other) {
                presentation.set_action_text(&text);
            }
        }
    }
}

fn name_of(state: &GameState, player: PlayerId) -> String {
    state
        .get_player(player)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| format!("Player {}", player))
}

/// Human-readable line for an event; `None` for purely mechanical events
pub fn describe(state: &GameState, event: &GameEvent) -> Option<String> {
    let name = |id: &PlayerId| name_of(state, *id);
    let text = match event {
        GameEvent::GameStarted { turn_order, .. } => {
            let order: Vec<String> = turn_order.iter().map(name).collect();
            format!("Turn order: {}", order.join(", "))
        }
        GameEvent::TurnStarted { player, cycle } => {
            format!("{}'s turn (cycle {})", name(player), cycle)
        }
        GameEvent::CardChoiceOffered {
            player, options, ..
        } => {
            let names: Vec<&str> = options.iter().map(|k| k.name()).collect();
            format!("{} picks a card: {}", name(player), names.join(" / "))
        }
        GameEvent::CardDrawn { player, card } => format!("{} drew {}", name(player), card.name()),
        GameEvent::CardDiscarded { player, card, .. } => {
            format!("{} lost {}", name(player), card.name())
        }
        GameEvent::CardPlayed {
            player,
            card,
            target: Some(t),
        } => format!("{} played {} on {}", name(player), card.name(), name(t)),
        GameEvent::CardPlayed { player, card, .. } => {
            format!("{} played {}", name(player), card.name())
        }
        GameEvent::CardBlocked { card, target, .. } => {
            format!("{} was immune to {}", name(target), card.name())
        }
        GameEvent::DiceRolled {
            player,
            base,
            modifier,
            total,
        } if *modifier != 0 => format!(
            "{} rolled {} ({:+}) = {}",
            name(player),
            base,
            modifier,
            total
        ),
        GameEvent::DiceRolled { player, total, .. } => format!("{} rolled {}", name(player), total),
        GameEvent::BonusRolled {
            player,
            value,
            total,
        } => format!("{} rolled a bonus {} (now {})", name(player), value, total),
        GameEvent::RollModified { player, total, .. } => {
            format!("{}'s roll is now {}", name(player), total)
        }
        GameEvent::ReverseOffered { player, .. } => {
            format!("{} may move or reverse an opponent", name(player))
        }
        GameEvent::PlayerReversed { by, target, steps } => {
            format!("{} pushed {} back {} tiles", name(by), name(target), steps)
        }
        GameEvent::PositionsSwapped { first, second } => {
            format!("{} and {} swapped places", name(first), name(second))
        }
        GameEvent::TileLanded { player, tile, kind, .. } if *kind != crate::board::TileKind::Normal => {
            format!("{} landed on {} ({:?})", name(player), tile, kind)
        }
        GameEvent::EffectSkipped { player, reason, .. } => {
            format!("{} avoided the tile ({:?})", name(player), reason)
        }
        GameEvent::DamageTaken {
            player, dealt, hp, ..
        } => format!("{} took {} damage ({} hp left)", name(player), dealt, hp),
        GameEvent::Healed { player, amount, hp } => {
            format!("{} healed {} ({} hp)", name(player), amount, hp)
        }
        GameEvent::PlayerDied { player } => format!("{} was knocked out", name(player)),
        GameEvent::BossDamaged { by, amount, hp } => {
            format!("{} hit the boss for {} ({} hp left)", name(by), amount, hp)
        }
        GameEvent::BossDefeated { by } => format!("{} defeated the boss!", name(by)),
        GameEvent::BoardShuffled => "The board shifts!".to_string(),
        GameEvent::ExtraTurnGranted { player } => format!("{} gets an extra turn", name(player)),
        GameEvent::PlayerWon { player, rank } => {
            format!("{} finished in place {}", name(player), rank)
        }
        GameEvent::TurnSkipped { player, .. } => format!("{} loses a turn", name(player)),
        GameEvent::GameOver {
            winners,
            eliminated,
            loser,
        } => {
            let order: Vec<String> = winners.iter().map(name).collect();
            let mut text = format!("Game over. Finishers: {}", order.join(", "));
            if !eliminated.is_empty() {
                let out: Vec<String> = eliminated.iter().map(name).collect();
                text.push_str(&format!(". Knocked out: {}", out.join(", ")));
            }
            if let Some(l) = loser {
                text.push_str(&format!(". Last: {}", name(l)));
            }
            text
        }
        _ => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardConfig;
    use crate::config::GameConfig;
    use crate::dice::ScriptedDice;
    use std::sync::{Arc, Mutex};

    fn state() -> GameState {
        let config = GameConfig {
            board: BoardConfig::sparse(20, 5, vec![]),
            boss: None,
            reverse_enabled: false,
            seed: Some(4),
            ..GameConfig::default()
        };
        let mut state = GameState::new(config, vec!["Ann".into(), "Bo".into()]).unwrap();
        state.session.turn_order = vec![0, 1];
        state
    }

    #[derive(Clone, Default)]
    struct SharedLog(Arc<Mutex<Vec<GameEvent>>>);

    impl EventSink for SharedLog {
        fn publish(&mut self, event: &GameEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    struct Grid;

    impl MovementBackend for Grid {
        fn anchor(&self, tile: &Tile) -> [f32; 3] {
            [(tile.slot % 5) as f32, 0.0, (tile.slot / 5) as f32]
        }
    }

    #[test]
    fn test_headless_session_rolls_and_moves() {
        let mut session = GameSession::new(state()).with_dice(ScriptedDice::new([4]));
        session.start();
        session.submit(0, GameAction::RollDice).unwrap();
        assert_eq!(session.state().session.pending_roll, Some(4));

        session.submit(0, GameAction::ConfirmMove).unwrap();
        assert_eq!(session.state().players[0].tile, 5);
        assert_eq!(session.state().session.phase, TurnPhase::PostMovePlay);
    }

    #[test]
    fn test_missing_dice_source_simulates_roll() {
        let mut session = GameSession::new(state());
        session.start();
        session.submit(0, GameAction::RollDice).unwrap();
        let roll = session.state().session.pending_roll.unwrap();
        assert!((1..=6).contains(&roll));
    }

    #[test]
    fn test_exhausted_script_still_rolls_extra_dice() {
        let mut session = GameSession::new(state()).with_dice(ScriptedDice::new([]));
        session.start();
        session.state_mut().players[0].extra_dice_rolls = 1;

        session.submit(0, GameAction::RollDice).unwrap();
        assert_eq!(session.state().session.phase, TurnPhase::PreMovePlay);
        assert_eq!(session.state().session.pending_roll, Some(2));
        assert!(!session.state().valid_actions(0).is_empty());
    }

    #[test]
    fn test_impossible_roll_is_replaced() {
        let mut session = GameSession::new(state()).with_dice(ScriptedDice::new([40]));
        session.start();

        session.submit(0, GameAction::RollDice).unwrap();
        assert_eq!(session.state().session.phase, TurnPhase::PreMovePlay);
        let roll = session.state().session.pending_roll.unwrap();
        assert!((1..=6).contains(&roll));
    }

    #[test]
    fn test_backend_drives_movement() {
        let mut session = GameSession::new(state())
            .with_dice(ScriptedDice::new([2]))
            .with_backend(Grid);
        session.start();
        session.submit(0, GameAction::RollDice).unwrap();
        session.submit(0, GameAction::ConfirmMove).unwrap();
        assert_eq!(session.state().session.phase, TurnPhase::Moving);

        session.advance_movement().unwrap();
        assert_eq!(session.pawn_anchor(0), Some([1.0, 0.0, 0.0]));
        session.advance_movement().unwrap();
        assert_eq!(session.state().players[0].tile, 3);
        assert_eq!(session.state().session.phase, TurnPhase::PostMovePlay);
        assert_eq!(session.advance_movement(), Err(GameError::NoMovement));
    }

    #[test]
    fn test_sinks_see_every_event() {
        let log = SharedLog::default();
        let mut session = GameSession::new(state())
            .with_dice(ScriptedDice::new([3]))
            .with_sink(log.clone());
        let mut all = session.start();
        all.extend(session.submit(0, GameAction::RollDice).unwrap());

        assert_eq!(*log.0.lock().unwrap(), all);
    }

    #[test]
    fn test_describe_names_players() {
        let state = state();
        let text = describe(
            &state,
            &GameEvent::PlayerReversed {
                by: 0,
                target: 1,
                steps: 3,
            },
        );
        assert_eq!(text.as_deref(), Some("Ann pushed Bo back 3 tiles"));
        assert_eq!(describe(&state, &GameEvent::SkipCleared { player: 0 }), None);
    }
}
