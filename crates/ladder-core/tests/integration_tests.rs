//! Integration tests for the ladder game engine.
//!
//! These tests drive complete turns through a [`GameSession`] on the
//! standard board, from the first roll through to a finished game.

use ladder_core::*;

/// A two-player session on the standard board with a fixed turn order
fn session(rolls: Vec<u32>) -> GameSession {
    let config = GameConfig {
        seed: Some(42),
        ..GameConfig::default()
    };
    let mut state = GameState::new(config, vec!["Alice".into(), "Bob".into()]).unwrap();
    state.session.turn_order = vec![0, 1];
    let mut session = GameSession::new(state).with_dice(ScriptedDice::new(rolls));
    session.start();
    session
}

/// Roll and move the current player, returning every event of the turn so far
fn take_move(session: &mut GameSession) -> Vec<GameEvent> {
    let player = session.state().current_player();
    let mut events = session.submit(player, GameAction::RollDice).unwrap();
    events.extend(session.submit(player, GameAction::ConfirmMove).unwrap());
    if matches!(
        session.state().session.pending_choice,
        Some(PendingChoice::ReverseOrMove { .. })
    ) {
        events.extend(session.submit(player, GameAction::MoveSelf).unwrap());
    }
    events
}

fn finishes(events: &[GameEvent]) -> Vec<TileId> {
    events
        .iter()
        .filter_map(|e| match e {
            GameEvent::MovementFinished { final_tile, .. } => Some(*final_tile),
            _ => None,
        })
        .collect()
}

#[test]
fn test_turn_order_drawn_before_first_turn() {
    let state = GameState::with_players(vec!["A".into(), "B".into(), "C".into()]).unwrap();
    let rolls = &state.session.initial_rolls;
    let order = &state.session.turn_order;

    for pair in order.windows(2) {
        let first = rolls.iter().find(|(id, _)| *id == pair[0]).unwrap().1;
        let second = rolls.iter().find(|(id, _)| *id == pair[1]).unwrap().1;
        assert!(first > second || (first == second && pair[0] < pair[1]));
    }
}

#[test]
fn test_overshoot_from_98_lands_on_97() {
    let mut session = session(vec![5]);
    session.state_mut().players[0].tile = 98;

    let events = take_move(&mut session);

    assert_eq!(finishes(&events), vec![100, 97]);
    assert_eq!(session.state().players[0].tile, 97);
    assert!(session.state().winners().is_empty());
    assert_eq!(session.state().session.phase, TurnPhase::PostMovePlay);
}

#[test]
fn test_exact_roll_wins_once() {
    let mut session = session(vec![4]);
    session.state_mut().players[0].tile = 96;

    let events = take_move(&mut session);

    let wins = events
        .iter()
        .filter(|e| matches!(e, GameEvent::PlayerWon { .. }))
        .count();
    assert_eq!(wins, 1);
    assert_eq!(session.state().winners(), &[0]);
    assert!(session.state().is_finished());
    assert_eq!(session.state().loser(), Some(1));
    assert!(!events
        .iter()
        .any(|e| matches!(e, GameEvent::TileLanded { tile: 100, .. })));
}

#[test]
fn test_snake_immunity_keeps_position() {
    let mut session = session(vec![3]);
    session.state_mut().players[0].tile = 13;
    session.state_mut().players[0].immune_snake_uses = 1;

    take_move(&mut session);

    let alice = &session.state().players[0];
    assert_eq!(alice.tile, 16);
    assert_eq!(alice.immune_snake_uses, 0);
}

#[test]
fn test_snake_without_immunity_slides() {
    let mut session = session(vec![3]);
    session.state_mut().players[0].tile = 13;

    let events = take_move(&mut session);

    assert_eq!(finishes(&events), vec![16, 6]);
    assert_eq!(session.state().players[0].tile, 6);
}

#[test]
fn test_ladder_climbs() {
    let mut session = session(vec![3]);
    let events = take_move(&mut session);

    assert_eq!(finishes(&events), vec![4, 14]);
    assert_eq!(session.state().players[0].tile, 14);
}

#[test]
fn test_forced_moves_do_not_trigger_tiles() {
    let mut session = session(vec![2]);
    {
        let state = session.state_mut();
        state.players[1].tile = 19;
        state.players[0]
            .hand
            .add(CardInstance::new(CardKind::ZeusWrath, 0), 5);
    }

    session.submit(0, GameAction::RollDice).unwrap();
    session.submit(0, GameAction::PlayCard(0)).unwrap();
    let events = session.submit(0, GameAction::ChooseTarget(1)).unwrap();

    // Pushed from 19 onto the snake head at 16 without sliding
    assert_eq!(session.state().players[1].tile, 16);
    assert!(!events
        .iter()
        .any(|e| matches!(e, GameEvent::TileLanded { player: 1, .. })));
}

#[test]
fn test_reverse_choice_flow() {
    let mut session = session(vec![3]);
    session.state_mut().players[1].tile = 30;

    session.submit(0, GameAction::RollDice).unwrap();
    let events = session.submit(0, GameAction::ConfirmMove).unwrap();
    assert!(events.contains(&GameEvent::ReverseOffered {
        player: 0,
        eligible: vec![1]
    }));

    session.submit(0, GameAction::ChooseReverse).unwrap();
    session.submit(0, GameAction::ChooseTarget(1)).unwrap();

    let state = session.state();
    assert_eq!(state.players[1].tile, 27);
    assert_eq!(state.players[0].tile, 1);
    assert_eq!(state.session.phase, TurnPhase::PostMovePlay);

    // Already reversed this cycle
    assert!(state.reverse_candidates(0).is_empty());
}

#[test]
fn test_invalid_actions_leave_state_alone() {
    let mut session = session(vec![3]);
    let before = serde_json::to_value(session.state()).unwrap();

    assert_eq!(
        session.submit(1, GameAction::RollDice),
        Err(GameError::NotYourTurn)
    );
    assert_eq!(
        session.submit(0, GameAction::EndTurn),
        Err(GameError::InvalidTransition)
    );
    assert_eq!(
        session.submit(0, GameAction::ChooseTarget(1)),
        Err(GameError::InvalidTransition)
    );

    assert_eq!(serde_json::to_value(session.state()).unwrap(), before);
}

#[test]
fn test_cycles_expire_cards() {
    let mut session = session(vec![1; 16]);
    session.state_mut().players[1]
        .hand
        .add(CardInstance::new(CardKind::HeraVeil, 0), 5);

    for _ in 0..6 {
        let player = session.state().current_player();
        take_move(&mut session);
        session.submit(player, GameAction::EndTurn).unwrap();
    }

    assert_eq!(session.state().session.current_cycle, 3);
    assert!(session.state().players[1].hand.is_empty());
}

#[test]
fn test_event_log_sink_collects() {
    let config = GameConfig {
        seed: Some(1),
        ..GameConfig::default()
    };
    let state = GameState::new(config, vec!["A".into(), "B".into()]).unwrap();
    let mut session = GameSession::new(state).with_sink(EventLog::default());
    let events = session.start();
    assert!(matches!(events[0], GameEvent::GameStarted { .. }));
}

fn play_out(difficulty: BotDifficulty, players: usize, seed: u64) -> GameState {
    let config = GameConfig {
        seed: Some(seed),
        draft_every_turn: true,
        ..GameConfig::default()
    };
    let names = (0..players).map(|i| format!("Bot {}", i)).collect();
    let state = GameState::new(config, names).unwrap();
    let mut session = GameSession::new(state).with_dice(RandomDice::with_seed(seed));
    session.start();

    let mut bots: Vec<Bot> = (0..players as PlayerId)
        .map(|id| Bot::with_seed(id, difficulty, seed + id as u64))
        .collect();

    let max_actions = 20_000;
    for _ in 0..max_actions {
        if session.state().is_finished() {
            break;
        }
        let player = session.state().current_player();
        let action = bots[player as usize]
            .choose_action(session.state())
            .expect("current player always has an action");
        if session.submit(player, action).is_err() {
            // Fall back to the first legal action
            let fallback = session.state().valid_actions(player)[0];
            let _ = session.submit(player, fallback);
        }
    }

    session.state().clone()
}

#[test]
fn test_bot_games_finish() {
    for (difficulty, players, seed) in [
        (BotDifficulty::Easy, 2, 1),
        (BotDifficulty::Medium, 3, 2),
        (BotDifficulty::Hard, 4, 3),
        (BotDifficulty::Medium, 4, 4),
    ] {
        let state = play_out(difficulty, players, seed);
        assert!(state.is_finished(), "{:?} game did not finish", difficulty);

        let mut winners = state.winners().to_vec();
        winners.sort_unstable();
        winners.dedup();
        assert_eq!(winners.len(), state.winners().len(), "winners are unique");

        for player in &state.players {
            assert!((1..=100).contains(&player.tile));
            assert!(player.hp <= player.max_hp);
            assert!(player.hand.len() <= state.config.hand_limit);
        }
    }
}
