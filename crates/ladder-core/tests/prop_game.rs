//! Property-based tests for movement, boards and whole games.

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use ladder_core::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    /// Forward moves stop on the finish or bounce back by the overshoot.
    #[test]
    fn prop_forward_target_bounces(
        from in 1u32..=100,
        steps in 1u32..=24
    ) {
        let (first, bounce) = MovementEngine::forward_target(from, steps, 100);
        let final_tile = bounce.unwrap_or(first);

        prop_assert!((1..=100).contains(&final_tile));
        if from + steps <= 100 {
            prop_assert_eq!(first, from + steps);
            prop_assert_eq!(bounce, None);
        } else {
            prop_assert_eq!(first, 100);
            prop_assert_eq!(final_tile, (100 - (from + steps - 100)).max(1));
        }
    }

    /// Step paths visit every tile in between exactly once.
    #[test]
    fn prop_step_path_is_contiguous(from in 1u32..=100, to in 1u32..=100) {
        let path = MoveRequest::step_path(from, to);
        prop_assert_eq!(path.len() as u32, from.abs_diff(to));
        if let Some(last) = path.last() {
            prop_assert_eq!(*last, to);
        }
        for pair in path.windows(2) {
            prop_assert_eq!(pair[0].abs_diff(pair[1]), 1);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Shuffling slots never changes what any tile does.
    #[test]
    fn prop_slot_shuffle_keeps_logic(seed in any::<u64>()) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let original = Board::standard();
        let mut board = original.clone();
        board.shuffle(&mut rng);

        let mut slots: Vec<u32> = board.tiles().iter().map(|t| t.slot).collect();
        slots.sort_unstable();
        prop_assert_eq!(slots, (0..100).collect::<Vec<_>>());

        for (a, b) in original.tiles().iter().zip(board.tiles()) {
            prop_assert_eq!(a.id, b.id);
            prop_assert_eq!(a.kind, b.kind);
            prop_assert_eq!(a.target, b.target);
        }
    }

    /// Id shuffles either produce a valid board or leave it untouched.
    #[test]
    fn prop_id_shuffle_stays_valid(seed in any::<u64>()) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let original = Board::standard();
        let mut board = original.clone();

        match board.shuffle_ids(&mut rng) {
            Ok(()) => prop_assert!(board.validate().is_ok()),
            Err(_) => prop_assert_eq!(board.tiles(), original.tiles()),
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Random bot games keep every player inside the rules at every step.
    #[test]
    fn prop_random_games_stay_consistent(seed in any::<u64>(), players in 2usize..=4) {
        let config = GameConfig {
            seed: Some(seed),
            draft_every_turn: seed % 2 == 0,
            ..GameConfig::default()
        };
        let names = (0..players).map(|i| format!("P{}", i)).collect();
        let state = GameState::new(config, names).unwrap();
        let mut session = GameSession::new(state).with_dice(RandomDice::with_seed(seed));
        session.start();

        let mut bots: Vec<Bot> = (0..players as PlayerId)
            .map(|id| Bot::with_seed(id, BotDifficulty::Easy, seed ^ id as u64))
            .collect();

        for _ in 0..1500 {
            let state = session.state();
            if state.is_finished() {
                break;
            }

            for p in &state.players {
                prop_assert!((1..=100).contains(&p.tile));
                prop_assert!(p.hp <= p.max_hp);
                prop_assert!(p.hand.len() <= state.config.hand_limit);
                prop_assert_eq!(p.is_eliminated, p.hp == 0);
            }
            prop_assert!(state.session.cards_played <= state.config.max_cards_per_turn);
            prop_assert!(!state.is_movement_pending());

            let player = state.current_player();
            let action = bots[player as usize].choose_action(state);
            prop_assert!(action.is_some());
            if let Some(action) = action {
                let _ = session.submit(player, action);
            }
        }
    }
}
