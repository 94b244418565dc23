//! Kernel invariants checked across seeds and action plans.

use std::sync::mpsc;

use pdoom_core::prelude::*;
use pdoom_test_utils::determinism::{play_to_hash, run_parallel_sessions_scoped, strategies};
use pdoom_test_utils::fixtures;
use pdoom_test_utils::players::ScriptedPlayer;
use proptest::prelude::*;

fn eventful_content() -> GameContent {
    fixtures::content_with_events(vec![
        fixtures::legendary_event("summit", 2),
        fixtures::rare_event("breakthrough", 0.2, 8),
        fixtures::common_event("press_cycle", 0.3, 2),
    ])
}

fn plan(turns: &[&[&str]]) -> ScriptedPlayer {
    ScriptedPlayer::from_plan(
        turns
            .iter()
            .map(|t| t.iter().map(|a| (*a).to_string()).collect())
            .collect(),
    )
}

// =============================================================================
// Determinism
// =============================================================================

mod determinism {
    use super::*;

    #[test]
    fn test_same_seed_same_inputs_same_hash() {
        let player = ScriptedPlayer::repeating(&[
            "hire_capability_researcher",
            "capability_research",
            "buy_compute",
        ]);
        let run = || {
            let mut session = fixtures::session_with_content("same", eventful_content());
            play_to_hash(&mut session, &player, 20)
        };
        let a = run();
        let b = run();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seed_different_hash() {
        let player = ScriptedPlayer::repeating(&["fundraise"]);
        let a = play_to_hash(&mut fixtures::standard_session("seed-a"), &player, 3);
        let b = play_to_hash(&mut fixtures::standard_session("seed-b"), &player, 3);
        assert_ne!(a, b);
    }

    #[test]
    fn test_parallel_sessions_agree() {
        let player = ScriptedPlayer::repeating(&["hire_safety_researcher", "safety_research"]);
        run_parallel_sessions_scoped(
            || fixtures::session_with_content("parallel", eventful_content()),
            &player,
            8,
            20,
        )
        .assert_deterministic();
    }

    #[test]
    fn test_observers_do_not_affect_hash() {
        let player = ScriptedPlayer::repeating(&["fundraise", "buy_compute"]);
        let quiet = play_to_hash(&mut fixtures::standard_session("observed"), &player, 6);

        let mut observed = fixtures::standard_session("observed");
        let (tx, _rx) = mpsc::channel::<Notification>();
        observed.subscribe(Box::new(tx));
        assert_eq!(play_to_hash(&mut observed, &player, 6), quiet);
    }

    #[test]
    fn test_trail_recomputes_to_head() {
        let mut session = fixtures::session_with_content("trail", eventful_content());
        ScriptedPlayer::repeating(&["hire_compute_engineer", "fundraise"])
            .play(&mut session, 8)
            .unwrap();
        let head =
            VerificationTracker::verify_entries("trail", session.verification_entries()).unwrap();
        assert_eq!(head, session.final_hash());
    }

    #[test]
    fn test_replay_round_trips_through_ron() {
        let mut session = fixtures::session_with_content("replay-ron", eventful_content());
        ScriptedPlayer::repeating(&["hire_manager", "safety_research"])
            .play(&mut session, 6)
            .unwrap();
        let replay = Replay::from_session(&session);
        let text = ron::to_string(&replay).unwrap();
        let parsed: Replay = ron::from_str(&text).unwrap();
        assert_eq!(parsed, replay);
        assert!(parsed.verify(eventful_content()).unwrap());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_runs_are_reproducible(
            seed in strategies::arb_seed(),
            turns in strategies::arb_plan(8),
        ) {
            let player = ScriptedPlayer::from_plan(turns);
            let run = || {
                let mut session = fixtures::session_with_content(&seed, eventful_content());
                play_to_hash(&mut session, &player, 8)
            };
            let a = run();
            let b = run();
            prop_assert_eq!(a, b);
        }
    }
}

// =============================================================================
// Hash sensitivity
// =============================================================================

mod sensitivity {
    use super::*;

    const BASELINE: &[&[&str]] = &[
        &["hire_safety_researcher", "buy_compute"],
        &["safety_research", "fundraise"],
    ];

    fn run(player: &ScriptedPlayer) -> [u8; 32] {
        play_to_hash(&mut fixtures::standard_session("sensitivity"), player, 2)
    }

    #[test]
    fn test_changing_one_action_changes_hash() {
        let changed = plan(&[
            &["hire_safety_researcher", "buy_compute"],
            &["capability_research", "fundraise"],
        ]);
        assert_ne!(run(&plan(BASELINE)), run(&changed));
    }

    #[test]
    fn test_reordering_actions_changes_hash() {
        let reordered = plan(&[
            &["buy_compute", "hire_safety_researcher"],
            &["safety_research", "fundraise"],
        ]);
        assert_ne!(run(&plan(BASELINE)), run(&reordered));
    }

    #[test]
    fn test_changing_event_choice_changes_hash() {
        let fork = EventDefinition::new(
            "fork",
            Rarity::Legendary,
            vec![fixtures::free_option("left"), fixtures::free_option("right")],
        )
        .with_fixed_turn(1);
        let content = fixtures::content_with_events(vec![fork]);
        let run_with = |choice: &str| {
            let player = ScriptedPlayer::repeating(&["fundraise"]).with_choice("fork", choice);
            play_to_hash(&mut fixtures::session_with_content("fork", content.clone()), &player, 3)
        };
        assert_eq!(run_with("left"), run_with("left"));
        assert_ne!(run_with("left"), run_with("right"));
    }
}

// =============================================================================
// Action points
// =============================================================================

mod action_points {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// The ledger never goes negative and rejected selections change nothing.
        #[test]
        fn prop_ap_conservation(
            seed in strategies::arb_seed(),
            turns in strategies::arb_plan(10),
            reserve in 0u32..3,
        ) {
            let mut session = fixtures::session_with_content(&seed, eventful_content());
            let player = ScriptedPlayer::from_plan(Vec::new());

            for actions in &turns {
                if session.state().game_over() {
                    break;
                }
                player.resolve_events(&mut session).unwrap();
                if reserve > 0 {
                    let _ = session.reserve_ap(reserve);
                }
                for action in actions {
                    let before = session.get_game_state();
                    if session.select_action(action).is_err() {
                        let after = session.get_game_state();
                        prop_assert_eq!(&before.queued_actions, &after.queued_actions);
                        prop_assert_eq!(before.ap, after.ap);
                    }
                    prop_assert!(session.state().ap.is_consistent());
                }
                if session.state().queued_actions.is_empty()
                    && session.select_action("buy_compute").is_err()
                {
                    let _ = session.select_action("fundraise");
                }
                if session.state().queued_actions.is_empty() {
                    break;
                }
                session.end_turn().unwrap();
                prop_assert!(session.state().ap.is_consistent());
            }
        }
    }

    #[test]
    fn test_over_cost_selection_rejected() {
        let mut session = fixtures::standard_session("over-cost");
        session.select_action("fundraise").unwrap();
        let err = session.select_action("fundraise").unwrap_err();
        assert_eq!(
            err,
            GameError::InsufficientActionPoints {
                required: 2,
                available: 1
            }
        );
        assert_eq!(session.state().queued_actions, vec!["fundraise".to_string()]);
        assert_eq!(session.state().ap.committed, 2);
    }

    #[test]
    fn test_unaffordable_selection_rejected() {
        let mut session =
            GameSession::start_new_game("broke", &fixtures::money_overrides(0)).unwrap();
        let before = session.get_game_state();

        let err = session.select_action("hire_safety_researcher").unwrap_err();
        assert_eq!(
            err,
            GameError::InsufficientResources {
                resource: Resource::Money,
                required: fixtures::fixed(25_000),
                available: Fixed::ZERO,
            }
        );
        assert_eq!(err.category(), ErrorCategory::Resource);

        let after = session.get_game_state();
        assert!(after.queued_actions.is_empty());
        assert_eq!(after.ap, before.ap);
        assert_eq!(after.resources, before.resources);
        assert_eq!(session.recent_errors().last().unwrap().category, ErrorCategory::Resource);
    }
}

// =============================================================================
// Doom bounds
// =============================================================================

mod doom_bounds {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_doom_stays_in_range(
            seed in strategies::arb_seed(),
            turns in strategies::arb_plan(12),
            money in strategies::arb_money(),
        ) {
            let mut session = GameSession::start_with_content(
                &seed,
                &fixtures::money_overrides(money),
                eventful_content(),
            )
            .unwrap();
            let player = ScriptedPlayer::from_plan(turns);
            for _ in 0..40 {
                if session.state().game_over() {
                    break;
                }
                let report = player.play_turn(&mut session).unwrap();
                prop_assert!(report.doom.doom >= Fixed::ZERO);
                prop_assert!(report.doom.doom <= fixtures::fixed(100));
            }
            let doom = session.get_game_state().doom;
            prop_assert!(doom >= Fixed::ZERO && doom <= fixtures::fixed(100));
        }
    }
}

// =============================================================================
// Event gating
// =============================================================================

mod gating {
    use super::*;

    #[test]
    fn test_pending_events_block_selection() {
        let content = fixtures::content_with_events(vec![fixtures::legendary_event("opening", 0)]);
        let mut session = fixtures::session_with_content("gating", content);
        assert_eq!(session.phase(), Phase::EventResolution);
        let ap_before = session.state().ap;

        for action in ["buy_compute", "fundraise", "safety_research"] {
            let err = session.select_action(action).unwrap_err();
            assert!(matches!(err, GameError::InvalidPhase { .. }));
        }
        assert_eq!(session.state().ap, ap_before);
        assert!(session.state().queued_actions.is_empty());
        assert!(session.end_turn().is_err());

        session.resolve_event("opening", "acknowledge").unwrap();
        assert_eq!(session.phase(), Phase::ActionSelection);
        session.select_action("buy_compute").unwrap();
    }

    #[test]
    fn test_unknown_event_and_choice_rejected() {
        let content = fixtures::content_with_events(vec![fixtures::legendary_event("opening", 0)]);
        let mut session = fixtures::session_with_content("gating-unknown", content);
        assert_eq!(
            session.resolve_event("nope", "acknowledge").unwrap_err(),
            GameError::UnknownEvent("nope".into())
        );
        assert!(matches!(
            session.resolve_event("opening", "nope").unwrap_err(),
            GameError::UnknownChoice { .. }
        ));
        assert_eq!(session.state().pending_events.len(), 1);
        assert_eq!(session.recent_errors().count(), 2);
    }
}

// =============================================================================
// Snapshots and notifications
// =============================================================================

mod surface {
    use super::*;

    #[test]
    fn test_snapshot_is_idempotent() {
        let mut session = fixtures::session_with_content("snapshot", eventful_content());
        ScriptedPlayer::repeating(&["hire_safety_researcher"])
            .play(&mut session, 3)
            .unwrap();
        assert_eq!(session.get_game_state(), session.get_game_state());

        let before = session.get_game_state();
        let _ = session.start_turn();
        assert_eq!(session.get_game_state(), before);
    }

    #[test]
    fn test_notifications_reach_observers() {
        let mut session = fixtures::standard_session("notify");
        let (tx, rx) = mpsc::channel::<Notification>();
        session.subscribe(Box::new(tx));

        session.select_action("buy_compute").unwrap();
        let _ = session.select_action("no_such_action");
        session.end_turn().unwrap();

        let received: Vec<Notification> = rx.try_iter().collect();
        assert!(received.iter().any(|n| matches!(
            n,
            Notification::ActionExecuted(r) if r.action_id == "buy_compute" && r.success
        )));
        assert!(received.iter().any(|n| matches!(
            n,
            Notification::ErrorOccurred(e) if e.category == ErrorCategory::Validation
        )));
        assert!(received.iter().any(|n| matches!(
            n,
            Notification::TurnPhaseChanged {
                from: Phase::ActionSelection,
                to: Phase::TurnEnd
            }
        )));
        assert!(received
            .iter()
            .any(|n| matches!(n, Notification::GameStateUpdated { turn: 1 })));
    }

    #[test]
    fn test_event_triggered_notification() {
        let content = fixtures::content_with_events(vec![fixtures::legendary_event("launch", 1)]);
        let mut session = fixtures::session_with_content("notify-event", content);
        let (tx, rx) = mpsc::channel::<Notification>();
        session.subscribe(Box::new(tx));

        session.select_action("fundraise").unwrap();
        let report = session.end_turn().unwrap();
        assert_eq!(report.triggered_events.len(), 1);
        assert!(rx
            .try_iter()
            .any(|n| n == Notification::EventTriggered { event_id: "launch".into(), turn: 1 }));
    }
}
