//! End-to-end gameplay scenarios.
//!
//! Each test drives a full session through the public entry points and
//! checks one observable outcome.

use pdoom_core::prelude::*;
use pdoom_test_utils::balance::run_batch;
use pdoom_test_utils::fixtures;
use pdoom_test_utils::players::ScriptedPlayer;

// =============================================================================
// Economy
// =============================================================================

mod economy {
    use super::*;

    /// Queued hires and purchases are paid at turn end.
    #[test]
    fn test_first_turn_purchases() {
        let mut session =
            GameSession::start_new_game("test-001", &fixtures::money_overrides(100_000)).unwrap();
        let compute_before = session.state().resources.compute;

        session.select_action("hire_safety_researcher").unwrap();
        session.select_action("buy_compute").unwrap();
        assert_eq!(session.state().ap.committed, 2);

        let report = session.end_turn().unwrap();
        assert!(report.action_results.iter().all(|r| r.success));

        let snapshot = session.get_game_state();
        assert_eq!(snapshot.resources.money, fixtures::fixed(65_000));
        assert_eq!(snapshot.staff_count(Specialization::Safety), 1);
        assert!(snapshot.resources.compute > compute_before);
        assert_eq!(snapshot.ap.committed, 0);
    }

    /// An action that became unaffordable is skipped; the rest still run.
    #[test]
    fn test_partial_failure_skips_only_offender() {
        let mut session =
            GameSession::start_new_game("partial", &fixtures::money_overrides(30_000)).unwrap();
        session.select_action("hire_safety_researcher").unwrap();
        session.select_action("buy_compute").unwrap();
        session.select_action("safety_research").unwrap();

        let report = session.end_turn().unwrap();
        let outcomes: Vec<(&str, bool)> = report
            .action_results
            .iter()
            .map(|r| (r.action_id.as_str(), r.success))
            .collect();
        assert_eq!(
            outcomes,
            vec![
                ("hire_safety_researcher", true),
                ("buy_compute", false),
                ("safety_research", true),
            ]
        );
        assert!(matches!(
            report.action_results[1].error,
            Some(GameError::InsufficientResources {
                resource: Resource::Money,
                ..
            })
        ));
        assert_eq!(session.state().resources.money, fixtures::fixed(5_000));
        assert!(session
            .recent_errors()
            .any(|e| e.category == ErrorCategory::Resource));
    }

    /// Payroll is debited every fourth turn and can bankrupt the lab.
    #[test]
    fn test_payroll_bankrupts() {
        let overrides = ScenarioOverrides {
            starting_money: Some(fixtures::fixed(25_500)),
            salary: Some(fixtures::fixed(1_000)),
            ..ScenarioOverrides::default()
        };
        let mut session = GameSession::start_new_game("payroll", &overrides).unwrap();
        session.select_action("hire_safety_researcher").unwrap();
        session.end_turn().unwrap();
        assert_eq!(session.state().resources.money, fixtures::fixed(500));

        let player = ScriptedPlayer::repeating(&["safety_research"]);
        let reports = player.play(&mut session, 10).unwrap();
        let payday = reports.iter().find(|r| r.payroll > Fixed::ZERO).unwrap();
        assert_eq!(payday.turn, 3);
        assert_eq!(payday.outcome, Some(GameOutcome::Bankrupt));
        assert!(session.state().resources.money < Fixed::ZERO);
        assert!(!session.submission().unwrap().victory);
    }
}

// =============================================================================
// Doom
// =============================================================================

mod doom {
    use super::*;

    /// Without safety work nothing pulls doom down.
    #[test]
    fn test_capability_only_play_never_lowers_doom() {
        let mut plan = vec![vec![
            "hire_capability_researcher".to_string(),
            "capability_research".to_string(),
        ]];
        plan.extend(
            std::iter::repeat(vec![
                "buy_compute".to_string(),
                "capability_research".to_string(),
            ])
            .take(9),
        );
        let player = ScriptedPlayer::from_plan(plan);
        let mut session =
            GameSession::start_new_game("doom-monotone", &fixtures::money_overrides(500_000))
                .unwrap();
        assert_eq!(session.state().doom, fixtures::fixed(20));

        let mut previous = session.state().doom;
        for _ in 0..10 {
            if session.state().game_over() {
                break;
            }
            let report = player.play_turn(&mut session).unwrap();
            assert!(report.action_results.iter().all(|r| r.action_id != "safety_research"));
            assert!(
                report.doom.doom >= previous,
                "doom fell from {previous} to {} on turn {}",
                report.doom.doom,
                report.turn
            );
            previous = report.doom.doom;
        }
        assert!(previous > fixtures::fixed(20));
    }

    /// Doom at the ceiling ends the game and clamps at 100.
    #[test]
    fn test_doom_reached_ends_game() {
        let overrides = ScenarioOverrides {
            starting_doom: Some(fixtures::fixed_f(99.9)),
            ..ScenarioOverrides::default()
        };
        let mut session = GameSession::start_new_game("doomed", &overrides).unwrap();
        session.select_action("capability_research").unwrap();
        let report = session.end_turn().unwrap();

        assert_eq!(report.outcome, Some(GameOutcome::DoomReached));
        assert!(report.doom.clamped);
        assert_eq!(session.state().doom, fixtures::fixed(100));
        assert!(report.triggered_events.is_empty());
        assert_eq!(session.start_turn().unwrap_err(), GameError::GameOver);
    }

    fn safety_lab(victory_min_turn: u32) -> GameSession {
        let overrides = ScenarioOverrides {
            starting_money: Some(fixtures::fixed(500_000)),
            starting_doom: Some(fixtures::fixed(3)),
            victory_min_turn: Some(victory_min_turn),
            ..fixtures::no_rivals()
        };
        GameSession::start_new_game("safety-lab", &overrides).unwrap()
    }

    fn safety_player() -> ScriptedPlayer {
        ScriptedPlayer::repeating(&[
            "hire_safety_researcher",
            "hire_safety_researcher",
            "safety_research",
        ])
    }

    /// Doom driven to zero once the minimum turn has passed wins the game.
    #[test]
    fn test_zero_doom_after_min_turn_is_victory() {
        let mut session = safety_lab(2);
        let reports = safety_player().play(&mut session, 10).unwrap();

        let last = reports.last().unwrap();
        assert_eq!(last.turn, 2);
        assert_eq!(last.outcome, Some(GameOutcome::Victory));
        assert_eq!(session.state().doom, Fixed::ZERO);
        assert!(session.submission().unwrap().victory);
    }

    /// Reaching zero early does not end the game before the minimum turn.
    #[test]
    fn test_zero_doom_before_min_turn_keeps_playing() {
        let mut session = safety_lab(5);
        let reports = safety_player().play(&mut session, 10).unwrap();

        let first_zero = reports.iter().find(|r| r.doom.doom == Fixed::ZERO).unwrap();
        assert!(first_zero.turn < 5);
        assert!(reports.iter().filter(|r| r.turn < 5).all(|r| r.outcome.is_none()));
        let last = reports.last().unwrap();
        assert_eq!(last.turn, 5);
        assert_eq!(last.outcome, Some(GameOutcome::Victory));
    }
}

// =============================================================================
// Events
// =============================================================================

mod events {
    use super::*;

    /// A legendary event fires on its scheduled turn in every session.
    #[test]
    fn test_legendary_event_fires_on_schedule_for_every_seed() {
        let content =
            fixtures::content_with_events(vec![fixtures::legendary_event("milestone", 10)]);
        let player = ScriptedPlayer::repeating(&["fundraise"]);

        let mut hits = 0;
        for seed in fixtures::seeds("legendary", 100) {
            let mut session = fixtures::session_with_content(&seed, content.clone());
            player.play(&mut session, 10).unwrap();
            assert_eq!(session.turn(), 10);
            if session
                .state()
                .pending_events
                .iter()
                .any(|e| e.event_id == "milestone" && e.triggered_turn == 10)
            {
                hits += 1;
            }
        }
        assert_eq!(hits, 100);
    }

    /// A rare event's trigger rate over its window matches 1 - (1 - p)^w.
    #[test]
    fn test_rare_event_rate_matches_window_probability() {
        const SESSIONS: usize = 1000;
        let probability = 0.06_f64;
        let window = 26_u32;

        let content = fixtures::content_with_events(vec![fixtures::rare_event(
            "breakthrough",
            probability,
            window,
        )]);
        let player = ScriptedPlayer::repeating(&["fundraise"]);
        let stats = run_batch(
            &fixtures::seeds("rare", SESSIONS),
            &fixtures::no_rivals(),
            &content,
            &player,
            window - 1,
        )
        .unwrap();

        let expected = 1.0 - (1.0 - probability).powi(i32::try_from(window).unwrap());
        let observed = stats.event_rate("breakthrough");
        assert!(
            (observed - expected).abs() < 0.05,
            "observed {observed:.3}, expected {expected:.3}"
        );
    }

    /// Rare events never fire after their window closes.
    #[test]
    fn test_rare_event_never_fires_after_window() {
        let content = fixtures::content_with_events(vec![fixtures::rare_event("flash", 0.5, 3)]);
        let player = ScriptedPlayer::repeating(&["fundraise"]);
        let mut session = fixtures::session_with_content("rare-window", content);
        let reports = player.play(&mut session, 10).unwrap();

        assert!(reports
            .iter()
            .filter(|r| r.turn >= 2)
            .all(|r| r.triggered_events.is_empty()));
        let fired = session
            .inputs()
            .iter()
            .filter(|i| matches!(i, PlayerInput::ResolveEvent { event, .. } if event == "flash"))
            .count();
        assert!(fired <= 1);
    }

    /// Paid options need the reserve and the money up front.
    #[test]
    fn test_paid_option_uses_reserved_ap() {
        let summit = EventDefinition::new(
            "summit",
            Rarity::Legendary,
            vec![
                fixtures::free_option("ignore"),
                EventOption::new(
                    "attend",
                    ResourceMap::new().with(Resource::Reputation, fixtures::fixed(5)),
                )
                .with_costs(ResourceMap::new().with(Resource::Money, fixtures::fixed(10_000)))
                .with_ap_cost(1),
            ],
        )
        .with_fixed_turn(1);
        let content = fixtures::content_with_events(vec![summit]);
        let mut session = fixtures::session_with_content("summit", content);

        session.reserve_ap(1).unwrap();
        session.select_action("buy_compute").unwrap();
        session.end_turn().unwrap();
        assert_eq!(session.phase(), Phase::EventResolution);
        assert_eq!(session.state().ap.reserved, 1);

        let reputation = session.state().resources.reputation;
        let resolved = session.resolve_event("summit", "attend").unwrap();
        assert!(resolved.phase_transitioned);
        assert_eq!(session.state().resources.reputation, reputation + fixtures::fixed(5));
        assert_eq!(session.state().ap.action_points, 3);
        assert_eq!(session.state().ap.reserved, 0);
        assert_eq!(session.state().get_available_ap(), 3);
    }

    /// A reserve nobody needed comes back as free AP next turn.
    #[test]
    fn test_unused_reserve_returns_next_turn() {
        let mut session = fixtures::standard_session("reserve-unused");
        session.reserve_ap(1).unwrap();
        session.select_action("buy_compute").unwrap();
        let report = session.end_turn().unwrap();

        assert!(report.triggered_events.is_empty());
        assert_eq!(session.phase(), Phase::ActionSelection);
        assert_eq!(session.state().ap.reserved, 0);
        assert_eq!(session.state().get_available_ap(), 4);
    }

    /// Without a reserve the paid option is refused and nothing changes.
    #[test]
    fn test_paid_option_refused_without_reserve() {
        let summit = EventDefinition::new(
            "summit",
            Rarity::Legendary,
            vec![
                fixtures::free_option("ignore"),
                EventOption::new("attend", ResourceMap::new()).with_ap_cost(1),
            ],
        )
        .with_fixed_turn(0);
        let mut session = fixtures::session_with_content(
            "summit-refused",
            fixtures::content_with_events(vec![summit]),
        );

        let err = session.resolve_event("summit", "attend").unwrap_err();
        assert_eq!(
            err,
            GameError::InsufficientActionPoints {
                required: 1,
                available: 0
            }
        );
        assert_eq!(session.state().pending_events.len(), 1);
        assert!(session.resolve_event("summit", "ignore").unwrap().phase_transitioned);
    }
}
