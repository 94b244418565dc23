//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a session produces an identical
//! verification chain given an identical seed and identical inputs.
//!
//! # Testing Strategy
//!
//! Leaderboard results are only trustworthy if the final hash is
//! bit-identical everywhere. Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`pdoom_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Digested structures only use `BTreeMap` and `Vec`.
//!
//! - **System randomness**: Every chance outcome draws from the session's
//!   seeded RNG, and every draw is chained.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual subsystem determinism (events, rivals, doom)
//! 2. **Property tests**: Random seeds and plans must still replay identically
//! 3. **Integration tests**: Full sessions are reproducible
//! 4. **Parallel tests**: Running N sessions on threads all match

use std::thread;

use pdoom_core::prelude::*;
use pdoom_core::verification::{to_hex, ChainHash};

use crate::players::ScriptedPlayer;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Final chain heads from each run.
    pub hashes: Vec<ChainHash>,
    /// Number of turns played.
    pub turns: u32,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic session).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<ChainHash> {
        let mut unique = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            let rendered: Vec<String> = self.hashes.iter().map(to_hex).collect();
            panic!(
                "Session is non-deterministic!\n\
                 Runs: {}\n\
                 Turns: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.turns,
                unique.len(),
                rendered
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `turns` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance by one turn
/// * `hash` - Function to read the final hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    turns: u32,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> ChainHash,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..turns {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        turns,
    }
}

/// Play a session for `turns` turns with `player`, returning the chain head.
///
/// Turn failures (e.g. the game ending early) stop play; the head at that
/// point is returned.
pub fn play_to_hash(session: &mut GameSession, player: &ScriptedPlayer, turns: u32) -> ChainHash {
    let _ = player.play(session, turns);
    session.final_hash()
}

/// Run a session setup twice with the same player and compare chain heads.
pub fn verify_session_determinism<F>(setup_fn: F, player: &ScriptedPlayer, turns: u32) -> bool
where
    F: Fn() -> GameSession,
{
    verify_determinism(
        2,
        turns,
        &setup_fn,
        |session| {
            let _ = player.play_turn(session);
        },
        GameSession::final_hash,
    )
    .is_deterministic
}

/// Result of parallel session runs.
#[derive(Debug, Clone)]
pub struct ParallelRunResult {
    /// Final chain head from each session.
    pub hashes: Vec<ChainHash>,
    /// Number of turns each session ran.
    pub turns: u32,
    /// Number of sessions run.
    pub num_sessions: usize,
}

impl ParallelRunResult {
    /// Check if all sessions produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all sessions matched.
    ///
    /// # Panics
    ///
    /// Panics if sessions produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let rendered: Vec<String> = self.hashes.iter().map(to_hex).collect();
            panic!(
                "Parallel sessions diverged!\n\
                 Sessions: {}\n\
                 Turns: {}\n\
                 All hashes: {:?}",
                self.num_sessions, self.turns, rendered
            );
        }
    }
}

/// Run N sessions on scoped threads and collect their chain heads.
///
/// Catches non-determinism that only shows up under thread scheduling or
/// memory layout differences.
pub fn run_parallel_sessions_scoped<F>(
    setup_fn: F,
    player: &ScriptedPlayer,
    num_sessions: usize,
    turns: u32,
) -> ParallelRunResult
where
    F: Fn() -> GameSession + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sessions)
            .map(|_| {
                s.spawn(|| {
                    let mut session = setup_fn();
                    play_to_hash(&mut session, player, turns)
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    ParallelRunResult {
        hashes,
        turns,
        num_sessions,
    }
}

/// Compare two runs turn by turn, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs match, `Some(turn)` for the first turn whose chain
/// head differs (0 means the genesis differs).
pub fn find_first_divergence<F>(setup_fn: F, player: &ScriptedPlayer, turns: u32) -> Option<u32>
where
    F: Fn() -> GameSession,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.final_hash() != b.final_hash() {
        return Some(0);
    }

    for turn in 1..=turns {
        let _ = player.play_turn(&mut a);
        let _ = player.play_turn(&mut b);

        if a.final_hash() != b.final_hash() {
            return Some(turn);
        }
    }

    None
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible seeds and action
/// plans for property-based testing.
pub mod strategies {
    use proptest::prelude::*;

    /// Ids of the standard action catalog.
    pub const STANDARD_ACTIONS: [&str; 12] = [
        "hire_safety_researcher",
        "hire_capability_researcher",
        "hire_compute_engineer",
        "hire_manager",
        "fire_researcher",
        "buy_compute",
        "safety_research",
        "capability_research",
        "publish_paper",
        "fundraise",
        "team_retreat",
        "lobby_government",
    ];

    /// Generate a session seed.
    pub fn arb_seed() -> impl Strategy<Value = String> {
        "[a-z0-9-]{1,16}"
    }

    /// Generate a standard action id.
    pub fn arb_action_id() -> impl Strategy<Value = String> {
        proptest::sample::select(STANDARD_ACTIONS.to_vec()).prop_map(str::to_string)
    }

    /// Generate one turn's action list.
    pub fn arb_turn_plan(max_len: usize) -> impl Strategy<Value = Vec<String>> {
        proptest::collection::vec(arb_action_id(), 0..max_len)
    }

    /// Generate a multi-turn plan.
    pub fn arb_plan(max_turns: usize) -> impl Strategy<Value = Vec<Vec<String>>> {
        proptest::collection::vec(arb_turn_plan(4), 1..max_turns)
    }

    /// Generate a starting money amount.
    pub fn arb_money() -> impl Strategy<Value = i32> {
        0i32..500_000i32
    }
}
