//! Tamper-evident verification chain.
//!
//! Every RNG draw, executed action, event choice and turn-end state
//! digest is folded into a running SHA-256 chain:
//! `H_n = SHA-256(H_{n-1} || turn || kind || payload_digest)`.
//! Payload digests hash `bincode` encodings of integer-only structures, so
//! the chain is identical on every platform for the same inputs.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{GameError, Result};
use crate::resources::Resources;
use crate::rng::RngDraw;

/// A chain head or payload digest.
pub type ChainHash = [u8; 32];

const GENESIS_DOMAIN: &[u8] = b"pdoom/verification/v1";

/// What an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// An RNG draw.
    Rng,
    /// A queued action reaching execution.
    Action,
    /// A choice made for a pending event.
    EventChoice,
    /// A sealed turn.
    TurnEnd,
}

impl EntryKind {
    const fn tag(self) -> u8 {
        match self {
            Self::Rng => 1,
            Self::Action => 2,
            Self::EventChoice => 3,
            Self::TurnEnd => 4,
        }
    }
}

/// One append-only chain entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationEntry {
    /// Turn the entry belongs to.
    pub turn: u32,
    /// Entry kind.
    pub kind: EntryKind,
    /// SHA-256 of the entry payload.
    pub payload_digest: ChainHash,
    /// Chain head after this entry.
    pub chain_hash: ChainHash,
}

#[derive(Serialize)]
struct RngPayload<'a> {
    index: u64,
    purpose: &'a str,
    value: u64,
}

#[derive(Serialize)]
struct ActionPayload<'a> {
    action: &'a str,
    executed: bool,
}

#[derive(Serialize)]
struct ChoicePayload<'a> {
    event: &'a str,
    choice: &'a str,
}

fn payload_digest<T: Serialize>(payload: &T) -> Result<ChainHash> {
    let bytes = bincode::serialize(payload)
        .map_err(|e| GameError::Integrity(format!("failed to encode chain payload: {e}")))?;
    Ok(Sha256::digest(&bytes).into())
}

fn genesis(seed: &str) -> ChainHash {
    let mut hasher = Sha256::new();
    hasher.update(GENESIS_DOMAIN);
    hasher.update(seed.as_bytes());
    hasher.finalize().into()
}

fn link(previous: &ChainHash, turn: u32, kind: EntryKind, payload: &ChainHash) -> ChainHash {
    let mut hasher = Sha256::new();
    hasher.update(previous);
    hasher.update(turn.to_le_bytes());
    hasher.update([kind.tag()]);
    hasher.update(payload);
    hasher.finalize().into()
}

/// Lowercase hex rendering of a hash.
#[must_use]
pub fn to_hex(hash: &ChainHash) -> String {
    hash.iter().fold(String::with_capacity(64), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

/// Builds the chain for one session.
#[derive(Debug, Clone)]
pub struct VerificationTracker {
    seed: String,
    head: ChainHash,
    entries: Vec<VerificationEntry>,
    next_draw: u64,
    sealed_turns: u32,
}

impl VerificationTracker {
    /// Start a chain at the genesis hash for `seed`.
    #[must_use]
    pub fn new(seed: impl Into<String>) -> Self {
        let seed = seed.into();
        Self {
            head: genesis(&seed),
            seed,
            entries: Vec::new(),
            next_draw: 0,
            sealed_turns: 0,
        }
    }

    /// Session seed.
    #[must_use]
    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Current chain head.
    #[must_use]
    pub const fn head(&self) -> ChainHash {
        self.head
    }

    /// Entries in append order.
    #[must_use]
    pub fn entries(&self) -> &[VerificationEntry] {
        &self.entries
    }

    /// Number of turns sealed so far.
    #[must_use]
    pub const fn sealed_turns(&self) -> u32 {
        self.sealed_turns
    }

    /// Number of RNG draws absorbed so far.
    #[must_use]
    pub const fn recorded_draws(&self) -> u64 {
        self.next_draw
    }

    fn append(&mut self, turn: u32, kind: EntryKind, payload_digest: ChainHash) {
        self.head = link(&self.head, turn, kind, &payload_digest);
        self.entries.push(VerificationEntry {
            turn,
            kind,
            payload_digest,
            chain_hash: self.head,
        });
    }

    /// Absorb one RNG draw. Draws must arrive in index order.
    ///
    /// # Errors
    /// Returns [`GameError::Integrity`] when a draw is missing or repeated.
    pub fn record_rng(&mut self, draw: &RngDraw) -> Result<()> {
        if draw.index != self.next_draw {
            return Err(GameError::Integrity(format!(
                "RNG record out of sequence: expected draw {}, got {}",
                self.next_draw, draw.index
            )));
        }
        let digest = payload_digest(&RngPayload {
            index: draw.index,
            purpose: &draw.purpose,
            value: draw.value,
        })?;
        self.append(draw.turn, EntryKind::Rng, digest);
        self.next_draw += 1;
        Ok(())
    }

    /// Absorb a batch of draws in order.
    ///
    /// # Errors
    /// See [`VerificationTracker::record_rng`].
    pub fn record_draws(&mut self, draws: &[RngDraw]) -> Result<()> {
        draws.iter().try_for_each(|draw| self.record_rng(draw))
    }

    /// Record a queued action reaching execution.
    ///
    /// # Errors
    /// Returns [`GameError::Integrity`] if the payload cannot be encoded.
    pub fn record_action(&mut self, turn: u32, action: &str, executed: bool) -> Result<()> {
        let digest = payload_digest(&ActionPayload { action, executed })?;
        self.append(turn, EntryKind::Action, digest);
        Ok(())
    }

    /// Record an event choice.
    ///
    /// # Errors
    /// Returns [`GameError::Integrity`] if the payload cannot be encoded.
    pub fn record_event_choice(&mut self, turn: u32, event: &str, choice: &str) -> Result<()> {
        let digest = payload_digest(&ChoicePayload { event, choice })?;
        self.append(turn, EntryKind::EventChoice, digest);
        Ok(())
    }

    /// Seal a turn with its state digest.
    ///
    /// `draws_taken` is the RNG's total draw count; every one of them must
    /// already be recorded.
    ///
    /// # Errors
    /// Returns [`GameError::Integrity`] when draws are unaccounted for.
    pub fn seal_turn(
        &mut self,
        turn: u32,
        state_digest: ChainHash,
        draws_taken: u64,
    ) -> Result<ChainHash> {
        if draws_taken != self.next_draw {
            return Err(GameError::Integrity(format!(
                "cannot seal turn {turn}: {draws_taken} draws taken, {} recorded",
                self.next_draw
            )));
        }
        self.append(turn, EntryKind::TurnEnd, state_digest);
        self.sealed_turns += 1;
        tracing::debug!(turn, head = %to_hex(&self.head), "Turn sealed");
        Ok(self.head)
    }

    /// Final chain head. Meaningful once the session is over.
    #[must_use]
    pub const fn final_hash(&self) -> ChainHash {
        self.head
    }

    /// Recompute a chain from its entries and return the head.
    ///
    /// # Errors
    /// Returns [`GameError::Integrity`] naming the first entry whose
    /// stored head does not match the recomputed one.
    pub fn verify_entries(seed: &str, entries: &[VerificationEntry]) -> Result<ChainHash> {
        let mut head = genesis(seed);
        for (position, entry) in entries.iter().enumerate() {
            head = link(&head, entry.turn, entry.kind, &entry.payload_digest);
            if head != entry.chain_hash {
                return Err(GameError::Integrity(format!(
                    "chain mismatch at entry {position} (turn {}, {:?})",
                    entry.turn, entry.kind
                )));
            }
        }
        Ok(head)
    }
}

/// The opaque tuple handed to leaderboard submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardSubmission {
    /// Last turn played.
    pub final_turn: u32,
    /// Hex-encoded final chain head.
    pub verification_hash: String,
    /// Session seed.
    pub seed: String,
    /// Resources at game end.
    pub final_resources: Resources,
    /// Whether the game was won.
    pub victory: bool,
}
