//! Turn phase and the status snapshot shared with the host.
//!
//! [`TurnPhase`] tracks which collaborator the current turn is waiting on.
//! The host reads it via [`SharedStatus`] to show a busy indicator.
//!
//! [`RunnerStatus`] is the single source of truth for everything the host
//! displays between turns: phase, persona, current emotion, statistics and
//! the last user-visible notice.
//!
//! [`SharedStatus`] is a type alias for `Arc<Mutex<RunnerStatus>>` — cheap to
//! clone and safe to share across threads.

use std::sync::{Arc, Mutex};

use crate::emotion::DetectedEmotion;
use crate::session::ConversationStats;

// ---------------------------------------------------------------------------
// TurnPhase
// ---------------------------------------------------------------------------

/// Phases of a single turn.
///
/// ```text
/// Idle ──audio──▶ Transcribing ──▶ Classifying ──▶ Responding ──commit──▶ Idle
/// Idle ──text───────────────────▶ Classifying ──▶ Responding ──commit──▶ Idle
/// any phase ──failure──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnPhase {
    /// No turn in progress.
    #[default]
    Idle,

    /// The recogniser is running on the blocking thread pool.
    Transcribing,

    /// A classifier is labelling the input.
    Classifying,

    /// Waiting for the response generator.
    Responding,
}

impl TurnPhase {
    /// Returns `true` while a turn is being processed.
    ///
    /// ```
    /// use emotion_chat::pipeline::TurnPhase;
    ///
    /// assert!(!TurnPhase::Idle.is_busy());
    /// assert!(TurnPhase::Transcribing.is_busy());
    /// assert!(TurnPhase::Classifying.is_busy());
    /// assert!(TurnPhase::Responding.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        !matches!(self, TurnPhase::Idle)
    }

    /// A short human-readable label for the status line.
    pub fn label(&self) -> &'static str {
        match self {
            TurnPhase::Idle => "Idle",
            TurnPhase::Transcribing => "Transcribing",
            TurnPhase::Classifying => "Analysing emotion",
            TurnPhase::Responding => "Thinking",
        }
    }
}

// ---------------------------------------------------------------------------
// RunnerStatus
// ---------------------------------------------------------------------------

/// Snapshot published after every event.
#[derive(Debug, Clone, Default)]
pub struct RunnerStatus {
    /// Current phase of the in-flight turn.
    pub phase: TurnPhase,

    /// Active persona, `None` when no conversation is open.
    pub persona: Option<String>,

    /// Emotion of the most recent committed turn (or the seeded default).
    pub emotion: Option<DetectedEmotion>,

    /// Conversation statistics of the active session.
    pub stats: ConversationStats,

    /// Last user-visible notice (failed turn, rejected transition).
    pub notice: Option<String>,
}

// ---------------------------------------------------------------------------
// SharedStatus
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`RunnerStatus`].
///
/// Lock for a short critical section; do **not** hold the lock across
/// `.await` points.
pub type SharedStatus = Arc<Mutex<RunnerStatus>>;

/// Construct a new [`SharedStatus`] wrapping a default [`RunnerStatus`].
pub fn new_shared_status() -> SharedStatus {
    Arc::new(Mutex::new(RunnerStatus::default()))
}

/// Set the phase, ignoring a poisoned lock.
pub fn set_phase(status: &SharedStatus, phase: TurnPhase) {
    if let Ok(mut st) = status.lock() {
        st.phase = phase;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
