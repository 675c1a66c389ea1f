//! Event-driven host for a conversation session.
//!
//! # Architecture
//!
//! ```text
//! SessionEvent (mpsc)
//!        │
//!        ▼
//! SessionRunner::run()  ← async tokio task
//!        │
//!        ├─ SelectPersona / Reset / Leave → lifecycle
//!        ├─ Text                          → Classifying → Responding
//!        └─ Audio                         → Transcribing → Classifying → Responding
//!        │
//!        ▼
//! SessionUpdate (mpsc)
//!
//! SharedStatus (Arc<Mutex<RunnerStatus>>) ←─── read by the host
//! ```

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{AudioInput, SessionEvent, SessionRunner, SessionUpdate};
pub use state::{new_shared_status, set_phase, RunnerStatus, SharedStatus, TurnPhase};
