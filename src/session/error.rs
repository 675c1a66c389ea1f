//! Session and turn errors.
//!
//! None of these terminate the program; each maps to a one-line notice for
//! the user.

use thiserror::Error;

use crate::audio::AudioFormatError;
use crate::emotion::ClassificationError;
use crate::stt::TranscribeError;

/// A lifecycle request that is not valid in the current state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("cannot {action} while session is {from}")]
    InvalidTransition { from: String, action: &'static str },
}

/// Why a turn did not commit.
#[derive(Debug, Error)]
pub enum TurnError {
    /// The audio could not be decoded or shaped.
    #[error("audio format error: {0}")]
    AudioFormat(#[from] AudioFormatError),

    /// The upload is empty or truncated.
    #[error("invalid audio: {0}")]
    InvalidAudio(String),

    /// The audio classifier failed.
    #[error("emotion could not be determined: {0}")]
    Classification(#[from] ClassificationError),

    /// No configured language produced a transcript.
    #[error("speech was not recognised in any configured language")]
    TranscriptionExhausted,

    /// A collaborator (response generator, scratch storage) failed.
    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    /// No conversation is open.
    #[error("no active conversation")]
    NotActive,
}

impl From<TranscribeError> for TurnError {
    fn from(e: TranscribeError) -> Self {
        match e {
            TranscribeError::InvalidAudio { len, min } => {
                TurnError::InvalidAudio(format!("{len} bytes, minimum {min}"))
            }
            TranscribeError::Format(f) => TurnError::AudioFormat(f),
            TranscribeError::Storage(io) => {
                TurnError::CollaboratorUnavailable(format!("scratch storage: {io}"))
            }
            TranscribeError::RecognizerUnavailable(reason) => {
                TurnError::CollaboratorUnavailable(format!("speech recogniser: {reason}"))
            }
        }
    }
}

impl TurnError {
    /// Short message for the user.
    pub fn notice(&self) -> String {
        match self {
            TurnError::AudioFormat(_) => {
                "That recording could not be read. Please send a WAV file.".into()
            }
            TurnError::InvalidAudio(_) => {
                "The recording is empty or too short. Please try again.".into()
            }
            TurnError::Classification(_) => {
                "The emotion could not be determined from that recording.".into()
            }
            TurnError::TranscriptionExhausted => {
                "Sorry, I couldn't make out what you said. Please try again.".into()
            }
            TurnError::CollaboratorUnavailable(_) => {
                "A service I rely on is unavailable right now. Please try again shortly.".into()
            }
            TurnError::NotActive => "Choose a persona to start a conversation.".into(),
        }
    }
}
