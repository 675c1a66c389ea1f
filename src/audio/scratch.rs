//! Per-turn scratch storage for uploaded audio.
//!
//! [`ScratchAudio`] writes the submitted bytes to a uniquely named temporary
//! file.  The file belongs to the turn that created it and is removed when
//! the value is dropped, on success, error and early return alike.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use super::decode::decode_wav_file;
use super::normalize::AudioFormatError;
use super::signal::AudioSignal;

pub struct ScratchAudio {
    file: NamedTempFile,
}

impl ScratchAudio {
    /// Persist `bytes` to a fresh `.wav` temp file.
    pub fn write(bytes: &[u8]) -> std::io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("emotion-chat-")
            .suffix(".wav")
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Decode the stored clip.
    pub fn decode(&self) -> Result<AudioSignal, AudioFormatError> {
        decode_wav_file(self.path())
    }
}

impl std::fmt::Debug for ScratchAudio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScratchAudio")
            .field("path", &self.path())
            .finish()
    }
}
