//! Sound decode and trigger playback
//!
//! Each registered sound is decode-checked once at load time; a sound that
//! cannot be decoded fails the load, matching the contract for required
//! assets. Playback re-decodes from the kept bytes per trigger and detaches
//! the sink, so overlapping triggers mix naturally.
//!
//! A machine without an audio output device is not a load failure: the bank
//! degrades to silence with a warning, which keeps headless runs working.

use crate::error::EngineError;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::io::Cursor;

/// Decoded-checked sounds plus the output device, if one exists
pub struct AudioBank {
    // The stream must stay alive for its handle to keep working.
    output: Option<(OutputStream, OutputStreamHandle)>,
    sounds: Vec<Vec<u8>>,
}

impl AudioBank {
    /// Builds the bank, decode-checking every sound
    ///
    /// `sounds` pairs each asset path (for error reporting) with its raw
    /// bytes in manifest order — the index here is the trigger index.
    pub fn new(sounds: Vec<(String, Vec<u8>)>) -> Result<Self, EngineError> {
        for (path, bytes) in &sounds {
            Decoder::new(Cursor::new(bytes.clone())).map_err(|e| EngineError::AudioDecode {
                path: path.clone(),
                message: e.to_string(),
            })?;
        }

        let output = match OutputStream::try_default() {
            Ok(pair) => Some(pair),
            Err(e) => {
                tracing::warn!("no audio output device, sounds disabled: {e}");
                None
            }
        };

        Ok(Self {
            output,
            sounds: sounds.into_iter().map(|(_, bytes)| bytes).collect(),
        })
    }

    /// Number of registered sounds
    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    /// Whether the bank holds no sounds
    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    /// Plays sound `index` once, mixed over anything already playing
    pub fn play(&self, index: usize) {
        let Some((_, handle)) = &self.output else { return };
        let Some(bytes) = self.sounds.get(index) else {
            tracing::warn!("audio trigger {index} out of range");
            return;
        };

        match Decoder::new(Cursor::new(bytes.clone())) {
            Ok(source) => match Sink::try_new(handle) {
                Ok(sink) => {
                    sink.append(source);
                    sink.detach();
                }
                Err(e) => tracing::warn!("failed to open audio sink: {e}"),
            },
            Err(e) => tracing::warn!("failed to decode sound {index} at playback: {e}"),
        }
    }
}
