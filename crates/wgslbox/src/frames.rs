//! Dynamic texture frame sources
//!
//! Videos and cameras reach the shader as textures the host rewrites each
//! frame. A source is anything that can report a fixed size and hand over
//! the latest RGBA frame when polled; production happens wherever it wants
//! (inline for the built-in GIF player, a decoder thread for an external
//! demuxer), the scheduler only ever polls.

use crate::error::EngineError;
use image::AnimationDecoder;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// One RGBA8 frame, tightly packed at the source's size
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Pixel data, `4 * width * height` bytes
    pub data: Vec<u8>,
}

/// Playback control verbs for a dynamic source
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackCommand {
    Play,
    Pause,
    /// Pause and rewind to the start
    Stop,
    /// Jump to a position in seconds
    Seek(f64),
}

/// Playback position report
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackStatus {
    /// Current position in seconds
    pub current_time: f64,
    /// Total duration in seconds, 0 when unknown
    pub duration: f64,
    /// Whether playback is paused
    pub paused: bool,
}

/// A producer of dynamic texture frames
pub trait FrameSource {
    /// Fixed frame size in pixels
    fn size(&self) -> (u32, u32);

    /// The newest frame since the last poll, if any
    ///
    /// Returning `None` means the texture keeps its previous contents.
    fn poll_frame(&mut self) -> Option<VideoFrame>;

    /// Applies a playback control; sources without a timeline ignore it
    fn control(&mut self, _command: PlaybackCommand) {}

    /// Reports the playback position; sources without a timeline report zeros
    fn status(&self) -> PlaybackStatus {
        PlaybackStatus::default()
    }
}

/// A source that emits one fixed frame and then goes quiet
///
/// Used for the 1x1 black fallback when a video container is unsupported
/// or a camera cannot be opened.
pub struct StaticSource {
    width: u32,
    height: u32,
    data: Vec<u8>,
    delivered: bool,
}

impl StaticSource {
    /// A 1x1 opaque black source
    pub fn black() -> Self {
        Self {
            width: 1,
            height: 1,
            data: vec![0, 0, 0, 255],
            delivered: false,
        }
    }
}

impl FrameSource for StaticSource {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn poll_frame(&mut self) -> Option<VideoFrame> {
        if self.delivered {
            return None;
        }
        self.delivered = true;
        Some(VideoFrame { data: self.data.clone() })
    }
}

/// One decoded animation frame with its display duration
struct AnimationFrame {
    data: Vec<u8>,
    /// Seconds this frame stays on screen
    duration: f64,
}

/// Looping animation playback over pre-decoded frames (the GIF path)
///
/// All frames are decoded at load time; playback is pure clock math, so
/// polling never blocks. Pause time is accumulated and subtracted the way
/// the position is computed, so resuming continues exactly where the video
/// paused.
pub struct AnimationSource {
    width: u32,
    height: u32,
    frames: Vec<AnimationFrame>,
    /// Sum of all frame durations
    total: f64,
    started: Instant,
    paused: bool,
    pause_started: Option<Instant>,
    total_pause: Duration,
    /// Offset applied by seeks, in seconds
    seek_offset: f64,
    last_emitted: Option<usize>,
}

/// Frames shorter than this get the classic GIF default delay
const MIN_FRAME_SECONDS: f64 = 0.001;
const DEFAULT_FRAME_SECONDS: f64 = 0.1;

impl AnimationSource {
    /// Decodes a GIF into a looping source
    pub fn from_gif(bytes: &[u8], path: &str) -> Result<Self, EngineError> {
        let decode_error = |message: String| EngineError::ImageDecode {
            path: path.to_string(),
            message,
        };

        let decoder = image::codecs::gif::GifDecoder::new(std::io::Cursor::new(bytes)).map_err(|e| decode_error(e.to_string()))?;
        let decoded = decoder.into_frames().collect_frames().map_err(|e| decode_error(e.to_string()))?;
        if decoded.is_empty() {
            return Err(decode_error("animation has no frames".to_string()));
        }

        let (width, height) = decoded[0].buffer().dimensions();
        let mut frames = Vec::with_capacity(decoded.len());
        let mut total = 0.0f64;
        for frame in decoded {
            let (numerator, denominator) = frame.delay().numer_denom_ms();
            let mut seconds = numerator as f64 / denominator.max(1) as f64 / 1000.0;
            if seconds < MIN_FRAME_SECONDS {
                seconds = DEFAULT_FRAME_SECONDS;
            }
            total += seconds;
            frames.push(AnimationFrame {
                data: frame.into_buffer().into_raw(),
                duration: seconds,
            });
        }

        Ok(Self {
            width,
            height,
            frames,
            total,
            started: Instant::now(),
            paused: false,
            pause_started: None,
            total_pause: Duration::ZERO,
            seek_offset: 0.0,
            last_emitted: None,
        })
    }

    /// Current playback position in seconds, looped over the duration
    fn current_time(&self) -> f64 {
        let paused_for = match self.pause_started {
            Some(since) => self.total_pause + since.elapsed(),
            None => self.total_pause,
        };
        let elapsed = self.started.elapsed().saturating_sub(paused_for).as_secs_f64() + self.seek_offset;
        if self.total > 0.0 {
            elapsed.rem_euclid(self.total)
        } else {
            0.0
        }
    }

    /// Maps a looped position to its frame index
    fn frame_index_at(&self, position: f64) -> usize {
        let mut remaining = position;
        for (index, frame) in self.frames.iter().enumerate() {
            if remaining < frame.duration {
                return index;
            }
            remaining -= frame.duration;
        }
        self.frames.len() - 1
    }
}

impl FrameSource for AnimationSource {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn poll_frame(&mut self) -> Option<VideoFrame> {
        let index = self.frame_index_at(self.current_time());
        if self.last_emitted == Some(index) {
            return None;
        }
        self.last_emitted = Some(index);
        Some(VideoFrame {
            data: self.frames[index].data.clone(),
        })
    }

    fn control(&mut self, command: PlaybackCommand) {
        match command {
            PlaybackCommand::Play => {
                if let Some(since) = self.pause_started.take() {
                    self.total_pause += since.elapsed();
                }
                self.paused = false;
            }
            PlaybackCommand::Pause => {
                if self.pause_started.is_none() {
                    self.pause_started = Some(Instant::now());
                }
                self.paused = true;
            }
            PlaybackCommand::Stop => {
                self.control(PlaybackCommand::Pause);
                self.control(PlaybackCommand::Seek(0.0));
            }
            PlaybackCommand::Seek(position) => {
                let current = self.current_time();
                self.seek_offset += position - current;
                self.last_emitted = None;
            }
        }
    }

    fn status(&self) -> PlaybackStatus {
        PlaybackStatus {
            current_time: self.current_time(),
            duration: self.total,
            paused: self.paused,
        }
    }
}

/// A source fed by an external producer thread through a channel
///
/// The producer (an embedder's demuxer, a capture loop) sends frames at its
/// own pace; the scheduler drains to the newest one each poll. Controls go
/// back over a command channel and status comes from a shared cell the
/// producer keeps updated.
pub struct ChannelSource {
    width: u32,
    height: u32,
    frames: Receiver<VideoFrame>,
    commands: Sender<PlaybackCommand>,
    status: Arc<Mutex<PlaybackStatus>>,
}

impl ChannelSource {
    /// Wires a source to its producer-side handles
    pub fn new(width: u32, height: u32, frames: Receiver<VideoFrame>, commands: Sender<PlaybackCommand>, status: Arc<Mutex<PlaybackStatus>>) -> Self {
        Self {
            width,
            height,
            frames,
            commands,
            status,
        }
    }
}

impl FrameSource for ChannelSource {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn poll_frame(&mut self) -> Option<VideoFrame> {
        // Drain to the newest frame; stale ones are never worth uploading.
        let mut latest = None;
        while let Ok(frame) = self.frames.try_recv() {
            latest = Some(frame);
        }
        latest
    }

    fn control(&mut self, command: PlaybackCommand) {
        if self.commands.send(command).is_err() {
            tracing::warn!("video producer is gone, control ignored");
        }
    }

    fn status(&self) -> PlaybackStatus {
        self.status.lock().map(|status| *status).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animation(durations: &[f64]) -> AnimationSource {
        AnimationSource {
            width: 1,
            height: 1,
            frames: durations
                .iter()
                .map(|&duration| AnimationFrame {
                    data: vec![0, 0, 0, 255],
                    duration,
                })
                .collect(),
            total: durations.iter().sum(),
            started: Instant::now(),
            paused: false,
            pause_started: None,
            total_pause: Duration::ZERO,
            seek_offset: 0.0,
            last_emitted: None,
        }
    }

    #[test]
    fn test_frame_index_walks_durations() {
        let source = animation(&[0.5, 0.25, 0.25]);
        assert_eq!(source.frame_index_at(0.0), 0);
        assert_eq!(source.frame_index_at(0.49), 0);
        assert_eq!(source.frame_index_at(0.5), 1);
        assert_eq!(source.frame_index_at(0.74), 1);
        assert_eq!(source.frame_index_at(0.75), 2);
        assert_eq!(source.frame_index_at(0.999), 2);
    }

    #[test]
    fn test_static_source_emits_once() {
        let mut source = StaticSource::black();
        assert_eq!(source.size(), (1, 1));
        assert_eq!(source.poll_frame().unwrap().data, vec![0, 0, 0, 255]);
        assert!(source.poll_frame().is_none());
    }

    #[test]
    fn test_pause_reports_paused() {
        let mut source = animation(&[1.0, 1.0]);
        source.control(PlaybackCommand::Pause);
        assert!(source.status().paused);
        source.control(PlaybackCommand::Play);
        assert!(!source.status().paused);
    }

    #[test]
    fn test_seek_moves_position() {
        let mut source = animation(&[1.0, 1.0]);
        source.control(PlaybackCommand::Pause);
        source.control(PlaybackCommand::Seek(1.5));
        let position = source.status().current_time;
        assert!((position - 1.5).abs() < 0.05, "position was {position}");
        assert_eq!(source.frame_index_at(position), 1);
    }

    #[test]
    fn test_stop_rewinds() {
        let mut source = animation(&[1.0, 1.0]);
        source.control(PlaybackCommand::Seek(1.5));
        source.control(PlaybackCommand::Stop);
        assert!(source.status().paused);
        assert!(source.status().current_time < 0.05);
    }

    #[test]
    fn test_poll_emits_only_on_change() {
        let mut source = animation(&[10.0, 10.0]);
        assert!(source.poll_frame().is_some());
        assert!(source.poll_frame().is_none());
    }

    #[test]
    fn test_channel_source_drains_to_latest() {
        let (frame_tx, frame_rx) = std::sync::mpsc::channel();
        let (command_tx, _command_rx) = std::sync::mpsc::channel();
        let status = Arc::new(Mutex::new(PlaybackStatus::default()));
        let mut source = ChannelSource::new(2, 2, frame_rx, command_tx, status);

        frame_tx.send(VideoFrame { data: vec![1] }).unwrap();
        frame_tx.send(VideoFrame { data: vec![2] }).unwrap();
        assert_eq!(source.poll_frame().unwrap().data, vec![2]);
        assert!(source.poll_frame().is_none());
    }
}
