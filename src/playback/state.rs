use std::sync::Arc;
use std::time::Duration;

use crate::catalog::{Track, TrackId};
use crate::waveform::WaveformPeaks;

use super::queue::Queue;

/// Resource-side transport state machine.
///
/// `Idle -> Loading -> Playing <-> Paused -> Idle`, with `Playing -> Loading`
/// on a track change and `Loading -> Idle` when a load fails. Only the media
/// binding moves the phase; surfaces read it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum TransportPhase {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
}

/// One notification emitted by the store per effective mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    /// A (new) track was bound; `generation` identifies the binding.
    Track { generation: u64 },
    Transport { playing: bool },
    Volume { effective: f32 },
    /// User seek the resource must follow.
    Seeked { to: Duration },
    Time { at: Duration },
    Duration { total: Duration },
    Waveform,
    Phase(TransportPhase),
    Queue,
    /// The last queued track finished with nothing to continue with.
    Ended,
    Reset { generation: u64 },
}

/// Snapshot of everything the player knows about the current playback.
#[derive(Debug, Clone)]
pub struct PlaybackState {
    pub current_track: Option<Arc<Track>>,
    /// Desired transport state; the resource may still be buffering.
    pub is_playing: bool,
    pub volume: f32,
    pub is_muted: bool,
    pub current_time: Duration,
    /// Zero until the resource reports it.
    pub duration: Duration,
    pub phase: TransportPhase,
    pub generation: u64,
    pub waveform: Option<Arc<WaveformPeaks>>,
    pub queue: Queue,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_track: None,
            is_playing: false,
            volume: 1.0,
            is_muted: false,
            current_time: Duration::ZERO,
            duration: Duration::ZERO,
            phase: TransportPhase::Idle,
            generation: 0,
            waveform: None,
            queue: Queue::default(),
        }
    }
}

impl PlaybackState {
    /// Volume actually applied to the output.
    pub fn effective_volume(&self) -> f32 {
        if self.is_muted { 0.0 } else { self.volume }
    }

    pub fn is_current(&self, id: &TrackId) -> bool {
        self.current_track.as_ref().is_some_and(|t| &t.id == id)
    }

    /// Playback progress in `[0, 1]`; zero while the duration is unknown.
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 0.0;
        }
        (self.current_time.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }
}
