use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::catalog::Track;
use crate::waveform::WaveformPeaks;

use super::queue::LoopMode;
use super::state::{PlaybackState, StateChange, TransportPhase};

/// Callback invoked once per effective mutation.
pub type Listener = Box<dyn FnMut(&PlaybackState, &StateChange) + Send>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// The single source of truth for playback.
///
/// Mutators are synchronous. A mutator that changes something emits exactly
/// one `StateChange` to every listener and to the media binding's change
/// feed; a redundant call emits nothing.
pub struct PlaybackStore {
    state: PlaybackState,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    changes: VecDeque<StateChange>,
}

impl Default for PlaybackStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackStore {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::default(),
            listeners: Vec::new(),
            next_subscription: 0,
            changes: VecDeque::new(),
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Changes not yet seen by the media binding, oldest first.
    pub fn take_changes(&mut self) -> Vec<StateChange> {
        self.changes.drain(..).collect()
    }

    fn emit(&mut self, change: StateChange) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.state, &change);
        }
        self.changes.push_back(change);
    }

    fn bind(&mut self, track: Arc<Track>) {
        self.state.current_track = Some(track);
        self.state.is_playing = true;
        self.state.current_time = Duration::ZERO;
        self.state.duration = Duration::ZERO;
        self.state.waveform = None;
        self.state.generation += 1;
        let generation = self.state.generation;
        self.emit(StateChange::Track { generation });
    }

    /// Bind `track` and request playback. Selecting the track that is already
    /// bound only resumes it.
    pub fn set_current_track(&mut self, track: Arc<Track>) {
        if self.state.is_current(&track.id) {
            self.play();
            return;
        }
        if !self.state.queue.focus(&track.id) {
            self.state.queue.replace_with(track.clone());
        }
        debug!(id = %track.id, "current track set");
        self.bind(track);
    }

    pub fn play(&mut self) {
        let Some(track) = self.state.current_track.clone() else {
            return;
        };
        // Nothing is bound after a failed load or a finished queue: start over.
        if self.state.phase == TransportPhase::Idle {
            self.bind(track);
            return;
        }
        if self.state.is_playing {
            return;
        }
        self.state.is_playing = true;
        self.emit(StateChange::Transport { playing: true });
    }

    pub fn pause(&mut self) {
        if !self.state.is_playing {
            return;
        }
        self.state.is_playing = false;
        self.emit(StateChange::Transport { playing: false });
    }

    pub fn toggle_play_pause(&mut self) {
        if self.state.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Clamp to `[0, 1]`. An explicit non-zero volume also unmutes.
    pub fn set_volume(&mut self, volume: f32) {
        if volume.is_nan() {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        let unmute = volume > 0.0 && self.state.is_muted;
        if volume == self.state.volume && !unmute {
            return;
        }
        self.state.volume = volume;
        if unmute {
            self.state.is_muted = false;
        }
        let effective = self.state.effective_volume();
        self.emit(StateChange::Volume { effective });
    }

    pub fn adjust_volume(&mut self, delta: f32) {
        self.set_volume(self.state.volume + delta);
    }

    pub fn mute(&mut self) {
        self.set_muted(true);
    }

    pub fn unmute(&mut self) {
        self.set_muted(false);
    }

    pub fn toggle_mute(&mut self) {
        self.set_muted(!self.state.is_muted);
    }

    fn set_muted(&mut self, muted: bool) {
        if self.state.is_muted == muted {
            return;
        }
        self.state.is_muted = muted;
        let effective = self.state.effective_volume();
        self.emit(StateChange::Volume { effective });
    }

    /// Position report from the resource. Never moves backwards within one
    /// binding; only `seek` and a new track rewind the clock.
    pub fn set_current_time(&mut self, at: Duration) {
        if self.state.current_track.is_none() {
            return;
        }
        let at = self.clamp_to_duration(at);
        if at <= self.state.current_time {
            if at < self.state.current_time {
                trace!(?at, current = ?self.state.current_time, "ignoring backwards position report");
            }
            return;
        }
        self.state.current_time = at;
        self.emit(StateChange::Time { at });
    }

    /// Binding-only correction when the resource did not follow a seek.
    /// Unlike `set_current_time` this may move the clock backwards.
    pub fn resync_time(&mut self, at: Duration) {
        if self.state.current_track.is_none() {
            return;
        }
        let at = self.clamp_to_duration(at);
        if at == self.state.current_time {
            return;
        }
        debug!(?at, stale = ?self.state.current_time, "clock resynced to the resource");
        self.state.current_time = at;
        self.emit(StateChange::Time { at });
    }

    pub fn set_duration(&mut self, total: Duration) {
        if self.state.current_track.is_none() || self.state.duration == total {
            return;
        }
        self.state.duration = total;
        self.state.current_time = self.clamp_to_duration(self.state.current_time);
        self.emit(StateChange::Duration { total });
    }

    pub fn set_waveform(&mut self, peaks: Arc<WaveformPeaks>) {
        if self.state.current_track.is_none() {
            return;
        }
        self.state.waveform = Some(peaks);
        self.emit(StateChange::Waveform);
    }

    pub fn set_phase(&mut self, phase: TransportPhase) {
        if self.state.phase == phase {
            return;
        }
        trace!(from = ?self.state.phase, to = ?phase, "transport phase");
        self.state.phase = phase;
        self.emit(StateChange::Phase(phase));
    }

    /// User seek. Does not change the play/pause intent.
    pub fn seek(&mut self, to: Duration) {
        if self.state.current_track.is_none() {
            return;
        }
        let to = self.clamp_to_duration(to);
        self.state.current_time = to;
        self.emit(StateChange::Seeked { to });
    }

    pub fn seek_by(&mut self, delta_secs: i64) {
        let cur = self.state.current_time.as_secs_f64();
        let target = (cur + delta_secs as f64).max(0.0);
        self.seek(Duration::from_secs_f64(target));
    }

    pub fn play_next(&mut self) {
        if let Some(pos) = self.state.queue.next_position() {
            self.play_queued(pos);
        }
    }

    pub fn play_previous(&mut self) {
        if let Some(pos) = self.state.queue.previous_position() {
            self.play_queued(pos);
        }
    }

    fn play_queued(&mut self, pos: usize) {
        if let Some(track) = self.state.queue.move_to(pos) {
            self.bind(track);
        }
    }

    /// Natural end of the bound track: repeat, continue, or stop at the end
    /// of a non-looping queue.
    pub fn complete_track(&mut self) {
        let Some(track) = self.state.current_track.clone() else {
            return;
        };
        if self.state.queue.loop_mode() == LoopMode::LoopOne {
            self.bind(track);
            return;
        }
        match self.state.queue.next_position() {
            Some(pos) => self.play_queued(pos),
            None => {
                self.state.is_playing = false;
                self.state.current_time = Duration::ZERO;
                self.emit(StateChange::Ended);
            }
        }
    }

    /// Drop the current track entirely (the player was dismissed).
    pub fn reset(&mut self) {
        if self.state.current_track.is_none() && !self.state.is_playing {
            return;
        }
        self.state.current_track = None;
        self.state.is_playing = false;
        self.state.current_time = Duration::ZERO;
        self.state.duration = Duration::ZERO;
        self.state.waveform = None;
        self.state.queue.clear_position();
        self.state.generation += 1;
        let generation = self.state.generation;
        self.emit(StateChange::Reset { generation });
    }

    pub fn set_queue(&mut self, tracks: Vec<Arc<Track>>) {
        let current = self.state.current_track.as_ref().map(|t| t.id.clone());
        self.state.queue.set_tracks(tracks, current.as_ref());
        self.emit(StateChange::Queue);
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        if self.state.queue.set_loop_mode(mode) {
            self.emit(StateChange::Queue);
        }
    }

    pub fn toggle_shuffle(&mut self) {
        let current = self.state.current_track.as_ref().map(|t| t.id.clone());
        let on = !self.state.queue.shuffle();
        self.state.queue.set_shuffle(on, current.as_ref());
        self.emit(StateChange::Queue);
    }

    fn clamp_to_duration(&self, t: Duration) -> Duration {
        if self.state.duration.is_zero() {
            t
        } else {
            t.min(self.state.duration)
        }
    }
}
