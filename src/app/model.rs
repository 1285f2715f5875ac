//! Application model types: `App` and `CardState`.

use std::sync::Arc;

use crate::catalog::{Track, TrackId};
use crate::playback::{LoopMode, PlaybackState, TransportPhase};
use crate::waveform::WaveformRenderer;

use super::plays::PlayCounts;

/// How a catalog card relates to the track bound to the player.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CardState {
    Inactive,
    Loading,
    /// Loaded with playing intent while the output is still locked.
    Ready,
    Playing,
    Paused,
    /// Bound but not loaded: the load failed or the queue ran out.
    Stopped,
}

impl CardState {
    /// Derived from the card's own id and the published state only.
    pub fn of(track: &Track, state: &PlaybackState) -> Self {
        if !state.is_current(&track.id) {
            return Self::Inactive;
        }
        match (state.phase, state.is_playing) {
            (TransportPhase::Loading, _) => Self::Loading,
            (TransportPhase::Playing, _) => Self::Playing,
            (TransportPhase::Paused, true) => Self::Ready,
            (TransportPhase::Paused, false) => Self::Paused,
            (TransportPhase::Idle, _) => Self::Stopped,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Inactive => " ",
            Self::Loading => "…",
            Self::Ready => "▷",
            Self::Playing => "▶",
            Self::Paused => "⏸",
            Self::Stopped => "■",
        }
    }
}

/// Cycle `NoLoop -> LoopAll -> LoopOne -> NoLoop`.
pub fn cycle_loop_mode(mode: LoopMode) -> LoopMode {
    match mode {
        LoopMode::NoLoop => LoopMode::LoopAll,
        LoopMode::LoopAll => LoopMode::LoopOne,
        LoopMode::LoopOne => LoopMode::NoLoop,
    }
}

/// The main application model.
pub struct App {
    pub tracks: Vec<Arc<Track>>,
    pub selected: usize,

    /// Cursor follows the bound track.
    pub follow_playback: bool,
    pub detail_window: bool,
    pub show_visualizer: bool,
    pub source_label: Option<String>,

    pub waveform: WaveformRenderer,
    /// Bar levels of the latest visualizer frame.
    pub levels: Vec<f32>,

    pub(super) pending_key: Option<char>,
    plays: PlayCounts,
}

impl App {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks: tracks.into_iter().map(Arc::new).collect(),
            selected: 0,
            follow_playback: true,
            detail_window: false,
            show_visualizer: true,
            source_label: None,
            waveform: WaveformRenderer::new(),
            levels: Vec::new(),
            pending_key: None,
            plays: PlayCounts::default(),
        }
    }

    pub fn has_tracks(&self) -> bool {
        !self.tracks.is_empty()
    }

    pub fn selected_track(&self) -> Option<&Arc<Track>> {
        self.tracks.get(self.selected)
    }

    pub fn index_of(&self, id: &TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| &t.id == id)
    }

    /// Queue handed to the player: the catalog in display order.
    pub fn queue(&self) -> Vec<Arc<Track>> {
        self.tracks.clone()
    }

    /// Shared play counter; hand a clone to the player as its recorder.
    pub fn play_counts(&self) -> PlayCounts {
        self.plays.clone()
    }

    pub fn plays_of(&self, track: &Track) -> u32 {
        self.plays.get(&track.id)
    }

    pub fn set_source_label(&mut self, label: String) {
        self.source_label = Some(label);
    }

    pub fn toggle_detail_window(&mut self) {
        self.detail_window = !self.detail_window;
    }

    pub fn toggle_visualizer(&mut self) {
        self.show_visualizer = !self.show_visualizer;
        if !self.show_visualizer {
            self.levels.clear();
        }
    }

    pub fn follow_playback_on(&mut self) {
        self.follow_playback = true;
    }

    pub fn follow_playback_off(&mut self) {
        self.follow_playback = false;
    }

    /// Move selection to the next track, wrapping around.
    pub fn next(&mut self) {
        if self.has_tracks() {
            self.selected = (self.selected + 1) % self.tracks.len();
        }
    }

    /// Move selection to the previous track, wrapping around.
    pub fn prev(&mut self) {
        if self.has_tracks() {
            self.selected = self
                .selected
                .checked_sub(1)
                .unwrap_or(self.tracks.len() - 1);
        }
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.tracks.len().saturating_sub(1);
    }

    /// Jump the cursor to the bound track, if it is in the catalog.
    pub fn select_current(&mut self, state: &PlaybackState) -> bool {
        let Some(idx) = state
            .current_track
            .as_ref()
            .and_then(|t| self.index_of(&t.id))
        else {
            return false;
        };
        self.selected = idx;
        true
    }

    /// Follow a freshly published snapshot. Runs before every draw so the
    /// waveform never paints peaks of a previous binding.
    pub fn sync(&mut self, state: &PlaybackState) {
        self.waveform.sync(state);
        if self.follow_playback {
            self.select_current(state);
        }
    }
}
