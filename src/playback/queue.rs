//! Playback queue: the ordered tracks next/previous move through.
//!
//! The queue keeps the tracks in the order they were supplied plus an `order`
//! permutation used for traversal. With shuffle off the order is ascending;
//! with shuffle on it is a random permutation.

use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::catalog::{Track, TrackId};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoopMode {
    /// Do not wrap at the end of the queue.
    NoLoop,
    /// Wrap around to the start of the queue.
    LoopAll,
    /// Repeat the current track when it ends.
    LoopOne,
}

impl Default for LoopMode {
    fn default() -> Self {
        Self::LoopAll
    }
}

#[derive(Debug, Clone, Default)]
pub struct Queue {
    tracks: Vec<Arc<Track>>,
    order: Vec<usize>,
    position: Option<usize>,
    loop_mode: LoopMode,
    shuffle: bool,
}

impl Queue {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    /// Cursor into the traversal order.
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Tracks in traversal order.
    pub fn ordered(&self) -> impl Iterator<Item = &Arc<Track>> {
        self.order.iter().filter_map(|&i| self.tracks.get(i))
    }

    pub fn get(&self, pos: usize) -> Option<&Arc<Track>> {
        self.order.get(pos).and_then(|&i| self.tracks.get(i))
    }

    pub(super) fn set_loop_mode(&mut self, mode: LoopMode) -> bool {
        let changed = self.loop_mode != mode;
        self.loop_mode = mode;
        changed
    }

    /// Replace the queued tracks, keeping the cursor on `current` if present.
    pub(super) fn set_tracks(&mut self, tracks: Vec<Arc<Track>>, current: Option<&TrackId>) {
        self.tracks = tracks;
        self.order = (0..self.tracks.len()).collect();
        if self.shuffle {
            self.order.shuffle(&mut rand::rng());
        }
        self.position = current.and_then(|id| self.position_of(id));
    }

    /// Move the cursor to `id`; returns false when it is not queued.
    pub(super) fn focus(&mut self, id: &TrackId) -> bool {
        match self.position_of(id) {
            Some(pos) => {
                self.position = Some(pos);
                true
            }
            None => false,
        }
    }

    pub(super) fn replace_with(&mut self, track: Arc<Track>) {
        self.tracks = vec![track];
        self.order = vec![0];
        self.position = Some(0);
    }

    pub(super) fn clear_position(&mut self) {
        self.position = None;
    }

    pub(super) fn set_shuffle(&mut self, on: bool, current: Option<&TrackId>) {
        self.shuffle = on;
        if on {
            self.order.shuffle(&mut rand::rng());
        } else {
            self.order.sort_unstable();
        }
        self.position = current.and_then(|id| self.position_of(id));
    }

    /// Position `next` would move to. Manual skips honour `LoopAll` wrapping
    /// but never repeat the current track.
    pub fn next_position(&self) -> Option<usize> {
        if self.order.is_empty() {
            return None;
        }
        let Some(cur) = self.position else {
            return Some(0);
        };
        if cur + 1 < self.order.len() {
            Some(cur + 1)
        } else if self.loop_mode == LoopMode::NoLoop {
            None
        } else {
            Some(0)
        }
    }

    pub fn previous_position(&self) -> Option<usize> {
        if self.order.is_empty() {
            return None;
        }
        match self.position {
            None => Some(self.order.len() - 1),
            Some(0) if self.loop_mode == LoopMode::NoLoop => None,
            Some(0) => Some(self.order.len() - 1),
            Some(p) => Some(p - 1),
        }
    }

    pub(super) fn move_to(&mut self, pos: usize) -> Option<Arc<Track>> {
        let track = self.get(pos).cloned()?;
        self.position = Some(pos);
        Some(track)
    }

    fn position_of(&self, id: &TrackId) -> Option<usize> {
        self.order
            .iter()
            .position(|&i| self.tracks.get(i).is_some_and(|t| &t.id == id))
    }
}
