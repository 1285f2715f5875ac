use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::catalog::{Track, TrackId};
use crate::media::PlayRecorder;

/// In-process play counter fed by the engine's `PlayRecorder` hook.
#[derive(Debug, Clone, Default)]
pub struct PlayCounts {
    counts: Arc<Mutex<HashMap<TrackId, u32>>>,
}

impl PlayCounts {
    pub fn get(&self, id: &TrackId) -> u32 {
        self.counts
            .lock()
            .ok()
            .and_then(|m| m.get(id).copied())
            .unwrap_or(0)
    }
}

impl PlayRecorder for PlayCounts {
    fn record_play(&self, track: &Track) {
        let Ok(mut counts) = self.counts.lock() else {
            return;
        };
        let count = counts.entry(track.id.clone()).or_insert(0);
        *count += 1;
        info!(track = %track.id, plays = *count, "play recorded");
    }
}
