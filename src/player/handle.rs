use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use thiserror::Error;

use crate::config::Settings;
use crate::media::{MediaError, MediaEventSink, PlayRecorder, http_client};
use crate::playback::{Listener, PlaybackState, SubscriptionId};
use crate::spectrum::SpectrumBridge;

use super::thread::{EngineParts, spawn_player_thread};
use super::types::{Origin, PlayerCmd, PlayerMsg};

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error("failed to spawn player thread")]
    Spawn(#[from] std::io::Error),
    #[error("player thread has stopped")]
    Disconnected,
}

/// Latest published `PlaybackState`, refreshed on every store change.
pub type SnapshotHandle = Arc<Mutex<PlaybackState>>;

/// Cheap front end to the engine thread, shared by every surface.
pub struct PlayerHandle {
    tx: Sender<PlayerMsg>,
    snapshot: SnapshotHandle,
    spectrum: SpectrumBridge,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl PlayerHandle {
    pub fn spawn(
        settings: &Settings,
        recorder: Option<Box<dyn PlayRecorder>>,
    ) -> Result<Self, PlayerError> {
        let (tx, rx) = mpsc::channel::<PlayerMsg>();
        let snapshot: SnapshotHandle = Arc::new(Mutex::new(PlaybackState::default()));
        let spectrum = SpectrumBridge::new(&settings.spectrum);

        let events_tx = tx.clone();
        let events: MediaEventSink = Arc::new(move |event| {
            let _ = events_tx.send(PlayerMsg::Media(event));
        });

        let snapshot_for_thread = snapshot.clone();
        let publisher: Listener = Box::new(move |state, _| {
            if let Ok(mut s) = snapshot_for_thread.lock() {
                *s = state.clone();
            }
        });

        let join = spawn_player_thread(EngineParts {
            rx,
            events,
            bridge: spectrum.clone(),
            client: http_client()?,
            publisher,
            recorder,
            audio: settings.audio.clone(),
            playback: settings.playback.clone(),
            waveform: settings.waveform.clone(),
        })?;

        Ok(Self {
            tx,
            snapshot,
            spectrum,
            join: Mutex::new(Some(join)),
        })
    }

    pub fn send(&self, cmd: PlayerCmd, origin: Origin) -> Result<(), PlayerError> {
        self.tx
            .send(PlayerMsg::Cmd { cmd, origin })
            .map_err(|_| PlayerError::Disconnected)
    }

    /// Copy of the latest published state.
    pub fn snapshot(&self) -> PlaybackState {
        self.snapshot
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn snapshot_handle(&self) -> SnapshotHandle {
        self.snapshot.clone()
    }

    pub fn spectrum(&self) -> SpectrumBridge {
        self.spectrum.clone()
    }

    /// Register `listener` on the engine thread. It runs there, once per
    /// store change, so it must not block.
    pub fn subscribe(&self, listener: Listener) -> Option<SubscriptionId> {
        let (reply, rx) = mpsc::channel();
        self.tx.send(PlayerMsg::Subscribe { listener, reply }).ok()?;
        rx.recv().ok()
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        let _ = self.tx.send(PlayerMsg::Unsubscribe(id));
    }

    /// Fade out, stop the engine thread and wait for it.
    pub fn quit_softly(&self, fade_out: Duration) {
        let _ = self.tx.send(PlayerMsg::Quit { fade: fade_out });

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}

impl Drop for PlayerHandle {
    fn drop(&mut self) {
        self.quit_softly(Duration::ZERO);
    }
}
