use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, trace, warn};

use crate::catalog::Track;
use crate::playback::{PlaybackStore, StateChange, TransportPhase};
use crate::spectrum::{SpectrumBridge, SpectrumTap};

use super::device::MediaDevice;
use super::types::{CancelToken, LoadRequest, LoadedMedia, MediaEvent, MediaEventSink};

/// Side effect fired the first time a binding actually starts sounding.
pub trait PlayRecorder: Send {
    fn record_play(&self, track: &Track);
}

/// Whether the output graph exists yet. It is opened by the first user
/// gesture and never closed afterwards.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GraphState {
    Closed,
    Open,
}

struct ActiveLoad {
    generation: u64,
    cancel: CancelToken,
}

/// Keeps the single media resource in step with a `PlaybackStore`.
///
/// The binding reacts to the store's change feed (`sync`), to loader results
/// (`on_event`), to the engine clock (`tick`) and to user gestures
/// (`user_gesture`). Every resource it touches is tagged with the store
/// generation it was created for; anything else is dropped.
pub struct MediaBinding<D: MediaDevice> {
    device: D,
    bridge: SpectrumBridge,
    graph: GraphState,
    events: MediaEventSink,
    load: Option<ActiveLoad>,
    /// Loaded while the graph was still closed.
    pending: Option<LoadedMedia>,
    pending_seek: Option<Duration>,
    attached: Option<u64>,
    recorded: Option<u64>,
    recorder: Option<Box<dyn PlayRecorder>>,
}

impl<D: MediaDevice> MediaBinding<D> {
    pub fn new(device: D, bridge: SpectrumBridge, events: MediaEventSink) -> Self {
        Self {
            device,
            bridge,
            graph: GraphState::Closed,
            events,
            load: None,
            pending: None,
            pending_seek: None,
            attached: None,
            recorded: None,
            recorder: None,
        }
    }

    pub fn with_recorder(mut self, recorder: Box<dyn PlayRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn graph_state(&self) -> GraphState {
        self.graph
    }

    /// Generation of the attached resource, if any.
    pub fn attached(&self) -> Option<u64> {
        self.attached
    }

    pub fn has_pending_media(&self) -> bool {
        self.pending.is_some()
    }

    /// Apply every change the store has produced since the last call.
    pub fn sync(&mut self, store: &mut PlaybackStore) {
        loop {
            let changes = store.take_changes();
            if changes.is_empty() {
                break;
            }
            for change in changes {
                self.apply(store, change);
            }
        }
    }

    fn apply(&mut self, store: &mut PlaybackStore, change: StateChange) {
        match change {
            StateChange::Track { generation } => {
                // A later bind in the same batch supersedes this one.
                if generation == store.state().generation {
                    self.bind(store);
                }
            }
            StateChange::Reset { .. } => {
                self.teardown();
                store.set_phase(TransportPhase::Idle);
            }
            StateChange::Ended => {
                self.teardown();
                store.set_phase(TransportPhase::Idle);
                info!("queue finished");
            }
            StateChange::Transport { playing } => {
                if self.attached != Some(store.state().generation) {
                    // Loading or blocked: the intent is picked up on attach.
                    return;
                }
                if playing {
                    self.start(store);
                } else {
                    self.device.pause();
                    store.set_phase(TransportPhase::Paused);
                }
            }
            StateChange::Volume { effective } => self.device.set_volume(effective),
            StateChange::Seeked { to } => {
                if self.attached == Some(store.state().generation) {
                    self.seek_device(store, to);
                } else {
                    self.pending_seek = Some(to);
                }
            }
            StateChange::Time { .. }
            | StateChange::Duration { .. }
            | StateChange::Waveform
            | StateChange::Phase(_)
            | StateChange::Queue => {}
        }
    }

    fn bind(&mut self, store: &mut PlaybackStore) {
        self.teardown();
        let state = store.state();
        let Some(track) = state.current_track.clone() else {
            return;
        };
        let generation = state.generation;
        info!(id = %track.id, title = %track.title, generation, "loading track");

        let cancel = CancelToken::new();
        self.load = Some(ActiveLoad {
            generation,
            cancel: cancel.clone(),
        });
        store.set_phase(TransportPhase::Loading);
        self.device.begin_load(
            LoadRequest {
                generation,
                source: track.source.clone(),
                cancel,
            },
            self.events.clone(),
        );
    }

    /// Cancel the in-flight load and release the attached resource.
    fn teardown(&mut self) {
        if let Some(load) = self.load.take() {
            trace!(generation = load.generation, "cancelling load");
            load.cancel.cancel();
        }
        if self.attached.take().is_some() {
            self.device.release();
        }
        self.pending = None;
        self.pending_seek = None;
    }

    /// Result from a loader thread.
    pub fn on_event(&mut self, store: &mut PlaybackStore, event: MediaEvent) {
        let current = store.state().generation;
        let expected = self.load.as_ref().map(|l| l.generation);
        if event.generation() != current || expected != Some(current) {
            trace!(
                generation = event.generation(),
                current,
                "dropping stale media event"
            );
            return;
        }
        self.load = None;

        match event {
            MediaEvent::Loaded(media) => {
                store.set_duration(media.duration);
                store.set_waveform(media.peaks.clone());
                if self.graph == GraphState::Open {
                    self.attach(store, media);
                } else {
                    debug!("autoplay blocked until the next user gesture");
                    self.pending = Some(media);
                    store.set_phase(TransportPhase::Paused);
                }
            }
            MediaEvent::Failed { error, .. } => {
                warn!(
                    error = %error,
                    cause = ?std::error::Error::source(&error),
                    "track failed to load"
                );
                store.set_phase(TransportPhase::Idle);
            }
        }
    }

    fn attach(&mut self, store: &mut PlaybackStore, media: LoadedMedia) {
        if let Err(e) = self.device.attach(&media) {
            warn!(error = %e, "failed to attach track");
            store.set_phase(TransportPhase::Idle);
            return;
        }
        self.attached = Some(media.generation);
        self.device.set_volume(store.state().effective_volume());
        if let Some(to) = self.pending_seek.take() {
            self.seek_device(store, to);
        }
        if store.state().is_playing {
            self.start(store);
        } else {
            store.set_phase(TransportPhase::Paused);
        }
    }

    /// The store already moved to `to`; if the resource refuses, pull the
    /// clock back to where the audio really is.
    fn seek_device(&mut self, store: &mut PlaybackStore, to: Duration) {
        if let Err(e) = self.device.seek(to) {
            warn!(error = %e, ?to, "seek failed");
            if let Some(at) = self.device.position() {
                store.resync_time(at);
            }
        }
    }

    fn start(&mut self, store: &mut PlaybackStore) {
        self.device.play();
        store.set_phase(TransportPhase::Playing);

        let generation = store.state().generation;
        if self.recorded == Some(generation) {
            return;
        }
        self.recorded = Some(generation);
        if let (Some(recorder), Some(track)) = (&self.recorder, &store.state().current_track) {
            recorder.record_play(track);
        }
    }

    /// Open the graph if needed and start whatever was blocked on it.
    pub fn user_gesture(&mut self, store: &mut PlaybackStore) {
        if self.graph == GraphState::Closed {
            self.open_graph();
        }
        if self.graph != GraphState::Open {
            return;
        }
        if let Some(media) = self.pending.take() {
            if media.generation == store.state().generation {
                self.attach(store, media);
            }
        }
    }

    fn open_graph(&mut self) {
        let tap = SpectrumTap::new(self.bridge.fft_size());
        match self.device.open_graph(tap.clone()) {
            Ok(()) => {
                if !self.bridge.install(tap) {
                    warn!("analyser already installed; keeping the first tap");
                }
                self.graph = GraphState::Open;
            }
            Err(e) => error!(error = %e, "failed to open audio output"),
        }
    }

    /// Mirror the resource clock into the store and detect the natural end.
    pub fn tick(&mut self, store: &mut PlaybackStore) {
        let state = store.state();
        if self.attached != Some(state.generation) || state.phase != TransportPhase::Playing {
            return;
        }
        if let Some(at) = self.device.position() {
            store.set_current_time(at);
        }
        if self.device.is_finished() {
            trace!("track finished");
            store.complete_track();
        }
    }

    /// Fade out and release everything before the engine stops.
    pub fn shutdown(&mut self, store: &PlaybackStore, fade: Duration) {
        if let Some(load) = self.load.take() {
            load.cancel.cancel();
        }
        if self.attached.take().is_some() {
            if store.state().phase == TransportPhase::Playing {
                self.device.fade_out(fade);
            }
            self.device.release();
        }
        self.pending = None;
    }
}

/// Shared recorder handle; lets callers keep the recorder after handing it
/// to a binding.
impl<R: PlayRecorder + Sync> PlayRecorder for Arc<R> {
    fn record_play(&self, track: &Track) {
        (**self).record_play(track);
    }
}
