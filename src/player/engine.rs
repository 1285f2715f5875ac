use std::time::Duration;

use crate::media::{MediaBinding, MediaDevice, MediaEvent};
use crate::playback::{Listener, PlaybackStore, SubscriptionId};

use super::types::{Origin, PlayerCmd};

/// The single-threaded core: the store and the binding that follows it.
///
/// Every input ends with a `sync`, so by the time a call returns the media
/// resource reflects the store.
pub struct Player<D: MediaDevice> {
    store: PlaybackStore,
    binding: MediaBinding<D>,
}

impl<D: MediaDevice> Player<D> {
    pub fn new(store: PlaybackStore, binding: MediaBinding<D>) -> Self {
        Self { store, binding }
    }

    pub fn store(&self) -> &PlaybackStore {
        &self.store
    }

    pub fn binding(&self) -> &MediaBinding<D> {
        &self.binding
    }

    pub fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
        self.store.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    pub fn handle(&mut self, cmd: PlayerCmd, origin: Origin) {
        self.apply(cmd);
        self.binding.sync(&mut self.store);
        // The command has settled; a gesture may now unblock the output.
        if origin == Origin::User {
            self.binding.user_gesture(&mut self.store);
            self.binding.sync(&mut self.store);
        }
    }

    fn apply(&mut self, cmd: PlayerCmd) {
        let store = &mut self.store;
        match cmd {
            PlayerCmd::SetQueue(tracks) => store.set_queue(tracks),
            PlayerCmd::SetCurrentTrack(track) => store.set_current_track(track),
            PlayerCmd::Play => store.play(),
            PlayerCmd::Pause => store.pause(),
            PlayerCmd::TogglePlayPause => store.toggle_play_pause(),
            PlayerCmd::Seek(to) => store.seek(to),
            PlayerCmd::SeekBy(secs) => store.seek_by(secs),
            PlayerCmd::Next => store.play_next(),
            PlayerCmd::Previous => store.play_previous(),
            PlayerCmd::SetVolume(v) => store.set_volume(v),
            PlayerCmd::AdjustVolume(delta) => store.adjust_volume(delta),
            PlayerCmd::Mute => store.mute(),
            PlayerCmd::Unmute => store.unmute(),
            PlayerCmd::ToggleMute => store.toggle_mute(),
            PlayerCmd::SetLoopMode(mode) => store.set_loop_mode(mode),
            PlayerCmd::ToggleShuffle => store.toggle_shuffle(),
            PlayerCmd::Reset => store.reset(),
        }
    }

    pub fn on_media_event(&mut self, event: MediaEvent) {
        self.binding.on_event(&mut self.store, event);
        self.binding.sync(&mut self.store);
    }

    pub fn tick(&mut self) {
        self.binding.tick(&mut self.store);
        self.binding.sync(&mut self.store);
    }

    pub fn shutdown(&mut self, fade: Duration) {
        self.binding.shutdown(&self.store, fade);
    }
}
