use crate::mpris::{MprisHandle, PlaybackStatus};
use crate::playback::PlaybackState;

pub fn update_mpris(mpris: &MprisHandle, state: &PlaybackState) {
    mpris.set_track_metadata(state.current_track.as_deref(), state.duration);
    mpris.set_playback(PlaybackStatus::of(state));
    mpris.set_position(state.current_time);
    mpris.set_volume(state.effective_volume());
}
