use std::time::Duration;

use crate::spectrum::SpectrumTap;

use super::types::{LoadRequest, LoadedMedia, MediaError, MediaEventSink};

/// The output side the binding drives.
///
/// A device owns at most one attached resource at a time. `attach` always
/// leaves the new resource paused; the binding decides when it starts.
pub trait MediaDevice {
    /// Build the output graph around `tap`. Called at most once successfully.
    fn open_graph(&mut self, tap: SpectrumTap) -> Result<(), MediaError>;

    /// Start fetching and decoding off-thread. Results go to `events` unless
    /// the request is cancelled first.
    fn begin_load(&mut self, request: LoadRequest, events: MediaEventSink);

    fn attach(&mut self, media: &LoadedMedia) -> Result<(), MediaError>;

    fn play(&mut self);

    fn pause(&mut self);

    fn seek(&mut self, to: Duration) -> Result<(), MediaError>;

    /// Applies to the attached resource and to every later one.
    fn set_volume(&mut self, volume: f32);

    fn position(&self) -> Option<Duration>;

    /// The attached resource played to its end.
    fn is_finished(&self) -> bool;

    /// Stop and drop the attached resource and detach it from the tap.
    fn release(&mut self);

    /// Ramp the attached resource down to silence, blocking for `over`.
    fn fade_out(&mut self, over: Duration);
}
