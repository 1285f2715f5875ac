//! Utilities for creating `rodio` sinks from loaded media.
//!
//! The helper here decodes the in-memory resource, routes it through the
//! analyser tap and prepares a paused `Sink` on the graph's mixer.

use std::io::Cursor;
use std::thread;
use std::time::Duration;

use rodio::{Decoder, OutputStream, Sink, Source};

use crate::spectrum::{SpectrumTap, TappedSource};

use super::types::{LoadedMedia, MediaError};

const FADE_STEPS: u32 = 20;

/// Create a paused `Sink` for `media`, feeding `tap` while it plays.
pub(super) fn create_sink(
    stream: &OutputStream,
    tap: &SpectrumTap,
    media: &LoadedMedia,
) -> Result<Sink, MediaError> {
    let decoder =
        Decoder::new(Cursor::new(media.bytes.clone())).map_err(|source| MediaError::Decode {
            location: media.source.clone(),
            source,
        })?;
    let route = tap.attach(decoder.sample_rate());

    let sink = Sink::connect_new(stream.mixer());
    sink.pause();
    sink.append(TappedSource::new(decoder, tap.clone(), route));
    Ok(sink)
}

/// Ramp `sink` from its current volume to silence over `over`.
pub(super) fn fade_out_sink(sink: &Sink, over: Duration) {
    let start = sink.volume();
    if over.is_zero() || start <= 0.0 {
        sink.set_volume(0.0);
        return;
    }
    let step = (over / FADE_STEPS).max(Duration::from_millis(1));
    for i in 1..=FADE_STEPS {
        let t = i as f32 / FADE_STEPS as f32;
        sink.set_volume(start * (1.0 - t));
        thread::sleep(step);
    }
    sink.set_volume(0.0);
}
