use std::time::Duration;

use reqwest::blocking::Client;
use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tracing::{debug, error};

use crate::config::WaveformSettings;
use crate::spectrum::SpectrumTap;

use super::device::MediaDevice;
use super::loader;
use super::sink::{create_sink, fade_out_sink};
use super::types::{LoadRequest, LoadedMedia, MediaError, MediaEvent, MediaEventSink};

/// `MediaDevice` backed by the default output device.
///
/// The output stream is only opened by `open_graph`, so constructing the
/// device never touches the sound card. Not `Send` once the graph is open:
/// build and use it on the player thread.
pub struct RodioDevice {
    stream: Option<OutputStream>,
    tap: Option<SpectrumTap>,
    sink: Option<Sink>,
    volume: f32,
    client: Client,
    waveform: WaveformSettings,
}

impl RodioDevice {
    /// `client` fetches remote sources; see `http_client`.
    pub fn with_client(client: Client, waveform: WaveformSettings) -> Self {
        Self {
            stream: None,
            tap: None,
            sink: None,
            volume: 1.0,
            client,
            waveform,
        }
    }
}

impl MediaDevice for RodioDevice {
    fn open_graph(&mut self, tap: SpectrumTap) -> Result<(), MediaError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| MediaError::Output(e.to_string()))?;
        // rodio logs to stderr when OutputStream is dropped, which would
        // scribble over the TUI.
        stream.log_on_drop(false);
        self.stream = Some(stream);
        self.tap = Some(tap);
        debug!("audio graph opened");
        Ok(())
    }

    fn begin_load(&mut self, request: LoadRequest, events: MediaEventSink) {
        let generation = request.generation;
        let spawned = loader::spawn(
            request,
            self.client.clone(),
            self.waveform.clone(),
            events.clone(),
        );
        if let Err(e) = spawned {
            error!(error = %e, "failed to spawn loader thread");
            events(MediaEvent::Failed {
                generation,
                error: MediaError::Output(e.to_string()),
            });
        }
    }

    fn attach(&mut self, media: &LoadedMedia) -> Result<(), MediaError> {
        let (Some(stream), Some(tap)) = (self.stream.as_ref(), self.tap.as_ref()) else {
            return Err(MediaError::NoGraph);
        };
        if let Some(old) = self.sink.take() {
            old.stop();
        }
        let sink = create_sink(stream, tap, media)?;
        sink.set_volume(self.volume);
        self.sink = Some(sink);
        Ok(())
    }

    fn play(&mut self) {
        if let Some(s) = &self.sink {
            s.play();
        }
    }

    fn pause(&mut self) {
        if let Some(s) = &self.sink {
            s.pause();
        }
    }

    fn seek(&mut self, to: Duration) -> Result<(), MediaError> {
        match &self.sink {
            Some(s) => s.try_seek(to).map_err(|e| MediaError::Seek(e.to_string())),
            None => Ok(()),
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        if let Some(s) = &self.sink {
            s.set_volume(volume);
        }
    }

    fn position(&self) -> Option<Duration> {
        self.sink.as_ref().map(|s| s.get_pos())
    }

    fn is_finished(&self) -> bool {
        self.sink.as_ref().is_some_and(|s| s.empty())
    }

    fn release(&mut self) {
        if let Some(s) = self.sink.take() {
            s.stop();
        }
        if let Some(tap) = &self.tap {
            tap.detach();
        }
    }

    fn fade_out(&mut self, over: Duration) {
        if let Some(s) = &self.sink {
            if !s.is_paused() {
                fade_out_sink(s, over);
            }
        }
    }
}
