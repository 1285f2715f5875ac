//! Scripted `MediaDevice` for engine tests.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::spectrum::SpectrumTap;

use super::device::MediaDevice;
use super::types::{LoadRequest, LoadedMedia, MediaError, MediaEventSink};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DeviceCall {
    OpenGraph,
    BeginLoad { generation: u64 },
    Attach { generation: u64 },
    Play,
    Pause,
    Seek(Duration),
    Volume(f32),
    Release,
    FadeOut(Duration),
}

#[derive(Default)]
pub(crate) struct FakeState {
    pub calls: Vec<DeviceCall>,
    pub requests: Vec<LoadRequest>,
    /// Number of upcoming `open_graph` calls that fail.
    pub fail_opens: usize,
    pub fail_attach: bool,
    /// Seeks are refused and the position stays put.
    pub fail_seek: bool,
    pub tap: Option<SpectrumTap>,
    pub attached: Option<u64>,
    /// Attaches made while another resource was still attached.
    pub overlaps: usize,
    pub playing: bool,
    pub position: Duration,
    pub finished: bool,
    pub volume: f32,
}

/// Cloning shares the state, so a test keeps one clone to inspect it.
#[derive(Clone, Default)]
pub(crate) struct FakeDevice {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDevice {
    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.state().calls.clone()
    }

    pub fn count(&self, call: &DeviceCall) -> usize {
        self.state().calls.iter().filter(|c| *c == call).count()
    }

    pub fn last_request(&self) -> LoadRequest {
        self.state().requests.last().cloned().unwrap()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }
}

impl MediaDevice for FakeDevice {
    fn open_graph(&mut self, tap: SpectrumTap) -> Result<(), MediaError> {
        let mut s = self.state();
        s.calls.push(DeviceCall::OpenGraph);
        if s.fail_opens > 0 {
            s.fail_opens -= 1;
            return Err(MediaError::Output("no device".into()));
        }
        s.tap = Some(tap);
        Ok(())
    }

    fn begin_load(&mut self, request: LoadRequest, _events: MediaEventSink) {
        let mut s = self.state();
        s.calls.push(DeviceCall::BeginLoad {
            generation: request.generation,
        });
        s.requests.push(request);
    }

    fn attach(&mut self, media: &LoadedMedia) -> Result<(), MediaError> {
        let mut s = self.state();
        s.calls.push(DeviceCall::Attach {
            generation: media.generation,
        });
        if s.fail_attach {
            return Err(MediaError::NoGraph);
        }
        if s.attached.is_some() {
            s.overlaps += 1;
        }
        s.attached = Some(media.generation);
        s.playing = false;
        s.finished = false;
        s.position = Duration::ZERO;
        if let Some(tap) = &s.tap {
            tap.attach(44_100);
        }
        Ok(())
    }

    fn play(&mut self) {
        let mut s = self.state();
        s.calls.push(DeviceCall::Play);
        s.playing = true;
    }

    fn pause(&mut self) {
        let mut s = self.state();
        s.calls.push(DeviceCall::Pause);
        s.playing = false;
    }

    fn seek(&mut self, to: Duration) -> Result<(), MediaError> {
        let mut s = self.state();
        s.calls.push(DeviceCall::Seek(to));
        if s.fail_seek {
            return Err(MediaError::Seek("not supported".into()));
        }
        s.position = to;
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        let mut s = self.state();
        s.calls.push(DeviceCall::Volume(volume));
        s.volume = volume;
    }

    fn position(&self) -> Option<Duration> {
        let s = self.state();
        s.attached.map(|_| s.position)
    }

    fn is_finished(&self) -> bool {
        let s = self.state();
        s.attached.is_some() && s.finished
    }

    fn release(&mut self) {
        let mut s = self.state();
        s.calls.push(DeviceCall::Release);
        s.attached = None;
        s.playing = false;
        if let Some(tap) = &s.tap {
            tap.detach();
        }
    }

    fn fade_out(&mut self, over: Duration) {
        self.state().calls.push(DeviceCall::FadeOut(over));
    }
}
