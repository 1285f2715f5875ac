use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::fake::{DeviceCall, FakeDevice};
use super::*;
use crate::catalog::{Track, TrackId};
use crate::config::{SpectrumSettings, WaveformSettings};
use crate::playback::{LoopMode, PlaybackStore, TransportPhase};
use crate::spectrum::SpectrumBridge;
use crate::waveform::WaveformPeaks;

fn t(id: &str) -> Arc<Track> {
    Arc::new(Track {
        id: TrackId::new(id),
        title: id.to_uppercase(),
        producer: None,
        source: format!("/beats/{id}.mp3"),
        artwork: None,
        display: id.to_uppercase(),
    })
}

fn media(generation: u64, secs: u64) -> MediaEvent {
    MediaEvent::Loaded(LoadedMedia {
        generation,
        source: format!("gen-{generation}"),
        bytes: Arc::from(Vec::new()),
        duration: Duration::from_secs(secs),
        peaks: Arc::new(WaveformPeaks::from_buckets(vec![0.2, 1.0, 0.6])),
    })
}

#[derive(Default)]
struct Recorder {
    plays: Mutex<Vec<String>>,
}

impl PlayRecorder for Recorder {
    fn record_play(&self, track: &Track) {
        self.plays.lock().unwrap().push(track.id.as_str().to_string());
    }
}

struct Rig {
    store: PlaybackStore,
    binding: MediaBinding<FakeDevice>,
    device: FakeDevice,
    bridge: SpectrumBridge,
    recorder: Arc<Recorder>,
}

impl Rig {
    fn new() -> Self {
        let device = FakeDevice::default();
        let bridge = SpectrumBridge::new(&SpectrumSettings::default());
        let recorder = Arc::new(Recorder::default());
        let events: MediaEventSink = Arc::new(|_| {});
        let binding = MediaBinding::new(device.clone(), bridge.clone(), events)
            .with_recorder(Box::new(recorder.clone()));
        Self {
            store: PlaybackStore::new(),
            binding,
            device,
            bridge,
            recorder,
        }
    }

    fn sync(&mut self) {
        self.binding.sync(&mut self.store);
    }

    fn select(&mut self, id: &str) {
        self.store.set_current_track(t(id));
        self.sync();
    }

    fn gesture(&mut self) {
        self.binding.user_gesture(&mut self.store);
        self.sync();
    }

    fn deliver(&mut self, event: MediaEvent) {
        self.binding.on_event(&mut self.store, event);
        self.sync();
    }

    fn load_current(&mut self, secs: u64) {
        let generation = self.store.state().generation;
        self.deliver(media(generation, secs));
    }

    fn tick(&mut self) {
        self.binding.tick(&mut self.store);
        self.sync();
    }

    /// Graph open, `id` attached and playing.
    fn playing(id: &str) -> Self {
        let mut rig = Self::new();
        rig.gesture();
        rig.select(id);
        rig.load_current(30);
        assert_eq!(rig.phase(), TransportPhase::Playing);
        rig
    }

    fn phase(&self) -> TransportPhase {
        self.store.state().phase
    }

    fn current_id(&self) -> Option<String> {
        self.store
            .state()
            .current_track
            .as_ref()
            .map(|t| t.id.as_str().to_string())
    }
}

#[test]
fn track_change_starts_a_load_for_the_new_generation() {
    let mut rig = Rig::new();
    rig.select("a");

    assert_eq!(rig.phase(), TransportPhase::Loading);
    let request = rig.device.last_request();
    assert_eq!(request.generation, rig.store.state().generation);
    assert_eq!(request.source, "/beats/a.mp3");
    assert!(!request.cancel.is_cancelled());
}

#[test]
fn load_before_any_gesture_is_blocked_then_started_by_the_next_gesture() {
    let mut rig = Rig::new();
    rig.select("a");
    rig.load_current(30);

    assert_eq!(rig.phase(), TransportPhase::Paused);
    assert!(rig.store.state().is_playing);
    assert_eq!(rig.store.state().duration, Duration::from_secs(30));
    assert!(rig.store.state().waveform.is_some());
    assert!(rig.binding.has_pending_media());
    assert_eq!(rig.device.count(&DeviceCall::OpenGraph), 0);
    assert_eq!(rig.device.count(&DeviceCall::Play), 0);

    rig.gesture();

    assert_eq!(rig.binding.graph_state(), GraphState::Open);
    assert_eq!(rig.phase(), TransportPhase::Playing);
    assert!(rig.device.state().playing);
    assert!(!rig.binding.has_pending_media());
}

#[test]
fn graph_is_opened_once_and_retried_after_failure() {
    let mut rig = Rig::new();
    rig.device.state().fail_opens = 1;
    rig.select("a");
    rig.load_current(30);

    rig.gesture();
    assert_eq!(rig.binding.graph_state(), GraphState::Closed);
    assert_eq!(rig.phase(), TransportPhase::Paused);
    assert!(rig.binding.has_pending_media());

    rig.gesture();
    assert_eq!(rig.binding.graph_state(), GraphState::Open);
    assert_eq!(rig.phase(), TransportPhase::Playing);

    rig.gesture();
    assert_eq!(rig.device.count(&DeviceCall::OpenGraph), 2);
}

#[test]
fn rapid_switching_only_attaches_the_last_track() {
    let mut rig = Rig::new();
    rig.gesture();
    rig.select("a");
    let first = rig.store.state().generation;
    rig.select("b");
    rig.select("c");
    let last = rig.store.state().generation;

    // A's load finishes late.
    rig.deliver(media(first, 10));
    assert_eq!(rig.phase(), TransportPhase::Loading);
    assert_eq!(rig.store.state().duration, Duration::ZERO);

    rig.deliver(media(last, 20));

    let requests = rig.device.state().requests.clone();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].cancel.is_cancelled());
    assert!(requests[1].cancel.is_cancelled());
    assert!(!requests[2].cancel.is_cancelled());
    assert_eq!(
        rig.device
            .calls()
            .iter()
            .filter(|c| matches!(c, DeviceCall::Attach { .. }))
            .count(),
        1
    );
    assert_eq!(rig.device.state().attached, Some(last));
    assert_eq!(rig.current_id().as_deref(), Some("c"));
    assert_eq!(rig.phase(), TransportPhase::Playing);
}

#[test]
fn binds_superseded_within_one_batch_never_load() {
    let mut rig = Rig::new();
    rig.store.set_current_track(t("a"));
    rig.store.set_current_track(t("b"));
    rig.sync();

    let requests = rig.device.state().requests.clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].source, "/beats/b.mp3");
}

#[test]
fn switching_releases_the_old_resource_before_attaching_the_new_one() {
    let mut rig = Rig::playing("a");
    rig.device.clear_calls();

    rig.select("b");
    rig.load_current(40);

    let calls = rig.device.calls();
    let release = calls.iter().position(|c| *c == DeviceCall::Release).unwrap();
    let attach = calls
        .iter()
        .position(|c| matches!(c, DeviceCall::Attach { .. }))
        .unwrap();
    assert!(release < attach);
    assert_eq!(rig.device.state().overlaps, 0);
}

#[test]
fn load_failure_goes_idle_and_play_retries() {
    let mut rig = Rig::new();
    rig.gesture();
    rig.select("a");
    let generation = rig.store.state().generation;

    rig.deliver(MediaEvent::Failed {
        generation,
        error: MediaError::Empty {
            location: "/beats/a.mp3".into(),
        },
    });

    assert_eq!(rig.phase(), TransportPhase::Idle);
    assert!(rig.store.state().is_playing);
    assert_eq!(rig.current_id().as_deref(), Some("a"));

    rig.store.play();
    rig.sync();
    assert_eq!(rig.phase(), TransportPhase::Loading);
    assert_eq!(rig.device.last_request().generation, generation + 1);
}

#[test]
fn attach_failure_goes_idle() {
    let mut rig = Rig::new();
    rig.gesture();
    rig.device.state().fail_attach = true;
    rig.select("a");

    rig.load_current(30);

    assert_eq!(rig.phase(), TransportPhase::Idle);
    assert_eq!(rig.binding.attached(), None);
    assert_eq!(rig.device.count(&DeviceCall::Play), 0);
}

#[test]
fn stale_failure_is_ignored() {
    let mut rig = Rig::new();
    rig.select("a");
    let old = rig.store.state().generation;
    rig.select("b");

    rig.deliver(MediaEvent::Failed {
        generation: old,
        error: MediaError::NoGraph,
    });

    assert_eq!(rig.phase(), TransportPhase::Loading);
}

#[test]
fn pausing_while_loading_completes_paused() {
    let mut rig = Rig::new();
    rig.gesture();
    rig.select("a");
    rig.store.pause();
    rig.sync();
    assert_eq!(rig.phase(), TransportPhase::Loading);

    rig.load_current(30);

    assert_eq!(rig.phase(), TransportPhase::Paused);
    assert_eq!(rig.device.count(&DeviceCall::Play), 0);
    assert!(rig.recorder.plays.lock().unwrap().is_empty());
}

#[test]
fn seek_during_pause_stays_paused() {
    let mut rig = Rig::playing("a");
    rig.store.pause();
    rig.sync();
    rig.device.clear_calls();

    rig.store.seek(Duration::from_secs(10));
    rig.sync();

    assert_eq!(rig.device.calls(), vec![DeviceCall::Seek(Duration::from_secs(10))]);
    assert!(!rig.store.state().is_playing);
    assert_eq!(rig.phase(), TransportPhase::Paused);
    assert_eq!(rig.store.state().current_time, Duration::from_secs(10));
}

#[test]
fn seek_before_load_is_applied_on_attach() {
    let mut rig = Rig::new();
    rig.gesture();
    rig.select("a");
    rig.store.seek(Duration::from_secs(5));
    rig.sync();

    rig.load_current(30);

    let calls = rig.device.calls();
    let seek = calls
        .iter()
        .position(|c| *c == DeviceCall::Seek(Duration::from_secs(5)))
        .unwrap();
    let play = calls.iter().position(|c| *c == DeviceCall::Play).unwrap();
    assert!(seek < play);
}

#[test]
fn refused_seek_puts_the_clock_back_on_the_resource() {
    let mut rig = Rig::playing("a");
    rig.device.state().position = Duration::from_secs(3);
    rig.tick();
    rig.device.state().fail_seek = true;

    rig.store.seek(Duration::from_secs(20));
    rig.sync();
    assert_eq!(rig.store.state().current_time, Duration::from_secs(3));

    for secs in 4..=8 {
        rig.device.state().position = Duration::from_secs(secs);
        rig.tick();
    }
    assert_eq!(rig.store.state().current_time, Duration::from_secs(8));
    assert_eq!(rig.phase(), TransportPhase::Playing);
}

#[test]
fn refused_pending_seek_starts_from_the_top() {
    let mut rig = Rig::new();
    rig.gesture();
    rig.select("a");
    rig.device.state().fail_seek = true;
    rig.store.seek(Duration::from_secs(5));
    rig.sync();

    rig.load_current(30);

    assert_eq!(rig.store.state().current_time, Duration::ZERO);
    rig.device.state().position = Duration::from_secs(1);
    rig.tick();
    assert_eq!(rig.store.state().current_time, Duration::from_secs(1));
}

#[test]
fn volume_and_mute_apply_the_effective_volume() {
    let mut rig = Rig::playing("a");

    rig.store.set_volume(0.4);
    rig.sync();
    assert_eq!(rig.device.state().volume, 0.4);

    rig.store.mute();
    rig.sync();
    assert_eq!(rig.device.state().volume, 0.0);

    rig.store.unmute();
    rig.sync();
    assert_eq!(rig.device.state().volume, 0.4);
}

#[test]
fn new_resource_starts_at_the_current_volume() {
    let mut rig = Rig::new();
    rig.gesture();
    rig.store.set_volume(0.3);
    rig.sync();
    rig.select("a");
    rig.device.state().volume = 1.0;

    rig.load_current(30);

    assert_eq!(rig.device.state().volume, 0.3);
}

#[test]
fn ticks_mirror_position_monotonically() {
    let mut rig = Rig::playing("a");

    rig.device.state().position = Duration::from_secs(3);
    rig.tick();
    assert_eq!(rig.store.state().current_time, Duration::from_secs(3));

    rig.device.state().position = Duration::from_secs(2);
    rig.tick();
    assert_eq!(rig.store.state().current_time, Duration::from_secs(3));

    rig.device.state().position = Duration::from_secs(4);
    rig.tick();
    assert_eq!(rig.store.state().current_time, Duration::from_secs(4));
}

#[test]
fn paused_resource_is_not_polled() {
    let mut rig = Rig::playing("a");
    rig.store.pause();
    rig.sync();

    rig.device.state().position = Duration::from_secs(7);
    rig.device.state().finished = true;
    rig.tick();

    assert_eq!(rig.store.state().current_time, Duration::ZERO);
    assert_eq!(rig.current_id().as_deref(), Some("a"));
}

#[test]
fn completion_chains_forward_and_stops_at_the_end_of_the_queue() {
    let mut rig = Rig::new();
    rig.gesture();
    rig.store.set_queue(vec![t("a"), t("b")]);
    rig.store.set_loop_mode(LoopMode::NoLoop);
    rig.select("a");
    rig.load_current(30);

    rig.device.state().finished = true;
    rig.tick();

    assert_eq!(rig.current_id().as_deref(), Some("b"));
    assert!(rig.store.state().is_playing);
    assert_eq!(rig.store.state().current_time, Duration::ZERO);
    assert_eq!(rig.phase(), TransportPhase::Loading);

    rig.load_current(30);
    rig.device.state().finished = true;
    rig.tick();

    assert_eq!(rig.current_id().as_deref(), Some("b"));
    assert!(!rig.store.state().is_playing);
    assert_eq!(rig.phase(), TransportPhase::Idle);
    assert_eq!(rig.device.state().attached, None);
}

#[test]
fn loop_one_replays_the_same_track() {
    let mut rig = Rig::new();
    rig.gesture();
    rig.store.set_queue(vec![t("a"), t("b")]);
    rig.store.set_loop_mode(LoopMode::LoopOne);
    rig.select("a");
    rig.load_current(30);
    let generation = rig.store.state().generation;

    rig.device.state().finished = true;
    rig.tick();

    assert_eq!(rig.current_id().as_deref(), Some("a"));
    assert_eq!(rig.store.state().generation, generation + 1);
    assert_eq!(rig.device.last_request().generation, generation + 1);
}

#[test]
fn plays_are_recorded_once_per_binding() {
    let mut rig = Rig::playing("a");
    rig.store.pause();
    rig.sync();
    rig.store.play();
    rig.sync();

    assert_eq!(*rig.recorder.plays.lock().unwrap(), vec!["a".to_string()]);

    rig.select("b");
    rig.load_current(30);
    assert_eq!(rig.recorder.plays.lock().unwrap().len(), 2);
}

#[test]
fn analyser_is_silent_until_the_graph_exists_and_after_teardown() {
    let mut rig = Rig::new();
    assert!(!rig.bridge.is_installed());
    assert!(rig.bridge.reader().read().is_silent());

    rig.gesture();
    assert!(rig.bridge.is_installed());

    rig.select("a");
    rig.load_current(30);
    let tap = rig.device.state().tap.clone().unwrap();
    assert!(tap.is_attached());

    rig.store.reset();
    rig.sync();

    assert!(!tap.is_attached());
    assert!(rig.bridge.reader().read().is_silent());
    assert_eq!(rig.phase(), TransportPhase::Idle);
}

#[test]
fn reset_cancels_an_in_flight_load() {
    let mut rig = Rig::new();
    rig.select("a");
    let request = rig.device.last_request();

    rig.store.reset();
    rig.sync();

    assert!(request.cancel.is_cancelled());
    assert_eq!(rig.phase(), TransportPhase::Idle);

    rig.deliver(media(request.generation, 30));
    assert_eq!(rig.phase(), TransportPhase::Idle);
    assert_eq!(rig.store.state().duration, Duration::ZERO);
}

#[test]
fn shutdown_fades_out_a_playing_resource() {
    let mut rig = Rig::playing("a");
    rig.device.clear_calls();

    rig.binding.shutdown(&rig.store, Duration::from_millis(300));

    assert_eq!(
        rig.device.calls(),
        vec![
            DeviceCall::FadeOut(Duration::from_millis(300)),
            DeviceCall::Release
        ]
    );
}

#[test]
fn source_location_recognises_urls_and_paths() {
    use std::path::PathBuf;

    assert_eq!(
        SourceLocation::parse("https://cdn.example.com/a.mp3"),
        SourceLocation::Remote("https://cdn.example.com/a.mp3".into())
    );
    assert_eq!(
        SourceLocation::parse("HTTP://cdn.example.com/a.mp3"),
        SourceLocation::Remote("HTTP://cdn.example.com/a.mp3".into())
    );
    assert_eq!(
        SourceLocation::parse("file:///srv/beats/a.wav"),
        SourceLocation::Local(PathBuf::from("/srv/beats/a.wav"))
    );
    assert_eq!(
        SourceLocation::parse(" beats/a.wav "),
        SourceLocation::Local(PathBuf::from("beats/a.wav"))
    );
}

/// Minimal mono PCM16 WAV file.
fn wav_bytes(sample_rate: u32, samples: &[i16]) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let mut b = Vec::new();
    b.extend_from_slice(b"RIFF");
    b.extend_from_slice(&(36 + data_len).to_le_bytes());
    b.extend_from_slice(b"WAVE");
    b.extend_from_slice(b"fmt ");
    b.extend_from_slice(&16u32.to_le_bytes());
    b.extend_from_slice(&1u16.to_le_bytes());
    b.extend_from_slice(&1u16.to_le_bytes());
    b.extend_from_slice(&sample_rate.to_le_bytes());
    b.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    b.extend_from_slice(&2u16.to_le_bytes());
    b.extend_from_slice(&16u16.to_le_bytes());
    b.extend_from_slice(b"data");
    b.extend_from_slice(&data_len.to_le_bytes());
    for s in samples {
        b.extend_from_slice(&s.to_le_bytes());
    }
    b
}

fn request(source: String) -> LoadRequest {
    LoadRequest {
        generation: 7,
        source,
        cancel: CancelToken::new(),
    }
}

#[test]
fn loader_reads_local_file_and_computes_duration_and_peaks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("beat.wav");
    let samples: Vec<i16> = (0..8000)
        .map(|i| {
            let amp = if i < 4000 { 16_000 } else { 4_000 };
            if i % 2 == 0 { amp } else { -amp }
        })
        .collect();
    std::fs::write(&path, wav_bytes(8000, &samples)).unwrap();
    let settings = WaveformSettings {
        buckets: 8,
        block_frames: 100,
    };

    let loaded = load(
        &request(format!("file://{}", path.display())),
        &http_client().unwrap(),
        &settings,
    )
    .unwrap()
    .unwrap();

    assert_eq!(loaded.generation, 7);
    assert!((loaded.duration.as_secs_f64() - 1.0).abs() < 0.01);
    let peaks = loaded.peaks.buckets();
    assert_eq!(peaks.len(), 8);
    assert!((peaks[0] - 1.0).abs() < 1e-3);
    assert!(peaks[7] < 0.5);
}

#[test]
fn loader_reports_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("gone.wav");

    let err = load(
        &request(missing.display().to_string()),
        &http_client().unwrap(),
        &WaveformSettings::default(),
    )
    .unwrap_err();

    assert!(matches!(err, MediaError::Read { .. }));
    assert!(err.to_string().contains("gone.wav"));
}

#[test]
fn loader_rejects_undecodable_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("noise.mp3");
    std::fs::write(&path, b"definitely not audio").unwrap();

    let err = load(
        &request(path.display().to_string()),
        &http_client().unwrap(),
        &WaveformSettings::default(),
    )
    .unwrap_err();

    assert!(matches!(err, MediaError::Decode { .. }));
}

#[test]
fn cancelled_load_yields_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("beat.wav");
    std::fs::write(&path, wav_bytes(8000, &[1000; 800])).unwrap();
    let req = request(path.display().to_string());
    req.cancel.cancel();

    let out = load(&req, &http_client().unwrap(), &WaveformSettings::default()).unwrap();
    assert!(out.is_none());
}

/// Endless source that cancels `token` once `cancel_after` reads were served.
struct StallingSource {
    reads: usize,
    cancel_after: usize,
    token: CancelToken,
}

impl std::io::Read for StallingSource {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reads += 1;
        if self.reads == self.cancel_after {
            self.token.cancel();
        }
        let n = buf.len().min(1024);
        buf[..n].fill(0x55);
        Ok(n)
    }
}

#[test]
fn cancelling_mid_download_stops_reading() {
    let token = CancelToken::new();
    let mut source = StallingSource {
        reads: 0,
        cancel_after: 3,
        token: token.clone(),
    };

    let out = super::loader::read_cancellable(&mut source, 0, &token).unwrap();

    assert!(out.is_none());
    assert_eq!(source.reads, 3);
}

#[test]
fn uncancelled_reads_collect_every_chunk() {
    let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

    let out = super::loader::read_cancellable(
        std::io::Cursor::new(data.clone()),
        data.len(),
        &CancelToken::new(),
    )
    .unwrap();

    assert_eq!(out, Some(data));
}
