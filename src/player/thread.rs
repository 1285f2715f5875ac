use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use tracing::{debug, trace};

use crate::config::{AudioSettings, PlaybackSettings, WaveformSettings};
use crate::media::{MediaBinding, MediaDevice, MediaEventSink, PlayRecorder, RodioDevice};
use crate::playback::{Listener, PlaybackStore};
use crate::spectrum::SpectrumBridge;

use super::engine::Player;
use super::types::{Origin, PlayerCmd, PlayerMsg};

/// Everything the engine thread needs to build its player.
pub(super) struct EngineParts {
    pub rx: Receiver<PlayerMsg>,
    pub events: MediaEventSink,
    pub bridge: SpectrumBridge,
    pub client: Client,
    pub publisher: Listener,
    pub recorder: Option<Box<dyn PlayRecorder>>,
    pub audio: AudioSettings,
    pub playback: PlaybackSettings,
    pub waveform: WaveformSettings,
}

/// Spawn the engine thread. The output device is built on that thread and
/// never leaves it.
pub(super) fn spawn_player_thread(parts: EngineParts) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("beatline-player".into())
        .spawn(move || {
            let EngineParts {
                rx,
                events,
                bridge,
                client,
                publisher,
                recorder,
                audio,
                playback,
                waveform,
            } = parts;

            let device = RodioDevice::with_client(client, waveform);
            let mut binding = MediaBinding::new(device, bridge, events);
            if let Some(recorder) = recorder {
                binding = binding.with_recorder(recorder);
            }
            let mut player = Player::new(PlaybackStore::new(), binding);
            player.subscribe(publisher);
            apply_defaults(&mut player, &audio, &playback);

            run_player(&mut player, &rx, Duration::from_millis(audio.tick_ms.max(1)));
        })
}

pub(super) fn apply_defaults<D: MediaDevice>(
    player: &mut Player<D>,
    audio: &AudioSettings,
    playback: &PlaybackSettings,
) {
    let init = [
        Some(PlayerCmd::SetVolume(audio.initial_volume)),
        Some(PlayerCmd::SetLoopMode(playback.loop_mode.into())),
        playback.shuffle.then_some(PlayerCmd::ToggleShuffle),
    ];
    for cmd in init.into_iter().flatten() {
        player.handle(cmd, Origin::Programmatic);
    }
}

/// Serve messages until `Quit` or until every sender is gone, ticking the
/// engine at least every `tick`.
pub(super) fn run_player<D: MediaDevice>(
    player: &mut Player<D>,
    rx: &Receiver<PlayerMsg>,
    tick: Duration,
) {
    let mut last_tick = Instant::now();
    loop {
        let wait = tick.saturating_sub(last_tick.elapsed());
        match rx.recv_timeout(wait) {
            Ok(PlayerMsg::Cmd { cmd, origin }) => {
                trace!(?origin, "player command");
                player.handle(cmd, origin);
            }
            Ok(PlayerMsg::Media(event)) => player.on_media_event(event),
            Ok(PlayerMsg::Subscribe { listener, reply }) => {
                let id = player.subscribe(listener);
                let _ = reply.send(id);
            }
            Ok(PlayerMsg::Unsubscribe(id)) => {
                player.unsubscribe(id);
            }
            Ok(PlayerMsg::Quit { fade }) => {
                debug!(?fade, "player quitting");
                player.shutdown(fade);
                break;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                player.shutdown(Duration::ZERO);
                break;
            }
        }

        if last_tick.elapsed() >= tick {
            player.tick();
            last_tick = Instant::now();
        }
    }
}
