//! MPRIS service: desktop media keys and `playerctl` drive the player, and
//! the published playback state is mirrored back onto the session bus.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_io::{Timer, block_on};
use tracing::{debug, warn};
use zbus::{Connection, ObjectServer, interface};
use zvariant::{OwnedObjectPath, OwnedValue, Value};

use crate::catalog::{Track, TrackId};
use crate::playback::PlaybackState;

const MPRIS_PATH: &str = "/org/mpris/MediaPlayer2";
const BUS_NAME: &str = "org.mpris.MediaPlayer2.beatline";

/// Commands received from the desktop. All of them count as user gestures.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlCmd {
    Quit,
    Play,
    Pause,
    PlayPause,
    Stop,
    Next,
    Prev,
    /// Relative seek in microseconds.
    Seek(i64),
    SetVolume(f64),
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlaybackStatus {
    pub fn of(state: &PlaybackState) -> Self {
        match (&state.current_track, state.is_playing) {
            (None, _) => Self::Stopped,
            (Some(_), true) => Self::Playing,
            (Some(_), false) => Self::Paused,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Playing => "Playing",
            Self::Paused => "Paused",
        }
    }
}

#[derive(Debug, Default)]
struct SharedState {
    playback: PlaybackStatus,
    title: Option<String>,
    artist: Vec<String>,
    url: Option<String>,
    art_url: Option<String>,
    length_micros: Option<i64>,
    position_micros: i64,
    volume: f64,
    track_id: Option<OwnedObjectPath>,
}

pub struct MprisHandle {
    state: Arc<Mutex<SharedState>>,
    notify: Sender<()>,
}

/// Object path used as `mpris:trackid`. Characters a D-Bus path cannot
/// carry are replaced with `_`.
fn track_path(id: &TrackId) -> Option<OwnedObjectPath> {
    let mut element: String = id
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if element.is_empty() {
        element.push('_');
    }
    OwnedObjectPath::try_from(format!("/org/beatline/track/{element}")).ok()
}

fn source_url(source: &str) -> String {
    if source.contains("://") {
        source.to_string()
    } else {
        format!("file://{source}")
    }
}

fn micros(d: Duration) -> i64 {
    i64::try_from(d.as_micros()).unwrap_or(i64::MAX)
}

impl MprisHandle {
    fn changed(&self) {
        let _ = self.notify.send(());
    }

    /// Publish the bound track. `length` is zero while unknown.
    pub fn set_track_metadata(&self, track: Option<&Track>, length: Duration) {
        let Ok(mut s) = self.state.lock() else {
            return;
        };
        let track_id = track.and_then(|t| track_path(&t.id));
        let length_micros = (!length.is_zero()).then(|| micros(length));
        if s.track_id == track_id && s.length_micros == length_micros {
            return;
        }

        s.track_id = track_id;
        s.length_micros = length_micros;
        s.title = track.map(|t| t.title.clone());
        s.artist = track
            .and_then(|t| t.producer.clone())
            .into_iter()
            .collect();
        s.url = track.map(|t| source_url(&t.source));
        s.art_url = track.and_then(|t| t.artwork.clone());
        drop(s);
        self.changed();
    }

    pub fn set_playback(&self, playback: PlaybackStatus) {
        let Ok(mut s) = self.state.lock() else {
            return;
        };
        if s.playback != playback {
            s.playback = playback;
            drop(s);
            self.changed();
        }
    }

    /// Position is polled by clients, so it never triggers a signal.
    pub fn set_position(&self, at: Duration) {
        if let Ok(mut s) = self.state.lock() {
            s.position_micros = micros(at);
        }
    }

    pub fn set_volume(&self, effective: f32) {
        let Ok(mut s) = self.state.lock() else {
            return;
        };
        let volume = f64::from(effective);
        if (s.volume - volume).abs() > f64::EPSILON {
            s.volume = volume;
            drop(s);
            self.changed();
        }
    }
}

struct RootIface {
    tx: Sender<ControlCmd>,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {}

    fn quit(&self) {
        let _ = self.tx.send(ControlCmd::Quit);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        "beatline"
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec!["file".into(), "http".into(), "https".into()]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![
            "audio/mpeg".into(),
            "audio/flac".into(),
            "audio/wav".into(),
            "audio/ogg".into(),
        ]
    }
}

struct PlayerIface {
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
}

fn insert(map: &mut HashMap<String, OwnedValue>, key: &str, value: Value<'_>) {
    if let Ok(v) = OwnedValue::try_from(value) {
        map.insert(key.to_string(), v);
    }
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        let _ = self.tx.send(ControlCmd::Next);
    }

    fn previous(&self) {
        let _ = self.tx.send(ControlCmd::Prev);
    }

    fn play(&self) {
        let _ = self.tx.send(ControlCmd::Play);
    }

    fn pause(&self) {
        let _ = self.tx.send(ControlCmd::Pause);
    }

    fn play_pause(&self) {
        let _ = self.tx.send(ControlCmd::PlayPause);
    }

    fn stop(&self) {
        let _ = self.tx.send(ControlCmd::Stop);
    }

    fn seek(&self, offset: i64) {
        let _ = self.tx.send(ControlCmd::Seek(offset));
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        self.state
            .lock()
            .map(|s| s.playback.as_str())
            .unwrap_or("Stopped")
    }

    #[zbus(property(emits_changed_signal = "false"))]
    fn position(&self) -> i64 {
        self.state.lock().map(|s| s.position_micros).unwrap_or(0)
    }

    #[zbus(property)]
    fn volume(&self) -> f64 {
        self.state.lock().map(|s| s.volume).unwrap_or(0.0)
    }

    #[zbus(property)]
    fn set_volume(&mut self, value: f64) {
        let _ = self.tx.send(ControlCmd::SetVolume(value));
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let mut map = HashMap::new();
        let Ok(s) = self.state.lock() else {
            return map;
        };

        if let Some(path) = &s.track_id {
            insert(&mut map, "mpris:trackid", Value::from(path.clone().into_inner()));
        }
        if let Some(title) = &s.title {
            insert(&mut map, "xesam:title", Value::from(title.clone()));
        }
        if !s.artist.is_empty() {
            insert(&mut map, "xesam:artist", Value::from(s.artist.clone()));
        }
        if let Some(url) = &s.url {
            insert(&mut map, "xesam:url", Value::from(url.clone()));
        }
        if let Some(art) = &s.art_url {
            insert(&mut map, "mpris:artUrl", Value::from(art.clone()));
        }
        if let Some(len) = s.length_micros {
            insert(&mut map, "mpris:length", Value::from(len));
        }
        map
    }
}

async fn emit_changes(server: &ObjectServer) -> zbus::Result<()> {
    let iface_ref = server.interface::<_, PlayerIface>(MPRIS_PATH).await?;
    let iface = iface_ref.get().await;
    let emitter = iface_ref.signal_emitter();
    iface.playback_status_changed(emitter).await?;
    iface.metadata_changed(emitter).await?;
    iface.volume_changed(emitter).await?;
    Ok(())
}

async fn serve(
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
    notify: Receiver<()>,
) -> zbus::Result<()> {
    let connection = Connection::session().await?;
    connection.request_name(BUS_NAME).await?;

    let server = connection.object_server();
    server.at(MPRIS_PATH, RootIface { tx: tx.clone() }).await?;
    server.at(MPRIS_PATH, PlayerIface { tx, state }).await?;
    debug!(name = BUS_NAME, "mpris service registered");

    loop {
        Timer::after(Duration::from_millis(200)).await;

        let mut dirty = false;
        loop {
            match notify.try_recv() {
                Ok(()) => dirty = true,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }
        if dirty {
            if let Err(e) = emit_changes(server).await {
                warn!(error = %e, "mpris: failed to emit property changes");
            }
        }
    }
}

/// Start the MPRIS service on its own thread. Bus failures are logged and
/// leave the application running without desktop integration.
pub fn spawn_mpris(tx: Sender<ControlCmd>) -> MprisHandle {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (notify, notify_rx) = mpsc::channel();

    let state_for_thread = state.clone();
    let spawned = std::thread::Builder::new()
        .name("beatline-mpris".into())
        .spawn(move || {
            if let Err(e) = block_on(serve(tx, state_for_thread, notify_rx)) {
                warn!(error = %e, "mpris: service unavailable");
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "mpris: failed to spawn service thread");
    }

    MprisHandle { state, notify }
}
