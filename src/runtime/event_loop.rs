use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{debug, warn};

use crate::app::{App, InputOutcome};
use crate::config;
use crate::mpris::{ControlCmd, MprisHandle};
use crate::playback::{PlaybackState, TransportPhase};
use crate::player::{Origin, PlayerCmd, PlayerHandle};
use crate::runtime::mpris_sync::update_mpris;
use crate::ui;
use crate::visualizer::{FrameLoop, Visualizer};

/// Everything that can wake the UI thread.
pub enum UiEvent {
    Input(Event),
    /// The visualizer published a new frame.
    Frame,
    /// The player published a new state.
    Changed,
}

/// State tracked by the runtime event loop across iterations.
pub struct EventLoopState {
    ui_tx: Sender<UiEvent>,
    ui_rx: Receiver<UiEvent>,
    /// Mounted visualizer; present exactly while the panel is shown.
    frames: Option<FrameLoop>,
    levels: Arc<Mutex<Vec<f32>>>,
    input_stop: Arc<AtomicBool>,
    input: Option<JoinHandle<()>>,
}

impl EventLoopState {
    pub fn new() -> Self {
        let (ui_tx, ui_rx) = mpsc::channel();
        Self {
            ui_tx,
            ui_rx,
            frames: None,
            levels: Arc::new(Mutex::new(Vec::new())),
            input_stop: Arc::new(AtomicBool::new(false)),
            input: None,
        }
    }

    pub fn sender(&self) -> Sender<UiEvent> {
        self.ui_tx.clone()
    }

    /// Forward terminal input onto the UI channel.
    pub fn start_input(&mut self) -> io::Result<()> {
        let tx = self.ui_tx.clone();
        let stop = self.input_stop.clone();
        let join = thread::Builder::new()
            .name("beatline-input".into())
            .spawn(move || {
                while !stop.load(Ordering::Acquire) {
                    match event::poll(Duration::from_millis(50)) {
                        Ok(true) => match event::read() {
                            Ok(ev) => {
                                if tx.send(UiEvent::Input(ev)).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(error = %e, "terminal input failed");
                                break;
                            }
                        },
                        Ok(false) => {}
                        Err(e) => {
                            warn!(error = %e, "terminal input failed");
                            break;
                        }
                    }
                }
            })?;
        self.input = Some(join);
        Ok(())
    }

    /// Unmount the visualizer and stop the input thread.
    pub fn shutdown(&mut self) {
        self.frames = None;
        self.input_stop.store(true, Ordering::Release);
        if let Some(join) = self.input.take() {
            let _ = join.join();
        }
    }

    /// Mount or unmount the visualizer so that a frame loop runs exactly
    /// while the panel is visible.
    fn reconcile_visualizer(
        &mut self,
        show: bool,
        player: &PlayerHandle,
        settings: &config::VisualizerSettings,
    ) {
        match (show, self.frames.is_some()) {
            (true, false) => {
                let mut visualizer = Visualizer::new(player.spectrum().reader(), settings.bars);
                let snapshot = player.snapshot_handle();
                let levels = self.levels.clone();
                let tx = self.ui_tx.clone();
                let interval = Duration::from_secs(1) / settings.fps.max(1);

                let started = FrameLoop::start(interval, move |_| {
                    let playing = snapshot
                        .lock()
                        .map(|s| s.phase == TransportPhase::Playing)
                        .unwrap_or(false);
                    let frame = visualizer.frame(playing);
                    if let Ok(mut l) = levels.lock() {
                        *l = frame;
                    }
                    tx.send(UiEvent::Frame).is_ok()
                });
                match started {
                    Ok(frames) => {
                        debug!(fps = settings.fps, "visualizer mounted");
                        self.frames = Some(frames);
                    }
                    Err(e) => warn!(error = %e, "failed to start visualizer"),
                }
            }
            (false, true) => {
                self.frames = None;
                if let Ok(mut l) = self.levels.lock() {
                    l.clear();
                }
                debug!("visualizer unmounted");
            }
            _ => {}
        }
    }
}

impl Drop for EventLoopState {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn send(player: &PlayerHandle, cmd: PlayerCmd) {
    if let Err(e) = player.send(cmd, Origin::User) {
        warn!(error = %e, "player command dropped");
    }
}

/// Main terminal event loop: draws from the latest published state and
/// turns input and desktop controls into player commands. Returns `Ok(())`
/// when shutdown is requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    player: &PlayerHandle,
    mpris: &MprisHandle,
    control_rx: &Receiver<ControlCmd>,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    let redraw = Duration::from_millis(settings.ui.redraw_ms.max(1));

    loop {
        state.reconcile_visualizer(app.show_visualizer, player, &settings.visualizer);

        let snapshot = player.snapshot();
        app.sync(&snapshot);
        if app.show_visualizer {
            if let Ok(l) = state.levels.lock() {
                app.levels.clone_from(&l);
            }
        }
        update_mpris(mpris, &snapshot);

        terminal.draw(|f| ui::draw(f, app, &snapshot, settings))?;

        while let Ok(cmd) = control_rx.try_recv() {
            if handle_control_cmd(cmd, settings, app, player, &snapshot) {
                return Ok(());
            }
        }

        let outcome = match state.ui_rx.recv_timeout(redraw) {
            Ok(UiEvent::Input(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                app.handle_key(key, &snapshot, &settings.controls)
            }
            Ok(UiEvent::Input(Event::Mouse(mouse))) => app.handle_mouse(mouse, &snapshot),
            Ok(_) | Err(RecvTimeoutError::Timeout) => InputOutcome::Ignored,
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        };

        match outcome {
            InputOutcome::Quit => {
                player.quit_softly(Duration::from_millis(settings.audio.quit_fade_out_ms));
                return Ok(());
            }
            InputOutcome::Send(cmd) => send(player, cmd),
            InputOutcome::Handled | InputOutcome::Ignored => {}
        }
    }
}

/// Returns `true` when the application should exit.
fn handle_control_cmd(
    cmd: ControlCmd,
    settings: &config::Settings,
    app: &mut App,
    player: &PlayerHandle,
    snapshot: &PlaybackState,
) -> bool {
    match cmd {
        ControlCmd::Quit => {
            player.quit_softly(Duration::from_millis(settings.audio.quit_fade_out_ms));
            return true;
        }
        ControlCmd::Play => {
            app.follow_playback_on();
            if snapshot.current_track.is_some() {
                send(player, PlayerCmd::Play);
            } else if let Some(cmd) = app.play_pause_command(snapshot) {
                send(player, cmd);
            }
        }
        ControlCmd::Pause => send(player, PlayerCmd::Pause),
        ControlCmd::PlayPause => {
            app.follow_playback_on();
            if let Some(cmd) = app.play_pause_command(snapshot) {
                send(player, cmd);
            }
        }
        ControlCmd::Stop => send(player, PlayerCmd::Reset),
        ControlCmd::Next => {
            app.follow_playback_on();
            send(player, PlayerCmd::Next);
        }
        ControlCmd::Prev => {
            app.follow_playback_on();
            send(player, PlayerCmd::Previous);
        }
        ControlCmd::Seek(offset_us) => {
            let from = i64::try_from(snapshot.current_time.as_micros()).unwrap_or(i64::MAX);
            let to = from.saturating_add(offset_us).max(0);
            send(player, PlayerCmd::Seek(Duration::from_micros(to.unsigned_abs())));
        }
        ControlCmd::SetVolume(v) => send(player, PlayerCmd::SetVolume(v as f32)),
    }

    false
}
