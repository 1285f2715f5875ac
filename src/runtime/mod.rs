use std::env;
use std::path::PathBuf;
use std::sync::mpsc;

use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use crate::app::App;
use crate::mpris::ControlCmd;
use crate::player::PlayerHandle;

mod event_loop;
mod logging;
mod mpris_sync;
mod settings;
mod startup;

pub use event_loop::UiEvent;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, config_warning) = settings::load_settings();
    let log_file = logging::init_tracing_to_file(&settings.logging);
    if let Some(msg) = config_warning {
        warn!("{msg}");
    }
    info!(log_file = ?log_file, "beatline starting");

    let source = env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let tracks = startup::load_tracks(&source, &settings.library)?;
    let mut app = App::new(tracks);
    app.follow_playback = settings.ui.follow_playback;
    app.show_visualizer = settings.visualizer.visible;
    app.set_source_label(source.display().to_string());

    let player = PlayerHandle::spawn(&settings, Some(Box::new(app.play_counts())))?;
    startup::apply_startup(&app, &player, &settings)?;

    let mut state = event_loop::EventLoopState::new();
    let wake = state.sender();
    let subscription = player.subscribe(Box::new(move |_, _| {
        let _ = wake.send(UiEvent::Changed);
    }));

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mpris = crate::mpris::spawn_mpris(control_tx);

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result: Result<(), Box<dyn std::error::Error>> = (|| {
        state.start_input()?;
        event_loop::run(
            &mut terminal,
            &settings,
            &mut app,
            &player,
            &mpris,
            &control_rx,
            &mut state,
        )
    })();

    state.shutdown();
    if let Some(id) = subscription {
        player.unsubscribe(id);
    }

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("beatline stopped");
    run_result
}
