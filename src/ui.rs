//! UI rendering helpers for the terminal user interface.
//!
//! Every surface here is a pure function of the `App` view model and the
//! latest published `PlaybackState`; nothing in this module talks to the
//! player directly.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style, Stylize},
    widgets::{Block, Borders, Clear, List, ListItem, Padding, Paragraph, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock, time::Duration};

use crate::app::{App, CardState};
use crate::catalog::{Track, display_from_fields};
use crate::config::{ControlsSettings, Settings, TimeField, TrackDisplayField, UiSettings};
use crate::playback::{LoopMode, PlaybackState, TransportPhase};
use crate::visualizer::SpectrumBars;
use crate::waveform::WaveformView;

static CONTROLS_MAP: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = BTreeMap::new();
    map.insert("j/k", "up/down");
    map.insert("gg/G", "top/bottom");
    map.insert("zz", "go to playing");
    map.insert("enter", "play selected");
    map.insert("space/p", "play/pause");
    map.insert("h/l", "prev/next");
    // H/L and +/- are filled in from config.
    map.insert("m", "mute");
    map.insert("s", "shuffle");
    map.insert("r", "loop mode");
    map.insert("x", "stop");
    map.insert("K", "details");
    map.insert("v", "visualizer");
    map.insert("q", "quit");
    map
});

/// Render the controls help text, incorporating the configured steps.
fn controls_text(controls: &ControlsSettings) -> String {
    let order = [
        "j/k", "h/l", "H/L", "enter", "space/p", "+/-", "m", "gg/G", "zz", "K", "v", "s", "r",
        "x", "q",
    ];
    order
        .iter()
        .filter_map(|k| match *k {
            "H/L" => Some(format!("[H/L] scrub -/+{}s", controls.scrub_seconds)),
            "+/-" => Some(format!(
                "[+/-] volume {}%",
                (controls.volume_step * 100.0).round()
            )),
            _ => CONTROLS_MAP.get(k).map(|v| format!("[{}] {}", k, v)),
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Format a `Duration` as `MM:SS`.
fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Build the "now playing" track text according to `ui` settings.
fn now_playing_track_text(track: &Track, ui: &UiSettings) -> String {
    let parts: Vec<String> = ui
        .now_playing_track_fields
        .iter()
        .map(|f| match f {
            TrackDisplayField::Display => track.display.clone(),
            TrackDisplayField::Title => track.title.clone(),
            // Empty title: a missing field renders as nothing.
            other => display_from_fields(
                track.id.as_str(),
                &track.source,
                "",
                track.producer.as_deref(),
                std::slice::from_ref(other),
                "",
            ),
        })
        .filter(|s| !s.trim().is_empty())
        .collect();

    if parts.is_empty() {
        track.display.clone()
    } else {
        parts.join(&ui.now_playing_track_separator)
    }
}

/// Build the now-playing time text (elapsed/total/remaining) per `UiSettings`.
fn now_playing_time_text(
    elapsed: Duration,
    total: Option<Duration>,
    ui: &UiSettings,
) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    for f in &ui.now_playing_time_fields {
        match f {
            TimeField::Elapsed => parts.push(format_mmss(elapsed)),
            TimeField::Total => {
                if let Some(t) = total {
                    parts.push(format_mmss(t));
                }
            }
            TimeField::Remaining => {
                if let Some(t) = total {
                    let rem = t.saturating_sub(elapsed);
                    parts.push(format!("-{}", format_mmss(rem)));
                }
            }
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(&ui.now_playing_time_separator))
    }
}

fn transport_label(state: &PlaybackState) -> &'static str {
    if state.current_track.is_none() {
        return "Stopped";
    }
    match (state.phase, state.is_playing) {
        (TransportPhase::Loading, _) => "Loading",
        (TransportPhase::Playing, _) => "Playing",
        // Loaded but the output is still locked.
        (TransportPhase::Paused, true) => "Ready: press play",
        (TransportPhase::Paused, false) => "Paused",
        (TransportPhase::Idle, _) => "Stopped",
    }
}

fn loop_label(mode: LoopMode) -> &'static str {
    match mode {
        LoopMode::NoLoop => "Loop: off",
        LoopMode::LoopAll => "Loop: all",
        LoopMode::LoopOne => "Loop: one",
    }
}

fn volume_label(state: &PlaybackState) -> String {
    if state.is_muted {
        format!("Muted ({}%)", (state.volume * 100.0).round())
    } else {
        format!("Vol: {}%", (state.volume * 100.0).round())
    }
}

/// Text of the mini-player bar.
fn mini_player_text(state: &PlaybackState, ui: &UiSettings) -> String {
    let mut parts: Vec<String> = Vec::new();

    parts.push(transport_label(state).to_string());
    if let Some(track) = &state.current_track {
        let song = now_playing_track_text(track, ui);
        let total = (!state.duration.is_zero()).then_some(state.duration);
        match now_playing_time_text(state.current_time, total, ui) {
            Some(time) => parts.push(format!("{} [{}]", song, time)),
            None => parts.push(song),
        }
    }
    parts.push(volume_label(state));
    parts.push(loop_label(state.queue.loop_mode()).to_string());
    parts.push(if state.queue.shuffle() {
        "Shuffle: ON".to_string()
    } else {
        "Shuffle: OFF".to_string()
    });

    parts.join(" • ")
}

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(5);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width: width.min(r.width),
        height: height.min(r.height),
    }
}

/// Format a duration, rounding up partial seconds, showing total seconds.
fn format_duration_mmss_ceil(d: Duration) -> String {
    if d.is_zero() {
        return "-".to_string();
    }

    let mut total_secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        total_secs = total_secs.saturating_add(1);
    }

    format!("{}:{:02} ({}s)", total_secs / 60, total_secs % 60, total_secs)
}

fn detail_text(app: &App, state: &PlaybackState) -> String {
    let Some(track) = app.selected_track() else {
        return "No track selected".to_string();
    };
    let duration = if state.is_current(&track.id) {
        format_duration_mmss_ceil(state.duration)
    } else {
        "-".to_string()
    };
    format!(
        "Title: {}\nProducer: {}\nId: {}\nDuration: {}\nPlays: {}\nSource: {}\nArtwork: {}",
        track.title,
        track.producer.as_deref().unwrap_or("-"),
        track.id,
        duration,
        app.plays_of(track),
        track.source,
        track.artwork.as_deref().unwrap_or("-"),
    )
}

fn padded(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .padding(Padding {
            left: 1,
            right: 0,
            top: 0,
            bottom: 0,
        })
}

/// Render the entire UI into `frame`.
///
/// Records the waveform strip's screen area on `app` so pointer events can
/// be mapped back to it.
pub fn draw(frame: &mut Frame, app: &mut App, state: &PlaybackState, settings: &Settings) {
    let visualizer_height = if app.show_visualizer { 8 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(4),
            Constraint::Length(visualizer_height),
            Constraint::Length(3),
            Constraint::Length(4),
        ])
        .split(frame.area());

    // Header
    let header = Paragraph::new(settings.ui.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" beatline ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    // Catalog cards
    {
        let total = app.tracks.len();
        let list_height = chunks[1].height.saturating_sub(2) as usize;
        let sel_pos = app.selected.min(total.saturating_sub(1));
        let (start, end, selected_pos_in_visible) = if total <= list_height || list_height == 0 {
            (0, total, sel_pos)
        } else {
            let half = list_height / 2;
            let mut start = sel_pos.saturating_sub(half);
            if start + list_height > total {
                start = total - list_height;
            }
            (start, start + list_height, sel_pos - start)
        };

        let visible_items: Vec<ListItem> = app.tracks[start..end]
            .iter()
            .map(|track| {
                let card = CardState::of(track, state);
                let item = ListItem::new(format!("{} {}", card.symbol(), track.display));
                if card == CardState::Inactive {
                    item
                } else {
                    item.bold()
                }
            })
            .collect();

        let mut title = String::from(" beats ");
        if let Some(label) = &app.source_label {
            title = format!(" beats: {} ", label);
        }
        let list = List::new(visible_items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut list_state = ratatui::widgets::ListState::default();
        if total > 0 {
            list_state.select(Some(selected_pos_in_visible));
        }
        frame.render_stateful_widget(list, chunks[1], &mut list_state);
    }

    // Waveform strip
    {
        let block = Block::default().borders(Borders::ALL).title(" waveform ");
        let inner = block.inner(chunks[2]);
        frame.render_widget(block, chunks[2]);
        app.waveform.set_bounds(inner);
        let progress = app.waveform.progress(state);
        frame.render_widget(WaveformView::new(&app.waveform, progress), inner);
    }

    if app.show_visualizer {
        let block = Block::default().borders(Borders::ALL).title(" spectrum ");
        let inner = block.inner(chunks[3]);
        frame.render_widget(block, chunks[3]);
        frame.render_widget(SpectrumBars::new(&app.levels), inner);
    }

    let mini_player = Paragraph::new(mini_player_text(state, &settings.ui))
        .block(padded(" now playing "))
        .wrap(Wrap { trim: true });
    frame.render_widget(mini_player, chunks[4]);

    // Detail popup, kept inside the catalog area.
    if app.detail_window {
        let popup_area = centered_rect_sized(72, 10, chunks[1]);
        frame.render_widget(Clear, popup_area);
        let details = Paragraph::new(detail_text(app, state))
            .block(padded(" details (K closes) "))
            .wrap(Wrap { trim: true });
        frame.render_widget(details, popup_area);
    }

    let footer = Paragraph::new(controls_text(&settings.controls))
        .block(padded(" controls "))
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[5]);
}
