use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};

use crate::config::ControlsSettings;
use crate::playback::{PlaybackState, TransportPhase};
use crate::player::PlayerCmd;

use super::model::{App, cycle_loop_mode};

/// What the runtime should do after a key or pointer event.
#[derive(Debug, Clone)]
pub enum InputOutcome {
    Ignored,
    /// View-only change.
    Handled,
    /// Forward to the player as a user gesture.
    Send(PlayerCmd),
    Quit,
}

impl App {
    /// Play/pause for a bound track; with nothing bound, start the card
    /// under the cursor instead. A track that wants to play but is not
    /// sounding (output still locked, or the load failed) gets `Play`, so
    /// the press starts it rather than clearing the intent.
    pub fn play_pause_command(&self, state: &PlaybackState) -> Option<PlayerCmd> {
        if state.current_track.is_some() {
            let stalled = matches!(state.phase, TransportPhase::Paused | TransportPhase::Idle);
            if state.is_playing && stalled {
                return Some(PlayerCmd::Play);
            }
            return Some(PlayerCmd::TogglePlayPause);
        }
        self.selected_track()
            .cloned()
            .map(PlayerCmd::SetCurrentTrack)
    }

    pub fn handle_key(
        &mut self,
        key: KeyEvent,
        state: &PlaybackState,
        controls: &ControlsSettings,
    ) -> InputOutcome {
        let pending = self.pending_key.take();
        let scrub = i64::try_from(controls.scrub_seconds).unwrap_or(i64::MAX);

        match key.code {
            KeyCode::Char('q') => InputOutcome::Quit,
            KeyCode::Char('g') => {
                if pending == Some('g') {
                    self.follow_playback_off();
                    self.select_first();
                } else {
                    self.pending_key = Some('g');
                }
                InputOutcome::Handled
            }
            KeyCode::Char('z') => {
                if pending == Some('z') {
                    self.select_current(state);
                } else {
                    self.pending_key = Some('z');
                }
                InputOutcome::Handled
            }
            KeyCode::Char('G') => {
                self.follow_playback_off();
                self.select_last();
                InputOutcome::Handled
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.follow_playback_off();
                self.next();
                InputOutcome::Handled
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.follow_playback_off();
                self.prev();
                InputOutcome::Handled
            }
            KeyCode::Enter => match self.selected_track().cloned() {
                Some(track) => {
                    self.follow_playback_on();
                    InputOutcome::Send(PlayerCmd::SetCurrentTrack(track))
                }
                None => InputOutcome::Ignored,
            },
            KeyCode::Char(' ') | KeyCode::Char('p') => {
                self.follow_playback_on();
                match self.play_pause_command(state) {
                    Some(cmd) => InputOutcome::Send(cmd),
                    None => InputOutcome::Ignored,
                }
            }
            KeyCode::Char('l') => {
                self.follow_playback_on();
                InputOutcome::Send(PlayerCmd::Next)
            }
            KeyCode::Char('h') => {
                self.follow_playback_on();
                InputOutcome::Send(PlayerCmd::Previous)
            }
            KeyCode::Char('L') => InputOutcome::Send(PlayerCmd::SeekBy(scrub)),
            KeyCode::Char('H') => InputOutcome::Send(PlayerCmd::SeekBy(-scrub)),
            KeyCode::Char('+') | KeyCode::Char('=') => {
                InputOutcome::Send(PlayerCmd::AdjustVolume(controls.volume_step))
            }
            KeyCode::Char('-') => InputOutcome::Send(PlayerCmd::AdjustVolume(-controls.volume_step)),
            KeyCode::Char('m') => InputOutcome::Send(PlayerCmd::ToggleMute),
            KeyCode::Char('s') => InputOutcome::Send(PlayerCmd::ToggleShuffle),
            KeyCode::Char('r') => {
                InputOutcome::Send(PlayerCmd::SetLoopMode(cycle_loop_mode(state.queue.loop_mode())))
            }
            KeyCode::Char('x') => InputOutcome::Send(PlayerCmd::Reset),
            KeyCode::Char('K') => {
                self.toggle_detail_window();
                InputOutcome::Handled
            }
            KeyCode::Char('v') => {
                self.toggle_visualizer();
                InputOutcome::Handled
            }
            _ => InputOutcome::Ignored,
        }
    }

    /// Pointer handling for the waveform strip: press starts a drag, motion
    /// moves the optimistic cursor, release seeks.
    pub fn handle_mouse(&mut self, mouse: MouseEvent, state: &PlaybackState) -> InputOutcome {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if self.waveform.pointer_down(mouse.column, mouse.row) {
                    InputOutcome::Handled
                } else {
                    InputOutcome::Ignored
                }
            }
            MouseEventKind::Drag(MouseButton::Left) if self.waveform.is_dragging() => {
                self.waveform.pointer_drag(mouse.column);
                InputOutcome::Handled
            }
            MouseEventKind::Up(MouseButton::Left) if self.waveform.is_dragging() => {
                match self.waveform.pointer_up(mouse.column, state.duration) {
                    Some(to) => InputOutcome::Send(PlayerCmd::Seek(to)),
                    None => InputOutcome::Handled,
                }
            }
            _ => InputOutcome::Ignored,
        }
    }
}
