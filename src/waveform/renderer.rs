use std::sync::Arc;
use std::time::Duration;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::Widget;

use crate::playback::PlaybackState;
use crate::visualizer::paint_column;

use super::peaks::WaveformPeaks;

/// Seek strip bound to the active resource.
///
/// The renderer is tied to one binding generation at a time: whenever the
/// published generation changes its peaks and any in-flight drag are thrown
/// away before the next paint.
#[derive(Debug, Default)]
pub struct WaveformRenderer {
    generation: Option<u64>,
    peaks: Option<Arc<WaveformPeaks>>,
    drag: Option<f32>,
    bounds: Rect,
}

impl WaveformRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow the published state. Must run before every paint.
    pub fn sync(&mut self, state: &PlaybackState) {
        if state.current_track.is_none() {
            self.generation = None;
            self.peaks = None;
            self.drag = None;
            return;
        }
        if self.generation != Some(state.generation) {
            self.generation = Some(state.generation);
            self.peaks = state.waveform.clone();
            self.drag = None;
        } else if self.peaks.is_none() {
            self.peaks = state.waveform.clone();
        }
    }

    pub fn generation(&self) -> Option<u64> {
        self.generation
    }

    pub fn peaks(&self) -> Option<&WaveformPeaks> {
        self.peaks.as_deref()
    }

    /// Screen area of the strip as of the last paint.
    pub fn set_bounds(&mut self, area: Rect) {
        self.bounds = area;
    }

    pub fn contains(&self, column: u16, row: u16) -> bool {
        self.bounds.width > 0
            && column >= self.bounds.x
            && column < self.bounds.x + self.bounds.width
            && row >= self.bounds.y
            && row < self.bounds.y + self.bounds.height
    }

    /// Proportional position of `column` within the strip, clamped to `[0, 1]`.
    pub fn ratio_at(&self, column: u16) -> f32 {
        if self.bounds.width <= 1 {
            return 0.0;
        }
        let offset = column.saturating_sub(self.bounds.x);
        (f32::from(offset) / f32::from(self.bounds.width - 1)).clamp(0.0, 1.0)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Start a drag when the pointer lands on the strip of a bound track.
    pub fn pointer_down(&mut self, column: u16, row: u16) -> bool {
        if self.generation.is_none() || !self.contains(column, row) {
            return false;
        }
        self.drag = Some(self.ratio_at(column));
        true
    }

    pub fn pointer_drag(&mut self, column: u16) {
        if self.drag.is_some() {
            self.drag = Some(self.ratio_at(column));
        }
    }

    /// Finish the drag and return the seek target, if the duration is known.
    pub fn pointer_up(&mut self, column: u16, duration: Duration) -> Option<Duration> {
        self.drag.take()?;
        if duration.is_zero() {
            return None;
        }
        Some(seek_target(self.ratio_at(column), duration))
    }

    /// Optimistic drag position wins over the reported playback position.
    pub fn progress(&self, state: &PlaybackState) -> f32 {
        self.drag.unwrap_or_else(|| state.progress())
    }
}

pub fn seek_target(ratio: f32, duration: Duration) -> Duration {
    duration.mul_f32(ratio.clamp(0.0, 1.0))
}

/// Paintable view of a `WaveformRenderer` at a given progress.
pub struct WaveformView<'a> {
    renderer: &'a WaveformRenderer,
    progress: f32,
    played: Style,
    unplayed: Style,
    cursor: Style,
}

impl<'a> WaveformView<'a> {
    pub fn new(renderer: &'a WaveformRenderer, progress: f32) -> Self {
        Self {
            renderer,
            progress: progress.clamp(0.0, 1.0),
            played: Style::default().fg(Color::Cyan),
            unplayed: Style::default().fg(Color::DarkGray),
            cursor: Style::default().fg(Color::Yellow),
        }
    }
}

impl Widget for WaveformView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let width = usize::from(area.width);
        let columns = match self.renderer.peaks() {
            Some(p) if !p.is_empty() => p.columns(width),
            // No peaks yet: a thin baseline still shows progress.
            _ => vec![0.1; width],
        };
        let cursor = (self.progress * (width - 1) as f32).round() as usize;

        for (i, level) in columns.into_iter().enumerate() {
            let style = if i == cursor && self.renderer.generation().is_some() {
                self.cursor
            } else if (i as f32) < self.progress * width as f32 {
                self.played
            } else {
                self.unplayed
            };
            paint_column(buf, area.x + i as u16, area, level.max(0.05), style);
        }
    }
}
