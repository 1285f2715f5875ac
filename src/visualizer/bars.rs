use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::Widget;

use crate::spectrum::SpectrumReader;

/// Level of a bar with nothing to show, so the graph never disappears.
pub const IDLE_LEVEL: f32 = 0.02;

const EIGHTHS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Map analyser bins to `bars` levels in `[0, 1]`.
///
/// Bars cover log-spaced bin ranges (DC skipped), so the bar count is
/// independent of the FFT resolution.
pub fn map_to_bars(bins: &[u8], bars: usize) -> Vec<f32> {
    let n = bins.len();
    if bars == 0 {
        return Vec::new();
    }
    if n <= 1 {
        return vec![0.0; bars];
    }

    let edge = |b: usize| -> usize {
        let frac = b as f32 / bars as f32;
        ((n as f32).powf(frac).round() as usize).clamp(1, n)
    };

    (0..bars)
        .map(|b| {
            let lo = edge(b).min(n - 1);
            let hi = edge(b + 1).max(lo + 1).min(n);
            let sum: u32 = bins[lo..hi].iter().map(|&v| u32::from(v)).sum();
            sum as f32 / ((hi - lo) as f32 * 255.0)
        })
        .collect()
}

/// Per-frame bar producer.
///
/// Holds no state between frames besides the FFT scratch: every frame is a
/// fresh read mapped straight to levels.
pub struct Visualizer {
    reader: SpectrumReader,
    bars: usize,
}

impl Visualizer {
    pub fn new(reader: SpectrumReader, bars: usize) -> Self {
        Self {
            reader,
            bars: bars.max(1),
        }
    }

    pub fn bars(&self) -> usize {
        self.bars
    }

    /// Levels for this frame. Flat idle bars while paused or when nothing
    /// is routed.
    pub fn frame(&mut self, playing: bool) -> Vec<f32> {
        if !playing {
            return vec![IDLE_LEVEL; self.bars];
        }
        let snapshot = self.reader.read();
        if snapshot.is_silent() {
            return vec![IDLE_LEVEL; self.bars];
        }
        map_to_bars(snapshot.bins(), self.bars)
            .into_iter()
            .map(|v| v.max(IDLE_LEVEL))
            .collect()
    }
}

/// Paint a bottom-up bar of `level` in column `x` of `area`.
pub(crate) fn paint_column(buf: &mut Buffer, x: u16, area: Rect, level: f32, style: Style) {
    let rows = usize::from(area.height);
    let units = (level.clamp(0.0, 1.0) * (rows * 8) as f32).round() as usize;
    for r in 0..rows {
        let y = area.y + area.height - 1 - r as u16;
        let filled = units.saturating_sub(r * 8).min(8);
        if let Some(cell) = buf.cell_mut((x, y)) {
            cell.set_char(EIGHTHS[filled]).set_style(style);
        }
    }
}

/// Bar-graph widget for one frame of levels.
pub struct SpectrumBars<'a> {
    levels: &'a [f32],
}

impl<'a> SpectrumBars<'a> {
    pub fn new(levels: &'a [f32]) -> Self {
        Self { levels }
    }
}

impl Widget for SpectrumBars<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 || self.levels.is_empty() {
            return;
        }
        let width = usize::from(area.width);
        let count = self.levels.len();
        for col in 0..width {
            // Each bar gets an equal share of the columns.
            let level = self.levels[(col * count / width).min(count - 1)];
            let color = if level > 0.66 {
                Color::Red
            } else if level > 0.33 {
                Color::Yellow
            } else {
                Color::Green
            };
            paint_column(buf, area.x + col as u16, area, level, Style::default().fg(color));
        }
    }
}
