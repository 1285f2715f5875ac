//! Spectrum visualizer: the cancellable frame loop and the bar renderer that
//! samples the analyser once per frame.

mod bars;
mod frame_loop;

pub use bars::{IDLE_LEVEL, SpectrumBars, Visualizer, map_to_bars};
pub(crate) use bars::paint_column;
pub use frame_loop::FrameLoop;

#[cfg(test)]
mod tests;
