//! Waveform seek strip: peak envelopes built from the decoded resource and
//! the renderer that maps pointer interaction to seeks.

mod peaks;
mod renderer;

pub use peaks::{PeakAccumulator, WaveformPeaks};
pub use renderer::{WaveformRenderer, WaveformView, seek_target};

#[cfg(test)]
mod tests;
