//! Spectrum analyser: one pass-through tap in the audio graph and the
//! pull-based frequency read used by the visualizer.

mod bridge;
mod tap;

pub use bridge::{AnalyserSnapshot, SpectrumBridge, SpectrumReader};
pub use tap::{SpectrumTap, TappedSource};
