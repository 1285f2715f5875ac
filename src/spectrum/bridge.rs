use std::f32::consts::PI;
use std::sync::{Arc, OnceLock};

use rustfft::{Fft, FftPlanner, num_complex::Complex};

use crate::config::SpectrumSettings;

use super::tap::SpectrumTap;

/// Frequency magnitudes of one read, `0..=255` per bin (dB-scaled).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyserSnapshot {
    bins: Vec<u8>,
}

impl AnalyserSnapshot {
    pub fn silent(len: usize) -> Self {
        Self { bins: vec![0; len] }
    }

    pub fn bins(&self) -> &[u8] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// True when every bin is zero (nothing routed, or silence).
    pub fn is_silent(&self) -> bool {
        self.bins.iter().all(|&b| b == 0)
    }
}

/// Read side of the analyser.
///
/// Cheap to clone and hand to any surface. The tap itself is installed once,
/// by the media binding when the audio graph is built; until then every read
/// returns a silent snapshot.
#[derive(Debug, Clone)]
pub struct SpectrumBridge {
    slot: Arc<OnceLock<SpectrumTap>>,
    fft_size: usize,
    min_db: f32,
    max_db: f32,
}

impl SpectrumBridge {
    pub fn new(settings: &SpectrumSettings) -> Self {
        Self {
            slot: Arc::new(OnceLock::new()),
            fft_size: settings.fft_size.max(32).next_power_of_two(),
            min_db: settings.min_db,
            max_db: settings.max_db,
        }
    }

    /// Number of frequency bins in every snapshot.
    pub fn bins(&self) -> usize {
        self.fft_size / 2
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn is_installed(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Install the graph's tap. Only the first install takes effect.
    pub(crate) fn install(&self, tap: SpectrumTap) -> bool {
        self.slot.set(tap).is_ok()
    }

    pub fn reader(&self) -> SpectrumReader {
        let fft = FftPlanner::<f32>::new().plan_fft_forward(self.fft_size);
        let n = self.fft_size;
        let window = (0..n)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (n as f32 - 1.0)).cos()))
            .collect();
        SpectrumReader {
            bridge: self.clone(),
            fft,
            window,
            samples: Vec::with_capacity(n),
            buffer: Vec::with_capacity(n),
        }
    }
}

/// Per-consumer FFT state. Each reader owns its plan and scratch buffers.
pub struct SpectrumReader {
    bridge: SpectrumBridge,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    samples: Vec<f32>,
    buffer: Vec<Complex<f32>>,
}

impl SpectrumReader {
    pub fn bins(&self) -> usize {
        self.bridge.bins()
    }

    /// Current frequency magnitudes of whatever is routed through the tap.
    pub fn read(&mut self) -> AnalyserSnapshot {
        let n = self.bridge.fft_size;
        let Some(tap) = self.bridge.slot.get() else {
            return AnalyserSnapshot::silent(n / 2);
        };
        if !tap.latest(n, &mut self.samples) {
            return AnalyserSnapshot::silent(n / 2);
        }

        self.buffer.clear();
        self.buffer.extend(
            self.samples
                .iter()
                .zip(&self.window)
                .map(|(s, w)| Complex::new(s * w, 0.0)),
        );
        self.fft.process(&mut self.buffer);

        let range = (self.bridge.max_db - self.bridge.min_db).max(f32::EPSILON);
        let bins = self.buffer[..n / 2]
            .iter()
            .map(|c| {
                let magnitude = 2.0 * c.norm() / n as f32;
                let db = 20.0 * magnitude.max(1e-12).log10();
                let scaled = (db - self.bridge.min_db) / range;
                (scaled.clamp(0.0, 1.0) * 255.0).round() as u8
            })
            .collect();

        AnalyserSnapshot { bins }
    }
}
