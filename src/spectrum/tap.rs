use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rodio::Source;

/// Frames buffered inside the audio callback before touching the shared ring.
const FLUSH_FRAMES: usize = 256;

#[derive(Debug)]
struct TapBuffer {
    samples: VecDeque<f32>,
    capacity: usize,
    sample_rate: u32,
    /// Identity of the signal currently routed through the tap; zero = none.
    route: u64,
    next_route: u64,
}

/// The analysis point of the audio graph.
///
/// Holds the most recent mono samples of whatever is routed through it. There
/// is exactly one tap per graph; track changes only swap the route feeding it.
#[derive(Debug, Clone)]
pub struct SpectrumTap {
    inner: Arc<Mutex<TapBuffer>>,
}

impl SpectrumTap {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TapBuffer {
                samples: VecDeque::with_capacity(capacity),
                capacity: capacity.max(1),
                sample_rate: 0,
                route: 0,
                next_route: 0,
            })),
        }
    }

    /// Route a new signal through the tap, dropping the previous one's samples.
    pub fn attach(&self, sample_rate: u32) -> u64 {
        let Ok(mut b) = self.inner.lock() else {
            return 0;
        };
        b.next_route += 1;
        b.route = b.next_route;
        b.sample_rate = sample_rate;
        b.samples.clear();
        b.route
    }

    /// Disconnect the current signal; reads see silence until the next attach.
    pub fn detach(&self) {
        if let Ok(mut b) = self.inner.lock() {
            b.route = 0;
            b.samples.clear();
        }
    }

    pub fn is_attached(&self) -> bool {
        self.inner.lock().map(|b| b.route != 0).unwrap_or(false)
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.lock().map(|b| b.sample_rate).unwrap_or(0)
    }

    /// Append frames produced by `route`. Frames from a stale route are dropped.
    /// Never blocks: a contended lock loses the batch.
    fn push(&self, route: u64, frames: &[f32]) {
        let Ok(mut b) = self.inner.try_lock() else {
            return;
        };
        if b.route != route || route == 0 {
            return;
        }
        for &f in frames {
            if b.samples.len() == b.capacity {
                b.samples.pop_front();
            }
            b.samples.push_back(f);
        }
    }

    /// Copy the newest `n` samples into `out`, zero-padded at the front.
    /// Returns false when nothing is routed.
    pub fn latest(&self, n: usize, out: &mut Vec<f32>) -> bool {
        out.clear();
        out.resize(n, 0.0);
        let Ok(b) = self.inner.lock() else {
            return false;
        };
        if b.route == 0 {
            return false;
        }
        let take = b.samples.len().min(n);
        let skip = b.samples.len() - take;
        for (dst, src) in out[n - take..].iter_mut().zip(b.samples.iter().skip(skip)) {
            *dst = *src;
        }
        true
    }
}

/// Pass-through `Source` that mirrors a mono downmix into a `SpectrumTap`.
pub struct TappedSource<S> {
    inner: S,
    tap: SpectrumTap,
    route: u64,
    channels: u16,
    channel: u16,
    frame_sum: f32,
    pending: Vec<f32>,
}

impl<S> TappedSource<S>
where
    S: Source<Item = f32>,
{
    pub fn new(inner: S, tap: SpectrumTap, route: u64) -> Self {
        let channels = inner.channels().max(1);
        Self {
            inner,
            tap,
            route,
            channels,
            channel: 0,
            frame_sum: 0.0,
            pending: Vec::with_capacity(FLUSH_FRAMES),
        }
    }

    fn flush(&mut self) {
        if !self.pending.is_empty() {
            self.tap.push(self.route, &self.pending);
            self.pending.clear();
        }
    }
}

impl<S> Iterator for TappedSource<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let Some(sample) = self.inner.next() else {
            self.flush();
            return None;
        };

        self.frame_sum += sample;
        self.channel += 1;
        if self.channel >= self.channels {
            self.pending.push(self.frame_sum / f32::from(self.channels));
            self.frame_sum = 0.0;
            self.channel = 0;
            if self.pending.len() >= FLUSH_FRAMES {
                self.flush();
            }
        }

        Some(sample)
    }
}

impl<S> Source for TappedSource<S>
where
    S: Source<Item = f32>,
{
    fn current_span_len(&self) -> Option<usize> {
        self.inner.current_span_len()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }

    fn try_seek(&mut self, pos: Duration) -> Result<(), rodio::source::SeekError> {
        self.pending.clear();
        self.frame_sum = 0.0;
        self.channel = 0;
        self.inner.try_seek(pos)
    }
}
