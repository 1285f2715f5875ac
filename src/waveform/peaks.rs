/// Normalized amplitude envelope of one decoded resource.
///
/// Each bucket holds the loudest frame of its slice of the track, scaled so
/// the loudest bucket is `1.0`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WaveformPeaks {
    buckets: Vec<f32>,
}

impl WaveformPeaks {
    pub fn from_buckets(buckets: Vec<f32>) -> Self {
        Self { buckets }
    }

    pub fn buckets(&self) -> &[f32] {
        &self.buckets
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Resample to `width` columns, keeping the maximum of each span.
    pub fn columns(&self, width: usize) -> Vec<f32> {
        if width == 0 || self.buckets.is_empty() {
            return vec![0.0; width];
        }
        let n = self.buckets.len();
        (0..width)
            .map(|c| {
                let lo = c * n / width;
                let hi = ((c + 1) * n / width).max(lo + 1).min(n);
                self.buckets[lo..hi].iter().copied().fold(0.0, f32::max)
            })
            .collect()
    }
}

/// Streaming reducer from interleaved samples to coarse block maxima.
///
/// Blocks are fixed-size so the whole track never has to be held in memory;
/// `finish` folds them into the requested bucket count.
pub struct PeakAccumulator {
    channels: usize,
    block_frames: usize,
    blocks: Vec<f32>,
    block_max: f32,
    frame_max: f32,
    frames_in_block: usize,
    channel: usize,
    frames: u64,
}

impl PeakAccumulator {
    pub fn new(channels: u16, block_frames: usize) -> Self {
        Self {
            channels: usize::from(channels.max(1)),
            block_frames: block_frames.max(1),
            blocks: Vec::new(),
            block_max: 0.0,
            frame_max: 0.0,
            frames_in_block: 0,
            channel: 0,
            frames: 0,
        }
    }

    pub fn push(&mut self, sample: f32) {
        self.frame_max = self.frame_max.max(sample.abs());
        self.channel += 1;
        if self.channel < self.channels {
            return;
        }

        self.channel = 0;
        self.frames += 1;
        self.block_max = self.block_max.max(self.frame_max);
        self.frame_max = 0.0;
        self.frames_in_block += 1;
        if self.frames_in_block == self.block_frames {
            self.blocks.push(self.block_max);
            self.block_max = 0.0;
            self.frames_in_block = 0;
        }
    }

    /// Complete frames seen so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn finish(mut self, buckets: usize) -> WaveformPeaks {
        if self.frames_in_block > 0 {
            self.blocks.push(self.block_max);
        }
        if buckets == 0 || self.blocks.is_empty() {
            return WaveformPeaks::default();
        }

        let reduced = WaveformPeaks::from_buckets(self.blocks).columns(buckets);
        let loudest = reduced.iter().copied().fold(0.0, f32::max);
        if loudest <= f32::EPSILON {
            return WaveformPeaks::from_buckets(reduced);
        }
        WaveformPeaks::from_buckets(reduced.into_iter().map(|v| v / loudest).collect())
    }
}
