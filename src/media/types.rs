//! Media-side values exchanged between the binding, its device and the
//! loader threads.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;

use crate::waveform::WaveformPeaks;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch {url}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("download of {url} broke off")]
    Download {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build http client")]
    Client(#[source] reqwest::Error),
    #[error("failed to decode {location}")]
    Decode {
        location: String,
        #[source]
        source: rodio::decoder::DecoderError,
    },
    #[error("{location} contains no audio")]
    Empty { location: String },
    #[error("audio output unavailable: {0}")]
    Output(String),
    #[error("no audio graph to attach to")]
    NoGraph,
    #[error("seek failed: {0}")]
    Seek(String),
}

/// Cooperative cancellation flag shared with one loader thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// One fetch+decode job for the bound track.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub generation: u64,
    pub source: String,
    pub cancel: CancelToken,
}

/// A fully fetched and analysed resource, ready to be attached.
#[derive(Debug, Clone)]
pub struct LoadedMedia {
    pub generation: u64,
    pub source: String,
    pub bytes: Arc<[u8]>,
    pub duration: Duration,
    pub peaks: Arc<WaveformPeaks>,
}

#[derive(Debug)]
pub enum MediaEvent {
    Loaded(LoadedMedia),
    Failed { generation: u64, error: MediaError },
}

impl MediaEvent {
    pub fn generation(&self) -> u64 {
        match self {
            MediaEvent::Loaded(m) => m.generation,
            MediaEvent::Failed { generation, .. } => *generation,
        }
    }
}

/// Where loader threads deliver their results.
pub type MediaEventSink = Arc<dyn Fn(MediaEvent) + Send + Sync>;
