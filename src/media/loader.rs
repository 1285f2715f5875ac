//! Off-thread fetch and decode of one track.
//!
//! A loader reads the whole resource into memory, decodes it once to compute
//! the duration and the waveform peaks, and hands the bytes back so the
//! device can decode them again for playback.

use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use rodio::{Decoder, Source};
use tracing::{debug, trace};

use crate::config::WaveformSettings;
use crate::waveform::{PeakAccumulator, WaveformPeaks};

use super::types::{CancelToken, LoadRequest, LoadedMedia, MediaError, MediaEvent, MediaEventSink};

/// Samples decoded between two cancellation checks.
const CANCEL_CHECK_SAMPLES: usize = 1 << 15;

/// Blocking client shared by all loaders. No timeout: a slow source keeps
/// the track in `Loading` until it arrives or is cancelled.
pub fn http_client() -> Result<Client, MediaError> {
    Client::builder()
        .timeout(None::<Duration>)
        .build()
        .map_err(MediaError::Client)
}

/// Where a track source points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Remote(String),
    Local(PathBuf),
}

impl SourceLocation {
    pub fn parse(source: &str) -> Self {
        let trimmed = source.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Self::Remote(trimmed.to_string());
        }
        match trimmed.strip_prefix("file://") {
            Some(path) => Self::Local(PathBuf::from(path)),
            None => Self::Local(PathBuf::from(trimmed)),
        }
    }
}

/// Bytes pulled from a source between two cancellation checks.
const READ_CHUNK: usize = 64 * 1024;

/// Drain `reader` into memory. `Ok(None)` once `cancel` fires, so a skipped
/// track stops downloading at the next chunk.
pub(super) fn read_cancellable<R: Read>(
    mut reader: R,
    size_hint: usize,
    cancel: &CancelToken,
) -> io::Result<Option<Vec<u8>>> {
    let mut bytes = Vec::with_capacity(size_hint);
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        match reader.read(&mut chunk) {
            Ok(0) => return Ok(Some(bytes)),
            Ok(n) => bytes.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

fn fetch(
    location: &SourceLocation,
    client: &Client,
    cancel: &CancelToken,
) -> Result<Option<Arc<[u8]>>, MediaError> {
    let bytes = match location {
        SourceLocation::Remote(url) => {
            let response = client
                .get(url)
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(|source| MediaError::Fetch {
                    url: url.clone(),
                    source,
                })?;
            let hint = response
                .content_length()
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(0);
            read_cancellable(response, hint, cancel).map_err(|source| MediaError::Download {
                url: url.clone(),
                source,
            })?
        }
        SourceLocation::Local(path) => {
            let read_err = |source| MediaError::Read {
                path: path.clone(),
                source,
            };
            let file = File::open(path).map_err(read_err)?;
            let hint = file
                .metadata()
                .ok()
                .and_then(|m| usize::try_from(m.len()).ok())
                .unwrap_or(0);
            read_cancellable(file, hint, cancel).map_err(read_err)?
        }
    };
    Ok(bytes.map(Arc::<[u8]>::from))
}

/// Fetch and analyse `request`. `Ok(None)` means the request was cancelled.
pub fn load(
    request: &LoadRequest,
    client: &Client,
    settings: &WaveformSettings,
) -> Result<Option<LoadedMedia>, MediaError> {
    let location = SourceLocation::parse(&request.source);
    let Some(bytes) = fetch(&location, client, &request.cancel)? else {
        return Ok(None);
    };

    let Some((duration, peaks)) = analyse(&request.source, bytes.clone(), request, settings)?
    else {
        return Ok(None);
    };

    Ok(Some(LoadedMedia {
        generation: request.generation,
        source: request.source.clone(),
        bytes,
        duration,
        peaks: Arc::new(peaks),
    }))
}

fn analyse(
    location: &str,
    bytes: Arc<[u8]>,
    request: &LoadRequest,
    settings: &WaveformSettings,
) -> Result<Option<(Duration, WaveformPeaks)>, MediaError> {
    let decoder = Decoder::new(Cursor::new(bytes)).map_err(|source| MediaError::Decode {
        location: location.to_string(),
        source,
    })?;
    let channels = decoder.channels().max(1);
    let sample_rate = decoder.sample_rate().max(1);

    let mut acc = PeakAccumulator::new(channels, settings.block_frames);
    for (i, sample) in decoder.enumerate() {
        if i % CANCEL_CHECK_SAMPLES == 0 && request.cancel.is_cancelled() {
            return Ok(None);
        }
        acc.push(sample);
    }

    if acc.frames() == 0 {
        return Err(MediaError::Empty {
            location: location.to_string(),
        });
    }
    let duration = Duration::from_secs_f64(acc.frames() as f64 / f64::from(sample_rate));
    Ok(Some((duration, acc.finish(settings.buckets))))
}

/// Run `load` on its own thread and report through `events`.
///
/// Nothing is reported once the request is cancelled, even if the work had
/// already finished.
pub fn spawn(
    request: LoadRequest,
    client: Client,
    settings: WaveformSettings,
    events: MediaEventSink,
) -> std::io::Result<()> {
    thread::Builder::new()
        .name(format!("beatline-load-{}", request.generation))
        .spawn(move || {
            let result = load(&request, &client, &settings);
            if request.cancel.is_cancelled() {
                trace!(generation = request.generation, "load cancelled");
                return;
            }
            match result {
                Ok(Some(media)) => {
                    debug!(
                        generation = media.generation,
                        duration = ?media.duration,
                        "track loaded"
                    );
                    events(MediaEvent::Loaded(media));
                }
                Ok(None) => {}
                Err(error) => events(MediaEvent::Failed {
                    generation: request.generation,
                    error,
                }),
            }
        })
        .map(|_| ())
}
