//! The single media resource and everything that feeds it.
//!
//! `MediaBinding` keeps one decodable resource in step with the playback
//! store through the `MediaDevice` seam; `RodioDevice` is the real output,
//! and loader threads fetch and decode sources in the background.

mod binding;
mod device;
mod loader;
mod rodio_device;
mod sink;
mod types;

pub use binding::{GraphState, MediaBinding, PlayRecorder};
pub use device::MediaDevice;
pub use loader::{SourceLocation, http_client, load};
pub use rodio_device::RodioDevice;
pub use types::{CancelToken, LoadRequest, LoadedMedia, MediaError, MediaEvent, MediaEventSink};

#[cfg(test)]
pub(crate) mod fake;

#[cfg(test)]
mod tests;
