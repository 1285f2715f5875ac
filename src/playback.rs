//! Playback state: the process-wide store every surface reads and writes.
//!
//! Pure data plus mutators and change notification; no I/O happens here. The
//! media binding consumes the change feed and reports resource facts back
//! through the binding-only mutators (`set_current_time`, `set_duration`,
//! `set_waveform`, `set_phase`).

mod queue;
mod state;
mod store;

pub use queue::{LoopMode, Queue};
pub use state::{PlaybackState, StateChange, TransportPhase};
pub use store::{Listener, PlaybackStore, SubscriptionId};
