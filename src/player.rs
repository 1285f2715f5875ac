//! The playback engine thread and the handle surfaces use to drive it.

mod engine;
mod handle;
mod thread;
mod types;

pub use engine::Player;
pub use handle::{PlayerError, PlayerHandle, SnapshotHandle};
pub use types::{Origin, PlayerCmd};
