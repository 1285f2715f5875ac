//! Player-side commands and messages.
//!
//! Surfaces talk to the engine only through `PlayerCmd`; the engine thread
//! receives those, loader results and control messages on one channel.

use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Duration;

use crate::catalog::Track;
use crate::media::MediaEvent;
use crate::playback::{Listener, LoopMode, SubscriptionId};

/// Whether a command came from a person (key, click, media key) or from the
/// program itself. Only gestures may open the audio output.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Origin {
    User,
    Programmatic,
}

#[derive(Debug, Clone)]
pub enum PlayerCmd {
    /// Replace the queue the player navigates through.
    SetQueue(Vec<Arc<Track>>),
    /// Bind and play a track; resumes it if it is already bound.
    SetCurrentTrack(Arc<Track>),
    Play,
    Pause,
    TogglePlayPause,
    /// Jump to an absolute position.
    Seek(Duration),
    /// Seek by the specified number of seconds (positive or negative).
    SeekBy(i64),
    Next,
    Previous,
    SetVolume(f32),
    AdjustVolume(f32),
    Mute,
    Unmute,
    ToggleMute,
    SetLoopMode(LoopMode),
    ToggleShuffle,
    /// Drop the current track and stop.
    Reset,
}

pub(crate) enum PlayerMsg {
    Cmd { cmd: PlayerCmd, origin: Origin },
    Media(MediaEvent),
    Subscribe {
        listener: Listener,
        reply: Sender<SubscriptionId>,
    },
    Unsubscribe(SubscriptionId),
    /// Quit the engine thread, fading out over `fade`.
    Quit { fade: Duration },
}
