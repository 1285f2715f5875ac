//! Application module: the terminal surface's view model.
//!
//! `App` holds the catalog, the cursor, the open panels and the per-view
//! renderers. It never drives audio itself; key handling produces
//! `PlayerCmd`s that the runtime forwards to the engine.

mod keys;
mod model;
mod plays;

pub use keys::InputOutcome;
pub use model::*;
pub use plays::PlayCounts;
