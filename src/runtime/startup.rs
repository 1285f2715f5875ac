use std::path::Path;

use tracing::info;

use crate::app::App;
use crate::catalog::{CatalogError, Track, load_catalog, scan};
use crate::config::{LibrarySettings, Settings};
use crate::player::{Origin, PlayerCmd, PlayerError, PlayerHandle};

/// A file is read as a TOML catalog; anything else is scanned as a directory.
pub fn load_tracks(source: &Path, library: &LibrarySettings) -> Result<Vec<Track>, CatalogError> {
    let tracks = if source.is_file() {
        load_catalog(source, library)?
    } else {
        scan(source, library)
    };
    info!(source = %source.display(), tracks = tracks.len(), "catalog loaded");
    Ok(tracks)
}

pub fn apply_startup(app: &App, player: &PlayerHandle, settings: &Settings) -> Result<(), PlayerError> {
    player.send(PlayerCmd::SetQueue(app.queue()), Origin::Programmatic)?;

    if settings.playback.autoplay_on_start {
        if let Some(track) = app.selected_track() {
            // Not a gesture: the track loads but stays silent until the first key.
            player.send(PlayerCmd::SetCurrentTrack(track.clone()), Origin::Programmatic)?;
        }
    }
    Ok(())
}
