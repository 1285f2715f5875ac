use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::config::LibrarySettings;

use super::display::display_from_fields;
use super::model::{Track, TrackPayload};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CatalogFile {
    #[serde(alias = "beats", alias = "track", alias = "tracks")]
    beat: Vec<TrackPayload>,
}

/// Load a TOML catalog file (`[[beat]]` tables).
///
/// Entries that fail validation or repeat an earlier id are skipped with a
/// warning. Relative file sources resolve against the catalog's directory.
pub fn load_catalog(path: &Path, settings: &LibrarySettings) -> Result<Vec<Track>, CatalogError> {
    let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    parse_catalog(&text, base, settings).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub(super) fn parse_catalog(
    text: &str,
    base: &Path,
    settings: &LibrarySettings,
) -> Result<Vec<Track>, toml::de::Error> {
    let file: CatalogFile = toml::from_str(text)?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut tracks = Vec::with_capacity(file.beat.len());

    for (n, payload) in file.beat.into_iter().enumerate() {
        let mut track = match Track::try_from(payload) {
            Ok(t) => t,
            Err(e) => {
                warn!(entry = n, error = %e, "skipping catalog entry");
                continue;
            }
        };

        if !seen.insert(track.id.as_str().to_string()) {
            warn!(id = %track.id, "skipping duplicate catalog id");
            continue;
        }

        track.source = resolve_source(&track.source, base);
        track.display = display_from_fields(
            track.id.as_str(),
            &track.source,
            &track.title,
            track.producer.as_deref(),
            &settings.display_fields,
            &settings.display_separator,
        );
        tracks.push(track);
    }

    Ok(tracks)
}

fn resolve_source(source: &str, base: &Path) -> String {
    if source.contains("://") {
        return source.to_string();
    }
    let p = Path::new(source);
    if p.is_absolute() {
        source.to_string()
    } else {
        base.join(p).display().to_string()
    }
}
