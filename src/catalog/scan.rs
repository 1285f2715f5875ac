use std::borrow::Cow;
use std::path::Path;

use lofty::prelude::*;
use walkdir::{DirEntry, WalkDir};

use crate::config::LibrarySettings;

use super::display::display_from_fields;
use super::model::{Track, TrackId};

/// Lowercased extensions accepted by a scan, without the leading dot.
struct Extensions(Vec<String>);

impl Extensions {
    fn from_settings(settings: &LibrarySettings) -> Self {
        Self(
            settings
                .extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        )
    }

    fn matches(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            return false;
        };
        self.0.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

/// Title and producer from the file's tags; blank values count as missing.
fn read_tags(path: &Path) -> (Option<String>, Option<String>) {
    let Ok(tagged) = lofty::read_from_path(path) else {
        return (None, None);
    };
    let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) else {
        return (None, None);
    };
    (non_blank(tag.title()), non_blank(tag.artist()))
}

fn non_blank(value: Option<Cow<'_, str>>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn track_from_file(path: &Path, settings: &LibrarySettings) -> Track {
    let (tag_title, producer) = read_tags(path);
    let title = tag_title.unwrap_or_else(|| {
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("UNKNOWN")
            .to_string()
    });

    let source = path.display().to_string();
    let display = display_from_fields(
        &source,
        &source,
        &title,
        producer.as_deref(),
        &settings.display_fields,
        &settings.display_separator,
    );

    Track {
        id: TrackId::new(source.clone()),
        title,
        producer,
        source,
        artwork: None,
        display,
    }
}

/// Build a catalog from the audio files below `dir`.
///
/// The file path doubles as the track id and source; title and producer come
/// from the file's tags when present.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<Track> {
    let extensions = Extensions::from_settings(settings);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    let mut tracks: Vec<Track> = walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() || e.path().is_file())
        .filter(|e| extensions.matches(e.path()))
        .map(|e| track_from_file(e.path(), settings))
        .collect();

    tracks.sort_by_cached_key(|t| t.display.to_lowercase());
    tracks
}
