use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Stable identifier of a beat in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single playable beat.
///
/// Tracks are immutable once handed to the player; the engine only ever holds
/// them behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    /// Producer display name.
    pub producer: Option<String>,
    /// Playable source: `http(s)://` URL, `file://` URL or a plain path.
    pub source: String,
    pub artwork: Option<String>,
    /// Pre-rendered label used by list surfaces.
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackError {
    #[error("track is missing an id")]
    MissingId,
    #[error("track {id} is missing a playable source")]
    MissingSource { id: String },
}

/// Loosely typed track record as produced by the data layer.
///
/// Every field is optional and a few historical field names are accepted.
/// Unknown fields are ignored; `Track::try_from` enforces the required ones.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrackPayload {
    #[serde(alias = "_id", alias = "beat_id")]
    pub id: Option<String>,
    #[serde(alias = "name")]
    pub title: Option<String>,
    #[serde(alias = "artist", alias = "producer_name")]
    pub producer: Option<String>,
    #[serde(alias = "src", alias = "url", alias = "audio_url", alias = "audio")]
    pub source: Option<String>,
    #[serde(alias = "cover", alias = "image", alias = "artwork_url")]
    pub artwork: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl TryFrom<TrackPayload> for Track {
    type Error = TrackError;

    fn try_from(payload: TrackPayload) -> Result<Self, Self::Error> {
        let id = non_blank(payload.id).ok_or(TrackError::MissingId)?;
        let source = non_blank(payload.source).ok_or_else(|| TrackError::MissingSource {
            id: id.clone(),
        })?;
        let title = non_blank(payload.title).unwrap_or_else(|| id.clone());
        let producer = non_blank(payload.producer);
        let artwork = non_blank(payload.artwork);
        let display = super::display::make_display(&title, producer.as_deref());

        Ok(Track {
            id: TrackId::new(id),
            title,
            producer,
            source,
            artwork,
            display,
        })
    }
}
