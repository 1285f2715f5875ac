use std::path::Path;

use crate::config::TrackDisplayField;

/// Default list label: `Producer - Title`, or just the title.
pub fn make_display(title: &str, producer: Option<&str>) -> String {
    match producer.map(str::trim) {
        Some(p) if !p.is_empty() => format!("{} - {}", p, title.trim()),
        _ => title.trim().to_string(),
    }
}

/// Build a display string from the configured `fields`, joined with `sep`.
///
/// Falls back to `title` when none of the fields produced any text.
pub fn display_from_fields(
    id: &str,
    source: &str,
    title: &str,
    producer: Option<&str>,
    fields: &[TrackDisplayField],
    sep: &str,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    for f in fields {
        match f {
            TrackDisplayField::Display => {
                parts.push(make_display(title, producer));
            }
            TrackDisplayField::Title => {
                if !title.trim().is_empty() {
                    parts.push(title.trim().to_string());
                }
            }
            TrackDisplayField::Producer => {
                if let Some(p) = producer.map(str::trim).filter(|s| !s.is_empty()) {
                    parts.push(p.to_string());
                }
            }
            TrackDisplayField::Id => {
                if !id.trim().is_empty() {
                    parts.push(id.trim().to_string());
                }
            }
            TrackDisplayField::Filename => {
                let stem = source
                    .rsplit(['/', '\\'])
                    .next()
                    .map(|name| Path::new(name))
                    .and_then(|p| p.file_stem())
                    .and_then(|s| s.to_str());
                if let Some(stem) = stem.filter(|s| !s.trim().is_empty()) {
                    parts.push(stem.to_string());
                }
            }
            TrackDisplayField::Source => {
                parts.push(source.to_string());
            }
        }
    }

    if parts.is_empty() {
        title.to_string()
    } else {
        parts.join(sep)
    }
}
