use std::sync::Arc;
use std::time::Duration;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::widgets::Widget;

use super::*;
use crate::catalog::{Track, TrackId};
use crate::playback::PlaybackState;

fn state_with(generation: u64, waveform: Option<Vec<f32>>) -> PlaybackState {
    PlaybackState {
        current_track: Some(Arc::new(Track {
            id: TrackId::new("a"),
            title: "A".into(),
            producer: None,
            source: "/a.mp3".into(),
            artwork: None,
            display: "A".into(),
        })),
        generation,
        waveform: waveform.map(|b| Arc::new(WaveformPeaks::from_buckets(b))),
        ..PlaybackState::default()
    }
}

#[test]
fn accumulator_counts_frames_and_normalizes() {
    let mut acc = PeakAccumulator::new(2, 2);
    // Frames: (0.1,-0.2) (0.4,0.0) (0.0,-0.8) (0.2,0.2) (0.1,0.0)
    for s in [0.1, -0.2, 0.4, 0.0, 0.0, -0.8, 0.2, 0.2, 0.1, 0.0] {
        acc.push(s);
    }
    assert_eq!(acc.frames(), 5);

    let peaks = acc.finish(3);
    // Blocks: max(0.2, 0.4)=0.4, max(0.8, 0.2)=0.8, trailing 0.1
    assert_eq!(peaks.buckets(), &[0.5, 1.0, 0.125]);
}

#[test]
fn accumulator_ignores_partial_trailing_frame_and_handles_silence() {
    let mut acc = PeakAccumulator::new(2, 4);
    acc.push(0.0);
    acc.push(0.0);
    acc.push(0.9);
    assert_eq!(acc.frames(), 1);

    let silent = PeakAccumulator::new(1, 4);
    assert!(silent.finish(10).is_empty());
}

#[test]
fn columns_downsample_by_maximum() {
    let peaks = WaveformPeaks::from_buckets(vec![0.1, 0.9, 0.2, 0.3]);
    assert_eq!(peaks.columns(2), vec![0.9, 0.3]);
    assert_eq!(peaks.columns(8).len(), 8);
    assert_eq!(peaks.columns(0), Vec::<f32>::new());
}

#[test]
fn pointer_maps_proportionally_to_seek_target() {
    let mut r = WaveformRenderer::new();
    r.sync(&state_with(1, None));
    r.set_bounds(Rect::new(10, 5, 11, 2));

    assert!(!r.pointer_down(9, 5));
    assert!(r.pointer_down(15, 6));
    r.pointer_drag(20);

    let target = r.pointer_up(20, Duration::from_secs(120));
    assert_eq!(target, Some(Duration::from_secs(120)));
    assert!(!r.is_dragging());

    assert!(r.pointer_down(15, 5));
    assert_eq!(
        r.pointer_up(15, Duration::from_secs(120)),
        Some(Duration::from_secs(60))
    );
}

#[test]
fn pointer_up_without_duration_does_not_seek() {
    let mut r = WaveformRenderer::new();
    r.sync(&state_with(1, None));
    r.set_bounds(Rect::new(0, 0, 10, 1));
    assert!(r.pointer_down(3, 0));
    assert_eq!(r.pointer_up(3, Duration::ZERO), None);
}

#[test]
fn drag_position_overrides_reported_progress() {
    let mut r = WaveformRenderer::new();
    let mut state = state_with(1, None);
    state.duration = Duration::from_secs(100);
    state.current_time = Duration::from_secs(25);
    r.sync(&state);
    r.set_bounds(Rect::new(0, 0, 5, 1));

    assert_eq!(r.progress(&state), 0.25);
    r.pointer_down(4, 0);
    assert_eq!(r.progress(&state), 1.0);
}

#[test]
fn new_generation_discards_peaks_and_drag() {
    let mut r = WaveformRenderer::new();
    r.sync(&state_with(1, Some(vec![1.0, 0.5])));
    r.set_bounds(Rect::new(0, 0, 5, 1));
    r.pointer_down(2, 0);
    assert!(r.peaks().is_some());

    r.sync(&state_with(2, None));
    assert!(r.peaks().is_none());
    assert!(!r.is_dragging());
    assert_eq!(r.generation(), Some(2));

    // Peaks for the same generation arrive later.
    r.sync(&state_with(2, Some(vec![0.3])));
    assert_eq!(r.peaks().map(|p| p.buckets().len()), Some(1));
}

#[test]
fn unbound_renderer_ignores_pointer() {
    let mut r = WaveformRenderer::new();
    r.sync(&PlaybackState::default());
    r.set_bounds(Rect::new(0, 0, 5, 1));
    assert!(!r.pointer_down(1, 0));
}

#[test]
fn view_paints_every_column() {
    let mut r = WaveformRenderer::new();
    r.sync(&state_with(1, Some(vec![1.0, 0.0, 0.5, 1.0])));
    let area = Rect::new(0, 0, 8, 2);
    let mut buf = Buffer::empty(area);

    WaveformView::new(&r, 0.5).render(area, &mut buf);

    for x in 0..8 {
        assert_ne!(buf[(x, 1)].symbol(), " ", "column {x} left blank");
    }
    assert_eq!(buf[(0, 0)].symbol(), "█");
}
