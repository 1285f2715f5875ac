use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::widgets::Widget;

use super::*;
use crate::config::SpectrumSettings;
use crate::spectrum::{SpectrumBridge, SpectrumTap, TappedSource};

fn bridge() -> SpectrumBridge {
    SpectrumBridge::new(&SpectrumSettings {
        fft_size: 256,
        min_db: -100.0,
        max_db: 0.0,
    })
}

#[test]
fn bar_count_does_not_depend_on_bin_count() {
    assert_eq!(map_to_bars(&[0; 128], 16).len(), 16);
    assert_eq!(map_to_bars(&[0; 1024], 16).len(), 16);
    assert_eq!(map_to_bars(&[0; 8], 16).len(), 16);
    assert!(map_to_bars(&[255; 64], 0).is_empty());
}

#[test]
fn full_bins_map_to_full_bars() {
    let levels = map_to_bars(&[255; 512], 24);
    assert!(levels.iter().all(|&l| (l - 1.0).abs() < 1e-6));
}

#[test]
fn dc_bin_is_ignored() {
    let mut bins = vec![0u8; 256];
    bins[0] = 255;
    let levels = map_to_bars(&bins, 8);
    assert!(levels.iter().all(|&l| l == 0.0));
}

#[test]
fn low_bars_follow_low_bins() {
    let mut bins = vec![0u8; 256];
    bins[1] = 255;
    let levels = map_to_bars(&bins, 8);
    assert!(levels[0] > 0.0);
    assert_eq!(*levels.last().unwrap(), 0.0);
}

#[test]
fn paused_visualizer_shows_idle_bars() {
    let mut vis = Visualizer::new(bridge().reader(), 12);
    let levels = vis.frame(false);
    assert_eq!(levels, vec![IDLE_LEVEL; 12]);
}

#[test]
fn uninstalled_analyser_shows_idle_bars_while_playing() {
    let mut vis = Visualizer::new(bridge().reader(), 6);
    assert_eq!(vis.frame(true), vec![IDLE_LEVEL; 6]);
}

#[test]
fn playing_signal_raises_bars() {
    let bridge = bridge();
    let tap = SpectrumTap::new(bridge.fft_size());
    bridge.install(tap.clone());
    let route = tap.attach(8000);
    let samples: Vec<f32> = (0..1024)
        .map(|i| if (i / 4) % 2 == 0 { 0.8 } else { -0.8 })
        .collect();
    let _: Vec<f32> =
        TappedSource::new(rodio::buffer::SamplesBuffer::new(1, 8000, samples), tap, route)
            .collect();

    let mut vis = Visualizer::new(bridge.reader(), 8);
    let levels = vis.frame(true);

    assert_eq!(levels.len(), 8);
    assert!(levels.iter().all(|&l| l >= IDLE_LEVEL));
    assert!(levels.iter().any(|&l| l > 0.3));
}

#[test]
fn column_is_painted_bottom_up() {
    let area = Rect::new(0, 0, 1, 4);
    let mut buf = Buffer::empty(area);
    paint_column(&mut buf, 0, area, 0.5, Default::default());

    assert_eq!(buf[(0, 3)].symbol(), "█");
    assert_eq!(buf[(0, 2)].symbol(), "█");
    assert_eq!(buf[(0, 1)].symbol(), " ");
    assert_eq!(buf[(0, 0)].symbol(), " ");
}

#[test]
fn partial_cells_use_eighth_blocks() {
    let area = Rect::new(0, 0, 1, 1);
    let mut buf = Buffer::empty(area);
    paint_column(&mut buf, 0, area, 0.5, Default::default());
    assert_eq!(buf[(0, 0)].symbol(), "▄");
}

#[test]
fn bars_widget_spreads_levels_across_width() {
    let area = Rect::new(0, 0, 4, 2);
    let mut buf = Buffer::empty(area);
    SpectrumBars::new(&[1.0, 0.0]).render(area, &mut buf);

    assert_eq!(buf[(0, 0)].symbol(), "█");
    assert_eq!(buf[(1, 0)].symbol(), "█");
    assert_eq!(buf[(2, 1)].symbol(), " ");
    assert_eq!(buf[(3, 1)].symbol(), " ");
}

#[test]
fn frame_loop_ticks_until_stopped() {
    let ticks = Arc::new(AtomicU64::new(0));
    let counter = ticks.clone();
    let frames = FrameLoop::start(Duration::from_millis(2), move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        true
    })
    .unwrap();

    while ticks.load(Ordering::SeqCst) < 3 {
        std::thread::sleep(Duration::from_millis(2));
    }
    assert!(frames.is_running());
    frames.stop();

    let after_stop = ticks.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(ticks.load(Ordering::SeqCst), after_stop);
}

#[test]
fn dropping_the_handle_cancels_the_loop() {
    let (tx, rx) = mpsc::channel();
    {
        let _frames = FrameLoop::start(Duration::from_millis(1), move |n| tx.send(n).is_ok()).unwrap();
        rx.recv_timeout(Duration::from_secs(2)).unwrap();
    }
    while rx.try_recv().is_ok() {}
    // The sender died with the loop thread.
    assert!(matches!(
        rx.recv_timeout(Duration::from_millis(20)),
        Err(mpsc::RecvTimeoutError::Disconnected)
    ));
}

#[test]
fn callback_can_end_the_loop() {
    let frames = FrameLoop::start(Duration::from_millis(1), |n| n < 2).unwrap();
    for _ in 0..200 {
        if !frames.is_running() {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(!frames.is_running());
}
