//! beatline: a terminal beat player with one shared playback engine, a
//! seekable waveform strip and a live spectrum visualizer.

pub mod app;
pub mod catalog;
pub mod config;
pub mod media;
pub mod mpris;
pub mod playback;
pub mod player;
pub mod runtime;
pub mod spectrum;
pub mod ui;
pub mod visualizer;
pub mod waveform;
