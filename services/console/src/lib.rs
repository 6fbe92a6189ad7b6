//! Live Console Library Crate
//!
//! Device and terminal implementations behind the traits of
//! `live-console-core`. The `live-console` binary wires them to a
//! `gemini_realtime::LiveClient`.

pub mod audio;
pub mod audio_utils;
pub mod backend;
pub mod capture;
pub mod config;
pub mod terminal;
