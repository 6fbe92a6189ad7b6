//! Transport- and device-independent logic of the live console.
//!
//! The [`controller::ConsoleController`] owns all UI state and talks to the
//! outside world only through the traits in [`session`], [`media`],
//! [`panel`] and [`preferences`].

pub mod controller;
pub mod media;
pub mod panel;
pub mod preferences;
pub mod session;
pub mod settings;

pub use controller::{ConsoleController, ControllerOptions, Form, UiCommand};
pub use media::{CaptureSource, FrameSettings, MediaBackend, MediaDevice, MediaInput};
pub use panel::{ConsoleView, LogEntry, LogKind, Panel};
pub use preferences::{FilePreferenceStore, MemoryPreferenceStore, PreferenceError, PreferenceStore};
pub use session::LiveSession;
pub use settings::{Configuration, RuntimeConfig};
