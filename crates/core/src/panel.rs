//! The control surface model and the view that renders it.

use chrono::{DateTime, Local};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    System,
    User,
    Ai,
}

impl LogKind {
    pub fn emoji(&self) -> &'static str {
        match self {
            LogKind::System => "⚙️",
            LogKind::User => "🫵",
            LogKind::Ai => "🤖",
        }
    }
}

/// One line of the on-screen log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub kind: LogKind,
    pub message: String,
}

impl LogEntry {
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            kind,
            message: message.into(),
        }
    }
}

pub const CONNECT_LABEL: &str = "Connect";
pub const DISCONNECT_LABEL: &str = "Disconnect";
pub const APPLY_LABEL: &str = "Apply";
pub const APPLYING_LABEL: &str = "Applying...";

pub const MIC_ICON_IDLE: &str = "mic";
pub const MIC_ICON_ACTIVE: &str = "mic_off";
pub const CAMERA_ICON_IDLE: &str = "videocam";
pub const CAMERA_ICON_ACTIVE: &str = "videocam_off";
pub const SCREEN_ICON_IDLE: &str = "screen_share";
pub const SCREEN_ICON_ACTIVE: &str = "stop_screen_share";

/// Visible state of every control.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub connect_label: &'static str,
    pub connected: bool,
    /// Message input, send, mic, camera and screen buttons.
    pub controls_enabled: bool,
    pub mic_icon: &'static str,
    pub camera_icon: &'static str,
    pub camera_active: bool,
    pub screen_icon: &'static str,
    pub screen_active: bool,
    pub screen_preview_visible: bool,
    pub fps_label: String,
    pub resize_width_label: String,
    pub quality_label: String,
    pub sample_rate_label: String,
    pub config_open: bool,
    pub apply_label: &'static str,
    pub apply_enabled: bool,
    /// Microphone level, 0.0 to 1.0.
    pub input_level: f32,
    /// Playback level, 0.0 to 1.0.
    pub output_level: f32,
}

impl Default for Panel {
    fn default() -> Self {
        Self {
            connect_label: CONNECT_LABEL,
            connected: false,
            controls_enabled: false,
            mic_icon: MIC_ICON_IDLE,
            camera_icon: CAMERA_ICON_IDLE,
            camera_active: false,
            screen_icon: SCREEN_ICON_IDLE,
            screen_active: false,
            screen_preview_visible: false,
            fps_label: String::new(),
            resize_width_label: String::new(),
            quality_label: String::new(),
            sample_rate_label: String::new(),
            config_open: false,
            apply_label: APPLY_LABEL,
            apply_enabled: true,
            input_level: 0.0,
            output_level: 0.0,
        }
    }
}

/// Renders the panel and the log somewhere a user can see them.
pub trait ConsoleView: Send {
    fn append_log(&mut self, entry: &LogEntry);
    fn render(&mut self, panel: &Panel);
}
