//! Line-oriented terminal front end.
//!
//! Log entries print as they arrive; the status line prints whenever a
//! control changes. Input lines are either slash commands or chat text.

use gemini_realtime::ResponseModality;
use live_console_core::{
    controller::UiCommand,
    panel::{ConsoleView, LogEntry, Panel},
    settings,
};
use std::io::Write;

pub const RESET_PROMPT: &str = "Are you sure you want to reset all settings to default values? [y/N]";

pub const HELP: &str = "\
Commands:
  /connect              connect or disconnect
  /mic                  toggle the microphone
  /camera               toggle the camera
  /stop-video           stop the camera
  /screen               toggle screen sharing
  /fps <n>              frames per second (1-30)
  /width <px>           frame width (160-1920)
  /quality <0.1-1.0>    JPEG quality
  /rate <hz>            playback sample rate (8000-48000)
  /voice <name>         Puck, Charon, Kore, Fenrir or Aoede
  /language <code>      speech language, see /languages
  /response <text|audio>
  /instruction <text>   system instruction
  /key <api key>        Gemini API key
  /config               show or hide the settings panel
  /apply                save settings and reconnect
  /reset                restore default settings
  /languages            list language codes
  /help                 this text
  /quit                 exit
Anything else is sent as a chat message.";

/// A parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    Command(UiCommand),
    /// Needs a confirmation before it becomes [`UiCommand::ResetConfig`].
    Reset,
    Help,
    Languages,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParseError {
    #[error("Unknown command: /{0}. Type /help for a list.")]
    UnknownCommand(String),
    #[error("/{0} needs an argument")]
    MissingArgument(&'static str),
    #[error("/{command}: '{value}' is not a valid number")]
    InvalidNumber { command: &'static str, value: String },
    #[error("/response: expected 'text' or 'audio', got '{0}'")]
    InvalidResponseType(String),
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleInput>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(ConsoleInput::Command(UiCommand::SendMessage(
            line.to_string(),
        ))));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    let command = match name.to_ascii_lowercase().as_str() {
        "connect" | "disconnect" => UiCommand::ToggleConnect,
        "mic" => UiCommand::ToggleMic,
        "camera" | "video" => UiCommand::ToggleCamera,
        "stop-video" => UiCommand::StopVideo,
        "screen" => UiCommand::ToggleScreenShare,
        "fps" => UiCommand::FpsInput(number("fps", arg)?),
        "width" => UiCommand::ResizeWidthInput(number("width", arg)?),
        "quality" => UiCommand::QualityInput(number("quality", arg)?),
        "rate" => UiCommand::SampleRateInput(number("rate", arg)?),
        "voice" => UiCommand::SelectVoice(required("voice", arg)?),
        "language" => UiCommand::SelectLanguage(required("language", arg)?),
        "response" => {
            let value = required("response", arg)?;
            match ResponseModality::parse(&value) {
                Some(kind) => UiCommand::SelectResponseType(kind),
                None => return Err(ParseError::InvalidResponseType(value)),
            }
        }
        "instruction" => UiCommand::SetSystemInstruction(required("instruction", arg)?),
        "key" => UiCommand::SetApiKey(required("key", arg)?),
        "config" => UiCommand::ToggleConfigPanel,
        "apply" => UiCommand::ApplyConfig,
        "reset" => return Ok(Some(ConsoleInput::Reset)),
        "languages" => return Ok(Some(ConsoleInput::Languages)),
        "help" | "?" => return Ok(Some(ConsoleInput::Help)),
        "quit" | "exit" => UiCommand::Quit,
        _ => return Err(ParseError::UnknownCommand(name.to_string())),
    };
    Ok(Some(ConsoleInput::Command(command)))
}

fn required(command: &'static str, arg: &str) -> Result<String, ParseError> {
    if arg.is_empty() {
        Err(ParseError::MissingArgument(command))
    } else {
        Ok(arg.to_string())
    }
}

fn number<T: std::str::FromStr>(command: &'static str, arg: &str) -> Result<T, ParseError> {
    let arg = required(command, arg)?;
    arg.parse().map_err(|_| ParseError::InvalidNumber {
        command,
        value: arg,
    })
}

/// `true` for answers that confirm a prompt.
pub fn is_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub fn language_list() -> String {
    settings::LANGUAGES
        .iter()
        .map(|lang| format!("  {:<7} {}", lang.code, lang.name))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_entry(entry: &LogEntry) -> String {
    format!(
        "[{}] {} {}",
        entry.timestamp.format("%H:%M:%S"),
        entry.kind.emoji(),
        entry.message
    )
}

const METER_WIDTH: usize = 10;

pub fn meter(level: f32) -> String {
    let filled = ((level.clamp(0.0, 1.0) * METER_WIDTH as f32).round() as usize).min(METER_WIDTH);
    format!("{}{}", "#".repeat(filled), "-".repeat(METER_WIDTH - filled))
}

/// Everything in the panel except the level meters.
pub fn status_line(panel: &Panel) -> String {
    let mut status = format!(
        "[{}] {} | {} {} {}",
        if panel.connected { "connected" } else { "offline" },
        if panel.controls_enabled { "controls on" } else { "controls off" },
        panel.mic_icon,
        panel.camera_icon,
        panel.screen_icon,
    );
    if panel.screen_preview_visible {
        status.push_str(" (sharing)");
    }
    if panel.config_open {
        status.push_str(&format!(
            " | {} {} q={} {} | [{}{}]",
            panel.fps_label,
            panel.resize_width_label,
            panel.quality_label,
            panel.sample_rate_label,
            panel.apply_label,
            if panel.apply_enabled { "" } else { " (busy)" },
        ));
    }
    status
}

pub fn meter_line(panel: &Panel) -> String {
    format!(
        "in [{}] out [{}]",
        meter(panel.input_level),
        meter(panel.output_level)
    )
}

/// Writes log entries and status changes to stdout, meters to stderr.
#[derive(Default)]
pub struct TerminalView {
    last_status: String,
    last_meters: String,
}

impl TerminalView {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConsoleView for TerminalView {
    fn append_log(&mut self, entry: &LogEntry) {
        println!("{}", format_entry(entry));
    }

    fn render(&mut self, panel: &Panel) {
        let status = status_line(panel);
        if status != self.last_status {
            println!("{}", status);
            self.last_status = status;
        }

        let meters = meter_line(panel);
        if meters != self.last_meters {
            let mut stderr = std::io::stderr();
            let _ = write!(stderr, "\r{}", meters);
            let _ = stderr.flush();
            self.last_meters = meters;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use live_console_core::panel::LogKind;

    fn command(line: &str) -> UiCommand {
        match parse_line(line) {
            Ok(Some(ConsoleInput::Command(command))) => command,
            other => panic!("expected a command for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_is_a_chat_message() {
        assert_eq!(
            command("  what do you see?  "),
            UiCommand::SendMessage("what do you see?".into())
        );
        assert_eq!(parse_line("   "), Ok(None));
    }

    #[test]
    fn slash_commands_map_to_controls() {
        assert_eq!(command("/connect"), UiCommand::ToggleConnect);
        assert_eq!(command("/MIC"), UiCommand::ToggleMic);
        assert_eq!(command("/stop-video"), UiCommand::StopVideo);
        assert_eq!(command("/fps 12"), UiCommand::FpsInput(12));
        assert_eq!(command("/quality 0.8"), UiCommand::QualityInput(0.8));
        assert_eq!(command("/voice Kore"), UiCommand::SelectVoice("Kore".into()));
        assert_eq!(
            command("/response TEXT"),
            UiCommand::SelectResponseType(ResponseModality::Text)
        );
        assert_eq!(
            command("/instruction Answer in one sentence."),
            UiCommand::SetSystemInstruction("Answer in one sentence.".into())
        );
        assert_eq!(command("/quit"), UiCommand::Quit);
        assert_eq!(parse_line("/reset"), Ok(Some(ConsoleInput::Reset)));
        assert_eq!(parse_line("/languages"), Ok(Some(ConsoleInput::Languages)));
    }

    #[test]
    fn bad_arguments_are_reported() {
        assert_eq!(
            parse_line("/fps fast"),
            Err(ParseError::InvalidNumber {
                command: "fps",
                value: "fast".into()
            })
        );
        assert_eq!(parse_line("/key"), Err(ParseError::MissingArgument("key")));
        assert_eq!(
            parse_line("/response video"),
            Err(ParseError::InvalidResponseType("video".into()))
        );
        assert_eq!(
            parse_line("/dance").unwrap_err().to_string(),
            "Unknown command: /dance. Type /help for a list."
        );
    }

    #[test]
    fn confirmation_accepts_yes_only() {
        assert!(is_confirmation("y"));
        assert!(is_confirmation(" YES "));
        assert!(!is_confirmation(""));
        assert!(!is_confirmation("nope"));
    }

    #[test]
    fn meters_fill_proportionally() {
        assert_eq!(meter(0.0), "----------");
        assert_eq!(meter(0.5), "#####-----");
        assert_eq!(meter(2.0), "##########");
    }

    #[test]
    fn status_line_shows_settings_when_panel_is_open() {
        let mut panel = Panel::default();
        assert_eq!(status_line(&panel), "[offline] controls off | mic videocam screen_share");

        panel.config_open = true;
        panel.fps_label = "1 FPS".into();
        panel.resize_width_label = "640px".into();
        panel.quality_label = "0.3".into();
        panel.sample_rate_label = "24000 Hz".into();
        assert!(status_line(&panel).ends_with("| 1 FPS 640px q=0.3 24000 Hz | [Apply]"));
    }

    #[test]
    fn log_entries_carry_time_and_kind() {
        let entry = LogEntry::new(LogKind::Ai, "Hello");
        let line = format_entry(&entry);
        assert!(line.starts_with('['));
        assert!(line.ends_with("🤖 Hello"));
    }

    #[test]
    fn language_list_includes_every_language() {
        assert_eq!(language_list().lines().count(), settings::LANGUAGES.len());
    }
}
