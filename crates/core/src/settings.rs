//! Built-in defaults, selector options and the configuration snapshot.

use gemini_realtime::ResponseModality;
use std::ops::RangeInclusive;

pub const MODEL_NAME: &str = "models/gemini-2.0-flash-exp";

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are my helpful assistant. You can see and hear me, and respond with voice and text. If you are asked about things you do not know, say so instead of guessing.";

/// Mime type of microphone chunks forwarded to the Live API.
pub const MIC_MIME_TYPE: &str = "audio/pcm;rate=16000";
/// Sample rate microphone audio is converted to before it is sent.
pub const MIC_SAMPLE_RATE: u32 = 16_000;
/// Mime type of camera and screen frames.
pub const FRAME_MIME_TYPE: &str = "image/jpeg";

pub const VOICES: [&str; 5] = ["Puck", "Charon", "Kore", "Fenrir", "Aoede"];

pub const FPS_RANGE: RangeInclusive<u32> = 1..=30;
pub const RESIZE_WIDTH_RANGE: RangeInclusive<u32> = 160..=1920;
pub const QUALITY_RANGE: RangeInclusive<f32> = 0.1..=1.0;
pub const SAMPLE_RATE_RANGE: RangeInclusive<u32> = 8_000..=48_000;
/// Playback rate a settings reset returns to.
pub const RESET_SAMPLE_RATE: u32 = 16_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
}

/// Options of the language selector, in display order.
pub const LANGUAGES: &[Language] = &[
    Language { code: "en-US", name: "English (US)" },
    Language { code: "en-GB", name: "English (UK)" },
    Language { code: "en-AU", name: "English (Australia)" },
    Language { code: "en-IN", name: "English (India)" },
    Language { code: "de-DE", name: "German (Germany)" },
    Language { code: "es-US", name: "Spanish (US)" },
    Language { code: "es-ES", name: "Spanish (Spain)" },
    Language { code: "fr-FR", name: "French (France)" },
    Language { code: "fr-CA", name: "French (Canada)" },
    Language { code: "hi-IN", name: "Hindi (India)" },
    Language { code: "pt-BR", name: "Portuguese (Brazil)" },
    Language { code: "ar-XA", name: "Arabic (Generic)" },
    Language { code: "id-ID", name: "Indonesian (Indonesia)" },
    Language { code: "it-IT", name: "Italian (Italy)" },
    Language { code: "ja-JP", name: "Japanese (Japan)" },
    Language { code: "tr-TR", name: "Turkish (Turkey)" },
    Language { code: "vi-VN", name: "Vietnamese (Vietnam)" },
    Language { code: "bn-IN", name: "Bengali (India)" },
    Language { code: "gu-IN", name: "Gujarati (India)" },
    Language { code: "kn-IN", name: "Kannada (India)" },
    Language { code: "ml-IN", name: "Malayalam (India)" },
    Language { code: "mr-IN", name: "Marathi (India)" },
    Language { code: "ta-IN", name: "Tamil (India)" },
    Language { code: "te-IN", name: "Telugu (India)" },
    Language { code: "nl-NL", name: "Dutch (Netherlands)" },
    Language { code: "ko-KR", name: "Korean (South Korea)" },
    Language { code: "cmn-CN", name: "Mandarin Chinese (China)" },
    Language { code: "pl-PL", name: "Polish (Poland)" },
    Language { code: "ru-RU", name: "Russian (Russia)" },
    Language { code: "th-TH", name: "Thai (Thailand)" },
];

pub fn find_language(code: &str) -> Option<&'static Language> {
    LANGUAGES.iter().find(|lang| lang.code == code)
}

pub fn is_known_voice(voice: &str) -> bool {
    VOICES.contains(&voice)
}

/// Process-wide settings the session is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub model_name: String,
    pub output_sample_rate: u32,
    pub system_instruction: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let defaults = Configuration::default();
        Self {
            model_name: MODEL_NAME.to_string(),
            output_sample_rate: defaults.sample_rate,
            system_instruction: defaults.system_instruction,
        }
    }
}

/// A snapshot of every user-adjustable setting.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub fps: u32,
    pub resize_width: u32,
    pub quality: f32,
    pub sample_rate: u32,
    pub voice: String,
    pub response_type: ResponseModality,
    pub system_instruction: String,
    pub language: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            fps: 1,
            resize_width: 640,
            quality: 0.3,
            sample_rate: 24_000,
            voice: "Aoede".to_string(),
            response_type: ResponseModality::Audio,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            language: "en-US".to_string(),
        }
    }
}

pub fn fps_label(fps: u32) -> String {
    format!("{} FPS", fps)
}

pub fn resize_width_label(width: u32) -> String {
    format!("{}px", width)
}

pub fn quality_label(quality: f32) -> String {
    quality.to_string()
}

pub fn sample_rate_label(rate: u32) -> String {
    format!("{} Hz", rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_inside_slider_ranges() {
        let defaults = Configuration::default();
        assert!(FPS_RANGE.contains(&defaults.fps));
        assert!(RESIZE_WIDTH_RANGE.contains(&defaults.resize_width));
        assert!(QUALITY_RANGE.contains(&defaults.quality));
        assert!(SAMPLE_RATE_RANGE.contains(&defaults.sample_rate));
        assert!(SAMPLE_RATE_RANGE.contains(&RESET_SAMPLE_RATE));
        assert!(is_known_voice(&defaults.voice));
        assert!(find_language(&defaults.language).is_some());
    }

    #[test]
    fn labels() {
        assert_eq!(fps_label(5), "5 FPS");
        assert_eq!(resize_width_label(640), "640px");
        assert_eq!(quality_label(0.3), "0.3");
        assert_eq!(sample_rate_label(16000), "16000 Hz");
    }

    #[test]
    fn runtime_config_follows_defaults() {
        let runtime = RuntimeConfig::default();
        assert_eq!(runtime.model_name, MODEL_NAME);
        assert_eq!(runtime.output_sample_rate, 24_000);
        assert_eq!(runtime.system_instruction, DEFAULT_SYSTEM_INSTRUCTION);
    }

    #[test]
    fn language_lookup() {
        assert_eq!(find_language("ja-JP").map(|l| l.name), Some("Japanese (Japan)"));
        assert!(find_language("xx-XX").is_none());
        assert!(!is_known_voice("Nobody"));
    }
}
