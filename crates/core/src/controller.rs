//! The console controller.
//!
//! Every user action, remote event and media input is handled here, one at a
//! time, from a single task. Handlers read the form, call a collaborator,
//! update the panel and persist what the user changed.

use crate::{
    media::{
        AudioPlayer, CaptureSource, FrameCapture, FrameSettings, MediaBackend, MediaDevice,
        MediaInput, MicRecorder,
    },
    panel::{self, ConsoleView, LogEntry, LogKind, Panel},
    preferences::{PreferenceStore, keys},
    session::LiveSession,
    settings::{self, Configuration, RuntimeConfig},
};
use anyhow::Result;
use gemini_realtime::{
    Content, GenerationConfig, LiveEvent, MediaChunk, Part, PrebuiltVoiceConfig, ResponseModality,
    Setup, SpeechConfig, VoiceConfig,
};
use std::{str::FromStr, time::Duration};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Pause between disconnecting and reconnecting when settings are applied.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// User actions, one per control.
#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    ToggleConnect,
    SendMessage(String),
    ToggleMic,
    ToggleCamera,
    StopVideo,
    ToggleScreenShare,
    SetApiKey(String),
    SelectVoice(String),
    SelectLanguage(String),
    SelectResponseType(ResponseModality),
    SetSystemInstruction(String),
    FpsInput(u32),
    ResizeWidthInput(u32),
    QualityInput(f32),
    SampleRateInput(u32),
    ToggleConfigPanel,
    ApplyConfig,
    ResetConfig { confirmed: bool },
    Quit,
}

/// Current values of the form controls.
#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    pub api_key: String,
    pub voice: String,
    pub language: String,
    pub response_type: ResponseModality,
    pub system_instruction: String,
    pub message: String,
    pub fps: u32,
    pub resize_width: u32,
    pub quality: f32,
    pub sample_rate: u32,
}

impl Form {
    fn from_defaults(defaults: &Configuration) -> Self {
        Self {
            api_key: String::new(),
            voice: defaults.voice.clone(),
            language: defaults.language.clone(),
            response_type: defaults.response_type,
            system_instruction: defaults.system_instruction.clone(),
            message: String::new(),
            fps: defaults.fps,
            resize_width: defaults.resize_width,
            quality: defaults.quality,
            sample_rate: defaults.sample_rate,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub reconnect_delay: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

pub struct ConsoleController {
    session: Box<dyn LiveSession>,
    media: Box<dyn MediaBackend>,
    view: Box<dyn ConsoleView>,
    prefs: Box<dyn PreferenceStore>,
    media_tx: mpsc::Sender<MediaInput>,
    options: ControllerOptions,
    runtime: RuntimeConfig,
    form: Form,
    panel: Panel,
    log: Vec<LogEntry>,
    is_connected: bool,
    is_recording: bool,
    is_video_active: bool,
    is_screen_sharing: bool,
    is_using_tool: bool,
    audio_player: Option<Box<dyn AudioPlayer>>,
    recorder: Option<Box<dyn MicRecorder>>,
    video: Option<Box<dyn FrameCapture>>,
    screen: Option<Box<dyn FrameCapture>>,
}

impl ConsoleController {
    /// Builds the controller and restores saved preferences into the form.
    pub fn new(
        session: Box<dyn LiveSession>,
        media: Box<dyn MediaBackend>,
        view: Box<dyn ConsoleView>,
        prefs: Box<dyn PreferenceStore>,
        media_tx: mpsc::Sender<MediaInput>,
        options: ControllerOptions,
    ) -> Self {
        let defaults = Configuration::default();
        let mut controller = Self {
            session,
            media,
            view,
            prefs,
            media_tx,
            options,
            runtime: RuntimeConfig::default(),
            form: Form::from_defaults(&defaults),
            panel: Panel::default(),
            log: Vec::new(),
            is_connected: false,
            is_recording: false,
            is_video_active: false,
            is_screen_sharing: false,
            is_using_tool: false,
            audio_player: None,
            recorder: None,
            video: None,
            screen: None,
        };
        controller.restore_preferences();
        controller.relabel_sliders();
        controller.set_connect_button(false);
        controller.panel.controls_enabled = false;
        controller
    }

    pub fn panel(&self) -> &Panel {
        &self.panel
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn runtime(&self) -> &RuntimeConfig {
        &self.runtime
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    pub fn is_video_active(&self) -> bool {
        self.is_video_active
    }

    pub fn is_screen_sharing(&self) -> bool {
        self.is_screen_sharing
    }

    pub fn is_using_tool(&self) -> bool {
        self.is_using_tool
    }

    /// Processes commands, live events and media input until `Quit` or the
    /// command channel closes.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<UiCommand>,
        mut live_events: mpsc::UnboundedReceiver<LiveEvent>,
        mut media: mpsc::Receiver<MediaInput>,
    ) {
        self.render();
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(UiCommand::Quit) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                Some(event) = live_events.recv() => self.handle_live_event(event).await,
                Some(input) = media.recv() => self.handle_media_input(input).await,
            }
        }

        if self.is_connected {
            self.disconnect_from_websocket().await;
        }
        self.render();
        info!("Console controller stopped.");
    }

    pub async fn handle_command(&mut self, command: UiCommand) {
        debug!(?command, "UI command");
        match command {
            UiCommand::ToggleConnect => self.toggle_connect().await,
            UiCommand::SendMessage(text) => {
                self.form.message = text;
                self.handle_send_message().await;
            }
            UiCommand::ToggleMic => self.handle_mic_toggle().await,
            UiCommand::ToggleCamera => self.handle_video_toggle().await,
            UiCommand::StopVideo => self.stop_video(),
            UiCommand::ToggleScreenShare => self.handle_screen_share().await,
            UiCommand::SetApiKey(key) => self.form.api_key = key.trim().to_string(),
            UiCommand::SelectVoice(voice) => self.select_voice(voice),
            UiCommand::SelectLanguage(code) => self.select_language(code),
            UiCommand::SelectResponseType(kind) => self.form.response_type = kind,
            UiCommand::SetSystemInstruction(text) => self.form.system_instruction = text,
            UiCommand::FpsInput(value) => self.on_fps_input(value),
            UiCommand::ResizeWidthInput(value) => self.on_resize_width_input(value),
            UiCommand::QualityInput(value) => self.on_quality_input(value),
            UiCommand::SampleRateInput(value) => self.on_sample_rate_input(value),
            UiCommand::ToggleConfigPanel => self.toggle_config_panel(),
            UiCommand::ApplyConfig => self.apply_config().await,
            UiCommand::ResetConfig { confirmed } => {
                if confirmed {
                    self.reset_to_defaults();
                } else {
                    debug!("Reset cancelled by user");
                }
            }
            UiCommand::Quit => {}
        }
        self.render();
    }

    // --- Connection ---

    pub async fn toggle_connect(&mut self) {
        if self.is_connected {
            self.disconnect_from_websocket().await;
        } else {
            self.connect_to_websocket().await;
        }
    }

    pub async fn connect_to_websocket(&mut self) {
        if self.form.api_key.is_empty() {
            self.log_message("Please input API Key", LogKind::System);
            return;
        }

        self.persist(keys::API_KEY, self.form.api_key.clone());
        self.persist(keys::VOICE, self.form.voice.clone());
        self.persist(keys::LANGUAGE, self.form.language.clone());
        self.persist(keys::SYSTEM_INSTRUCTION, self.form.system_instruction.clone());

        let setup = self.build_setup();
        let api_key = self.form.api_key.clone();
        let result = match self.session.connect(setup, &api_key).await {
            Ok(()) => {
                self.is_connected = true;
                self.resume_audio().await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                self.set_connect_button(true);
                self.panel.controls_enabled = true;
                self.log_message("Connected to Gemini Multimodal Live API", LogKind::System);
            }
            Err(e) => {
                error!(error = ?e, "Connection error");
                self.log_message(format!("Connection error: {:#}", e), LogKind::System);
                self.is_connected = false;
                self.set_connect_button(false);
                self.panel.controls_enabled = false;
            }
        }
    }

    pub async fn disconnect_from_websocket(&mut self) {
        if let Err(e) = self.session.disconnect().await {
            warn!(error = ?e, "Error while disconnecting");
        }
        self.is_connected = false;

        if let Some(player) = self.audio_player.as_mut() {
            player.stop();
        }
        if let Some(mut recorder) = self.recorder.take() {
            recorder.stop();
        }
        self.is_recording = false;
        self.update_mic_icon();
        self.panel.input_level = 0.0;

        self.set_connect_button(false);
        self.panel.controls_enabled = false;
        self.log_message("Disconnected from server", LogKind::System);

        if self.video.is_some() {
            self.stop_video();
        }
        if self.screen.is_some() {
            self.stop_screen_sharing();
        }
    }

    pub async fn handle_send_message(&mut self) {
        let message = self.form.message.trim().to_string();
        if message.is_empty() {
            return;
        }
        self.log_message(message.clone(), LogKind::User);
        if let Err(e) = self.session.send_text(&message).await {
            error!(error = ?e, "Failed to send message");
            self.log_message(format!("Error: {:#}", e), LogKind::System);
        }
        self.form.message.clear();
    }

    fn build_setup(&self) -> Setup {
        Setup {
            model: self.runtime.model_name.clone(),
            generation_config: GenerationConfig {
                response_modalities: vec![self.form.response_type],
                speech_config: Some(SpeechConfig {
                    language_code: Some(self.form.language.clone()),
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: self.form.voice.clone(),
                        },
                    },
                }),
            },
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part {
                    text: self.form.system_instruction.clone(),
                }],
            }),
        }
    }

    // --- Audio ---

    async fn ensure_audio_initialized(&mut self) -> Result<&mut Box<dyn AudioPlayer>> {
        let player = match self.audio_player.take() {
            Some(player) => player,
            None => {
                self.media
                    .audio_player(self.runtime.output_sample_rate, self.media_tx.clone())
                    .await?
            }
        };
        Ok(self.audio_player.insert(player))
    }

    async fn resume_audio(&mut self) -> Result<()> {
        match self.audio_player.as_mut() {
            Some(player) => player.resume().await,
            None => Ok(()),
        }
    }

    pub async fn handle_mic_toggle(&mut self) {
        if !self.is_recording {
            match self.start_microphone().await {
                Ok(()) => {
                    self.is_recording = true;
                    info!("Microphone started");
                    self.log_message("Microphone started", LogKind::System);
                }
                Err(e) => {
                    error!(error = ?e, "Microphone error");
                    self.log_message(format!("Error: {:#}", e), LogKind::System);
                    self.is_recording = false;
                }
            }
            self.update_mic_icon();
        } else {
            self.stop_microphone();
        }
    }

    fn stop_microphone(&mut self) {
        if let Some(mut recorder) = self.recorder.take() {
            recorder.stop();
        }
        self.is_recording = false;
        self.log_message("Microphone stopped", LogKind::System);
        self.update_mic_icon();
        self.panel.input_level = 0.0;
    }

    async fn start_microphone(&mut self) -> Result<()> {
        self.ensure_audio_initialized().await?;
        let mut recorder = self.media.mic_recorder()?;
        recorder.start(self.media_tx.clone()).await?;

        let resumed = match self.audio_player.as_mut() {
            Some(player) => player.resume().await,
            None => Ok(()),
        };
        if let Err(e) = resumed {
            recorder.stop();
            return Err(e);
        }
        self.recorder = Some(recorder);
        Ok(())
    }

    async fn play_audio(&mut self, data: &[u8]) -> Result<()> {
        let player = self.ensure_audio_initialized().await?;
        player.resume().await?;
        player.add_pcm16(data)
    }

    // --- Camera and screen ---

    fn frame_settings(&self) -> FrameSettings {
        FrameSettings {
            fps: self.form.fps,
            resize_width: self.form.resize_width,
            quality: self.form.quality,
        }
    }

    pub async fn handle_video_toggle(&mut self) {
        info!(
            is_video_active = self.is_video_active,
            is_connected = self.is_connected,
            "Video toggle clicked"
        );
        self.persist(keys::VIDEO_FPS, self.form.fps);

        if !self.is_video_active {
            match self.start_video().await {
                Ok(()) => {
                    self.is_video_active = true;
                    self.panel.camera_icon = panel::CAMERA_ICON_ACTIVE;
                    self.panel.camera_active = true;
                    info!("Camera started successfully");
                    self.log_message("Camera started", LogKind::System);
                }
                Err(e) => {
                    error!(error = ?e, "Camera error");
                    self.log_message(format!("Error: {:#}", e), LogKind::System);
                    self.is_video_active = false;
                    self.video = None;
                    self.panel.camera_icon = panel::CAMERA_ICON_IDLE;
                    self.panel.camera_active = false;
                }
            }
        } else {
            info!("Stopping video");
            self.stop_video();
        }
    }

    async fn start_video(&mut self) -> Result<()> {
        let mut capture = match self.video.take() {
            Some(capture) => capture,
            None => self.media.camera()?,
        };
        capture
            .start(self.frame_settings(), self.media_tx.clone())
            .await?;
        self.video = Some(capture);
        Ok(())
    }

    pub fn stop_video(&mut self) {
        if let Some(mut capture) = self.video.take() {
            capture.stop();
        }
        self.is_video_active = false;
        self.panel.camera_icon = panel::CAMERA_ICON_IDLE;
        self.panel.camera_active = false;
        self.log_message("Camera stopped", LogKind::System);
    }

    pub async fn handle_screen_share(&mut self) {
        if !self.is_screen_sharing {
            self.panel.screen_preview_visible = true;
            match self.start_screen_share().await {
                Ok(()) => {
                    self.is_screen_sharing = true;
                    self.panel.screen_icon = panel::SCREEN_ICON_ACTIVE;
                    self.panel.screen_active = true;
                    info!("Screen sharing started");
                    self.log_message("Screen sharing started", LogKind::System);
                }
                Err(e) => {
                    error!(error = ?e, "Screen sharing error");
                    self.log_message(format!("Error: {:#}", e), LogKind::System);
                    self.is_screen_sharing = false;
                    self.screen = None;
                    self.panel.screen_icon = panel::SCREEN_ICON_IDLE;
                    self.panel.screen_active = false;
                    self.panel.screen_preview_visible = false;
                }
            }
        } else {
            self.stop_screen_sharing();
        }
    }

    async fn start_screen_share(&mut self) -> Result<()> {
        let mut recorder = self.media.screen_recorder()?;
        recorder
            .start(self.frame_settings(), self.media_tx.clone())
            .await?;
        self.screen = Some(recorder);
        Ok(())
    }

    pub fn stop_screen_sharing(&mut self) {
        if let Some(mut recorder) = self.screen.take() {
            recorder.stop();
        }
        self.is_screen_sharing = false;
        self.panel.screen_icon = panel::SCREEN_ICON_IDLE;
        self.panel.screen_active = false;
        self.panel.screen_preview_visible = false;
        self.log_message("Screen sharing stopped", LogKind::System);
    }

    // --- Form controls ---

    fn select_voice(&mut self, voice: String) {
        if settings::is_known_voice(&voice) {
            self.form.voice = voice;
        } else {
            self.log_message(format!("Unknown voice: {}", voice), LogKind::System);
        }
    }

    fn select_language(&mut self, code: String) {
        if settings::find_language(&code).is_some() {
            self.form.language = code;
        } else {
            self.log_message(format!("Unknown language: {}", code), LogKind::System);
        }
    }

    pub fn on_fps_input(&mut self, value: u32) {
        let value = clamp_fps(value);
        self.form.fps = value;
        self.panel.fps_label = settings::fps_label(value);
        self.persist(keys::VIDEO_FPS, value);
        for capture in self.captures_mut() {
            capture.set_fps(value);
        }
    }

    pub fn on_resize_width_input(&mut self, value: u32) {
        let value = clamp_resize_width(value);
        self.form.resize_width = value;
        self.panel.resize_width_label = settings::resize_width_label(value);
        self.persist(keys::VIDEO_RESIZE_WIDTH, value);
        for capture in self.captures_mut() {
            capture.set_resize_width(value);
        }
    }

    pub fn on_quality_input(&mut self, value: f32) {
        let Some(value) = clamp_quality(value) else {
            return;
        };
        self.form.quality = value;
        self.panel.quality_label = settings::quality_label(value);
        self.persist(keys::VIDEO_QUALITY, value);
        for capture in self.captures_mut() {
            capture.set_quality(value);
        }
    }

    pub fn on_sample_rate_input(&mut self, value: u32) {
        let value = clamp_sample_rate(value);
        self.form.sample_rate = value;
        self.panel.sample_rate_label = settings::sample_rate_label(value);
        self.runtime.output_sample_rate = value;
        self.persist(keys::SAMPLE_RATE, value);
        if let Some(player) = self.audio_player.as_mut() {
            player.set_sample_rate(value);
        }
    }

    pub fn toggle_config_panel(&mut self) {
        self.panel.config_open = !self.panel.config_open;
    }

    pub fn build_configuration(&self) -> Configuration {
        Configuration {
            fps: self.form.fps,
            resize_width: self.form.resize_width,
            quality: self.form.quality,
            sample_rate: self.form.sample_rate,
            voice: self.form.voice.clone(),
            response_type: self.form.response_type,
            system_instruction: self.form.system_instruction.clone(),
            language: self.form.language.clone(),
        }
    }

    /// Persists every setting and, when connected, reconnects so the new
    /// session setup takes effect.
    pub async fn apply_config(&mut self) {
        let config = self.build_configuration();

        self.persist(keys::VIDEO_FPS, config.fps);
        self.persist(keys::VIDEO_RESIZE_WIDTH, config.resize_width);
        self.persist(keys::VIDEO_QUALITY, config.quality);
        self.persist(keys::SAMPLE_RATE, config.sample_rate);
        self.persist(keys::VOICE, config.voice.clone());
        self.persist(keys::SYSTEM_INSTRUCTION, config.system_instruction.clone());
        self.persist(keys::LANGUAGE, config.language.clone());

        self.runtime.output_sample_rate = config.sample_rate;
        self.runtime.system_instruction = config.system_instruction.clone();

        let original_label = self.panel.apply_label;
        self.panel.apply_label = panel::APPLYING_LABEL;
        self.panel.apply_enabled = false;
        self.render();

        if let Err(e) = self.reapply(&config).await {
            error!(error = ?e, "Error applying settings");
            self.log_message(format!("Error applying settings: {:#}", e), LogKind::System);
        }

        self.panel.apply_label = original_label;
        self.panel.apply_enabled = true;
        self.panel.config_open = false;
    }

    async fn reapply(&mut self, config: &Configuration) -> Result<()> {
        if self.is_connected {
            self.log_message("Disconnecting to apply new settings...", LogKind::System);
            self.session.disconnect().await?;
            self.is_connected = false;
            self.set_connect_button(false);
            self.render();

            tokio::time::sleep(self.options.reconnect_delay).await;

            self.log_message("Reconnecting with new settings...", LogKind::System);
            self.connect_to_websocket().await;
        }

        self.update_collaborators(config);
        self.log_message("Settings applied successfully", LogKind::System);
        Ok(())
    }

    /// Restores the documented defaults and forgets the saved values. The
    /// API key and language are kept, and the instruction falls back to the
    /// one the session currently runs with.
    pub fn reset_to_defaults(&mut self) {
        let defaults = Configuration {
            sample_rate: settings::RESET_SAMPLE_RATE,
            system_instruction: self.runtime.system_instruction.clone(),
            ..Configuration::default()
        };

        self.form.fps = defaults.fps;
        self.form.resize_width = defaults.resize_width;
        self.form.quality = defaults.quality;
        self.form.sample_rate = defaults.sample_rate;
        self.form.voice = defaults.voice.clone();
        self.form.response_type = defaults.response_type;
        self.form.system_instruction = defaults.system_instruction.clone();
        self.relabel_sliders();

        for key in keys::RESET {
            if let Err(e) = self.prefs.remove(key) {
                warn!(key, error = %e, "Failed to clear preference");
            }
        }

        self.runtime.output_sample_rate = defaults.sample_rate;
        self.update_collaborators(&defaults);

        self.log_message("Settings reset to default values", LogKind::System);
    }

    fn update_collaborators(&mut self, config: &Configuration) {
        if let Some(player) = self.audio_player.as_mut() {
            player.set_sample_rate(config.sample_rate);
        }
        for capture in self.captures_mut() {
            capture.set_fps(config.fps);
            capture.set_resize_width(config.resize_width);
            capture.set_quality(config.quality);
        }
    }

    fn captures_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn FrameCapture>> {
        self.video.iter_mut().chain(self.screen.iter_mut())
    }

    // --- Remote events ---

    pub async fn handle_live_event(&mut self, event: LiveEvent) {
        match event {
            LiveEvent::Open => self.log_message("WebSocket connection opened", LogKind::System),
            LiveEvent::Log { kind, message } => {
                self.log_message(format!("{}: {}", kind, message), LogKind::System)
            }
            LiveEvent::Close { code, reason } => {
                debug!(code, %reason, "Live connection closed");
                self.log_message(
                    format!("WebSocket connection closed (code {})", code),
                    LogKind::System,
                );
            }
            LiveEvent::Audio(data) => {
                if let Err(e) = self.play_audio(&data).await {
                    self.log_message(format!("Error processing audio: {:#}", e), LogKind::System);
                }
            }
            LiveEvent::Content(content) => {
                let Some(turn) = content.model_turn else {
                    return;
                };
                if turn.has_function_call() {
                    self.is_using_tool = true;
                    info!("Model is using a tool");
                } else if turn.has_function_response() {
                    self.is_using_tool = false;
                    info!("Tool usage completed");
                }
                let text = turn.text();
                if !text.is_empty() {
                    self.log_message(text, LogKind::Ai);
                }
            }
            LiveEvent::Interrupted => {
                if let Some(player) = self.audio_player.as_mut() {
                    player.stop();
                }
                self.is_using_tool = false;
                info!("Model interrupted");
                self.log_message("Model interrupted", LogKind::System);
            }
            LiveEvent::SetupComplete => self.log_message("Setup complete", LogKind::System),
            LiveEvent::TurnComplete => {
                self.is_using_tool = false;
                self.log_message("Turn complete", LogKind::System);
            }
            LiveEvent::Error(message) => {
                error!(%message, "Live session error");
                self.log_message(format!("Error: {}", message), LogKind::System);
            }
            LiveEvent::ServerError(message) => {
                error!(%message, "Server error");
                self.log_message(format!("Server error: {}", message), LogKind::System);
            }
        }
        self.render();
    }

    // --- Media input ---

    pub async fn handle_media_input(&mut self, input: MediaInput) {
        match input {
            MediaInput::MicChunk { data, level } => {
                if !self.is_recording {
                    return;
                }
                let chunk = MediaChunk::new(settings::MIC_MIME_TYPE, data);
                let chunk = if self.is_using_tool {
                    // Tagged while a tool call is in flight.
                    chunk.interrupting()
                } else {
                    chunk
                };
                if let Err(e) = self.session.send_realtime_input(vec![chunk]).await {
                    debug!(error = %e, "Dropped microphone chunk");
                }
                self.panel.input_level = level;
            }
            MediaInput::Frame { source, data } => {
                let active = match source {
                    CaptureSource::Camera => self.is_video_active,
                    CaptureSource::Screen => self.is_screen_sharing,
                };
                if !active || !self.is_connected {
                    return;
                }
                let chunk = MediaChunk::new(settings::FRAME_MIME_TYPE, data);
                if let Err(e) = self.session.send_realtime_input(vec![chunk]).await {
                    debug!(error = %e, ?source, "Dropped frame");
                }
            }
            MediaInput::OutputLevel(level) => self.panel.output_level = level,
            MediaInput::Error { device, message } => {
                warn!(?device, %message, "Media device failed");
                self.log_message(format!("Error: {}", message), LogKind::System);
                match device {
                    MediaDevice::Microphone if self.is_recording => self.stop_microphone(),
                    MediaDevice::Camera if self.is_video_active => self.stop_video(),
                    MediaDevice::Screen if self.is_screen_sharing => self.stop_screen_sharing(),
                    _ => {}
                }
            }
        }
        self.render();
    }

    // --- Helpers ---

    fn restore_preferences(&mut self) {
        if let Some(key) = self.prefs.get(keys::API_KEY).filter(|k| !k.is_empty()) {
            self.form.api_key = key;
        }
        if let Some(voice) = self.prefs.get(keys::VOICE).filter(|v| !v.is_empty()) {
            if settings::is_known_voice(&voice) {
                self.form.voice = voice;
            } else {
                warn!(%voice, "Ignoring unknown saved voice");
            }
        }
        if let Some(code) = self.prefs.get(keys::LANGUAGE).filter(|c| !c.is_empty()) {
            if settings::find_language(&code).is_some() {
                self.form.language = code;
            } else {
                warn!(%code, "Ignoring unknown saved language");
            }
        }
        if let Some(fps) = self.saved::<u32>(keys::VIDEO_FPS) {
            self.form.fps = clamp_fps(fps);
        }
        if let Some(width) = self.saved::<u32>(keys::VIDEO_RESIZE_WIDTH) {
            self.form.resize_width = clamp_resize_width(width);
        }
        if let Some(quality) = self.saved::<f32>(keys::VIDEO_QUALITY) {
            match clamp_quality(quality) {
                Some(quality) => self.form.quality = quality,
                None => warn!(%quality, "Ignoring non-finite saved quality"),
            }
        }
        if let Some(text) = self.prefs.get(keys::SYSTEM_INSTRUCTION).filter(|t| !t.is_empty()) {
            self.form.system_instruction = text.clone();
            self.runtime.system_instruction = text;
        }
        if let Some(rate) = self.saved::<u32>(keys::SAMPLE_RATE) {
            let rate = clamp_sample_rate(rate);
            self.form.sample_rate = rate;
            self.runtime.output_sample_rate = rate;
        }
    }

    fn saved<T: FromStr>(&self, key: &str) -> Option<T> {
        let raw = self.prefs.get(key).filter(|v| !v.is_empty())?;
        match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(key, value = %raw, "Ignoring unparseable saved preference");
                None
            }
        }
    }

    fn persist(&mut self, key: &str, value: impl ToString) {
        if let Err(e) = self.prefs.set(key, &value.to_string()) {
            warn!(key, error = %e, "Failed to persist preference");
        }
    }

    fn relabel_sliders(&mut self) {
        self.panel.fps_label = settings::fps_label(self.form.fps);
        self.panel.resize_width_label = settings::resize_width_label(self.form.resize_width);
        self.panel.quality_label = settings::quality_label(self.form.quality);
        self.panel.sample_rate_label = settings::sample_rate_label(self.form.sample_rate);
    }

    fn set_connect_button(&mut self, connected: bool) {
        self.panel.connected = connected;
        self.panel.connect_label = if connected {
            panel::DISCONNECT_LABEL
        } else {
            panel::CONNECT_LABEL
        };
    }

    fn update_mic_icon(&mut self) {
        self.panel.mic_icon = if self.is_recording {
            panel::MIC_ICON_ACTIVE
        } else {
            panel::MIC_ICON_IDLE
        };
    }

    fn log_message(&mut self, message: impl Into<String>, kind: LogKind) {
        let entry = LogEntry::new(kind, message);
        self.view.append_log(&entry);
        self.log.push(entry);
    }

    fn render(&mut self) {
        self.view.render(&self.panel);
    }
}

fn clamp_fps(value: u32) -> u32 {
    value.clamp(*settings::FPS_RANGE.start(), *settings::FPS_RANGE.end())
}

fn clamp_resize_width(value: u32) -> u32 {
    value.clamp(
        *settings::RESIZE_WIDTH_RANGE.start(),
        *settings::RESIZE_WIDTH_RANGE.end(),
    )
}

/// `None` for NaN and infinities.
fn clamp_quality(value: f32) -> Option<f32> {
    value
        .is_finite()
        .then(|| value.clamp(*settings::QUALITY_RANGE.start(), *settings::QUALITY_RANGE.end()))
}

fn clamp_sample_rate(value: u32) -> u32 {
    value.clamp(
        *settings::SAMPLE_RATE_RANGE.start(),
        *settings::SAMPLE_RATE_RANGE.end(),
    )
}
