//! Kisan Mitra window — egui/eframe application.
//!
//! # Architecture
//!
//! [`KisanMitraApp`] is the top-level [`eframe::App`]. It owns the
//! [`AppState`], the device adapters and two channel endpoints:
//!
//! * `command_tx` — sends [`PipelineCommand`]s to the pipeline runner.
//! * `outcome_rx` — receives [`PipelineOutcome`]s back.
//!
//! Every frame it drains the outcome and speech channels, polls the TTS
//! utterance and the camera stream, then renders three panels:
//!
//! | Panel | Input | Result |
//! |-------|-------|--------|
//! | Advisory | question + mic toggle | Markdown advice, image, speak/copy |
//! | Market prices | location | commodity table (₹ per quintal) |
//! | Soil analysis | camera open/capture/retake | soil report |

use std::time::Duration;

use eframe::egui;
use tokio::sync::mpsc;

use crate::advisory::AdvisoryError;
use crate::camera::{decode_preview, CameraMachine, CameraPhase, PreviewImage};
use crate::config::AppConfig;
use crate::language::{self, DEFAULT_LANGUAGE, LANGUAGES};
use crate::market::{MarketError, MARKET_EMPTY_MESSAGE};
use crate::pipeline::{AppState, FeatureState, PipelineCommand, PipelineOutcome};
use crate::soil::SoilError;
use crate::speech::{SpeechInput, SpeechInputEvent, SpeechOutput, SpeechOutputEvent};

const ACCENT: egui::Color32 = egui::Color32::from_rgb(68, 136, 255);
const SUCCESS: egui::Color32 = egui::Color32::from_rgb(80, 200, 120);
const WARNING: egui::Color32 = egui::Color32::from_rgb(255, 136, 68);
const DIM: egui::Color32 = egui::Color32::from_rgb(140, 140, 140);

/// The Kisan Mitra window.
pub struct KisanMitraApp {
    // ── State ────────────────────────────────────────────────────────────
    state: AppState,
    /// Persisted on exit. Holds only the key read from the settings file.
    config: AppConfig,

    // ── Devices ──────────────────────────────────────────────────────────
    speech_input: SpeechInput,
    speech_events: mpsc::UnboundedReceiver<SpeechInputEvent>,
    speech_output: SpeechOutput,
    camera: CameraMachine,
    camera_error: Option<String>,

    // ── Textures ─────────────────────────────────────────────────────────
    advisory_texture: Option<egui::TextureHandle>,
    preview_texture: Option<egui::TextureHandle>,
    last_preview: Option<Vec<u8>>,
    captured_texture: Option<egui::TextureHandle>,

    /// Spinner animation phase (increases each frame).
    spinner_phase: f32,

    // ── Channels ─────────────────────────────────────────────────────────
    command_tx: mpsc::Sender<PipelineCommand>,
    outcome_rx: mpsc::Receiver<PipelineOutcome>,
}

impl KisanMitraApp {
    pub fn new(
        config: AppConfig,
        command_tx: mpsc::Sender<PipelineCommand>,
        outcome_rx: mpsc::Receiver<PipelineOutcome>,
        speech_input: SpeechInput,
        speech_events: mpsc::UnboundedReceiver<SpeechInputEvent>,
        speech_output: SpeechOutput,
        camera: CameraMachine,
    ) -> Self {
        let language = language::find_by_code(&config.ui.language).unwrap_or(DEFAULT_LANGUAGE);
        Self {
            state: AppState::new(language),
            config,
            speech_input,
            speech_events,
            speech_output,
            camera,
            camera_error: None,
            advisory_texture: None,
            preview_texture: None,
            last_preview: None,
            captured_texture: None,
            spinner_phase: 0.0,
            command_tx,
            outcome_rx,
        }
    }

    // ── Channel polling ──────────────────────────────────────────────────

    /// Drain all finished requests (non-blocking).
    fn poll_outcomes(&mut self, ctx: &egui::Context) {
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            let is_advisory = matches!(outcome, PipelineOutcome::Advisory { .. });
            if self.state.apply(outcome) && is_advisory {
                self.on_advisory_settled(ctx);
            }
        }
    }

    fn on_advisory_settled(&mut self, ctx: &egui::Context) {
        let Some(advisory) = self.state.advisory.success() else {
            return;
        };

        self.advisory_texture = advisory.image.as_ref().and_then(|image| {
            let decoded = image
                .decode_bytes()
                .map_err(|e| e.to_string())
                .and_then(|bytes| decode_preview(&bytes).map_err(|e| e.to_string()));
            match decoded {
                Ok(preview) => Some(load_texture(ctx, "advisory-image", &preview)),
                Err(e) => {
                    log::warn!("advisory image could not be displayed: {e}");
                    None
                }
            }
        });

        if self.config.ui.auto_speak && self.speech_output.is_supported() {
            let text = advisory.text.clone();
            if let Err(e) = self
                .speech_output
                .speak(&text, self.state.language.primary_subtag())
            {
                self.state.advisory_error = Some(e.to_string());
            }
        }
    }

    /// Drain dictation events and check the active utterance.
    fn poll_speech(&mut self) {
        while let Ok(event) = self.speech_events.try_recv() {
            match event {
                SpeechInputEvent::Started => self.state.listening = true,
                SpeechInputEvent::Transcript(text) => {
                    self.state.accept_transcript(text);
                }
                SpeechInputEvent::Error(message) => self.state.advisory_error = Some(message),
                SpeechInputEvent::Ended => self.state.listening = false,
            }
        }

        for event in self.speech_output.poll() {
            if let SpeechOutputEvent::Error(_, message) = event {
                self.state.advisory_error = Some(message);
            }
        }
        self.state.speaking = self.speech_output.is_speaking();
    }

    /// Refresh the live preview and notice a camera that died.
    fn poll_camera(&mut self, ctx: &egui::Context) {
        if let Some(error) = self.camera.check_stream() {
            self.camera_error = Some(error.user_message());
            self.preview_texture = None;
            self.last_preview = None;
        }
        if self.camera.phase() != CameraPhase::Open {
            return;
        }

        let Some(frame) = self.camera.preview_frame() else {
            return;
        };
        if self.last_preview.as_ref() == Some(&frame) {
            return;
        }
        match decode_preview(&frame) {
            Ok(preview) => {
                self.preview_texture = Some(load_texture(ctx, "camera-preview", &preview));
            }
            Err(e) => log::debug!("camera: skipping undecodable frame: {e}"),
        }
        self.last_preview = Some(frame);
    }

    // ── Actions ──────────────────────────────────────────────────────────

    /// Send a command; if the runner is gone, fail the feature right away.
    fn dispatch(&mut self, command: PipelineCommand) {
        let ticket = command.ticket();
        if let Err(e) = self.command_tx.try_send(command) {
            log::error!("pipeline unavailable: {e}");
            let detail = "pipeline unavailable".to_string();
            let outcome = match e.into_inner() {
                PipelineCommand::Advisory { .. } => PipelineOutcome::Advisory {
                    ticket,
                    result: Err(AdvisoryError::Upstream { detail }),
                },
                PipelineCommand::Market { .. } => PipelineOutcome::Market {
                    ticket,
                    result: Err(MarketError::Upstream { detail }),
                },
                PipelineCommand::Soil { .. } => PipelineOutcome::Soil {
                    ticket,
                    result: Err(SoilError::Upstream { detail }),
                },
            };
            self.state.apply(outcome);
        }
    }

    fn submit_advisory(&mut self) {
        if let Some(command) = self.state.submit_advisory() {
            self.speech_input.stop();
            self.speech_output.cancel();
            self.state.speaking = false;
            self.advisory_texture = None;
            self.dispatch(command);
        }
    }

    fn submit_market(&mut self) {
        if let Some(command) = self.state.submit_market() {
            self.dispatch(command);
        }
    }

    fn analyze_soil(&mut self) {
        if self.state.soil.is_loading() {
            return;
        }
        let image = self.camera.take_for_analysis();
        if let Some(command) = self.state.submit_soil(image) {
            self.dispatch(command);
        }
    }

    fn toggle_mic(&mut self) {
        self.state.advisory_error = None;
        match self.speech_input.toggle(self.state.language.primary_subtag()) {
            Ok(started) => self.state.listening = started,
            Err(e) => self.state.advisory_error = Some(e.to_string()),
        }
    }

    fn toggle_speak(&mut self, text: &str) {
        match self
            .speech_output
            .toggle(text, self.state.language.primary_subtag())
        {
            Ok(_) => self.state.speaking = self.speech_output.is_speaking(),
            Err(e) => {
                self.state.speaking = false;
                self.state.advisory_error = Some(e.to_string());
            }
        }
    }

    fn open_camera(&mut self) {
        self.camera_error = None;
        self.captured_texture = None;
        self.last_preview = None;
        self.preview_texture = None;
        if let Err(e) = self.camera.open() {
            log::warn!("camera: {e}");
            self.camera_error = Some(e.user_message());
        }
    }

    fn capture_photo(&mut self, ctx: &egui::Context) {
        self.camera_error = None;
        match self.camera.capture() {
            Ok(()) => {
                self.preview_texture = None;
                self.last_preview = None;
                self.captured_texture = self
                    .camera
                    .captured()
                    .and_then(|image| image.decode_bytes().ok())
                    .and_then(|bytes| decode_preview(&bytes).ok())
                    .map(|preview| load_texture(ctx, "soil-capture", &preview));
            }
            Err(e) => self.camera_error = Some(e.user_message()),
        }
    }

    fn cancel_camera(&mut self) {
        self.camera.cancel();
        self.preview_texture = None;
        self.last_preview = None;
        self.captured_texture = None;
    }

    // ── Panels ───────────────────────────────────────────────────────────

    fn draw_header(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("Kisan Mitra").strong().size(18.0).color(SUCCESS));
            ui.label(egui::RichText::new("AI farming assistant").color(DIM).size(12.0));

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let before = self.state.language;
                egui::ComboBox::from_id_salt("language")
                    .selected_text(self.state.language.name)
                    .show_ui(ui, |ui| {
                        for lang in LANGUAGES {
                            ui.selectable_value(&mut self.state.language, *lang, lang.name);
                        }
                    });
                ui.label("Language:");
                if self.state.language != before {
                    log::info!("language → {}", self.state.language.code);
                    self.config.ui.language = self.state.language.code.to_string();
                }
            });
        });
    }

    fn draw_advisory(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        section_title(ui, "Ask the farming expert");

        ui.add(
            egui::TextEdit::multiline(&mut self.state.query)
                .hint_text("e.g. How do I control pests on organic tomatoes?")
                .desired_rows(3)
                .desired_width(f32::INFINITY),
        );

        ui.horizontal(|ui| {
            let loading = self.state.advisory.is_loading();
            let label = if loading { "Thinking..." } else { "Get Advice" };
            if ui.add_enabled(!loading, egui::Button::new(label)).clicked() {
                self.submit_advisory();
            }

            let mic = if self.state.listening { "Stop listening" } else { "Speak question" };
            if ui.add_enabled(!loading, egui::Button::new(mic)).clicked() {
                self.toggle_mic();
            }
            if self.state.listening {
                ui.label(
                    egui::RichText::new(format!("{} listening...", self.spinner_char()))
                        .color(WARNING),
                );
            }
        });

        if let Some(message) = self.state.advisory_error.clone() {
            ui.label(egui::RichText::new(message).color(WARNING).size(12.0));
        }

        ui.add_space(6.0);
        match &self.state.advisory {
            FeatureState::Idle => {}
            FeatureState::Loading { .. } => {
                ui.label(
                    egui::RichText::new(format!(
                        "{} Getting advice from the AI expert...",
                        self.spinner_char()
                    ))
                    .color(ACCENT),
                );
            }
            FeatureState::Error(message) => {
                ui.label(egui::RichText::new(message.as_str()).color(WARNING));
            }
            FeatureState::Success(advisory) => {
                let text = advisory.text.clone();
                if let Some(texture) = &self.advisory_texture {
                    ui.add(egui::Image::new(texture).max_width(ui.available_width().min(640.0)));
                    ui.add_space(4.0);
                }
                ui.label(egui::RichText::new(text.as_str()).size(14.0));

                ui.add_space(4.0);
                ui.horizontal(|ui| {
                    let speak = if self.state.speaking { "Stop reading" } else { "Read aloud" };
                    if ui.button(speak).clicked() {
                        self.toggle_speak(&text);
                    }
                    if ui.button("Copy").clicked() {
                        ctx.copy_text(text.clone());
                    }
                });
            }
        }
    }

    fn draw_market(&mut self, ui: &mut egui::Ui) {
        section_title(ui, "Mandi prices");

        let loading = self.state.market.is_loading();
        ui.horizontal(|ui| {
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.state.location)
                    .hint_text("City or district, e.g. Nashik, Maharashtra")
                    .desired_width(320.0),
            );
            let enter = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            let label = if loading { "Fetching..." } else { "Get Prices" };
            if ui.add_enabled(!loading, egui::Button::new(label)).clicked() || enter {
                self.submit_market();
            }
        });

        ui.add_space(6.0);
        match &self.state.market {
            FeatureState::Idle => {}
            FeatureState::Loading { .. } => {
                ui.label(
                    egui::RichText::new(format!("{} Fetching market prices...", self.spinner_char()))
                        .color(ACCENT),
                );
            }
            FeatureState::Error(message) => {
                ui.label(egui::RichText::new(message.as_str()).color(WARNING));
            }
            FeatureState::Success(prices) if prices.is_empty() => {
                ui.label(egui::RichText::new(MARKET_EMPTY_MESSAGE).color(DIM));
            }
            FeatureState::Success(prices) => {
                egui::Grid::new("market-prices")
                    .striped(true)
                    .num_columns(4)
                    .spacing([16.0, 4.0])
                    .show(ui, |ui| {
                        for heading in ["Commodity", "Variety", "Market", "Price (₹/quintal)"] {
                            ui.label(egui::RichText::new(heading).strong());
                        }
                        ui.end_row();

                        for price in prices {
                            ui.label(price.commodity.as_str());
                            ui.label(price.variety.as_str());
                            ui.label(price.market.as_str());
                            ui.label(egui::RichText::new(price.display_range()).color(SUCCESS));
                            ui.end_row();
                        }
                    });
            }
        }
    }

    fn draw_soil(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        section_title(ui, "Soil analysis");

        if let Some(message) = self.camera_error.clone() {
            ui.label(egui::RichText::new(message).color(WARNING).size(12.0));
        }

        match &self.state.soil {
            FeatureState::Loading { .. } => {
                if let Some(texture) = &self.captured_texture {
                    ui.add(egui::Image::new(texture).max_width(320.0));
                }
                ui.label(
                    egui::RichText::new(format!("{} Analyzing soil sample...", self.spinner_char()))
                        .color(ACCENT),
                );
                return;
            }
            FeatureState::Success(report) => {
                let report = report.clone();
                egui::Grid::new("soil-report")
                    .num_columns(2)
                    .spacing([16.0, 4.0])
                    .show(ui, |ui| {
                        for (label, value) in [
                            ("Soil type", &report.soil_type),
                            ("Texture", &report.texture),
                            ("Potential pH", &report.potential_ph),
                            ("Nutrient status", &report.nutrient_status),
                        ] {
                            ui.label(egui::RichText::new(label).strong());
                            ui.label(value.as_str());
                            ui.end_row();
                        }
                    });
                ui.add_space(4.0);
                ui.label(egui::RichText::new("Recommendations").strong());
                for item in report.recommendation_items() {
                    ui.label(format!("• {item}"));
                }
                ui.add_space(4.0);
                if ui.button("Analyze another sample").clicked() {
                    self.state.reset_soil();
                    self.open_camera();
                }
                return;
            }
            FeatureState::Error(message) => {
                ui.label(egui::RichText::new(message.as_str()).color(WARNING));
            }
            FeatureState::Idle => {}
        }

        match self.camera.phase() {
            CameraPhase::Closed => {
                ui.label(
                    egui::RichText::new("Photograph a handful of soil in daylight.").color(DIM),
                );
                let supported = self.camera.is_supported();
                if ui
                    .add_enabled(supported, egui::Button::new("Open camera"))
                    .clicked()
                {
                    self.open_camera();
                }
                if !supported {
                    ui.label(
                        egui::RichText::new("Camera not supported on this device.").color(DIM),
                    );
                }
            }
            CameraPhase::Open => {
                match &self.preview_texture {
                    Some(texture) => {
                        ui.add(egui::Image::new(texture).max_width(480.0));
                    }
                    None => {
                        ui.label(
                            egui::RichText::new(format!("{} Starting camera...", self.spinner_char()))
                                .color(ACCENT),
                        );
                    }
                }
                ui.horizontal(|ui| {
                    if ui.button("Capture").clicked() {
                        self.capture_photo(ctx);
                    }
                    if ui.button("Cancel").clicked() {
                        self.cancel_camera();
                    }
                });
            }
            CameraPhase::Captured => {
                if let Some(texture) = &self.captured_texture {
                    ui.add(egui::Image::new(texture).max_width(480.0));
                }
                ui.horizontal(|ui| {
                    if ui.button("Analyze").clicked() {
                        self.analyze_soil();
                    }
                    if ui.button("Retake").clicked() {
                        self.open_camera();
                    }
                    if ui.button("Cancel").clicked() {
                        self.cancel_camera();
                    }
                });
            }
        }
    }

    // ── Helpers ───────────────────────────────────────────────────────────

    /// A simple rotating ASCII spinner character driven by `spinner_phase`.
    fn spinner_char(&self) -> char {
        let chars = ['|', '/', '-', '\\'];
        let idx = (self.spinner_phase as usize) % chars.len();
        chars[idx]
    }

    fn is_animating(&self) -> bool {
        self.state.advisory.is_loading()
            || self.state.market.is_loading()
            || self.state.soil.is_loading()
            || self.state.listening
            || self.state.speaking
    }
}

fn section_title(ui: &mut egui::Ui, title: &str) {
    ui.label(egui::RichText::new(title).strong().size(15.0));
    ui.add_space(4.0);
}

fn load_texture(ctx: &egui::Context, name: &str, preview: &PreviewImage) -> egui::TextureHandle {
    let image = egui::ColorImage::from_rgba_unmultiplied(
        [preview.width as usize, preview.height as usize],
        &preview.rgba,
    );
    ctx.load_texture(name, image, egui::TextureOptions::LINEAR)
}

fn panel_frame() -> egui::Frame {
    egui::Frame::new()
        .fill(egui::Color32::from_rgb(36, 40, 36))
        .corner_radius(egui::CornerRadius::same(8))
        .inner_margin(egui::Margin::same(12))
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for KisanMitraApp {
    /// Called every frame by eframe. Polls channels and devices, then
    /// renders the three panels.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // --- Poll non-blocking channels ------------------------------------
        self.poll_outcomes(ctx);
        self.poll_speech();
        self.poll_camera(ctx);

        // --- Advance spinner animation -------------------------------------
        self.spinner_phase += 0.08;
        if self.spinner_phase >= 4.0 {
            self.spinner_phase = 0.0;
        }

        // --- Schedule repaints while something is in progress --------------
        if self.camera.phase() == CameraPhase::Open {
            // ~30 fps for the live preview
            ctx.request_repaint_after(Duration::from_millis(33));
        } else if self.is_animating() {
            ctx.request_repaint_after(Duration::from_millis(66));
        }

        if let Some(rect) = ctx.input(|i| i.viewport().inner_rect) {
            self.config.ui.window_size = (rect.width(), rect.height());
        }

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(4.0);
            self.draw_header(ui);
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                panel_frame().show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    self.draw_advisory(ui, ctx);
                });
                ui.add_space(10.0);
                panel_frame().show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    self.draw_market(ui);
                });
                ui.add_space(10.0);
                panel_frame().show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    self.draw_soil(ui, ctx);
                });
            });
        });
    }

    /// Persist language and window size; release speech and camera.
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.speech_input.stop();
        self.speech_output.cancel();
        self.camera.cancel();

        self.config.ui.language = self.state.language.code.to_string();
        if let Err(e) = self.config.save() {
            log::warn!("could not save settings: {e}");
        }
        log::info!("Kisan Mitra closing");
    }
}
