//! Application entry point — Kisan Mitra.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run) and resolve
//!    the API key from the environment when the file has none.
//! 3. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the generative client and spawn the [`PipelineRunner`].
//! 5. Probe the microphone, Whisper model, TTS command and camera; each one
//!    that is missing only disables its own feature.
//! 6. Run [`eframe::run_native`] — blocks the main thread until the window
//!    is closed.

use std::sync::Arc;

use eframe::egui;
use tokio::sync::mpsc;

use kisan_mitra::{
    app::KisanMitraApp,
    audio::{AudioSource, CpalSource},
    camera::{CameraDevice, CameraMachine, FfmpegCamera},
    config::{AppConfig, AppPaths},
    genai::{GeminiClient, GenerativeClient},
    pipeline::{PipelineCommand, PipelineOutcome, PipelineRunner},
    speech::{CommandSynthesizer, SpeechInput, SpeechOutput, SpeechSynthesizer},
    stt::{ModelPaths, SttEngine, WhisperEngine},
};

// ---------------------------------------------------------------------------
// Device probing
// ---------------------------------------------------------------------------

fn microphone() -> Option<Arc<dyn AudioSource>> {
    if CpalSource::is_available() {
        Some(Arc::new(CpalSource))
    } else {
        log::warn!("No microphone found; voice input disabled");
        None
    }
}

fn whisper(config: &AppConfig) -> Option<Arc<dyn SttEngine>> {
    let models = ModelPaths::from_app_paths(&AppPaths::new());
    let Some(path) = models.resolve(&config.speech.stt_model) else {
        log::warn!(
            "Whisper model {:?} not found in {}; voice input disabled",
            config.speech.stt_model,
            models.models_dir.display()
        );
        return None;
    };

    match WhisperEngine::load(&path, config.speech.use_gpu) {
        Ok(engine) => {
            log::info!("Whisper model loaded: {}", path.display());
            Some(Arc::new(engine))
        }
        Err(e) => {
            log::warn!("Could not load Whisper model ({}): {e}", path.display());
            None
        }
    }
}

fn synthesizer(config: &AppConfig) -> Option<Arc<dyn SpeechSynthesizer>> {
    CommandSynthesizer::probe(&config.tts).map(|s| Arc::new(s) as Arc<dyn SpeechSynthesizer>)
}

fn camera(config: &AppConfig) -> Option<Arc<dyn CameraDevice>> {
    FfmpegCamera::probe(&config.camera).map(|c| Arc::new(c) as Arc<dyn CameraDevice>)
}

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let (width, height) = config.ui.window_size;
    let vp = egui::ViewportBuilder::default()
        .with_title("Kisan Mitra")
        .with_inner_size([width, height])
        .with_min_inner_size([480.0, 400.0]);

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> eframe::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Kisan Mitra starting up");

    // 2. Configuration. `config` is what gets saved back; the resolved key
    //    lives only in `genai`.
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    let mut genai = config.genai.clone();
    genai.resolve_api_key(|name| std::env::var(name).ok());
    if genai.api_key.is_none() {
        log::warn!("No API key configured; requests will fail until GEMINI_API_KEY is set");
    }

    // 3. Tokio runtime (2 worker threads)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    // 4. Generative client + pipeline runner
    let client: Arc<dyn GenerativeClient> = Arc::new(GeminiClient::from_config(&genai));
    let (command_tx, command_rx) = mpsc::channel::<PipelineCommand>(16);
    let (outcome_tx, outcome_rx) = mpsc::channel::<PipelineOutcome>(32);
    rt.spawn(PipelineRunner::new(client, &genai).run(command_rx, outcome_tx));

    // 5. Devices
    let (speech_input, speech_events) =
        SpeechInput::new(microphone(), whisper(&config), config.speech.clone());
    let speech_output = SpeechOutput::new(synthesizer(&config));
    let camera = CameraMachine::new(camera(&config));

    // 6. Build the egui app and run it (blocks until the window is closed)
    let options = native_options(&config);
    let app = KisanMitraApp::new(
        config,
        command_tx,
        outcome_rx,
        speech_input,
        speech_events,
        speech_output,
        camera,
    );

    eframe::run_native(
        "Kisan Mitra",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    )
}
