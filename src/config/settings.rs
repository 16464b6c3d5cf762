//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// GenAiConfig
// ---------------------------------------------------------------------------

/// Environment variables consulted (in order) when no API key is configured.
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Settings for the generative text / image API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenAiConfig {
    /// Base URL of the REST endpoint, without a trailing slash.
    pub api_base: String,
    /// API credential. `None` means "read from the environment at startup".
    pub api_key: Option<String>,
    /// Model used for advisory, market-price and soil-analysis requests.
    pub text_model: String,
    /// Model used for the illustrative advisory image.
    pub image_model: String,
    /// Aspect ratio requested from the image model.
    pub image_aspect_ratio: String,
    /// Optional per-request timeout. `None` leaves the bound to the upstream.
    pub timeout_secs: Option<u64>,
}

impl Default for GenAiConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta".into(),
            api_key: None,
            text_model: "gemini-2.5-flash".into(),
            image_model: "imagen-4.0-generate-001".into(),
            image_aspect_ratio: "16:9".into(),
            timeout_secs: None,
        }
    }
}

impl GenAiConfig {
    /// Fill a missing `api_key` from [`API_KEY_ENV_VARS`] using `lookup`.
    ///
    /// A configured non-empty key always wins over the environment.
    pub fn resolve_api_key(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let configured = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty());
        if configured.is_some() {
            return;
        }
        self.api_key = API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty());
    }
}

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Settings for voice input (microphone → Whisper).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Whisper model id from the registry (e.g. `"whisper-small"`).
    pub stt_model: String,
    /// RMS threshold above which a 30 ms frame counts as speech.
    pub vad_threshold: f32,
    /// Trailing silence that ends an utterance, in milliseconds.
    pub end_silence_ms: u64,
    /// Hard cap on a single listening session, in seconds.
    pub max_listen_secs: f32,
    /// Attempt GPU-accelerated inference when available.
    pub use_gpu: bool,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            stt_model: "whisper-small".into(),
            vad_threshold: 0.01,
            end_silence_ms: 1_200,
            max_listen_secs: 30.0,
            use_gpu: false,
        }
    }
}

// ---------------------------------------------------------------------------
// TtsConfig
// ---------------------------------------------------------------------------

/// Settings for reading advice aloud.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Speech synthesis program. Empty disables read-aloud.
    pub command: String,
    /// Speaking rate in words per minute.
    pub rate_wpm: u32,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            command: "espeak-ng".into(),
            rate_wpm: 160,
        }
    }
}

// ---------------------------------------------------------------------------
// CameraConfig
// ---------------------------------------------------------------------------

/// Settings for the soil camera.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Capture program producing an MJPEG stream on stdout.
    pub command: String,
    /// Capture backend passed as `-f` (`v4l2`, `avfoundation`, `dshow`).
    pub input_format: String,
    /// Device passed as `-i`.
    pub device: String,
    /// JPEG quality scale (2 = best, 31 = worst).
    pub jpeg_quality: u8,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let (input_format, device) = if cfg!(target_os = "macos") {
            ("avfoundation", "0")
        } else if cfg!(target_os = "windows") {
            ("dshow", "video=Integrated Camera")
        } else {
            ("v4l2", "/dev/video0")
        };
        Self {
            command: "ffmpeg".into(),
            input_format: input_format.into(),
            device: device.into(),
            jpeg_quality: 4,
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// egui window appearance and behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Selected locale code (see [`crate::language::LANGUAGES`]).
    pub language: String,
    /// Read a freshly generated advisory aloud automatically.
    pub auto_speak: bool,
    /// Last saved window size `(w, h)` in points.
    pub window_size: (f32, f32),
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            language: "en-US".into(),
            auto_speak: true,
            window_size: (900.0, 820.0),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use kisan_mitra::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Generative API settings.
    pub genai: GenAiConfig,
    /// Voice input settings.
    pub speech: SpeechConfig,
    /// Read-aloud settings.
    pub tts: TtsConfig,
    /// Soil camera settings.
    pub camera: CameraConfig,
    /// UI / window settings.
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario).
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.genai.api_base, loaded.genai.api_base);
        assert_eq!(original.genai.api_key, loaded.genai.api_key);
        assert_eq!(original.genai.text_model, loaded.genai.text_model);
        assert_eq!(original.genai.image_model, loaded.genai.image_model);
        assert_eq!(original.genai.timeout_secs, loaded.genai.timeout_secs);

        assert_eq!(original.speech.stt_model, loaded.speech.stt_model);
        assert_eq!(original.speech.end_silence_ms, loaded.speech.end_silence_ms);

        assert_eq!(original.tts.command, loaded.tts.command);
        assert_eq!(original.camera.device, loaded.camera.device);
        assert_eq!(original.ui.language, loaded.ui.language);
        assert_eq!(original.ui.auto_speak, loaded.ui.auto_speak);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.genai.text_model, "gemini-2.5-flash");
        assert_eq!(config.ui.language, "en-US");
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(
            cfg.genai.api_base,
            "https://generativelanguage.googleapis.com/v1beta"
        );
        assert_eq!(cfg.genai.image_model, "imagen-4.0-generate-001");
        assert_eq!(cfg.genai.image_aspect_ratio, "16:9");
        assert!(cfg.genai.api_key.is_none());
        assert!(cfg.genai.timeout_secs.is_none());
        assert_eq!(cfg.tts.command, "espeak-ng");
        assert_eq!(cfg.camera.command, "ffmpeg");
        assert!(cfg.ui.auto_speak);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[ui]\nlanguage = \"hi-IN\"\n").unwrap();

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.ui.language, "hi-IN");
        assert!(cfg.ui.auto_speak);
        assert_eq!(cfg.genai.text_model, "gemini-2.5-flash");
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.genai.api_key = Some("k-test".into());
        cfg.genai.timeout_secs = Some(45);
        cfg.ui.language = "mr-IN".into();
        cfg.ui.window_size = (1024.0, 768.0);
        cfg.tts.rate_wpm = 140;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.genai.api_key.as_deref(), Some("k-test"));
        assert_eq!(loaded.genai.timeout_secs, Some(45));
        assert_eq!(loaded.ui.language, "mr-IN");
        assert_eq!(loaded.ui.window_size, (1024.0, 768.0));
        assert_eq!(loaded.tts.rate_wpm, 140);
    }

    #[test]
    fn configured_key_wins_over_environment() {
        let mut genai = GenAiConfig {
            api_key: Some("from-file".into()),
            ..GenAiConfig::default()
        };
        genai.resolve_api_key(|_| Some("from-env".into()));
        assert_eq!(genai.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn missing_key_is_read_from_environment_in_order() {
        let mut genai = GenAiConfig::default();
        genai.resolve_api_key(|name| match name {
            "GEMINI_API_KEY" => Some("  ".into()),
            "API_KEY" => Some("fallback-key".into()),
            _ => None,
        });
        assert_eq!(genai.api_key.as_deref(), Some("fallback-key"));
    }

    #[test]
    fn blank_configured_key_is_replaced() {
        let mut genai = GenAiConfig {
            api_key: Some("".into()),
            ..GenAiConfig::default()
        };
        genai.resolve_api_key(|name| (name == "GEMINI_API_KEY").then(|| "g".to_string()));
        assert_eq!(genai.api_key.as_deref(), Some("g"));
    }

    #[test]
    fn no_key_anywhere_stays_none() {
        let mut genai = GenAiConfig::default();
        genai.resolve_api_key(|_| None);
        assert!(genai.api_key.is_none());
    }
}
