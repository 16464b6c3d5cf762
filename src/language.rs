//! Static list of supported advisory languages.
//!
//! The locale `code` drives speech recognition and synthesis; the display
//! `name` is what the generative model is asked to answer in.

/// A selectable advisory language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    /// BCP-47 locale identifier, e.g. `"hi-IN"`.
    pub code: &'static str,
    /// Display label in the language's own script.
    pub name: &'static str,
}

impl Language {
    /// Primary language subtag (`"hi-IN"` → `"hi"`), as Whisper and
    /// espeak-ng expect.
    pub fn primary_subtag(&self) -> &'static str {
        self.code.split('-').next().unwrap_or(self.code)
    }
}

/// Every language offered in the selector, global first then Indian.
pub const LANGUAGES: &[Language] = &[
    Language { code: "en-US", name: "English (US)" },
    Language { code: "hi-IN", name: "हिन्दी (भारत)" },
    Language { code: "bn-IN", name: "বাংলা (ভারত)" },
    Language { code: "te-IN", name: "తెలుగు (భారతదేశం)" },
    Language { code: "mr-IN", name: "मराठी (भारत)" },
    Language { code: "ta-IN", name: "தமிழ் (இந்தியா)" },
    Language { code: "ur-IN", name: "اردو (بھارت)" },
    Language { code: "gu-IN", name: "ગુજરાતી (ભારત)" },
    Language { code: "kn-IN", name: "ಕನ್ನಡ (ಭಾರತ)" },
    Language { code: "ml-IN", name: "മലയാളം (ഇന്ത്യ)" },
    Language { code: "pa-IN", name: "ਪੰਜਾਬੀ (ਭਾਰਤ)" },
    Language { code: "or-IN", name: "ଓଡିଆ (ଭାରତ)" },
    Language { code: "es-ES", name: "Español (España)" },
    Language { code: "fr-FR", name: "Français (France)" },
    Language { code: "zh-CN", name: "中文 (中国大陆)" },
    Language { code: "pt-BR", name: "Português (Brasil)" },
];

/// Language used when a configured code is unknown.
pub const DEFAULT_LANGUAGE: Language = LANGUAGES[0];

/// Look up a language by its locale code.
pub fn find_by_code(code: &str) -> Option<Language> {
    LANGUAGES.iter().copied().find(|l| l.code == code)
}

/// Name sent to the model for `code`; unknown codes answer in English.
pub fn display_name_for(code: &str) -> &'static str {
    find_by_code(code).map(|l| l.name).unwrap_or("English")
}
