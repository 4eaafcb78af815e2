//! Language code validation and translation between engine dialects.
//!
//! Tesseract names languages with ISO 639-2/3 codes (`eng`, `chi_sim`),
//! EasyOCR mostly with ISO 639-1 (`en`, `ch_sim`) and PaddleOCR with its own
//! model names (`en`, `german`, `japan`). Hints may be given in any of these;
//! [`resolve_languages`] maps each hint to the engine's dialect and drops the
//! ones the engine cannot load.

use crate::core::config::OcrEngine;
use crate::plugins::OcrBackend;
use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashMap, HashSet};

pub static TESSERACT_SUPPORTED_LANGUAGE_CODES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "afr", "amh", "ara", "asm", "aze", "aze_cyrl", "bel", "ben", "bod", "bos", "bre", "bul",
        "cat", "ceb", "ces", "chi_sim", "chi_tra", "chr", "cos", "cym", "dan", "deu", "div", "dzo",
        "ell", "eng", "enm", "epo", "equ", "est", "eus", "fao", "fas", "fil", "fin", "fra",
        "frk", "frm", "fry", "gla", "gle", "glg", "grc", "guj", "hat", "heb", "hin", "hrv",
        "hun", "hye", "iku", "ind", "isl", "ita", "ita_old", "jav", "jpn", "kan", "kat", "kat_old",
        "kaz", "khm", "kir", "kmr", "kor", "lao", "lat", "lav", "lit", "ltz", "mal", "mar",
        "mkd", "mlt", "mon", "mri", "msa", "mya", "nep", "nld", "nor", "oci", "ori", "osd",
        "pan", "pol", "por", "pus", "que", "ron", "rus", "san", "sin", "slk", "slv", "snd",
        "spa", "spa_old", "sqi", "srp", "srp_latn", "sun", "swa", "swe", "syr", "tam", "tat", "tel",
        "tgk", "tha", "tir", "ton", "tur", "uig", "ukr", "urd", "uzb", "uzb_cyrl", "vie", "yid",
        "yor",
    ]
    .into_iter()
    .collect()
});

pub static EASYOCR_SUPPORTED_LANGUAGE_CODES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "abq", "ady", "af", "ang", "ar", "as", "ava", "az", "be", "bg", "bh", "bho",
        "bn", "bs", "ch_sim", "ch_tra", "che", "cs", "cy", "da", "dar", "de", "en", "es",
        "et", "fa", "fr", "ga", "gom", "hi", "hr", "hu", "id", "inh", "is", "it",
        "ja", "kbd", "kn", "ko", "ku", "la", "lbe", "lez", "lt", "lv", "mah", "mai",
        "mi", "mn", "mr", "ms", "mt", "ne", "new", "nl", "no", "oc", "pi", "pl",
        "pt", "ro", "ru", "rs_cyrillic", "rs_latin", "sck", "sk", "sl", "sq", "sv", "sw", "ta",
        "tab", "te", "th", "tjk", "tl", "tr", "ug", "uk", "ur", "uz", "vi",
    ]
    .into_iter()
    .collect()
});

pub static PADDLEOCR_SUPPORTED_LANGUAGE_CODES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "ch", "en", "french", "german", "korean", "japan", "chinese_cht", "ta", "te", "ka", "latin", "arabic",
        "cyrillic", "devanagari",
    ]
    .into_iter()
    .collect()
});

/// (ISO 639-2/3 as used by Tesseract, EasyOCR code)
const THREE_TO_EASYOCR: &[(&str, &str)] = &[
    ("afr", "af"),
    ("ara", "ar"),
    ("asm", "as"),
    ("aze", "az"),
    ("bel", "be"),
    ("ben", "bn"),
    ("bos", "bs"),
    ("bul", "bg"),
    ("ces", "cs"),
    ("chi_sim", "ch_sim"),
    ("chi_tra", "ch_tra"),
    ("cym", "cy"),
    ("dan", "da"),
    ("deu", "de"),
    ("eng", "en"),
    ("est", "et"),
    ("fas", "fa"),
    ("fil", "tl"),
    ("fra", "fr"),
    ("gle", "ga"),
    ("hin", "hi"),
    ("hrv", "hr"),
    ("hun", "hu"),
    ("ind", "id"),
    ("isl", "is"),
    ("ita", "it"),
    ("jpn", "ja"),
    ("kan", "kn"),
    ("kor", "ko"),
    ("lat", "la"),
    ("lav", "lv"),
    ("lit", "lt"),
    ("mar", "mr"),
    ("mlt", "mt"),
    ("mon", "mn"),
    ("mri", "mi"),
    ("msa", "ms"),
    ("nep", "ne"),
    ("nld", "nl"),
    ("nor", "no"),
    ("oci", "oc"),
    ("pol", "pl"),
    ("por", "pt"),
    ("ron", "ro"),
    ("rus", "ru"),
    ("slk", "sk"),
    ("slv", "sl"),
    ("spa", "es"),
    ("sqi", "sq"),
    ("swa", "sw"),
    ("swe", "sv"),
    ("tam", "ta"),
    ("tel", "te"),
    ("tgk", "tjk"),
    ("tha", "th"),
    ("tur", "tr"),
    ("uig", "ug"),
    ("ukr", "uk"),
    ("urd", "ur"),
    ("uzb", "uz"),
    ("vie", "vi"),
];

/// PaddleOCR model names keyed by Tesseract and ISO 639-1 codes.
const TO_PADDLEOCR: &[(&str, &str)] = &[
    ("eng", "en"),
    ("chi_sim", "ch"),
    ("ch_sim", "ch"),
    ("zh", "ch"),
    ("chi_tra", "chinese_cht"),
    ("ch_tra", "chinese_cht"),
    ("fra", "french"),
    ("fr", "french"),
    ("deu", "german"),
    ("de", "german"),
    ("kor", "korean"),
    ("ko", "korean"),
    ("jpn", "japan"),
    ("ja", "japan"),
    ("tam", "ta"),
    ("tel", "te"),
    ("kat", "ka"),
    ("ara", "arabic"),
    ("ar", "arabic"),
    ("rus", "cyrillic"),
    ("ru", "cyrillic"),
    ("hin", "devanagari"),
    ("hi", "devanagari"),
    ("lat", "latin"),
    ("la", "latin"),
];

static TO_EASYOCR: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| THREE_TO_EASYOCR.iter().copied().collect());
static TO_TESSERACT: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| THREE_TO_EASYOCR.iter().map(|(three, one)| (*one, *three)).collect());
static PADDLE_MAP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| TO_PADDLEOCR.iter().copied().collect());

/// Whether `code` is a language the engine ships.
pub fn is_supported(engine: OcrEngine, code: &str) -> bool {
    match engine {
        OcrEngine::Tesseract => TESSERACT_SUPPORTED_LANGUAGE_CODES.contains(code),
        OcrEngine::EasyOcr => EASYOCR_SUPPORTED_LANGUAGE_CODES.contains(code),
        OcrEngine::PaddleOcr => PADDLEOCR_SUPPORTED_LANGUAGE_CODES.contains(code),
        OcrEngine::None => false,
    }
}

/// Language used when no hint survives validation.
pub fn default_language(engine: OcrEngine) -> &'static str {
    match engine {
        OcrEngine::Tesseract => "eng",
        OcrEngine::EasyOcr | OcrEngine::PaddleOcr | OcrEngine::None => "en",
    }
}

/// Translate a hint into the engine's dialect without checking support.
pub fn translate(engine: OcrEngine, code: &str) -> String {
    let code = code.trim().to_ascii_lowercase();
    let mapped = match engine {
        OcrEngine::Tesseract => TO_TESSERACT.get(code.as_str()),
        OcrEngine::EasyOcr => TO_EASYOCR.get(code.as_str()),
        OcrEngine::PaddleOcr => PADDLE_MAP.get(code.as_str()),
        OcrEngine::None => None,
    };
    mapped.map(|m| m.to_string()).unwrap_or(code)
}

/// Outcome of mapping language hints onto one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSelection {
    pub languages: Vec<String>,
    /// Hints the backend cannot serve.
    pub rejected: Vec<String>,
}

/// Map hints onto `backend`, keeping hint order and dropping duplicates.
///
/// Backends that report no language list accept every hint verbatim.
/// When nothing survives, the engine's default language is used.
pub fn resolve_languages(backend: &dyn OcrBackend, hints: &BTreeSet<String>) -> LanguageSelection {
    let engine = backend.engine();
    let known = backend.supported_languages();
    let mut languages: Vec<String> = Vec::new();
    let mut rejected = Vec::new();

    for hint in hints {
        let translated = translate(engine, hint);
        let accepted = if known.is_empty() {
            true
        } else {
            backend.supports_language(&translated)
        };
        if !accepted {
            rejected.push(hint.clone());
        } else if !languages.contains(&translated) {
            languages.push(translated);
        }
    }

    if languages.is_empty() {
        languages.push(default_language(engine).to_string());
    }

    LanguageSelection { languages, rejected }
}
