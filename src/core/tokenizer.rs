//! Local token counting - offline alternative to the counting service
//!
//! Encodes text with tiktoken BPE tables (cl100k_base by default), or
//! estimates from character classes when no encoding is wanted.
//!
//! Model names accepted by `--model` with `--backend local`:
//! - cl100k / cl100k_base / gpt-4 / claude (cl100k_base)
//! - o200k / o200k_base / gpt-4o (o200k_base)
//! - heuristic / estimate (no BPE encoding)

use once_cell::sync::Lazy;
use std::fmt;
use std::str::FromStr;
use tiktoken_rs::{cl100k_base, o200k_base, CoreBPE};

/// Encodings available to the local backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenModel {
    /// cl100k_base encoding (GPT-4, GPT-3.5-turbo, Claude approximation)
    #[default]
    Cl100k,
    /// o200k_base encoding (GPT-4o native)
    O200k,
    /// Fast character-class estimate
    Heuristic,
}

impl TokenModel {
    fn bpe(&self) -> Option<&'static Result<CoreBPE, String>> {
        match self {
            TokenModel::Cl100k => Some(&*CL100K_BPE),
            TokenModel::O200k => Some(&*O200K_BPE),
            TokenModel::Heuristic => None,
        }
    }

    pub fn available_models() -> &'static [&'static str] {
        &["cl100k", "o200k", "heuristic"]
    }
}

impl fmt::Display for TokenModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenModel::Cl100k => "cl100k",
            TokenModel::O200k => "o200k",
            TokenModel::Heuristic => "heuristic",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for TokenModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cl100k" | "cl100k_base" | "gpt4" | "gpt-4" | "gpt-3.5-turbo" | "claude" => {
                Ok(TokenModel::Cl100k)
            }
            "o200k" | "o200k_base" | "gpt4o" | "gpt-4o" => Ok(TokenModel::O200k),
            "heuristic" | "estimate" => Ok(TokenModel::Heuristic),
            _ => Err(format!(
                "Unknown local model: {}. Available: {}",
                s,
                TokenModel::available_models().join(", ")
            )),
        }
    }
}

// Loaded once on first use
static CL100K_BPE: Lazy<Result<CoreBPE, String>> =
    Lazy::new(|| cl100k_base().map_err(|e| format!("Failed to load cl100k_base: {}", e)));

static O200K_BPE: Lazy<Result<CoreBPE, String>> =
    Lazy::new(|| o200k_base().map_err(|e| format!("Failed to load o200k_base: {}", e)));

/// Make sure the encoding for `model` can be loaded
pub fn check_encoding(model: TokenModel) -> Result<(), String> {
    match model.bpe() {
        Some(Err(e)) => Err(e.clone()),
        _ => Ok(()),
    }
}

/// Count tokens in text using the given model
pub fn count_tokens(text: &str, model: TokenModel) -> Result<usize, String> {
    if text.is_empty() {
        return Ok(0);
    }

    match model.bpe() {
        Some(Ok(bpe)) => Ok(bpe.encode_with_special_tokens(text).len()),
        Some(Err(e)) => Err(e.clone()),
        None => Ok(estimate_tokens_heuristic(text)),
    }
}

/// Estimate tokens from character classes
///
/// Roughly: ASCII words ~4 chars/token, code symbols ~2 chars/token,
/// CJK ~1.5 chars/token, other Unicode ~2 chars/token.
pub fn estimate_tokens_heuristic(text: &str) -> usize {
    let mut ascii_chars = 0usize;
    let mut cjk_chars = 0usize;
    let mut other_unicode = 0usize;
    let mut code_symbols = 0usize;

    for c in text.chars() {
        if c.is_ascii() {
            if c.is_ascii_punctuation() {
                code_symbols += 1;
            } else {
                ascii_chars += 1;
            }
        } else if is_cjk_char(c) {
            cjk_chars += 1;
        } else {
            other_unicode += 1;
        }
    }

    ascii_chars.div_ceil(4)
        + code_symbols.div_ceil(2)
        + (cjk_chars * 2).div_ceil(3)
        + other_unicode.div_ceil(2)
}

#[inline]
fn is_cjk_char(c: char) -> bool {
    let cp = c as u32;
    (0x4E00..=0x9FFF).contains(&cp)      // CJK Unified Ideographs
        || (0x3400..=0x4DBF).contains(&cp)  // CJK Extension A
        || (0x3000..=0x303F).contains(&cp)  // CJK Symbols and Punctuation
        || (0x3040..=0x309F).contains(&cp)  // Hiragana
        || (0x30A0..=0x30FF).contains(&cp)  // Katakana
        || (0xAC00..=0xD7AF).contains(&cp)  // Hangul Syllables
        || (0xFF00..=0xFFEF).contains(&cp) // Fullwidth Forms
}
