use std::fmt;

use tokenizers::NormalizedString;

use crate::error::PipelineError;

const URL_PREFIXES: [&str; 3] = ["http://", "https://", "www."];

/// Lower-cased, cleaned text ready for vectorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Turns raw request text into [`NormalizedText`].
///
/// Implementations must be pure: the same input always yields the same output.
pub trait Normalizer: Send + Sync + fmt::Debug {
    fn normalize(&self, raw: &str) -> Result<NormalizedText, PipelineError>;
}

/// Unicode-aware cleaner used by the server unless another normalizer is injected.
///
/// Steps, in order:
/// 1. reject control characters other than whitespace
/// 2. drop URL tokens
/// 3. NFKC, lowercase, punctuation and symbols to spaces, digits removed
/// 4. collapse runs of whitespace
///
/// Input size is bounded at the HTTP boundary, not here: any text free of
/// control characters normalizes successfully.
#[derive(Debug, Clone, Default)]
pub struct TextNormalizer;

impl TextNormalizer {
    pub fn new() -> Self {
        Self
    }

    fn validate(&self, raw: &str) -> Result<(), PipelineError> {
        match raw.chars().find(|c| c.is_control() && !c.is_whitespace()) {
            Some(c) => Err(PipelineError::Normalization(format!(
                "input contains control character U+{:04X}",
                c as u32
            ))),
            None => Ok(()),
        }
    }
}

impl Normalizer for TextNormalizer {
    fn normalize(&self, raw: &str) -> Result<NormalizedText, PipelineError> {
        self.validate(raw)?;

        let without_urls = raw
            .split_whitespace()
            .filter(|token| {
                let lower = token.to_lowercase();
                !URL_PREFIXES.iter().any(|prefix| lower.starts_with(prefix))
            })
            .collect::<Vec<_>>()
            .join(" ");

        let mut normalized = NormalizedString::from(without_urls.as_str());
        normalized
            .nfkc()
            .lowercase()
            .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
            .filter(|c| !c.is_numeric());

        let collapsed = normalized.get().split_whitespace().collect::<Vec<_>>().join(" ");
        Ok(NormalizedText(collapsed))
    }
}
