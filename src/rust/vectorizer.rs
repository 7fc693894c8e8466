//! Bag-of-words feature encoding.
//!
//! The vectorizer artifact is a JSON document loaded once at startup:
//!
//! ```json
//! {
//!   "vocabulary": { "love": 0, "hate": 1, "this": 2 },
//!   "idf": [1.4, 1.4, 1.0],
//!   "norm": "l2",
//!   "binary": false,
//!   "ngram_range": [1, 1]
//! }
//! ```
//!
//! `idf`, `norm`, `binary` and `ngram_range` are optional. Tokens are maximal
//! runs of alphanumeric or `_` characters at least two characters long.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use log::info;
use ndarray::Array1;
use serde::Deserialize;

use crate::classifier::utils::l2_normalize;
use crate::error::{PipelineError, ServeError};
use crate::normalizer::NormalizedText;

/// Fixed-width numeric encoding of a [`NormalizedText`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Array1<f32>);

impl FeatureVector {
    pub fn new(values: Array1<f32>) -> Self {
        Self(values)
    }

    pub fn zeros(len: usize) -> Self {
        Self(Array1::zeros(len))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &Array1<f32> {
        &self.0
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        Self(Array1::from(values))
    }
}

/// Encodes normalized text into feature vectors of a fixed dimensionality.
pub trait FeatureEncoder: Send + Sync + fmt::Debug {
    /// Width of every vector produced by [`encode`](Self::encode).
    fn dimension(&self) -> usize;

    fn encode(&self, text: &NormalizedText) -> Result<FeatureVector, PipelineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L2,
}

#[derive(Debug, Deserialize)]
struct VectorizerArtifact {
    vocabulary: HashMap<String, usize>,
    #[serde(default)]
    idf: Option<Vec<f32>>,
    #[serde(default)]
    norm: Option<Norm>,
    #[serde(default)]
    binary: bool,
    #[serde(default = "default_ngram_range")]
    ngram_range: (usize, usize),
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

/// The loaded, immutable vectorizer artifact.
#[derive(Debug, Clone)]
pub struct VectorizerHandle {
    vocabulary: HashMap<String, usize>,
    idf: Option<Array1<f32>>,
    norm: Option<Norm>,
    binary: bool,
    ngram_range: (usize, usize),
}

impl VectorizerHandle {
    /// Loads the vectorizer artifact from `path`.
    ///
    /// Any I/O or decode failure is fatal for startup.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ServeError> {
        let path = path.as_ref();
        info!("Loading vectorizer from {:?}", path);
        let raw = fs::read_to_string(path)?;
        let vectorizer = Self::from_json_str(&raw)?;
        info!(
            "Vectorizer loaded: {} features, ngram range {:?}, tf-idf: {}",
            vectorizer.dimension(),
            vectorizer.ngram_range,
            vectorizer.idf.is_some()
        );
        Ok(vectorizer)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ServeError> {
        let artifact: VectorizerArtifact = serde_json::from_str(raw)?;
        Self::from_artifact(artifact)
    }

    fn from_artifact(artifact: VectorizerArtifact) -> Result<Self, ServeError> {
        let dim = artifact.vocabulary.len();
        let mut seen = vec![false; dim];
        for (term, &idx) in &artifact.vocabulary {
            if idx >= dim || seen[idx] {
                return Err(ServeError::InvalidArtifact(format!(
                    "vocabulary index {} for term '{}' is out of range or duplicated",
                    idx, term
                )));
            }
            seen[idx] = true;
        }

        let idf = match artifact.idf {
            Some(weights) => {
                if weights.len() != dim {
                    return Err(ServeError::InvalidArtifact(format!(
                        "idf has {} weights for a vocabulary of {}",
                        weights.len(),
                        dim
                    )));
                }
                if weights.iter().any(|w| !w.is_finite()) {
                    return Err(ServeError::InvalidArtifact("idf contains non-finite weights".into()));
                }
                Some(Array1::from(weights))
            }
            None => None,
        };

        let (min_n, max_n) = artifact.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(ServeError::InvalidArtifact(format!(
                "invalid ngram range ({}, {})",
                min_n, max_n
            )));
        }

        Ok(Self {
            vocabulary: artifact.vocabulary,
            idf,
            norm: artifact.norm,
            binary: artifact.binary,
            ngram_range: artifact.ngram_range,
        })
    }

    fn tokens<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|token| token.chars().count() >= 2)
            .collect()
    }

    fn terms(&self, text: &str) -> Vec<String> {
        let tokens = self.tokens(text);
        let (min_n, max_n) = self.ngram_range;
        let mut terms = Vec::new();
        for n in min_n..=max_n {
            if n > tokens.len() {
                break;
            }
            terms.extend(tokens.windows(n).map(|window| window.join(" ")));
        }
        terms
    }
}

impl FeatureEncoder for VectorizerHandle {
    fn dimension(&self) -> usize {
        self.vocabulary.len()
    }

    fn encode(&self, text: &NormalizedText) -> Result<FeatureVector, PipelineError> {
        let mut row = Array1::<f32>::zeros(self.dimension());
        for term in self.terms(text.as_str()) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                if self.binary {
                    row[idx] = 1.0;
                } else {
                    row[idx] += 1.0;
                }
            }
        }

        if let Some(idf) = &self.idf {
            row *= idf;
        }
        if self.norm == Some(Norm::L2) {
            l2_normalize(&mut row);
        }

        if row.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::Encoding(
                "vectorizer produced non-finite feature weights".into(),
            ));
        }
        Ok(FeatureVector(row))
    }
}
