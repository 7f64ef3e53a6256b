/// Text similarity used to align sections and entities.
///
/// The default scorer is lexical: cosine similarity over term-frequency vectors of the
/// normalized body text, with title overlap (Jaccard) blended in at a lower weight. An
/// embedding-based scorer is available behind the `embeddings` feature. Any scorer only
/// has to produce a dense `[0, 1]` matrix; the matcher does not care where it came from.
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::error::ScoringError;
use crate::model::Section;

/// Case-fold and collapse runs of whitespace.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercased alphanumeric word tokens.
pub fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Precomputed view of a text so pairwise scoring does not re-tokenize.
#[derive(Debug, Clone)]
pub struct TextProfile {
    normalized: String,
    frequencies: HashMap<String, usize>,
    norm: f64,
}

impl TextProfile {
    pub fn new(text: &str) -> Self {
        let mut frequencies: HashMap<String, usize> = HashMap::new();
        for token in tokens(text) {
            *frequencies.entry(token).or_insert(0) += 1;
        }
        let norm = frequencies
            .values()
            .map(|&n| (n * n) as f64)
            .sum::<f64>()
            .sqrt();
        Self {
            normalized: normalize(text),
            frequencies,
            norm,
        }
    }

    /// Cosine similarity of the term-frequency vectors. Identical normalized text scores
    /// exactly 1.0.
    pub fn similarity(&self, other: &TextProfile) -> f64 {
        if self.normalized == other.normalized {
            return 1.0;
        }
        if self.frequencies.is_empty() && other.frequencies.is_empty() {
            return 1.0;
        }
        if self.norm == 0.0 || other.norm == 0.0 {
            return 0.0;
        }
        let (small, large) = if self.frequencies.len() <= other.frequencies.len() {
            (&self.frequencies, &other.frequencies)
        } else {
            (&other.frequencies, &self.frequencies)
        };
        let dot: f64 = small
            .iter()
            .filter_map(|(word, &a)| large.get(word).map(|&b| (a * b) as f64))
            .sum();
        (dot / (self.norm * other.norm)).clamp(0.0, 1.0)
    }
}

pub fn text_similarity(a: &str, b: &str) -> f64 {
    TextProfile::new(a).similarity(&TextProfile::new(b))
}

/// Jaccard overlap of title word sets. Two titles without words are identical.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a: HashSet<String> = tokens(a).collect();
    let b: HashSet<String> = tokens(b).collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(&b).count();
    let union = a.union(&b).count();
    intersection as f64 / union as f64
}

/// Blend body similarity with title similarity when both sections have a title.
pub fn blend(body: f64, titles: Option<(&str, &str)>, title_weight: f64) -> f64 {
    let score = match titles {
        Some((a, b)) => {
            let title = title_similarity(a, b);
            body + title_weight * (title - body)
        }
        None => body,
    };
    score.clamp(0.0, 1.0)
}

fn titles<'a>(a: &'a Section, b: &'a Section) -> Option<(&'a str, &'a str)> {
    match (a.title.as_deref(), b.title.as_deref()) {
        (Some(ta), Some(tb)) if !ta.trim().is_empty() && !tb.trim().is_empty() => Some((ta, tb)),
        _ => None,
    }
}

/// Dense row-major matrix of pair scores: rows are document A, columns document B.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl ScoreMatrix {
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut values = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                values.push(sanitize(f(i, j)));
            }
        }
        Self { rows, cols, values }
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, ScoringError> {
        let row_count = rows.len();
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != cols) {
            return Err(ScoringError::Shape {
                expected: (row_count, cols),
                got: (row_count, rows.iter().map(Vec::len).max().unwrap_or(0)),
            });
        }
        Ok(Self::from_fn(row_count, cols, |i, j| rows[i][j]))
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }

    pub fn ensure_dims(&self, rows: usize, cols: usize) -> Result<(), ScoringError> {
        if self.dims() == (rows, cols) {
            Ok(())
        } else {
            Err(ScoringError::Shape {
                expected: (rows, cols),
                got: self.dims(),
            })
        }
    }
}

/// NaN scores never match; everything else is clamped into `[0, 1]`.
fn sanitize(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Lexical section-by-section scores.
pub fn lexical_matrix(a: &[Section], b: &[Section], title_weight: f64) -> ScoreMatrix {
    let profiles_a: Vec<TextProfile> = a.iter().map(|s| TextProfile::new(&s.raw_text)).collect();
    let profiles_b: Vec<TextProfile> = b.iter().map(|s| TextProfile::new(&s.raw_text)).collect();
    ScoreMatrix::from_fn(a.len(), b.len(), |i, j| {
        let body = profiles_a[i].similarity(&profiles_b[j]);
        blend(body, titles(&a[i], &b[j]), title_weight)
    })
}

/// Produces the pairwise similarity matrix the matcher aligns on.
#[async_trait]
pub trait SectionScorer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn score(&self, a: &[Section], b: &[Section]) -> Result<ScoreMatrix, ScoringError>;
}

#[derive(Debug, Clone)]
pub struct LexicalScorer {
    title_weight: f64,
}

impl LexicalScorer {
    pub fn new(title_weight: f64) -> Self {
        Self { title_weight }
    }
}

#[async_trait]
impl SectionScorer for LexicalScorer {
    fn name(&self) -> &'static str {
        "lexical"
    }

    async fn score(&self, a: &[Section], b: &[Section]) -> Result<ScoreMatrix, ScoringError> {
        Ok(lexical_matrix(a, b, self.title_weight))
    }
}

#[cfg(feature = "embeddings")]
pub use embedding_scorer::EmbeddingScorer;

#[cfg(feature = "embeddings")]
mod embedding_scorer {
    use std::sync::Arc;

    use async_trait::async_trait;
    use policy_common::embedding::Embedder;

    use super::{blend, normalize, titles, ScoreMatrix, SectionScorer};
    use crate::error::ScoringError;
    use crate::model::Section;

    /// Cosine similarity of sentence embeddings. The model is shared read-only.
    pub struct EmbeddingScorer {
        embedder: Arc<Embedder>,
        title_weight: f64,
    }

    impl EmbeddingScorer {
        pub fn new(embedder: Arc<Embedder>, title_weight: f64) -> Self {
            Self {
                embedder,
                title_weight,
            }
        }
    }

    fn cosine(a: &[f32], b: &[f32]) -> f64 {
        let dot: f64 = a.iter().zip(b).map(|(x, y)| (*x as f64) * (*y as f64)).sum();
        let na: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
        let nb: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
        if na == 0.0 || nb == 0.0 {
            return 0.0;
        }
        dot / (na * nb)
    }

    #[async_trait]
    impl SectionScorer for EmbeddingScorer {
        fn name(&self) -> &'static str {
            "embedding"
        }

        async fn score(&self, a: &[Section], b: &[Section]) -> Result<ScoreMatrix, ScoringError> {
            let texts: Vec<String> = a.iter().chain(b).map(|s| s.raw_text.clone()).collect();
            let vectors = self.embedder.embed_texts(&texts).await?;
            if vectors.len() != texts.len() {
                return Err(ScoringError::Shape {
                    expected: (texts.len(), self.embedder.dimensions()),
                    got: (vectors.len(), self.embedder.dimensions()),
                });
            }
            let (va, vb) = vectors.split_at(a.len());
            Ok(ScoreMatrix::from_fn(a.len(), b.len(), |i, j| {
                let body = if normalize(&a[i].raw_text) == normalize(&b[j].raw_text) {
                    1.0
                } else {
                    cosine(&va[i], &vb[j])
                };
                blend(body, titles(&a[i], &b[j]), self.title_weight)
            }))
        }
    }
}
