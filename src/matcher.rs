// src/matcher.rs
//! # Similarity Matcher
//!
//! Links a posting's employer name to the sponsor roster with character n-gram
//! TF-IDF vectors and cosine similarity.
//!
//! - Strings are lower-cased and runs of whitespace collapsed to one space.
//! - Term frequency is the raw n-gram count.
//! - IDF is smoothed, `ln((1 + n) / (1 + df)) + 1`, over the documents
//!   `{query} ∪ roster` of that single query. The vector space is rebuilt for
//!   every query, so a roster entry's weights depend on the query it is
//!   compared with.
//! - Vectors are L2-normalised; the score is their dot product in `[0, 1]`.
//!
//! Vectors are ordered maps so the floating-point summation order, and hence
//! every score, is reproducible.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::MatcherError;
use crate::posting::{MatchResult, PostingRecord, ReferenceEntry};

pub const DEFAULT_THRESHOLD: f64 = 0.6;
pub const DEFAULT_NGRAM_MIN: usize = 2;
pub const DEFAULT_NGRAM_MAX: usize = 3;

/// How n-grams are cut out of a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Analyzer {
    /// Slide over the whole string, spaces and punctuation included.
    #[default]
    Char,
    /// Only inside words, each word padded with one space on both sides.
    CharWb,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatcherParams {
    pub threshold: f64,
    pub ngram_min: usize,
    pub ngram_max: usize,
    pub analyzer: Analyzer,
}

impl Default for MatcherParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            ngram_min: DEFAULT_NGRAM_MIN,
            ngram_max: DEFAULT_NGRAM_MAX,
            analyzer: Analyzer::Char,
        }
    }
}

type TermCounts = BTreeMap<String, u32>;

#[derive(Debug, Clone)]
pub struct SimilarityMatcher {
    params: MatcherParams,
}

impl SimilarityMatcher {
    pub fn new(params: MatcherParams) -> Result<Self, MatcherError> {
        if params.ngram_min == 0 || params.ngram_min > params.ngram_max {
            return Err(MatcherError::InvalidRange {
                min: params.ngram_min,
                max: params.ngram_max,
            });
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &MatcherParams {
        &self.params
    }

    /// Cosine score of `query` against every roster entry, in roster order.
    pub fn score_all(
        &self,
        query: &str,
        roster: &[ReferenceEntry],
    ) -> Result<Vec<f64>, MatcherError> {
        if query.trim().is_empty() {
            return Err(MatcherError::BlankQuery);
        }
        let query_terms = self.ngrams(query);
        if query_terms.is_empty() {
            return Err(MatcherError::NoNgrams(query.to_string()));
        }

        let docs: Vec<TermCounts> = std::iter::once(query_terms)
            .chain(roster.iter().map(|r| self.ngrams(&r.name)))
            .collect();

        let mut df: BTreeMap<&str, u32> = BTreeMap::new();
        for d in &docs {
            for t in d.keys() {
                *df.entry(t.as_str()).or_default() += 1;
            }
        }
        let n = docs.len() as f64;
        let idf = |t: &str| {
            let d = df.get(t).copied().unwrap_or(0) as f64;
            ((1.0 + n) / (1.0 + d)).ln() + 1.0
        };

        let query_vec = tfidf_unit(&docs[0], &idf);
        let scores = docs[1..]
            .iter()
            .map(|d| {
                let v = tfidf_unit(d, &idf);
                dot(&query_vec, &v).clamp(0.0, 1.0)
            })
            .collect();
        Ok(scores)
    }

    /// Best roster entry at or above the threshold. Ties keep the earliest entry.
    pub fn best_match(
        &self,
        posting: &PostingRecord,
        roster: &[ReferenceEntry],
    ) -> Result<Option<MatchResult>, MatcherError> {
        if roster.is_empty() {
            return Ok(None);
        }
        let scores = self.score_all(&posting.company, roster)?;

        let mut best: Option<(usize, f64)> = None;
        for (idx, &score) in scores.iter().enumerate() {
            if score < self.params.threshold {
                continue;
            }
            match best {
                Some((_, b)) if score <= b => {}
                _ => best = Some((idx, score)),
            }
        }

        Ok(best.map(|(idx, score)| {
            tracing::debug!(
                target: "matcher",
                company = %posting.company,
                matched = %roster[idx].name,
                score,
                "sponsor match"
            );
            MatchResult {
                posting: posting.clone(),
                matched_reference_name: roster[idx].name.clone(),
                score,
            }
        }))
    }

    fn ngrams(&self, s: &str) -> TermCounts {
        let text = s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        let mut out = TermCounts::new();
        match self.params.analyzer {
            Analyzer::Char => {
                let chars: Vec<char> = text.chars().collect();
                push_windows(&chars, self.params.ngram_min, self.params.ngram_max, &mut out);
            }
            Analyzer::CharWb => {
                for word in text.split(' ').filter(|w| !w.is_empty()) {
                    let padded: Vec<char> = std::iter::once(' ')
                        .chain(word.chars())
                        .chain(std::iter::once(' '))
                        .collect();
                    for n in self.params.ngram_min..=self.params.ngram_max {
                        if padded.len() <= n {
                            // a word no longer than n is counted once, whole
                            *out.entry(padded.iter().collect()).or_default() += 1;
                            break;
                        }
                        for w in padded.windows(n) {
                            *out.entry(w.iter().collect()).or_default() += 1;
                        }
                    }
                }
            }
        }
        out
    }
}

fn push_windows(chars: &[char], min: usize, max: usize, out: &mut TermCounts) {
    for n in min..=max {
        for w in chars.windows(n) {
            *out.entry(w.iter().collect()).or_default() += 1;
        }
    }
}

fn tfidf_unit(counts: &TermCounts, idf: &impl Fn(&str) -> f64) -> BTreeMap<String, f64> {
    let mut v: BTreeMap<String, f64> = counts
        .iter()
        .map(|(t, &c)| (t.clone(), c as f64 * idf(t)))
        .collect();
    let norm = v.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for w in v.values_mut() {
            *w /= norm;
        }
    }
    v
}

fn dot(a: &BTreeMap<String, f64>, b: &BTreeMap<String, f64>) -> f64 {
    a.iter()
        .filter_map(|(t, wa)| b.get(t).map(|wb| wa * wb))
        .sum()
}
