use std::collections::{BTreeMap, HashMap, HashSet};

use rayon::prelude::*;
use sprs::{CsMat, TriMat};
use tracing::debug;

use crate::algo::tokenizer;
use crate::error::{Error, Result};

/// TF-IDF vectorizer with a frozen, lexicographically ordered vocabulary.
///
/// Rows of the produced matrix are documents in input order, columns are
/// vocabulary terms. Cell weight is `count * idf(term)`, L2-normalized per row,
/// with the smoothed IDF `ln((1 + N) / (1 + df)) + 1`.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    /// column index -> term
    vocabulary: Vec<String>,
    /// term -> column index
    index: HashMap<String, usize>,
    /// column index -> idf weight
    idf: Vec<f64>,
    /// number of documents seen while fitting
    num_docs: usize,
}

impl TfidfVectorizer {
    /// Learn the vocabulary and IDF weights from a corpus.
    pub fn fit(texts: &[String]) -> Result<Self> {
        let token_lists = tokenize_all(texts);
        Self::fit_tokens(&token_lists)
    }

    /// Fit on the corpus and return its term-weight matrix.
    pub fn fit_transform(texts: &[String]) -> Result<(Self, CsMat<f64>)> {
        let token_lists = tokenize_all(texts);
        let vectorizer = Self::fit_tokens(&token_lists)?;
        let matrix = vectorizer.weigh(&token_lists);
        Ok((vectorizer, matrix))
    }

    /// Express texts through the fitted vocabulary. Unknown terms are ignored.
    pub fn transform(&self, texts: &[String]) -> CsMat<f64> {
        let token_lists = tokenize_all(texts);
        self.weigh(&token_lists)
    }

    /// Terms in column order.
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Column index of a term, if it is in the vocabulary.
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    /// IDF weight of a term, if it is in the vocabulary.
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.term_index(term).map(|i| self.idf[i])
    }

    pub fn num_docs(&self) -> usize {
        self.num_docs
    }

    /// Vocabulary size.
    pub fn len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }

    fn fit_tokens(token_lists: &[Vec<String>]) -> Result<Self> {
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for tokens in token_lists {
            let unique: HashSet<&str> = tokens.iter().map(|t| t.as_str()).collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }
        if doc_freq.is_empty() {
            return Err(Error::EmptyVocabulary);
        }

        let mut vocabulary: Vec<String> = doc_freq.keys().map(|t| t.to_string()).collect();
        vocabulary.sort();

        let n = token_lists.len() as f64;
        let idf: Vec<f64> = vocabulary
            .iter()
            .map(|t| {
                let df = doc_freq[t.as_str()] as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        let index: HashMap<String, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();

        debug!(docs = token_lists.len(), terms = vocabulary.len(), "Fitted vocabulary");

        Ok(Self {
            vocabulary,
            index,
            idf,
            num_docs: token_lists.len(),
        })
    }

    fn weigh(&self, token_lists: &[Vec<String>]) -> CsMat<f64> {
        let rows: Vec<Vec<(usize, f64)>> = token_lists
            .par_iter()
            .map(|tokens| self.row_weights(tokens))
            .collect();

        let mut tri = TriMat::new((token_lists.len(), self.vocabulary.len()));
        for (row, weights) in rows.into_iter().enumerate() {
            for (col, w) in weights {
                tri.add_triplet(row, col, w);
            }
        }
        tri.to_csr()
    }

    fn row_weights(&self, tokens: &[String]) -> Vec<(usize, f64)> {
        let mut counts: BTreeMap<usize, u32> = BTreeMap::new();
        for token in tokens {
            if let Some(&col) = self.index.get(token.as_str()) {
                *counts.entry(col).or_insert(0) += 1;
            }
        }
        let weights: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(col, count)| (col, count as f64 * self.idf[col]))
            .collect();

        let norm = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm == 0.0 {
            return Vec::new();
        }
        weights.into_iter().map(|(col, w)| (col, w / norm)).collect()
    }
}

fn tokenize_all(texts: &[String]) -> Vec<Vec<String>> {
    texts.par_iter().map(|t| tokenizer::tokenize(t)).collect()
}
