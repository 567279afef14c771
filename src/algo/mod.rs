pub mod compose;
pub mod kmeans;
pub mod labeler;
pub mod pca;
pub mod tfidf;
pub mod tokenizer;

/// Seed for every randomized step when none is given.
pub const DEFAULT_SEED: u64 = 42;
