use thiserror::Error;

/// Errors returned by the clustering pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// The request carried no documents.
    #[error("no documents provided for clustering")]
    NoDocuments,

    /// The request selected no fields to compose text from.
    #[error("no fields selected for text composition")]
    NoFields,

    /// Requested cluster count is incompatible with the dataset.
    #[error("invalid cluster count: requested {requested}, but dataset has {n_items} documents")]
    InvalidClusterCount {
        /// Requested number of clusters.
        requested: i64,
        /// Number of documents in the request.
        n_items: usize,
    },

    /// No term survived tokenization and stop-word removal.
    #[error("empty vocabulary; the documents may contain only stop words")]
    EmptyVocabulary,

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors caused by the request itself, detected before any computation.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::NoDocuments | Error::NoFields | Error::InvalidClusterCount { .. }
        )
    }
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_classified() {
        assert!(Error::NoDocuments.is_input_error());
        assert!(Error::NoFields.is_input_error());
        assert!(Error::InvalidClusterCount { requested: 0, n_items: 3 }.is_input_error());
        assert!(!Error::EmptyVocabulary.is_input_error());
        assert!(!Error::Other("boom".into()).is_input_error());
    }

    #[test]
    fn cluster_count_message() {
        let e = Error::InvalidClusterCount { requested: 9, n_items: 4 };
        assert_eq!(
            e.to_string(),
            "invalid cluster count: requested 9, but dataset has 4 documents"
        );
    }
}
