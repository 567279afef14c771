//! Clustering pipeline: compose -> vectorize -> partition -> project -> label.
//!
//! Every call builds its own vectorizer, k-means and PCA instances and drops
//! them before returning, so concurrent calls share nothing. The single
//! fitted vectorizer is reused for the per-cluster labels; nothing refits it.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::algo::compose::{self, Document};
use crate::algo;
use crate::algo::kmeans::{self, Kmeans};
use crate::algo::labeler;
use crate::algo::pca::Pca;
use crate::algo::tfidf::TfidfVectorizer;
use crate::error::{Error, Result};

pub const DEFAULT_NUM_CLUSTERS: i64 = 5;
pub const SUCCESS_MESSAGE: &str = "Clustering performed successfully.";

/// Fixed seed for every randomized step, so identical requests give identical output.
const PIPELINE_SEED: u64 = algo::DEFAULT_SEED;

fn default_num_clusters() -> i64 {
    DEFAULT_NUM_CLUSTERS
}

/// A batch of documents plus the fields to cluster on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringRequest {
    pub documents: Vec<Document>,
    pub selected_columns: Vec<String>,
    #[serde(default = "default_num_clusters")]
    pub num_clusters: i64,
}

impl ClusteringRequest {
    pub fn new(documents: Vec<Document>, selected_columns: Vec<String>, num_clusters: i64) -> Self {
        Self {
            documents,
            selected_columns,
            num_clusters,
        }
    }

    /// Check the request before any computation. Returns the cluster count.
    pub fn validate(&self) -> Result<usize> {
        if self.documents.is_empty() {
            return Err(Error::NoDocuments);
        }
        if self.selected_columns.is_empty() {
            return Err(Error::NoFields);
        }
        let n = self.documents.len();
        if self.num_clusters < 1 || self.num_clusters as u64 > n as u64 {
            return Err(Error::InvalidClusterCount {
                requested: self.num_clusters,
                n_items: n,
            });
        }
        Ok(self.num_clusters as usize)
    }
}

/// One document in the 2-D scatter plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterPoint {
    pub x: f64,
    pub y: f64,
    pub topic_id: String,
    pub text_snippet: String,
}

/// Per-cluster summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub name: String,
    pub count: usize,
    /// One decimal place with a trailing `%`, e.g. `"33.3%"`.
    pub percentage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringResponse {
    pub message: String,
    pub scatter_plot_data: Vec<ClusterPoint>,
    pub topics: Vec<Topic>,
}

/// Tuning knobs that are not part of a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Terms per topic label.
    pub label_terms: usize,
    /// Characters of composed text kept in each scatter point.
    pub snippet_chars: usize,
    /// K-means restarts; the lowest-inertia run wins.
    pub n_init: usize,
    /// Lloyd iteration cap per restart.
    pub max_iter: usize,
    pub seed: u64,
    pub label_separator: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            label_terms: 3,
            snippet_chars: 100,
            n_init: kmeans::DEFAULT_N_INIT,
            max_iter: kmeans::DEFAULT_MAX_ITER,
            seed: PIPELINE_SEED,
            label_separator: ", ".into(),
        }
    }
}

/// Run the pipeline with the default configuration.
pub fn run(request: &ClusteringRequest) -> Result<ClusteringResponse> {
    run_with_config(request, &PipelineConfig::default())
}

pub fn run_with_config(
    request: &ClusteringRequest,
    config: &PipelineConfig,
) -> Result<ClusteringResponse> {
    let k = request.validate()?;
    let total = request.documents.len();
    info!(
        documents = total,
        fields = ?request.selected_columns,
        k,
        "Clustering request accepted"
    );

    let texts = compose::compose_all(&request.documents, &request.selected_columns);

    let (vectorizer, matrix) = TfidfVectorizer::fit_transform(&texts)?;
    info!(terms = vectorizer.len(), nnz = matrix.nnz(), "Vectorized corpus");

    let fit = Kmeans::new(k)
        .with_seed(config.seed)
        .with_n_init(config.n_init)
        .with_max_iter(config.max_iter)
        .fit(&matrix)?;

    let coords = Pca::new(2).with_seed(config.seed).fit_transform(&matrix);

    let members = members_by_cluster(&fit.labels, k);
    let topics: Vec<Topic> = members
        .iter()
        .enumerate()
        .map(|(cluster, ids)| {
            let terms = labeler::top_terms(&vectorizer, &texts, ids, config.label_terms);
            debug!(cluster, size = ids.len(), terms = ?terms, "Labeled cluster");
            Topic {
                id: cluster.to_string(),
                name: labeler::topic_name(cluster, &terms, &config.label_separator),
                count: ids.len(),
                percentage: format_percentage(ids.len(), total),
            }
        })
        .collect();

    let scatter_plot_data: Vec<ClusterPoint> = texts
        .iter()
        .zip(coords.iter())
        .zip(fit.labels.iter())
        .map(|((text, xy), &label)| ClusterPoint {
            x: xy.first().copied().unwrap_or(0.0),
            y: xy.get(1).copied().unwrap_or(0.0),
            topic_id: label.to_string(),
            text_snippet: snippet(text, config.snippet_chars),
        })
        .collect();

    info!(
        inertia = fit.inertia,
        sizes = ?topics.iter().map(|t| t.count).collect::<Vec<_>>(),
        "Clustering complete"
    );

    Ok(ClusteringResponse {
        message: SUCCESS_MESSAGE.into(),
        scatter_plot_data,
        topics,
    })
}

/// Member indices per cluster id, in ascending document order.
pub fn members_by_cluster(labels: &[usize], k: usize) -> Vec<Vec<usize>> {
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); k];
    for (i, &label) in labels.iter().enumerate() {
        if label < k {
            members[label].push(i);
        }
    }
    members
}

/// `count / total` as a percentage with one decimal place, e.g. `"33.3%"`.
pub fn format_percentage(count: usize, total: usize) -> String {
    let pct = if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    };
    format!("{pct:.1}%")
}

/// First `max_chars` characters of `text`.
pub fn snippet(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
