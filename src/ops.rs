//! Shared operation wrappers for all interfaces (CLI, plugin).
//!
//! Each `op_*` function is a pure, synchronous wrapper around the clustering
//! pipeline. Input and output are `serde_json::Value`, with no dependency on
//! clap or nu-plugin.

use serde_json::Value;
use tracing::warn;

use crate::algo::compose::Document;
use crate::error::Error;
use crate::pipeline::{self, ClusteringRequest, PipelineConfig};

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Turn JSON rows into documents. Non-object rows become `{"value": row}`.
pub fn to_documents(rows: &[Value]) -> Vec<Document> {
    rows.iter().cloned().map(Document::from_value).collect()
}

/// Render a pipeline error for the caller.
///
/// Request problems are reported as-is; anything raised during computation is
/// wrapped as a clustering failure.
pub fn describe_error(err: &Error) -> String {
    if err.is_input_error() {
        err.to_string()
    } else {
        format!("An error occurred during clustering: {err}")
    }
}

// ── Operations ───────────────────────────────────────────────────────────────

pub fn op_cluster(rows: &[Value], fields: &[String], k: i64) -> Result<Value, String> {
    op_cluster_with_config(rows, fields, k, &PipelineConfig::default())
}

pub fn op_cluster_with_config(
    rows: &[Value],
    fields: &[String],
    k: i64,
    config: &PipelineConfig,
) -> Result<Value, String> {
    let request = ClusteringRequest::new(to_documents(rows), fields.to_vec(), k);
    run_request(&request, config)
}

/// Cluster a full request object: `{documents, selected_columns, num_clusters?}`.
pub fn op_cluster_request(request: &Value) -> Result<Value, String> {
    let request: ClusteringRequest = serde_json::from_value(request.clone())
        .map_err(|e| format!("Invalid clustering request: {e}"))?;
    run_request(&request, &PipelineConfig::default())
}

fn run_request(request: &ClusteringRequest, config: &PipelineConfig) -> Result<Value, String> {
    let response = pipeline::run_with_config(request, config).map_err(|e| {
        warn!(error = %e, "Clustering failed");
        describe_error(&e)
    })?;
    serde_json::to_value(response).map_err(|e| format!("Failed to serialize response: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn to_documents_wraps_scalars() {
        let docs = to_documents(&[json!({"text": "a"}), json!("b")]);
        assert_eq!(docs[0].text_of("text"), "a");
        assert_eq!(docs[1].text_of("value"), "b");
    }

    #[test]
    fn describe_error_prefixes_pipeline_failures() {
        assert_eq!(
            describe_error(&Error::NoDocuments),
            "no documents provided for clustering"
        );
        assert!(describe_error(&Error::EmptyVocabulary)
            .starts_with("An error occurred during clustering: "));
    }
}
