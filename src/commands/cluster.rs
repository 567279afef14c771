use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{
    Category, Example, LabeledError, PipelineData, Signature, SyntaxShape, Type, Value,
};

use super::util::{input_rows, response_to_value, row_to_document};
use crate::algo::compose::Document;
use crate::ops;
use crate::pipeline::{self, ClusteringRequest, DEFAULT_NUM_CLUSTERS};
use crate::TopicMapPlugin;

pub struct Cluster;

impl PluginCommand for Cluster {
    type Plugin = TopicMapPlugin;

    fn name(&self) -> &str {
        "topicmap cluster"
    }

    fn description(&self) -> &str {
        "Cluster rows by TF-IDF + k-means, project them to 2-D with PCA, and label each topic"
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_type(Type::table(), Type::record())
            .rest(
                "fields",
                SyntaxShape::String,
                "Fields joined into the clustered text, in order (default: content)",
            )
            .named(
                "clusters",
                SyntaxShape::Int,
                "Number of clusters (default: 5)",
                Some('k'),
            )
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["cluster", "kmeans", "topics", "pca", "scatter", "tfidf"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![
            Example {
                example: r#"[[text]; ["cat dog"] ["cat cat"] ["fish fish"] ["dog fish"]] | topicmap cluster text -k 2"#,
                description: "Group four short texts into two topics",
                result: None,
            },
            Example {
                example: r#"open tickets.csv | topicmap cluster title body --clusters 8"#,
                description: "Cluster on title and body together",
                result: None,
            },
        ]
    }

    fn run(
        &self,
        _plugin: &TopicMapPlugin,
        _engine: &EngineInterface,
        call: &EvaluatedCall,
        input: PipelineData,
    ) -> Result<PipelineData, LabeledError> {
        let mut fields: Vec<String> = call.rest(0)?;
        if fields.is_empty() {
            fields.push("content".into());
        }
        let k: i64 = call
            .get_flag::<i64>("clusters")?
            .unwrap_or(DEFAULT_NUM_CLUSTERS);
        let head = call.head;

        let rows: Vec<Value> = input_rows(input);
        let documents: Vec<Document> = rows.iter().map(|row| row_to_document(row, &fields)).collect();

        let request = ClusteringRequest::new(documents, fields, k);
        let response = pipeline::run(&request).map_err(|e| {
            LabeledError::new(ops::describe_error(&e)).with_label("clustering failed", head)
        })?;

        Ok(PipelineData::Value(response_to_value(&response, head), None))
    }
}
