use nu_plugin_topicmap::algo::compose::Document;
use nu_plugin_topicmap::algo::tfidf::TfidfVectorizer;
use nu_plugin_topicmap::pipeline::{self, SUCCESS_MESSAGE};
use nu_plugin_topicmap::{ClusteringRequest, Error, PipelineConfig};

fn articles() -> Vec<Document> {
    [
        ("Borrowing", "rust compiler borrow checker"),
        ("Ownership", "rust compiler ownership"),
        ("Lifetimes", "rust borrow ownership lifetimes"),
        ("Marinara", "pasta recipe tomato sauce"),
        ("Aglio", "pasta recipe garlic"),
        ("Sugo", "tomato garlic sauce recipe"),
    ]
    .iter()
    .map(|(title, body)| Document::from_pairs([("title", *title), ("body", *body)]))
    .collect()
}

fn request(k: i64) -> ClusteringRequest {
    ClusteringRequest::new(articles(), vec!["body".into()], k)
}

#[test]
fn identical_requests_identical_responses() {
    let a = pipeline::run(&request(3)).unwrap();
    let b = pipeline::run(&request(3)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn concurrent_runs_share_nothing() {
    let expected = pipeline::run(&request(2)).unwrap();
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| pipeline::run(&request(2)).unwrap()))
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), expected);
        }
    });
}

#[test]
fn every_document_gets_exactly_one_point() {
    let resp = pipeline::run(&request(2)).unwrap();
    assert_eq!(resp.message, SUCCESS_MESSAGE);
    assert_eq!(resp.scatter_plot_data.len(), 6);

    let ids: Vec<&str> = resp.topics.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["0", "1"]);
    for (id, topic) in resp.topics.iter().enumerate() {
        let members = resp
            .scatter_plot_data
            .iter()
            .filter(|p| p.topic_id == id.to_string())
            .count();
        assert_eq!(members, topic.count);
    }
}

#[test]
fn coordinates_are_finite() {
    let resp = pipeline::run(&request(2)).unwrap();
    for p in &resp.scatter_plot_data {
        assert!(p.x.is_finite());
        assert!(p.y.is_finite());
    }
}

#[test]
fn identical_documents_project_to_the_same_point() {
    let docs: Vec<Document> = ["cat dog", "cat dog", "fish bird", "fish bird"]
        .iter()
        .map(|t| Document::from_pairs([("text", *t)]))
        .collect();
    let req = ClusteringRequest::new(docs, vec!["text".into()], 2);
    let resp = pipeline::run(&req).unwrap();
    let pts = &resp.scatter_plot_data;
    assert_eq!(pts[0].x, pts[1].x);
    assert_eq!(pts[0].y, pts[1].y);
    assert_eq!(pts[0].topic_id, pts[1].topic_id);
    assert_eq!(pts[2].topic_id, pts[3].topic_id);
    assert_ne!(pts[0].topic_id, pts[2].topic_id);
}

#[test]
fn single_document_single_cluster() {
    let docs = vec![Document::from_pairs([("text", "lonely sentence here")])];
    let req = ClusteringRequest::new(docs, vec!["text".into()], 1);
    let resp = pipeline::run(&req).unwrap();
    assert_eq!(resp.topics.len(), 1);
    assert_eq!(resp.topics[0].count, 1);
    assert_eq!(resp.topics[0].percentage, "100.0%");
    assert_eq!(resp.scatter_plot_data[0].x, 0.0);
    assert_eq!(resp.scatter_plot_data[0].y, 0.0);
}

#[test]
fn multi_field_composition_feeds_vectorizer() {
    let req = ClusteringRequest::new(articles(), vec!["title".into(), "body".into()], 2);
    let resp = pipeline::run(&req).unwrap();
    assert_eq!(
        resp.scatter_plot_data[3].text_snippet,
        "Marinara pasta recipe tomato sauce"
    );
}

#[test]
fn labels_use_global_vocabulary() {
    let texts: Vec<String> = articles()
        .iter()
        .map(|d| d.text_of("body"))
        .collect();
    let vectorizer = TfidfVectorizer::fit(&texts).unwrap();
    let resp = pipeline::run(&request(2)).unwrap();
    for topic in &resp.topics {
        for term in topic.name.split(", ") {
            assert!(
                vectorizer.term_index(term).is_some(),
                "label term {term} not in vocabulary"
            );
        }
    }
}

#[test]
fn config_controls_label_and_snippet() {
    let config = PipelineConfig {
        label_terms: 1,
        snippet_chars: 4,
        ..PipelineConfig::default()
    };
    let resp = pipeline::run_with_config(&request(2), &config).unwrap();
    for topic in &resp.topics {
        assert!(!topic.name.contains(", "));
    }
    assert_eq!(resp.scatter_plot_data[0].text_snippet, "rust");
}

#[test]
fn seed_changes_keep_output_valid() {
    for seed in [1, 7, 99] {
        let config = PipelineConfig {
            seed,
            ..PipelineConfig::default()
        };
        let resp = pipeline::run_with_config(&request(3), &config).unwrap();
        assert_eq!(resp.topics.len(), 3);
        assert_eq!(resp.topics.iter().map(|t| t.count).sum::<usize>(), 6);
    }
}

#[test]
fn response_serializes_with_wire_names() {
    let resp = pipeline::run(&request(2)).unwrap();
    let value = serde_json::to_value(&resp).unwrap();
    let point = &value["scatter_plot_data"][0];
    for key in ["x", "y", "topic_id", "text_snippet"] {
        assert!(point.get(key).is_some(), "missing {key}");
    }
    let topic = &value["topics"][0];
    for key in ["id", "name", "count", "percentage"] {
        assert!(topic.get(key).is_some(), "missing {key}");
    }
    assert!(topic["id"].is_string());
    assert!(topic["count"].is_u64());
}

#[test]
fn stopword_only_corpus_fails_after_validation() {
    let docs: Vec<Document> = ["the and of", "is it"]
        .iter()
        .map(|t| Document::from_pairs([("text", *t)]))
        .collect();
    let req = ClusteringRequest::new(docs, vec!["text".into()], 1);
    let err = pipeline::run(&req).unwrap_err();
    assert!(matches!(err, Error::EmptyVocabulary));
    assert!(!err.is_input_error());
}
