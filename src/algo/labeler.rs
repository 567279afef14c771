use crate::algo::tfidf::TfidfVectorizer;

/// Top terms of one cluster, weighted against the corpus-wide vocabulary.
///
/// The member texts are re-expressed through the already fitted `vectorizer`
/// (no refit), the weight of each term is averaged over the member rows, and
/// the `n` highest means are returned. Higher mean wins; equal means fall back
/// to vocabulary order. Terms with zero mean never qualify, so an empty
/// cluster yields an empty list.
pub fn top_terms(
    vectorizer: &TfidfVectorizer,
    texts: &[String],
    members: &[usize],
    n: usize,
) -> Vec<(String, f64)> {
    if members.is_empty() || n == 0 {
        return vec![];
    }

    let mut sorted_members = members.to_vec();
    sorted_members.sort_unstable();
    sorted_members.dedup();
    let subset: Vec<String> = sorted_members.iter().map(|&i| texts[i].clone()).collect();

    let matrix = vectorizer.transform(&subset);
    let mut sums = vec![0.0f64; vectorizer.len()];
    for row in matrix.outer_iterator() {
        for (j, &w) in row.iter() {
            sums[j] += w;
        }
    }
    let rows = subset.len() as f64;

    let mut ranked: Vec<(usize, f64)> = sums
        .into_iter()
        .enumerate()
        .filter(|(_, s)| *s > 0.0)
        .map(|(j, s)| (j, s / rows))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    ranked.truncate(n);

    let vocabulary = vectorizer.vocabulary();
    ranked
        .into_iter()
        .map(|(j, w)| (vocabulary[j].clone(), w))
        .collect()
}

/// Display name for a cluster: its terms joined by `separator`, or a placeholder.
pub fn topic_name(cluster_id: usize, terms: &[(String, f64)], separator: &str) -> String {
    if terms.is_empty() {
        return placeholder(cluster_id);
    }
    terms
        .iter()
        .map(|(t, _)| t.as_str())
        .collect::<Vec<&str>>()
        .join(separator)
}

/// Name used for clusters without qualifying terms, numbered from 1.
pub fn placeholder(cluster_id: usize) -> String {
    format!("Cluster {}", cluster_id + 1)
}
