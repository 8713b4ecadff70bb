//! Coarse document-level scoring used when no chunk scored at all.

use std::sync::Arc;

use localqa_core::config::{FallbackConfig, ScoringWeights};
use localqa_core::types::Document;
use localqa_text::signals::{self, MatchSignals};
use localqa_text::{LexicalFeatures, QueryProfile};

#[derive(Debug, Clone)]
pub struct DocumentScore {
    pub document: Arc<Document>,
    pub score: f32,
}

/// Title, tags and the head of the summary (or content) as one text.
pub fn metadata_blob(document: &Document, summary_chars: usize) -> String {
    let summary: String = document.summary_or_content().chars().take(summary_chars).collect();
    let tags: Vec<&str> = document.tags.iter().map(String::as_str).collect();
    format!("{} {} {}", document.title, tags.join(" "), summary)
}

/// Scores documents on their metadata blob and returns the best
/// `top_documents` with a positive score, best first.
pub fn score_documents(
    query: &QueryProfile,
    documents: &[Arc<Document>],
    config: &FallbackConfig,
    weights: &ScoringWeights,
) -> Vec<DocumentScore> {
    let mut scored: Vec<DocumentScore> = documents
        .iter()
        .filter_map(|doc| {
            let features = LexicalFeatures::from_text(&metadata_blob(doc, config.summary_chars));
            let overlap = signals::lexical_overlap(query, &features);
            let matches = MatchSignals::compute(query, &features, overlap > 0.0, weights);
            let score = overlap
                + weights.exact_token * matches.exact
                + weights.phrase * matches.phrase
                + weights.numeric * matches.literal_numeric();
            (score > 0.0).then(|| DocumentScore { document: Arc::clone(doc), score })
        })
        .collect();
    scored.sort_by(|a, b| {
        b.score.total_cmp(&a.score).then_with(|| b.document.created_at.cmp(&a.document.created_at))
    });
    scored.truncate(config.top_documents);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn score(question: &str, docs: &[Arc<Document>]) -> Vec<DocumentScore> {
        let query = QueryProfile::new(question);
        score_documents(&query, docs, &FallbackConfig::default(), &ScoringWeights::default())
    }

    #[test]
    fn matches_on_title_and_tags() {
        let docs = vec![
            Arc::new(
                Document::new("a", "Home insurance policy", Utc::now()).with_tags(["insurance"]),
            ),
            Arc::new(Document::new("b", "Banana bread", Utc::now()).with_tags(["recipe"])),
        ];
        let out = score("insurance policy", &docs);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].document.id, "a");
    }

    #[test]
    fn zero_scores_yield_nothing() {
        let doc =
            Document::new("b", "Banana bread", Utc::now()).with_summary("bake for 45 minutes");
        let out = score("What is my passport number?", &[Arc::new(doc)]);
        assert!(out.is_empty());
    }

    #[test]
    fn keeps_the_configured_number_of_documents() {
        let docs: Vec<Arc<Document>> = (0..10)
            .map(|i| Document::new(format!("d{i}"), format!("tax return {i}"), Utc::now()))
            .map(Arc::new)
            .collect();
        let out = score("tax return", &docs);
        assert_eq!(out.len(), 6);
    }

    #[test]
    fn blob_truncates_summary() {
        let doc = Document::new("a", "T", Utc::now()).with_content("abcdefghij");
        assert_eq!(metadata_blob(&doc, 4), "T  abcd");
    }
}
