//! Chunk hit ranker: combines every signal into one ordered hit list.

use std::sync::Arc;

use localqa_core::config::RetrievalConfig;
use localqa_core::types::{Document, SessionContext};
use localqa_text::index::normalize_by_max;
use localqa_text::signals::{self, MatchSignals};
use localqa_text::{LexicalFeatures, LexicalIndex, QueryProfile};

use crate::hit::{sort_hits, ChunkHit};

struct Candidate {
    document: usize,
    position: usize,
    chunk_id: String,
    features: LexicalFeatures,
}

struct DocumentSignals {
    tag: f32,
    title: f32,
    doc_type: f32,
    session: f32,
}

/// Scores every chunk of `documents` against the question.
///
/// Chunks with no lexical relation at all are discarded, as are chunks whose
/// final score does not come out positive. The result is sorted by
/// [`crate::hit::compare_hits`].
pub fn rank_chunks(
    query: &QueryProfile,
    documents: &[Arc<Document>],
    config: &RetrievalConfig,
    session: &SessionContext,
    predicted_category: Option<&str>,
) -> Vec<ChunkHit> {
    let weights = &config.weights;
    let candidates: Vec<Candidate> = documents
        .iter()
        .enumerate()
        .flat_map(|(d, doc)| {
            doc.chunk_views().into_iter().map(move |view| Candidate {
                document: d,
                position: view.position,
                chunk_id: view.id.into_owned(),
                features: LexicalFeatures::from_text(view.text),
            })
        })
        .collect();
    if candidates.is_empty() {
        return Vec::new();
    }

    let index = LexicalIndex::build(candidates.iter().map(|c| &c.features), &config.bm25);
    let raw_bm25: Vec<f32> =
        candidates.iter().map(|c| index.bm25(&query.terms, &c.features)).collect();
    let bm25 = normalize_by_max(&raw_bm25);

    let follow_up = !query.has_strong_anchor();
    let previous = session.previous_document_id.as_deref();
    let per_document: Vec<DocumentSignals> = documents
        .iter()
        .map(|doc| DocumentSignals {
            tag: signals::tag_match(query, &doc.tags),
            title: signals::title_match(query, &doc.title),
            doc_type: signals::doc_type_match(predicted_category, &doc.category),
            session: if follow_up && previous == Some(doc.id.as_str()) {
                weights.session_bias
            } else {
                0.0
            },
        })
        .collect();

    let mut hits = Vec::new();
    for (candidate, bm25) in candidates.into_iter().zip(bm25) {
        let meta = &per_document[candidate.document];
        let features = &candidate.features;
        let trigram = signals::jaccard(&query.trigrams, &features.trigrams);
        let semantic = signals::semantic_score(bm25, trigram, weights);
        let overlap = signals::lexical_overlap(query, features);
        let matches = MatchSignals::compute(query, features, overlap > 0.0, weights);
        let anchor_coverage = signals::anchor_coverage(query, features);

        let unrelated = [
            semantic,
            overlap,
            meta.tag,
            meta.title,
            matches.exact,
            matches.phrase,
            matches.literal_numeric(),
            anchor_coverage,
        ]
        .iter()
        .all(|s| *s <= 0.0);
        if unrelated {
            continue;
        }

        let final_score = weights.semantic * semantic
            + weights.lexical_overlap * overlap
            + weights.tag * meta.tag
            + weights.title * meta.title
            + weights.doc_type * meta.doc_type
            + weights.exact_token * matches.exact
            + weights.phrase * matches.phrase
            + weights.numeric * matches.numeric
            + signals::anchor_adjustment(query, anchor_coverage, weights)
            + weights.short_acronym_bonus * matches.acronym
            + meta.session;
        if final_score <= 0.0 {
            continue;
        }

        hits.push(ChunkHit {
            document: Arc::clone(&documents[candidate.document]),
            chunk_id: candidate.chunk_id,
            position: candidate.position,
            semantic_score: semantic,
            doc_type_match: meta.doc_type,
            tag_match: meta.tag,
            title_match: meta.title,
            exact_token_match: matches.exact,
            phrase_match: matches.phrase,
            numeric_match: matches.numeric,
            final_score,
        });
    }
    sort_hits(&mut hits);
    tracing::debug!(chunks = index.total_chunks(), hits = hits.len(), "ranked chunks");
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn doc(id: &str, day: u32, chunks: &[&str]) -> Arc<Document> {
        let created = Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap();
        let mut d = Document::new(id, id, created);
        for c in chunks {
            d = d.with_chunk(*c, None);
        }
        Arc::new(d)
    }

    fn rank(question: &str, docs: &[Arc<Document>]) -> Vec<ChunkHit> {
        rank_following(question, docs, &SessionContext::default())
    }

    fn rank_following(
        question: &str,
        docs: &[Arc<Document>],
        session: &SessionContext,
    ) -> Vec<ChunkHit> {
        rank_chunks(&QueryProfile::new(question), docs, &RetrievalConfig::default(), session, None)
    }

    fn ids(hits: Vec<ChunkHit>) -> Vec<String> {
        hits.into_iter().map(|h| h.chunk_id).collect()
    }

    #[test]
    fn unrelated_chunks_never_surface() {
        let docs = vec![doc("a", 1, &["passport renewal at the embassy", "zzz qqq"])];
        let hits = rank("passport renewal", &docs);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "a:0");
    }

    #[test]
    fn ties_break_on_recency() {
        let docs = vec![doc("old", 1, &["lease agreement"]), doc("new", 9, &["lease agreement"])];
        let hits = rank("lease agreement", &docs);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document_id(), "new");
    }

    #[test]
    fn ranking_is_deterministic() {
        let docs = vec![
            doc("a", 1, &["rent paid monthly", "deposit returned"]),
            doc("b", 2, &["rent increase notice", "monthly rent 900"]),
        ];
        let first = ids(rank("monthly rent", &docs));
        for _ in 0..5 {
            assert_eq!(first, ids(rank("monthly rent", &docs)));
        }
    }

    #[test]
    fn session_bias_only_for_follow_ups() {
        let chunk: &[&str] = &["policy expires in march"];
        let docs = vec![doc("a", 1, chunk), doc("b", 1, chunk)];
        let session = SessionContext::following("b");
        let hits = rank_following("when does it expire", &docs, &session);
        assert_eq!(hits[0].document_id(), "b");
        assert!(hits[0].final_score > hits[1].final_score);
        let hits = rank_following("when does the AXA policy expire", &docs, &session);
        assert!((hits[0].final_score - hits[1].final_score).abs() < 1e-6);
    }
}
