//! Two-pass reranking of hits that made it through the evidence gate.
//!
//! Pass A bounds fan-out per document, pass B rescores with question-type
//! features and the subject anchor, then the keyword gate drops hits that
//! share too little with the question.

use std::collections::HashMap;

use localqa_core::config::{RerankConfig, ScoringWeights};
use localqa_text::{LexicalFeatures, QueryProfile};

use crate::hit::{sort_hits, ChunkHit};

/// Groups hits by document in first-seen order, keeps at most
/// `per_document_cap` of each, and caps the merged pool.
pub fn pass_a(hits: &[ChunkHit], config: &RerankConfig) -> Vec<ChunkHit> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&ChunkHit>> = HashMap::new();
    for hit in hits {
        let group = groups.entry(hit.document_id()).or_insert_with(|| {
            order.push(hit.document_id());
            Vec::new()
        });
        if group.len() < config.per_document_cap {
            group.push(hit);
        }
    }
    order
        .iter()
        .filter_map(|id| groups.get(id))
        .flatten()
        .take(config.pool_cap)
        .map(|h| (*h).clone())
        .collect()
}

/// Rescores pass-A candidates and keeps the `top_k` best, sorted.
pub fn pass_b(
    query: &QueryProfile,
    candidates: &[ChunkHit],
    config: &RerankConfig,
    weights: &ScoringWeights,
) -> Vec<ChunkHit> {
    let mut rescored: Vec<ChunkHit> = candidates
        .iter()
        .map(|hit| {
            let features = LexicalFeatures::from_text(hit.text());
            hit.rescored(hit.final_score + pass_b_bonus(query, hit, &features, config, weights))
        })
        .collect();
    sort_hits(&mut rescored);
    rescored.truncate(config.top_k);
    rescored
}

#[allow(clippy::cast_precision_loss)]
fn pass_b_bonus(
    query: &QueryProfile,
    hit: &ChunkHit,
    features: &LexicalFeatures,
    config: &RerankConfig,
    weights: &ScoringWeights,
) -> f32 {
    let mut bonus = 0.0;
    if query.is_count_question {
        if features.has_digit() {
            bonus += config.count_digit_bonus;
        }
        bonus += (config.count_numeric_multiplier - 1.0) * weights.numeric * hit.numeric_match;
    }
    if query.subject.as_ref().is_some_and(|s| s.matches(features)) {
        bonus += config.subject_bonus;
    }
    let overlap = if query.terms.is_empty() {
        0.0
    } else {
        query.keyword_overlap(features) as f32 / query.terms.len() as f32
    };
    bonus + config.keyword_weight * (overlap + hit.exact_token_match) / 2.0
}

/// Keeps hits that contain the subject anchor or share at least
/// `min_keyword_overlap` question terms. Returns the input unchanged when
/// nothing would survive.
pub fn keyword_gate(
    query: &QueryProfile,
    hits: Vec<ChunkHit>,
    config: &RerankConfig,
) -> Vec<ChunkHit> {
    let kept: Vec<ChunkHit> = hits
        .iter()
        .filter(|hit| {
            let features = LexicalFeatures::from_text(hit.text());
            query.subject.as_ref().is_some_and(|s| s.matches(&features))
                || query.keyword_overlap(&features) >= config.min_keyword_overlap
        })
        .cloned()
        .collect();
    if kept.is_empty() {
        tracing::debug!(
            hits = hits.len(),
            "keyword gate would drop every hit, keeping ungated list"
        );
        hits
    } else {
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use localqa_core::types::Document;
    use std::sync::Arc;

    #[allow(clippy::cast_precision_loss)]
    fn hits_for(doc_id: &str, texts: &[&str], start: f32) -> Vec<ChunkHit> {
        let mut d = Document::new(doc_id, doc_id, Utc::now());
        for t in texts {
            d = d.with_chunk(*t, None);
        }
        let d = Arc::new(d);
        (0..texts.len())
            .filter_map(|i| ChunkHit::bare(Arc::clone(&d), i, start - i as f32 * 0.01))
            .collect()
    }

    #[test]
    fn pass_a_caps_each_document_and_the_pool() {
        let texts: Vec<String> = (0..15).map(|i| format!("chunk {i}")).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let mut hits = hits_for("a", &refs, 2.0);
        hits.extend(hits_for("b", &refs[..3], 1.0));
        let cfg = RerankConfig::default();
        let out = pass_a(&hits, &cfg);
        assert_eq!(out.len(), 13);
        assert_eq!(out.iter().filter(|h| h.document_id() == "a").count(), 10);
        assert_eq!(out[10].document_id(), "b");

        let small = RerankConfig { pool_cap: 4, ..RerankConfig::default() };
        assert_eq!(pass_a(&hits, &small).len(), 4);
    }

    #[test]
    fn count_questions_favor_chunks_with_digits() {
        let q = QueryProfile::new("how many rooms are listed");
        let hits = hits_for("a", &["rooms are listed below", "rooms listed: 4"], 1.0);
        let out = pass_b(&q, &hits, &RerankConfig::default(), &ScoringWeights::default());
        assert_eq!(out[0].chunk_id, "a:1");
    }

    #[test]
    fn subject_anchor_lifts_its_chunk() {
        let q = QueryProfile::new("amount for INV-2024-017");
        let hits = hits_for("a", &["amount for the other invoice", "INV-2024-017 settled"], 1.0);
        let out = pass_b(&q, &hits, &RerankConfig::default(), &ScoringWeights::default());
        assert_eq!(out[0].chunk_id, "a:1");
    }

    #[test]
    fn keyword_gate_falls_back_to_ungated() {
        let q = QueryProfile::new("garden hose warranty");
        let hits = hits_for("a", &["garden hose warranty two years", "hose only"], 1.0);
        let gated = keyword_gate(&q, hits.clone(), &RerankConfig::default());
        assert_eq!(gated.len(), 1);

        let q = QueryProfile::new("zebra");
        let gated = keyword_gate(&q, hits, &RerankConfig::default());
        assert_eq!(gated.len(), 2);
    }
}
