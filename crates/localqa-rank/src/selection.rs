//! The evidence selection pipeline: rank, gate, rerank, expand.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use localqa_core::config::RetrievalConfig;
use localqa_core::traits::{CategoryClassifier, CorpusProvider};
use localqa_core::types::{Document, DocumentId, SessionContext};
use localqa_text::QueryProfile;

use crate::classifier::KeywordClassifier;
use crate::expand::expand_neighbors;
use crate::fallback::score_documents;
use crate::gate::{self, GateDecision};
use crate::hit::ChunkHit;
use crate::ranker::rank_chunks;
use crate::rerank::{keyword_gate, pass_a, pass_b};
use crate::trace::{record_quietly, TraceEntry, TraceSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOutcome {
    /// Chunk hits passed the gate.
    Ranked,
    /// No chunk scored; documents were picked on their metadata.
    DocumentFallback,
    /// Nothing in the corpus is worth answering from.
    NoEvidence,
}

#[derive(Debug, Clone)]
pub struct SelectionResult {
    pub outcome: SelectionOutcome,
    pub gate: GateDecision,
    /// Documents in first-occurrence order of the evidence.
    pub documents: Vec<Arc<Document>>,
    /// Best evidence score per document.
    pub top_scores: BTreeMap<DocumentId, f32>,
    pub evidence: Vec<ChunkHit>,
    /// Size of the ranked list before gating, for diagnostics.
    pub ranked_count: usize,
}

impl SelectionResult {
    fn no_evidence(gate: GateDecision, ranked_count: usize) -> Self {
        Self {
            outcome: SelectionOutcome::NoEvidence,
            gate,
            documents: Vec::new(),
            top_scores: BTreeMap::new(),
            evidence: Vec::new(),
            ranked_count,
        }
    }

    fn from_evidence(
        outcome: SelectionOutcome,
        gate: GateDecision,
        evidence: Vec<ChunkHit>,
        ranked_count: usize,
    ) -> Self {
        let mut documents: Vec<Arc<Document>> = Vec::new();
        let mut top_scores: BTreeMap<DocumentId, f32> = BTreeMap::new();
        for hit in &evidence {
            match top_scores.get_mut(hit.document_id()) {
                Some(best) => *best = best.max(hit.final_score),
                None => {
                    top_scores.insert(hit.document_id().to_string(), hit.final_score);
                    documents.push(Arc::clone(&hit.document));
                }
            }
        }
        Self { outcome, gate, documents, top_scores, evidence, ranked_count }
    }

    pub fn has_evidence(&self) -> bool {
        self.outcome != SelectionOutcome::NoEvidence
    }

    /// The document the answer is primarily grounded in.
    pub fn primary(&self) -> Option<&Arc<Document>> {
        self.documents.first()
    }

    pub fn top_score(&self, document_id: &str) -> f32 {
        self.top_scores.get(document_id).copied().unwrap_or(0.0)
    }
}

/// Runs one question against one corpus snapshot. Holds no state that
/// survives a call besides its configuration and collaborators.
pub struct EvidenceSelector {
    config: RetrievalConfig,
    classifier: Box<dyn CategoryClassifier>,
    trace: Option<Box<dyn TraceSink>>,
}

impl EvidenceSelector {
    pub fn new(config: RetrievalConfig) -> Self {
        Self { config, classifier: Box::new(KeywordClassifier::new()), trace: None }
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: Box<dyn CategoryClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    #[must_use]
    pub fn with_trace_sink(mut self, sink: Box<dyn TraceSink>) -> Self {
        self.trace = Some(sink);
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn select<C>(&self, question: &str, corpus: &C, session: &SessionContext) -> SelectionResult
    where
        C: CorpusProvider + ?Sized,
    {
        self.select_documents(question, &corpus.eligible_documents(), session)
    }

    #[tracing::instrument(skip_all, fields(documents = documents.len()))]
    pub fn select_documents(
        &self,
        question: &str,
        documents: &[Arc<Document>],
        session: &SessionContext,
    ) -> SelectionResult {
        let query = QueryProfile::new(question);
        let predicted = self.classifier.classify(question);
        let ranked = rank_chunks(&query, documents, &self.config, session, predicted.as_deref());

        let result = if ranked.is_empty() {
            self.fallback(&query, documents)
        } else {
            self.from_ranked(&query, &ranked)
        };

        tracing::info!(
            outcome = ?result.outcome,
            gate = ?result.gate.reason,
            ranked = result.ranked_count,
            evidence = result.evidence.len(),
            primary = result.primary().map(|d| d.id.as_str()),
            "evidence selected"
        );
        if let Some(sink) = &self.trace {
            let entry = TraceEntry::new(
                question,
                result.outcome,
                result.gate.reason,
                &ranked,
                &result.evidence,
            );
            record_quietly(sink.as_ref(), &entry);
        }
        result
    }

    fn from_ranked(&self, query: &QueryProfile, ranked: &[ChunkHit]) -> SelectionResult {
        let scores: Vec<f32> = ranked.iter().map(|h| h.final_score).collect();
        let decision = gate::evaluate(&scores, &self.config.gate);
        if !decision.passed() {
            tracing::debug!(
                best = decision.best,
                median = decision.median,
                second = decision.second,
                "evidence gate rejected"
            );
            return SelectionResult::no_evidence(decision, ranked.len());
        }

        let pool = pass_a(ranked, &self.config.rerank);
        let top = pass_b(query, &pool, &self.config.rerank, &self.config.weights);
        let gated = keyword_gate(query, top, &self.config.rerank);
        let expanded = expand_neighbors(&gated, &self.config.expansion);
        tracing::debug!(
            pool = pool.len(),
            gated = gated.len(),
            expanded = expanded.len(),
            "reranked evidence"
        );
        SelectionResult::from_evidence(SelectionOutcome::Ranked, decision, expanded, ranked.len())
    }

    fn fallback(&self, query: &QueryProfile, documents: &[Arc<Document>]) -> SelectionResult {
        let decision = gate::evaluate(&[], &self.config.gate);
        let scored = score_documents(query, documents, &self.config.fallback, &self.config.weights);
        if scored.is_empty() {
            return SelectionResult::no_evidence(decision, 0);
        }
        let evidence: Vec<ChunkHit> = scored
            .into_iter()
            .filter_map(|s| ChunkHit::bare(s.document, 0, s.score))
            .collect();
        tracing::debug!(documents = evidence.len(), "no chunk scored, using document fallback");
        SelectionResult::from_evidence(SelectionOutcome::DocumentFallback, decision, evidence, 0)
    }
}

impl Default for EvidenceSelector {
    fn default() -> Self {
        Self::new(RetrievalConfig::default())
    }
}
