use std::cmp::Ordering;
use std::sync::Arc;

use localqa_core::types::{ChunkId, ChunkView, Document};

/// One scored chunk. Stages never edit a hit; they derive new ones.
#[derive(Debug, Clone)]
pub struct ChunkHit {
    pub document: Arc<Document>,
    pub chunk_id: ChunkId,
    /// Index of the chunk within its document's ordered chunk list.
    pub position: usize,
    pub semantic_score: f32,
    pub doc_type_match: f32,
    pub tag_match: f32,
    pub title_match: f32,
    pub exact_token_match: f32,
    pub phrase_match: f32,
    pub numeric_match: f32,
    pub final_score: f32,
}

impl ChunkHit {
    /// A hit carrying only a score, for chunks pulled in without being
    /// scored themselves.
    pub fn bare(document: Arc<Document>, position: usize, final_score: f32) -> Option<Self> {
        let chunk_id = document.chunk_view(position)?.id.into_owned();
        Some(Self {
            document,
            chunk_id,
            position,
            semantic_score: 0.0,
            doc_type_match: 0.0,
            tag_match: 0.0,
            title_match: 0.0,
            exact_token_match: 0.0,
            phrase_match: 0.0,
            numeric_match: 0.0,
            final_score,
        })
    }

    pub fn document_id(&self) -> &str {
        &self.document.id
    }

    pub fn chunk(&self) -> Option<ChunkView<'_>> {
        self.document.chunk_view(self.position)
    }

    pub fn text(&self) -> &str {
        self.chunk().map_or("", |c| c.text)
    }

    pub fn page_number(&self) -> Option<u32> {
        self.chunk().and_then(|c| c.page_number)
    }

    #[must_use]
    pub fn rescored(&self, final_score: f32) -> Self {
        Self { final_score, ..self.clone() }
    }
}

/// Descending final score, then descending semantic score, then newer
/// documents first.
pub fn compare_hits(a: &ChunkHit, b: &ChunkHit) -> Ordering {
    b.final_score
        .total_cmp(&a.final_score)
        .then_with(|| b.semantic_score.total_cmp(&a.semantic_score))
        .then_with(|| b.document.created_at.cmp(&a.document.created_at))
}

/// Stable sort by [`compare_hits`]; equal hits keep corpus order.
pub fn sort_hits(hits: &mut [ChunkHit]) {
    hits.sort_by(compare_hits);
}
