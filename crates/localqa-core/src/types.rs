//! Domain types read by the retrieval engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;

pub type DocumentId = String;
pub type ChunkId = String;

/// Suffix of the id given to the single chunk synthesized for a document
/// that carries no chunks of its own.
pub const SYNTHETIC_CHUNK_SUFFIX: &str = "#content";

/// A contiguous slice of a document's extracted text.
///
/// - `id`: unique within the corpus snapshot
/// - `page_number`: 1-based source page when the extractor knows it
/// - `text`: the extracted text payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    #[serde(default)]
    pub page_number: Option<u32>,
    pub text: String,
}

/// A corpus record owned by the document store.
///
/// Chunk order is significant: neighbor expansion walks it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub chunks: Vec<Chunk>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// Borrowed view of one retrievable unit of a document, real or synthetic.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkView<'a> {
    pub id: Cow<'a, str>,
    pub position: usize,
    pub page_number: Option<u32>,
    pub text: &'a str,
}

impl Document {
    pub fn new(id: impl Into<String>, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: String::new(),
            summary: None,
            chunks: Vec::new(),
            tags: BTreeSet::new(),
            category: String::new(),
            created_at,
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Appends a chunk with id `<doc id>:<index>`.
    #[must_use]
    pub fn with_chunk(mut self, text: impl Into<String>, page_number: Option<u32>) -> Self {
        let id = format!("{}:{}", self.id, self.chunks.len());
        self.chunks.push(Chunk { id, page_number, text: text.into() });
        self
    }

    /// Number of retrievable units; a chunkless document still has one.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len().max(1)
    }

    /// The chunk at `position`, or the whole content when the document has
    /// no chunks and `position` is 0.
    pub fn chunk_view(&self, position: usize) -> Option<ChunkView<'_>> {
        if self.chunks.is_empty() {
            return (position == 0).then(|| ChunkView {
                id: Cow::Owned(format!("{}{}", self.id, SYNTHETIC_CHUNK_SUFFIX)),
                position: 0,
                page_number: None,
                text: self.content.as_str(),
            });
        }
        self.chunks.get(position).map(|c| ChunkView {
            id: Cow::Borrowed(c.id.as_str()),
            position,
            page_number: c.page_number,
            text: c.text.as_str(),
        })
    }

    pub fn chunk_views(&self) -> Vec<ChunkView<'_>> {
        (0..self.chunk_count()).filter_map(|p| self.chunk_view(p)).collect()
    }

    /// Explicit summary if present, otherwise the full content.
    pub fn summary_or_content(&self) -> &str {
        match &self.summary {
            Some(s) if !s.trim().is_empty() => s.as_str(),
            _ => self.content.as_str(),
        }
    }
}

/// Conversational state threaded through one request.
///
/// `previous_document_id` names the document the prior turn was answered
/// from; it biases pronoun-style follow-ups toward that document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub previous_document_id: Option<DocumentId>,
}

impl SessionContext {
    pub fn following(document_id: impl Into<String>) -> Self {
        Self { previous_document_id: Some(document_id.into()) }
    }
}
