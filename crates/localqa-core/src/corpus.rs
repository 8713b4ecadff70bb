//! Corpus providers: an in-memory snapshot and a directory of extracted
//! `.txt` files.
//!
//! A directory corpus turns each text file into one [`Document`]. Form feeds
//! (`\f`) separate pages; blank lines separate paragraphs, and each paragraph
//! becomes a chunk unless it is too long, in which case it is split into
//! overlapping word windows.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Error;
use crate::traits::CorpusProvider;
use crate::types::{Chunk, Document};

const PAGE_BREAK: char = '\u{000C}';

#[derive(Debug, Clone, Default)]
pub struct InMemoryCorpus {
    documents: Vec<Arc<Document>>,
}

impl InMemoryCorpus {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents: documents.into_iter().map(Arc::new).collect() }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl CorpusProvider for InMemoryCorpus {
    fn eligible_documents(&self) -> Vec<Arc<Document>> {
        self.documents.clone()
    }

    fn document(&self, id: &str) -> Option<Arc<Document>> {
        self.documents.iter().find(|d| d.id == id).cloned()
    }
}

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub max_tokens: usize,
    pub words_per_chunk: usize,
    pub overlap_percent: f32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_tokens: 500, words_per_chunk: 300, overlap_percent: 0.2 }
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryCorpus {
    root: PathBuf,
    inner: InMemoryCorpus,
}

impl DirectoryCorpus {
    pub fn load(root: &Path) -> Result<Self> {
        Self::load_with(root, &ChunkingConfig::default())
    }

    pub fn load_with(root: &Path, chunking: &ChunkingConfig) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::NotFound(format!("corpus directory {}", root.display())).into());
        }
        let files = list_txt_files(root);
        if files.is_empty() {
            tracing::warn!(root = %root.display(), "no .txt files found");
        }
        let mut documents = Vec::with_capacity(files.len());
        for file_path in &files {
            let document = read_document(root, file_path, chunking)
                .with_context(|| format!("failed to load {}", file_path.display()))?;
            tracing::debug!(doc = %document.id, chunks = document.chunks.len(), "loaded document");
            documents.push(document);
        }
        tracing::info!(
            documents = documents.len(),
            chunks = documents.iter().map(|d| d.chunks.len()).sum::<usize>(),
            "directory corpus loaded"
        );
        Ok(Self { root: root.to_path_buf(), inner: InMemoryCorpus::new(documents) })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl CorpusProvider for DirectoryCorpus {
    fn eligible_documents(&self) -> Vec<Arc<Document>> {
        self.inner.eligible_documents()
    }

    fn document(&self, id: &str) -> Option<Arc<Document>> {
        self.inner.document(id)
    }
}

fn read_document(
    root: &Path,
    file_path: &Path,
    chunking: &ChunkingConfig,
) -> crate::Result<Document> {
    let raw = match fs::read_to_string(file_path) {
        Ok(content) => content,
        Err(_) => String::from_utf8_lossy(&fs::read(file_path)?).to_string(),
    };
    let relative = file_path.strip_prefix(root).unwrap_or(file_path);
    let id = relative.to_string_lossy().replace('\\', "/");
    let title = file_path
        .file_stem()
        .map_or_else(|| id.clone(), |s| s.to_string_lossy().to_string());
    let category = relative
        .parent()
        .and_then(Path::to_str)
        .filter(|p| !p.is_empty())
        .unwrap_or("misc")
        .to_string();
    let created_at = fs::metadata(file_path)
        .and_then(|m| m.modified())
        .map_or_else(|_| DateTime::<Utc>::from(std::time::UNIX_EPOCH), DateTime::<Utc>::from);

    let paged = raw.contains(PAGE_BREAK);
    let mut chunks = Vec::new();
    for (page_index, page) in raw.split(PAGE_BREAK).enumerate() {
        let page_number = if paged { u32::try_from(page_index + 1).ok() } else { None };
        for text in chunk_page(page, chunking) {
            chunks.push(Chunk { id: format!("{}:{}", id, chunks.len()), page_number, text });
        }
    }

    Ok(Document {
        content: raw.replace(PAGE_BREAK, "\n\n"),
        chunks,
        category,
        ..Document::new(id, title, created_at)
    })
}

fn chunk_page(page: &str, chunking: &ChunkingConfig) -> Vec<String> {
    let mut out = Vec::new();
    for paragraph in page.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        if count_tokens(paragraph) <= chunking.max_tokens {
            out.push(paragraph.to_string());
        } else {
            out.extend(split_paragraph_with_overlap(paragraph, chunking));
        }
    }
    out
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn count_tokens(text: &str) -> usize {
    let word_count = text.split_whitespace().count();
    (word_count as f32 / 0.75) as usize
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn split_paragraph_with_overlap(paragraph: &str, chunking: &ChunkingConfig) -> Vec<String> {
    let words: Vec<&str> = paragraph.split_whitespace().collect();
    let words_per_chunk = chunking.words_per_chunk.max(1);
    let overlap_words =
        ((words_per_chunk as f32 * chunking.overlap_percent) as usize).min(words_per_chunk - 1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + words_per_chunk).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end >= words.len() {
            break;
        }
        start = end - overlap_words;
    }
    chunks
}

fn list_txt_files(root: &Path) -> Vec<PathBuf> {
    let mut txt_files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("txt"))
        .map(|e| e.path().to_path_buf())
        .collect();
    txt_files.sort();
    txt_files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_paragraph_splits_with_overlap() {
        let text = (0..700).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let chunks = split_paragraph_with_overlap(&text, &ChunkingConfig::default());
        assert_eq!(chunks.len(), 3);
        assert!(chunks[1].starts_with("w240 "), "second window starts 60 words back");
    }

    #[test]
    fn short_paragraphs_stay_whole() {
        let chunks = chunk_page("first para\n\n\n\nsecond para", &ChunkingConfig::default());
        assert_eq!(chunks, vec!["first para".to_string(), "second para".to_string()]);
    }
}
