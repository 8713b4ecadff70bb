//! Optional diagnostics trail: one hashed, truncated JSON line per request.

use std::fs::OpenOptions;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::Serialize;
use twox_hash::XxHash64;

use crate::gate::GateReason;
use crate::hit::ChunkHit;
use crate::selection::SelectionOutcome;

const PREVIEW_CHARS: usize = 80;
const TRACED_HITS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TracedHit {
    pub document_id: String,
    pub chunk_id: String,
    pub score: f32,
    pub preview: String,
}

/// The question itself is never stored, only its hash and length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    pub question_hash: String,
    pub question_chars: usize,
    pub outcome: SelectionOutcome,
    pub gate: GateReason,
    pub ranked_count: usize,
    pub ranked: Vec<TracedHit>,
    pub selected: Vec<TracedHit>,
}

impl TraceEntry {
    pub fn new(
        question: &str,
        outcome: SelectionOutcome,
        gate: GateReason,
        ranked: &[ChunkHit],
        selected: &[ChunkHit],
    ) -> Self {
        Self {
            question_hash: question_hash(question),
            question_chars: question.chars().count(),
            outcome,
            gate,
            ranked_count: ranked.len(),
            ranked: ranked.iter().take(TRACED_HITS).map(traced).collect(),
            selected: selected.iter().take(TRACED_HITS).map(traced).collect(),
        }
    }
}

fn traced(hit: &ChunkHit) -> TracedHit {
    TracedHit {
        document_id: hit.document_id().to_string(),
        chunk_id: hit.chunk_id.clone(),
        score: hit.final_score,
        preview: hit.text().chars().take(PREVIEW_CHARS).collect(),
    }
}

/// Hex XxHash64 of the question text.
pub fn question_hash(question: &str) -> String {
    let mut hasher = XxHash64::with_seed(0);
    question.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

pub trait TraceSink: Send + Sync {
    fn record(&self, entry: &TraceEntry) -> Result<()>;
}

/// Appends entries to a JSON-lines file.
pub struct JsonlTraceSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlTraceSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TraceSink for JsonlTraceSink {
    fn record(&self, entry: &TraceEntry) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| anyhow::anyhow!("trace sink lock poisoned"))?;
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening trace file {}", self.path.display()))?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

/// Records `entry`, logging and dropping any failure.
pub fn record_quietly(sink: &dyn TraceSink, entry: &TraceEntry) {
    if let Err(e) = sink.record(entry) {
        tracing::warn!(error = %e, "failed to write retrieval trace");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use localqa_core::types::Document;
    use std::sync::Arc;

    fn hit() -> ChunkHit {
        let long = "x".repeat(200);
        let d = Arc::new(Document::new("d", "D", Utc::now()).with_chunk(long, None));
        ChunkHit::bare(d, 0, 1.5).unwrap()
    }

    #[test]
    fn entry_hides_question_and_truncates_text() {
        let h = hit();
        let (outcome, gate) = (SelectionOutcome::Ranked, GateReason::AbsoluteFloor);
        let e = TraceEntry::new("my secret question", outcome, gate, &[h.clone()], &[h]);
        assert_eq!(e.question_hash.len(), 16);
        assert_eq!(e.question_hash, question_hash("my secret question"));
        assert_eq!(e.question_chars, 18);
        assert_eq!(e.ranked[0].preview.len(), PREVIEW_CHARS);
        assert!(!serde_json::to_string(&e).unwrap().contains("secret"));
    }

    #[test]
    fn jsonl_sink_appends_lines() {
        let tmp = tempfile::TempDir::new().unwrap();
        let sink = JsonlTraceSink::new(tmp.path().join("trace.jsonl"));
        let e = TraceEntry::new("q", SelectionOutcome::NoEvidence, GateReason::NoScores, &[], &[]);
        sink.record(&e).unwrap();
        sink.record(&e).unwrap();
        let body = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(body.lines().count(), 2);
        let parsed: serde_json::Value = serde_json::from_str(body.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["outcome"], "no_evidence");
    }

    #[test]
    fn unwritable_sink_is_swallowed() {
        let tmp = tempfile::TempDir::new().unwrap();
        let sink = JsonlTraceSink::new(tmp.path().join("missing/dir/trace.jsonl"));
        let e = TraceEntry::new("q", SelectionOutcome::NoEvidence, GateReason::NoScores, &[], &[]);
        assert!(sink.record(&e).is_err());
        record_quietly(&sink, &e);
    }
}
