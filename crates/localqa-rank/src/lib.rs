//! localqa-rank
//!
//! Turns a question and a corpus snapshot into a small, ordered evidence
//! list, or decides the corpus holds no answer. Every stage consumes one hit
//! list and produces a new one.

pub mod classifier;
pub mod expand;
pub mod fallback;
pub mod gate;
pub mod hit;
pub mod ranker;
pub mod rerank;
pub mod selection;
pub mod trace;

pub use classifier::KeywordClassifier;
pub use gate::{GateDecision, GateReason};
pub use hit::ChunkHit;
pub use selection::{EvidenceSelector, SelectionOutcome, SelectionResult};
pub use trace::{JsonlTraceSink, TraceEntry, TraceSink};
