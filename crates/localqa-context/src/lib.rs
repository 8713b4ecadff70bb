//! localqa-context
//!
//! Everything downstream of evidence selection: the character budget that
//! packs evidence into a prompt, the prompt itself, and request tracking
//! around the text-generation service.

pub mod budget;
pub mod generation;
pub mod prompt;

pub use budget::{allocate, RenderedEvidence};
pub use generation::{
    Answer, Assistant, GenerationRequest, GenerationService, RequestToken, RequestTracker,
};
pub use prompt::{compose_prompt, NOT_SPECIFIED};
