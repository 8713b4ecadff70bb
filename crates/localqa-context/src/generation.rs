//! Question answering on top of selection: request tracking, prompt
//! assembly and the call to the text-generation service.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use localqa_core::config::{BudgetConfig, SamplingConfig};
use localqa_core::traits::CorpusProvider;
use localqa_core::types::{DocumentId, SessionContext};
use localqa_core::{Error, Result};
use localqa_rank::{EvidenceSelector, SelectionOutcome};

use crate::budget::allocate;
use crate::prompt::{compose_prompt, NOT_SPECIFIED};

/// Identifies one question. Only the most recently issued token is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Hands out monotonically increasing request ids. Issuing a new one makes
/// every earlier token stale.
#[derive(Debug, Default)]
pub struct RequestTracker {
    current: AtomicU64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> RequestToken {
        RequestToken(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.current.load(Ordering::SeqCst) == token.0
    }

    /// Invalidates the outstanding request without starting another.
    pub fn cancel(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub token: RequestToken,
    pub prompt: String,
    pub sampling: SamplingConfig,
}

/// Opaque prompt-to-text model.
pub trait GenerationService: Send + Sync {
    fn generate(&self, request: GenerationRequest) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub token: RequestToken,
    pub text: String,
    pub outcome: SelectionOutcome,
    pub primary_document: Option<DocumentId>,
    pub cited_documents: Vec<DocumentId>,
}

pub struct Assistant<C: ?Sized, G> {
    corpus: Arc<C>,
    selector: Arc<EvidenceSelector>,
    generator: G,
    tracker: RequestTracker,
    budget: BudgetConfig,
    sampling: SamplingConfig,
}

impl<C, G> Assistant<C, G>
where
    C: CorpusProvider + ?Sized + 'static,
    G: GenerationService,
{
    pub fn new(
        corpus: Arc<C>,
        selector: EvidenceSelector,
        generator: G,
        sampling: SamplingConfig,
    ) -> Self {
        let budget = selector.config().budget.clone();
        Self {
            corpus,
            selector: Arc::new(selector),
            generator,
            tracker: RequestTracker::new(),
            budget,
            sampling,
        }
    }

    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    /// Answers `question` from the corpus. A newer `ask` started while this
    /// one is in flight turns this one's result into [`Error::Cancelled`].
    pub async fn ask(&self, question: &str, session: &SessionContext) -> Result<Answer> {
        let token = self.tracker.begin();
        let corpus = Arc::clone(&self.corpus);
        let selector = Arc::clone(&self.selector);
        let owned_question = question.to_string();
        let owned_session = session.clone();
        let selection = tokio::task::spawn_blocking(move || {
            selector.select(&owned_question, corpus.as_ref(), &owned_session)
        })
        .await
            .map_err(|e| Error::Operation(format!("selection worker failed: {e}")))?;
        self.ensure_current(token)?;

        let primary_document = selection.primary().map(|d| d.id.clone());
        let cited_documents: Vec<DocumentId> =
            selection.documents.iter().map(|d| d.id.clone()).collect();
        if !selection.has_evidence() {
            tracing::info!(request = token.id(), "no evidence, answering not specified");
            return Ok(Answer {
                token,
                text: NOT_SPECIFIED.to_string(),
                outcome: selection.outcome,
                primary_document,
                cited_documents,
            });
        }

        let evidence = allocate(&selection, &self.budget);
        let prompt = compose_prompt(question, &evidence.text);
        tracing::debug!(
            request = token.id(),
            evidence_chars = evidence.char_count(),
            prompt_chars = prompt.len(),
            "calling generation service"
        );
        let text = self
            .generator
            .generate(GenerationRequest { token, prompt, sampling: self.sampling.clone() })
            .await?;
        self.ensure_current(token)?;

        Ok(Answer {
            token,
            text: text.trim().to_string(),
            outcome: selection.outcome,
            primary_document,
            cited_documents,
        })
    }

    fn ensure_current(&self, token: RequestToken) -> Result<()> {
        if self.tracker.is_current(token) {
            Ok(())
        } else {
            tracing::debug!(request = token.id(), "discarding stale request");
            Err(Error::Cancelled(token.id()))
        }
    }
}
