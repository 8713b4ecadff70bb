use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use localqa_context::budget::allocate;
use localqa_context::{Assistant, GenerationRequest, GenerationService, NOT_SPECIFIED};
use localqa_core::config::{BudgetConfig, SamplingConfig};
use localqa_core::corpus::InMemoryCorpus;
use localqa_core::types::{Document, SessionContext};
use localqa_core::{Error, Result};
use localqa_rank::{EvidenceSelector, SelectionOutcome, SelectionResult};

fn invoice_corpus() -> Arc<InMemoryCorpus> {
    let created = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
    let invoice = Document::new("inv", "Invoice 2024-01", created)
        .with_category("invoice")
        .with_chunk("Total due: 450 EUR, issued 2024-01-15", None);
    let lease = Document::new("lease", "Flat lease", created)
        .with_chunk("Monthly rent is 900 EUR, payable on the first day of each month", Some(1))
        .with_chunk("The deposit equals two monthly rents", Some(1));
    Arc::new(InMemoryCorpus::new(vec![invoice, lease]))
}

fn select(question: &str) -> SelectionResult {
    let corpus = invoice_corpus();
    EvidenceSelector::default().select(question, corpus.as_ref(), &SessionContext::default())
}

fn assistant() -> Assistant<InMemoryCorpus, EchoService> {
    let selector = EvidenceSelector::default();
    Assistant::new(invoice_corpus(), selector, EchoService::default(), SamplingConfig::default())
}

/// Returns the evidence section of the prompt; questions containing
/// "slowly" take a while.
#[derive(Default)]
struct EchoService {
    calls: AtomicUsize,
}

impl GenerationService for EchoService {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.prompt.contains("slowly") {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        if request.prompt.contains("explode") {
            return Err(Error::Generation("model unavailable".to_string()));
        }
        let evidence = request.prompt.split("Evidence:\n").nth(1).unwrap_or_default();
        Ok(format!(" {} ", evidence.split("\n\nQuestion:").next().unwrap_or_default()))
    }
}

#[test]
fn evidence_block_holds_the_amount_and_fits_budget() {
    let selection = select("What is the total due?");
    let rendered = allocate(&selection, &BudgetConfig::default());
    assert!(rendered.text.contains("450 EUR"));
    assert!(rendered.text.starts_with("Document: Invoice 2024-01"));
    assert!(rendered.char_count() <= BudgetConfig::default().total_chars);
}

#[test]
fn tiny_budgets_never_overflow_or_split_words() {
    let selection = select("monthly rent deposit");
    assert!(selection.has_evidence());
    let full = allocate(&selection, &BudgetConfig::default()).text;
    for total in [1usize, 10, 25, 40, 60, 90, 150] {
        let config = BudgetConfig { total_chars: total, min_reserve: 5, ..BudgetConfig::default() };
        let rendered = allocate(&selection, &config);
        assert!(rendered.char_count() <= total, "{total}: {:?}", rendered.text);
        for word in rendered.text.split_whitespace() {
            assert!(full.split_whitespace().any(|w| w == word), "{total}: split word {word:?}");
        }
    }
}

#[tokio::test]
async fn answers_from_evidence() {
    let assistant = assistant();
    let answer = assistant.ask("What is the total due?", &SessionContext::default()).await.unwrap();
    assert_eq!(answer.outcome, SelectionOutcome::Ranked);
    assert!(answer.text.contains("450 EUR"));
    assert!(!answer.text.starts_with(' '));
    assert_eq!(answer.primary_document.as_deref(), Some("inv"));
    assert!(answer.cited_documents.contains(&"inv".to_string()));
}

#[tokio::test]
async fn no_evidence_skips_generation() {
    let assistant = assistant();
    let answer =
        assistant.ask("What is my passport number?", &SessionContext::default()).await.unwrap();
    assert_eq!(answer.text, NOT_SPECIFIED);
    assert_eq!(answer.outcome, SelectionOutcome::NoEvidence);
    assert!(answer.primary_document.is_none());
}

#[tokio::test]
async fn superseded_question_is_cancelled() {
    let assistant = assistant();
    let session = SessionContext::default();
    let (first, second) = futures::join!(
        assistant.ask("What is the total due, slowly?", &session),
        assistant.ask("What is the monthly rent?", &session),
    );
    assert!(matches!(first, Err(Error::Cancelled(_))), "{first:?}");
    let second = second.unwrap();
    assert!(second.text.contains("900 EUR"));
}

#[tokio::test]
async fn generation_failures_surface() {
    let assistant = assistant();
    let err = assistant.ask("explode the total due", &SessionContext::default()).await.unwrap_err();
    assert!(matches!(err, Error::Generation(_)));
}
