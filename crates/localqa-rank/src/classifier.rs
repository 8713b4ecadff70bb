//! Keyword-cue category classifier for the doc-type metadata signal.

use localqa_core::traits::CategoryClassifier;
use localqa_text::tokenize;

/// Labels and their cue tokens, as produced by [`tokenize`] (lowercase,
/// long plurals folded). Declaration order breaks ties.
const LABELS: &[(&str, &[&str])] = &[
    ("invoice", &["invoice", "bill", "billing", "due", "amount", "vat", "payable", "inv"]),
    ("receipt", &["receipt", "purchase", "paid", "store", "refund", "order", "bought"]),
    (
        "contract",
        &["contract", "agreement", "lease", "tenant", "landlord", "term", "clause", "signed"],
    ),
    (
        "medical",
        &["medical", "doctor", "prescription", "diagnosi", "hospital", "clinic", "vaccine", "dose"],
    ),
    (
        "identity",
        &["passport", "identity", "license", "licence", "birth", "citizenship", "visa", "expiry"],
    ),
    ("tax", &["tax", "return", "irs", "deduction", "income", "refund", "assessment"]),
    ("bank", &["bank", "account", "statement", "iban", "transfer", "balance", "deposit", "loan"]),
    (
        "insurance",
        &["insurance", "policy", "premium", "claim", "coverage", "insured", "deductible"],
    ),
    (
        "travel",
        &["flight", "hotel", "booking", "travel", "trip", "itinerary", "boarding", "reservation"],
    ),
    ("recipe", &["recipe", "cook", "cooking", "bake", "ingredient", "oven", "flour", "sugar"]),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn labels() -> impl Iterator<Item = &'static str> {
        LABELS.iter().map(|(label, _)| *label)
    }
}

impl CategoryClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Option<String> {
        let tokens = tokenize(text);
        let mut best: Option<(&str, usize)> = None;
        for (label, cues) in LABELS {
            let hits = tokens.iter().filter(|t| cues.contains(&t.as_str())).count();
            if hits > best.map_or(0, |(_, n)| n) {
                best = Some((*label, hits));
            }
        }
        best.map(|(label, _)| label.to_string())
    }
}
