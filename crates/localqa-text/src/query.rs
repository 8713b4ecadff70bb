//! Everything the scorers need to know about one question, derived once.

use std::collections::HashSet;

use crate::analyzer::{is_anchor_stopword, is_stopword};
use crate::features::LexicalFeatures;
use crate::tokenize::{
	alnum_padded, digit_count, is_number_heavy, is_short_acronym, raw_terms, tokenize, trigrams,
};

const MIN_PHRASE_CHARS: usize = 6;

const COUNT_CUES: &[&str] = &["how many", "number of", "count", "total"];

const NUMERIC_INTENT_CUES: &[&str] = &[
	"total", "amount", "due", "price", "cost", "balance", "sum", "fee", "fees", "number", "much",
	"many", "date", "paid", "owed", "charge", "charged",
];

/// A question term that must appear verbatim (as whole words) to count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactToken {
	pub raw: String,
	/// Lowercased alphanumeric words joined by single spaces.
	pub needle: String,
	pub number_heavy: bool,
	pub short_acronym: bool,
}

/// A question term judged to name the specific subject being asked about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
	pub raw: String,
	pub needle: String,
	/// Normalized tokens of the anchor, for plural-tolerant matching.
	pub stems: Vec<String>,
	/// Anchors carrying digits or hyphens only match verbatim.
	pub strict: bool,
	/// Capitalized away from the start of the question, or internally.
	pub proper: bool,
}

impl Anchor {
	pub fn matches(&self, features: &LexicalFeatures) -> bool {
		if features.contains_phrase(&self.needle) {
			return true;
		}
		!self.strict
			&& !self.stems.is_empty()
			&& self.stems.iter().all(|s| features.contains_token(s))
	}

	/// Ordering key for picking the subject: identifiers beat acronyms beat
	/// plain words, then longer beats shorter.
	pub fn strength(&self) -> (u8, usize) {
		let class = if digit_count(&self.raw) > 0 || self.raw.contains('-') {
			3
		} else if is_short_acronym(&self.raw) {
			2
		} else if self.proper {
			1
		} else {
			0
		};
		(class, self.raw.chars().count())
	}
}

#[derive(Debug, Clone)]
pub struct QueryProfile {
	pub text: String,
	/// Deduplicated normalized tokens in question order.
	pub terms: Vec<String>,
	pub trigrams: HashSet<String>,
	pub exact_tokens: Vec<ExactToken>,
	pub phrases: Vec<String>,
	pub anchors: Vec<Anchor>,
	pub subject: Option<Anchor>,
	pub is_count_question: bool,
	pub has_numeric_intent: bool,
}

impl QueryProfile {
	pub fn new(question: &str) -> Self {
		let mut terms: Vec<String> = Vec::new();
		for t in tokenize(question) {
			if !terms.contains(&t) {
				terms.push(t);
			}
		}
		let raw = raw_terms(question);
		let exact_tokens = exact_tokens(&raw);
		let anchors = anchors(&raw);
		let subject = anchors
			.iter()
			.fold(None::<&Anchor>, |best, a| match best {
				Some(b) if b.strength() >= a.strength() => Some(b),
				_ => Some(a),
			})
			.cloned();
		let words: Vec<String> =
			alnum_padded(question).split_whitespace().map(str::to_string).collect();
		let padded = format!(" {} ", words.join(" "));
		let is_count_question = COUNT_CUES.iter().any(|cue| padded.contains(&format!(" {cue} ")));
		let has_numeric_intent = is_count_question
			|| words.iter().any(|w| NUMERIC_INTENT_CUES.contains(&w.as_str()))
			|| exact_tokens.iter().any(|t| t.number_heavy);

		Self {
			text: question.to_string(),
			terms,
			trigrams: trigrams(question),
			exact_tokens,
			phrases: phrases(&words),
			anchors,
			subject,
			is_count_question,
			has_numeric_intent,
		}
	}

	pub fn has_anchors(&self) -> bool {
		!self.anchors.is_empty()
	}

	/// An identifier, acronym or proper noun; plain long words do not count.
	pub fn has_strong_anchor(&self) -> bool {
		self.anchors.iter().any(|a| a.strength().0 > 0)
	}

	pub fn numeric_tokens(&self) -> impl Iterator<Item = &ExactToken> {
		self.exact_tokens.iter().filter(|t| t.number_heavy)
	}

	pub fn acronym_tokens(&self) -> impl Iterator<Item = &ExactToken> {
		self.exact_tokens.iter().filter(|t| t.short_acronym)
	}

	/// Query terms present in the chunk, counting each term once.
	pub fn keyword_overlap(&self, features: &LexicalFeatures) -> usize {
		self.terms.iter().filter(|t| features.contains_token(t)).count()
	}
}

fn needle_of(raw: &str) -> String {
	alnum_padded(raw).trim().to_string()
}

fn exact_tokens(raw: &[String]) -> Vec<ExactToken> {
	let mut out: Vec<ExactToken> = Vec::new();
	for term in raw {
		let lower = term.to_lowercase();
		if is_stopword(&lower) {
			continue;
		}
		let len = term.chars().count();
		let short_acronym = is_short_acronym(term);
		let marked = digit_count(term) > 0 || term.contains('-');
		let min_len = if short_acronym || marked { 2 } else { 4 };
		if len < min_len {
			continue;
		}
		let needle = needle_of(term);
		if needle.is_empty() || out.iter().any(|t| t.needle == needle) {
			continue;
		}
		out.push(ExactToken {
			raw: term.clone(),
			needle,
			number_heavy: is_number_heavy(term),
			short_acronym,
		});
	}
	out
}

fn anchors(raw: &[String]) -> Vec<Anchor> {
	let mut out: Vec<Anchor> = Vec::new();
	for (index, term) in raw.iter().enumerate() {
		let lower = term.to_lowercase();
		let len = term.chars().count();
		if len < 2 || is_anchor_stopword(&lower) {
			continue;
		}
		let has_digit = digit_count(term) > 0;
		let has_hyphen = term.contains('-');
		let qualifies = len >= 5
			|| is_short_acronym(term)
			|| term.chars().any(char::is_uppercase)
			|| has_digit
			|| has_hyphen;
		if !qualifies {
			continue;
		}
		let needle = needle_of(term);
		if needle.is_empty() || out.iter().any(|a| a.needle == needle) {
			continue;
		}
		let capitalized = term.chars().next().is_some_and(char::is_uppercase);
		let proper = (index > 0 && capitalized) || term.chars().skip(1).any(char::is_uppercase);
		out.push(Anchor {
			raw: term.clone(),
			needle,
			stems: tokenize(term),
			strict: has_digit || has_hyphen,
			proper,
		});
	}
	out
}

fn phrases(words: &[String]) -> Vec<String> {
	let content: Vec<&str> = words.iter().map(String::as_str).filter(|w| !is_stopword(w)).collect();
	let mut out: Vec<String> = Vec::new();
	for size in [2usize, 3] {
		for window in content.windows(size) {
			let phrase = window.join(" ");
			if phrase.chars().count() >= MIN_PHRASE_CHARS && !out.contains(&phrase) {
				out.push(phrase);
			}
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn total_due_question() {
		let q = QueryProfile::new("What is the total due?");
		assert_eq!(q.terms, vec!["total", "due"]);
		let exact: Vec<&str> = q.exact_tokens.iter().map(|t| t.needle.as_str()).collect();
		assert_eq!(exact, vec!["total"]);
		assert_eq!(q.phrases, vec!["total due"]);
		assert!(q.anchors.is_empty(), "question words and quantity words are not anchors");
		assert!(q.has_numeric_intent);
		assert!(q.is_count_question);
	}

	#[test]
	fn identifier_becomes_subject() {
		let q = QueryProfile::new("What is invoice INV-2024-017 amount?");
		let anchors: Vec<&str> = q.anchors.iter().map(|a| a.raw.as_str()).collect();
		assert_eq!(anchors, vec!["invoice", "INV-2024-017"]);
		let subject = q.subject.clone().expect("subject");
		assert_eq!(subject.needle, "inv 2024 017");
		assert!(subject.strict);
		assert!(q.numeric_tokens().any(|t| t.needle == "inv 2024 017"));
	}

	#[test]
	fn short_acronyms_are_exact_tokens_and_anchors() {
		let q = QueryProfile::new("Which VAT rate applies?");
		assert!(q.acronym_tokens().any(|t| t.needle == "vat"));
		assert_eq!(q.subject.map(|a| a.raw), Some("VAT".to_string()));
	}

	#[test]
	fn pronoun_follow_up_has_no_anchors() {
		let q = QueryProfile::new("when does it expire?");
		assert!(!q.has_strong_anchor());
		assert!(QueryProfile::new("when does the Lisbon lease expire?").has_strong_anchor());
		assert!(!q.is_count_question);
	}

	#[test]
	fn apostrophe_names_are_proper_anchors() {
		let q = QueryProfile::new("When did O'Brien sign the lease?");
		let subject = q.subject.clone().expect("subject");
		assert_eq!(subject.raw, "O'Brien");
		assert!(subject.proper);
		assert!(q.has_strong_anchor());
		assert!(subject.matches(&LexicalFeatures::from_text("Signed by Mary O'Brien on 3 May")));
		assert!(!subject.matches(&LexicalFeatures::from_text("Signed by the landlord")));
	}

	#[test]
	fn count_cue_needs_whole_word() {
		assert!(!QueryProfile::new("which account is this").is_count_question);
		assert!(QueryProfile::new("how many pages are scanned").is_count_question);
	}

	#[test]
	fn anchor_matching_tolerates_plurals_unless_strict() {
		let q = QueryProfile::new("Show the passports");
		let f = LexicalFeatures::from_text("Passport issued in Lisbon");
		assert!(q.anchors[0].matches(&f));
		let q = QueryProfile::new("invoice INV-7");
		let f = LexicalFeatures::from_text("invoice INV 8 and 7");
		assert!(!q.subject.expect("subject").matches(&f));
	}
}
