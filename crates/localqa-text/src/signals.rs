//! Pure signal scorers. Each returns a bounded value, mostly in `[0, 1]`.

use std::collections::{BTreeSet, HashSet};

use localqa_core::config::ScoringWeights;

use crate::features::LexicalFeatures;
use crate::query::QueryProfile;
use crate::tokenize::tokenize;

/// Intersection over union; zero when either side is empty.
#[allow(clippy::cast_precision_loss)]
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
	if a.is_empty() || b.is_empty() {
		return 0.0;
	}
	let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
	let intersection = small.iter().filter(|t| large.contains(*t)).count();
	let union = a.len() + b.len() - intersection;
	intersection as f32 / union as f32
}

/// Blend of normalized BM25 and trigram similarity.
pub fn semantic_score(normalized_bm25: f32, trigram_jaccard: f32, weights: &ScoringWeights) -> f32 {
	weights.bm25_blend * normalized_bm25 + weights.trigram_blend * trigram_jaccard
}

/// Fraction of the question's terms found among `tokens`.
#[allow(clippy::cast_precision_loss)]
pub fn token_overlap_ratio(terms: &[String], tokens: &HashSet<String>) -> f32 {
	if terms.is_empty() {
		return 0.0;
	}
	let hits = terms.iter().filter(|t| tokens.contains(*t)).count();
	hits as f32 / terms.len() as f32
}

#[allow(clippy::cast_precision_loss)]
pub fn lexical_overlap(query: &QueryProfile, features: &LexicalFeatures) -> f32 {
	if query.terms.is_empty() {
		return 0.0;
	}
	query.keyword_overlap(features) as f32 / query.terms.len() as f32
}

pub fn tag_match(query: &QueryProfile, tags: &BTreeSet<String>) -> f32 {
	let tokens: HashSet<String> = tags.iter().flat_map(|t| tokenize(t)).collect();
	token_overlap_ratio(&query.terms, &tokens)
}

pub fn title_match(query: &QueryProfile, title: &str) -> f32 {
	let tokens: HashSet<String> = tokenize(title).into_iter().collect();
	token_overlap_ratio(&query.terms, &tokens)
}

/// 1.0 when the category predicted for the question equals the document's.
pub fn doc_type_match(predicted: Option<&str>, category: &str) -> f32 {
	match predicted {
		Some(label) if !category.is_empty() && label.eq_ignore_ascii_case(category) => 1.0,
		_ => 0.0,
	}
}

#[allow(clippy::cast_precision_loss)]
fn fraction_found<'a, I>(needles: I, features: &LexicalFeatures) -> f32
where
	I: IntoIterator<Item = &'a str>,
{
	let mut total = 0usize;
	let mut found = 0usize;
	for needle in needles {
		total += 1;
		if features.contains_phrase(needle) {
			found += 1;
		}
	}
	if total == 0 { 0.0 } else { found as f32 / total as f32 }
}

/// Verbatim-match signals of one text against the question.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatchSignals {
	pub exact: f32,
	pub phrase: f32,
	pub numeric: f32,
	/// `numeric` came from the quantity-intent credit rather than a number
	/// named in the question.
	pub numeric_from_intent: bool,
	pub acronym: f32,
}

impl MatchSignals {
	/// `related` tells whether the text shares any term with the question;
	/// the intent credit is only granted to related texts.
	pub fn compute(
		query: &QueryProfile,
		features: &LexicalFeatures,
		related: bool,
		weights: &ScoringWeights,
	) -> Self {
		let exact = fraction_found(query.exact_tokens.iter().map(|t| t.needle.as_str()), features);
		let phrase = fraction_found(query.phrases.iter().map(String::as_str), features);
		let acronym = fraction_found(query.acronym_tokens().map(|t| t.needle.as_str()), features);
		let has_literal_numbers = query.numeric_tokens().next().is_some();
		let related = related || exact > 0.0 || phrase > 0.0;
		let (numeric, numeric_from_intent) = if has_literal_numbers {
			(fraction_found(query.numeric_tokens().map(|t| t.needle.as_str()), features), false)
		} else if query.has_numeric_intent && features.has_number_heavy_token() && related {
			(weights.numeric_intent_credit, true)
		} else {
			(0.0, false)
		};
		Self { exact, phrase, numeric, numeric_from_intent, acronym }
	}

	/// Numeric evidence backed by a number the question actually names.
	pub fn literal_numeric(&self) -> f32 {
		if self.numeric_from_intent { 0.0 } else { self.numeric }
	}
}

/// Fraction of the question's anchors present in the text.
#[allow(clippy::cast_precision_loss)]
pub fn anchor_coverage(query: &QueryProfile, features: &LexicalFeatures) -> f32 {
	if query.anchors.is_empty() {
		return 0.0;
	}
	let hits = query.anchors.iter().filter(|a| a.matches(features)).count();
	hits as f32 / query.anchors.len() as f32
}

/// Fixed bonus when any anchor is present, fixed penalty when anchors exist
/// but none is present, zero for anchorless questions.
pub fn anchor_adjustment(query: &QueryProfile, coverage: f32, weights: &ScoringWeights) -> f32 {
	if !query.has_anchors() {
		0.0
	} else if coverage > 0.0 {
		weights.anchor_bonus
	} else {
		-weights.anchor_penalty
	}
}
