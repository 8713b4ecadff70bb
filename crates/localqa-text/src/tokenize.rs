//! Three views of a text: normalized tokens, character trigrams, and a
//! space-padded alphanumeric string for whole-word containment checks.

use std::cell::RefCell;
use std::collections::HashSet;

use tantivy::tokenizer::{TextAnalyzer, TokenStream};

use crate::analyzer::{folding_analyzer, word_analyzer};

const MIN_TOKEN_CHARS: usize = 3;
const PLURAL_MIN_CHARS: usize = 5;

thread_local! {
	static WORDS: RefCell<TextAnalyzer> = RefCell::new(word_analyzer());
	static FOLD: RefCell<TextAnalyzer> = RefCell::new(folding_analyzer());
}

/// Lowercased, stopword-free tokens of at least three characters, in text
/// order. A trailing `s` is dropped from tokens of five or more characters.
pub fn tokenize(text: &str) -> Vec<String> {
	WORDS.with(|analyzer| {
		let mut analyzer = analyzer.borrow_mut();
		let mut stream = analyzer.token_stream(text);
		let mut tokens = Vec::new();
		while stream.advance() {
			if let Some(token) = fold_plural(&stream.token().text) {
				tokens.push(token);
			}
		}
		tokens
	})
}

fn fold_plural(token: &str) -> Option<String> {
	let len = token.chars().count();
	if len < MIN_TOKEN_CHARS {
		return None;
	}
	match token.strip_suffix('s') {
		Some(stem) if len >= PLURAL_MIN_CHARS => Some(stem.to_string()),
		_ => Some(token.to_string()),
	}
}

/// Case- and diacritic-folded text with whitespace runs collapsed.
pub fn fold(text: &str) -> String {
	let folded = FOLD.with(|analyzer| {
		let mut analyzer = analyzer.borrow_mut();
		let mut stream = analyzer.token_stream(text);
		let mut out = String::new();
		while stream.advance() {
			out.push_str(&stream.token().text);
		}
		out
	});
	folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Set of 3-character windows over the folded text. Shorter non-empty texts
/// yield a single element holding the whole text.
pub fn trigrams(text: &str) -> HashSet<String> {
	let folded = fold(text);
	let chars: Vec<char> = folded.chars().collect();
	if chars.is_empty() {
		return HashSet::new();
	}
	if chars.len() < 3 {
		return std::iter::once(folded).collect();
	}
	chars.windows(3).map(|w| w.iter().collect()).collect()
}

/// Lowercased text where every non-alphanumeric run becomes one space,
/// padded with a space on both ends, so `" token "` containment only
/// matches whole words.
pub fn alnum_padded(text: &str) -> String {
	let mut out = String::with_capacity(text.len() + 2);
	out.push(' ');
	for ch in text.chars() {
		if ch.is_alphanumeric() {
			out.extend(ch.to_lowercase());
		} else if !out.ends_with(' ') {
			out.push(' ');
		}
	}
	if !out.ends_with(' ') {
		out.push(' ');
	}
	out
}

const CONTRACTION_TAILS: &[&str] = &["n't", "'s", "'re", "'ll", "'ve", "'d", "'m"];

/// Whitespace-separated question terms with surrounding punctuation and
/// contraction tails removed; case, inner hyphens and inner apostrophes
/// (`O'Brien`) are kept.
pub fn raw_terms(text: &str) -> Vec<String> {
	text.split_whitespace()
		.filter_map(|word| {
			let word = word.replace('\u{2019}', "'");
			let trimmed = strip_contraction(word.trim_matches(|c: char| !c.is_alphanumeric()));
			let trimmed = trimmed.trim_matches(|c: char| !c.is_alphanumeric());
			(!trimmed.is_empty()).then(|| trimmed.to_string())
		})
		.collect()
}

fn strip_contraction(word: &str) -> &str {
	for tail in CONTRACTION_TAILS {
		let Some(cut) = word.len().checked_sub(tail.len()) else { continue };
		if cut > 0 && word.get(cut..).is_some_and(|end| end.eq_ignore_ascii_case(tail)) {
			return &word[..cut];
		}
	}
	word
}

/// 2–5 uppercase ASCII letters, e.g. `EUR`, `IBAN`.
pub fn is_short_acronym(raw: &str) -> bool {
	let len = raw.chars().count();
	(2..=5).contains(&len) && raw.chars().all(|c| c.is_ascii_uppercase())
}

pub fn digit_count(raw: &str) -> usize {
	raw.chars().filter(char::is_ascii_digit).count()
}

/// Amounts, ids and dates: at least three digits or a digit density of 0.4.
#[allow(clippy::cast_precision_loss)]
pub fn is_number_heavy(raw: &str) -> bool {
	let len = raw.chars().count();
	if len == 0 {
		return false;
	}
	let digits = digit_count(raw);
	digits >= 3 || digits as f32 / len as f32 >= 0.4
}
