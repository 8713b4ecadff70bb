use std::collections::{HashMap, HashSet};

use crate::tokenize::{alnum_padded, is_number_heavy, tokenize, trigrams};

/// Per-chunk lexical features, computed once per request.
#[derive(Debug, Clone, Default)]
pub struct LexicalFeatures {
	pub term_frequency: HashMap<String, usize>,
	/// Token count, the BM25 document length.
	pub length: usize,
	pub trigrams: HashSet<String>,
	pub padded: String,
}

impl LexicalFeatures {
	pub fn from_text(text: &str) -> Self {
		let tokens = tokenize(text);
		let length = tokens.len();
		let mut term_frequency: HashMap<String, usize> = HashMap::new();
		for token in tokens {
			*term_frequency.entry(token).or_insert(0) += 1;
		}
		Self { term_frequency, length, trigrams: trigrams(text), padded: alnum_padded(text) }
	}

	pub fn contains_token(&self, token: &str) -> bool {
		self.term_frequency.contains_key(token)
	}

	pub fn tokens(&self) -> impl Iterator<Item = &str> {
		self.term_frequency.keys().map(String::as_str)
	}

	/// Whole-word containment of an already normalized needle.
	pub fn contains_phrase(&self, needle: &str) -> bool {
		!needle.is_empty() && self.padded.contains(&format!(" {needle} "))
	}

	pub fn has_digit(&self) -> bool {
		self.padded.chars().any(|c| c.is_ascii_digit())
	}

	pub fn has_number_heavy_token(&self) -> bool {
		self.padded.split_whitespace().any(is_number_heavy)
	}
}
