//! Per-request inverted-index statistics and BM25.

use std::collections::HashMap;

use localqa_core::config::Bm25Params;

use crate::features::LexicalFeatures;

/// Document-frequency snapshot over every candidate chunk of one request.
#[derive(Debug, Clone)]
pub struct LexicalIndex {
	document_frequency: HashMap<String, usize>,
	total_chunks: usize,
	average_chunk_length: f32,
	params: Bm25Params,
}

impl LexicalIndex {
	#[allow(clippy::cast_precision_loss)]
	pub fn build<'a, I>(features: I, params: &Bm25Params) -> Self
	where
		I: IntoIterator<Item = &'a LexicalFeatures>,
	{
		let mut document_frequency: HashMap<String, usize> = HashMap::new();
		let mut total_chunks = 0usize;
		let mut total_length = 0usize;
		for f in features {
			total_chunks += 1;
			total_length += f.length;
			for term in f.term_frequency.keys() {
				*document_frequency.entry(term.clone()).or_insert(0) += 1;
			}
		}
		let average_chunk_length =
			if total_chunks == 0 { 0.0 } else { total_length as f32 / total_chunks as f32 };
		Self { document_frequency, total_chunks, average_chunk_length, params: params.clone() }
	}

	pub fn total_chunks(&self) -> usize {
		self.total_chunks
	}

	pub fn average_chunk_length(&self) -> f32 {
		self.average_chunk_length
	}

	pub fn document_frequency(&self, term: &str) -> usize {
		self.document_frequency.get(term).copied().unwrap_or(0)
	}

	#[allow(clippy::cast_precision_loss)]
	pub fn idf(&self, term: &str) -> f32 {
		let n = self.total_chunks as f32;
		let df = self.document_frequency(term) as f32;
		((n - df + 0.5) / (df + 0.5) + 1.0).ln()
	}

	/// Raw BM25 of `features` for the (deduplicated) query terms.
	#[allow(clippy::cast_precision_loss)]
	pub fn bm25(&self, query_terms: &[String], features: &LexicalFeatures) -> f32 {
		if self.total_chunks == 0 || features.length == 0 {
			return 0.0;
		}
		let Bm25Params { k1, b } = self.params;
		let dl = features.length as f32;
		let avg = self.average_chunk_length.max(1.0);
		query_terms.iter().fold(0.0, |acc, term| {
			let tf = features.term_frequency.get(term).copied().unwrap_or(0) as f32;
			if tf <= 0.0 {
				return acc;
			}
			let denom = tf + k1 * (1.0 - b + b * (dl / avg));
			acc + self.idf(term) * ((tf * (k1 + 1.0)) / denom)
		})
	}
}

/// Divides every score by the maximum; all zeros when nothing is positive.
pub fn normalize_by_max(scores: &[f32]) -> Vec<f32> {
	let max = scores.iter().copied().fold(0.0f32, f32::max);
	if max <= 0.0 {
		return vec![0.0; scores.len()];
	}
	scores.iter().map(|s| (s / max).max(0.0)).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn features(texts: &[&str]) -> Vec<LexicalFeatures> {
		texts.iter().map(|t| LexicalFeatures::from_text(t)).collect()
	}

	#[test]
	fn statistics_over_chunks() {
		let f = features(&["passport renewal office", "passport photo", "garden tools"]);
		let index = LexicalIndex::build(&f, &Bm25Params::default());
		assert_eq!(index.total_chunks(), 3);
		assert_eq!(index.document_frequency("passport"), 2);
		assert!((index.average_chunk_length() - 7.0 / 3.0).abs() < 1e-6);
	}

	#[test]
	fn rarer_terms_score_higher() {
		let f = features(&["passport renewal office", "passport photo", "garden tools"]);
		let index = LexicalIndex::build(&f, &Bm25Params::default());
		let q = vec!["passport".to_string(), "renewal".to_string()];
		let s0 = index.bm25(&q, &f[0]);
		let s1 = index.bm25(&q, &f[1]);
		assert!(s0 > s1);
		assert_eq!(index.bm25(&q, &f[2]), 0.0);
	}

	#[test]
	fn empty_index_scores_zero() {
		let index = LexicalIndex::build(std::iter::empty(), &Bm25Params::default());
		let f = LexicalFeatures::from_text("anything at all");
		assert_eq!(index.bm25(&["anything".to_string()], &f), 0.0);
	}

	#[test]
	fn normalization_tops_at_one() {
		assert_eq!(normalize_by_max(&[2.0, 1.0, 0.0]), vec![1.0, 0.5, 0.0]);
		assert_eq!(normalize_by_max(&[0.0, 0.0]), vec![0.0, 0.0]);
	}
}
