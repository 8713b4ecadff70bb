use tantivy::tokenizer::{
	AsciiFoldingFilter, LowerCaser, RawTokenizer, SimpleTokenizer, StopWordFilter, TextAnalyzer,
};

/// General stopwords dropped from every token stream.
pub const STOPWORDS: &[&str] = &[
	"a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
	"its", "of", "on", "that", "the", "to", "was", "will", "with", "or", "but", "not", "this",
	"these", "they", "them", "their", "there", "then", "than", "so", "if", "when", "where", "why",
	"how", "what", "which", "who", "whom", "whose", "can", "could", "should", "would", "may",
	"might", "must", "shall", "do", "does", "did", "have", "had", "having", "i", "me", "my", "mine",
	"we", "our", "you", "your", "she", "her", "his", "him", "were", "been", "being", "into",
	"about", "any", "all", "some", "also", "just", "please", "tell", "show", "give", "find", "get",
	"got", "here", "out", "up",
];

/// Words that never mark the subject of a question, even when long or
/// capitalized. Checked case-insensitively, on top of [`STOPWORDS`].
pub const ANCHOR_STOPWORDS: &[&str] = &[
	"what", "whats", "which", "where", "when", "whose", "there", "their", "about", "please",
	"total", "amount", "number", "numbers", "count", "date", "dates", "price", "cost", "value",
	"document", "documents", "file", "files", "page", "pages", "information", "info", "detail",
	"details", "many", "much", "know", "need", "want", "something", "anything", "thing", "things",
	"kind", "type", "list", "name", "mentioned", "mention", "written", "says", "stated", "state",
	"listed", "other", "another", "every", "again", "above", "below", "there's", "tell", "show",
	"find", "give", "does", "doing", "make", "made",
];

/// Word analyzer: split on non-alphanumerics, lowercase, drop stopwords.
pub fn word_analyzer() -> TextAnalyzer {
	TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(STOPWORDS.iter().map(|s| (*s).to_string())))
		.build()
}

/// Whole-text folding analyzer: one token, lowercased and diacritic-folded.
pub fn folding_analyzer() -> TextAnalyzer {
	TextAnalyzer::builder(RawTokenizer::default())
		.filter(LowerCaser)
		.filter(AsciiFoldingFilter)
		.build()
}

pub fn is_stopword(lower: &str) -> bool {
	STOPWORDS.contains(&lower)
}

pub fn is_anchor_stopword(lower: &str) -> bool {
	STOPWORDS.contains(&lower) || ANCHOR_STOPWORDS.contains(&lower)
}
