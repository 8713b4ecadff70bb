//! Packs selected evidence into a character-bounded prompt block.
//!
//! Each document gets a share of the budget that blends its rank position
//! with its top score. Blocks are cut on whitespace, never inside a word.

use localqa_core::config::BudgetConfig;
use localqa_core::types::Document;
use localqa_rank::{ChunkHit, SelectionResult};

const SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceBlock {
    pub document_id: String,
    pub share: f32,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedEvidence {
    pub blocks: Vec<EvidenceBlock>,
    /// Blocks joined by blank lines; never longer than the budget.
    pub text: String,
    /// The minimal title-and-summary block was used instead.
    pub fallback: bool,
}

impl RenderedEvidence {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Fixed shares by rank: the first two documents get `first`/`second`, the
/// rest split what is left evenly. Renormalized when fewer than three.
pub fn rank_shares(count: usize, first: f32, second: f32) -> Vec<f32> {
    match count {
        0 => Vec::new(),
        1 => vec![1.0],
        2 => {
            let sum = first + second;
            if sum > 0.0 { vec![first / sum, second / sum] } else { vec![0.5, 0.5] }
        }
        n => {
            #[allow(clippy::cast_precision_loss)]
            let rest = (1.0 - first - second).max(0.0) / (n - 2) as f32;
            let mut shares = vec![first, second];
            shares.resize(n, rest);
            shares
        }
    }
}

/// Each score over the sum of scores; equal shares when nothing is positive.
#[allow(clippy::cast_precision_loss)]
pub fn score_shares(scores: &[f32]) -> Vec<f32> {
    let sum: f32 = scores.iter().map(|s| s.max(0.0)).sum();
    if sum <= 0.0 {
        return vec![1.0 / scores.len().max(1) as f32; scores.len()];
    }
    scores.iter().map(|s| s.max(0.0) / sum).collect()
}

pub fn blended_shares(scores: &[f32], config: &BudgetConfig) -> Vec<f32> {
    let by_rank = rank_shares(scores.len(), config.first_share, config.second_share);
    let by_score = score_shares(scores);
    by_rank
        .iter()
        .zip(&by_score)
        .map(|(r, s)| config.rank_blend * r + (1.0 - config.rank_blend) * s)
        .collect()
}

/// Longest prefix of at most `limit` characters that ends on a word
/// boundary, with trailing whitespace removed.
pub fn trim_to_word_boundary(text: &str, limit: usize) -> &str {
    if text.chars().count() <= limit {
        return text.trim_end();
    }
    let Some((cut, next)) = text.char_indices().nth(limit) else {
        return text.trim_end();
    };
    let head = &text[..cut];
    if next.is_whitespace() {
        return head.trim_end();
    }
    match head.rfind(char::is_whitespace) {
        Some(end) => head[..end].trim_end(),
        None => "",
    }
}

/// Header lines followed by one line per hit. The second value is the
/// header length in chars; anything trimmed down to it carries no evidence.
fn render_block(document: &Document, hits: &[&ChunkHit]) -> (String, usize) {
    let mut out = format!("Document: {}", document.title);
    if !document.category.is_empty() {
        out.push_str(&format!("\nCategory: {}", document.category));
    }
    if !document.tags.is_empty() {
        let tags: Vec<&str> = document.tags.iter().map(String::as_str).collect();
        out.push_str(&format!("\nTags: {}", tags.join(", ")));
    }
    let header_chars = out.chars().count();
    for hit in hits {
        let text = hit.text().trim();
        if text.is_empty() {
            continue;
        }
        match hit.page_number() {
            Some(page) => out.push_str(&format!("\n[p. {page}] {text}")),
            None => out.push_str(&format!("\n{text}")),
        }
    }
    (out, header_chars)
}

fn render_fallback(document: &Document, config: &BudgetConfig) -> String {
    let summary =
        trim_to_word_boundary(document.summary_or_content().trim(), config.fallback_summary_chars);
    let block = if summary.is_empty() {
        format!("Document: {}", document.title)
    } else {
        format!("Document: {}\n{}", document.title, summary)
    };
    trim_to_word_boundary(&block, config.total_chars).to_string()
}

/// Renders the selection into at most `total_chars` characters.
pub fn allocate(selection: &SelectionResult, config: &BudgetConfig) -> RenderedEvidence {
    let scores: Vec<f32> = selection.documents.iter().map(|d| selection.top_score(&d.id)).collect();
    let shares = blended_shares(&scores, config);
    let separator_chars = SEPARATOR.chars().count();

    let mut blocks: Vec<EvidenceBlock> = Vec::new();
    let mut used = 0usize;
    for (document, share) in selection.documents.iter().zip(shares) {
        let remaining = config.total_chars.saturating_sub(used);
        if remaining < config.min_reserve {
            break;
        }
        let separator = if blocks.is_empty() { 0 } else { separator_chars };
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let target = (share * config.total_chars as f32).floor() as usize;
        let limit = remaining.saturating_sub(separator).min(target);

        let hits: Vec<&ChunkHit> =
            selection.evidence.iter().filter(|h| h.document_id() == document.id).collect();
        let (rendered, header_chars) = render_block(document, &hits);
        let text = trim_to_word_boundary(&rendered, limit);
        if text.chars().count() <= header_chars {
            continue;
        }
        used += separator + text.chars().count();
        blocks.push(EvidenceBlock {
            document_id: document.id.clone(),
            share,
            text: text.to_string(),
        });
    }

    if blocks.is_empty() {
        let Some(primary) = selection.primary() else {
            return RenderedEvidence::default();
        };
        let text = render_fallback(primary, config);
        tracing::debug!(
            document = %primary.id,
            chars = text.chars().count(),
            "evidence blocks empty, using title and summary"
        );
        let block =
            EvidenceBlock { document_id: primary.id.clone(), share: 1.0, text: text.clone() };
        return RenderedEvidence {
            blocks: vec![block],
            text,
            fallback: true,
        };
    }

    let text = blocks.iter().map(|b| b.text.as_str()).collect::<Vec<_>>().join(SEPARATOR);
    tracing::debug!(
        blocks = blocks.len(),
        chars = used,
        budget = config.total_chars,
        "evidence packed"
    );
    RenderedEvidence { blocks, text, fallback: false }
}
