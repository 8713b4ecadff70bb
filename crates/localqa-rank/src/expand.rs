//! Pulls the chunks adjacent to each selected hit into the evidence list.

use std::collections::HashSet;

use localqa_core::config::ExpansionConfig;

use crate::hit::ChunkHit;

/// Each hit is followed by its preceding and following chunk. Neighbors
/// come from the same document, and from the same page when both sides know
/// their page. Chunk ids are deduplicated and the list is capped at
/// `max_hits`.
pub fn expand_neighbors(hits: &[ChunkHit], config: &ExpansionConfig) -> Vec<ChunkHit> {
    let selected: HashSet<&str> = hits.iter().map(|h| h.chunk_id.as_str()).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<ChunkHit> = Vec::new();

    for hit in hits {
        if out.len() >= config.max_hits {
            break;
        }
        if seen.insert(hit.chunk_id.clone()) {
            out.push(hit.clone());
        }
        let before = hit.position.checked_sub(1);
        let after = Some(hit.position + 1);
        for position in [before, after].into_iter().flatten() {
            if out.len() >= config.max_hits {
                break;
            }
            let score = hit.final_score * config.neighbor_score_factor;
            let Some(neighbor) = ChunkHit::bare(hit.document.clone(), position, score) else {
                continue;
            };
            if selected.contains(neighbor.chunk_id.as_str()) || !same_page(hit, &neighbor) {
                continue;
            }
            if seen.insert(neighbor.chunk_id.clone()) {
                out.push(neighbor);
            }
        }
    }
    out
}

fn same_page(a: &ChunkHit, b: &ChunkHit) -> bool {
    match (a.page_number(), b.page_number()) {
        (Some(x), Some(y)) => x == y,
        _ => true,
    }
}
