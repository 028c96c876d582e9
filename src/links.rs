//! Citation links derived from retrieved chunks.

use std::collections::HashSet;

use crate::embeddings::Chunk;
use crate::models::Link;

/// Maximum characters of chunk content kept as a link snippet.
pub const SNIPPET_CHARS: usize = 250;

/// Collects up to `max_links` unique-URL links in retrieval order.
///
/// Chunks without a URL are skipped; the first chunk seen for a URL wins.
pub fn collect_links(chunks: &[Chunk], max_links: usize) -> Vec<Link> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();
    for chunk in chunks {
        if links.len() >= max_links {
            break;
        }
        let Some(url) = chunk.url.as_deref().filter(|url| !url.trim().is_empty()) else {
            continue;
        };
        if !seen.insert(url) {
            continue;
        }
        links.push(Link {
            url: url.to_string(),
            text: snippet(&chunk.content),
        });
    }
    links
}

fn snippet(content: &str) -> String {
    content.chars().take(SNIPPET_CHARS).collect()
}
