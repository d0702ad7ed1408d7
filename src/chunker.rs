use std::collections::VecDeque;

use crate::models::DocumentChunk;

/// Splitting parameters. Separators are tried in priority order; the final
/// empty separator splits into single characters as a last resort.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub separators: Vec<String>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separators: vec![
                "\n\n".to_string(),
                "\n".to_string(),
                " ".to_string(),
                String::new(),
            ],
        }
    }
}

/// Splits raw text into overlapping chunks of at most `chunk_size` chars.
/// All lengths are measured in chars, never bytes, so multi-byte input is
/// always split on character boundaries.
pub fn split_text(text: &str, config: &ChunkerConfig) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    recursive_split(text, &config.separators, config)
}

/// Splits text and wraps each fragment as a `DocumentChunk` carrying the
/// source name and chunk index.
pub fn chunk_document(text: &str, source: &str, config: &ChunkerConfig) -> Vec<DocumentChunk> {
    split_text(text, config)
        .into_iter()
        .enumerate()
        .map(|(chunk_index, text)| DocumentChunk {
            text,
            metadata: serde_json::json!({
                "source": source,
                "chunk_index": chunk_index,
            }),
        })
        .collect()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Picks the first separator that occurs in the text. The empty separator
/// always matches, so a well-formed separator list ends with it.
fn pick_separator<'a>(text: &str, separators: &'a [String]) -> (&'a str, &'a [String]) {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() || text.contains(sep.as_str()) {
            return (sep.as_str(), &separators[i + 1..]);
        }
    }
    ("", &[])
}

fn recursive_split(text: &str, separators: &[String], config: &ChunkerConfig) -> Vec<String> {
    let (separator, rest) = pick_separator(text, separators);

    let pieces: Vec<String> = if separator.is_empty() {
        text.chars().map(|c| c.to_string()).collect()
    } else {
        text.split(separator)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    };

    let mut chunks = Vec::new();
    let mut pending: Vec<String> = Vec::new();

    for piece in pieces {
        if char_len(&piece) <= config.chunk_size {
            pending.push(piece);
        } else {
            if !pending.is_empty() {
                chunks.extend(merge_pieces(&pending, separator, config));
                pending.clear();
            }
            if rest.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(recursive_split(&piece, rest, config));
            }
        }
    }
    if !pending.is_empty() {
        chunks.extend(merge_pieces(&pending, separator, config));
    }
    chunks
}

/// Greedily joins small pieces into chunks of at most `chunk_size` chars,
/// carrying up to `chunk_overlap` trailing chars into the next chunk.
fn merge_pieces(pieces: &[String], separator: &str, config: &ChunkerConfig) -> Vec<String> {
    let sep_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut window: VecDeque<&String> = VecDeque::new();
    let mut total = 0usize;

    for piece in pieces {
        let len = char_len(piece);
        let extra = if window.is_empty() { 0 } else { sep_len };

        if total + len + extra > config.chunk_size && !window.is_empty() {
            if let Some(chunk) = join_window(&window, separator) {
                chunks.push(chunk);
            }
            // Shrink the window until it fits inside the overlap and leaves
            // room for the incoming piece.
            while total > config.chunk_overlap
                || (total + len + if window.is_empty() { 0 } else { sep_len }
                    > config.chunk_size
                    && total > 0)
            {
                let removed = match window.pop_front() {
                    Some(p) => p,
                    None => break,
                };
                total -= char_len(removed) + if window.is_empty() { 0 } else { sep_len };
            }
        }

        let extra = if window.is_empty() { 0 } else { sep_len };
        window.push_back(piece);
        total += len + extra;
    }

    if let Some(chunk) = join_window(&window, separator) {
        chunks.push(chunk);
    }
    chunks
}

fn join_window(window: &VecDeque<&String>, separator: &str) -> Option<String> {
    let joined = window
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
