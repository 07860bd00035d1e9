//! Splitting oversized text into bounded chunks.

/// Chunking capability: split `text` into ordered pieces of roughly
/// `target_tokens` each.
pub trait Chunker: Send + Sync {
    fn chunk(&self, text: &str, target_tokens: usize) -> Vec<String>;
}

/// Splits at line boundaries, packing lines into chunks of at most
/// `target_tokens * chars_per_token` characters. A line longer than that
/// is hard-split on character boundaries.
///
/// Lines are never joined across a chunk boundary, so the chunk count
/// depends on the line layout: a single long line gives
/// `ceil(chars / max_chars)` chunks, while lines just over half of
/// `max_chars` get one chunk each.
#[derive(Debug, Clone, Copy)]
pub struct LineChunker {
    chars_per_token: usize,
}

impl LineChunker {
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl Default for LineChunker {
    fn default() -> Self {
        Self::new(4)
    }
}

impl Chunker for LineChunker {
    fn chunk(&self, text: &str, target_tokens: usize) -> Vec<String> {
        let max_chars = target_tokens.max(1).saturating_mul(self.chars_per_token);
        if text.chars().count() <= max_chars {
            return vec![text.to_string()];
        }

        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_chars = 0usize;

        for line in text.lines() {
            let line_chars = line.chars().count();

            if line_chars > max_chars {
                if !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                    current_chars = 0;
                }
                chunks.extend(split_chars(line, max_chars));
                continue;
            }

            // +1 for the joining newline.
            if !current.is_empty() && current_chars + line_chars + 1 > max_chars {
                chunks.push(std::mem::take(&mut current));
                current_chars = 0;
            }

            if !current.is_empty() {
                current.push('\n');
                current_chars += 1;
            }
            current.push_str(line);
            current_chars += line_chars;
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        chunks
    }
}

/// Split `s` into pieces of at most `max_chars` characters.
fn split_chars(s: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (offset, _) in s.char_indices() {
        if count == max_chars {
            pieces.push(s[start..offset].to_string());
            start = offset;
            count = 0;
        }
        count += 1;
    }
    if start < s.len() {
        pieces.push(s[start..].to_string());
    }
    pieces
}
