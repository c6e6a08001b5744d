//! Overlapping, sentence-snapping text chunker.
//!
//! Splits cleaned document text into overlapping windows suitable for
//! independent embedding. Consecutive chunks share `chunk_overlap`
//! characters so context is preserved across boundaries.
//!
//! # Algorithm
//!
//! 1. Keep a cursor `start` (in characters, not bytes) at 0.
//! 2. Take the window `[start, start + chunk_size)`.
//! 3. Unless the window reaches the end of the text, shrink it to end just
//!    after the last `.` it contains. Windows without a period are kept at
//!    full size.
//! 4. Trim the window and keep it if anything is left.
//! 5. Move the cursor to `end - chunk_overlap`. When sentence snapping made
//!    the window shorter than the overlap, move to `end` instead so the
//!    cursor always advances.
//! 6. Stop after the window that reaches the end of the text.
//!
//! Only `.` counts as a sentence boundary. `?`, `!` and abbreviations such
//! as "e.g." are not special-cased.
//!
//! # Example
//!
//! ```rust
//! use docsearch_core::chunk::{chunk_text, ChunkConfig};
//!
//! let config = ChunkConfig::new(20, 5).unwrap();
//! let chunks = chunk_text("First sentence. Second sentence. Third.", &config);
//! assert_eq!(chunks[0], "First sentence.");
//! ```

use std::ops::Range;

use crate::error::CoreError;

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap between consecutive windows in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Validated chunking parameters.
///
/// Construct through [`ChunkConfig::new`]; an overlap that is not strictly
/// smaller than the window would stall the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, CoreError> {
        if chunk_size == 0 {
            return Err(CoreError::InvalidConfiguration(
                "chunk_size must be > 0".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(CoreError::InvalidConfiguration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Split `text` into ordered, trimmed, non-empty chunks.
///
/// Empty input yields an empty vector. Output is fully determined by the
/// input and the config.
pub fn chunk_text(text: &str, config: &ChunkConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chunk_spans(&chars, config)
        .into_iter()
        .filter_map(|span| {
            let window: String = chars[span].iter().collect();
            let trimmed = window.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// Character ranges of every window visited by the chunker, before trimming.
///
/// The first range starts at 0, the last ends at `chars.len()`, starts are
/// strictly increasing, and each range starts no later than the previous
/// one ended, so no part of the text is skipped.
pub fn chunk_spans(chars: &[char], config: &ChunkConfig) -> Vec<Range<usize>> {
    let len = chars.len();
    let mut spans = Vec::new();
    let mut start = 0usize;

    while start < len {
        let is_final = start + config.chunk_size >= len;
        let mut end = if is_final {
            len
        } else {
            start + config.chunk_size
        };

        if !is_final {
            if let Some(pos) = chars[start..end].iter().rposition(|&c| c == '.') {
                end = start + pos + 1;
            }
        }

        spans.push(start..end);

        if is_final {
            break;
        }

        let next = end.saturating_sub(config.chunk_overlap);
        start = if next > start { next } else { end };
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters(n: usize) -> String {
        (0..n)
            .map(|i| (b'a' + (i % 26) as u8) as char)
            .collect()
    }

    #[test]
    fn test_empty_text() {
        let chunks = chunk_text("", &ChunkConfig::default());
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_whitespace_only_text() {
        let chunks = chunk_text("   \n\t  ", &ChunkConfig::default());
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("  Hello, world.  ", &ChunkConfig::default());
        assert_eq!(chunks, vec!["Hello, world.".to_string()]);
    }

    #[test]
    fn test_fixed_windows_without_periods() {
        let text = letters(2500);
        let config = ChunkConfig::default();
        let chunks = chunk_text(&text, &config);

        let lens: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(lens, vec![1000, 1000, 900]);

        let chars: Vec<char> = text.chars().collect();
        let starts: Vec<usize> = chunk_spans(&chars, &config)
            .iter()
            .map(|s| s.start)
            .collect();
        assert_eq!(starts, vec![0, 800, 1600]);
        assert_eq!(chunks[1], text[800..1800]);
    }

    #[test]
    fn test_snaps_to_last_period() {
        let mut chars: Vec<char> = letters(2000).chars().collect();
        chars[950] = '.';
        let text: String = chars.iter().collect();

        let chunks = chunk_text(&text, &ChunkConfig::default());
        assert_eq!(chunks[0].chars().count(), 951);
        assert!(chunks[0].ends_with('.'));

        let spans = chunk_spans(&chars, &ChunkConfig::default());
        assert_eq!(spans[1].start, 751);
    }

    #[test]
    fn test_final_window_is_not_snapped() {
        let config = ChunkConfig::new(50, 10).unwrap();
        let text = "Short. And the rest without a boundary";
        let chunks = chunk_text(text, &config);
        assert_eq!(chunks, vec![text.to_string()]);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let text: String = std::iter::repeat('é').take(30).collect();
        let config = ChunkConfig::new(10, 2).unwrap();
        let chunks = chunk_text(&text, &config);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks[0].chars().count(), 10);
    }

    #[test]
    fn test_cursor_advances_when_snap_is_shorter_than_overlap() {
        // The only period sits right at the start of every window.
        let config = ChunkConfig::new(10, 8).unwrap();
        let text = "a.bcdefghijklmnopqrstuvwxyz";
        let chars: Vec<char> = text.chars().collect();
        let spans = chunk_spans(&chars, &config);

        assert_eq!(spans[0], 0..2);
        assert_eq!(spans[1].start, 2);
        for pair in spans.windows(2) {
            assert!(pair[1].start > pair[0].start);
        }
        assert_eq!(spans.last().unwrap().end, chars.len());
    }

    #[test]
    fn test_spans_cover_whole_text() {
        let text = (0..300)
            .map(|i| format!("Sentence w{} talks about item {}.", i, i * 7))
            .collect::<Vec<_>>()
            .join(" ");
        let chars: Vec<char> = text.chars().collect();
        let config = ChunkConfig::new(120, 30).unwrap();
        let spans = chunk_spans(&chars, &config);

        assert_eq!(spans.first().unwrap().start, 0);
        assert_eq!(spans.last().unwrap().end, chars.len());
        for pair in spans.windows(2) {
            assert!(pair[1].start <= pair[0].end, "gap between {:?} and {:?}", pair[0], pair[1]);
        }

        let chunks = chunk_text(&text, &config);
        for token in text.split_whitespace() {
            assert!(
                chunks.iter().any(|c| c.contains(token)),
                "token {} lost",
                token
            );
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha beta. Gamma delta epsilon. Zeta eta theta iota. Kappa.";
        let config = ChunkConfig::new(16, 4).unwrap();
        assert_eq!(chunk_text(text, &config), chunk_text(text, &config));
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        let err = ChunkConfig::new(100, 100).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfiguration(_)));
        assert!(ChunkConfig::new(100, 150).is_err());
        assert!(ChunkConfig::new(0, 0).is_err());
        assert!(ChunkConfig::new(100, 99).is_ok());
    }
}
