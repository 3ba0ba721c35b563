//! Fixed-size overlapping text chunker.
//!
//! Splits extracted document text into windows of `size` characters, each
//! starting `size - overlap` characters after the previous one. Windows may
//! split words; nothing is trimmed.
//!
//! # Algorithm
//!
//! 1. Reject `size == 0` and `overlap >= size` (the window would never advance).
//! 2. Emit `text[start..start + size]`, clamped to the end of the text.
//! 3. Advance `start` by `size - overlap` and repeat while `start < len`.
//!
//! Offsets are counted in characters, so a window never ends inside a
//! multi-byte code point.
//!
//! # Example
//!
//! ```rust
//! use docqa::chunk::chunk_text;
//!
//! let text = "a".repeat(2500);
//! let chunks = chunk_text(&text, 1000, 200).unwrap();
//! assert_eq!(chunks.len(), 4);
//! assert_eq!(chunks[3].len(), 100);
//! ```

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap between consecutive windows.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    #[error("invalid chunk window: size {size}, overlap {overlap} (need 0 <= overlap < size)")]
    InvalidWindow { size: usize, overlap: usize },
}

/// Split `text` into overlapping windows.
///
/// Returns an empty vector for empty text.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Result<Vec<String>, ChunkError> {
    if size == 0 || overlap >= size {
        return Err(ChunkError::InvalidWindow { size, overlap });
    }

    // Byte offset of every char, plus the end of the string.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = boundaries.len() - 1;
    let step = size - overlap;

    let mut chunks = Vec::with_capacity(char_len.div_ceil(step));
    let mut start = 0;
    while start < char_len {
        let end = (start + size).min(char_len);
        chunks.push(text[boundaries[start]..boundaries[end]].to_string());
        start += step;
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("", 1000, 200).unwrap().is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("Hello, world!", 1000, 200).unwrap();
        assert_eq!(chunks, vec!["Hello, world!".to_string()]);
    }

    #[test]
    fn test_default_window_offsets() {
        // Distinct char per position so offsets are observable.
        let text: String = (0..2500)
            .map(|i| char::from(b'a' + (i % 26) as u8))
            .collect();
        let chunks = chunk_text(&text, 1000, 200).unwrap();

        assert_eq!(chunks.len(), 4);
        for (chunk, offset) in chunks.iter().zip([0usize, 800, 1600, 2400]) {
            let expected_len = (2500 - offset).min(1000);
            assert_eq!(chunk.len(), expected_len);
            assert_eq!(chunk.as_str(), &text[offset..offset + expected_len]);
        }
    }

    #[test]
    fn test_overlap_is_shared_between_neighbours() {
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = chunk_text(text, 10, 3).unwrap();
        assert!(chunks.len() > 1);
        assert_eq!(&chunks[0][7..10], &chunks[1][..3]);
    }

    #[test]
    fn test_stride_reconstructs_full_text() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(40);
        let (size, overlap) = (97, 13);
        let chunks = chunk_text(&text, size, overlap).unwrap();

        let mut rebuilt = String::new();
        for (i, c) in chunks.iter().enumerate() {
            if i == 0 {
                rebuilt.push_str(c);
            } else {
                rebuilt.extend(c.chars().skip(overlap));
            }
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_no_overlap() {
        let chunks = chunk_text("abcdefghij", 5, 0).unwrap();
        assert_eq!(chunks, vec!["abcde", "fghij"]);
    }

    #[test]
    fn test_overlap_equal_to_size_rejected() {
        let err = chunk_text("abcde", 3, 3).unwrap_err();
        assert_eq!(err, ChunkError::InvalidWindow { size: 3, overlap: 3 });
        assert!(chunk_text("abcde", 0, 0).is_err());
        assert!(chunk_text("abcde", 3, 7).is_err());
    }

    #[test]
    fn test_multibyte_chars_are_not_split() {
        let text = "┌──────┐ héllo wörld ✓✓✓";
        let chunks = chunk_text(text, 4, 1).unwrap();
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(c.chars().count() <= 4);
        }
        assert_eq!(chunks[0], "┌───");
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha beta gamma delta epsilon";
        assert_eq!(
            chunk_text(text, 8, 2).unwrap(),
            chunk_text(text, 8, 2).unwrap()
        );
    }
}
