//! Splits page documents into overlapping text windows.
//!
//! Each page is chunked independently, so overlap never crosses a page
//! break and every chunk carries exactly one page's provenance. Within a
//! page the last `overlap` characters of a chunk are the first `overlap`
//! characters of the next one, and concatenating each chunk's non-overlap
//! suffix reconstructs the page text exactly.

use crate::error::{PipelineError, Result};
use crate::models::{Chunk, ChunkMetadata, PageDocument};
use sha2::{Digest, Sha256};

fn validate_window(size: usize, overlap: usize) -> Result<()> {
    if size == 0 {
        return Err(PipelineError::Input("chunk size must be positive".to_string()));
    }
    if overlap >= size {
        return Err(PipelineError::Input(format!(
            "chunk overlap {overlap} must be smaller than chunk size {size}"
        )));
    }
    Ok(())
}

/// Splits one text into windows of at most `size` characters.
///
/// Window ends snap backwards to the nearest paragraph break, then
/// sentence end, then whitespace, but never further back than half a
/// window so every step makes progress. The final window ends at the text
/// end regardless of separators.
pub fn split_text(text: &str, size: usize, overlap: usize) -> Result<Vec<String>> {
    validate_window(size, overlap)?;

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let chars: Vec<char> = text.chars().collect();
    let floor_offset = (size / 2).max(overlap + 1);
    let mut pieces = Vec::new();
    let mut start = 0usize;

    loop {
        let hard_end = (start + size).min(chars.len());
        let end = if hard_end == chars.len() {
            hard_end
        } else {
            snap_boundary(&chars, start + floor_offset, hard_end)
        };

        pieces.push(chars[start..end].iter().collect());

        if end == chars.len() {
            break;
        }
        start = end - overlap;
    }

    Ok(pieces)
}

fn snap_boundary(chars: &[char], floor: usize, hard_end: usize) -> usize {
    let mut end = hard_end;
    while end >= floor && end >= 2 {
        if chars[end - 1] == '\n' && chars[end - 2] == '\n' {
            return end;
        }
        end -= 1;
    }

    let mut end = hard_end;
    while end >= floor && end >= 2 {
        if matches!(chars[end - 2], '.' | '!' | '?') && chars[end - 1].is_whitespace() {
            return end;
        }
        end -= 1;
    }

    let mut end = hard_end;
    while end >= floor && end >= 1 {
        if chars[end - 1].is_whitespace() {
            return end;
        }
        end -= 1;
    }

    hard_end
}

/// Chunks all pages in order, numbering chunks with one running index per
/// ingestion run.
pub fn chunk_documents(
    pages: &[PageDocument],
    size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>> {
    validate_window(size, overlap)?;

    let mut chunks = Vec::new();
    let mut index = 0u64;

    for page in pages {
        for text in split_text(&page.text, size, overlap)? {
            let chunk_id = make_chunk_id(&page.source, page.page, index, &text);
            chunks.push(Chunk {
                text,
                metadata: ChunkMetadata {
                    chunk_id,
                    source: page.source.clone(),
                    page: page.page,
                    chunk_index: index,
                },
            });
            index = index.saturating_add(1);
        }
    }

    Ok(chunks)
}

fn make_chunk_id(source: &str, page: u32, index: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(page.to_le_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::{chunk_documents, split_text};
    use crate::error::PipelineError;
    use crate::models::PageDocument;

    fn page(text: &str, number: u32) -> PageDocument {
        PageDocument {
            text: text.to_string(),
            page: number,
            source: "/tmp/handbook.pdf".to_string(),
        }
    }

    fn long_text(sentences: usize) -> String {
        (0..sentences)
            .map(|i| format!("Sentence number {i} talks about annual leave policy. "))
            .collect()
    }

    #[test]
    fn overlap_not_smaller_than_size_fails_before_chunking() {
        let result = split_text("some text", 10, 10);
        assert!(matches!(result, Err(PipelineError::Input(_))));

        let result = chunk_documents(&[page("some text", 1)], 0, 0);
        assert!(matches!(result, Err(PipelineError::Input(_))));
    }

    #[test]
    fn short_page_yields_a_single_chunk() {
        let chunks = split_text("A short page.", 500, 75).unwrap();
        assert_eq!(chunks, vec!["A short page.".to_string()]);
    }

    #[test]
    fn empty_page_yields_no_chunks() {
        assert!(split_text("  \n\n ", 500, 75).unwrap().is_empty());
    }

    #[test]
    fn chunks_never_exceed_the_size_bound() {
        let text = long_text(60);
        for chunk in split_text(&text, 200, 40).unwrap() {
            assert!(chunk.chars().count() <= 200);
        }
    }

    #[test]
    fn adjacent_chunks_share_exactly_the_overlap() {
        let text = long_text(60);
        let overlap = 40;
        let chunks = split_text(&text, 200, overlap).unwrap();
        assert!(chunks.len() > 1);

        for pair in chunks.windows(2) {
            let tail: Vec<char> = pair[0].chars().collect();
            let tail: String = tail[tail.len() - overlap..].iter().collect();
            let head: String = pair[1].chars().take(overlap).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn non_overlap_suffixes_reconstruct_the_page() {
        let text = long_text(60);
        let overlap = 40;
        let chunks = split_text(&text, 200, overlap).unwrap();

        let mut rebuilt = chunks[0].clone();
        for chunk in &chunks[1..] {
            rebuilt.extend(chunk.chars().skip(overlap));
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn window_ends_snap_to_paragraph_breaks() {
        let first: String = "a".repeat(150) + ".";
        let second: String = "b".repeat(150) + ".";
        let text = format!("{first}\n\n{second}");

        let chunks = split_text(&text, 200, 20).unwrap();
        assert!(chunks[0].ends_with("\n\n"));
        assert!(chunks[1].contains("bbb"));
    }

    #[test]
    fn chunking_is_deterministic_across_runs() {
        let pages = vec![page(&long_text(40), 1), page(&long_text(25), 2)];
        let first = chunk_documents(&pages, 200, 40).unwrap();
        let second = chunk_documents(&pages, 200, 40).unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.text, b.text);
            assert_eq!(a.metadata, b.metadata);
        }
    }

    #[test]
    fn chunk_index_runs_across_pages_and_overlap_stays_within_one_page() {
        let pages = vec![page(&long_text(40), 1), page(&long_text(40), 2)];
        let chunks = chunk_documents(&pages, 200, 40).unwrap();

        for (position, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata.chunk_index, position as u64);
        }

        let boundary = chunks.iter().position(|c| c.metadata.page == 2).unwrap();
        let last_of_page_one = &chunks[boundary - 1];
        let first_of_page_two = &chunks[boundary];
        let tail: String = last_of_page_one.text.chars().rev().take(40).collect();
        let head: String = first_of_page_two.text.chars().take(40).collect();
        assert_ne!(tail.chars().rev().collect::<String>(), head);
    }
}
