use common::error::AppError;
use text_splitter::{ChunkCapacity, ChunkConfig, MarkdownSplitter};

/// Cuts `text` to at most `max_chars` characters, never inside a character.
pub fn truncate_for_embedding(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Splits markdown into chunks of `min_chars..=max_chars` characters with `overlap`.
pub fn split_markdown(
    text: &str,
    min_chars: usize,
    max_chars: usize,
    overlap: usize,
) -> Result<Vec<String>, AppError> {
    if min_chars == 0 || max_chars == 0 || min_chars > max_chars {
        return Err(AppError::Validation(
            "invalid chunk bounds; ensure 0 < min <= max".into(),
        ));
    }

    if overlap >= min_chars {
        return Err(AppError::Validation(format!(
            "chunk minimum must be greater than the configured overlap of {overlap}"
        )));
    }

    let chunk_capacity = ChunkCapacity::new(min_chars)
        .with_max(max_chars)
        .map_err(|e| AppError::Validation(format!("invalid chunk bounds: {e}")))?;
    let chunk_config = ChunkConfig::new(chunk_capacity)
        .with_overlap(overlap)
        .map_err(|e| AppError::Validation(format!("invalid chunk overlap: {e}")))?;
    let splitter = MarkdownSplitter::new(chunk_config);

    Ok(splitter
        .chunks(text)
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(str::to_owned)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_keeps_short_text_and_cuts_long_text() {
        assert_eq!(truncate_for_embedding("short", 10), "short");
        assert_eq!(truncate_for_embedding("abcdef", 3), "abc");
        assert_eq!(truncate_for_embedding("ééééé", 2), "éé");
        assert_eq!(truncate_for_embedding("", 2), "");
    }

    #[test]
    fn splits_long_markdown_within_bounds() {
        let section = "Aven offers home equity lines of credit with no annual fees. ".repeat(10);
        let text = format!("# About\n\n{section}\n\n# Fees\n\n{section}\n\n# App\n\n{section}");

        let chunks = split_markdown(&text, 100, 300, 20).expect("split");

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 300));
        assert!(chunks.iter().all(|chunk| !chunk.trim().is_empty()));
    }

    #[test]
    fn short_text_stays_in_one_chunk() {
        let chunks = split_markdown("# Aven\n\nShort page.", 100, 300, 20).expect("split");
        assert_eq!(chunks, vec!["# Aven\n\nShort page.".to_string()]);
    }

    #[test]
    fn rejects_invalid_bounds() {
        assert!(split_markdown("text", 0, 10, 0).is_err());
        assert!(split_markdown("text", 20, 10, 0).is_err());
        assert!(split_markdown("text", 10, 20, 10).is_err());
    }
}
