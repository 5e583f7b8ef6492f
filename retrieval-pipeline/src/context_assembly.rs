use common::storage::types::vector_query::Match;

pub const NO_CONTEXT_PLACEHOLDER: &str = "No relevant context found.";
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Formats the first `max_matches` matches, in the order given, into one prompt context.
///
/// Each entry is `Source: {source}\n{text}` with the text cut to
/// `max_chars_per_chunk` characters. Pure and deterministic.
pub fn assemble(matches: &[Match], max_matches: usize, max_chars_per_chunk: usize) -> String {
    if matches.is_empty() || max_matches == 0 {
        return NO_CONTEXT_PLACEHOLDER.to_string();
    }

    matches
        .iter()
        .take(max_matches)
        .map(|m| format_entry(m, max_chars_per_chunk))
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Distinct sources of the matches that [`assemble`] would place in the context.
pub fn context_sources(matches: &[Match], max_matches: usize) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for source in matches.iter().take(max_matches).map(Match::source) {
        if !sources.iter().any(|seen| seen == source) {
            sources.push(source.to_string());
        }
    }
    sources
}

fn format_entry(m: &Match, max_chars: usize) -> String {
    let text: String = m.text().chars().take(max_chars).collect();
    format!("Source: {}\n{text}", m.source())
}
