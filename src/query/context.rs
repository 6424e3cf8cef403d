//! Rendering retrieved documents as prompt context.

use crate::data::MovieMetadata;
use crate::vector_store::SearchResult;

/// One-line label for a movie: title, year and genre when known.
pub fn movie_label(metadata: &MovieMetadata) -> String {
    let mut label = metadata.display_title().to_string();
    if let Some(year) = metadata.year {
        label.push_str(&format!(" ({})", year));
    }
    if let Some(genre) = metadata.genre.as_deref().filter(|g| !g.is_empty()) {
        label.push_str(&format!(" - {}", genre));
    }
    label
}

/// Concatenate retrieved plots into a single prompt block.
pub fn format_documents_for_prompt(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            format!(
                "---\n[{}] {}\n{}\n---",
                i + 1,
                movie_label(result.document.metadata()),
                result.document.text()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
