//! Context assembly — attachment texts into one corpus.
//!
//! The assembler's only job is concatenation in creation order. Keyword
//! relevance filtering over the corpus belongs to the mock engine, so a
//! real embedding-based retriever can later replace only the filter step.

/// Concatenate attachment texts into a single newline-joined corpus.
///
/// Pure function: identical inputs always yield identical output. Returns
/// the empty string when there are no attachments.
pub fn build_context<'a>(texts: impl IntoIterator<Item = &'a str>) -> String {
    texts.into_iter().collect::<Vec<_>>().join("\n")
}
