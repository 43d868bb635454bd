//! Input Chunking
//!
//! Long inputs are split before Markdown headings, oversized sections are split
//! by paragraph, and adjacent pieces are packed together up to the token budget.

/// Split `text` into chunks of at most `max_tokens` (as measured by `estimate`).
///
/// A single paragraph larger than the budget is kept whole.
pub fn split_into_chunks(text: &str, max_tokens: u32, estimate: impl Fn(&str) -> u32) -> Vec<String> {
    let mut pieces = Vec::new();
    for section in split_sections(text) {
        if estimate(section) > max_tokens {
            pieces.extend(section.split("\n\n").map(str::trim).filter(|p| !p.is_empty()));
        } else {
            let section = section.trim();
            if !section.is_empty() {
                pieces.push(section);
            }
        }
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_tokens = 0u32;
    for piece in pieces {
        let tokens = estimate(piece);
        if !current.is_empty() && current_tokens.saturating_add(tokens) > max_tokens {
            chunks.push(std::mem::take(&mut current));
            current_tokens = 0;
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(piece);
        current_tokens = current_tokens.saturating_add(tokens);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Sections start at lines beginning with `#` followed by whitespace
fn split_sections(text: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    let mut start = 0;
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if offset > start && is_heading(line) {
            sections.push(&text[start..offset]);
            start = offset;
        }
        offset += line.len();
    }
    if start < text.len() {
        sections.push(&text[start..]);
    }
    sections
}

fn is_heading(line: &str) -> bool {
    let rest = line.trim_start_matches('#');
    rest.len() < line.len() && rest.starts_with(char::is_whitespace)
}
