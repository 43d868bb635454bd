//! Outline Tree
//!
//! The in-memory shape of a mind map: a single root with ordered children.
//! Generation produces it, persistence serializes it, exporters render it.

use serde::{Deserialize, Serialize};

/// Where a node's content came from (uploaded documents only)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// One entry in a mind map
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineNode {
    pub label: String,

    #[serde(default)]
    pub children: Vec<OutlineNode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceRef>,
}

impl OutlineNode {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
            source: None,
        }
    }

    pub fn with_children(mut self, children: Vec<Self>) -> Self {
        self.children = children;
        self
    }

    pub fn with_source(mut self, source: SourceRef) -> Self {
        self.source = Some(source);
        self
    }

    pub fn push(&mut self, child: Self) {
        self.children.push(child);
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Total number of nodes, root included
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }

    /// Number of levels below and including this node
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Self::depth).max().unwrap_or(0)
    }

    /// Pre-order walk yielding `(depth, node)` with the root at depth 0
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![(0, self)],
        }
    }
}

/// Pre-order iterator over an outline
pub struct Walk<'a> {
    stack: Vec<(usize, &'a OutlineNode)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a OutlineNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(|child| (depth + 1, child)));
        Some((depth, node))
    }
}

/// Parse Markdown outline text into a tree.
///
/// Headings (`#`..`######`) nest by level; bullets (`-`, `*`, `+`) nest under the
/// most recent heading by two-space indentation. Other lines are ignored. When the
/// text has more than one top-level entry, they are wrapped under `fallback_title`.
/// Returns `None` when no heading or bullet is found.
pub fn parse_markdown(text: &str, fallback_title: &str) -> Option<OutlineNode> {
    let mut roots: Vec<OutlineNode> = Vec::new();
    let mut open: Vec<(usize, OutlineNode)> = Vec::new();
    let mut heading_level = 0usize;

    for line in text.lines() {
        let Some((level, label, is_heading)) = classify_line(line, heading_level) else {
            continue;
        };
        if is_heading {
            heading_level = level;
        }

        while open.last().is_some_and(|(open_level, _)| *open_level >= level) {
            close_top(&mut open, &mut roots);
        }
        open.push((level, OutlineNode::new(label)));
    }
    while !open.is_empty() {
        close_top(&mut open, &mut roots);
    }

    match roots.len() {
        0 => None,
        1 => roots.pop(),
        _ => Some(OutlineNode::new(fallback_title).with_children(roots)),
    }
}

/// Pop the innermost open node and attach it to its parent (or the forest)
fn close_top(open: &mut Vec<(usize, OutlineNode)>, roots: &mut Vec<OutlineNode>) {
    if let Some((_, node)) = open.pop() {
        match open.last_mut() {
            Some((_, parent)) => parent.children.push(node),
            None => roots.push(node),
        }
    }
}

/// Drop code fence markers (```` ``` ````, ```` ```markdown ````) from model output,
/// keeping the fenced content
pub fn strip_code_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Returns `(level, label, is_heading)` for outline lines
fn classify_line(line: &str, heading_level: usize) -> Option<(usize, String, bool)> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return None;
    }

    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    if (1..=6).contains(&hashes) {
        let rest = &trimmed[hashes..];
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            let rest = rest.trim();
            // optional closing sequence: "## Title ##"
            let unclosed = rest.trim_end_matches('#');
            let rest = if unclosed.is_empty() || unclosed.ends_with(char::is_whitespace) {
                unclosed
            } else {
                rest
            };
            let label = unescape_heading(clean_label(rest));
            return (!label.is_empty()).then_some((hashes, label, true));
        }
    }

    let mut chars = trimmed.chars();
    let marker = chars.next()?;
    if matches!(marker, '-' | '*' | '+') && chars.next().is_some_and(char::is_whitespace) {
        let indent: usize = line
            .chars()
            .take_while(|c| c.is_whitespace())
            .map(|c| if c == '\t' { 2 } else { 1 })
            .sum();
        let label = clean_label(&trimmed[1..]);
        if label.is_empty() {
            return None;
        }
        return Some((heading_level + indent / 2 + 1, label, false));
    }

    None
}

fn clean_label(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A word of `#` characters behind zero or more backslashes
fn is_hash_run(word: &str) -> bool {
    let hashes = word.trim_start_matches('\\');
    !hashes.is_empty() && hashes.chars().all(|c| c == '#')
}

fn split_last_word(label: &str) -> (&str, &str) {
    match label.rfind(' ') {
        Some(at) => label.split_at(at + 1),
        None => ("", label),
    }
}

/// Escape a single-line heading label so a trailing word of `#` is read back
/// as text rather than as a closing sequence
pub fn escape_heading(label: &str) -> String {
    let (head, last) = split_last_word(label);
    if is_hash_run(last) {
        format!("{head}\\{last}")
    } else {
        label.to_string()
    }
}

fn unescape_heading(label: String) -> String {
    let (head, last) = split_last_word(&label);
    if let Some(unescaped) = last.strip_prefix('\\').filter(|_| is_hash_run(last)) {
        return format!("{head}{unescaped}");
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_headings_and_bullets() {
        let text = "# Rust\n## Ownership\n- Moves\n  - Copy types\n- Borrowing\n## Traits\n- Generics";
        let root = parse_markdown(text, "Untitled").unwrap();

        assert_eq!(root.label, "Rust");
        assert_eq!(root.children.len(), 2);
        let ownership = &root.children[0];
        assert_eq!(ownership.label, "Ownership");
        assert_eq!(ownership.children[0].label, "Moves");
        assert_eq!(ownership.children[0].children[0].label, "Copy types");
        assert_eq!(ownership.children[1].label, "Borrowing");
        assert_eq!(root.children[1].children[0].label, "Generics");
    }

    #[test]
    fn test_multiple_roots_are_wrapped() {
        let root = parse_markdown("## A\n## B", "Topic").unwrap();
        assert_eq!(root.label, "Topic");
        assert_eq!(root.children.len(), 2);
    }

    #[test]
    fn test_plain_text_is_not_an_outline() {
        assert!(parse_markdown("just a sentence\nand another", "x").is_none());
        assert!(parse_markdown("", "x").is_none());
        assert!(parse_markdown("#hashtag", "x").is_none());
    }

    #[test]
    fn test_heading_closing_sequence() {
        let root = parse_markdown("# Intro to C# ##\n## Rust #1", "x").unwrap();
        assert_eq!(root.label, "Intro to C#");
        assert_eq!(root.children[0].label, "Rust #1");
    }

    #[test]
    fn test_escaped_trailing_hashes_stay_in_label() {
        let root = parse_markdown("# Notes \\#\n## \\##", "x").unwrap();
        assert_eq!(root.label, "Notes #");
        assert_eq!(root.children[0].label, "##");

        assert_eq!(escape_heading("Notes #"), "Notes \\#");
        assert_eq!(escape_heading("#"), "\\#");
        assert_eq!(escape_heading("a \\#"), "a \\\\#");
        assert_eq!(escape_heading("C#"), "C#");
        assert_eq!(escape_heading("Rust #1"), "Rust #1");
    }

    #[test]
    fn test_strip_code_fences() {
        let text = "```markdown\n# Title\n- Point\n```";
        assert_eq!(strip_code_fences(text), "# Title\n- Point");
    }

    #[test]
    fn test_walk_is_preorder() {
        let tree = OutlineNode::new("a").with_children(vec![
            OutlineNode::new("b").with_children(vec![OutlineNode::new("c")]),
            OutlineNode::new("d"),
        ]);
        let labels: Vec<_> = tree.walk().map(|(d, n)| (d, n.label.as_str())).collect();
        assert_eq!(labels, vec![(0, "a"), (1, "b"), (2, "c"), (1, "d")]);
        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree.depth(), 3);
    }
}
