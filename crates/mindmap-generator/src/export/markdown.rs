//! Markdown outline: `# root`, then `- ` bullets indented two spaces per level

use std::fmt::Write;

use mindmap_core::{OutlineNode, escape_heading};

pub fn to_markdown(root: &OutlineNode) -> String {
    let mut out = format!("# {}\n", escape_heading(&single_line(&root.label)));
    for (depth, node) in root.walk().skip(1) {
        let indent = "  ".repeat(depth - 1);
        let _ = writeln!(out, "{indent}- {}", single_line(&node.label));
    }
    out
}

fn single_line(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindmap_core::parse_markdown;
    use proptest::prelude::*;

    #[test]
    fn test_renders_nested_bullets() {
        let tree = OutlineNode::new("Rust").with_children(vec![
            OutlineNode::new("Ownership").with_children(vec![OutlineNode::new("Moves")]),
            OutlineNode::new("Traits"),
        ]);
        assert_eq!(to_markdown(&tree), "# Rust\n- Ownership\n  - Moves\n- Traits\n");
    }

    #[test]
    fn test_trailing_hash_root_survives() {
        let tree = OutlineNode::new("Notes #").with_children(vec![OutlineNode::new("C# #")]);
        let markdown = to_markdown(&tree);
        assert_eq!(markdown, "# Notes \\#\n- C# #\n");
        assert_eq!(parse_markdown(&markdown, "unused"), Some(tree));
    }

    fn label() -> impl Strategy<Value = String> {
        r##"[A-Za-z0-9#.,:;!?()'"/&*+\\-]{1,8}( [A-Za-z0-9#.,:;!?()'"/&*+\\-]{1,8}){0,3}"##
    }

    fn outline() -> impl Strategy<Value = OutlineNode> {
        let leaf = label().prop_map(OutlineNode::new);
        leaf.prop_recursive(4, 40, 5, |inner| {
            (label(), prop::collection::vec(inner, 0..5))
                .prop_map(|(label, children)| OutlineNode::new(label).with_children(children))
        })
    }

    proptest! {
        #[test]
        fn prop_markdown_round_trip(tree in outline()) {
            let parsed = parse_markdown(&to_markdown(&tree), "unused");
            prop_assert_eq!(parsed, Some(tree));
        }
    }
}
