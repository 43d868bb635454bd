//! Exporters
//!
//! Pure renderers from an outline tree to a downloadable file body.

pub mod canvas;
pub mod html;
pub mod markdown;

use std::str::FromStr;

use mindmap_core::OutlineNode;
use serde::{Deserialize, Serialize};

pub use canvas::to_canvas;
pub use html::to_html;
pub use markdown::to_markdown;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Markdown,
    Html,
    Canvas,
}

impl ExportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Html => "html",
            Self::Canvas => "canvas",
        }
    }

    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Markdown => "text/markdown; charset=utf-8",
            Self::Html => "text/html; charset=utf-8",
            Self::Canvas => "application/json",
        }
    }

    /// Render `tree`; `title` is used by formats that carry a document title
    pub fn render(self, title: &str, tree: &OutlineNode) -> String {
        match self {
            Self::Markdown => to_markdown(tree),
            Self::Html => to_html(title, tree),
            Self::Canvas => to_canvas(tree),
        }
    }

    /// Download file name with unsafe characters replaced
    pub fn file_name(self, title: &str) -> String {
        let stem: String = title
            .trim()
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        let stem = if stem.is_empty() { "mindmap".to_string() } else { stem };
        format!("{stem}.{}", self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md" | "markdown" => Ok(Self::Markdown),
            "html" => Ok(Self::Html),
            "canvas" => Ok(Self::Canvas),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_metadata() {
        assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert_eq!("CANVAS".parse::<ExportFormat>().unwrap(), ExportFormat::Canvas);
        assert!("png".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Html.extension(), "html");
        assert_eq!(ExportFormat::Canvas.mime_type(), "application/json");
        assert_eq!(ExportFormat::Markdown.file_name("My map/1"), "My_map_1.md");
        assert_eq!(ExportFormat::Html.file_name("  "), "mindmap.html");
    }
}
