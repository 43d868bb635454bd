//! Document Chapter Extractor
//!
//! Pulls text out of an uploaded PDF and splits it into chapters using
//! line-level heading heuristics. Front and back matter (contents, preface,
//! bibliography, ...) and publishing boilerplate are removed before chapters
//! are measured.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, Result};

const SKIP_SECTIONS: &[&str] = &[
    "предисловие",
    "благодарности",
    "об авторе",
    "содержание",
    "оглавление",
    "список литературы",
    "приложение",
    "примечания",
    "выходные данные",
    "preface",
    "acknowledgements",
    "acknowledgments",
    "about the author",
    "table of contents",
    "contents",
    "bibliography",
    "copyright",
    "isbn",
];

const TECHNICAL_PATTERNS: &[&str] = &[
    r"©.*?\d{4}",
    r"\([cC]\).*?\d{4}",
    r"ISBN.*?\d+",
    r"Издательство.*?\n",
    r"Все права защищены.*?\n",
    r"All rights reserved.*?\n",
    r"Подписано в печать.*?\n",
    r"Формат.*?\n",
    r"Тираж.*?\n",
    r"https?://\S+",
    r"www\.\S*?\.[a-z]{2,4}",
    r"\[.*?\]",
];

const CHAPTER_WORDS: &[&str] = &["chapter", "part", "section", "глава", "часть", "раздел"];

/// Words allowed in a line that starts a skipped section
const SKIP_HEADING_MAX_WORDS: usize = 6;

#[derive(Clone, Debug)]
pub struct ExtractorConfig {
    /// Chapters shorter than this (after cleaning) are dropped
    pub min_chapter_chars: usize,

    /// Lines longer than this are never headings
    pub max_heading_words: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            min_chapter_chars: 1000,
            max_heading_words: 20,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub text: String,
}

pub struct ChapterExtractor {
    config: ExtractorConfig,
    technical: Vec<Regex>,
}

impl Default for ChapterExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

impl ChapterExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        let technical = TECHNICAL_PATTERNS
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::error!(pattern, error = %e, "Skipping invalid cleanup pattern");
                    None
                }
            })
            .collect();

        Self { config, technical }
    }

    /// Extract plain text from PDF bytes
    #[cfg(feature = "pdf")]
    pub fn extract_text(&self, bytes: &[u8]) -> Result<String> {
        if !bytes.starts_with(b"%PDF-") {
            return Err(GenerationError::Document("file is not a PDF".into()));
        }

        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| GenerationError::Document(e.to_string()))?;

        tracing::debug!(bytes = bytes.len(), chars = text.len(), "Extracted PDF text");
        Ok(text)
    }

    #[cfg(not(feature = "pdf"))]
    pub fn extract_text(&self, _bytes: &[u8]) -> Result<String> {
        Err(GenerationError::Document("PDF support is not enabled".into()))
    }

    /// Split extracted text into chapters.
    ///
    /// Text before the first heading is dropped. When no heading is found, or
    /// every detected chapter is too short, the whole cleaned text becomes a single
    /// chapter named `document_title`.
    pub fn split_chapters(&self, text: &str, document_title: &str) -> Vec<Chapter> {
        let mut chapters = Vec::new();
        let mut current: Option<(String, Vec<&str>)> = None;
        let mut headings = 0usize;

        for line in text.lines() {
            if let Some(title) = self.heading_title(line) {
                headings += 1;
                if let Some((title, body)) = current.take() {
                    self.push_chapter(&mut chapters, title, &body);
                }
                current = Some((title, Vec::new()));
            } else if let Some((_, body)) = current.as_mut() {
                body.push(line);
            }
        }
        if let Some((title, body)) = current.take() {
            self.push_chapter(&mut chapters, title, &body);
        }

        tracing::info!(headings, chapters = chapters.len(), "Split document into chapters");

        if chapters.is_empty() {
            let whole = self.clean_text(text);
            if !whole.is_empty() {
                chapters.push(Chapter {
                    title: document_title.to_string(),
                    text: whole,
                });
            }
        }
        chapters
    }

    fn push_chapter(&self, chapters: &mut Vec<Chapter>, title: String, body: &[&str]) {
        let text = self.clean_text(&body.join("\n"));
        let chars = text.chars().count();
        if chars < self.config.min_chapter_chars {
            tracing::debug!(%title, chars, "Dropping short chapter");
            return;
        }
        chapters.push(Chapter { title, text });
    }

    /// Remove front/back matter and publishing boilerplate
    pub fn clean_text(&self, text: &str) -> String {
        let mut kept = Vec::new();
        let mut skipping = false;
        for line in text.lines() {
            let trimmed = line.trim();
            if starts_skipped_section(trimmed) {
                skipping = true;
                continue;
            }
            if skipping && (trimmed.is_empty() || trimmed.starts_with('#')) {
                skipping = false;
            }
            if !skipping {
                kept.push(line);
            }
        }

        let mut text = kept.join("\n");
        text.push('\n');
        for re in &self.technical {
            text = re.replace_all(&text, "").into_owned();
        }

        let mut out: Vec<&str> = Vec::new();
        for line in text.lines() {
            let trimmed = line.trim();
            if is_page_number(trimmed) {
                continue;
            }
            if trimmed.is_empty() && out.last().is_none_or(|prev| prev.trim().is_empty()) {
                continue;
            }
            out.push(line.trim_end());
        }
        out.join("\n").trim().to_string()
    }

    /// The heading label when `line` looks like a chapter heading
    pub fn heading_title(&self, line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        let hashes = trimmed.chars().take_while(|c| *c == '#').count();
        if hashes > 0 {
            let rest = &trimmed[hashes..];
            return (rest.starts_with(char::is_whitespace) && !rest.trim().is_empty())
                .then(|| rest.trim().to_string());
        }

        let words: Vec<&str> = trimmed.split_whitespace().collect();
        if words.len() > self.config.max_heading_words {
            return None;
        }

        let candidate =
            is_chapter_line(&words) || is_numbered_title(&words) || is_all_caps(trimmed, &words);
        (candidate && header_indicators(trimmed, words.len()) >= 3).then(|| trimmed.to_string())
    }
}

fn starts_skipped_section(line: &str) -> bool {
    if line.is_empty() || line.split_whitespace().count() > SKIP_HEADING_MAX_WORDS {
        return false;
    }
    let lower = line.to_lowercase();
    SKIP_SECTIONS.iter().any(|section| lower.contains(section))
}

fn is_page_number(line: &str) -> bool {
    !line.is_empty() && line.len() <= 4 && line.chars().all(|c| c.is_ascii_digit())
}

/// "Chapter 3", "Глава IV: ...", "Part Two"
fn is_chapter_line(words: &[&str]) -> bool {
    words.len() >= 2
        && CHAPTER_WORDS.contains(&words[0].to_lowercase().as_str())
        && words[1].chars().next().is_some_and(char::is_alphanumeric)
}

/// "3. Title", "2.1 Title"
fn is_numbered_title(words: &[&str]) -> bool {
    let [number, first, ..] = words else {
        return false;
    };
    number.chars().next().is_some_and(|c| c.is_ascii_digit())
        && number.chars().all(|c| c.is_ascii_digit() || c == '.')
        && first.chars().next().is_some_and(char::is_uppercase)
}

fn is_all_caps(line: &str, words: &[&str]) -> bool {
    let letters: Vec<char> = line.chars().filter(|c| c.is_alphabetic()).collect();
    words.len() <= 8 && letters.len() >= 3 && letters.iter().all(|c| c.is_uppercase())
}

/// Count of typical heading traits present in `line`
fn header_indicators(line: &str, word_count: usize) -> usize {
    [
        line.chars().next().is_some_and(|c| c.is_uppercase() || c.is_ascii_digit()),
        line.chars().any(|c| c.is_ascii_digit()),
        !line.ends_with('.'),
        word_count <= 15,
        !line.contains([',', ':', ';']),
    ]
    .into_iter()
    .filter(|present| *present)
    .count()
}
