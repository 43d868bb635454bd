//! Output Languages

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Language the mind map is written in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Detect from the input text
    #[default]
    Auto,
    Ru,
    En,
    Es,
    Fr,
    De,
    It,
    Pt,
    Zh,
    Ja,
}

impl Language {
    pub const ALL: [Self; 10] = [
        Self::Auto,
        Self::Ru,
        Self::En,
        Self::Es,
        Self::Fr,
        Self::De,
        Self::It,
        Self::Pt,
        Self::Zh,
        Self::Ja,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Ru => "ru",
            Self::En => "en",
            Self::Es => "es",
            Self::Fr => "fr",
            Self::De => "de",
            Self::It => "it",
            Self::Pt => "pt",
            Self::Zh => "zh",
            Self::Ja => "ja",
        }
    }

    /// Name shown in the language picker
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Auto => "Auto-detect",
            Self::Ru => "Русский",
            Self::En => "English",
            Self::Es => "Español",
            Self::Fr => "Français",
            Self::De => "Deutsch",
            Self::It => "Italiano",
            Self::Pt => "Português",
            Self::Zh => "中文",
            Self::Ja => "日本語",
        }
    }

    /// English name, used in "write in ..." instructions
    pub const fn english_name(self) -> &'static str {
        match self {
            Self::Auto | Self::En => "English",
            Self::Ru => "Russian",
            Self::Es => "Spanish",
            Self::Fr => "French",
            Self::De => "German",
            Self::It => "Italian",
            Self::Pt => "Portuguese",
            Self::Zh => "Chinese",
            Self::Ja => "Japanese",
        }
    }

    /// Replace `Auto` with the language detected in `text`
    pub fn resolve(self, text: &str) -> Self {
        match self {
            Self::Auto => detect(text),
            other => other,
        }
    }

    pub const fn system_prompt(self) -> &'static str {
        match self {
            Self::Ru => {
                "Создавайте четкие и организованные майндмапы на русском языке. Фокусируйтесь на ключевых концепциях и практических выводах."
            }
            Self::Auto | Self::En => {
                "Create clear and organized mind maps in English. Focus on key concepts and practical insights."
            }
            Self::Es => {
                "Cree mapas mentales claros y organizados en español. Concéntrese en conceptos clave y perspectivas prácticas."
            }
            Self::Fr => {
                "Créez des cartes mentales claires et organisées en français. Concentrez-vous sur les concepts clés et les perspectives pratiques."
            }
            Self::De => {
                "Erstellen Sie klare und organisierte Mind Maps auf Deutsch. Konzentrieren Sie sich auf Schlüsselkonzepte und praktische Erkenntnisse."
            }
            Self::It => {
                "Crea mappe mentali chiare e organizzate in italiano. Concentrati sui concetti chiave e sugli spunti pratici."
            }
            Self::Pt => {
                "Crie mapas mentais claros e organizados em português. Concentre-se em conceitos-chave e insights práticos."
            }
            Self::Zh => "用中文创建清晰有条理的思维导图。专注于关键概念和实用见解。",
            Self::Ja => {
                "日本語で明確で体系的なマインドマップを作成します。重要な概念と実践的な洞察に焦点を当てます。"
            }
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.code() == code)
            .ok_or_else(|| format!("unsupported language: {s}"))
    }
}

/// Script-based detection: kana → ja, Han → zh, Cyrillic → ru, otherwise en
pub fn detect(text: &str) -> Language {
    let (mut cyrillic, mut han, mut kana) = (0usize, 0usize, 0usize);
    for c in text.chars() {
        match c {
            '\u{0400}'..='\u{04FF}' => cyrillic += 1,
            '\u{3040}'..='\u{30FF}' => kana += 1,
            '\u{4E00}'..='\u{9FFF}' => han += 1,
            _ => {}
        }
    }

    if kana > 0 {
        Language::Ja
    } else if han > 0 && han >= cyrillic {
        Language::Zh
    } else if cyrillic > 0 {
        Language::Ru
    } else {
        Language::En
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_scripts() {
        assert_eq!(detect("Привет, мир"), Language::Ru);
        assert_eq!(detect("Hello world"), Language::En);
        assert_eq!(detect("こんにちは世界"), Language::Ja);
        assert_eq!(detect("你好世界"), Language::Zh);
        assert_eq!(detect(""), Language::En);
    }

    #[test]
    fn test_resolve_keeps_explicit_choice() {
        assert_eq!(Language::Auto.resolve("Глава 1"), Language::Ru);
        assert_eq!(Language::Fr.resolve("Глава 1"), Language::Fr);
    }

    #[test]
    fn test_parse_codes() {
        assert_eq!("DE".parse::<Language>().unwrap(), Language::De);
        assert!("xx".parse::<Language>().is_err());
        assert_eq!(
            serde_json::to_string(&Language::Pt).unwrap(),
            "\"pt\""
        );
    }
}
