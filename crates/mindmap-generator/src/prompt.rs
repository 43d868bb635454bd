//! Prompt Templates
//!
//! Fixed templates; the same input always renders the same prompt, which keeps
//! cache keys and test expectations stable.

use mindmap_core::Message;
use serde::{Deserialize, Serialize};

use crate::language::Language;

/// What the user asked a mind map to be built from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationInput {
    /// Free text or an extracted chapter
    Text { text: String },

    /// A topic with a description of what to cover
    Topic { topic: String, description: String },
}

impl GenerationInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text { text } => text.trim().is_empty(),
            Self::Topic { topic, description } => {
                topic.trim().is_empty() && description.trim().is_empty()
            }
        }
    }

    /// Text handed to the chunker
    pub fn render(&self) -> String {
        match self {
            Self::Text { text } => text.trim().to_string(),
            Self::Topic { topic, description } => format!(
                "Topic: {}\n\nDescription:\n{}\n\nPlease create a detailed mind map about this topic.",
                topic.trim(),
                description.trim()
            ),
        }
    }
}

/// Build the system and user messages for chunk `index` (1-based) of `total`
pub fn build_messages(language: Language, chunk: &str, index: usize, total: usize) -> Vec<Message> {
    vec![
        Message::system(language.system_prompt()),
        Message::user(user_prompt(language, chunk, index, total)),
    ]
}

fn user_prompt(language: Language, chunk: &str, index: usize, total: usize) -> String {
    match language {
        Language::Ru => format!(
            "Создайте раздел майндмапа из этой части текста ({index}/{total}).\n\
             Извлеките и организуйте ключевую информацию в четкую структуру.\n\n\
             Требования:\n\
             1. СТРУКТУРА:\n\
             - Начните с заголовка H1 с названием темы\n\
             - Используйте заголовки H2 для основных тем\n\
             - Используйте маркированные списки для ключевых деталей\n\n\
             2. СОДЕРЖАНИЕ:\n\
             - Сосредоточьтесь на основных идеях и концепциях\n\
             - Включите практические выводы и примеры\n\
             - Избегайте повторений\n\
             - Пропускайте техническую или издательскую информацию\n\n\
             Часть текста {index}/{total}:\n{chunk}"
        ),
        Language::Auto | Language::En => english_prompt(chunk, index, total),
        other => format!(
            "{}\n\nWrite the entire mind map in {}.",
            english_prompt(chunk, index, total),
            other.english_name()
        ),
    }
}

fn english_prompt(chunk: &str, index: usize, total: usize) -> String {
    format!(
        "Create a mind map section from this text part {index}/{total}.\n\
         Extract and organize the key information into a clear structure.\n\n\
         Requirements:\n\
         1. STRUCTURE:\n\
         - Start with an H1 heading naming the subject\n\
         - Use H2 headings for main themes\n\
         - Use bullet points for key details\n\n\
         2. CONTENT:\n\
         - Focus on main ideas and concepts\n\
         - Include practical insights and examples\n\
         - Avoid repetition\n\
         - Skip technical or publishing information\n\n\
         Text section {index}/{total}:\n{chunk}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindmap_core::Role;

    #[test]
    fn test_prompts_are_deterministic() {
        let a = build_messages(Language::En, "Ownership", 1, 2);
        let b = build_messages(Language::En, "Ownership", 1, 2);
        assert_eq!(a[1].content, b[1].content);
        assert_eq!(a[0].role, Role::System);
        assert!(a[1].content.contains("part 1/2"));
        assert!(a[1].content.ends_with("Ownership"));
    }

    #[test]
    fn test_other_languages_get_explicit_instruction() {
        let messages = build_messages(Language::De, "text", 1, 1);
        assert!(messages[1].content.contains("Write the entire mind map in German."));
        assert!(messages[0].content.contains("Deutsch"));

        let ru = build_messages(Language::Ru, "текст", 1, 1);
        assert!(ru[1].content.contains("Часть текста 1/1"));
    }

    #[test]
    fn test_topic_rendering_and_blank_check() {
        let input = GenerationInput::Topic {
            topic: " Rust ".into(),
            description: "memory safety".into(),
        };
        assert!(input.render().starts_with("Topic: Rust\n\nDescription:\nmemory safety"));
        assert!(GenerationInput::text("  \n").is_blank());
        assert!(
            GenerationInput::Topic {
                topic: String::new(),
                description: " ".into()
            }
            .is_blank()
        );
    }
}
