//! Document → mind map pipeline
//!
//! One branch per chapter under a root named after the document.

use std::sync::Arc;

use mindmap_core::{OutlineNode, SourceRef};

use crate::error::{GenerationError, Result};
use crate::extractor::ChapterExtractor;
use crate::language::Language;
use crate::prompt::GenerationInput;
use crate::service::{GenerationRequest, GenerationService};

pub struct DocumentPipeline {
    extractor: ChapterExtractor,
    service: Arc<GenerationService>,
}

impl DocumentPipeline {
    pub const fn new(extractor: ChapterExtractor, service: Arc<GenerationService>) -> Self {
        Self { extractor, service }
    }

    pub async fn generate_from_pdf(
        &self,
        bytes: &[u8],
        title: &str,
        language: Language,
    ) -> Result<OutlineNode> {
        let text = self.extractor.extract_text(bytes)?;
        self.generate_from_text(&text, title, language).await
    }

    /// Chapters that fail to generate are skipped; if all fail, the last error is returned
    pub async fn generate_from_text(
        &self,
        text: &str,
        title: &str,
        language: Language,
    ) -> Result<OutlineNode> {
        let chapters = self.extractor.split_chapters(text, title);
        if chapters.is_empty() {
            return Err(GenerationError::EmptyInput);
        }

        let total = chapters.len();
        let mut root = OutlineNode::new(title);
        let mut last_error = None;

        for (index, chapter) in chapters.into_iter().enumerate() {
            tracing::info!(chapter = index + 1, total, title = %chapter.title, "Generating chapter");
            let request =
                GenerationRequest::new(chapter.title.clone(), GenerationInput::text(chapter.text))
                    .with_language(language);

            match self.service.generate(&request).await {
                Ok(mut branch) => {
                    branch.label.clone_from(&chapter.title);
                    branch.source = Some(SourceRef {
                        chapter: Some(chapter.title),
                        page: None,
                    });
                    root.push(branch);
                }
                Err(e) => {
                    tracing::warn!(title = %chapter.title, error = %e, "Skipping chapter");
                    last_error = Some(e);
                }
            }
        }

        if root.is_leaf() {
            return Err(last_error.unwrap_or(GenerationError::EmptyInput));
        }
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::ExtractorConfig;
    use crate::service::GenerationConfig;
    use crate::testing::{ScriptedProvider, Step};
    use mindmap_core::CoreError;

    fn pipeline(provider: Arc<ScriptedProvider>) -> DocumentPipeline {
        let service = GenerationService::new(provider, GenerationConfig::default());
        let extractor = ChapterExtractor::new(ExtractorConfig {
            min_chapter_chars: 20,
            ..ExtractorConfig::default()
        });
        DocumentPipeline::new(extractor, Arc::new(service))
    }

    const BOOK: &str = "Chapter 1 Seeds\nSeeds need water and light to sprout.\nChapter 2 Roots\nRoots anchor the plant and draw nutrients.";

    #[tokio::test]
    async fn test_one_branch_per_chapter() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Step::Reply("# Seeds\n- Water\n- Light"),
            Step::Reply("# Roots\n- Anchor"),
        ]));
        let tree = pipeline(provider.clone())
            .generate_from_text(BOOK, "Garden", Language::En)
            .await
            .unwrap();

        assert_eq!(tree.label, "Garden");
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].label, "Chapter 1 Seeds");
        assert_eq!(tree.children[0].children.len(), 2);
        assert_eq!(
            tree.children[1].source.as_ref().and_then(|s| s.chapter.as_deref()),
            Some("Chapter 2 Roots")
        );
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_chapter_is_skipped() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Step::Fail(CoreError::Auth("revoked".into())),
            Step::Reply("# Roots\n- Anchor"),
        ]));
        let tree = pipeline(provider)
            .generate_from_text(BOOK, "Garden", Language::En)
            .await
            .unwrap();

        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].label, "Chapter 2 Roots");
    }

    #[tokio::test]
    async fn test_all_chapters_failing_returns_last_error() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Step::Fail(CoreError::Auth("revoked".into())),
            Step::Fail(CoreError::Parse("garbage".into())),
        ]));
        let err = pipeline(provider)
            .generate_from_text(BOOK, "Garden", Language::En)
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Provider(CoreError::Parse(_))));
    }

    #[tokio::test]
    async fn test_blank_document_is_empty_input() {
        let provider = Arc::new(ScriptedProvider::replying("# X"));
        let err = pipeline(provider.clone())
            .generate_from_text(" \n ", "Empty", Language::En)
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::EmptyInput));
        assert_eq!(provider.calls(), 0);
    }
}
