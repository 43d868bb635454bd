//! Scripted provider for unit tests

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use mindmap_core::{
    CoreError, Message, Result,
    provider::{Completion, FinishReason, GenerationOptions, LlmProvider, ModelInfo, ProviderInfo},
};

pub enum Step {
    Reply(&'static str),
    Fail(CoreError),
    Hang,
}

/// Plays back `Step`s in order; once exhausted, repeats `fallback`
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    fallback: &'static str,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            fallback: "# Default\n- item",
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(reply: &'static str) -> Self {
        let mut provider = Self::new(Vec::new());
        provider.fallback = reply;
        provider
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn info(&self) -> Result<ProviderInfo> {
        Ok(ProviderInfo {
            name: "Scripted".into(),
            models: Vec::new(),
        })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(last) = messages.last() {
            self.prompts.lock().unwrap().push(last.content.clone());
        }

        let step = self.steps.lock().unwrap().pop_front();
        let content = match step {
            Some(Step::Reply(text)) => text,
            Some(Step::Fail(err)) => return Err(err),
            Some(Step::Hang) => std::future::pending().await,
            None => self.fallback,
        };

        Ok(Completion {
            content: content.to_string(),
            model: options.model.clone(),
            usage: None,
            finish_reason: Some(FinishReason::Stop),
        })
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(Vec::new())
    }
}
