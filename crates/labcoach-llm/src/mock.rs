//! Scripted generation backend for tests and offline demos.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::backend::GenerationBackend;
use crate::errors::{GenerationError, Result};
use crate::prompt::GenerationPrompt;

/// One scripted reply.
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Return this text.
    Text(String),
    /// Fail with [`GenerationError::Unavailable`].
    Fail(String),
    /// Sleep, then return the text (for timeout paths).
    Delayed(Duration, String),
}

/// Backend that replays a queue of [`MockResponse`]s.
///
/// An exhausted script fails as unavailable.
#[derive(Default)]
pub struct MockGenerationBackend {
    script: Mutex<VecDeque<MockResponse>>,
    prompts: Mutex<Vec<GenerationPrompt>>,
}

impl MockGenerationBackend {
    /// Backend replaying `responses` in order.
    pub fn new(responses: impl IntoIterator<Item = MockResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Backend with a single scripted reply.
    pub fn replying(text: impl Into<String>) -> Self {
        Self::new([MockResponse::Text(text.into())])
    }

    /// Backend whose every call fails.
    pub fn failing() -> Self {
        Self::default()
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<GenerationPrompt> {
        self.prompts.lock().clone()
    }

    /// Number of calls received.
    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl GenerationBackend for MockGenerationBackend {
    async fn generate(&self, prompt: &GenerationPrompt) -> Result<String> {
        self.prompts.lock().push(prompt.clone());
        let next = self.script.lock().pop_front();
        match next {
            Some(MockResponse::Text(text)) => Ok(text),
            Some(MockResponse::Fail(reason)) => Err(GenerationError::Unavailable(reason)),
            Some(MockResponse::Delayed(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            None => Err(GenerationError::Unavailable("mock script exhausted".into())),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
