//! The seam to the external text-generation service.

use crate::error::{Result, SumvoxError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Trait for the external generation service.
///
/// This trait allows swapping implementations (real vendor client vs mock).
/// The core depends on nothing beyond "accepts a prompt string, returns a
/// text string, may fail with a transient or permanent error".
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for the given prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get the name of this generator for logging.
    fn name(&self) -> &str;
}

/// Mock generator for testing.
///
/// Responses are scripted: queued results are returned in order, after which
/// the default response repeats. Prompts are recorded for assertions.
pub struct MockGenerator {
    name: String,
    default_response: String,
    scripted: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockGenerator {
    /// Create a new mock generator with default settings.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            default_response: "{\"content\": \"mock summary\"}".to_string(),
            scripted: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Configure the default response returned once scripted results run out.
    pub fn with_response(mut self, response: &str) -> Self {
        self.default_response = response.to_string();
        self
    }

    /// Queue one successful response.
    pub fn with_scripted_response(self, response: &str) -> Self {
        self.scripted
            .lock()
            .expect("mock lock")
            .push_back(Ok(response.to_string()));
        self
    }

    /// Queue one failure.
    pub fn with_scripted_failure(self, error: SumvoxError) -> Self {
        self.scripted
            .lock()
            .expect("mock lock")
            .push_back(Err(error));
        self
    }

    /// Number of generate calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received, in call order.
    pub fn recorded_prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("mock lock").clone()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .expect("mock lock")
            .push(prompt.to_string());
        match self.scripted.lock().expect("mock lock").pop_front() {
            Some(result) => result,
            None => Ok(self.default_response.clone()),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_default_response() {
        let generator = MockGenerator::new("test").with_response("{\"content\": \"hi\"}");
        let result = generator.generate("prompt").await.unwrap();
        assert_eq!(result, "{\"content\": \"hi\"}");
    }

    #[tokio::test]
    async fn test_mock_scripted_order_then_default() {
        let generator = MockGenerator::new("test")
            .with_response("default")
            .with_scripted_response("first")
            .with_scripted_response("second");

        assert_eq!(generator.generate("a").await.unwrap(), "first");
        assert_eq!(generator.generate("b").await.unwrap(), "second");
        assert_eq!(generator.generate("c").await.unwrap(), "default");
    }

    #[tokio::test]
    async fn test_mock_scripted_failure() {
        let generator = MockGenerator::new("test").with_scripted_failure(
            SumvoxError::ServiceUnavailable {
                message: "down".into(),
            },
        );
        let err = generator.generate("p").await.unwrap_err();
        assert!(matches!(err, SumvoxError::ServiceUnavailable { .. }));
        // After the scripted failure, the default succeeds
        assert!(generator.generate("p").await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_records_prompts_and_calls() {
        let generator = MockGenerator::new("test");
        generator.generate("one").await.unwrap();
        generator.generate("two").await.unwrap();
        assert_eq!(generator.call_count(), 2);
        assert_eq!(generator.recorded_prompts(), vec!["one", "two"]);
    }

    #[test]
    fn test_generator_trait_object_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn TextGenerator>();
        assert_send_sync::<MockGenerator>();
    }
}
