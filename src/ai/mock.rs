use super::{GenerationService, ModelRequest};
use crate::models::ModelResponse;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

enum Scripted {
    Response(ModelResponse),
    Failure(String),
    Delay(Duration, ModelResponse),
}

/// Scripted stand-in for the remote model.
///
/// Responses are served in the order they were queued; once the script is
/// exhausted every further call gets an empty response. Every request is
/// recorded so tests can assert on call count and ordering.
#[derive(Clone)]
pub struct MockGenerationClient {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<ModelRequest>>>,
}

impl MockGenerationClient {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_response(self, response: ModelResponse) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Response(response));
        self
    }

    pub fn with_failure(self, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Failure(message.to_string()));
        self
    }

    /// Queue a response that only arrives after `delay`.
    pub fn with_delayed_response(self, delay: Duration, response: ModelResponse) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Delay(delay, response));
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn get_requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationService for MockGenerationClient {
    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse> {
        self.requests.lock().unwrap().push(request.clone());

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::Failure(message)) => Err(Error::AiProvider(message)),
            Some(Scripted::Delay(delay, response)) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            None => Ok(ModelResponse::empty()),
        }
    }
}
