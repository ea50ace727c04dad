//! Mock diagnosis oracle and LLM client for testing.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::oracle::{
    CompletionRequest, CompletionResponse, Diagnosis, DiagnosisOracle, LlmClient, LlmError,
    LlmUsage, OracleError, TicketType,
};

/// Mock implementation of the DiagnosisOracle trait.
///
/// Returns a fixed diagnosis (an incident by default) and records the text
/// of every call.
#[derive(Debug)]
pub struct MockOracle {
    diagnosis: Mutex<Diagnosis>,
    next_error: Mutex<Option<OracleError>>,
    calls: Mutex<Vec<String>>,
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl MockOracle {
    pub fn new() -> Self {
        Self {
            diagnosis: Mutex::new(Diagnosis::new(TicketType::Incident, "Mock diagnosis")),
            next_error: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_diagnosis(&self, diagnosis: Diagnosis) {
        *self.diagnosis.lock().unwrap() = diagnosis;
    }

    /// Fail the next call with `error`.
    pub fn fail_next(&self, error: OracleError) {
        *self.next_error.lock().unwrap() = Some(error);
    }

    /// Ticket texts diagnosed so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiagnosisOracle for MockOracle {
    fn name(&self) -> &str {
        "mock"
    }

    async fn diagnose(&self, ticket_text: &str) -> Result<Diagnosis, OracleError> {
        self.calls.lock().unwrap().push(ticket_text.to_string());

        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Err(error);
        }

        Ok(self.diagnosis.lock().unwrap().clone())
    }
}

/// Mock implementation of the LlmClient trait.
///
/// Answers every request with the same text (or error) and records requests.
#[derive(Debug)]
pub struct MockLlmClient {
    response: Mutex<Result<String, LlmError>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: Mutex::new(Ok(response.into())),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: LlmError) -> Self {
        Self {
            response: Mutex::new(Err(error)),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn set_response(&self, response: impl Into<String>) {
        *self.response.lock().unwrap() = Ok(response.into());
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request);
        let text = self.response.lock().unwrap().clone()?;
        Ok(CompletionResponse {
            text,
            usage: LlmUsage {
                input_tokens: 100,
                output_tokens: 50,
            },
            model: "mock-model".to_string(),
        })
    }
}
