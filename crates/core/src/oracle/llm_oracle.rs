//! LLM-backed diagnosis oracle.
//!
//! Prompts a language model to classify the ticket as incident, request or
//! requirement and to write a first-level diagnosis, then parses the JSON
//! verdict out of whatever the model returned.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::llm::{CompletionRequest, LlmClient};
use super::types::{Diagnosis, DiagnosisOracle, OracleError, TicketType};
use crate::metrics;

const SYSTEM_PROMPT: &str = r#"You are a first-level support engineer. Diagnose and classify the ticket you receive.

Read the title, description and any evidence it mentions, then decide what the user is asking for:
- Incident (10): a failure, outage or degradation of an existing feature. Try to reproduce it; if it cannot be solved from the application, escalate with the probable technical root cause.
- Request (14): an action on an existing feature (activate a user, change a value, unlock something). Check whether it can be solved from the application; otherwise escalate to second level.
- Requirement (19): new development or a feature that does not exist yet. Escalate to engineering.

Check whether the ticket identifies the affected user, when it happened, the module involved and the impact. Say what is missing.
Do not assume a fix without validating it. Do not classify as incident without trying to reproduce the failure.

Respond with JSON only, no text outside it:
{
  "type_id": 14,
  "diagnostico": "Classified as Request (14). ..."
}

type_id must always be one of 10, 14 or 19."#;

/// Diagnosis oracle backed by an [`LlmClient`].
pub struct LlmOracle {
    client: Arc<dyn LlmClient>,
    max_tokens: u32,
}

impl LlmOracle {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            max_tokens: 1024,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_prompt(ticket_text: &str) -> String {
        format!("TICKET TO ANALYZE:\n{}\n", ticket_text)
    }
}

/// Raw verdict as models emit it.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(default)]
    type_id: Option<Value>,
    #[serde(default, alias = "diagnosis")]
    diagnostico: Option<String>,
}

/// Parse model output into a [`Diagnosis`].
///
/// Accepts a bare JSON object, a ```json fenced block, or an object
/// surrounded by prose. `type_id` may be a number or a numeric string.
pub fn parse_verdict(text: &str) -> Result<Diagnosis, OracleError> {
    let trimmed = strip_fence(text.trim());

    let json_str = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => {
            return Err(OracleError::Malformed(format!(
                "no JSON object in output: {}",
                preview(text)
            )))
        }
    };

    let raw: RawVerdict = serde_json::from_str(json_str)
        .map_err(|e| OracleError::Malformed(format!("{} - output: {}", e, preview(text))))?;

    let code = match raw.type_id {
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| OracleError::UnknownTicketType(n.to_string()))?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| OracleError::UnknownTicketType(s.clone()))?,
        Some(other) => return Err(OracleError::UnknownTicketType(other.to_string())),
        None => return Err(OracleError::Malformed("missing type_id".to_string())),
    };

    let ticket_type = u32::try_from(code)
        .ok()
        .and_then(TicketType::from_code)
        .ok_or_else(|| OracleError::UnknownTicketType(code.to_string()))?;

    let text = raw.diagnostico.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(OracleError::EmptyDiagnosis);
    }

    Ok(Diagnosis::new(ticket_type, text))
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening line.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}

#[async_trait]
impl DiagnosisOracle for LlmOracle {
    fn name(&self) -> &str {
        self.client.provider()
    }

    async fn diagnose(&self, ticket_text: &str) -> Result<Diagnosis, OracleError> {
        let request = CompletionRequest::new(Self::build_prompt(ticket_text))
            .with_system(SYSTEM_PROMPT)
            .with_max_tokens(self.max_tokens)
            .with_json_output();

        let provider = self.client.provider().to_string();
        let start = Instant::now();
        let result = self.client.complete(request).await;
        metrics::ORACLE_DURATION
            .with_label_values(&[&provider])
            .observe(start.elapsed().as_secs_f64());

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                metrics::ORACLE_CALLS
                    .with_label_values(&[&provider, "error"])
                    .inc();
                warn!(provider = %provider, error = %e, "Diagnosis model call failed");
                return Err(e.into());
            }
        };

        debug!(
            provider = %provider,
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Diagnosis model responded"
        );

        match parse_verdict(&response.text) {
            Ok(diagnosis) => {
                metrics::ORACLE_CALLS
                    .with_label_values(&[&provider, "success"])
                    .inc();
                Ok(diagnosis)
            }
            Err(e) => {
                metrics::ORACLE_CALLS
                    .with_label_values(&[&provider, "malformed"])
                    .inc();
                warn!(provider = %provider, error = %e, "Diagnosis output rejected");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::llm::LlmError;
    use crate::testing::MockLlmClient;

    #[test]
    fn test_parse_bare_json() {
        let d = parse_verdict(r#"{"type_id": 10, "diagnostico": "Login fails"}"#).unwrap();
        assert_eq!(d.ticket_type, TicketType::Incident);
        assert_eq!(d.text, "Login fails");
    }

    #[test]
    fn test_parse_fenced_json() {
        let text = "```json\n{\"type_id\": 19, \"diagnostico\": \"New report\"}\n```";
        let d = parse_verdict(text).unwrap();
        assert_eq!(d.ticket_type, TicketType::Requirement);
        assert_eq!(d.text, "New report");
    }

    #[test]
    fn test_parse_string_type_and_english_key() {
        let d = parse_verdict(r#"Sure: {"type_id": "14", "diagnosis": "Unlock"} done"#).unwrap();
        assert_eq!(d.ticket_type, TicketType::Request);
        assert_eq!(d.text, "Unlock");
    }

    #[test]
    fn test_parse_unknown_type() {
        let err = parse_verdict(r#"{"type_id": 12, "diagnostico": "x"}"#).unwrap_err();
        assert!(matches!(err, OracleError::UnknownTicketType(code) if code == "12"));
    }

    #[test]
    fn test_parse_missing_type() {
        let err = parse_verdict(r#"{"diagnostico": "x"}"#).unwrap_err();
        assert!(matches!(err, OracleError::Malformed(_)));
    }

    #[test]
    fn test_parse_empty_diagnosis() {
        let err = parse_verdict(r#"{"type_id": 10, "diagnostico": "  "}"#).unwrap_err();
        assert!(matches!(err, OracleError::EmptyDiagnosis));
    }

    #[test]
    fn test_parse_not_json() {
        assert!(matches!(
            parse_verdict("I cannot help with that").unwrap_err(),
            OracleError::Malformed(_)
        ));
        assert!(matches!(parse_verdict("").unwrap_err(), OracleError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_diagnose_sends_ticket_text() {
        let client = Arc::new(MockLlmClient::new(
            r#"{"type_id": 14, "diagnostico": "Reset the password"}"#,
        ));
        let oracle = LlmOracle::new(client.clone()).with_max_tokens(256);

        let d = oracle.diagnose("I forgot my password").await.unwrap();
        assert_eq!(d, Diagnosis::new(TicketType::Request, "Reset the password"));

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].prompt.contains("I forgot my password"));
        assert_eq!(requests[0].max_tokens, 256);
        assert!(requests[0].json_output);
        assert!(requests[0].system.is_some());
    }

    #[tokio::test]
    async fn test_diagnose_propagates_client_error() {
        let client = Arc::new(MockLlmClient::failing(LlmError::Api {
            status: 503,
            message: "overloaded".to_string(),
        }));
        let oracle = LlmOracle::new(client);

        let err = oracle.diagnose("text").await.unwrap_err();
        assert!(matches!(err, OracleError::Llm(LlmError::Api { status: 503, .. })));
    }
}
