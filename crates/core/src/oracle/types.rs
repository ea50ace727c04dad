//! Diagnosis types and the oracle trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::llm::LlmError;

/// Errors that can occur while diagnosing a ticket.
#[derive(Debug, Clone, Error)]
pub enum OracleError {
    #[error("Diagnosis model call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Malformed diagnosis output: {0}")]
    Malformed(String),

    #[error("Unknown ticket type code: {0}")]
    UnknownTicketType(String),

    #[error("Diagnosis text is empty")]
    EmptyDiagnosis,

    #[error("Oracle not configured: {0}")]
    NotConfigured(String),
}

/// Ticket type codes understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketType {
    /// Failure or degradation of an existing feature.
    Incident,
    /// Action on an existing feature (unlock a user, change data, ...).
    Request,
    /// New development.
    Requirement,
}

impl TicketType {
    pub const ALL: [TicketType; 3] = [
        TicketType::Incident,
        TicketType::Request,
        TicketType::Requirement,
    ];

    pub fn code(&self) -> u32 {
        match self {
            TicketType::Incident => 10,
            TicketType::Request => 14,
            TicketType::Requirement => 19,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TicketType::Incident => "incident",
            TicketType::Request => "request",
            TicketType::Requirement => "requirement",
        }
    }
}

impl Serialize for TicketType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.code())
    }
}

impl<'de> Deserialize<'de> for TicketType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u32::deserialize(deserializer)?;
        TicketType::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown ticket type {}", code)))
    }
}

/// Classification produced for one ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    #[serde(rename = "type_id")]
    pub ticket_type: TicketType,
    #[serde(rename = "diagnosis")]
    pub text: String,
}

impl Diagnosis {
    pub fn new(ticket_type: TicketType, text: impl Into<String>) -> Self {
        Self {
            ticket_type,
            text: text.into(),
        }
    }
}

/// External capability that classifies ticket text.
#[async_trait]
pub trait DiagnosisOracle: Send + Sync {
    /// Name of this oracle for logging.
    fn name(&self) -> &str;

    /// Classify the ticket text. Output that does not parse into a complete
    /// diagnosis is an error, never a partial result.
    async fn diagnose(&self, ticket_text: &str) -> Result<Diagnosis, OracleError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ticket_type_codes() {
        assert_eq!(TicketType::from_code(10), Some(TicketType::Incident));
        assert_eq!(TicketType::from_code(14), Some(TicketType::Request));
        assert_eq!(TicketType::from_code(19), Some(TicketType::Requirement));
        assert_eq!(TicketType::from_code(11), None);
    }

    #[test]
    fn test_diagnosis_serialization() {
        let diagnosis = Diagnosis::new(TicketType::Request, "Unlock the account");
        let value = serde_json::to_value(&diagnosis).unwrap();
        assert_eq!(value, json!({"type_id": 14, "diagnosis": "Unlock the account"}));
    }

    #[test]
    fn test_error_display() {
        let err = OracleError::UnknownTicketType("12".to_string());
        assert_eq!(err.to_string(), "Unknown ticket type code: 12");
    }
}
