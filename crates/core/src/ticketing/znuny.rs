//! Znuny / OTRS GenericTicketConnectorREST client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::ZnunyConfig;
use crate::session::{Session, SessionError, SessionLogin};

use super::types::{backend_error, ArticleCollection};
use super::{latest_article, GatewayError, TicketRef, TicketUpdate, TicketingGateway, UpdateOutcome};

/// Znuny REST client.
///
/// Implements both the login exchange used by the session cache and the
/// ticket read/write operations used by the relay.
pub struct ZnunyClient {
    client: Client,
    config: ZnunyConfig,
}

impl ZnunyClient {
    /// Create a new client. Every request is bounded by `config.timeout_secs`.
    pub fn new(config: ZnunyConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| GatewayError::ConnectionFailed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn ticket_url(&self, ticket: &TicketRef) -> String {
        format!(
            "{}/Ticket/{}",
            self.base_url(),
            urlencoding::encode(ticket.as_str())
        )
    }

    /// Primary query shape: the ticket with all of its articles expanded.
    ///
    /// Returns `Ok(None)` when the response holds no usable article list;
    /// only transport failures are errors.
    async fn articles_from_ticket(
        &self,
        ticket: &TicketRef,
        session: &Session,
    ) -> Result<Option<String>, GatewayError> {
        let response = self
            .client
            .get(self.ticket_url(ticket))
            .header("Accept", "application/json")
            .query(&[("SessionID", session.token()), ("AllArticles", "1")])
            .send()
            .await
            .map_err(GatewayError::from_reqwest)?;

        let Some(body) = read_json(response, "Ticket").await? else {
            return Ok(None);
        };

        let record = match body.get("Ticket") {
            Some(Value::Array(list)) => list.first().cloned(),
            Some(obj @ Value::Object(_)) => Some(obj.clone()),
            _ => None,
        };
        let Some(record) = record else {
            debug!(ticket_id = %ticket, "Ticket response has no ticket record");
            return Ok(None);
        };

        Ok(latest_body(record))
    }

    /// Fallback query shape: articles filtered by ticket id.
    async fn articles_by_ticket_filter(
        &self,
        ticket: &TicketRef,
        session: &Session,
    ) -> Result<Option<String>, GatewayError> {
        let url = format!("{}/Article", self.base_url());
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .query(&[("TicketID", ticket.as_str()), ("SessionID", session.token())])
            .send()
            .await
            .map_err(GatewayError::from_reqwest)?;

        Ok(read_json(response, "Article").await?.and_then(latest_body))
    }
}

/// Read a 2xx JSON response, degrading HTTP, parse and backend errors to `None`.
async fn read_json(response: Response, query: &str) -> Result<Option<Value>, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        warn!(query, status = status.as_u16(), "Article query rejected");
        return Ok(None);
    }

    let text = response.text().await.map_err(GatewayError::from_reqwest)?;
    let body: Value = match serde_json::from_str(&text) {
        Ok(body) => body,
        Err(e) => {
            warn!(query, error = %e, "Article query returned non-JSON body");
            return Ok(None);
        }
    };

    if let Some(err) = backend_error(&body) {
        warn!(query, error = %err, "Article query returned backend error");
        return Ok(None);
    }

    Ok(Some(body))
}

/// Body of the latest article in an object holding an article collection.
fn latest_body(holder: Value) -> Option<String> {
    let articles = serde_json::from_value::<ArticleCollection>(holder)
        .ok()?
        .into_articles()?;
    latest_article(&articles)
        .and_then(|a| a.body())
        .map(str::to_string)
}

/// Login response; the token has appeared under each of these keys.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "SessionID", default)]
    session_id: Option<String>,
    #[serde(rename = "Session", default)]
    session: Option<String>,
    #[serde(rename = "session_id", default)]
    session_id_lower: Option<String>,
}

impl LoginResponse {
    fn into_token(self) -> Option<String> {
        [self.session_id, self.session, self.session_id_lower]
            .into_iter()
            .flatten()
            .find(|t| !t.is_empty())
    }
}

#[async_trait]
impl SessionLogin for ZnunyClient {
    async fn create_session(&self) -> Result<String, SessionError> {
        let url = format!("{}/Session", self.base_url());
        debug!(url = %url, user = %self.config.user, "Logging in to Znuny");

        let response = self
            .client
            .patch(&url)
            .header("Accept", "application/json")
            .json(&json!({
                "UserLogin": self.config.user,
                "Password": self.config.password,
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SessionError::Timeout
                } else {
                    SessionError::ConnectionFailed(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SessionError::ConnectionFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(SessionError::AuthenticationFailed(format!(
                "HTTP {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let body: Value = serde_json::from_str(&text)
            .map_err(|e| SessionError::MissingToken(format!("invalid JSON ({})", e)))?;

        if let Some(err) = backend_error(&body) {
            return Err(SessionError::AuthenticationFailed(err.to_string()));
        }

        serde_json::from_value::<LoginResponse>(body)
            .ok()
            .and_then(LoginResponse::into_token)
            .ok_or_else(|| SessionError::MissingToken(text.chars().take(200).collect()))
    }
}

#[async_trait]
impl TicketingGateway for ZnunyClient {
    fn name(&self) -> &str {
        "znuny"
    }

    async fn fetch_latest_article(
        &self,
        ticket: &TicketRef,
        session: &Session,
    ) -> Result<Option<String>, GatewayError> {
        if let Some(body) = self.articles_from_ticket(ticket, session).await? {
            return Ok(Some(body));
        }

        debug!(ticket_id = %ticket, "No article via ticket query, trying article query");
        self.articles_by_ticket_filter(ticket, session).await
    }

    async fn apply_update(
        &self,
        ticket: &TicketRef,
        session: &Session,
        update: &TicketUpdate,
    ) -> Result<UpdateOutcome, GatewayError> {
        let payload = json!({
            "SessionID": session.token(),
            "TicketID": ticket.to_json(),
            "Ticket": update.ticket,
            "Article": update.article,
        });

        let response = self
            .client
            .patch(self.ticket_url(ticket))
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(GatewayError::from_reqwest)?;

        let status = response.status();
        let text = response.text().await.map_err(GatewayError::from_reqwest)?;

        if !status.is_success() {
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body: text.chars().take(200).collect(),
            });
        }

        let response: Value = serde_json::from_str(&text)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        Ok(UpdateOutcome { response })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_response_aliases() {
        let r: LoginResponse = serde_json::from_value(json!({"Session": "abc"})).unwrap();
        assert_eq!(r.into_token().as_deref(), Some("abc"));

        let r: LoginResponse =
            serde_json::from_value(json!({"SessionID": "", "session_id": "lower"})).unwrap();
        assert_eq!(r.into_token().as_deref(), Some("lower"));

        let r: LoginResponse = serde_json::from_value(json!({"Other": 1})).unwrap();
        assert!(r.into_token().is_none());
    }

    #[test]
    fn test_latest_body_from_ticket_record() {
        let record = json!({
            "TicketID": 100,
            "Article": [
                {"ArticleID": 1, "CreateTime": "2024-05-01 10:00:00", "Body": "first"},
                {"ArticleID": 2, "CreateTime": "2024-05-02 10:00:00", "Body": "second"}
            ]
        });
        assert_eq!(latest_body(record).as_deref(), Some("second"));
    }

    #[test]
    fn test_latest_body_without_articles() {
        assert!(latest_body(json!({"TicketID": 100})).is_none());
        assert!(latest_body(json!({"Article": "not a list"})).is_none());
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let client = ZnunyClient::new(ZnunyConfig {
            base_url: "http://znuny.local/rest/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            client.ticket_url(&TicketRef::from(5)),
            "http://znuny.local/rest/Ticket/5"
        );
    }
}
