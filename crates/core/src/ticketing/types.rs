//! Types for ticketing backend operations.

use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::session::Session;

/// Errors that can occur talking to the ticketing backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Error object returned by the backend inside a successful HTTP response.
    #[error("Backend error {code}: {message}")]
    Backend { code: String, message: String },

    #[error("Failed to parse response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Map a reqwest failure the same way for every call.
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::ConnectionFailed(e.to_string())
        }
    }
}

/// Opaque identifier naming a ticket in the backend.
///
/// Backends and webhook senders hand it out either as a JSON number or as a
/// string; both normalize to the same textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TicketRef(String);

impl TicketRef {
    /// Build from a non-empty string. Surrounding whitespace is dropped.
    pub fn new(value: impl AsRef<str>) -> Option<Self> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Accept a JSON string or non-negative integer; anything else is not a reference.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::new(s),
            Value::Number(n) => n.as_u64().map(|n| Self(n.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// JSON form used in backend payloads: numeric when the reference is a
    /// canonical number, so `"007"` stays a string.
    pub fn to_json(&self) -> Value {
        match self.0.parse::<u64>() {
            Ok(n) if n.to_string() == self.0 => Value::from(n),
            _ => Value::from(self.0.clone()),
        }
    }
}

impl fmt::Display for TicketRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for TicketRef {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl Serialize for TicketRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TicketRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        TicketRef::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom("expected a ticket id (number or string)"))
    }
}

/// Deserialize an optional field, treating a value of the wrong shape as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Deserialize an optional list, dropping elements of the wrong shape.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        ),
        _ => None,
    })
}

/// A single article as returned by the backend.
///
/// Field casing is not stable across backend versions, so every known alias
/// is kept as its own optional field and resolved through accessors. A field
/// of an unexpected type reads as absent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Article {
    #[serde(rename = "ArticleID", default, skip_serializing_if = "Option::is_none")]
    pub article_id: Option<Value>,
    /// Timestamp string or sequential number, depending on the backend.
    #[serde(rename = "CreateTime", default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<Value>,
    #[serde(rename = "Body", default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub body_title: Option<String>,
    #[serde(rename = "body", default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub body_lower: Option<String>,
    #[serde(rename = "Content", default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub content_title: Option<String>,
    #[serde(rename = "content", default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub content_lower: Option<String>,
    #[serde(rename = "Text", default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub text_title: Option<String>,
    #[serde(rename = "text", default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub text_lower: Option<String>,
}

/// Creation marker of an article. Numeric markers sort below textual ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CreateTime<'a> {
    Sequence(u64),
    Timestamp(&'a str),
}

impl Article {
    /// First non-empty body-like field, in alias priority order.
    pub fn body(&self) -> Option<&str> {
        [
            &self.body_title,
            &self.body_lower,
            &self.content_title,
            &self.content_lower,
            &self.text_title,
            &self.text_lower,
        ]
        .into_iter()
        .filter_map(|f| f.as_deref())
        .find(|s| !s.is_empty())
    }

    /// Ordering key: creation marker first, then numeric article id.
    /// Missing markers sort lowest.
    pub fn creation_marker(&self) -> (Option<CreateTime<'_>>, Option<u64>) {
        let created = self.create_time.as_ref().and_then(|v| match v {
            Value::Number(n) => n.as_u64().map(CreateTime::Sequence),
            Value::String(s) if !s.trim().is_empty() => Some(CreateTime::Timestamp(s.trim())),
            _ => None,
        });
        let id = self.article_id.as_ref().and_then(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });
        (created, id)
    }
}

/// Select the latest article by creation marker.
///
/// On equal markers the later element in backend order wins.
pub fn latest_article(articles: &[Article]) -> Option<&Article> {
    articles.iter().max_by(|a, b| a.creation_marker().cmp(&b.creation_marker()))
}

/// Article collection under any of its accepted keys.
///
/// Elements that are not article objects are dropped individually.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ArticleCollection {
    #[serde(rename = "Article", default, deserialize_with = "lenient_list")]
    article: Option<Vec<Article>>,
    #[serde(rename = "Articles", default, deserialize_with = "lenient_list")]
    articles: Option<Vec<Article>>,
    #[serde(rename = "article", default, deserialize_with = "lenient_list")]
    article_lower: Option<Vec<Article>>,
    #[serde(rename = "articles", default, deserialize_with = "lenient_list")]
    articles_lower: Option<Vec<Article>>,
}

impl ArticleCollection {
    /// First non-empty list among the aliases.
    pub(crate) fn into_articles(self) -> Option<Vec<Article>> {
        [self.article, self.articles, self.article_lower, self.articles_lower]
            .into_iter()
            .flatten()
            .find(|list| !list.is_empty())
    }
}

/// Optional ticket-level fields supplied by the caller for write-back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketFieldOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_fields: Option<Value>,
}

/// Fully resolved ticket fields sent on write-back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketFields {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "CustomerUser")]
    pub customer_user: String,
    #[serde(rename = "QueueID")]
    pub queue_id: u32,
    #[serde(rename = "PriorityID")]
    pub priority_id: u32,
    #[serde(rename = "StateID")]
    pub state_id: u32,
    #[serde(rename = "TypeID", skip_serializing_if = "Option::is_none")]
    pub type_id: Option<u32>,
    #[serde(rename = "DynamicFields", skip_serializing_if = "Option::is_none")]
    pub dynamic_fields: Option<Value>,
}

/// New article appended on write-back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewArticle {
    #[serde(rename = "Subject")]
    pub subject: String,
    #[serde(rename = "Body")]
    pub body: String,
    #[serde(rename = "ContentType")]
    pub content_type: String,
}

/// Combined ticket change applied in a single backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketUpdate {
    pub ticket: TicketFields,
    pub article: NewArticle,
}

/// Backend response to a successful write-back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub response: Value,
}

impl UpdateOutcome {
    /// Backend-reported error object, if the response carries one.
    pub fn backend_error(&self) -> Option<GatewayError> {
        backend_error(&self.response)
    }
}

/// Extract the `{"Error": {"ErrorCode", "ErrorMessage"}}` object the
/// GenericInterface returns alongside HTTP 200.
pub(crate) fn backend_error(response: &Value) -> Option<GatewayError> {
    let error = response.get("Error")?;
    if error.is_null() {
        return None;
    }
    let field = |key: &str| {
        error
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Some(GatewayError::Backend {
        code: field("ErrorCode"),
        message: match error {
            Value::String(s) => s.clone(),
            _ => field("ErrorMessage"),
        },
    })
}

/// Ticketing backend operations used by the relay.
#[async_trait]
pub trait TicketingGateway: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Body of the latest article on the ticket, or `None` when it has no
    /// readable article.
    async fn fetch_latest_article(
        &self,
        ticket: &TicketRef,
        session: &Session,
    ) -> Result<Option<String>, GatewayError>;

    /// Apply field changes and append an article in one call. Not retried and
    /// not deduplicated: two identical calls produce two articles.
    async fn apply_update(
        &self,
        ticket: &TicketRef,
        session: &Session,
        update: &TicketUpdate,
    ) -> Result<UpdateOutcome, GatewayError>;
}
