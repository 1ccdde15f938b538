//! Earthquake feed client.
//!
//! Provides blocking HTTP access to the live earthquake feed.
//! Uses reqwest with rustls for TLS.
//!
//! The upstream has shipped under two documented endpoints with different
//! default limits, so nothing beyond "GET returns a JSON array, newest
//! first" is assumed about it; per-record schema tolerance lives in
//! [`crate::normalize`].

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::errors::QuakeError;

/// Default request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// User agent string for API requests.
const USER_AGENT: &str = concat!("quakepulse/", env!("CARGO_PKG_VERSION"));

/// Default live feed endpoint.
pub const DEFAULT_FEED_URL: &str = "https://api.orhanaydogdu.com.tr/deprem/live.php";

/// Default number of records to request per poll.
pub const DEFAULT_LIMIT: usize = 20;

/// Client for the earthquake feed.
pub struct FeedClient {
    client: reqwest::blocking::Client,
    base_url: String,
    limit: usize,
}

impl FeedClient {
    /// Create a new feed client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(base_url: impl Into<String>, limit: usize) -> Result<Self, QuakeError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            limit,
        })
    }

    /// Fetch one poll's worth of raw records.
    ///
    /// The records come back untyped: field-level tolerance is the
    /// normalizer's job, but the outer shape must be a JSON array.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the feed answers with an
    /// error status, or the body is not a JSON array.
    #[instrument(skip(self))]
    pub fn fetch(&self) -> Result<Vec<Value>, QuakeError> {
        debug!("fetching feed from {} (limit {})", self.base_url, self.limit);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("limit", self.limit)])
            .send()?;

        // Check status before parsing
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(QuakeError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: Value = serde_json::from_str(&response.text()?)?;
        let records = parse_records(body)?;

        debug!("fetched {} records", records.len());
        Ok(records)
    }
}

/// Validate the outer response shape.
///
/// The feed promises a bare JSON array; some deployments wrap it in a
/// `{"result": [...]}` envelope, which is unwrapped here. Anything else
/// is an invalid response.
fn parse_records(body: Value) -> Result<Vec<Value>, QuakeError> {
    match body {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => match map.remove("result") {
            Some(Value::Array(records)) => Ok(records),
            _ => Err(QuakeError::InvalidResponse(
                "expected a JSON array of records".to_string(),
            )),
        },
        other => Err(QuakeError::InvalidResponse(format!(
            "expected a JSON array, got {}",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
