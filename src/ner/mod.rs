//! Named-entity recognition boundary
//!
//! The recognizer is an external HTTP service. This module only posts text
//! to it and maps its matches back onto character spans of the text.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Default recognizer address
pub const DEFAULT_NER_ENDPOINT: &str = "http://127.0.0.1:5000/process-ner";

/// One recognized entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NerMatch {
    pub text: String,
    pub label: String,
}

#[derive(Debug, Serialize)]
struct NerRequest<'a> {
    #[serde(rename = "teiText")]
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct NerResponse {
    #[serde(rename = "nerResults", default)]
    results: Vec<NerMatch>,
    #[serde(default)]
    error: Option<String>,
}

/// Recognizer failures
#[derive(Debug, thiserror::Error)]
pub enum NerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Recognizer error: {0}")]
    Service(String),

    #[error("Recognizer returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Entity categories known to the recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityLabel {
    Artist,
    Artwork,
    Organization,
    Date,
    Other,
}

impl EntityLabel {
    pub fn from_label(label: &str) -> Self {
        match label.to_uppercase().as_str() {
            "ARTISTA" => EntityLabel::Artist,
            "OPERA" => EntityLabel::Artwork,
            "ORGANIZATION" => EntityLabel::Organization,
            "DATE" => EntityLabel::Date,
            _ => EntityLabel::Other,
        }
    }
}

/// A recognized entity located in the text, in char offsets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySpan {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub label: EntityLabel,
}

/// Client for the recognizer service
#[derive(Debug, Clone)]
pub struct NerClient {
    client: Client,
    endpoint: String,
}

impl NerClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, NerError> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn classify(&self, text: &str) -> Result<Vec<NerMatch>, NerError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&NerRequest { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response: NerResponse = response.json().await?;
        if let Some(error) = response.error {
            return Err(NerError::Service(error));
        }

        tracing::debug!(matches = response.results.len(), "Recognized entities");
        Ok(response.results)
    }
}

fn same_char(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Locate every occurrence of each match in `text`
///
/// Matching ignores case. Repeated match texts are located once, and a span
/// overlapping one already claimed by an earlier match is dropped. Spans are
/// returned in text order.
pub fn locate(text: &str, matches: &[NerMatch]) -> Vec<EntitySpan> {
    let chars: Vec<char> = text.chars().collect();
    let mut claimed = vec![false; chars.len()];
    let mut seen = HashSet::new();
    let mut spans = Vec::new();

    for m in matches {
        let needle: Vec<char> = m.text.chars().collect();
        if needle.is_empty() || needle.len() > chars.len() || !seen.insert(m.text.as_str()) {
            continue;
        }

        let label = EntityLabel::from_label(&m.label);
        let mut start = 0;
        while start + needle.len() <= chars.len() {
            let end = start + needle.len();
            let hit = chars[start..end]
                .iter()
                .zip(&needle)
                .all(|(a, b)| same_char(*a, *b));

            if hit && !claimed[start..end].iter().any(|c| *c) {
                claimed[start..end].iter_mut().for_each(|c| *c = true);
                spans.push(EntitySpan {
                    start,
                    end,
                    text: chars[start..end].iter().collect(),
                    label,
                });
                start = end;
            } else {
                start += 1;
            }
        }
    }

    spans.sort_by_key(|span| span.start);
    spans
}
