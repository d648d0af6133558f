//! Destination identity: where a prompt goes and how to recognise the tab
//! once it is ready.

use serde::Serialize;
use url::Url;

use crate::errors::TriggerError;

/// Query parameter that forces the host to start a new conversation.
pub const FRESH_PARAM: &str = "fresh";

/// Query parameter the host reads as a pre-filled prompt.
pub const PREFILL_PARAM: &str = "q";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DestinationIdentity {
    address: Url,
    title_match: String,
    address_patterns: Vec<String>,
}

impl DestinationIdentity {
    pub fn new(
        address: &str,
        title_match: impl Into<String>,
        address_patterns: Vec<String>,
    ) -> Result<Self, TriggerError> {
        let invalid = |reason: String| TriggerError::InvalidDestination {
            address: address.to_string(),
            reason,
        };
        let parsed = Url::parse(address).map_err(|err| invalid(err.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
        }
        let address_patterns = if address_patterns.is_empty() {
            vec![format!("{}/*", parsed.origin().ascii_serialization())]
        } else {
            address_patterns
        };
        Ok(Self {
            address: parsed,
            title_match: title_match.into(),
            address_patterns,
        })
    }

    pub fn address(&self) -> &str {
        self.address.as_str()
    }

    pub fn title_match(&self) -> &str {
        &self.title_match
    }

    pub fn address_patterns(&self) -> &[String] {
        &self.address_patterns
    }

    /// Case-insensitive substring test. An empty needle matches any title.
    pub fn title_matches(&self, title: &str) -> bool {
        title
            .to_lowercase()
            .contains(&self.title_match.to_lowercase())
    }

    pub fn matches_address(&self, address: &str) -> bool {
        self.address_patterns
            .iter()
            .any(|pattern| glob_match(pattern, address))
    }

    /// The destination address made unique so the host opens a new
    /// conversation instead of resuming a cached one.
    pub fn fresh_address(&self) -> String {
        let stamp = chrono::Utc::now().timestamp_millis().to_string();
        let mut url = self.address.clone();
        url.query_pairs_mut().append_pair(FRESH_PARAM, &stamp);
        url.into()
    }

    /// The destination address carrying `message` as the pre-filled prompt.
    pub fn prefill_address(&self, message: &str) -> String {
        let mut url = self.address.clone();
        url.set_query(None);
        url.query_pairs_mut().append_pair(PREFILL_PARAM, message);
        url.into()
    }
}

/// `*` matches any run of characters; everything else is literal.
fn glob_match(pattern: &str, candidate: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or_default();
    let Some(mut rest) = candidate.strip_prefix(first) else {
        return false;
    };
    let segments: Vec<&str> = parts.collect();
    let Some((last, middle)) = segments.split_last() else {
        return rest.is_empty();
    };
    for segment in middle {
        match rest.find(segment) {
            Some(at) => rest = &rest[at + segment.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}
