use std::fmt;

use uuid::Uuid;

/// Identity of one logical user action. Both attempts of a delivery share it.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Text to place into a destination composer, plus how to treat it.
///
/// Immutable once built; a retry reuses the same value under a different label.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeliveryRequest {
    pub text: String,
    pub request_id: RequestId,
    pub auto_submit: bool,
    pub label: String,
}

impl DeliveryRequest {
    /// Build a request with a fresh identity.
    pub fn new(text: impl Into<String>, auto_submit: bool, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            request_id: RequestId::new(),
            auto_submit,
            label: label.into(),
        }
    }

    /// Same request (same identity), different diagnostic label.
    pub fn relabeled(&self, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..self.clone()
        }
    }
}

/// Result of exactly one automaton invocation.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DeliveryOutcome {
    pub inserted: bool,
    pub submitted: bool,
    pub skipped: bool,
}

impl DeliveryOutcome {
    pub const fn skipped() -> Self {
        Self {
            inserted: false,
            submitted: false,
            skipped: true,
        }
    }

    pub const fn failed() -> Self {
        Self {
            inserted: false,
            submitted: false,
            skipped: false,
        }
    }

    pub const fn delivered(submitted: bool) -> Self {
        Self {
            inserted: true,
            submitted,
            skipped: false,
        }
    }

    /// Whether this outcome counts as a successful delivery for the coordinator.
    pub fn is_success(&self) -> bool {
        !self.skipped && (self.inserted || self.submitted)
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "inserted={} submitted={} skipped={}",
            self.inserted, self.submitted, self.skipped
        )
    }
}
