use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// How a single domain's crawl concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// At least one address was found
    Success,
    /// Every candidate path was probed (or skipped) without finding anything
    Empty,
    /// Normalization or crawling failed unexpectedly
    Error,
    /// The batch deadline expired before the domain was reached
    Timeout,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Success => "success",
            OutcomeStatus::Empty => "empty",
            OutcomeStatus::Error => "error",
            OutcomeStatus::Timeout => "timeout",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainOutcome {
    pub domain: String,
    pub emails: Vec<String>,
    pub count: usize,
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DomainOutcome {
    /// Build the outcome of a completed crawl; the status follows from whether
    /// anything was found.
    pub fn from_emails(domain: String, emails: BTreeSet<String>) -> Self {
        let status = if emails.is_empty() {
            OutcomeStatus::Empty
        } else {
            OutcomeStatus::Success
        };
        let emails: Vec<String> = emails.into_iter().collect();

        Self {
            domain,
            count: emails.len(),
            emails,
            status,
            error: None,
        }
    }

    pub fn with_error(domain: String, error: String) -> Self {
        Self {
            domain,
            emails: Vec::new(),
            count: 0,
            status: OutcomeStatus::Error,
            error: Some(error),
        }
    }

    pub fn timed_out(domain: String, error: String) -> Self {
        Self {
            domain,
            emails: Vec::new(),
            count: 0,
            status: OutcomeStatus::Timeout,
            error: Some(error),
        }
    }
}
