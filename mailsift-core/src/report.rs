// Result aggregation and report rendering

use crate::batch::BatchResult;
use colored::Colorize;
use mailsift_scanner::{DomainOutcome, OutcomeStatus};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Placed in the email column for domains where nothing was found
pub const NO_EMAIL_SENTINEL: &str = "no email found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            _ => None,
        }
    }
}

/// Counts and timing derived from a batch's outcomes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_emails: usize,
    pub processed: usize,
    pub elapsed_time: f64,
    pub avg_time_per_domain: f64,
}

impl BatchSummary {
    pub fn new(outcomes: &[DomainOutcome], elapsed_seconds: f64) -> Self {
        let processed = outcomes.len();
        let avg_time_per_domain = if processed == 0 {
            0.0
        } else {
            elapsed_seconds / processed as f64
        };

        Self {
            total_emails: outcomes.iter().map(|o| o.count).sum(),
            processed,
            elapsed_time: elapsed_seconds,
            avg_time_per_domain,
        }
    }

    pub fn from_result(result: &BatchResult) -> Self {
        Self::new(&result.outcomes, result.elapsed_seconds())
    }
}

/// Payload of a successful batch request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub success: bool,
    pub results: Vec<DomainOutcome>,
    #[serde(flatten)]
    pub summary: BatchSummary,
}

impl From<BatchResult> for BatchResponse {
    fn from(result: BatchResult) -> Self {
        let summary = BatchSummary::from_result(&result);
        Self {
            success: true,
            results: result.outcomes,
            summary,
        }
    }
}

/// One row per (domain, email); domains without addresses get a single
/// sentinel row with a zero count.
pub fn generate_csv_report(outcomes: &[DomainOutcome]) -> String {
    let mut csv = String::from("domain,email,count,status\n");

    for outcome in outcomes {
        let domain = csv_field(&outcome.domain);
        let status = outcome.status.as_str();

        if outcome.emails.is_empty() {
            csv.push_str(&format!("{},{},0,{}\n", domain, NO_EMAIL_SENTINEL, status));
        } else {
            for email in &outcome.emails {
                csv.push_str(&format!("{},{},1,{}\n", domain, csv_field(email), status));
            }
        }
    }

    csv
}

pub fn csv_filename(timestamp: i64) -> String {
    format!("email_results_{}.csv", timestamp)
}

pub fn generate_json_report(response: &BatchResponse) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(response)
}

pub fn generate_text_report(response: &BatchResponse) -> String {
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    for outcome in &response.results {
        let status = match outcome.status {
            OutcomeStatus::Success => outcome.status.as_str().green(),
            OutcomeStatus::Empty => outcome.status.as_str().bright_black(),
            OutcomeStatus::Error => outcome.status.as_str().red(),
            OutcomeStatus::Timeout => outcome.status.as_str().yellow(),
        };

        report.push_str(&format!(
            "## {} [{}] {} address(es)\n",
            outcome.domain.bold(),
            status,
            outcome.count
        ));

        for email in &outcome.emails {
            report.push_str(&format!("  {}\n", email));
        }
        if let Some(ref error) = outcome.error {
            report.push_str(&format!("  {}\n", error.bright_black()));
        }
        report.push('\n');
    }

    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Domains processed: {}\n", response.summary.processed));
    report.push_str(&format!("  Addresses found: {}\n", response.summary.total_emails));
    report.push_str(&format!("  Elapsed: {:.2}s\n", response.summary.elapsed_time));
    report.push_str(&format!(
        "  Average per domain: {:.2}s\n",
        response.summary.avg_time_per_domain
    ));

    report
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}
