use mailsift::handlers::*;
use mailsift_core::report::{BatchResponse, BatchSummary, ReportFormat};
use mailsift_scanner::DomainOutcome;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn sample_response() -> BatchResponse {
    let results = vec![
        DomainOutcome::from_emails(
            "example.com".to_string(),
            BTreeSet::from(["info@example.com".to_string()]),
        ),
        DomainOutcome::from_emails("quiet.org".to_string(), BTreeSet::new()),
    ];
    let summary = BatchSummary::new(&results, 2.0);
    BatchResponse {
        success: true,
        results,
        summary,
    }
}

// ============================================================================
// Domain loading
// ============================================================================

#[test]
fn test_load_domains_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(temp_file, "example.com")?;
    writeln!(temp_file)?; // Empty line
    writeln!(temp_file, "# staging hosts")?;
    writeln!(temp_file, "  https://www.acme.io/  ")?;

    let path = PathBuf::from(temp_file.path());
    let domains = load_domains_from_file(&path)?;

    // Normalization happens later, in the scheduler
    assert_eq!(domains, vec!["example.com", "https://www.acme.io/"]);

    Ok(())
}

#[test]
fn test_load_domains_from_file_empty() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file).unwrap();
    writeln!(temp_file, "   ").unwrap();
    writeln!(temp_file, "# nothing here").unwrap();

    let path = PathBuf::from(temp_file.path());
    let result = load_domains_from_file(&path);

    assert!(result.is_err());
    assert!(result.unwrap_err().contains("No domains found"));
}

#[test]
fn test_load_domains_from_file_missing() {
    let path = PathBuf::from("/nonexistent/mailsift/hosts.txt");
    let result = load_domains_from_file(&path);

    assert!(result.is_err());
    assert!(result.unwrap_err().contains("Failed to read hosts file"));
}

#[test]
fn test_load_domains_from_source_arguments_only() {
    let result =
        load_domains_from_source(vec!["a.com".to_string(), "b.com".to_string()], None).unwrap();
    assert_eq!(result, vec!["a.com", "b.com"]);
}

#[test]
fn test_load_domains_from_source_combines_arguments_and_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "c.com").unwrap();
    let path = PathBuf::from(temp_file.path());

    let result = load_domains_from_source(vec!["a.com".to_string()], Some(&path)).unwrap();
    assert_eq!(result, vec!["a.com", "c.com"]);
}

#[test]
fn test_load_domains_from_source_no_input() {
    let result = load_domains_from_source(Vec::new(), None);
    assert!(result.is_err());
    assert!(
        result
            .unwrap_err()
            .contains("Either --domain or --hosts-file must be provided")
    );
}

// ============================================================================
// Report rendering
// ============================================================================

#[test]
fn test_render_report_csv() {
    let report = render_report(&sample_response(), ReportFormat::Csv).unwrap();
    let lines: Vec<&str> = report.lines().collect();

    assert_eq!(lines[0], "domain,email,count,status");
    assert_eq!(lines[1], "example.com,info@example.com,1,success");
    assert_eq!(lines[2], "quiet.org,no email found,0,empty");
}

#[test]
fn test_render_report_json() {
    let report = render_report(&sample_response(), ReportFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&report).unwrap();

    assert_eq!(value["success"], true);
    assert_eq!(value["total_emails"], 1);
    assert_eq!(value["processed"], 2);
    assert_eq!(value["results"][0]["emails"][0], "info@example.com");
}

#[test]
fn test_render_report_text() {
    colored::control::set_override(false);
    let report = render_report(&sample_response(), ReportFormat::Text).unwrap();

    assert!(report.contains("## example.com [success] 1 address(es)"));
    assert!(report.contains("  info@example.com"));
    assert!(report.contains("## quiet.org [empty] 0 address(es)"));
    assert!(report.contains("Domains processed: 2"));
}

// ============================================================================
// Logging
// ============================================================================

#[test]
fn test_init_tracing_twice_keeps_first_subscriber() {
    init_tracing("warn");
    init_tracing("debug");
    tracing::warn!("still routed to the first subscriber");
}
