use anyhow::{Context, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use mailsift_core::batch::BatchScheduler;
use mailsift_core::config::Settings;
use mailsift_core::report::{
    BatchResponse, ReportFormat, generate_csv_report, generate_json_report,
    generate_text_report, save_report,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::server;

/// Install the global subscriber. `RUST_LOG` wins over `default_directive`.
pub fn init_tracing(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    // Err only when a subscriber is already installed (tests, repeated calls); keep that one
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

// Helper functions for the find handler

/// Collect domains from `-d` arguments and/or a hosts file, in that order
pub fn load_domains_from_source(
    domains: Vec<String>,
    hosts_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    let mut all = domains;

    if let Some(hosts_file_path) = hosts_file {
        all.extend(load_domains_from_file(hosts_file_path)?);
    }

    if all.is_empty() {
        return Err("Either --domain or --hosts-file must be provided".to_string());
    }

    Ok(all)
}

/// One domain per line; blank lines and `#` comments are skipped
pub fn load_domains_from_file(path: &PathBuf) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read hosts file {}: {}", path.display(), e))?;

    let domains: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    if domains.is_empty() {
        return Err(format!("No domains found in {}", path.display()));
    }

    Ok(domains)
}

pub fn render_report(response: &BatchResponse, format: ReportFormat) -> anyhow::Result<String> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(response)),
        ReportFormat::Json => generate_json_report(response).context("failed to serialize report"),
        ReportFormat::Csv => Ok(generate_csv_report(&response.results)),
    }
}

/// Settings from `--config`/environment, with command-line flags on top
pub fn load_settings(args: &ArgMatches) -> anyhow::Result<Settings> {
    let config_path = arg_value::<String>(args, "config");
    let mut settings = Settings::load(config_path.as_deref())?;

    if let Some(workers) = arg_value::<usize>(args, "workers") {
        settings.harvest.workers = workers;
    }
    if let Some(deadline) = arg_value::<u64>(args, "deadline") {
        settings.harvest.deadline_secs = deadline;
    }
    if let Some(host) = arg_value::<String>(args, "host") {
        settings.server.host = host;
    }
    if let Some(port) = arg_value::<u16>(args, "port") {
        settings.server.port = port;
    }

    settings.harvest.validate()?;
    Ok(settings)
}

// Not every subcommand defines every flag
fn arg_value<T: Clone + Send + Sync + 'static>(args: &ArgMatches, id: &str) -> Option<T> {
    args.try_get_one::<T>(id).ok().flatten().cloned()
}

pub async fn handle_serve(args: &ArgMatches) -> anyhow::Result<()> {
    let settings = load_settings(args)?;

    println!(
        "{} Serving on {}",
        "→".blue().bold(),
        settings.server.bind_address().bright_white()
    );
    println!(
        "{} Max domains per batch: {}, deadline: {}s, workers: {}\n",
        "ℹ".blue(),
        settings.harvest.max_domains.to_string().cyan(),
        settings.harvest.deadline_secs.to_string().cyan(),
        settings.harvest.workers.to_string().cyan()
    );

    server::serve(settings).await
}

pub async fn handle_find(args: &ArgMatches) -> anyhow::Result<()> {
    let settings = load_settings(args)?;

    let domains: Vec<String> = args
        .get_many::<String>("domain")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let hosts_file = args.get_one::<PathBuf>("hosts-file");
    let domains = load_domains_from_source(domains, hosts_file).map_err(|e| anyhow!(e))?;

    let format_name = args
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");
    let format = ReportFormat::from_str(format_name)
        .ok_or_else(|| anyhow!("unknown report format '{}'", format_name))?;

    eprintln!("\n📬 Harvesting {} domain(s)", domains.len());
    eprintln!("Workers: {}", settings.harvest.workers);
    eprintln!("Deadline: {}s\n", settings.harvest.deadline_secs);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Starting batch...");

    let spinner_clone = spinner.clone();
    let progress_callback = Arc::new(move |idx: usize, total: usize, domain: String| {
        spinner_clone.set_message(format!("[{}/{}] {}", idx + 1, total, domain));
    });

    let scheduler =
        BatchScheduler::from_config(&settings.harvest)?.with_progress_callback(progress_callback);
    let result = scheduler.run(&domains).await;
    spinner.finish_and_clear();
    let result = result?;

    let response = BatchResponse::from(result);
    eprintln!(
        "{} Batch complete: {} address(es) across {} domain(s) in {:.2}s\n",
        "✓".green().bold(),
        response.summary.total_emails,
        response.summary.processed,
        response.summary.elapsed_time
    );

    let report = render_report(&response, format)?;

    if let Some(output) = args.get_one::<PathBuf>("output") {
        let expanded = shellexpand::tilde(&output.to_string_lossy()).into_owned();
        save_report(&report, &PathBuf::from(&expanded))
            .with_context(|| format!("failed to write {}", expanded))?;
        eprintln!("{} Report saved to {}", "✓".green().bold(), expanded.bright_white());
    } else {
        print!("{}", report);
    }

    Ok(())
}
