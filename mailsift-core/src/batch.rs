use crate::config::HarvestConfig;
use crate::error::{HarvestError, Result};
use futures::stream::{self, StreamExt};
use mailsift_scanner::{DomainCrawler, DomainOutcome, ScanError, normalize};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Source of monotonic time for deadline checks
pub trait Clock: Send + Sync {
    /// Time elapsed since some fixed origin
    fn now(&self) -> Duration;
}

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to
#[derive(Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Called as each domain is admitted: (index, total, raw domain)
pub type BatchProgressCallback = Arc<dyn Fn(usize, usize, String) + Send + Sync>;

/// Outcomes of one batch, in request order
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub outcomes: Vec<DomainOutcome>,
    pub elapsed: Duration,
}

impl BatchResult {
    pub fn total_emails(&self) -> usize {
        self.outcomes.iter().map(|o| o.count).sum()
    }

    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

enum Admission {
    Expired(String),
    Admitted(String, JoinHandle<std::result::Result<BTreeSet<String>, ScanError>>),
}

pub struct BatchScheduler {
    crawler: Arc<dyn DomainCrawler>,
    clock: Arc<dyn Clock>,
    max_domains: usize,
    deadline: Duration,
    workers: usize,
    progress_callback: Option<BatchProgressCallback>,
}

impl BatchScheduler {
    pub fn new(crawler: Arc<dyn DomainCrawler>) -> Self {
        let defaults = HarvestConfig::default();
        Self {
            crawler,
            clock: Arc::new(SystemClock::new()),
            max_domains: defaults.max_domains,
            deadline: defaults.deadline(),
            workers: defaults.workers,
            progress_callback: None,
        }
    }

    /// Scheduler over a [`mailsift_scanner::PathCrawler`] built from `config`.
    pub fn from_config(config: &HarvestConfig) -> Result<Self> {
        config.validate()?;
        let crawler = config.build_crawler()?;

        Ok(Self::new(Arc::new(crawler))
            .with_max_domains(config.max_domains)
            .with_deadline(config.deadline())
            .with_workers(config.workers))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_max_domains(mut self, max_domains: usize) -> Self {
        self.max_domains = max_domains;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_progress_callback(mut self, callback: BatchProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn max_domains(&self) -> usize {
        self.max_domains
    }

    /// Request-level checks, done before anything touches the network
    pub fn validate(&self, domains: &[String]) -> Result<()> {
        if domains.is_empty() {
            return Err(HarvestError::NoDomains);
        }
        if domains.len() > self.max_domains {
            return Err(HarvestError::TooManyDomains {
                received: domains.len(),
                max: self.max_domains,
            });
        }
        Ok(())
    }

    /// Crawl every domain that fits in the deadline and account for the rest.
    ///
    /// The deadline is checked each time a domain is about to be admitted; once
    /// it has passed, that domain and every later one is reported as
    /// `timeout`. Crawls already in flight run to completion, bounded by their
    /// own per-request timeouts. The returned outcomes always line up one to
    /// one with `domains`.
    pub async fn run(&self, domains: &[String]) -> Result<BatchResult> {
        self.validate(domains)?;

        let total = domains.len();
        let start = self.clock.now();
        let deadline_secs = self.deadline.as_secs_f64();
        let mut deadline_hit = false;

        info!(
            "Starting batch of {} domain(s) with {} worker(s), deadline {:.0}s",
            total, self.workers, deadline_secs
        );

        let outcomes: Vec<DomainOutcome> = stream::iter(0..total)
            .map(|idx| {
                let raw = &domains[idx];
                if !deadline_hit && self.clock.now().saturating_sub(start) >= self.deadline {
                    deadline_hit = true;
                    warn!(
                        "Batch deadline reached; {} domain(s) left unprocessed",
                        total - idx
                    );
                }

                let admission = if deadline_hit {
                    Admission::Expired(normalize(raw))
                } else {
                    if let Some(ref callback) = self.progress_callback {
                        callback(idx, total, raw.clone());
                    }
                    self.spawn_crawl(raw)
                };

                async move {
                    match admission {
                        Admission::Expired(domain) => DomainOutcome::timed_out(
                            domain,
                            format!(
                                "Batch deadline of {:.0}s reached before this domain was processed",
                                deadline_secs
                            ),
                        ),
                        Admission::Admitted(domain, handle) => match handle.await {
                            Ok(Ok(emails)) => DomainOutcome::from_emails(domain, emails),
                            Ok(Err(e)) => {
                                warn!("Crawl failed for {}: {}", domain, e);
                                DomainOutcome::with_error(domain, e.to_string())
                            }
                            Err(e) => {
                                let e = ScanError::from(e);
                                warn!("Crawl task for {} died: {}", domain, e);
                                DomainOutcome::with_error(domain, e.to_string())
                            }
                        },
                    }
                }
            })
            .buffered(self.workers)
            .collect()
            .await;

        let elapsed = self.clock.now().saturating_sub(start);
        let result = BatchResult { outcomes, elapsed };

        info!(
            "Batch complete in {:.2?}: {} domain(s), {} address(es)",
            result.elapsed,
            result.processed(),
            result.total_emails()
        );

        Ok(result)
    }

    fn spawn_crawl(&self, raw: &str) -> Admission {
        let domain = normalize(raw);
        let crawler = self.crawler.clone();
        let task_domain = domain.clone();

        let handle = tokio::spawn(async move { crawler.crawl(&task_domain).await });
        Admission::Admitted(domain, handle)
    }
}
