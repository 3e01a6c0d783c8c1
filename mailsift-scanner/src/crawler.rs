use crate::error::{Result, ScanError};
use crate::extract::AddressExtractor;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Probed on every domain, earliest first
pub const DEFAULT_CANDIDATE_PATHS: [&str; 11] = [
    "",
    "/contatti",
    "/contattaci",
    "/contact",
    "/contact-us",
    "/chi-siamo",
    "/about",
    "/about-us",
    "/staff",
    "/team",
    "/redazione",
];

pub const DEFAULT_EARLY_STOP_THRESHOLD: usize = 3;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_FETCH_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Mailsift/0.1";

/// What a single candidate path produced
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// HTTP 200 with its body
    Page(String),
    /// Any other HTTP status
    Status(u16),
    /// Timeout, DNS failure, refused connection, unreadable body...
    Failed(String),
}

/// Something that can harvest addresses for one normalized domain.
///
/// The batch scheduler only talks to this trait, so tests can swap in
/// crawlers that stall, fail or panic.
#[async_trait]
pub trait DomainCrawler: Send + Sync {
    async fn crawl(&self, domain: &str) -> Result<BTreeSet<String>>;
}

pub struct PathCrawler {
    client: Client,
    extractor: AddressExtractor,
    paths: Vec<String>,
    scheme: String,
    early_stop_threshold: usize,
    fetch_delay: Duration,
}

impl PathCrawler {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT, DEFAULT_USER_AGENT)
    }

    pub fn with_timeout(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(timeout / 2)
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            extractor: AddressExtractor::default(),
            paths: DEFAULT_CANDIDATE_PATHS.iter().map(|p| p.to_string()).collect(),
            scheme: "https".to_string(),
            early_stop_threshold: DEFAULT_EARLY_STOP_THRESHOLD,
            fetch_delay: DEFAULT_FETCH_DELAY,
        })
    }

    pub fn with_paths(mut self, paths: Vec<String>) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }

    pub fn with_early_stop_threshold(mut self, threshold: usize) -> Self {
        self.early_stop_threshold = threshold;
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub fn with_extractor(mut self, extractor: AddressExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn candidate_url(&self, domain: &str, path: &str) -> Result<Url> {
        let raw = format!("{}://{}{}", self.scheme, domain, path);
        Url::parse(&raw).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", raw, e)))
    }

    /// One GET, classified. Never errors: failures are folded into the outcome.
    pub async fn fetch(&self, url: Url) -> FetchOutcome {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return FetchOutcome::Failed(format!("timed out: {}", e)),
            Err(e) => return FetchOutcome::Failed(e.to_string()),
        };

        let status = response.status();
        if status != StatusCode::OK {
            return FetchOutcome::Status(status.as_u16());
        }

        match response.text().await {
            Ok(body) => FetchOutcome::Page(body),
            Err(e) => FetchOutcome::Failed(format!("failed to read body: {}", e)),
        }
    }

    /// Walk the candidate paths of one domain until the list runs out or the
    /// early-stop threshold is reached.
    pub async fn crawl_domain(&self, domain: &str) -> BTreeSet<String> {
        let start = Instant::now();
        let sweep = self.sweep(domain).await;

        if sweep.unreachable() {
            warn!(
                "{} unreachable: all {} path(s) failed",
                domain, sweep.fetched
            );
        }

        info!(
            "Crawled {} in {:.2?}: {} path(s) fetched, {} address(es)",
            domain,
            start.elapsed(),
            sweep.fetched,
            sweep.found.len()
        );
        sweep.found
    }

    async fn sweep(&self, domain: &str) -> PathSweep {
        let mut sweep = PathSweep::default();

        for (idx, path) in self.paths.iter().enumerate() {
            let url = match self.candidate_url(domain, path) {
                Ok(url) => url,
                Err(e) => {
                    warn!("Skipping path {:?} for {}: {}", path, domain, e);
                    continue;
                }
            };

            debug!("Fetching {}", url);
            sweep.fetched += 1;

            match self.fetch(url.clone()).await {
                FetchOutcome::Page(body) => {
                    let emails = self.extractor.extract(&body, domain);
                    debug!("{} yielded {} address(es)", url, emails.len());
                    sweep.found.extend(emails);

                    if sweep.found.len() >= self.early_stop_threshold {
                        debug!(
                            "Early stop for {} after {} path(s) with {} address(es)",
                            domain,
                            sweep.fetched,
                            sweep.found.len()
                        );
                        break;
                    }

                    let more_paths = idx + 1 < self.paths.len();
                    if more_paths && !self.fetch_delay.is_zero() {
                        tokio::time::sleep(self.fetch_delay).await;
                    }
                }
                FetchOutcome::Status(code) => {
                    debug!("{} returned {}", url, code);
                }
                // Summarized per domain in crawl_domain
                FetchOutcome::Failed(reason) => {
                    debug!("Fetch failed for {}: {}", url, reason);
                    sweep.failed += 1;
                }
            }
        }

        sweep
    }
}

#[derive(Debug, Default)]
struct PathSweep {
    found: BTreeSet<String>,
    fetched: usize,
    failed: usize,
}

impl PathSweep {
    fn unreachable(&self) -> bool {
        self.fetched > 0 && self.failed == self.fetched
    }
}

#[async_trait]
impl DomainCrawler for PathCrawler {
    async fn crawl(&self, domain: &str) -> Result<BTreeSet<String>> {
        Ok(self.crawl_domain(domain).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn html(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/html")
            .set_body_string(format!("<html><body>{}</body></html>", body))
    }

    fn crawler() -> PathCrawler {
        PathCrawler::new()
            .unwrap()
            .with_scheme("http")
            .with_fetch_delay(Duration::ZERO)
    }

    fn host(server: &MockServer) -> String {
        server.uri().trim_start_matches("http://").to_string()
    }

    #[test]
    fn test_candidate_url() {
        let crawler = PathCrawler::new().unwrap();
        let url = crawler.candidate_url("example.com", "/contatti").unwrap();
        assert_eq!(url.as_str(), "https://example.com/contatti");

        let root = crawler.candidate_url("example.com", "").unwrap();
        assert_eq!(root.as_str(), "https://example.com/");

        assert!(crawler.candidate_url("exa mple.com", "").is_err());
    }

    #[tokio::test]
    async fn test_fetch_classifies_outcomes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html("hi"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&server)
            .await;

        let crawler = crawler();
        let base = host(&server);

        let page = crawler.fetch(crawler.candidate_url(&base, "").unwrap()).await;
        assert!(matches!(page, FetchOutcome::Page(ref body) if body.contains("hi")));

        let gone = crawler.fetch(crawler.candidate_url(&base, "/gone").unwrap()).await;
        assert_eq!(gone, FetchOutcome::Status(410));

        // Unmounted paths fall through to wiremock's 404
        let missing = crawler.fetch(crawler.candidate_url(&base, "/nope").unwrap()).await;
        assert_eq!(missing, FetchOutcome::Status(404));
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(html("slow").set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let crawler = PathCrawler::with_timeout(Duration::from_millis(200), DEFAULT_USER_AGENT)
            .unwrap()
            .with_scheme("http");
        let outcome = crawler
            .fetch(crawler.candidate_url(&host(&server), "").unwrap())
            .await;

        assert!(matches!(outcome, FetchOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_absorbed() {
        // Grab a free port, then release it so nothing is listening there
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let crawler = crawler().with_paths(vec!["".to_string(), "/contact".to_string()]);
        let domain = format!("127.0.0.1:{}", port);

        let sweep = crawler.sweep(&domain).await;
        assert_eq!(sweep.fetched, 2);
        assert_eq!(sweep.failed, 2);
        assert!(sweep.unreachable());

        let found = crawler.crawl_domain(&domain).await;
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_answering_host_is_not_unreachable() {
        let server = MockServer::start().await;

        // Every path is a 404, but the host did answer
        let sweep = crawler().sweep(&host(&server)).await;
        assert_eq!(sweep.fetched, DEFAULT_CANDIDATE_PATHS.len());
        assert_eq!(sweep.failed, 0);
        assert!(!sweep.unreachable());
    }

    #[tokio::test]
    async fn test_unions_addresses_across_paths() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html(r#"<a href="mailto:owner@shop.example">Owner</a>"#))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/contact"))
            .respond_with(html(r#"<span data-email="orders@shop.example"></span>"#))
            .mount(&server)
            .await;

        let found = crawler().crawl_domain(&host(&server)).await;

        assert_eq!(
            found.into_iter().collect::<Vec<_>>(),
            vec!["orders@shop.example", "owner@shop.example"]
        );
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), DEFAULT_CANDIDATE_PATHS.len());
    }

    #[tokio::test]
    async fn test_early_stop_after_threshold() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html(
                r#"<a href="mailto:a@shop.example">a</a>
                   <a href="mailto:b@shop.example">b</a>
                   <a href="mailto:c@shop.example">c</a>"#,
            ))
            .mount(&server)
            .await;

        let found = crawler().crawl_domain(&host(&server)).await;

        assert_eq!(found.len(), 3);
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1, "no further paths should be fetched");
    }

    #[tokio::test]
    async fn test_early_stop_counts_across_paths() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html(r#"<a href="mailto:a@shop.example">a</a>"#))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/contattaci"))
            .respond_with(html(
                r#"<a href="mailto:b@shop.example">b</a><a href="mailto:c@shop.example">c</a>"#,
            ))
            .mount(&server)
            .await;

        let found = crawler().crawl_domain(&host(&server)).await;

        assert_eq!(found.len(), 3);
        // "", "/contatti" (404), "/contattaci"
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
    }

    #[tokio::test]
    async fn test_all_paths_missing_yields_empty() {
        let server = MockServer::start().await;

        let found = crawler().crawl_domain(&host(&server)).await;

        assert!(found.is_empty());
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), DEFAULT_CANDIDATE_PATHS.len());
    }

    #[tokio::test]
    async fn test_delay_between_successful_fetches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(html("no contacts here"))
            .mount(&server)
            .await;

        let crawler = crawler()
            .with_paths(vec!["".to_string(), "/contact".to_string(), "/about".to_string()])
            .with_fetch_delay(Duration::from_millis(150));

        let start = Instant::now();
        crawler.crawl_domain(&host(&server)).await;

        // Two gaps between three successful fetches, none after the last
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_no_delay_after_early_stop() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html(
                r#"<i data-email="a@x.org"></i><i data-email="b@x.org"></i><i data-email="c@x.org"></i>"#,
            ))
            .mount(&server)
            .await;

        let crawler = crawler().with_fetch_delay(Duration::from_secs(5));

        let start = Instant::now();
        let found = crawler.crawl_domain(&host(&server)).await;

        assert_eq!(found.len(), 3);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_domain_crawler_trait_never_errors() {
        let server = MockServer::start().await;
        let crawler = crawler();
        let result = DomainCrawler::crawl(&crawler, &host(&server)).await;
        assert!(result.unwrap().is_empty());
    }
}
