// src/adstxt/fetch.rs
// =============================================================================
// Downloads ads.txt files.
//
// Key functionality:
// - Fetcher trait: "give me the ads.txt text for this domain"
// - HttpFetcher: the real implementation over reqwest
// - fetch_domain: wraps any Fetcher, sorts failures into FetchError and
//   throws away HTML pages that servers return instead of a 404
//
// Why a trait?
// - The scanner workers only need "domain in, text out"
// - Tests swap in an in-memory fetcher so whole runs need no network
// =============================================================================

use super::FetchResult;
use crate::error::FetchError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Well-known location of the file on every domain
pub const ADS_TXT_PATH: &str = "/ads.txt";

// How much of the body is inspected for markup
const SNIFF_BYTES: usize = 2048;

static HTML_MARKERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<.*?html|<.*?\?.*?xml|<.*?script|<.*?meta|<.*?head")
        .expect("html marker pattern is valid")
});

// Anything that can produce the ads.txt text for a domain
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, domain: &str) -> Result<String, FetchError>;
}

// Fetches http://{domain}/ads.txt with reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    // Builds a client with a per-request timeout that follows redirects
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(concat!("adstxt-crawler/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// URL of the ads.txt file for a domain
    pub fn url_for(domain: &str) -> Result<Url, FetchError> {
        let url = Url::parse(&format!("http://{}{}", domain, ADS_TXT_PATH))
            .map_err(|_| FetchError::InvalidDomain)?;

        if url.host_str().map_or(true, str::is_empty) {
            return Err(FetchError::InvalidDomain);
        }

        Ok(url)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, domain: &str) -> Result<String, FetchError> {
        let url = Self::url_for(domain)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&e))?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus);
        }

        response.text().await.map_err(|e| FetchError::from_reqwest(&e))
    }
}

// True when the start of a body looks like an HTML/XML page
pub fn looks_like_html(body: &str) -> bool {
    let mut end = body.len().min(SNIFF_BYTES);
    while !body.is_char_boundary(end) {
        end -= 1;
    }

    HTML_MARKERS.is_match(&body[..end])
}

// Fetches one domain and applies the content check.
//
// Never fails: transport problems land in `error`, HTML pages leave both
// `body` and `error` empty.
pub async fn fetch_domain(fetcher: &dyn Fetcher, domain: &str) -> FetchResult {
    match fetcher.fetch(domain).await {
        Ok(body) if looks_like_html(&body) => {
            tracing::debug!(domain, "response looks like HTML, discarding body");
            FetchResult {
                domain: domain.to_string(),
                body: None,
                error: None,
            }
        }
        Ok(body) => FetchResult {
            domain: domain.to_string(),
            body: Some(body),
            error: None,
        },
        Err(error) => {
            tracing::debug!(domain, %error, "fetch failed");
            FetchResult {
                domain: domain.to_string(),
                body: None,
                error: Some(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct StaticFetcher(Result<String, FetchError>);

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, _domain: &str) -> Result<String, FetchError> {
            self.0.clone()
        }
    }

    fn server_domain(server: &MockServer) -> String {
        format!("127.0.0.1:{}", server.address().port())
    }

    #[test]
    fn test_detects_html() {
        assert!(looks_like_html("<!doctype html>\n<html><body>404</body></html>"));
        assert!(looks_like_html("<?xml version=\"1.0\"?><error/>"));
        assert!(looks_like_html("  <HEAD><META charset=utf-8>"));
        assert!(looks_like_html("<script>window.location='/'</script>"));
    }

    #[test]
    fn test_plain_ads_txt_is_not_html() {
        assert!(!looks_like_html("google.com, pub-1, DIRECT, f08c47fec0942fa0\n"));
        assert!(!looks_like_html(""));
    }

    #[test]
    fn test_only_the_start_is_inspected() {
        let mut body = "a.com, 1, DIRECT\n".repeat(200);
        body.push_str("<html>");
        assert!(!looks_like_html(&body));
    }

    #[test]
    fn test_sniff_handles_multibyte_boundary() {
        let body = format!("a{}", "é".repeat(SNIFF_BYTES));
        assert!(!looks_like_html(&body));
    }

    #[test]
    fn test_url_for_domain() {
        let url = HttpFetcher::url_for("example.com").unwrap();
        assert_eq!(url.as_str(), "http://example.com/ads.txt");
        assert_eq!(HttpFetcher::url_for("bad domain"), Err(FetchError::InvalidDomain));
        assert_eq!(HttpFetcher::url_for(""), Err(FetchError::InvalidDomain));
    }

    #[tokio::test]
    async fn test_fetch_domain_nulls_html_without_error() {
        let fetcher = StaticFetcher(Ok("<!doctype html><title>x</title>".to_string()));
        let result = fetch_domain(&fetcher, "example.com").await;
        assert_eq!(result.body, None);
        assert_eq!(result.error, None);
    }

    #[tokio::test]
    async fn test_fetch_domain_records_error() {
        let fetcher = StaticFetcher(Err(FetchError::Timeout));
        let result = fetch_domain(&fetcher, "example.com").await;
        assert_eq!(result.body, None);
        assert_eq!(result.error, Some(FetchError::Timeout));
    }

    #[tokio::test]
    async fn test_http_fetcher_reads_ads_txt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ads.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("a.com, 1, DIRECT\n"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let body = fetcher.fetch(&server_domain(&server)).await.unwrap();
        assert_eq!(body, "a.com, 1, DIRECT\n");
    }

    #[tokio::test]
    async fn test_http_fetcher_maps_status_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ads.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let result = fetcher.fetch(&server_domain(&server)).await;
        assert_eq!(result, Err(FetchError::HttpStatus));
    }

    #[tokio::test]
    async fn test_http_fetcher_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ads.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("a.com, 1, DIRECT")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Duration::from_millis(200)).unwrap();
        let result = fetcher.fetch(&server_domain(&server)).await;
        assert_eq!(result, Err(FetchError::Timeout));
    }
}
