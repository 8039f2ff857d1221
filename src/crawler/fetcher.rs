//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for page content:
//! - Building HTTP clients with proper user agent strings
//! - Rendering HTML responses into text, title and links
//! - Turning any fetch or render failure into a silent per-page skip

use crate::config::UserAgentConfig;
use crate::crawler::parser::{render_html, RenderConfig, RenderedPage};
use crate::state::FetchedPage;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Errors raised while fetching or rendering a single page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Non-HTML content type '{content_type}' at {url}")]
    NotHtml { url: String, content_type: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Fetches a URL and renders it
///
/// Implementations raise on any failure; `fetch_page` decides how failures
/// are handled.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str, config: &RenderConfig) -> Result<RenderedPage, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout_secs` - Whole-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout_secs: u64,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Plain HTTP renderer on top of reqwest and scraper
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn render(&self, url: &str, config: &RenderConfig) -> Result<RenderedPage, FetchError> {
        let requested = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;

        let response = self.client.get(requested.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        if !content_type.contains("html") {
            return Err(FetchError::NotHtml {
                url: url.to_string(),
                content_type,
            });
        }

        // Links resolve against the post-redirect location but stay
        // filtered to the requested host
        let final_url = response.url().clone();
        let bytes = response.bytes().await?;
        let html = String::from_utf8_lossy(&bytes);

        let mut page = render_html(&html, &final_url, config);
        if final_url.host_str() != requested.host_str() && config.internal_links_only {
            let host = crate::url::host_of(url);
            page.links.retain(|link| crate::url::host_of(link) == host);
        }
        Ok(page)
    }
}

/// Fetches one URL at the given depth
///
/// Returns `None` when the page could not be fetched or rendered to any
/// text. One dead page never aborts a domain crawl.
pub async fn fetch_page(renderer: &dyn PageRenderer, url: &str, depth: u32) -> Option<FetchedPage> {
    let config = RenderConfig::for_depth(depth);
    match renderer.render(url, &config).await {
        Ok(rendered) => {
            let page = FetchedPage::from_render(url, rendered.title, &rendered.text, depth, rendered.links);
            if page.is_none() {
                debug!(url = %url, "Rendered page has no text, skipping");
            }
            page
        }
        Err(e) => {
            debug!(url = %url, error = %e, "Fetch failed, skipping page");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "LeadBot".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/bot".to_string(),
            contact_email: "bot@example.com".to_string(),
        }
    }

    fn renderer() -> HttpRenderer {
        HttpRenderer::new(build_http_client(&create_test_config(), 5).unwrap())
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&create_test_config(), 30).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_page_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/about"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<html><head><title>About</title></head><body><p>Glove makers.</p><p><a href="/team">Team</a></p><p><a href="https://elsewhere.org/">Partners</a></p></body></html>"#,
                "text/html",
            ))
            .mount(&server)
            .await;

        let url = format!("{}/about", server.uri());
        let page = fetch_page(&renderer(), &url, 1).await.unwrap();

        assert_eq!(page.title, "About");
        assert_eq!(page.content, "Glove makers.\n\nTeam\n\nPartners");
        assert_eq!(page.depth, 1);
        assert_eq!(page.links, vec![format!("{}/team", server.uri())]);
        assert_eq!(page.content_hash, crate::state::content_hash(&page.content));
    }

    #[tokio::test]
    async fn test_non_html_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data.json"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
            .mount(&server)
            .await;

        let url = format!("{}/data.json", server.uri());
        assert!(fetch_page(&renderer(), &url, 0).await.is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let url = format!("{}/broken", server.uri());
        let err = renderer()
            .render(&url, &RenderConfig::for_depth(0))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 500, .. }));
        assert!(fetch_page(&renderer(), &url, 0).await.is_none());
    }

    #[tokio::test]
    async fn test_blank_page_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blank"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><body>  <script>x()</script> </body></html>", "text/html"),
            )
            .mount(&server)
            .await;

        let url = format!("{}/blank", server.uri());
        assert!(fetch_page(&renderer(), &url, 0).await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let server = MockServer::start().await;
        let mut body = b"<html><body><p>caf".to_vec();
        body.push(0xE9);
        body.extend_from_slice(b"</p></body></html>");
        Mock::given(method("GET"))
            .and(path("/latin1"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
            .mount(&server)
            .await;

        let url = format!("{}/latin1", server.uri());
        let page = fetch_page(&renderer(), &url, 0).await.unwrap();
        assert!(page.content.starts_with("caf"));
        assert!(page.content.contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_skipped() {
        assert!(fetch_page(&renderer(), "http://127.0.0.1:1/", 0).await.is_none());
    }
}
