use crate::config::FetchConfig;
use crate::error::FetchError;
use async_trait::async_trait;

const USER_AGENT: &str = concat!("urllog/", env!("CARGO_PKG_VERSION"));

/// Resolve a URL to its page title.
///
/// Exactly two resolution paths: `Ok(title)` (empty when the page has no
/// usable title) or `Err(FetchError)`. No retries at this layer.
#[async_trait]
pub trait TitleFetcher: Send + Sync {
    async fn fetch_title(&self, url: &str) -> Result<String, FetchError>;
}

/// HTTP fetcher: one GET per URL, bounded body, `<title>` extraction.
pub struct HttpTitleFetcher {
    client: reqwest::Client,
    max_content_bytes: usize,
}

impl HttpTitleFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        Ok(Self {
            client,
            max_content_bytes: config.max_content_bytes,
        })
    }
}

#[async_trait]
impl TitleFetcher for HttpTitleFetcher {
    async fn fetch_title(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_none_or(|ct| ct.contains("text/html"));

        if !is_html {
            return Ok(String::new());
        }

        // Read at most max_content_bytes; the title lives in <head>, so a
        // truncated body is not an error.
        let mut body: Vec<u8> = Vec::new();
        let mut response = response;
        while let Some(chunk) = response.chunk().await.map_err(map_reqwest_err)? {
            let remaining = self.max_content_bytes.saturating_sub(body.len());
            if remaining == 0 {
                break;
            }
            let take = remaining.min(chunk.len());
            body.extend_from_slice(&chunk[..take]);
        }

        let html = String::from_utf8_lossy(&body);
        Ok(title_from_html(&html))
    }
}

fn map_reqwest_err(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Request(e.to_string())
    }
}

/// Pull the `<title>` text out of an HTML document, trimmed and with
/// embedded line breaks collapsed. Empty string when absent.
fn title_from_html(html: &str) -> String {
    use scraper::{Html, Selector};

    let document = Html::parse_document(html);

    Selector::parse("title")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .map(|el| el.text().collect::<String>())
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_extracted() {
        let html = "<html><head><title>Example Domain</title></head><body></body></html>";
        assert_eq!(title_from_html(html), "Example Domain");
    }

    #[test]
    fn title_whitespace_normalized() {
        let html = "<html><head><title>\n  Example\n  Domain  \n</title></head></html>";
        assert_eq!(title_from_html(html), "Example Domain");
    }

    #[test]
    fn missing_title_yields_empty() {
        let html = "<html><head></head><body><p>no title here</p></body></html>";
        assert_eq!(title_from_html(html), "");
    }

    #[test]
    fn empty_title_yields_empty() {
        let html = "<html><head><title>   </title></head></html>";
        assert_eq!(title_from_html(html), "");
    }

    #[test]
    fn truncated_document_still_parses() {
        let html = "<html><head><title>Partial Pa";
        assert_eq!(title_from_html(html), "Partial Pa");
    }
}
