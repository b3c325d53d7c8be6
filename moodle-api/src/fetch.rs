use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::COOKIE;
use tracing::debug;

use crate::error::{Error, Result};

/// A fetched LMS page: the response status and the raw server-rendered HTML.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

/// Issues authenticated GET requests against LMS pages. The session cookie is
/// forwarded verbatim as the `Cookie` header; no state is kept between calls.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str, cookie: &str) -> Result<FetchedPage>;
}

#[async_trait]
impl<F: Fetch + ?Sized> Fetch for std::sync::Arc<F> {
    async fn fetch(&self, url: &str, cookie: &str) -> Result<FetchedPage> {
        (**self).fetch(url, cookie).await
    }
}

/// HTTP fetcher for the Moodle portal.
///
/// TLS certificate validation is deliberately disabled so that self-signed
/// campus deployments remain reachable. This weakens transport trust for
/// every request the fetcher makes; keep it in mind before pointing the
/// pipeline at anything beyond the intended portal.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str, cookie: &str) -> Result<FetchedPage> {
        debug!(%url, "fetching page");

        let response = self
            .client
            .get(url)
            .header(COOKIE, cookie)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| Error::Fetch {
                url: url.to_owned(),
                source,
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|source| Error::Fetch {
            url: url.to_owned(),
            source,
        })?;

        Ok(FetchedPage { status, body })
    }
}
