//! Page fetching and table scraping.
//!
//! Scraping is split in two phases, the same way for every day:
//!
//! 1. **Fetching**: download the archive page of one day through a
//!    [`PageSource`]
//! 2. **Parsing**: turn the page's wait-time tables into a [`Frame`](crate::models::Frame),
//!    see [`urtrip`]
//!
//! [`HttpSource`] is the production source. Tests use an in-memory source
//! serving fixture HTML, so the parser and the pipeline never need the
//! network.

pub mod urtrip;

use crate::config::Config;
use chrono::NaiveDate;
use reqwest::Client;
use std::time::Instant;
use tracing::{debug, instrument, warn};
use url::Url;

/// Errors raised while downloading a page.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid page URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("no page available for {0}")]
    Missing(NaiveDate),
}

/// Something that can produce the archive page of a day.
pub trait PageSource {
    /// Return the raw HTML of the page for `date`.
    async fn fetch_day(&self, date: NaiveDate) -> Result<String, FetchError>;
}

/// Build the archive URL of a day: `<base>/<park-path>?rm=YYYYMMDD#page_top`.
pub fn day_url(config: &Config, date: NaiveDate) -> Result<Url, FetchError> {
    let mut url = Url::parse(&config.base_url)?.join(config.park.path())?;
    url.set_query(Some(&format!("rm={}", date.format("%Y%m%d"))));
    url.set_fragment(Some("page_top"));
    Ok(url)
}

/// Fetches pages from the live site with a shared HTTP client.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    config: Config,
}

impl HttpSource {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            config: config.clone(),
        }
    }

    async fn get_text(&self, url: &Url) -> Result<String, reqwest::Error> {
        self.client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

impl PageSource for HttpSource {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_day(&self, date: NaiveDate) -> Result<String, FetchError> {
        let url = day_url(&self.config, date)?;
        let t0 = Instant::now();
        let result = self.get_text(&url).await;
        let dt = t0.elapsed();

        match result {
            Ok(body) if body.trim().is_empty() => {
                warn!(%url, "Page body is empty");
                Err(FetchError::Missing(date))
            }
            Ok(body) => {
                debug!(%url, bytes = body.len(), elapsed_ms = dt.as_millis() as u64, "Fetched page");
                Ok(body)
            }
            Err(e) => {
                warn!(%url, elapsed_ms = dt.as_millis() as u64, error = %e, "Page request failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use std::collections::HashMap;

    /// Serves fixture HTML per date; unknown dates fail like a dead link.
    #[derive(Debug, Default)]
    pub struct FixtureSource {
        pub pages: HashMap<NaiveDate, String>,
    }

    impl FixtureSource {
        pub fn with_page(mut self, date: NaiveDate, html: impl Into<String>) -> Self {
            self.pages.insert(date, html.into());
            self
        }
    }

    impl PageSource for FixtureSource {
        async fn fetch_day(&self, date: NaiveDate) -> Result<String, FetchError> {
            self.pages.get(&date).cloned().ok_or(FetchError::Missing(date))
        }
    }
}
