use crate::config::{FetchConfig, FetchMode, LoadedConfig, sanitize_for_path};
use crate::error::ScrapeError;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

pub trait PageSource {
    fn fetch_document(&self, url: &str) -> Result<String, ScrapeError>;
}

pub fn page_source_for(loaded: &LoadedConfig) -> Result<Box<dyn PageSource>> {
    match loaded.config.fetch.mode {
        FetchMode::Http => Ok(Box::new(HttpSource::from_config(&loaded.config.fetch)?)),
        FetchMode::File => Ok(Box::new(FileSource::new(loaded.fixture_dir()?))),
    }
}

pub struct HttpSource {
    client: Client,
    retry_attempts: u8,
    retry_backoff_ms: u64,
}

impl HttpSource {
    pub fn from_config(fetch: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (k, v) in &fetch.headers {
            let name = HeaderName::from_bytes(k.as_bytes())
                .with_context(|| format!("invalid header name {k}"))?;
            let value = HeaderValue::from_str(v)
                .with_context(|| format!("invalid header value for {k}"))?;
            headers.insert(name, value);
        }

        if let Some(user_agent) = &fetch.user_agent {
            headers.insert(USER_AGENT, HeaderValue::from_str(user_agent)?);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(fetch.timeout_secs))
            .default_headers(headers)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            client,
            retry_attempts: fetch.retry_attempts,
            retry_backoff_ms: fetch.retry_backoff_ms,
        })
    }
}

impl PageSource for HttpSource {
    fn fetch_document(&self, url: &str) -> Result<String, ScrapeError> {
        let attempts = self.retry_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.client.get(url).send() {
                Ok(resp) if resp.status().is_success() => match resp.text() {
                    Ok(body) => {
                        debug!(%url, bytes = body.len(), attempt, "fetched page");
                        return Ok(body);
                    }
                    Err(err) => {
                        last_error = format!("failed to read body: {err}");
                        warn!(%url, attempt, error = %err, "body read failed; retrying");
                    }
                },
                Ok(resp) => {
                    let status = resp.status();
                    last_error = format!("status {status}");
                    warn!(%url, %status, attempt, "request failed; retrying");
                }
                Err(err) => {
                    last_error = if err.is_timeout() {
                        format!("timed out: {err}")
                    } else {
                        err.to_string()
                    };
                    warn!(%url, attempt, error = %err, "request errored; retrying");
                }
            }

            if attempt < attempts {
                std::thread::sleep(Duration::from_millis(self.retry_backoff_ms));
            }
        }

        Err(ScrapeError::Fetch {
            url: url.to_string(),
            attempts,
            message: last_error,
        })
    }
}

pub struct FileSource {
    dir: PathBuf,
}

impl FileSource {
    pub fn new(dir: PathBuf) -> Self {
        info!(dir = %dir.display(), "serving pages from saved files");
        Self { dir }
    }

    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(saved_page_name(url))
    }
}

impl PageSource for FileSource {
    fn fetch_document(&self, url: &str) -> Result<String, ScrapeError> {
        let path = self.path_for(url);
        std::fs::read_to_string(&path).map_err(|err| ScrapeError::Fetch {
            url: url.to_string(),
            attempts: 1,
            message: format!("failed to read {}: {err}", path.display()),
        })
    }
}

pub fn saved_page_name(url: &str) -> String {
    format!("{}.html", sanitize_for_path(url))
}
