use crate::error::ScrapeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSummary {
    pub id: String,
    pub title: String,
    pub snippet: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub url: String,
    pub summaries: Vec<PanelSummary>,
    pub detail_urls: Vec<String>,
    pub malformed: Vec<String>,
    pub next_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelDetail {
    pub url: String,
    pub raw_title: String,
    pub raw_organizer_block: String,
    pub raw_posted_date: String,
    pub raw_desc_block: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelRecord {
    pub id: String,
    pub title: String,
    pub organizers: Vec<String>,
    pub posted: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub themes: Vec<String>,
    pub has_unseparated_suffix: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeLink {
    pub url: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeMember {
    pub id: String,
    pub title: String,
    pub theme: String,
}

#[derive(Debug, Clone, Default)]
pub struct ThemePage {
    pub members: Vec<ThemeMember>,
    pub malformed: Vec<String>,
}

// labels keep menu discovery order
pub type ThemeMembership = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedPage {
    pub url: String,
    pub kind: String,
    pub message: String,
}

impl SkippedPage {
    pub fn from_error(fallback_url: &str, err: &ScrapeError) -> Self {
        Self {
            url: err.url().unwrap_or(fallback_url).to_string(),
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub site_key: String,
    pub listing_pages: usize,
    pub listing_entries: usize,
    pub detail_urls: usize,
    pub documents_fetched: usize,
    pub records: usize,
    pub theme_pages: usize,
    pub theme_members: usize,
    pub skipped: Vec<SkippedPage>,
}

impl RunReport {
    pub fn skip(&mut self, fallback_url: &str, err: &ScrapeError) {
        self.skipped.push(SkippedPage::from_error(fallback_url, err));
    }

    pub fn skipped_of_kind(&self, kind: &str) -> usize {
        self.skipped.iter().filter(|s| s.kind == kind).count()
    }
}
