use crate::config::ListingConfig;
use crate::error::ScrapeError;
use crate::extract::{
    absolutize_url, attribute, inline_text, parse_selector, select, select_within,
};
use crate::model::{ListingPage, PanelSummary};
use anyhow::{Context, Result};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

static NUMBERED_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*(\d+)(?:\s*[.:)\u{2013}\u{2014}-]\s*|\s+)(.*?)\s*$")
        .expect("numbered title regex must be valid")
});

pub struct ListingSelectors {
    pub title: Selector,
    pub snippet: Selector,
    pub title_link: Selector,
    pub link_container: Selector,
    pub next: Option<Selector>,
    pub detail_url: Regex,
}

impl ListingSelectors {
    pub fn from_config(config: &ListingConfig) -> Result<Self> {
        let next = match &config.next_selector {
            Some(selector) => Some(parse_selector(selector)?),
            None => None,
        };
        Ok(Self {
            title: parse_selector(&config.title_selector)?,
            snippet: parse_selector(&config.snippet_selector)?,
            title_link: parse_selector(&config.title_link_selector)?,
            link_container: parse_selector(&config.link_container_selector)?,
            next,
            detail_url: Regex::new(&config.detail_url_pattern).with_context(|| {
                format!(
                    "invalid listing.detail_url_pattern {}",
                    config.detail_url_pattern
                )
            })?,
        })
    }
}

pub fn parse_numbered_title(raw: &str) -> Option<(String, String)> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let caps = NUMBERED_TITLE.captures(&collapsed)?;
    let id = caps.get(1)?.as_str().to_string();
    let title = caps.get(2).map(|m| m.as_str()).unwrap_or_default().to_string();
    Some((id, title))
}

pub fn strip_numeric_prefix(title: &str) -> String {
    parse_numbered_title(title)
        .map(|(_, stripped)| stripped)
        .unwrap_or_else(|| title.trim().to_string())
}

pub fn harvest_listing(
    page_url: &str,
    doc: &Html,
    selectors: &ListingSelectors,
) -> Result<ListingPage, ScrapeError> {
    let titles = select(doc, &selectors.title);
    let snippets = select(doc, &selectors.snippet);
    if titles.len() != snippets.len() {
        return Err(ScrapeError::ListingShape {
            url: page_url.to_string(),
            titles: titles.len(),
            snippets: snippets.len(),
        });
    }

    let mut page = ListingPage {
        url: page_url.to_string(),
        ..ListingPage::default()
    };

    for (title_node, snippet_node) in titles.into_iter().zip(snippets) {
        let raw_title = inline_text(title_node);
        let Some((id, title)) = parse_numbered_title(&raw_title) else {
            debug!(url = %page_url, title = %raw_title, "listing entry without numeric id");
            page.malformed.push(raw_title);
            continue;
        };
        let url = select_within(title_node, &selectors.title_link)
            .into_iter()
            .find_map(|link| attribute(link, "href"))
            .map(|href| absolutize_url(Some(page_url), href.trim()));

        page.summaries.push(PanelSummary {
            id,
            title,
            snippet: inline_text(snippet_node),
            url,
        });
    }

    page.detail_urls = harvest_detail_urls(page_url, doc, selectors)?;
    page.next_url = selectors.next.as_ref().and_then(|next| {
        select(doc, next)
            .into_iter()
            .find_map(|link| attribute(link, "href"))
            .map(|href| absolutize_url(Some(page_url), &href))
    });

    Ok(page)
}

fn harvest_detail_urls(
    page_url: &str,
    doc: &Html,
    selectors: &ListingSelectors,
) -> Result<Vec<String>, ScrapeError> {
    let anchor = parse_selector("a[href]")?;

    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    for container in select(doc, &selectors.link_container) {
        for link in select_within(container, &anchor) {
            let Some(href) = attribute(link, "href") else {
                continue;
            };
            let url = absolutize_url(Some(page_url), href.trim());
            if !selectors.detail_url.is_match(&url) {
                continue;
            }
            if seen.insert(url.clone()) {
                urls.push(url);
            }
        }
    }
    Ok(urls)
}
