use crate::config::ThemeConfig;
use crate::extract::{absolutize_url, attribute, inline_text, parse_selector, select};
use crate::listing::parse_numbered_title;
use crate::model::{ThemeLink, ThemeMember, ThemeMembership, ThemePage};
use anyhow::Result;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::debug;

pub struct ThemeSelectors {
    pub menu_link: Selector,
    pub member_title: Selector,
}

impl ThemeSelectors {
    pub fn from_config(config: &ThemeConfig) -> Result<Self> {
        Ok(Self {
            menu_link: parse_selector(&config.menu_link_selector)?,
            member_title: parse_selector(&config.member_title_selector)?,
        })
    }
}

pub fn harvest_themes(menu_url: &str, doc: &Html, selectors: &ThemeSelectors) -> Vec<ThemeLink> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for node in select(doc, &selectors.menu_link) {
        let label = inline_text(node);
        let Some(href) = attribute(node, "href") else {
            continue;
        };
        if label.is_empty() {
            continue;
        }
        let url = absolutize_url(Some(menu_url), href.trim());
        if seen.insert(url.clone()) {
            links.push(ThemeLink { url, label });
        }
    }
    links
}

pub fn harvest_theme_members(doc: &Html, label: &str, selectors: &ThemeSelectors) -> ThemePage {
    let mut page = ThemePage::default();
    for node in select(doc, &selectors.member_title) {
        let raw_title = inline_text(node);
        match parse_numbered_title(&raw_title) {
            Some((id, title)) => page.members.push(ThemeMember {
                id,
                title,
                theme: label.to_string(),
            }),
            None => {
                debug!(theme = %label, title = %raw_title, "theme entry without numeric id");
                page.malformed.push(raw_title);
            }
        }
    }
    page
}

pub fn build_theme_membership(rows: &[ThemeMember]) -> ThemeMembership {
    let mut membership = ThemeMembership::new();
    for row in rows {
        let labels = membership.entry(row.id.clone()).or_default();
        if !labels.contains(&row.theme) {
            labels.push(row.theme.clone());
        }
    }
    membership
}
