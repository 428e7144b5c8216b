use crate::config::{FieldPositions, SplitConfig, SplitRule};
use crate::error::ScrapeError;
use crate::extract::select_texts;
use crate::listing::parse_numbered_title;
use crate::model::{PanelDetail, PanelRecord};
use anyhow::Result;
use chrono::NaiveDate;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CompiledSplitRule {
    delimiter: Regex,
    trim: bool,
    drop_empty: bool,
}

impl CompiledSplitRule {
    pub fn compile(rule: &SplitRule) -> Result<Self> {
        Ok(Self {
            delimiter: rule.compile()?,
            trim: rule.trim,
            drop_empty: rule.drop_empty,
        })
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.delimiter
            .split(text)
            .map(|segment| {
                if self.trim {
                    segment.trim().to_string()
                } else {
                    segment.to_string()
                }
            })
            .filter(|segment| !(self.drop_empty && segment.trim().is_empty()))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct SplitRules {
    pub organizers: CompiledSplitRule,
    pub keywords: CompiledSplitRule,
    pub keyword_marker: String,
    pub contact_marker: String,
    pub date_formats: Vec<String>,
}

impl SplitRules {
    pub fn from_config(config: &SplitConfig, date_formats: &[String]) -> Result<Self> {
        Ok(Self {
            organizers: CompiledSplitRule::compile(&config.organizers)?,
            keywords: CompiledSplitRule::compile(&config.keywords)?,
            keyword_marker: config.keyword_marker.clone(),
            contact_marker: config.contact_marker.clone(),
            date_formats: date_formats.to_vec(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionParts {
    pub description: String,
    pub keywords: Vec<String>,
    pub has_unseparated_suffix: bool,
}

pub fn extract_detail_fields(doc: &Html, field_selector: &Selector) -> Vec<String> {
    select_texts(doc, field_selector)
}

pub fn parse_detail(
    url: &str,
    raw_fields: &[String],
    positions: &FieldPositions,
) -> Result<PanelDetail, ScrapeError> {
    let required = positions.required_len();
    if raw_fields.len() < required {
        return Err(ScrapeError::MalformedPage {
            url: url.to_string(),
            reason: format!(
                "expected at least {required} detail fields, selector matched {}",
                raw_fields.len()
            ),
        });
    }

    Ok(PanelDetail {
        url: url.to_string(),
        raw_title: raw_fields[positions.title].clone(),
        raw_organizer_block: raw_fields[positions.organizer].clone(),
        raw_posted_date: raw_fields[positions.posted].clone(),
        raw_desc_block: raw_fields[positions.desc].clone(),
    })
}

pub fn split_compound_fields(
    detail: &PanelDetail,
    rules: &SplitRules,
) -> Result<PanelRecord, ScrapeError> {
    let Some((id, title)) = parse_numbered_title(&detail.raw_title) else {
        return Err(ScrapeError::MalformedPage {
            url: detail.url.clone(),
            reason: format!("title '{}' has no numeric id", detail.raw_title.trim()),
        });
    };

    let organizer_block = detail
        .raw_organizer_block
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let parts = split_description(&detail.raw_desc_block, rules);

    Ok(PanelRecord {
        id,
        title,
        organizers: rules.organizers.split(&organizer_block),
        posted: normalize_posted(&detail.raw_posted_date, &rules.date_formats),
        description: parts.description,
        keywords: parts.keywords,
        themes: Vec::new(),
        has_unseparated_suffix: parts.has_unseparated_suffix,
    })
}

/// Separates the free-text description from the contact and keyword suffix.
///
/// Without a contact marker the whole block is kept as description and flagged,
/// since any keyword or contact text is then still inside it.
pub fn split_description(block: &str, rules: &SplitRules) -> DescriptionParts {
    let keywords = match block.rfind(&rules.keyword_marker) {
        Some(at) => rules
            .keywords
            .split(&block[at + rules.keyword_marker.len()..]),
        None => Vec::new(),
    };

    match block.find(&rules.contact_marker) {
        Some(at) => DescriptionParts {
            description: block[..at].trim().to_string(),
            keywords,
            has_unseparated_suffix: false,
        },
        None => DescriptionParts {
            description: block.trim().to_string(),
            keywords,
            has_unseparated_suffix: true,
        },
    }
}

pub fn normalize_posted(raw: &str, formats: &[String]) -> String {
    let trimmed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    for format in formats {
        if let Ok(date) = NaiveDate::parse_from_str(&trimmed, format) {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    if !trimmed.is_empty() {
        debug!(posted = %trimmed, "posted date did not match any configured format");
    }
    trimmed
}
