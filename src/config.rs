use crate::extract::parse_selector;
use anyhow::{Context, Result, anyhow, bail};
use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub path: PathBuf,
    pub config: PipelineConfig,
}

impl LoadedConfig {
    pub fn fixture_dir(&self) -> Result<PathBuf> {
        let dir = self
            .config
            .fetch
            .fixture_dir
            .as_ref()
            .context("fetch.fixture_dir missing for file mode")?;
        resolve_path(&self.path, dir)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub site: SiteMeta,
    #[serde(default)]
    pub fetch: FetchConfig,
    pub listing: ListingConfig,
    #[serde(default)]
    pub detail: DetailConfig,
    #[serde(default)]
    pub themes: ThemeConfig,
    #[serde(default)]
    pub split: SplitConfig,
    #[serde(default)]
    pub date: DateConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.site.key.trim().is_empty() {
            bail!("site.key must not be empty");
        }
        if self.site.name.trim().is_empty() {
            bail!("site.name must not be empty");
        }

        Url::parse(&self.listing.start_url)
            .with_context(|| format!("invalid listing.start_url {}", self.listing.start_url))?;
        if self.listing.max_pages == 0 {
            bail!("listing.max_pages must be at least 1");
        }

        if self.fetch.mode == FetchMode::File && self.fetch.fixture_dir.is_none() {
            bail!("fetch.fixture_dir is required for file mode");
        }

        if self.themes.enabled {
            let Some(menu_url) = &self.themes.menu_url else {
                bail!("themes.menu_url is required when themes are enabled");
            };
            Url::parse(menu_url).with_context(|| format!("invalid themes.menu_url {menu_url}"))?;
        }

        for selector in self.selectors() {
            parse_selector(selector)?;
        }

        Regex::new(&self.listing.detail_url_pattern).with_context(|| {
            format!(
                "invalid listing.detail_url_pattern {}",
                self.listing.detail_url_pattern
            )
        })?;
        self.split.organizers.compile().context("invalid split.organizers")?;
        self.split.keywords.compile().context("invalid split.keywords")?;

        self.detail.positions.validate()?;

        if self.stats.n == 0 {
            bail!("stats.n must be at least 1");
        }

        Ok(())
    }

    fn selectors(&self) -> Vec<&str> {
        let mut selectors = vec![
            self.listing.title_selector.as_str(),
            self.listing.snippet_selector.as_str(),
            self.listing.title_link_selector.as_str(),
            self.listing.link_container_selector.as_str(),
            self.detail.field_selector.as_str(),
            self.themes.menu_link_selector.as_str(),
            self.themes.member_title_selector.as_str(),
        ];
        if let Some(next) = &self.listing.next_selector {
            selectors.push(next.as_str());
        }
        selectors
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteMeta {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    #[default]
    Http,
    File,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default)]
    pub mode: FetchMode,
    #[serde(default)]
    pub fixture_dir: Option<PathBuf>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u8,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            mode: FetchMode::Http,
            fixture_dir: None,
            headers: BTreeMap::new(),
            timeout_secs: default_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    pub start_url: String,
    #[serde(default = "default_title_selector")]
    pub title_selector: String,
    #[serde(default = "default_snippet_selector")]
    pub snippet_selector: String,
    #[serde(default = "default_title_link_selector")]
    pub title_link_selector: String,
    #[serde(default = "default_link_container_selector")]
    pub link_container_selector: String,
    #[serde(default = "default_detail_url_pattern")]
    pub detail_url_pattern: String,
    #[serde(default)]
    pub next_selector: Option<String>,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetailConfig {
    #[serde(default = "default_detail_field_selector")]
    pub field_selector: String,
    #[serde(default)]
    pub positions: FieldPositions,
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            field_selector: default_detail_field_selector(),
            positions: FieldPositions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct FieldPositions {
    pub title: usize,
    pub organizer: usize,
    pub posted: usize,
    pub desc: usize,
}

impl Default for FieldPositions {
    fn default() -> Self {
        Self {
            title: 0,
            organizer: 1,
            posted: 2,
            desc: 3,
        }
    }
}

impl FieldPositions {
    pub fn required_len(&self) -> usize {
        self.title.max(self.organizer).max(self.posted).max(self.desc) + 1
    }

    pub fn validate(&self) -> Result<()> {
        let distinct: BTreeSet<usize> = [self.title, self.organizer, self.posted, self.desc]
            .into_iter()
            .collect();
        if distinct.len() != 4 {
            bail!("detail.positions must name four distinct indices, got {self:?}");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThemeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub menu_url: Option<String>,
    #[serde(default = "default_menu_link_selector")]
    pub menu_link_selector: String,
    #[serde(default = "default_title_selector")]
    pub member_title_selector: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            menu_url: None,
            menu_link_selector: default_menu_link_selector(),
            member_title_selector: default_title_selector(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SplitRule {
    pub pattern: String,
    #[serde(default)]
    pub literal: bool,
    #[serde(default = "default_true")]
    pub trim: bool,
    #[serde(default = "default_true")]
    pub drop_empty: bool,
}

impl SplitRule {
    pub fn literal(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            literal: true,
            trim: true,
            drop_empty: true,
        }
    }

    pub fn regex(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            literal: false,
            trim: true,
            drop_empty: true,
        }
    }

    pub fn compile(&self) -> Result<Regex> {
        let source = if self.literal {
            regex::escape(&self.pattern)
        } else {
            self.pattern.clone()
        };
        if source.is_empty() {
            return Err(anyhow!("split pattern must not be empty"));
        }
        Regex::new(&source).with_context(|| format!("invalid split pattern {}", self.pattern))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SplitConfig {
    #[serde(default = "default_organizer_rule")]
    pub organizers: SplitRule,
    #[serde(default = "default_keyword_rule")]
    pub keywords: SplitRule,
    #[serde(default = "default_keyword_marker")]
    pub keyword_marker: String,
    #[serde(default = "default_contact_marker")]
    pub contact_marker: String,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            organizers: default_organizer_rule(),
            keywords: default_keyword_rule(),
            keyword_marker: default_keyword_marker(),
            contact_marker: default_contact_marker(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateConfig {
    #[serde(default = "default_date_formats")]
    pub formats: Vec<String>,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            formats: default_date_formats(),
        }
    }
}

/// Stop-word handling for multi-word n-grams.
///
/// `AnyConstituent` drops an n-gram when any of its words is a stop-word. That is
/// what unigram analysis wants, but for n > 1 it also removes legitimate phrases
/// whose inner word is a stop-word ("state of exception"). `None` keeps every
/// n-gram and leaves cleanup to `custom_stop_ngrams`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StopwordMode {
    None,
    #[default]
    #[serde(alias = "any-constituent")]
    AnyConstituent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    None,
    Theme,
    Organizer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_ngram_size")]
    pub n: usize,
    #[serde(default)]
    pub stopword_mode: StopwordMode,
    #[serde(default)]
    pub group_by: GroupBy,
    #[serde(default = "default_min_count")]
    pub min_count: usize,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default)]
    pub use_default_stopwords: bool,
    #[serde(default)]
    pub custom_stopwords: BTreeSet<String>,
    #[serde(default)]
    pub custom_stop_ngrams: BTreeSet<String>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            n: default_ngram_size(),
            stopword_mode: StopwordMode::default(),
            group_by: GroupBy::default(),
            min_count: default_min_count(),
            top_n: default_top_n(),
            use_default_stopwords: false,
            custom_stopwords: BTreeSet::new(),
            custom_stop_ngrams: BTreeSet::new(),
        }
    }
}

pub fn load_config(config_path: &Path) -> Result<LoadedConfig> {
    let text = std::fs::read_to_string(config_path)
        .with_context(|| format!("failed to read config: {}", config_path.display()))?;
    let config: PipelineConfig = toml::from_str(&text)
        .with_context(|| format!("failed to parse toml in {}", config_path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", config_path.display()))?;
    Ok(LoadedConfig {
        path: config_path.to_path_buf(),
        config,
    })
}

pub fn resolve_path(base_config_path: &Path, maybe_relative: &Path) -> Result<PathBuf> {
    if maybe_relative.is_absolute() {
        return Ok(maybe_relative.to_path_buf());
    }

    let parent = base_config_path.parent().ok_or_else(|| {
        anyhow!(
            "config has no parent directory: {}",
            base_config_path.display()
        )
    })?;

    Ok(parent.join(maybe_relative))
}

pub fn sanitize_for_path(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_attempts() -> u8 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_title_selector() -> String {
    "h3.post-title".to_string()
}

fn default_snippet_selector() -> String {
    "div.post-body".to_string()
}

fn default_title_link_selector() -> String {
    "a".to_string()
}

fn default_link_container_selector() -> String {
    "div.blog-posts".to_string()
}

fn default_detail_url_pattern() -> String {
    r"^https?://[^/]+/\d".to_string()
}

fn default_max_pages() -> usize {
    50
}

fn default_detail_field_selector() -> String {
    "h3.post-title, div.post-organizers, abbr.published, div.post-body".to_string()
}

fn default_menu_link_selector() -> String {
    "div.theme-menu a".to_string()
}

fn default_organizer_rule() -> SplitRule {
    SplitRule::literal("; ")
}

fn default_keyword_rule() -> SplitRule {
    SplitRule::regex("[,;]")
}

fn default_keyword_marker() -> String {
    "Keywords: ".to_string()
}

fn default_contact_marker() -> String {
    "\n\nContact".to_string()
}

fn default_date_formats() -> Vec<String> {
    vec![
        "%A, %B %d, %Y".to_string(),
        "%B %d, %Y".to_string(),
        "%b %d, %Y".to_string(),
        "%Y-%m-%d".to_string(),
        "%d %B %Y".to_string(),
        "%d/%m/%Y".to_string(),
    ]
}

fn default_ngram_size() -> usize {
    1
}

fn default_min_count() -> usize {
    1
}

fn default_top_n() -> usize {
    25
}
