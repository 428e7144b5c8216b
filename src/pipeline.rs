use crate::config::{
    GroupBy, LoadedConfig, StatsConfig, StopwordMode, load_config, sanitize_for_path,
};
use crate::dataset::{LongDataset, WideDataset, build_wide, to_long};
use crate::error::ScrapeError;
use crate::extract::{parse_document, parse_selector};
use crate::fetch::{PageSource, page_source_for};
use crate::listing::{ListingSelectors, harvest_listing};
use crate::model::{PanelRecord, PanelSummary, RunReport, ThemeMember, ThemeMembership};
use crate::record::{SplitRules, extract_detail_fields, parse_detail, split_compound_fields};
use crate::stats::{StatsReport, analyze};
use crate::store::{LONG_BIN, read_binary, write_scrape_artifacts, write_stats_artifacts};
use crate::themes::{
    ThemeSelectors, build_theme_membership, harvest_theme_members, harvest_themes,
};
use anyhow::{Result, bail};
use scraper::Selector;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub config_path: PathBuf,
    pub out_dir: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct StatsOptions {
    pub config_path: PathBuf,
    pub out_dir: PathBuf,
    pub dataset: Option<PathBuf>,
    pub n: Option<usize>,
    pub group_by: Option<GroupBy>,
    pub stopword_mode: Option<StopwordMode>,
    pub min_count: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ValidateOptions {
    pub config_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub summaries: Vec<PanelSummary>,
    pub records: Vec<PanelRecord>,
    pub membership: ThemeMembership,
    pub wide: WideDataset,
    pub long: LongDataset,
    pub report: RunReport,
}

pub fn site_out_dir(out_dir: &Path, loaded: &LoadedConfig) -> PathBuf {
    out_dir.join(sanitize_for_path(&loaded.config.site.key))
}

pub fn scrape_to_dir(options: &ScrapeOptions) -> Result<RunReport> {
    let loaded = load_config(&options.config_path)?;
    let source = page_source_for(&loaded)?;
    let outcome = run_scrape(&loaded, source.as_ref())?;

    let dir = site_out_dir(&options.out_dir, &loaded);
    let written = write_scrape_artifacts(&dir, &outcome.wide, &outcome.long, &outcome.report)?;
    for path in &written {
        info!(file = %path.display(), "artifact written");
    }
    Ok(outcome.report)
}

pub fn run_scrape(loaded: &LoadedConfig, source: &dyn PageSource) -> Result<ScrapeOutcome> {
    let config = &loaded.config;
    let mut report = RunReport {
        site_key: config.site.key.clone(),
        ..RunReport::default()
    };

    info!(site = %config.site.key, "scrape start");
    let (summaries, detail_urls) = harvest_all_listings(loaded, source, &mut report)?;
    report.listing_entries = summaries.len();
    report.detail_urls = detail_urls.len();

    let records = scrape_details(loaded, source, &summaries, &detail_urls, &mut report)?;
    report.records = records.len();

    let theme_rows = if config.themes.enabled {
        harvest_theme_rows(loaded, source, &mut report)?
    } else {
        Vec::new()
    };
    report.theme_members = theme_rows.len();
    let membership = build_theme_membership(&theme_rows);

    if report.documents_fetched == 0 {
        bail!(
            "no documents could be retrieved for site {}; {} page(s) failed",
            config.site.key,
            report.skipped.len()
        );
    }

    let known: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
    let orphaned = membership
        .keys()
        .filter(|id| !known.contains(id.as_str()))
        .count();
    if orphaned > 0 {
        debug!(orphaned, "theme members without a scraped record");
    }

    let wide = build_wide(&records, &membership);
    let long = to_long(&wide);

    info!(
        site = %config.site.key,
        listing_pages = report.listing_pages,
        records = report.records,
        theme_pages = report.theme_pages,
        long_rows = long.rows.len(),
        skipped = report.skipped.len(),
        "scrape complete"
    );

    Ok(ScrapeOutcome {
        summaries,
        records,
        membership,
        wide,
        long,
        report,
    })
}

fn harvest_all_listings(
    loaded: &LoadedConfig,
    source: &dyn PageSource,
    report: &mut RunReport,
) -> Result<(Vec<PanelSummary>, Vec<String>)> {
    let listing = &loaded.config.listing;
    let selectors = ListingSelectors::from_config(listing)?;

    let mut summaries = Vec::new();
    let mut detail_urls = Vec::new();
    let mut seen_urls = HashSet::new();
    let mut visited = HashSet::new();
    let mut next = Some(listing.start_url.clone());

    while let Some(page_url) = next.take() {
        if report.listing_pages >= listing.max_pages {
            info!(max_pages = listing.max_pages, "listing page limit reached");
            break;
        }
        if !visited.insert(page_url.clone()) {
            warn!(url = %page_url, "listing pagination revisits a page; stopping");
            break;
        }

        let body = match source.fetch_document(&page_url) {
            Ok(body) => body,
            Err(err) => {
                warn!(url = %page_url, error = %err, "listing page unavailable; stopping pagination");
                report.skip(&page_url, &err);
                break;
            }
        };
        report.documents_fetched += 1;

        let doc = parse_document(&body);
        let page = match harvest_listing(&page_url, &doc, &selectors) {
            Ok(page) => page,
            Err(err) => {
                warn!(url = %page_url, kind = err.kind(), error = %err, "listing page unusable; stopping pagination");
                report.skip(&page_url, &err);
                break;
            }
        };
        report.listing_pages += 1;

        for raw_title in &page.malformed {
            report.skip(
                &page_url,
                &ScrapeError::MalformedPage {
                    url: page_url.clone(),
                    reason: format!("listing title '{raw_title}' has no numeric id"),
                },
            );
        }

        info!(
            url = %page_url,
            entries = page.summaries.len(),
            links = page.detail_urls.len(),
            "listing page harvested"
        );

        summaries.extend(page.summaries);
        for url in page.detail_urls {
            if seen_urls.insert(url.clone()) {
                detail_urls.push(url);
            }
        }
        next = page.next_url;
    }

    Ok((summaries, detail_urls))
}

fn scrape_details(
    loaded: &LoadedConfig,
    source: &dyn PageSource,
    summaries: &[PanelSummary],
    detail_urls: &[String],
    report: &mut RunReport,
) -> Result<Vec<PanelRecord>> {
    let config = &loaded.config;
    let field_selector = parse_selector(&config.detail.field_selector)?;
    let rules = SplitRules::from_config(&config.split, &config.date.formats)?;

    let listing_by_url: HashMap<&str, &PanelSummary> = summaries
        .iter()
        .filter_map(|s| s.url.as_deref().map(|url| (url, s)))
        .collect();
    let listed_ids: HashSet<&str> = summaries.iter().map(|s| s.id.as_str()).collect();

    let mut records = Vec::new();
    let mut first_url_by_id: HashMap<String, String> = HashMap::new();

    for url in detail_urls {
        let body = match source.fetch_document(url) {
            Ok(body) => body,
            Err(err) => {
                warn!(%url, error = %err, "detail page skipped");
                report.skip(url, &err);
                continue;
            }
        };
        report.documents_fetched += 1;

        let record = parse_record(url, &body, &field_selector, loaded, &rules)
            .and_then(|record| {
                reconcile(
                    url,
                    record,
                    listing_by_url.get(url.as_str()).copied(),
                    &listed_ids,
                )
            })
            .and_then(|record| match first_url_by_id.get(&record.id) {
                Some(first_url) => Err(ScrapeError::DuplicateId {
                    id: record.id.clone(),
                    url: url.clone(),
                    first_url: first_url.clone(),
                }),
                None => Ok(record),
            });

        match record {
            Ok(record) => {
                debug!(
                    %url,
                    id = %record.id,
                    organizers = record.organizers.len(),
                    keywords = record.keywords.len(),
                    "detail page parsed"
                );
                first_url_by_id.insert(record.id.clone(), url.clone());
                records.push(record);
            }
            Err(err) => {
                warn!(%url, kind = err.kind(), error = %err, "detail page skipped");
                report.skip(url, &err);
            }
        }
    }

    report_unmatched_summaries(
        &config.listing.start_url,
        summaries,
        detail_urls,
        &first_url_by_id,
        report,
    );

    Ok(records)
}

fn parse_record(
    url: &str,
    body: &str,
    field_selector: &Selector,
    loaded: &LoadedConfig,
    rules: &SplitRules,
) -> Result<PanelRecord, ScrapeError> {
    let doc = parse_document(body);
    let fields = extract_detail_fields(&doc, field_selector);
    let detail = parse_detail(url, &fields, &loaded.config.detail.positions)?;
    split_compound_fields(&detail, rules)
}

fn reconcile(
    url: &str,
    record: PanelRecord,
    summary: Option<&PanelSummary>,
    listed_ids: &HashSet<&str>,
) -> Result<PanelRecord, ScrapeError> {
    match summary {
        Some(summary) if summary.id != record.id => Err(ScrapeError::IdMismatch {
            url: url.to_string(),
            listing_id: summary.id.clone(),
            detail_id: record.id,
        }),
        None if !listed_ids.contains(record.id.as_str()) => Err(ScrapeError::UnlistedRecord {
            url: url.to_string(),
            id: record.id,
        }),
        _ => Ok(record),
    }
}

// Entries whose detail page was attempted already have a skipped entry of their own.
fn report_unmatched_summaries(
    start_url: &str,
    summaries: &[PanelSummary],
    detail_urls: &[String],
    first_url_by_id: &HashMap<String, String>,
    report: &mut RunReport,
) {
    let attempted: HashSet<&str> = detail_urls.iter().map(String::as_str).collect();
    let mut reported = HashSet::new();
    for summary in summaries {
        if first_url_by_id.contains_key(&summary.id) || !reported.insert(summary.id.as_str()) {
            continue;
        }
        if summary
            .url
            .as_deref()
            .is_some_and(|url| attempted.contains(url))
        {
            continue;
        }
        let url = summary.url.as_deref().unwrap_or(start_url);
        warn!(id = %summary.id, %url, "listing entry has no harvested detail page");
        report.skip(
            url,
            &ScrapeError::MalformedPage {
                url: url.to_string(),
                reason: format!(
                    "listing entry {} has no detail page among the harvested links",
                    summary.id
                ),
            },
        );
    }
}

fn harvest_theme_rows(
    loaded: &LoadedConfig,
    source: &dyn PageSource,
    report: &mut RunReport,
) -> Result<Vec<ThemeMember>> {
    let themes = &loaded.config.themes;
    let Some(menu_url) = themes.menu_url.as_deref() else {
        return Ok(Vec::new());
    };
    let selectors = ThemeSelectors::from_config(themes)?;

    let menu_body = match source.fetch_document(menu_url) {
        Ok(body) => body,
        Err(err) => {
            warn!(url = %menu_url, error = %err, "theme menu unavailable; records stay unthemed");
            report.skip(menu_url, &err);
            return Ok(Vec::new());
        }
    };
    report.documents_fetched += 1;

    let links = harvest_themes(menu_url, &parse_document(&menu_body), &selectors);
    info!(themes = links.len(), "theme menu harvested");

    let mut rows = Vec::new();
    for link in links {
        let body = match source.fetch_document(&link.url) {
            Ok(body) => body,
            Err(err) => {
                warn!(url = %link.url, theme = %link.label, error = %err, "theme page skipped");
                report.skip(&link.url, &err);
                continue;
            }
        };
        report.documents_fetched += 1;
        report.theme_pages += 1;

        let page = harvest_theme_members(&parse_document(&body), &link.label, &selectors);
        for raw_title in &page.malformed {
            report.skip(
                &link.url,
                &ScrapeError::MalformedPage {
                    url: link.url.clone(),
                    reason: format!("theme entry '{raw_title}' has no numeric id"),
                },
            );
        }
        debug!(theme = %link.label, members = page.members.len(), "theme page harvested");
        rows.extend(page.members);
    }

    Ok(rows)
}

pub fn compute_stats(options: &StatsOptions) -> Result<StatsReport> {
    let loaded = load_config(&options.config_path)?;
    let dataset_path = options
        .dataset
        .clone()
        .unwrap_or_else(|| site_out_dir(&options.out_dir, &loaded).join(LONG_BIN));
    let long: LongDataset = read_binary(&dataset_path)?;

    let config = apply_overrides(&loaded.config.stats, options);
    if config.n == 0 {
        bail!("n-gram size must be at least 1");
    }
    let report = analyze(&long, &config);

    let dir = site_out_dir(&options.out_dir, &loaded);
    for path in write_stats_artifacts(&dir, &report)? {
        info!(file = %path.display(), "artifact written");
    }
    Ok(report)
}

fn apply_overrides(base: &StatsConfig, options: &StatsOptions) -> StatsConfig {
    let mut config = base.clone();
    if let Some(n) = options.n {
        config.n = n;
    }
    if let Some(group_by) = options.group_by {
        config.group_by = group_by;
    }
    if let Some(mode) = options.stopword_mode {
        config.stopword_mode = mode;
    }
    if let Some(min_count) = options.min_count {
        config.min_count = min_count;
    }
    config
}

pub fn validate_config(options: &ValidateOptions) -> Result<Vec<String>> {
    let loaded = load_config(&options.config_path)?;
    Ok(vec![format!(
        "OK: {} ({})",
        loaded.config.site.key,
        loaded.path.display()
    )])
}
